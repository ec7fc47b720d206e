//! # Utility Modules
//!
//! This module provides common utility functions and types used throughout
//! the mbus-sim crate, currently hex encoding/decoding for telegram files
//! and frame logging.

pub mod hex;

// Re-export commonly used functions
pub use hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes};
