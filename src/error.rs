//! # Simulator Error Handling
//!
//! This module defines the SimError enum, which represents the different error
//! types that can occur in the mbus-sim crate.

use thiserror::Error;

/// Represents the different error types that can occur in the simulator.
#[derive(Debug, Error)]
pub enum SimError {
    /// Indicates an error on the underlying TCP transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Indicates the template telegram could not be decoded from hex.
    #[error("Invalid template telegram: {0}")]
    InvalidTemplate(String),

    /// Indicates the meter description document could not be parsed.
    #[error("Invalid meter description: {0}")]
    InvalidDescription(String),

    /// Indicates a record value that is not a decimal number.
    #[error("Record value is not a decimal number: {0:?}")]
    InvalidRecordValue(String),

    /// Indicates the template telegram carries no 4-byte BCD value
    /// signature at the expected offset.
    #[error("No BCD value field signature found in template telegram")]
    ValueFieldNotFound,

    /// Indicates the located value field would overrun the telegram.
    #[error("Value field at offset {offset} overruns telegram of {len} bytes")]
    ValueFieldOutOfRange { offset: usize, len: usize },

    /// Indicates a primary address outside the addressable range.
    #[error("Invalid primary address {0}: must be 0-250")]
    InvalidAddress(u8),

    /// Indicates no complete frame arrived before the idle timeout expired.
    #[error("Timed out waiting for a complete frame")]
    ResponseTimeout,

    /// A catch-all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}
