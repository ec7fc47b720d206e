//! # mbus-sim - A Rust Crate for Simulating M-Bus (Meter-Bus) Slave Devices
//!
//! The mbus-sim crate simulates an M-Bus (Meter-Bus) slave device over TCP. It replays
//! a captured response telegram from a real utility meter, refreshing the meter values
//! with small random perturbations on every read, so that master software under test
//! sees a live device instead of a frozen capture.
//!
//! ## Features
//!
//! - Serve a simulated meter over TCP and answer M-Bus read requests
//! - Load the meter description from JSON and the response telegram from hex
//! - Perturb data record values per read and re-encode them into the telegram
//! - Transmit replies in paced chunks, with optional mid-telegram fault injection
//! - Classify inbound short and long frames and acknowledge control frames
//! - Read a device with a raw-frame client that reassembles chunked replies
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! To use the mbus-sim crate in your Rust project, add the following to your Cargo.toml file:
//!
//! ```toml
//! [dependencies]
//! mbus-sim = "0.1.0"
//! ```
//!
//! Then, in your Rust code, you can import the necessary modules and functions:
//!
//! ```rust
//! use mbus_sim::{
//!     read_device, MeterDevice, MeterServer, ResponseMode, ServerConfig,
//!     DataRecord, MeterDescription, SimError, init_logger, log_info,
//! };
//! ```

pub mod constants;
pub mod device;
pub mod error;
pub mod logging;
pub mod mbus;
pub mod payload;
pub mod util;

pub use crate::error::SimError;
pub use crate::logging::{init_logger, log_info};

// Core simulation types
pub use device::{MeterDevice, ResponseMode};
pub use mbus::client::{read_raw_frame, ClientConfig, FrameAssembler};
pub use mbus::frame::{build_short_request, classify_frame, InboundFrame};
pub use mbus::server::{MeterServer, ServerConfig};
pub use mbus::transmit::ChunkPolicy;
pub use payload::{DataRecord, MeterDescription, SlaveInformation};

/// Read one raw response frame from a simulated meter.
///
/// # Arguments
/// * `host` - Host name or address the simulator listens on
/// * `port` - TCP port of the simulator
/// * `address` - Primary address of the meter (0-250)
///
/// # Returns
/// * `Ok(Vec<u8>)` - Complete reassembled long frame
/// * `Err(SimError)` - Connection, timeout or protocol failure
pub async fn read_device(host: &str, port: u16, address: u8) -> Result<Vec<u8>, SimError> {
    let config = ClientConfig {
        host: host.to_string(),
        port,
        address,
        ..ClientConfig::default()
    };
    mbus::client::read_raw_frame(&config).await
}
