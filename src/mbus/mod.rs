//! The mbus module contains the components responsible for the wired M-Bus
//! simulation protocol, including frame classification, chunked telegram
//! transmission, the slave session server and the raw-frame read client.

pub mod client;
pub mod frame;
pub mod server;
pub mod transmit;

pub use client::*;
pub use frame::*;
pub use server::*;
pub use transmit::*;

/// Classification of one inbound request frame.
pub use frame::InboundFrame;

/// TCP server fronting one simulated meter device.
pub use server::MeterServer;
