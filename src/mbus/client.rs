//! # Raw Frame Read Client
//!
//! Connects to a simulated meter, issues a single short-frame read
//! request and reassembles the chunked reply into one complete long
//! frame. The client deliberately stays below the record layer: the
//! deliverable is the raw telegram bytes, which makes it the natural
//! counterpart for exercising the chunked transmitter.
//!
//! Reassembly tolerates the dirt a real link produces. Chunks that
//! start with a short-frame start byte are treated as request echoes
//! and dropped, leading noise before the long-frame start byte is
//! skipped, and a per-read idle watchdog converts a stalled peer into
//! [`SimError::ResponseTimeout`] instead of hanging forever.

use crate::constants::{
    DEFAULT_LISTEN_PORT, DEFAULT_PRIMARY_ADDRESS, DEFAULT_RESPONSE_TIMEOUT,
    MBUS_CONTROL_REQ_UD2, MBUS_FRAME_LONG_START, MBUS_FRAME_SHORT_START, MBUS_LONG_FRAME_OVERHEAD,
};
use crate::error::SimError;
use crate::mbus::frame::build_short_request;
use crate::util::hex::format_hex_compact;
use bytes::BytesMut;
use log::{debug, info};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Read buffer size for one response chunk.
const MAX_RESPONSE_CHUNK: usize = 256;

/// Configuration of one raw read.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host the simulated meter listens on
    pub host: String,
    /// TCP port of the simulated meter
    pub port: u16,
    /// Primary address to request data from
    pub address: u8,
    /// Idle time after which the read is abandoned
    pub response_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_LISTEN_PORT,
            address: DEFAULT_PRIMARY_ADDRESS,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Incremental reassembly of one long frame from arbitrary chunks.
///
/// Bytes before the first long-frame start byte are discarded, bytes
/// after a completed frame stay buffered for the next call. Feeding the
/// same stream one byte at a time or in one piece yields the same frame.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        FrameAssembler {
            buffer: BytesMut::new(),
        }
    }

    /// Appends a chunk and returns a frame once one is complete.
    ///
    /// The expected total length is taken from the length byte at offset
    /// 1 of the buffered frame, plus the fixed long-frame overhead.
    pub fn push(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let start = self
            .buffer
            .iter()
            .position(|b| *b == MBUS_FRAME_LONG_START)?;
        if start > 0 {
            debug!("discarded {start} bytes before frame start");
            let _ = self.buffer.split_to(start);
        }
        // Wait for the full header before trusting the length byte.
        if self.buffer.len() < 4 {
            return None;
        }
        let total = MBUS_LONG_FRAME_OVERHEAD + self.buffer[1] as usize;
        if self.buffer.len() < total {
            return None;
        }
        Some(self.buffer.split_to(total).to_vec())
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Performs one read transaction and returns the raw long frame.
///
/// Sends a short-frame REQ_UD2 to the configured address, then reads
/// until the reply frame is complete. Chunks starting with the
/// short-frame start byte are skipped as echoes of the request.
pub async fn read_raw_frame(config: &ClientConfig) -> Result<Vec<u8>, SimError> {
    let request = build_short_request(MBUS_CONTROL_REQ_UD2, config.address)?;
    let target = format!("{}:{}", config.host, config.port);

    let mut stream = TcpStream::connect(&target)
        .await
        .map_err(|e| SimError::Transport(format!("failed to connect to {target}: {e}")))?;
    info!("connected to {target}, requesting address {}", config.address);

    stream
        .write_all(&request)
        .await
        .map_err(|e| SimError::Transport(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| SimError::Transport(e.to_string()))?;
    debug!("sent read request: {}", format_hex_compact(&request));

    let mut assembler = FrameAssembler::new();
    let mut buf = vec![0u8; MAX_RESPONSE_CHUNK];
    loop {
        let n = match timeout(config.response_timeout, stream.read(&mut buf)).await {
            Ok(read) => read.map_err(|e| SimError::Transport(e.to_string()))?,
            Err(_) => return Err(SimError::ResponseTimeout),
        };
        if n == 0 {
            return Err(SimError::Transport(
                "connection closed before a complete frame arrived".to_string(),
            ));
        }

        let chunk = &buf[..n];
        debug!("received {n} bytes: {}", format_hex_compact(chunk));
        if chunk[0] == MBUS_FRAME_SHORT_START {
            debug!("ignored short-frame echo");
            continue;
        }

        if let Some(frame) = assembler.push(chunk) {
            info!("assembled complete frame ({} bytes)", frame.len());
            return Ok(frame);
        }
    }
}
