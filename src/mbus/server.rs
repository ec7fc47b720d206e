//! # Simulated Slave Session Server
//!
//! Owns the TCP listener of the simulated meter. Every accepted
//! connection runs as its own task; per inbound request the handler
//! refreshes the record set, rebuilds the response telegram, classifies
//! the frame and answers it. A data read gets the telegram, any other
//! long frame gets a bare acknowledgement, noise gets nothing but a log
//! line. Transport errors tear down the one connection they happened on
//! and leave the rest of the server untouched.

use crate::constants::{
    DEFAULT_ABORT_AFTER_CHUNKS, DEFAULT_CHUNK_SIZE, DEFAULT_LISTEN_PORT, DEFAULT_LONG_REPLY_DELAY,
    DEFAULT_SHORT_REPLY_DELAY, MBUS_FRAME_ACK,
};
use crate::device::{MeterDevice, ResponseMode};
use crate::error::SimError;
use crate::mbus::frame::{classify_frame, InboundFrame};
use crate::mbus::transmit::{send_chunked, send_whole, ChunkPolicy};
use crate::util::hex::format_hex_compact;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

/// Read buffer size for one inbound request. Requests are tiny; this only
/// bounds the read.
const MAX_REQUEST_SIZE: usize = 256;

/// Configuration of the session server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (0 lets the OS pick)
    pub port: u16,
    /// Chunk size for live-mode replies
    pub chunk_size: usize,
    /// Pause between chunks after a short-frame request
    pub short_reply_delay: Duration,
    /// Pause between chunks after a long-frame read
    pub long_reply_delay: Duration,
    /// Simulate a broken link by aborting chunked replies mid-telegram
    pub inject_fault: bool,
    /// Chunk count after which a faulted reply stops
    pub abort_after_chunks: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: DEFAULT_LISTEN_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            short_reply_delay: DEFAULT_SHORT_REPLY_DELAY,
            long_reply_delay: DEFAULT_LONG_REPLY_DELAY,
            inject_fault: false,
            abort_after_chunks: DEFAULT_ABORT_AFTER_CHUNKS,
        }
    }
}

impl ServerConfig {
    /// Chunk policy for one reply with the given inter-chunk delay.
    fn chunk_policy(&self, delay: Duration) -> ChunkPolicy {
        ChunkPolicy {
            chunk_size: self.chunk_size,
            delay,
            abort_after: self.inject_fault.then_some(self.abort_after_chunks),
        }
    }
}

/// TCP server fronting one simulated meter device.
///
/// The device is shared read-mostly across connections; per-request
/// mutation is serialized inside [`MeterDevice`], so connection tasks
/// never observe a half-updated record set.
pub struct MeterServer {
    listener: TcpListener,
    device: Arc<MeterDevice>,
    config: ServerConfig,
}

impl MeterServer {
    /// Binds the listener and prepares the server for [`MeterServer::run`].
    pub async fn bind(device: MeterDevice, config: ServerConfig) -> Result<Self, SimError> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))
            .await
            .map_err(|e| SimError::Transport(format!("failed to bind port {}: {e}", config.port)))?;
        Ok(MeterServer {
            listener,
            device: Arc::new(device),
            config,
        })
    }

    /// Returns the bound listen address.
    pub fn local_addr(&self) -> Result<SocketAddr, SimError> {
        self.listener
            .local_addr()
            .map_err(|e| SimError::Transport(e.to_string()))
    }

    /// Accepts connections until the process is stopped.
    pub async fn run(self) -> Result<(), SimError> {
        info!("simulated M-Bus device listening on {}", self.local_addr()?);
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| SimError::Transport(e.to_string()))?;
            info!("client connected: {peer}");

            let device = Arc::clone(&self.device);
            let config = self.config.clone();
            tokio::spawn(async move {
                match handle_connection(stream, peer, device, config).await {
                    Ok(()) => info!("client disconnected: {peer}"),
                    Err(e) => error!("connection to {peer} closed: {e}"),
                }
            });
        }
    }
}

/// Serves one connection until the peer closes it.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    device: Arc<MeterDevice>,
    config: ServerConfig,
) -> Result<(), SimError> {
    let mut buf = vec![0u8; MAX_REQUEST_SIZE];
    loop {
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| SimError::Transport(e.to_string()))?;
        if n == 0 {
            return Ok(());
        }
        let request = &buf[..n];
        debug!("received from {peer}: {}", format_hex_compact(request));

        // Every inbound chunk advances the record set and rebuilds the
        // response telegram, whether or not it turns out to be a read.
        let telegram = device.response_telegram()?;

        match classify_frame(request) {
            InboundFrame::ShortFrameRequest { control, address } => {
                info!("short-frame read request (control {control:#04x}, address {address}) from {peer}");
                reply(&mut stream, &telegram, &device, &config, config.short_reply_delay).await?;
            }
            InboundFrame::LongFrameRead { control, address } => {
                info!("long-frame read request (dispatch {control:#04x}, address {address}) from {peer}");
                reply(&mut stream, &telegram, &device, &config, config.long_reply_delay).await?;
            }
            InboundFrame::LongFrameControl { control, .. } => {
                send_whole(&mut stream, &[MBUS_FRAME_ACK]).await?;
                info!("acknowledged long frame (dispatch {control:#04x}) from {peer}");
            }
            InboundFrame::Unrecognized => {
                warn!("unrecognized frame from {peer}: {}", format_hex_compact(request));
            }
        }
    }
}

/// Answers one read request according to the response mode.
async fn reply(
    stream: &mut TcpStream,
    telegram: &[u8],
    device: &MeterDevice,
    config: &ServerConfig,
    delay: Duration,
) -> Result<(), SimError> {
    match device.mode() {
        ResponseMode::Static => {
            send_whole(stream, telegram).await?;
            debug!("sent template telegram ({} bytes)", telegram.len());
        }
        ResponseMode::Live => {
            send_chunked(stream, telegram, &config.chunk_policy(delay)).await?;
        }
    }
    Ok(())
}
