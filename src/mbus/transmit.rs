//! # Outbound Telegram Transmission
//!
//! Streams a response telegram to the connected peer. Live-mode replies
//! are split into bounded chunks with a pause after every write, the way
//! slow meter hardware trickles a long frame onto the bus. An optional
//! abort threshold stops a transmission partway through so clients can be
//! exercised against a link that dies mid-telegram.
//!
//! The writer is generic over [`tokio::io::AsyncWrite`], which keeps the
//! chunking logic testable against in-memory pipes.

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_LONG_REPLY_DELAY};
use crate::error::SimError;
use log::{debug, info};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;

/// How an outbound telegram is split on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// Largest number of bytes written at once
    pub chunk_size: usize,
    /// Pause after each chunk
    pub delay: Duration,
    /// Stop permanently once this many chunks have been written
    pub abort_after: Option<usize>,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        ChunkPolicy {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delay: DEFAULT_LONG_REPLY_DELAY,
            abort_after: None,
        }
    }
}

/// Writes a telegram in consecutive chunks with an inter-chunk pause.
///
/// With an abort threshold set, transmission stops for good once the
/// threshold is reached; the remainder is never written and the peer is
/// not told. The peer can only notice the missing tail through its own
/// idle timeout, which is exactly the link failure being simulated.
pub async fn send_chunked<W>(
    writer: &mut W,
    telegram: &[u8],
    policy: &ChunkPolicy,
) -> Result<(), SimError>
where
    W: AsyncWrite + Unpin,
{
    // chunks(0) panics
    let chunk_size = policy.chunk_size.max(1);
    debug!(
        "sending {} bytes in {}-byte chunks (delay {:?})",
        telegram.len(),
        chunk_size,
        policy.delay
    );

    let mut sent = 0usize;
    for (index, chunk) in telegram.chunks(chunk_size).enumerate() {
        if policy.abort_after == Some(index) {
            info!("aborting transmission after {index} chunks");
            return Ok(());
        }
        writer
            .write_all(chunk)
            .await
            .map_err(|e| SimError::Transport(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| SimError::Transport(e.to_string()))?;
        debug!("sent bytes {}..{}", sent, sent + chunk.len());
        sent += chunk.len();
        sleep(policy.delay).await;
    }
    debug!("finished sending full telegram");
    Ok(())
}

/// Writes a telegram as one unchunked write with no delay.
///
/// Static-mode replies and acknowledgements take this path.
pub async fn send_whole<W>(writer: &mut W, telegram: &[u8]) -> Result<(), SimError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(telegram)
        .await
        .map_err(|e| SimError::Transport(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| SimError::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_chunked_send_delivers_whole_telegram() {
        let (mut tx, mut rx) = duplex(256);
        let telegram: Vec<u8> = (0..80u8).collect();
        let policy = ChunkPolicy {
            chunk_size: 24,
            delay: Duration::from_millis(1),
            abort_after: None,
        };

        send_chunked(&mut tx, &telegram, &policy).await.unwrap();
        drop(tx);

        let mut received = Vec::new();
        rx.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, telegram);
    }

    #[tokio::test]
    async fn test_abort_stops_after_three_chunks() {
        let (mut tx, mut rx) = duplex(256);
        let telegram = vec![0xAAu8; 80];
        let policy = ChunkPolicy {
            chunk_size: 24,
            delay: Duration::from_millis(1),
            abort_after: Some(3),
        };

        send_chunked(&mut tx, &telegram, &policy).await.unwrap();
        drop(tx);

        let mut received = Vec::new();
        rx.read_to_end(&mut received).await.unwrap();
        // 3 chunks of 24 bytes, then silence
        assert_eq!(received.len(), 72);
    }

    #[tokio::test]
    async fn test_abort_threshold_beyond_telegram_sends_everything() {
        let (mut tx, mut rx) = duplex(256);
        let telegram = vec![0x55u8; 40];
        let policy = ChunkPolicy {
            chunk_size: 24,
            delay: Duration::from_millis(1),
            abort_after: Some(10),
        };

        send_chunked(&mut tx, &telegram, &policy).await.unwrap();
        drop(tx);

        let mut received = Vec::new();
        rx.read_to_end(&mut received).await.unwrap();
        assert_eq!(received.len(), 40);
    }

    #[tokio::test]
    async fn test_whole_send_has_no_chunking() {
        let (mut tx, mut rx) = duplex(256);
        let telegram: Vec<u8> = (0..100u8).collect();

        send_whole(&mut tx, &telegram).await.unwrap();
        drop(tx);

        let mut received = Vec::new();
        rx.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, telegram);
    }
}
