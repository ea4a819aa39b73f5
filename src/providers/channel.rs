//! Channel-fed source for host-owned transports
//!
//! The host keeps the serial port (or socket, or test harness) and pushes
//! whatever it reads through a [`ChunkSender`]. Dropping every sender closes
//! the source, which the driver treats as transport loss.

use tokio::sync::mpsc;
use tracing::trace;

use crate::provider::LineSource;
use crate::{Result, TimingError};

/// Chunks queued before `send` waits.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Handle the host uses to push received data.
#[derive(Debug, Clone)]
pub struct ChunkSender {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChunkSender {
    /// Push text as received.
    pub async fn send(&self, chunk: impl Into<String>) -> Result<()> {
        self.send_bytes(chunk.into().into_bytes()).await
    }

    /// Push raw bytes as received.
    pub async fn send_bytes(&self, chunk: impl Into<Vec<u8>>) -> Result<()> {
        self.tx.send(chunk.into()).await.map_err(|_| TimingError::DriverStopped)
    }

    /// Non-blocking push for callbacks that cannot await.
    pub fn try_send(&self, chunk: impl Into<String>) -> Result<()> {
        self.tx.try_send(chunk.into().into_bytes()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                TimingError::transport_failed("timing input queue is full")
            }
            mpsc::error::TrySendError::Closed(_) => TimingError::DriverStopped,
        })
    }

    /// Whether the receiving driver has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Source fed by one or more [`ChunkSender`]s.
#[derive(Debug)]
pub struct ChannelProvider {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelProvider {
    pub fn new() -> (ChunkSender, Self) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ChunkSender { tx }, Self { rx })
    }
}

#[async_trait::async_trait]
impl LineSource for ChannelProvider {
    async fn next_chunk(&mut self) -> Result<Option<String>> {
        match self.rx.recv().await {
            Some(bytes) => {
                trace!(len = bytes.len(), "Chunk received from host");
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        "host channel".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_arrive_in_order_and_close_ends_stream() {
        let (sender, mut provider) = ChannelProvider::new();
        sender.send("5 C0M 12:00").await.unwrap();
        sender.send_bytes(b":00.0000 0\r".to_vec()).await.unwrap();
        drop(sender);

        assert_eq!(provider.next_chunk().await.unwrap().as_deref(), Some("5 C0M 12:00"));
        assert_eq!(provider.next_chunk().await.unwrap().as_deref(), Some(":00.0000 0\r"));
        assert_eq!(provider.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let (sender, mut provider) = ChannelProvider::new();
        sender.send_bytes(vec![b'n', 0xff, b'1']).await.unwrap();
        let chunk = provider.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk, "n\u{fffd}1");
    }

    #[tokio::test]
    async fn try_send_reports_full_and_closed() {
        let (sender, provider) = ChannelProvider::with_capacity(1);
        sender.try_send("n1").unwrap();
        assert!(matches!(sender.try_send("n2"), Err(TimingError::Transport { .. })));

        drop(provider);
        assert!(sender.is_closed());
        assert!(matches!(sender.send("n3").await, Err(TimingError::DriverStopped)));
    }
}
