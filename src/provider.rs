//! Line source trait for timing data transports

use crate::Result;

/// Trait for timing byte sources
///
/// A source hands over text exactly as the transport delivered it: chunk
/// boundaries need not line up with record terminators, the framer deals
/// with that. Sources handle their own pacing and waiting.
#[async_trait::async_trait]
pub trait LineSource: Send + 'static {
    /// Get the next chunk of device output
    ///
    /// Returns:
    /// - `Ok(Some(chunk))` - More data arrived
    /// - `Ok(None)` - Transport closed (normal termination)
    /// - `Err(e)` - Read failed; the driver retries with backoff
    ///
    /// The driver polls this alongside timers and commands, so it must be
    /// cancel safe: dropping the future before completion loses no data.
    async fn next_chunk(&mut self) -> Result<Option<String>>;

    /// Short human-readable description for logs
    fn describe(&self) -> String {
        "timing source".to_string()
    }
}
