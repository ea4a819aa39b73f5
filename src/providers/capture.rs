//! Replay of raw device captures
//!
//! A capture is the device output written to disk byte for byte, record
//! terminators included. Replaying it in small paced chunks exercises the
//! framer the same way a live serial port does.

use std::path::{Path, PathBuf};
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace};

use crate::provider::LineSource;
use crate::{Result, TimingError};

/// Payload throughput of a 9600 baud 8N1 link.
pub const SERIAL_BYTES_PER_SECOND: f64 = 960.0;

/// Bytes handed over per read.
pub const DEFAULT_CHUNK_SIZE: usize = 16;

/// Replay provider for capture files
pub struct CaptureProvider {
    /// Capture contents
    data: Vec<u8>,

    /// Next byte to hand out
    position: usize,

    chunk_size: usize,

    /// Playback speed multiplier (1.0 = serial line rate)
    speed: f64,

    /// Chunk pacing
    interval: Interval,

    /// Where the capture came from, for logs
    origin: Option<PathBuf>,
}

impl CaptureProvider {
    /// Load a capture file.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        info!(path = %path.display(), bytes = data.len(), "Opened timing capture");

        let mut provider = Self::from_bytes(data);
        provider.origin = Some(path.to_path_buf());
        Ok(provider)
    }

    /// Replay an in-memory capture. Must be called inside a tokio runtime.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let chunk_size = DEFAULT_CHUNK_SIZE;
        let speed = 1.0;
        Self {
            data: data.into(),
            position: 0,
            chunk_size,
            speed,
            interval: pacing(chunk_size, speed),
            origin: None,
        }
    }

    /// Change the read size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.interval = pacing(self.chunk_size, self.speed);
        self
    }

    /// Set playback speed
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 10.0);
        self.interval = pacing(self.chunk_size, self.speed);
        debug!("Playback speed set to {}x", self.speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Bytes replayed and total bytes.
    pub fn progress(&self) -> (usize, usize) {
        (self.position, self.data.len())
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Delay between chunks at the current speed.
    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

fn pacing(chunk_size: usize, speed: f64) -> Interval {
    let period = Duration::from_secs_f64(chunk_size as f64 / (SERIAL_BYTES_PER_SECOND * speed));
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[async_trait::async_trait]
impl LineSource for CaptureProvider {
    async fn next_chunk(&mut self) -> Result<Option<String>> {
        if self.is_finished() {
            debug!("Reached end of capture");
            return Ok(None);
        }

        self.interval.tick().await;

        let end = (self.position + self.chunk_size).min(self.data.len());
        let chunk = String::from_utf8_lossy(&self.data[self.position..end]).into_owned();
        self.position = end;
        trace!(position = self.position, total = self.data.len(), "Capture chunk");

        Ok(Some(chunk))
    }

    fn describe(&self) -> String {
        match &self.origin {
            Some(path) => format!("capture {}", path.display()),
            None => "in-memory capture".to_string(),
        }
    }
}
