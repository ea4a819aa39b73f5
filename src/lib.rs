//! Type-safe Rust library for ALGE/FDS timing device streams.
//!
//! FDS Timing turns the line-oriented text a timing device writes to its
//! serial port into start/finish events and a bounded result history, with
//! first-class support for both live and recorded sources.
//!
//! # Features
//!
//! - **Robust framing**: `\r`-terminated records reassembled across arbitrary
//!   chunk boundaries, noisy lines rejected without stopping the stream
//! - **Session engine**: one active run per timer, strict or permissive finish
//!   acceptance, and a short arbitration window for competing finish channels
//! - **Results**: configurable display precision, re-rendering on change, CSV
//!   export
//! - **Replay**: recorded captures played back at device pace
//!
//! # Quick Start
//!
//! ## Example (host-fed serial data)
//!
//! ```rust,no_run
//! use fds_timing::{FdsTiming, TimingConfig, TimingEvent};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (sender, connection) = FdsTiming::channel(&TimingConfig::default())?;
//!     let mut events = Box::pin(connection.subscribe());
//!
//!     // Bytes read from the serial port, in whatever chunks they arrive
//!     sender.send("5 C0M 12:00:00.0000 0\r5 c1 45.6700 0\r").await?;
//!
//!     while let Some(event) = events.next().await {
//!         if let TimingEvent::Result { display_string, .. } = event {
//!             println!("Result: {display_string}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Protocol and engine
pub mod pipeline;
pub mod protocol;
pub mod results;
pub mod session;

// Stream-based runtime
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

// Core exports
pub use config::{DisplayConfig, PolicyConfig, TimingConfig};
pub use error::*;
pub use types::*;

// Main API exports
pub use connection::TimerConnection;
pub use pipeline::TimingCore;
pub use protocol::{PacketParser, Rejection, parse};
pub use results::{Precision, ResultHistory, RunResult, TimeFormat};

use providers::ChunkSender;

/// Unified entry point for timing connections.
///
/// This factory provides a consistent API for creating connections to a
/// recorded capture, a host-fed byte channel or any custom [`LineSource`].
///
/// # Examples
///
/// ## Capture Replay
/// ```rust,no_run
/// use fds_timing::{FdsTiming, TimingConfig};
///
/// #[tokio::main]
/// async fn main() -> fds_timing::Result<()> {
///     let connection = FdsTiming::open("training.log", &TimingConfig::default()).await?;
///     // Use connection...
///     Ok(())
/// }
/// ```
///
/// [`LineSource`]: crate::provider::LineSource
pub struct FdsTiming;

impl FdsTiming {
    /// Replay a capture file at device pace.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the file cannot
    /// be read.
    pub async fn open<P: AsRef<std::path::Path>>(
        path: P,
        config: &TimingConfig,
    ) -> Result<TimerConnection> {
        TimerConnection::open(path, config).await
    }

    /// Connection fed with raw chunks through the returned [`ChunkSender`].
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use fds_timing::{FdsTiming, TimingConfig};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> fds_timing::Result<()> {
    /// let (sender, connection) = FdsTiming::channel(&TimingConfig::default())?;
    /// sender.send("n0042\r").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn channel(config: &TimingConfig) -> Result<(ChunkSender, TimerConnection)> {
        TimerConnection::channel(config)
    }

    /// Connection over a custom line source.
    pub fn attach<S: provider::LineSource>(source: S, config: &TimingConfig) -> Result<TimerConnection> {
        TimerConnection::attach(source, config)
    }
}
