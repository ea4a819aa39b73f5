//! Error types for timing stream processing.
//!
//! Only failures that stop the library from doing its job end up here:
//! bad configuration, unreadable capture files, a line source that breaks
//! or goes away. A malformed line from the device is *not* an error; the
//! parser reports it as a [`Rejection`](crate::protocol::Rejection) and the
//! stream carries on.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use fds_timing::TimingError;
//!
//! let error = TimingError::transport_failed("serial port closed");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for timing operations.
pub type Result<T, E = TimingError> = std::result::Result<T, E>;

/// Main error type for timing operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TimingError {
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Line source failed: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The line source ended or gave up; the connection takes no more commands.
    #[error("Timing device connection lost")]
    TransportLost,

    #[error("Timing driver is no longer running")]
    DriverStopped,
}

impl TimingError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TimingError::Transport { .. } => true,
            TimingError::TransportLost => true,
            TimingError::Config { .. } => false,
            TimingError::File { .. } => false,
            TimingError::Parse { .. } => false,
            TimingError::DriverStopped => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TimingError::Config { .. } => vec![
                "Use precision 2 or 3",
                "Keep the history capacity above zero",
                "Keep the arbitration window between 1 and 5000 ms",
            ],
            TimingError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            TimingError::Parse { .. } => vec![
                "Check the YAML syntax of the configuration",
                "Compare field names against the documented configuration keys",
            ],
            TimingError::Transport { .. } => vec![
                "Check the cable and the device power",
                "Reopen the serial port",
                "Verify the port settings (9600 baud, 8N1)",
            ],
            TimingError::TransportLost => vec![
                "Reconnect the timing device",
                "Create a fresh connection once the port is available again",
            ],
            TimingError::DriverStopped => vec!["Create a new connection"],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TimingError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TimingError::File { path, source }
    }

    /// Helper constructor for line source failures.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        TimingError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for line source failures with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TimingError::Transport { reason: reason.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for TimingError {
    fn from(err: std::io::Error) -> Self {
        TimingError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for TimingError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TimingError::Parse { context: "timing configuration".to_string(), details: err.to_string() }
    }
}
