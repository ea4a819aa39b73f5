//! Timing configuration
//!
//! Everything that differs between device generations and venues lives here
//! instead of in code: how strictly finish signals are accepted, whether
//! competing finish signals are arbitrated, which channel-1 clock readings
//! are really elapsed times, and how results are displayed.
//!
//! All fields have defaults, so a YAML file only needs to name what it
//! changes:
//!
//! ```rust
//! use fds_timing::config::{Acceptance, Arbitration, TimingConfig};
//!
//! let config = TimingConfig::from_yaml_str(
//!     r#"
//! policy:
//!   acceptance: strict_identity
//!   arbitration:
//!     buffered:
//!       window_ms: 100
//! display:
//!   precision: 3
//! "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.policy.acceptance, Acceptance::StrictIdentity);
//! assert_eq!(config.policy.arbitration, Arbitration::Buffered { window_ms: 100 });
//! assert_eq!(config.history_capacity, 100);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::protocol::{DEFAULT_MAX_LINE_LENGTH, DeltaRules};
use crate::results::{Precision, TimeFormat};
use crate::types::OutcomeRule;
use crate::{Result, TimingError};

/// Default number of results kept in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default finish arbitration window.
pub const DEFAULT_ARBITRATION_WINDOW_MS: u64 = 100;

/// Longest arbitration window accepted by [`TimingConfig::validate`].
pub const MAX_ARBITRATION_WINDOW_MS: u64 = 5_000;

/// Which finish signals may end a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    /// Any channel-1 delta finishes the active run.
    #[default]
    Permissive,
    /// The finish must carry the active user id, and (without buffered
    /// arbitration) an allow-listed channel token.
    StrictIdentity,
}

/// How competing finish signals for one run are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum Arbitration {
    /// First acceptable finish wins.
    #[default]
    Immediate,
    /// Allow-listed finishes win at once; other finishes wait `window_ms`
    /// for a better one before committing.
    Buffered {
        #[serde(default = "default_window_ms")]
        window_ms: u64,
    },
}

fn default_window_ms() -> u64 {
    DEFAULT_ARBITRATION_WINDOW_MS
}

impl Arbitration {
    /// Buffering window, if arbitration is buffered.
    pub fn window(&self) -> Option<Duration> {
        match self {
            Arbitration::Immediate => None,
            Arbitration::Buffered { window_ms } => Some(Duration::from_millis(*window_ms)),
        }
    }
}

/// What a channel-1 time of day means while a run is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum AbsoluteFinish {
    /// Dropped; only elapsed-time finishes count.
    #[default]
    Ignore,
    /// Elapsed time is derived from the start's wall clock.
    DeriveFromStart,
}

/// Session policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct PolicyConfig {
    pub acceptance: Acceptance,
    /// Written as `immediate` or `buffered: { window_ms: .. }`.
    #[serde(with = "serde_yaml_ng::with::singleton_map")]
    pub arbitration: Arbitration,
    pub delta_rules: DeltaRules,
    pub absolute_finish: AbsoluteFinish,
    pub outcome_rule: OutcomeRule,
}

/// How result times are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct DisplayConfig {
    pub precision: Precision,
    pub format: TimeFormat,
}

/// Top-level configuration for a timing connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct TimingConfig {
    pub policy: PolicyConfig,
    pub display: DisplayConfig,
    /// Results kept before the oldest is evicted.
    pub history_capacity: usize,
    /// Longest unterminated line the framer buffers.
    pub max_line_length: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            display: DisplayConfig::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl TimingConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: TimingConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        debug!(policy = ?config.policy, display = ?config.display, "Loaded timing configuration");
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(TimingError::config("history_capacity must be greater than zero"));
        }
        if self.max_line_length == 0 {
            return Err(TimingError::config("max_line_length must be greater than zero"));
        }
        if let Arbitration::Buffered { window_ms } = self.policy.arbitration {
            if !(1..=MAX_ARBITRATION_WINDOW_MS).contains(&window_ms) {
                return Err(TimingError::config(format!(
                    "arbitration window {window_ms}ms is outside 1..={MAX_ARBITRATION_WINDOW_MS}ms"
                )));
            }
        }
        Ok(())
    }
}
