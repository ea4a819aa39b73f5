//! Coarse classification of a finished run

use serde::{Deserialize, Serialize};

/// How a finished run is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Clean,
    Fault,
    Zero,
    Negative,
}

/// Which fields decide the [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum OutcomeRule {
    /// Sign of the time only.
    #[default]
    Sign,
    /// A non-zero device status marks the run as a fault; otherwise the sign
    /// decides.
    StatusOverridesSign,
}

impl Outcome {
    /// Classify by the sign of the time alone.
    pub fn from_sign(time_seconds: f64) -> Self {
        if time_seconds < 0.0 {
            Outcome::Negative
        } else if time_seconds == 0.0 {
            Outcome::Zero
        } else {
            Outcome::Clean
        }
    }

    /// Classify a finish using the configured rule.
    pub fn classify(time_seconds: f64, status: i32, rule: OutcomeRule) -> Self {
        match rule {
            OutcomeRule::StatusOverridesSign if status != 0 => Outcome::Fault,
            _ => Outcome::from_sign(time_seconds),
        }
    }

    /// Lowercase label used in exports.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Clean => "clean",
            Outcome::Fault => "fault",
            Outcome::Zero => "zero",
            Outcome::Negative => "negative",
        }
    }

    pub fn is_fault(self) -> bool {
        matches!(self, Outcome::Fault)
    }
}
