//! Events and diagnostics emitted by the session engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Outcome, TimeMode, WallClockTime};
use crate::protocol::Rejection;

/// Whether a run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Running,
}

/// Event delivered to display routing, forwarders and recorders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimingEvent {
    /// A run started.
    Start { user_id: u32, wall_clock_time: Option<WallClockTime> },
    /// A run finished and was recorded.
    Result { user_id: u32, time_seconds: f64, outcome: Outcome, display_string: String },
    /// Informational control token, passed through untouched.
    Control { command: String },
}

/// Why a line or packet did not change the session.
///
/// None of these are failures of the library; noisy hardware produces them
/// routinely. They are logged at debug level and handed to the diagnostic
/// sink if one is attached.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("malformed line '{line}': {reason}")]
    MalformedLine { line: String, reason: Rejection },

    #[error("{channel} from user {user_id} out of sequence while {phase:?}")]
    OutOfSequence { user_id: u32, channel: String, phase: SessionPhase },

    #[error("finish from user {got} does not match active user {expected}")]
    IdentityMismatch { expected: u32, got: u32, channel: String },

    #[error("finish channel '{channel}' from user {user_id} is not trusted")]
    NotAllowListed { user_id: u32, channel: String },

    #[error("{channel} from user {user_id} with {mode:?} time has no session meaning")]
    Ignored { user_id: u32, channel: String, mode: TimeMode },

    #[error("finish candidate '{channel}' from user {user_id} lost arbitration")]
    Superseded { user_id: u32, channel: String },
}

/// Coarse category of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    MalformedLine,
    OutOfSequenceSignal,
    IdentityMismatch,
    Ignored,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::MalformedLine { .. } => DiagnosticKind::MalformedLine,
            Diagnostic::OutOfSequence { .. } => DiagnosticKind::OutOfSequenceSignal,
            Diagnostic::IdentityMismatch { .. } => DiagnosticKind::IdentityMismatch,
            Diagnostic::NotAllowListed { .. }
            | Diagnostic::Ignored { .. }
            | Diagnostic::Superseded { .. } => DiagnosticKind::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_kinds() {
        let malformed =
            Diagnostic::MalformedLine { line: "x".to_string(), reason: Rejection::TokenCount(1) };
        assert_eq!(malformed.kind(), DiagnosticKind::MalformedLine);

        let mismatch = Diagnostic::IdentityMismatch { expected: 5, got: 6, channel: "c1".into() };
        assert_eq!(mismatch.kind(), DiagnosticKind::IdentityMismatch);
        assert!(mismatch.to_string().contains("active user 5"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = TimingEvent::Control { command: "n1".to_string() };
        let yaml = serde_yaml_ng::to_string(&event).unwrap();
        assert!(yaml.contains("type: control"));
        assert!(yaml.contains("command: n1"));
    }
}
