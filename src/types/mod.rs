//! Core types for timing data representation.
//!
//! This module provides the vocabulary shared by the parser, the session
//! engine and consumers of timing events:
//! - [`Packet`] is the parsed form of one device line ([`ControlPacket`] or [`TimingPacket`])
//! - [`WallClockTime`] is a device time of day with tenth-of-millisecond fraction
//! - [`TimingEvent`] is what subscribers see (start, result, control pass-through)
//! - [`Diagnostic`] explains why a line or packet was dropped
//! - [`Outcome`] classifies a finished run
//!
//! ## Usage Example
//!
//! ```rust
//! use fds_timing::types::{Packet, TimeMode};
//!
//! let packet: Packet = "5 C0M 12:00:00.0000 0".parse().unwrap();
//! let timing = packet.as_timing().unwrap();
//! assert_eq!(timing.mode, TimeMode::Absolute);
//! assert!(timing.is_start_signal());
//! ```

mod event;
mod outcome;
mod packet;
mod update_rate;
mod wall_clock;

// Re-export all public types
pub use event::{Diagnostic, DiagnosticKind, SessionPhase, TimingEvent};
pub use outcome::{Outcome, OutcomeRule};
pub use packet::{ControlPacket, FINISH_CHANNEL, Packet, START_CHANNEL, TimeMode, TimingPacket};
pub use update_rate::{NATIVE_HZ, NATIVE_REFRESH, UpdateRate};
pub use wall_clock::{FRACTION_SCALE, WallClockTime};
