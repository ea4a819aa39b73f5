//! Session state machine
//!
//! A [`Session`] follows one physical timer through `Idle → Running → Idle`.
//! Start impulses (channel 0, time of day) open a run; finish impulses
//! (channel 1) close it, subject to the configured [`PolicyConfig`]:
//!
//! - **Acceptance**: permissive takes any channel-1 finish; strict identity
//!   requires the starting user id and, without buffering, a trusted
//!   channel token (`c1`, `c1M`, `RT`, `RTM`).
//! - **Arbitration**: immediate commits the first acceptable finish;
//!   buffered holds untrusted finishes for a short window in case a trusted
//!   one follows.
//! - **Absolute finishes**: ignored, or converted to elapsed time from the
//!   start's wall clock.
//!
//! The session performs no I/O. Every packet yields exactly one
//! [`Transition`] describing what happened, and the buffered window is
//! driven through the [`ArbitrationTimer`] port.

mod arbitration;
mod timer;


pub use arbitration::{Candidate, Priority};
pub use timer::{ArbitrationTimer, ManualTimer, TimerToken, TokioTimer};

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use arbitration::FinishBuffer;
use crate::config::{AbsoluteFinish, Acceptance, PolicyConfig};
use crate::types::{
    Diagnostic, FINISH_CHANNEL, Outcome, Packet, START_CHANNEL, SessionPhase, TimeMode,
    TimingPacket, WallClockTime,
};

/// Where the session is.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running {
        user_id: u32,
        /// Local capture point for the running clock.
        started_at: Instant,
        /// Device time of day of the start impulse.
        wall_clock: Option<WallClockTime>,
    },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Running { .. } => SessionPhase::Running,
        }
    }

    pub fn active_user_id(&self) -> Option<u32> {
        match self {
            SessionState::Idle => None,
            SessionState::Running { user_id, .. } => Some(*user_id),
        }
    }

    pub fn started_at(&self) -> Option<Instant> {
        match self {
            SessionState::Idle => None,
            SessionState::Running { started_at, .. } => Some(*started_at),
        }
    }

    pub fn start_wall_clock(&self) -> Option<WallClockTime> {
        match self {
            SessionState::Idle => None,
            SessionState::Running { wall_clock, .. } => *wall_clock,
        }
    }
}

/// A committed finish.
#[derive(Debug, Clone, PartialEq)]
pub struct Finish {
    pub user_id: u32,
    pub time_seconds: f64,
    pub status: i32,
    pub outcome: Outcome,
    /// Channel token of the finish that won.
    pub channel: String,
}

/// What one packet did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Started { user_id: u32, wall_clock_time: Option<WallClockTime> },
    Finished(Finish),
    /// Control token, passed through without touching state.
    Control { command: String },
    /// Finish candidate held for the arbitration window.
    Buffered { user_id: u32, channel: String },
    Dropped(Diagnostic),
}

/// Start/finish state machine for one timer connection.
#[derive(Debug)]
pub struct Session<T: ArbitrationTimer> {
    policy: PolicyConfig,
    state: SessionState,
    buffer: FinishBuffer,
    timer: T,
}

impl<T: ArbitrationTimer> Session<T> {
    pub fn new(policy: PolicyConfig, timer: T) -> Self {
        Self { policy, state: SessionState::Idle, buffer: FinishBuffer::default(), timer }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn active_user_id(&self) -> Option<u32> {
        self.state.active_user_id()
    }

    /// Finish candidate waiting on the arbitration window.
    pub fn pending_candidate(&self) -> Option<&Candidate> {
        self.buffer.candidate()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Local elapsed time of the active run.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Running { started_at, .. } => Some(now.saturating_duration_since(started_at)),
        }
    }

    /// Apply one packet. `now` is recorded as the local start point when the
    /// packet opens a run.
    pub fn handle(&mut self, packet: &Packet, now: Instant) -> Transition {
        match packet {
            Packet::Control(control) => Transition::Control { command: control.command.clone() },
            Packet::Timing(timing) => match timing.channel_number {
                START_CHANNEL => self.handle_start(timing, now),
                FINISH_CHANNEL => self.handle_finish(timing),
                _ => Transition::Dropped(ignored(timing)),
            },
        }
    }

    /// Commit the buffered candidate if `token` is the live arming.
    /// Stale tokens return `None`.
    pub fn on_timer(&mut self, token: TimerToken) -> Option<Finish> {
        let candidate = self.buffer.release(token)?;
        if self.state.phase() == SessionPhase::Idle {
            debug!(token = token.id(), "Arbitration window closed with no active run");
            return None;
        }
        Some(self.commit(candidate))
    }

    /// Back to `Idle`, cancelling any pending arbitration.
    pub fn reset(&mut self) {
        self.discard_buffer();
        if let Some(user_id) = self.state.active_user_id() {
            info!(user_id, "Run abandoned");
        }
        self.state = SessionState::Idle;
    }

    fn handle_start(&mut self, timing: &TimingPacket, now: Instant) -> Transition {
        if timing.mode != TimeMode::Absolute {
            return Transition::Dropped(ignored(timing));
        }
        if self.state.phase() == SessionPhase::Running {
            return Transition::Dropped(out_of_sequence(timing, SessionPhase::Running));
        }

        self.discard_buffer();
        self.state = SessionState::Running {
            user_id: timing.user_id,
            started_at: now,
            wall_clock: timing.absolute_time,
        };
        info!(
            user_id = timing.user_id,
            channel = %timing.original_channel_string,
            time = %timing.original_time_string,
            "Run started"
        );
        Transition::Started { user_id: timing.user_id, wall_clock_time: timing.absolute_time }
    }

    fn handle_finish(&mut self, timing: &TimingPacket) -> Transition {
        let (active_user, start_clock) = match self.state {
            SessionState::Idle => {
                return Transition::Dropped(out_of_sequence(timing, SessionPhase::Idle));
            }
            SessionState::Running { user_id, wall_clock, .. } => (user_id, wall_clock),
        };

        let time_seconds = match (timing.mode, self.policy.absolute_finish) {
            (TimeMode::Delta, _) => timing.delta_time,
            (TimeMode::Absolute, AbsoluteFinish::DeriveFromStart) => {
                match (timing.absolute_time, start_clock) {
                    (Some(finish), Some(start)) => finish.seconds_since(&start),
                    _ => return Transition::Dropped(ignored(timing)),
                }
            }
            (TimeMode::Absolute, AbsoluteFinish::Ignore) => {
                return Transition::Dropped(ignored(timing));
            }
        };

        let strict = self.policy.acceptance == Acceptance::StrictIdentity;
        if strict && timing.user_id != active_user {
            return Transition::Dropped(Diagnostic::IdentityMismatch {
                expected: active_user,
                got: timing.user_id,
                channel: timing.original_channel_string.clone(),
            });
        }

        let trusted = timing.is_allow_listed_finish();
        let candidate = Candidate {
            user_id: timing.user_id,
            time_seconds,
            status: timing.status,
            channel: timing.original_channel_string.clone(),
            priority: if trusted { Priority::Trusted } else { Priority::Low },
        };

        let Some(window) = self.policy.arbitration.window() else {
            if strict && !trusted {
                return Transition::Dropped(Diagnostic::NotAllowListed {
                    user_id: timing.user_id,
                    channel: timing.original_channel_string.clone(),
                });
            }
            return Transition::Finished(self.commit(candidate));
        };

        if candidate.priority == Priority::Trusted {
            if let Some((displaced, token)) = self.buffer.clear() {
                self.timer.cancel(token);
                debug!(
                    user_id = displaced.user_id,
                    channel = %displaced.channel,
                    "Buffered finish replaced by trusted finish"
                );
            }
            return Transition::Finished(self.commit(candidate));
        }

        match self.buffer.token() {
            Some(previous) => {
                // First low-priority candidate keeps its place; the window restarts.
                self.timer.cancel(previous);
                let token = self.timer.arm(window);
                self.buffer.rearm(token);
                Transition::Dropped(Diagnostic::Superseded {
                    user_id: candidate.user_id,
                    channel: candidate.channel,
                })
            }
            None => {
                let token = self.timer.arm(window);
                debug!(
                    user_id = candidate.user_id,
                    channel = %candidate.channel,
                    window_ms = window.as_millis() as u64,
                    "Finish buffered for arbitration"
                );
                let transition = Transition::Buffered {
                    user_id: candidate.user_id,
                    channel: candidate.channel.clone(),
                };
                self.buffer.hold(candidate, token);
                transition
            }
        }
    }

    fn commit(&mut self, candidate: Candidate) -> Finish {
        self.state = SessionState::Idle;
        let outcome =
            Outcome::classify(candidate.time_seconds, candidate.status, self.policy.outcome_rule);
        info!(
            user_id = candidate.user_id,
            channel = %candidate.channel,
            time_seconds = candidate.time_seconds,
            outcome = outcome.label(),
            "Run finished"
        );
        Finish {
            user_id: candidate.user_id,
            time_seconds: candidate.time_seconds,
            status: candidate.status,
            outcome,
            channel: candidate.channel,
        }
    }

    fn discard_buffer(&mut self) {
        if let Some((candidate, token)) = self.buffer.clear() {
            self.timer.cancel(token);
            debug!(
                user_id = candidate.user_id,
                channel = %candidate.channel,
                "Discarded buffered finish"
            );
        }
    }
}

fn ignored(timing: &TimingPacket) -> Diagnostic {
    Diagnostic::Ignored {
        user_id: timing.user_id,
        channel: timing.original_channel_string.clone(),
        mode: timing.mode,
    }
}

fn out_of_sequence(timing: &TimingPacket, phase: SessionPhase) -> Diagnostic {
    Diagnostic::OutOfSequence {
        user_id: timing.user_id,
        channel: timing.original_channel_string.clone(),
        phase,
    }
}
