//! Finish candidate buffering
//!
//! Noisy installations can emit more than one plausible finish line for a
//! single beam break. Under buffered arbitration the first low-priority
//! candidate waits for the window; a trusted (allow-listed) candidate
//! arriving in that window replaces it and commits at once.

use super::timer::TimerToken;

/// Relative trust in a finish candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Trusted,
}

/// A finish waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub user_id: u32,
    pub time_seconds: f64,
    pub status: i32,
    pub channel: String,
    pub priority: Priority,
}

/// At most one buffered candidate plus the timer arming that will commit it.
#[derive(Debug, Default)]
pub(crate) struct FinishBuffer {
    held: Option<(Candidate, TimerToken)>,
}

impl FinishBuffer {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.held.is_none()
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        self.held.as_ref().map(|(candidate, _)| candidate)
    }

    pub fn token(&self) -> Option<TimerToken> {
        self.held.as_ref().map(|(_, token)| *token)
    }

    /// Hold `candidate` until `token` expires.
    pub fn hold(&mut self, candidate: Candidate, token: TimerToken) {
        self.held = Some((candidate, token));
    }

    /// Point the held candidate at a new arming.
    pub fn rearm(&mut self, token: TimerToken) {
        if let Some((_, held)) = self.held.as_mut() {
            *held = token;
        }
    }

    /// Release the candidate if `token` is the live arming.
    pub fn release(&mut self, token: TimerToken) -> Option<Candidate> {
        match self.held.take() {
            Some((candidate, held)) if held == token => Some(candidate),
            other => {
                self.held = other;
                None
            }
        }
    }

    /// Drop everything, returning the arming to cancel.
    pub fn clear(&mut self) -> Option<(Candidate, TimerToken)> {
        self.held.take()
    }
}
