//! Arbitration timer port
//!
//! The session never touches a clock API directly. It asks an
//! [`ArbitrationTimer`] to fire once after a delay and is later told which
//! [`TimerToken`] expired. Tokens are unique per arming, so an expiry that
//! races with a cancel or re-arm is recognised as stale and ignored.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Identifies one arming of an [`ArbitrationTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Single-shot, cancellable delayed callback.
pub trait ArbitrationTimer: Send {
    /// Schedule an expiry after `delay`. Implementations only need to keep
    /// the latest arming alive; the session cancels before re-arming.
    fn arm(&mut self, delay: Duration) -> TimerToken;

    /// Cancel an arming. Unknown or already-fired tokens are ignored.
    fn cancel(&mut self, token: TimerToken);
}

/// Tokio-backed timer delivering expired tokens on a channel.
///
/// Must be armed from within a tokio runtime.
#[derive(Debug)]
pub struct TokioTimer {
    expired_tx: mpsc::UnboundedSender<TimerToken>,
    next_id: u64,
    pending: Option<(TimerToken, JoinHandle<()>)>,
}

impl TokioTimer {
    /// Create a timer and the receiver its expiries arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        (Self { expired_tx, next_id: 0, pending: None }, expired_rx)
    }
}

impl ArbitrationTimer for TokioTimer {
    fn arm(&mut self, delay: Duration) -> TimerToken {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }

        self.next_id += 1;
        let token = TimerToken(self.next_id);
        let tx = self.expired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(token);
        });
        trace!(token = token.0, ?delay, "Arbitration timer armed");
        self.pending = Some((token, handle));
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some((pending, handle)) = self.pending.take() {
            if pending == token {
                handle.abort();
                trace!(token = token.0, "Arbitration timer cancelled");
            } else {
                self.pending = Some((pending, handle));
            }
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Timer that never fires by itself.
///
/// Tests and synchronous hosts read [`armed`](Self::armed) and hand the
/// token back to the session when they decide the window has elapsed.
#[derive(Debug, Default, Clone)]
pub struct ManualTimer {
    next_id: u64,
    armed: Option<(TimerToken, Duration)>,
    arm_count: usize,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently armed token, if any.
    pub fn armed(&self) -> Option<TimerToken> {
        self.armed.map(|(token, _)| token)
    }

    /// Delay of the current arming.
    pub fn armed_delay(&self) -> Option<Duration> {
        self.armed.map(|(_, delay)| delay)
    }

    /// Times `arm` was called.
    pub fn arm_count(&self) -> usize {
        self.arm_count
    }
}

impl ArbitrationTimer for ManualTimer {
    fn arm(&mut self, delay: Duration) -> TimerToken {
        self.next_id += 1;
        self.arm_count += 1;
        let token = TimerToken(self.next_id);
        self.armed = Some((token, delay));
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if self.armed() == Some(token) {
            self.armed = None;
        }
    }
}
