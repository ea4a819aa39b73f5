//! Running clock stream
//!
//! The device only reports a start and a finish; between the two a display
//! wants a clock that counts up. [`RunningClock`] ticks at an
//! [`UpdateRate`] and reports the local elapsed time of the active run,
//! always using the newest session snapshot available at the tick.

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval};

use crate::driver::SessionSnapshot;
use crate::results::{Precision, TimeFormat, format_time};
use crate::types::{SessionPhase, UpdateRate};

/// One tick of the running clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    pub phase: SessionPhase,
    pub active_user_id: Option<u32>,
    /// Zero while idle.
    pub elapsed: Duration,
}

impl ClockReading {
    pub fn at(snapshot: &SessionSnapshot, now: Instant) -> Self {
        Self {
            phase: snapshot.phase,
            active_user_id: snapshot.active_user_id,
            elapsed: snapshot.elapsed(now).unwrap_or_default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Elapsed time rendered like a result.
    pub fn display(&self, precision: Precision, format: TimeFormat) -> String {
        format_time(self.elapsed.as_secs_f64(), precision, format)
    }
}

pin_project! {
    /// A stream combinator that samples session snapshots on a fixed tick
    pub struct RunningClock<S> {
        #[pin]
        updates: S,
        interval: Interval,
        latest: SessionSnapshot,
    }
}

impl<S> RunningClock<S>
where
    S: Stream<Item = SessionSnapshot>,
{
    /// Create a clock over a stream of session snapshots.
    pub fn new(updates: S, rate: UpdateRate) -> Self {
        let mut interval = interval(rate.period());
        // Delay rather than burst after a stall
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { updates, interval, latest: SessionSnapshot::default() }
    }
}

impl<S> Stream for RunningClock<S>
where
    S: Stream<Item = SessionSnapshot>,
{
    type Item = ClockReading;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain all available snapshots, keeping only the latest
        loop {
            match this.updates.as_mut().poll_next(cx) {
                Poll::Ready(Some(snapshot)) => *this.latest = snapshot,
                // Session source is gone
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => break,
            }
        }

        ready!(this.interval.poll_tick(cx));
        Poll::Ready(Some(ClockReading::at(this.latest, Instant::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::watch;
    use tokio_stream::wrappers::WatchStream;

    fn running(started_at: Instant) -> SessionSnapshot {
        SessionSnapshot {
            phase: SessionPhase::Running,
            active_user_id: Some(7),
            started_at: Some(started_at),
            ..SessionSnapshot::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_clock_reads_zero() {
        let (_tx, rx) = watch::channel(SessionSnapshot::default());
        let mut clock = RunningClock::new(WatchStream::new(rx), UpdateRate::Native);

        let reading = clock.next().await.unwrap();
        assert!(!reading.is_running());
        assert_eq!(reading.elapsed, Duration::ZERO);
        assert_eq!(reading.display(Precision::TWO, TimeFormat::TotalSeconds), "0.00");
    }

    #[tokio::test(start_paused = true)]
    async fn running_clock_counts_up_at_rate() {
        let started = Instant::now();
        let (_tx, rx) = watch::channel(running(started));
        let mut clock = RunningClock::new(WatchStream::new(rx), UpdateRate::Max(4));

        let first = clock.next().await.unwrap();
        assert!(first.is_running());
        assert_eq!(first.active_user_id, Some(7));

        let second = clock.next().await.unwrap();
        assert_eq!(second.elapsed - first.elapsed, Duration::from_millis(250));
        let third = clock.next().await.unwrap();
        assert_eq!(third.elapsed, Duration::from_millis(500));
        assert_eq!(third.display(Precision::THREE, TimeFormat::TotalSeconds), "0.500");
    }

    #[tokio::test(start_paused = true)]
    async fn follows_latest_snapshot_and_ends_with_sender() {
        let (tx, rx) = watch::channel(running(Instant::now()));
        let mut clock = RunningClock::new(WatchStream::new(rx), UpdateRate::Native);
        assert!(clock.next().await.unwrap().is_running());

        tx.send_replace(SessionSnapshot::default());
        let reading = clock.next().await.unwrap();
        assert!(!reading.is_running());
        assert_eq!(reading.elapsed, Duration::ZERO);

        drop(tx);
        assert!(clock.next().await.is_none());
    }
}
