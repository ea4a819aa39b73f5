//! Driver spawns and manages the timing processing task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::config::{DisplayConfig, TimingConfig};
use crate::pipeline::TimingCore;
use crate::provider::LineSource;
use crate::results::{Precision, ResultHistory};
use crate::session::{TimerToken, TokioTimer};
use crate::types::{Diagnostic, SessionPhase, TimingEvent, WallClockTime};

/// Consecutive source errors tolerated before the transport counts as lost.
const MAX_ERRORS: u32 = 10;

/// Buffered events per subscriber before it starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Queued host commands.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Host requests handled by the driver task in order with incoming data.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Abandon the active run; keep results.
    Reset,
    ClearResults,
    SetPrecision(Precision),
    SetDisplay(DisplayConfig),
    /// Treat the transport as gone and stop.
    Disconnect,
}

/// Published view of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub active_user_id: Option<u32>,
    /// Local capture point of the active run's start.
    pub started_at: Option<Instant>,
    /// Device time of day of the active run's start.
    pub start_wall_clock: Option<WallClockTime>,
    /// Whether the line source is still delivering.
    pub connected: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            active_user_id: None,
            started_at: None,
            start_wall_clock: None,
            connected: true,
        }
    }
}

impl SessionSnapshot {
    /// Elapsed local time of the active run.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at.map(|started| now.saturating_duration_since(started))
    }
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Template receiver for timing events; resubscribe for each consumer
    pub events: broadcast::Receiver<TimingEvent>,
    /// Template receiver for diagnostics
    pub diagnostics: broadcast::Receiver<Diagnostic>,
    /// Receiver for session snapshots
    pub sessions: watch::Receiver<SessionSnapshot>,
    /// Receiver for result history updates
    pub results: watch::Receiver<Arc<ResultHistory>>,
    /// Host command queue
    pub commands: mpsc::Sender<Command>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the timing processing task
///
/// One task owns the line source and the whole pipeline, so chunks, timer
/// expiries and host commands are applied strictly one after another.
pub struct Driver;

impl Driver {
    /// Spawn the driver task for the given source
    ///
    /// Fails only if `config` is invalid. Must be called inside a tokio
    /// runtime.
    pub fn spawn<S>(source: S, config: &TimingConfig) -> Result<DriverChannels>
    where
        S: LineSource,
    {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (diagnostic_tx, diagnostic_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (timer, expired_rx) = TokioTimer::new();

        let core = TimingCore::new(config, timer)?.with_diagnostics(diagnostic_tx);
        let (session_tx, session_rx) = watch::channel(SessionSnapshot::default());
        let (results_tx, results_rx) = watch::channel(Arc::new(core.history().clone()));

        let cancel = CancellationToken::new();
        let task = DriverTask {
            core,
            expired_rx,
            command_rx,
            event_tx,
            session_tx,
            results_tx,
            cancel: cancel.clone(),
        };

        tokio::spawn(async move {
            task.run(source).await;
        });

        Ok(DriverChannels {
            events: event_rx,
            diagnostics: diagnostic_rx,
            sessions: session_rx,
            results: results_rx,
            commands: command_tx,
            cancel,
        })
    }
}

struct DriverTask {
    core: TimingCore<TokioTimer>,
    expired_rx: mpsc::UnboundedReceiver<TimerToken>,
    command_rx: mpsc::Receiver<Command>,
    event_tx: broadcast::Sender<TimingEvent>,
    session_tx: watch::Sender<SessionSnapshot>,
    results_tx: watch::Sender<Arc<ResultHistory>>,
    cancel: CancellationToken,
}

impl DriverTask {
    async fn run<S: LineSource>(mut self, mut source: S) {
        info!(source = %source.describe(), "Timing driver started");
        let mut chunk_count = 0u64;
        let mut error_count = 0u32;
        // Set while backing off after a source error
        let mut retry_at: Option<Instant> = None;

        loop {
            if self.cancel.is_cancelled() {
                info!("Timing driver cancelled");
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Timing driver cancelled while waiting");
                    break;
                }
                Some(token) = self.expired_rx.recv() => {
                    if let Some(event) = self.core.on_timer(token) {
                        self.publish(event);
                    }
                }
                Some(command) = self.command_rx.recv() => {
                    if !self.apply(command) {
                        break;
                    }
                }
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    retry_at = None;
                }
                result = source.next_chunk(), if retry_at.is_none() => match result {
                    Ok(Some(chunk)) => {
                        chunk_count += 1;
                        error_count = 0;
                        trace!(chunk_count, len = chunk.len(), "Chunk received");
                        for event in self.core.feed(&chunk) {
                            self.publish(event);
                        }
                    }
                    Ok(None) => {
                        info!("Line source ended after {} chunks", chunk_count);
                        self.lose_transport();
                        break;
                    }
                    Err(e) => {
                        error_count += 1;
                        warn!("Line source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                        if error_count >= MAX_ERRORS {
                            error!("Too many line source errors, treating transport as lost");
                            self.lose_transport();
                            break;
                        }

                        // Exponential backoff: 100ms, 200ms, 400ms, ... capped at 3.2s
                        let backoff = Duration::from_millis(50 * (1 << error_count.min(6)));
                        retry_at = Some(Instant::now() + backoff);
                    }
                },
            }

            self.publish_session(true);
        }

        info!("Timing driver ended (processed {} chunks)", chunk_count);
    }

    /// Returns `false` when the driver should stop.
    fn apply(&mut self, command: Command) -> bool {
        debug!(?command, "Applying host command");
        match command {
            Command::Reset => self.core.reset(),
            Command::ClearResults => {
                self.core.clear_results();
                self.publish_results();
            }
            Command::SetPrecision(precision) => {
                self.core.set_display(DisplayConfig { precision, ..self.core.display() });
                self.publish_results();
            }
            Command::SetDisplay(display) => {
                self.core.set_display(display);
                self.publish_results();
            }
            Command::Disconnect => {
                self.lose_transport();
                return false;
            }
        }
        true
    }

    fn publish(&mut self, event: TimingEvent) {
        let is_result = matches!(event, TimingEvent::Result { .. });
        // No subscribers is fine; the history still records results.
        let _ = self.event_tx.send(event);
        if is_result {
            self.publish_results();
        }
    }

    fn publish_results(&self) {
        self.results_tx.send_replace(Arc::new(self.core.history().clone()));
    }

    fn publish_session(&self, connected: bool) {
        let state = self.core.session().state();
        let snapshot = SessionSnapshot {
            phase: state.phase(),
            active_user_id: state.active_user_id(),
            started_at: state.started_at(),
            start_wall_clock: state.start_wall_clock(),
            connected,
        };
        self.session_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn lose_transport(&mut self) {
        self.core.disconnect();
        self.publish_session(false);
    }
}
