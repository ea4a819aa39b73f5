//! Host-facing connection to one timing device
//!
//! A [`TimerConnection`] owns the driver task for a single line source and
//! exposes what a UI needs: an event stream, diagnostics, the session
//! snapshot, the result history and a running clock. Dropping the
//! connection stops the driver.

use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DisplayConfig, TimingConfig};
use crate::driver::{Command, Driver, SessionSnapshot};
use crate::provider::LineSource;
use crate::providers::{CaptureProvider, ChannelProvider, ChunkSender};
use crate::results::{Precision, ResultHistory};
use crate::stream::RunningClock;
use crate::types::{Diagnostic, TimingEvent, UpdateRate};
use crate::{Result, TimingError};

#[cfg(test)]
mod tests;

/// Connection to a running timing pipeline
pub struct TimerConnection {
    /// Template receivers; each subscriber gets its own via `resubscribe`
    events: broadcast::Receiver<TimingEvent>,
    diagnostics: broadcast::Receiver<Diagnostic>,

    sessions: watch::Receiver<SessionSnapshot>,
    results: watch::Receiver<Arc<ResultHistory>>,
    commands: mpsc::Sender<Command>,

    /// Source description, for logs and UI
    source: String,

    cancel: CancellationToken,
}

impl TimerConnection {
    /// Replay a recorded capture file at device pace.
    pub async fn open<P: AsRef<Path>>(path: P, config: &TimingConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening capture file: {}", path.display());

        let provider = CaptureProvider::open(path).await?;
        Self::attach(provider, config)
    }

    /// Run the pipeline over any line source.
    ///
    /// Must be called inside a tokio runtime.
    pub fn attach<S: LineSource>(source: S, config: &TimingConfig) -> Result<Self> {
        let description = source.describe();
        let channels = Driver::spawn(source, config)?;

        info!(source = %description, "Timer connection opened");

        Ok(Self {
            events: channels.events,
            diagnostics: channels.diagnostics,
            sessions: channels.sessions,
            results: channels.results,
            commands: channels.commands,
            source: description,
            cancel: channels.cancel,
        })
    }

    /// Connection fed by the host, e.g. from a serial port read loop.
    pub fn channel(config: &TimingConfig) -> Result<(ChunkSender, Self)> {
        let (sender, provider) = ChannelProvider::new();
        let connection = Self::attach(provider, config)?;
        Ok((sender, connection))
    }

    /// Stream of timing events from now on.
    ///
    /// A subscriber that falls behind skips the missed events with a warning.
    /// The stream ends when the driver stops.
    pub fn subscribe(&self) -> impl Stream<Item = TimingEvent> + 'static {
        BroadcastStream::new(self.events.resubscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Timing event subscriber lagged");
                    None
                }
            }
        })
    }

    /// Stream of dropped-packet diagnostics from now on.
    pub fn diagnostics(&self) -> impl Stream<Item = Diagnostic> + 'static {
        BroadcastStream::new(self.diagnostics.resubscribe())
            .filter_map(|item| async move { item.ok() })
    }

    /// Session snapshots, starting with the current one.
    pub fn session_updates(&self) -> impl Stream<Item = SessionSnapshot> + 'static {
        WatchStream::new(self.sessions.clone())
    }

    pub fn current_session(&self) -> SessionSnapshot {
        *self.sessions.borrow()
    }

    /// Whether the line source is still delivering.
    pub fn is_connected(&self) -> bool {
        self.sessions.borrow().connected
    }

    /// Result history as of now, newest first.
    pub fn results(&self) -> Arc<ResultHistory> {
        self.results.borrow().clone()
    }

    /// Result history updates, starting with the current history.
    pub fn result_updates(&self) -> impl Stream<Item = Arc<ResultHistory>> + 'static {
        WatchStream::new(self.results.clone())
    }

    /// History as CSV, see [`ResultHistory::to_csv`].
    pub fn export_csv(&self) -> String {
        self.results.borrow().to_csv()
    }

    /// Ticking elapsed-time readings for the active run.
    pub fn running_clock(&self, rate: UpdateRate) -> RunningClock<WatchStream<SessionSnapshot>> {
        RunningClock::new(WatchStream::new(self.sessions.clone()), rate.normalize())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Abandon the active run. Results are kept.
    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    pub async fn clear_results(&self) -> Result<()> {
        self.send(Command::ClearResults).await
    }

    /// Change decimals for new and existing results.
    pub async fn set_precision(&self, precision: Precision) -> Result<()> {
        self.send(Command::SetPrecision(precision)).await
    }

    pub async fn set_display(&self, display: DisplayConfig) -> Result<()> {
        self.send(Command::SetDisplay(display)).await
    }

    /// Stop the driver as if the transport had gone away.
    pub async fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect).await
    }

    /// Fails with `TransportLost` once the source is gone, `DriverStopped`
    /// if the driver ended some other way.
    async fn send(&self, command: Command) -> Result<()> {
        if !self.is_connected() {
            return Err(TimingError::TransportLost);
        }
        self.commands.send(command).await.map_err(|_| TimingError::DriverStopped)
    }
}

impl Drop for TimerConnection {
    fn drop(&mut self) {
        debug!(source = %self.source, "Dropping timer connection");
        self.cancel.cancel();
    }
}
