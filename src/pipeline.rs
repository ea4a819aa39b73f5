//! Transport-free timing pipeline
//!
//! [`TimingCore`] chains the framer, parser, session and recorder. It is
//! synchronous and owns no tasks: the caller feeds chunks in arrival order
//! and hands back arbitration timer expiries. The async driver wraps one of
//! these; embedded hosts can drive one directly with a [`ManualTimer`].
//!
//! ```rust
//! use fds_timing::config::TimingConfig;
//! use fds_timing::pipeline::TimingCore;
//! use fds_timing::session::ManualTimer;
//! use fds_timing::types::TimingEvent;
//!
//! let mut core = TimingCore::new(&TimingConfig::default(), ManualTimer::new()).unwrap();
//! let events = core.feed("5 C0M 12:00:00.0000 0\r5 c1 45.6700 0\r");
//!
//! assert!(matches!(events[0], TimingEvent::Start { user_id: 5, .. }));
//! match &events[1] {
//!     TimingEvent::Result { display_string, .. } => assert_eq!(display_string, "45.67"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! assert_eq!(core.history().len(), 1);
//! ```
//!
//! [`ManualTimer`]: crate::session::ManualTimer

use chrono::Local;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::Result;
use crate::config::{DisplayConfig, TimingConfig};
use crate::protocol::{LineFramer, PacketParser};
use crate::results::{ResultHistory, ResultRecorder};
use crate::session::{ArbitrationTimer, Finish, Session, TimerToken, Transition};
use crate::types::{Diagnostic, TimingEvent};

/// Receives every [`Diagnostic`] the pipeline produces.
pub trait DiagnosticSink: Send {
    fn report(&mut self, diagnostic: &Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

impl DiagnosticSink for broadcast::Sender<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        // No subscribers is fine.
        let _ = self.send(diagnostic.clone());
    }
}

/// Framer → parser → session → recorder for one timer connection.
pub struct TimingCore<T: ArbitrationTimer> {
    framer: LineFramer,
    parser: PacketParser,
    session: Session<T>,
    recorder: ResultRecorder,
    sink: Option<Box<dyn DiagnosticSink>>,
}

impl<T: ArbitrationTimer> TimingCore<T> {
    /// Build a pipeline. Fails only on invalid configuration.
    pub fn new(config: &TimingConfig, timer: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            framer: LineFramer::with_max_line_length(config.max_line_length),
            parser: PacketParser::new(config.policy.delta_rules),
            session: Session::new(config.policy, timer),
            recorder: ResultRecorder::new(config.display, config.history_capacity),
            sink: None,
        })
    }

    /// Attach a diagnostic sink, replacing any previous one.
    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Feed a chunk received now.
    pub fn feed(&mut self, chunk: &str) -> Vec<TimingEvent> {
        self.feed_at(chunk, Instant::now())
    }

    /// Feed raw bytes received now.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<TimingEvent> {
        let lines = self.framer.feed_bytes(chunk);
        let now = Instant::now();
        lines.iter().filter_map(|line| self.handle_line(line, now)).collect()
    }

    /// Feed a chunk, using `now` as the arrival time of every line in it.
    pub fn feed_at(&mut self, chunk: &str, now: Instant) -> Vec<TimingEvent> {
        let lines = self.framer.feed(chunk);
        lines.iter().filter_map(|line| self.handle_line(line, now)).collect()
    }

    /// Process one complete line.
    pub fn handle_line(&mut self, line: &str, now: Instant) -> Option<TimingEvent> {
        trace!(line, "Line received");
        let packet = match self.parser.parse(line) {
            Ok(packet) => packet,
            Err(reason) => {
                self.report(Diagnostic::MalformedLine { line: line.to_string(), reason });
                return None;
            }
        };

        match self.session.handle(&packet, now) {
            Transition::Started { user_id, wall_clock_time } => {
                Some(TimingEvent::Start { user_id, wall_clock_time })
            }
            Transition::Finished(finish) => Some(self.record(finish)),
            Transition::Control { command } => Some(TimingEvent::Control { command }),
            Transition::Buffered { .. } => None,
            Transition::Dropped(diagnostic) => {
                self.report(diagnostic);
                None
            }
        }
    }

    /// Hand back an arbitration expiry. Stale tokens produce nothing.
    pub fn on_timer(&mut self, token: TimerToken) -> Option<TimingEvent> {
        match self.session.on_timer(token) {
            Some(finish) => Some(self.record(finish)),
            None => {
                trace!(token = token.id(), "Ignoring stale arbitration expiry");
                None
            }
        }
    }

    /// Abandon the active run and any buffered finish. History is kept.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Transport went away: reset and drop the partial line.
    pub fn disconnect(&mut self) {
        if !self.framer.pending().is_empty() {
            debug!(pending = self.framer.pending().len(), "Dropping partial line on disconnect");
        }
        self.framer.reset();
        self.session.reset();
        info!("Timing session reset after transport loss");
    }

    pub fn clear_results(&mut self) {
        self.recorder.clear();
    }

    /// Change display settings and re-render history.
    pub fn set_display(&mut self, display: DisplayConfig) {
        self.recorder.set_display(display);
    }

    pub fn display(&self) -> DisplayConfig {
        self.recorder.display()
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn history(&self) -> &ResultHistory {
        self.recorder.history()
    }

    fn record(&mut self, finish: Finish) -> TimingEvent {
        let result = self.recorder.record(finish.time_seconds, finish.outcome, Local::now());
        TimingEvent::Result {
            user_id: finish.user_id,
            time_seconds: result.time_seconds,
            outcome: result.outcome,
            display_string: result.display_string,
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        debug!(kind = ?diagnostic.kind(), "{diagnostic}");
        if let Some(sink) = self.sink.as_mut() {
            sink.report(&diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Acceptance, Arbitration};
    use crate::protocol::Rejection;
    use crate::results::Precision;
    use crate::session::ManualTimer;
    use crate::types::{DiagnosticKind, Outcome, SessionPhase};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<Diagnostic>>>);

    impl DiagnosticSink for SharedSink {
        fn report(&mut self, diagnostic: &Diagnostic) {
            self.0.lock().unwrap().push(diagnostic.clone());
        }
    }

    fn core(config: TimingConfig) -> (TimingCore<ManualTimer>, SharedSink) {
        let sink = SharedSink::default();
        let core = TimingCore::new(&config, ManualTimer::new()).unwrap().with_diagnostics(sink.clone());
        (core, sink)
    }

    #[test]
    fn full_run_across_split_chunks() {
        let (mut core, sink) = core(TimingConfig::default());

        assert!(core.feed("5 C0M 12:00").is_empty());
        let events = core.feed(":00.0000 0\r5 c1 45.6");
        assert_eq!(events.len(), 1);
        assert_eq!(core.session().phase(), SessionPhase::Running);

        let events = core.feed("700 0\r");
        assert_eq!(
            events,
            vec![TimingEvent::Result {
                user_id: 5,
                time_seconds: 45.67,
                outcome: Outcome::Clean,
                display_string: "45.67".into(),
            }]
        );
        assert_eq!(core.history().latest().unwrap().time_seconds, 45.67);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_lines_reach_the_sink_and_do_not_stop_the_stream() {
        let (mut core, sink) = core(TimingConfig::default());
        let events = core.feed("garbage here\r5 C0M 12:00:00.0000 0\rn3\r");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], TimingEvent::Control { ref command } if command == "n3"));

        let diagnostics = sink.0.lock().unwrap();
        assert_eq!(
            diagnostics.as_slice(),
            &[Diagnostic::MalformedLine {
                line: "garbage here".into(),
                reason: Rejection::TokenCount(2),
            }]
        );
    }

    #[test]
    fn out_of_sequence_signals_are_reported() {
        let (mut core, sink) = core(TimingConfig::default());
        assert!(core.feed("5 c1 45.67 0\r").is_empty());
        let diagnostics = sink.0.lock().unwrap();
        assert_eq!(diagnostics[0].kind(), DiagnosticKind::OutOfSequenceSignal);
    }

    #[test]
    fn buffered_finish_commits_on_timer() {
        let mut config = TimingConfig::default();
        config.policy.acceptance = Acceptance::StrictIdentity;
        config.policy.arbitration = Arbitration::Buffered { window_ms: 100 };
        let (mut core, _) = core(config);

        core.feed("5 C0M 12:00:00.0000 0\r5 C1 45.1000 0\r");
        assert!(core.history().is_empty());
        let token = core.session().timer().armed().unwrap();

        let event = core.on_timer(token).unwrap();
        assert!(matches!(event, TimingEvent::Result { time_seconds, .. } if time_seconds == 45.1));
        assert!(core.on_timer(token).is_none());
        assert_eq!(core.history().len(), 1);
    }

    #[test]
    fn disconnect_keeps_history_and_drops_state() {
        let mut config = TimingConfig::default();
        config.policy.arbitration = Arbitration::Buffered { window_ms: 100 };
        let (mut core, _) = core(config);

        core.feed("1 C0M 12:00:00.0000 0\r1 c1 10.0 0\r");
        core.feed("2 C0M 12:01:00.0000 0\r2 C1 11.0 0\r3 C0M 12");
        let token = core.session().timer().armed().unwrap();

        core.disconnect();
        assert_eq!(core.session().phase(), SessionPhase::Idle);
        assert!(core.session().timer().armed().is_none());
        assert!(core.on_timer(token).is_none());
        assert_eq!(core.history().len(), 1);

        assert!(core.feed(":00:00.0000 0\r").is_empty(), "partial line discarded");
        assert_eq!(core.session().phase(), SessionPhase::Idle);
    }

    #[test]
    fn precision_change_rerenders_history() {
        let (mut core, _) = core(TimingConfig::default());
        core.feed("1 C0M 12:00:00.0000 0\r1 c1 10.1234 0\r");
        assert_eq!(core.history().latest().unwrap().display_string, "10.12");

        core.set_display(DisplayConfig { precision: Precision::THREE, ..core.display() });
        assert_eq!(core.history().latest().unwrap().display_string, "10.123");

        core.clear_results();
        assert!(core.history().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TimingConfig { history_capacity: 0, ..TimingConfig::default() };
        assert!(TimingCore::new(&config, ManualTimer::new()).is_err());
    }

    #[test]
    fn sink_implementations() {
        let diagnostic = Diagnostic::MalformedLine { line: "x".into(), reason: Rejection::TokenCount(1) };

        let mut collected = Vec::new();
        collected.report(&diagnostic);
        assert_eq!(collected, vec![diagnostic.clone()]);

        let (mut tx, mut rx) = broadcast::channel(4);
        tx.report(&diagnostic);
        assert_eq!(rx.try_recv().unwrap(), diagnostic);
    }
}
