//! End-to-end replay of a recorded training session
//!
//! The fixture holds fifteen records from one device, including line noise,
//! out-of-sequence finishes, a duplicated finish on two channels and a
//! finish from the wrong user. The same bytes are replayed under the
//! permissive defaults and under a strict, arbitrated policy.

use fds_timing::config::Arbitration;
use fds_timing::pipeline::TimingCore;
use fds_timing::session::ManualTimer;
use fds_timing::{
    Diagnostic, DiagnosticKind, FdsTiming, Outcome, SessionPhase, TimerConnection, TimingConfig,
    TimingEvent,
};
use futures::StreamExt;
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/training_session.log")
}

fn strict_config() -> TimingConfig {
    TimingConfig::from_yaml_str(
        r#"
policy:
  acceptance: strict_identity
  arbitration:
    buffered:
      window_ms: 100
  outcome_rule: status_overrides_sign
"#,
    )
    .expect("valid strict config")
}

/// Replay to the end, returning everything the connection emitted.
async fn replay(config: &TimingConfig) -> (TimerConnection, Vec<TimingEvent>, Vec<Diagnostic>) {
    let connection = FdsTiming::open(fixture(), config).await.expect("fixture opens");
    let events = connection.subscribe().collect::<Vec<_>>();
    let diagnostics = connection.diagnostics().collect::<Vec<_>>();
    let (events, diagnostics) = futures::join!(events, diagnostics);
    (connection, events, diagnostics)
}

/// Oldest first, times in whole milliseconds.
fn result_times(connection: &TimerConnection) -> Vec<(i64, Outcome)> {
    connection
        .results()
        .iter()
        .rev()
        .map(|r| ((r.time_seconds * 1000.0).round() as i64, r.outcome))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn permissive_replay_records_every_first_finish() {
    let _ = tracing_subscriber::fmt::try_init();

    let (connection, events, diagnostics) = replay(&TimingConfig::default()).await;

    let starts = events.iter().filter(|e| matches!(e, TimingEvent::Start { .. })).count();
    assert_eq!(starts, 5);
    assert!(matches!(&events[0], TimingEvent::Control { command } if command == "n0001"));

    assert_eq!(
        result_times(&connection),
        vec![
            (32_150, Outcome::Clean),
            (41_071, Outcome::Clean),
            (29_880, Outcome::Clean),
            (0, Outcome::Zero),
            (12_000, Outcome::Clean),
        ]
    );
    let last = connection.results().latest().cloned().expect("results recorded");
    assert_eq!(last.display_string, "12.00");

    let kinds: Vec<_> = diagnostics.iter().map(Diagnostic::kind).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::OutOfSequenceSignal,
            DiagnosticKind::MalformedLine,
            DiagnosticKind::OutOfSequenceSignal,
            DiagnosticKind::OutOfSequenceSignal,
        ]
    );

    let session = connection.current_session();
    assert!(!session.connected);
    assert_eq!(session.phase, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn strict_replay_prefers_trusted_finishes() {
    let (connection, events, diagnostics) = replay(&strict_config()).await;

    let finished_users: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            TimingEvent::Result { user_id, .. } => Some(*user_id),
            _ => None,
        })
        .collect();
    assert_eq!(finished_users, vec![1, 2, 3, 4, 5]);

    assert_eq!(
        result_times(&connection),
        vec![
            (32_150, Outcome::Clean),
            (41_100, Outcome::Clean),
            (29_880, Outcome::Clean),
            (0, Outcome::Zero),
            (27_010, Outcome::Fault),
        ]
    );

    assert!(diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::IdentityMismatch { expected: 5, got: 6, .. }
    )));
    assert_eq!(diagnostics.len(), 3);

    let csv = connection.export_csv();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 6);
    assert!(rows[2].starts_with("2,\"41.100\",\"clean\","));
    assert!(rows[5].starts_with("5,\"27.010 (F)\",\"fault\","));
}

#[tokio::test]
async fn synchronous_pipeline_matches_replay() -> anyhow::Result<()> {
    let bytes = std::fs::read(fixture())?;
    let mut core = TimingCore::new(&TimingConfig::default(), ManualTimer::new())?;

    // Arbitrary split points must not change anything
    let (head, tail) = bytes.split_at(101);
    let mut events = core.feed_bytes(head);
    events.extend(core.feed_bytes(tail));

    assert_eq!(events.len(), 11);
    assert_eq!(core.history().len(), 5);
    assert_eq!(core.session().phase(), SessionPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn missing_capture_is_a_file_error() {
    let result = FdsTiming::open("tests/fixtures/does_not_exist.log", &TimingConfig::default()).await;
    match result {
        Err(error) => assert!(matches!(error, fds_timing::TimingError::File { .. })),
        Ok(_) => panic!("missing file opened"),
    }
    assert!(matches!(strict_config().policy.arbitration, Arbitration::Buffered { window_ms: 100 }));
}
