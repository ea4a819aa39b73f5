//! Tests for the timer connection
//!
//! These drive a real driver task through the channel and capture providers
//! and observe it only through the public connection surface.

use super::*;
use crate::config::PolicyConfig;
use crate::types::{Outcome, OutcomeRule, SessionPhase};
use futures::StreamExt;
use std::time::Duration;

const STEP: Duration = Duration::from_secs(1);

async fn next<S: Stream + Unpin>(stream: &mut S) -> Option<S::Item> {
    tokio::time::timeout(STEP, stream.next()).await.expect("stream item within timeout")
}

#[tokio::test]
async fn channel_connection_streams_events() {
    let _ = tracing_subscriber::fmt::try_init();

    let (sender, connection) = TimerConnection::channel(&TimingConfig::default()).unwrap();
    let mut events = Box::pin(connection.subscribe());
    assert!(connection.is_connected());

    sender.send("12 C0M 09:15:00.0000 0\r").await.unwrap();
    match next(&mut events).await.unwrap() {
        TimingEvent::Start { user_id, wall_clock_time } => {
            assert_eq!(user_id, 12);
            assert!(wall_clock_time.is_some());
        }
        other => panic!("expected start, got {other:?}"),
    }

    sender.send("12 c1 38.4117 0\r").await.unwrap();
    match next(&mut events).await.unwrap() {
        TimingEvent::Result { user_id, outcome, display_string, .. } => {
            assert_eq!(user_id, 12);
            assert_eq!(outcome, Outcome::Clean);
            assert_eq!(display_string, "38.41");
        }
        other => panic!("expected result, got {other:?}"),
    }

    let mut updates = Box::pin(connection.result_updates());
    loop {
        let history = next(&mut updates).await.unwrap();
        if history.len() == 1 {
            break;
        }
    }
    assert_eq!(connection.results().latest().unwrap().time_seconds, 38.4117);
    let csv = connection.export_csv();
    assert!(csv.starts_with(crate::results::CSV_HEADER));
    assert!(csv.contains("\n1,\"38.412\",\"clean\","));
}

#[tokio::test]
async fn diagnostics_stream_reports_rejected_lines() {
    let (sender, connection) = TimerConnection::channel(&TimingConfig::default()).unwrap();
    let mut diagnostics = Box::pin(connection.diagnostics());

    sender.send("4 c1 1.0000 0\r").await.unwrap();
    match next(&mut diagnostics).await.unwrap() {
        Diagnostic::OutOfSequence { user_id, phase, .. } => {
            assert_eq!(user_id, 4);
            assert_eq!(phase, SessionPhase::Idle);
        }
        other => panic!("expected out of sequence, got {other:?}"),
    }
}

#[tokio::test]
async fn session_updates_follow_runs() {
    let (sender, connection) = TimerConnection::channel(&TimingConfig::default()).unwrap();
    let mut sessions = Box::pin(connection.session_updates());
    assert_eq!(next(&mut sessions).await.unwrap().phase, SessionPhase::Idle);

    sender.send("8 C0M 10:00:00.0000 0\r").await.unwrap();
    let running = next(&mut sessions).await.unwrap();
    assert_eq!(running.phase, SessionPhase::Running);
    assert_eq!(running.active_user_id, Some(8));
    assert_eq!(connection.current_session().active_user_id, Some(8));

    connection.reset().await.unwrap();
    let idle = next(&mut sessions).await.unwrap();
    assert_eq!(idle.phase, SessionPhase::Idle);
    assert!(idle.connected);
}

#[tokio::test]
async fn precision_change_rerenders_history() {
    let config = TimingConfig {
        policy: PolicyConfig { outcome_rule: OutcomeRule::StatusOverridesSign, ..PolicyConfig::default() },
        ..TimingConfig::default()
    };
    let (sender, connection) = TimerConnection::channel(&config).unwrap();
    let mut updates = Box::pin(connection.result_updates());

    sender.send("2 C0M 08:00:00.0000 0\r2 c1 61.5000 1\r").await.unwrap();
    loop {
        if next(&mut updates).await.unwrap().len() == 1 {
            break;
        }
    }
    assert_eq!(connection.results().latest().unwrap().outcome, Outcome::Fault);

    connection.set_precision(Precision::THREE).await.unwrap();
    assert_eq!(next(&mut updates).await.unwrap().latest().unwrap().display_string, "61.500");

    connection.clear_results().await.unwrap();
    assert!(next(&mut updates).await.unwrap().is_empty());
}

#[tokio::test]
async fn commands_fail_after_disconnect() {
    let (_sender, connection) = TimerConnection::channel(&TimingConfig::default()).unwrap();
    let mut events = Box::pin(connection.subscribe());

    connection.disconnect().await.unwrap();
    assert!(next(&mut events).await.is_none());
    assert!(!connection.is_connected());

    assert!(matches!(connection.reset().await, Err(TimingError::TransportLost)));
}

#[tokio::test]
async fn source_end_reports_transport_lost() {
    let (sender, connection) = TimerConnection::channel(&TimingConfig::default()).unwrap();
    let mut sessions = Box::pin(connection.session_updates());

    drop(sender);
    loop {
        if !next(&mut sessions).await.unwrap().connected {
            break;
        }
    }

    let err = connection.set_precision(Precision::THREE).await.unwrap_err();
    assert!(matches!(err, TimingError::TransportLost));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn dropping_connection_stops_driver() {
    let (sender, connection) = TimerConnection::channel(&TimingConfig::default()).unwrap();
    drop(connection);

    tokio::time::timeout(STEP, async {
        while !sender.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("driver released its source");
    assert!(sender.send("1 C0M 10:00:00.0000 0\r").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn capture_replay_fills_history_and_disconnects() {
    let capture = "3 C0M 10:00:00.0000 0\r3 c1 12.3456 0\r\
                   4 C0M 10:01:00.0000 0\r4 c1 0.0000 0\r";
    let provider = CaptureProvider::from_bytes(capture);
    let connection = TimerConnection::attach(provider, &TimingConfig::default()).unwrap();
    assert_eq!(connection.source(), "in-memory capture");

    let mut sessions = Box::pin(connection.session_updates());
    loop {
        if !sessions.next().await.unwrap().connected {
            break;
        }
    }

    let history = connection.results();
    assert_eq!(history.len(), 2);
    assert_eq!(history.latest().unwrap().outcome, Outcome::Zero);
    assert_eq!(history.get(1).unwrap().display_string, "12.35");
}

#[tokio::test(start_paused = true)]
async fn running_clock_reports_active_run() {
    let (sender, connection) = TimerConnection::channel(&TimingConfig::default()).unwrap();
    let mut clock = connection.running_clock(UpdateRate::Max(10));

    let idle = clock.next().await.unwrap();
    assert!(!idle.is_running());

    sender.send("6 C0M 11:00:00.0000 0\r").await.unwrap();
    let mut sessions = Box::pin(connection.session_updates());
    loop {
        if sessions.next().await.unwrap().phase == SessionPhase::Running {
            break;
        }
    }

    let first = clock.next().await.unwrap();
    let second = clock.next().await.unwrap();
    assert!(second.is_running());
    assert_eq!(second.active_user_id, Some(6));
    assert!(second.elapsed > first.elapsed);
}
