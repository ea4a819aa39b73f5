//! Turns committed finishes into history entries

use chrono::{DateTime, Local};
use tracing::info;

use super::format::format_time;
use super::history::{ResultHistory, RunResult};
use crate::config::DisplayConfig;
use crate::types::Outcome;

/// Renders finishes at the current display settings and keeps the history.
#[derive(Debug, Clone, Default)]
pub struct ResultRecorder {
    display: DisplayConfig,
    history: ResultHistory,
}

impl ResultRecorder {
    pub fn new(display: DisplayConfig, capacity: usize) -> Self {
        Self { display, history: ResultHistory::with_capacity(capacity) }
    }

    /// Record one finish and return the stored entry.
    pub fn record(
        &mut self,
        time_seconds: f64,
        outcome: Outcome,
        timestamp: DateTime<Local>,
    ) -> RunResult {
        let result = RunResult {
            time_seconds,
            display_string: self.render(time_seconds),
            outcome,
            created_at: timestamp,
        };
        info!(
            time_seconds,
            display = %result.display_string,
            outcome = outcome.label(),
            "Result recorded"
        );
        self.history.push(result.clone());
        result
    }

    /// Render a time at the current display settings.
    pub fn render(&self, time_seconds: f64) -> String {
        format_time(time_seconds, self.display.precision, self.display.format)
    }

    pub fn display(&self) -> DisplayConfig {
        self.display
    }

    /// Change display settings and re-render the history.
    pub fn set_display(&mut self, display: DisplayConfig) {
        self.display = display;
        self.history.rerender(display);
    }

    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
