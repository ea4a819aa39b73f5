//! Bounded, newest-first result history

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Write as _;

use super::format::{format_for_export, format_time};
use crate::config::{DEFAULT_HISTORY_CAPACITY, DisplayConfig};
use crate::types::Outcome;

/// Timestamp layout used for display and export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row of [`ResultHistory::to_csv`].
pub const CSV_HEADER: &str = "Number,Result,Status,Timestamp";

/// A finished, recorded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Signed elapsed time as received.
    pub time_seconds: f64,
    /// `time_seconds` rendered at the display settings in force.
    pub display_string: String,
    pub outcome: Outcome,
    pub created_at: DateTime<Local>,
}

impl RunResult {
    /// `created_at` as `YYYY-MM-DD HH:MM:SS`.
    pub fn timestamp(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Most recent results, newest first, capped at a fixed capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultHistory {
    entries: VecDeque<RunResult>,
    capacity: usize,
}

impl Default for ResultHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ResultHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Insert at the front, evicting the oldest entry when full.
    pub fn push(&mut self, result: RunResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.capacity);
    }

    /// Newest result.
    pub fn latest(&self) -> Option<&RunResult> {
        self.entries.front()
    }

    /// Result at `index`, 0 being the newest.
    pub fn get(&self, index: usize) -> Option<&RunResult> {
        self.entries.get(index)
    }

    /// Newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RunResult> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Re-render every display string, e.g. after a precision change.
    pub fn rerender(&mut self, display: DisplayConfig) {
        for entry in &mut self.entries {
            entry.display_string = format_time(entry.time_seconds, display.precision, display.format);
        }
    }

    /// CSV export, oldest first and numbered from 1.
    ///
    /// Every value after the number is quoted; rows are joined with `\n`
    /// and there is no trailing newline. An empty history exports as an
    /// empty string.
    pub fn to_csv(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }

        let mut csv = String::from(CSV_HEADER);
        for (index, result) in self.entries.iter().rev().enumerate() {
            let _ = write!(
                csv,
                "\n{},\"{}\",\"{}\",\"{}\"",
                index + 1,
                format_for_export(result.time_seconds, result.outcome),
                result.outcome.label(),
                result.timestamp()
            );
        }
        csv
    }
}

impl<'a> IntoIterator for &'a ResultHistory {
    type Item = &'a RunResult;
    type IntoIter = std::collections::vec_deque::Iter<'a, RunResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
