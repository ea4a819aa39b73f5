//! Test utilities for capture fixtures and synthetic device output
//!
//! Shared by unit tests and the benchmarks. Fixtures are plain capture
//! files under `tests/fixtures/`, records separated by `\r` exactly as the
//! device wrote them.

#![cfg(any(test, feature = "benchmark"))]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Extension used for recorded captures.
pub const CAPTURE_EXTENSION: &str = "log";

/// Error returned when a required capture fixture cannot be located.
#[derive(Debug, Clone)]
pub struct FixtureError {
    message: String,
}

impl FixtureError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for FixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FixtureError {}

/// Directory holding the capture fixtures.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// All capture fixtures, sorted by file name.
pub fn capture_fixtures() -> Vec<PathBuf> {
    let mut captures: Vec<PathBuf> = match std::fs::read_dir(fixtures_dir()) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some(CAPTURE_EXTENSION))
            .collect(),
        Err(_) => return vec![],
    };
    captures.sort();
    captures
}

/// Require a named capture fixture and return its path.
pub fn require_capture_fixture(file_name: &str) -> Result<PathBuf, FixtureError> {
    let path = fixtures_dir().join(file_name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(FixtureError::new(format!(
            "Missing capture fixture: {}. Fixtures live in tests/fixtures/.",
            path.display()
        )))
    }
}

/// Device output for `runs` complete runs, as one string.
///
/// Each run has a start, a line of line noise, an untrusted finish echo and
/// the trusted finish, so it exercises rejection and arbitration as well as
/// the happy path. Times grow with the run index so results are distinct.
pub fn synthetic_capture(runs: usize) -> String {
    let mut capture = String::with_capacity(runs * 96);
    for run in 0..runs {
        let user_id = 100 + run % 900;
        let minute = run % 60;
        let elapsed = 20.0 + (run % 400) as f64 * 0.0125;
        let _ = write!(
            capture,
            "{user_id} C0M 10:{minute:02}:00.0000 0\r\
             ~#{run}\r\
             {user_id} c1 {elapsed:.4} 0\r\
             {user_id} c1M {elapsed:.4} 0\r"
        );
    }
    capture
}
