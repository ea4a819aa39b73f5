//! Result recording, formatting and export.

mod format;
mod history;
mod recorder;

pub use format::{Precision, TimeFormat, format_for_export, format_time};
pub use history::{CSV_HEADER, ResultHistory, RunResult, TIMESTAMP_FORMAT};
pub use recorder::ResultRecorder;
