//! Rendering run times for display and export

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Outcome;

/// Decimal places shown for a run time: 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(try_from = "u8", into = "u8")]
pub struct Precision(u8);

impl Precision {
    /// Hundredths.
    pub const TWO: Precision = Precision(2);
    /// Thousandths.
    pub const THREE: Precision = Precision(3);

    pub fn new(digits: u8) -> Option<Self> {
        match digits {
            2 => Some(Self::TWO),
            3 => Some(Self::THREE),
            _ => None,
        }
    }

    pub fn digits(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::TWO
    }
}

impl TryFrom<u8> for Precision {
    type Error = String;

    fn try_from(digits: u8) -> Result<Self, Self::Error> {
        Precision::new(digits).ok_or_else(|| format!("precision must be 2 or 3, got {digits}"))
    }
}

impl From<Precision> for u8 {
    fn from(precision: Precision) -> Self {
        precision.0
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Layout of a rendered run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// `75.43`: seconds only, however long the run.
    #[default]
    TotalSeconds,
    /// `01:15.43` from one minute up, `45.67` below.
    MinutesSeconds,
}

/// Render a run time.
///
/// The sign is dropped; negative runs are flagged by their
/// [`Outcome`], not by the string. Non-finite input renders as zero.
///
/// ```
/// use fds_timing::results::{Precision, TimeFormat, format_time};
///
/// assert_eq!(format_time(45.678, Precision::TWO, TimeFormat::TotalSeconds), "45.68");
/// assert_eq!(format_time(75.4, Precision::THREE, TimeFormat::TotalSeconds), "75.400");
/// assert_eq!(format_time(75.4, Precision::TWO, TimeFormat::MinutesSeconds), "01:15.40");
/// ```
pub fn format_time(seconds: f64, precision: Precision, format: TimeFormat) -> String {
    let digits = precision.digits();
    let seconds = if seconds.is_finite() { seconds.abs() } else { 0.0 };

    match format {
        TimeFormat::TotalSeconds => format!("{seconds:.digits$}"),
        TimeFormat::MinutesSeconds => {
            // Round before splitting so 59.999 becomes 01:00.00, not 00:60.00.
            let scale = 10f64.powi(digits as i32);
            let rounded = (seconds * scale).round() / scale;
            let minutes = (rounded / 60.0).floor();
            if minutes < 1.0 {
                return format!("{rounded:.digits$}");
            }
            let secs = rounded - minutes * 60.0;
            let width = digits + 3;
            format!("{:02}:{secs:0width$.digits$}", minutes as u64)
        }
    }
}

/// Render a run time for export: three decimals, ` (F)` appended for faults.
pub fn format_for_export(seconds: f64, outcome: Outcome) -> String {
    let time = format_time(seconds, Precision::THREE, TimeFormat::TotalSeconds);
    if outcome.is_fault() { format!("{time} (F)") } else { time }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_seconds() {
        assert_eq!(format_time(45.67, Precision::TWO, TimeFormat::TotalSeconds), "45.67");
        assert_eq!(format_time(45.67, Precision::THREE, TimeFormat::TotalSeconds), "45.670");
        assert_eq!(format_time(125.5, Precision::TWO, TimeFormat::TotalSeconds), "125.50");
        assert_eq!(format_time(0.0, Precision::TWO, TimeFormat::TotalSeconds), "0.00");
    }

    #[test]
    fn sign_is_dropped() {
        assert_eq!(format_time(-3.2, Precision::TWO, TimeFormat::TotalSeconds), "3.20");
        assert_eq!(format_time(-75.0, Precision::TWO, TimeFormat::MinutesSeconds), "01:15.00");
    }

    #[test]
    fn non_finite_renders_as_zero() {
        assert_eq!(format_time(f64::NAN, Precision::THREE, TimeFormat::TotalSeconds), "0.000");
        assert_eq!(format_time(f64::INFINITY, Precision::TWO, TimeFormat::MinutesSeconds), "0.00");
    }

    #[test]
    fn minutes_seconds() {
        assert_eq!(format_time(4.25, Precision::TWO, TimeFormat::MinutesSeconds), "4.25");
        assert_eq!(format_time(64.25, Precision::TWO, TimeFormat::MinutesSeconds), "01:04.25");
        assert_eq!(format_time(64.25, Precision::THREE, TimeFormat::MinutesSeconds), "01:04.250");
        assert_eq!(format_time(600.0, Precision::TWO, TimeFormat::MinutesSeconds), "10:00.00");
    }

    #[test]
    fn minutes_seconds_rounds_before_splitting() {
        assert_eq!(format_time(59.999, Precision::TWO, TimeFormat::MinutesSeconds), "01:00.00");
        assert_eq!(format_time(119.9996, Precision::THREE, TimeFormat::MinutesSeconds), "02:00.000");
    }

    #[test]
    fn export_format() {
        assert_eq!(format_for_export(45.67, Outcome::Clean), "45.670");
        assert_eq!(format_for_export(45.67, Outcome::Fault), "45.670 (F)");
        assert_eq!(format_for_export(-1.5, Outcome::Negative), "1.500");
    }

    #[test]
    fn precision_conversions() {
        assert_eq!(Precision::new(3), Some(Precision::THREE));
        assert_eq!(Precision::new(4), None);
        assert!(Precision::try_from(1u8).is_err());
        assert_eq!(u8::from(Precision::TWO), 2);
        assert_eq!(Precision::default().digits(), 2);
    }
}
