//! Device wall-clock timestamps

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ten-thousandths of a second per second.
pub const FRACTION_SCALE: u32 = 10_000;

/// Seconds in a day, used when a run crosses midnight.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Time of day as reported by the timing device.
///
/// `fraction` is kept in ten-thousandths of a second (tenths of a
/// millisecond), which is the widest fractional field the device emits.
/// Shorter fields are right-padded, so `.85` becomes `8500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct WallClockTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub fraction: u16,
}

impl WallClockTime {
    pub fn new(hours: u8, minutes: u8, seconds: u8, fraction: u16) -> Self {
        Self { hours, minutes, seconds, fraction }
    }

    /// Sub-second part in milliseconds (`fraction / 10`).
    pub fn millis(&self) -> f64 {
        f64::from(self.fraction) / 10.0
    }

    /// Seconds elapsed since midnight, including the fraction.
    pub fn seconds_of_day(&self) -> f64 {
        f64::from(self.hours) * 3600.0
            + f64::from(self.minutes) * 60.0
            + f64::from(self.seconds)
            + f64::from(self.fraction) / f64::from(FRACTION_SCALE)
    }

    /// Elapsed seconds from `start` to `self`, wrapping once at midnight.
    pub fn seconds_since(&self, start: &WallClockTime) -> f64 {
        let diff = self.seconds_of_day() - start.seconds_of_day();
        if diff < 0.0 { diff + SECONDS_PER_DAY } else { diff }
    }

    /// Convert to a chrono time of day. `None` when the device reports an
    /// out-of-range field (e.g. hour 25), which the wire grammar allows.
    pub fn to_naive_time(&self) -> Option<chrono::NaiveTime> {
        chrono::NaiveTime::from_hms_micro_opt(
            u32::from(self.hours),
            u32::from(self.minutes),
            u32::from(self.seconds),
            u32::from(self.fraction) * 100,
        )
    }
}

impl fmt::Display for WallClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:04}",
            self.hours, self.minutes, self.seconds, self.fraction
        )
    }
}
