//! Refresh rate control for the running clock

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Refresh period of the running clock at native rate (20Hz).
pub const NATIVE_REFRESH: Duration = Duration::from_millis(50);

/// Native refresh frequency in Hz.
pub const NATIVE_HZ: u32 = 20;

/// Refresh rate for elapsed-time streams
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum UpdateRate {
    /// Refresh every 50ms, the usual timer display rate
    Native,

    /// Refresh at most this many times per second
    /// If the requested rate exceeds the native rate, Native is used
    Max(u32),
}

impl UpdateRate {
    /// Normalize against the native refresh rate
    pub fn normalize(self) -> Self {
        match self {
            UpdateRate::Native => UpdateRate::Native,
            UpdateRate::Max(hz) if hz == 0 || hz >= NATIVE_HZ => UpdateRate::Native,
            UpdateRate::Max(hz) => UpdateRate::Max(hz),
        }
    }

    /// Refresh period for this rate
    pub fn period(self) -> Duration {
        match self.normalize() {
            UpdateRate::Native => NATIVE_REFRESH,
            UpdateRate::Max(hz) => Duration::from_secs_f64(1.0 / f64::from(hz)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_above_native_collapse() {
        assert_eq!(UpdateRate::Max(60).normalize(), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(0).normalize(), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(4).normalize(), UpdateRate::Max(4));
    }

    #[test]
    fn periods() {
        assert_eq!(UpdateRate::Native.period(), Duration::from_millis(50));
        assert_eq!(UpdateRate::Max(4).period(), Duration::from_millis(250));
    }
}
