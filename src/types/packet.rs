//! Typed packets produced by the protocol parser

use serde::{Deserialize, Serialize};

use super::WallClockTime;

/// Channel number of the start gate.
pub const START_CHANNEL: u32 = 0;

/// Channel number of the finish gate.
pub const FINISH_CHANNEL: u32 = 1;

/// How the time field of a timing line is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    /// Time of day (`HH:MM:SS.FFFF`).
    Absolute,
    /// Elapsed seconds (`SSS.FFFF`).
    Delta,
}

/// Status/control token such as `n1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ControlPacket {
    /// The token exactly as received.
    pub command: String,
}

/// A single timing impulse from the device.
///
/// `mode == Absolute` always comes with `absolute_time` set and
/// `delta_time == 0.0`; `mode == Delta` never has `absolute_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct TimingPacket {
    pub user_id: u32,
    pub mode: TimeMode,
    pub channel_number: u32,
    pub is_manual: bool,
    pub absolute_time: Option<WallClockTime>,
    pub delta_time: f64,
    pub status: i32,
    /// Trimmed time token as received.
    pub original_time_string: String,
    /// Trimmed channel token as received.
    pub original_channel_string: String,
}

impl TimingPacket {
    /// Channel 0 carrying a time of day.
    pub fn is_start_signal(&self) -> bool {
        self.channel_number == START_CHANNEL && self.mode == TimeMode::Absolute
    }

    pub fn is_finish_channel(&self) -> bool {
        self.channel_number == FINISH_CHANNEL
    }

    /// Whether the channel token is one of the finish aliases trusted by
    /// newer firmware: `c1`, `c1M`, `RT`, `RTM`.
    ///
    /// `RT`/`RTM` compare case-insensitively and the `M` suffix may be either
    /// case, but the `c` must be lowercase: an uppercase `C1` is the raw
    /// finish beam and is not trusted.
    pub fn is_allow_listed_finish(&self) -> bool {
        let channel = self.original_channel_string.as_str();
        if channel.eq_ignore_ascii_case("RT") || channel.eq_ignore_ascii_case("RTM") {
            return true;
        }
        matches!(channel, "c1" | "c1M" | "c1m")
    }
}

/// Parsed line from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    Control(ControlPacket),
    Timing(TimingPacket),
}

impl Packet {
    pub fn as_timing(&self) -> Option<&TimingPacket> {
        match self {
            Packet::Timing(timing) => Some(timing),
            Packet::Control(_) => None,
        }
    }
}
