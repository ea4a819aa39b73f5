//! ALGE/FDS line parser
//!
//! Turns one framed line into a [`Packet`] or a [`Rejection`]. Parsing is
//! pure: the same line always gives the same answer and nothing is logged
//! here; callers decide what a rejection is worth.
//!
//! Line shapes:
//!
//! ```text
//! n1                         control token
//! 0003 c1 00:00:05.77 0      user  channel  time  status
//! t0010 C0M 12:01:24.2050 0
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use super::channel::{ChannelToken, parse_channel};
use super::time::{ClockFields, TimeToken, parse_time};
use crate::types::{ControlPacket, FINISH_CHANNEL, Packet, TimeMode, TimingPacket};

/// Why a line is not a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("line is empty")]
    Empty,

    #[error("expected 4 fields, found {0}")]
    TokenCount(usize),

    #[error("invalid user id '{0}'")]
    UserId(String),

    #[error("invalid status '{0}'")]
    Status(String),

    #[error("unrecognized channel '{0}'")]
    Channel(String),

    #[error("unrecognized time '{0}'")]
    Time(String),
}

/// When a channel-1 clock reading is taken to be an elapsed time.
///
/// Two device generations disagree here, so both rules can be switched
/// independently. A reading is converted when any enabled rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct DeltaRules {
    /// `c1…`, `RT` and `RTM` report elapsed time in clock notation.
    pub lowercase_alias: bool,
    /// Any `HH:MM:SS.FF` (exactly two fraction digits) is elapsed time.
    pub two_digit_fraction: bool,
}

impl Default for DeltaRules {
    fn default() -> Self {
        Self { lowercase_alias: true, two_digit_fraction: true }
    }
}

impl DeltaRules {
    fn converts(&self, channel: &ChannelToken, clock: &ClockFields<'_>) -> bool {
        channel.number == FINISH_CHANNEL
            && ((self.lowercase_alias && channel.reports_elapsed_clock())
                || (self.two_digit_fraction && clock.has_two_digit_fraction()))
    }
}

/// Line parser configured with a set of [`DeltaRules`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketParser {
    rules: DeltaRules,
}

impl PacketParser {
    pub fn new(rules: DeltaRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> DeltaRules {
        self.rules
    }

    /// Parse one line.
    ///
    /// ```
    /// use fds_timing::protocol::{DeltaRules, PacketParser};
    /// use fds_timing::types::TimeMode;
    ///
    /// let parser = PacketParser::new(DeltaRules::default());
    /// let packet = parser.parse("3 c1M 00:00:05.77 0").unwrap();
    /// let timing = packet.as_timing().unwrap();
    /// assert_eq!(timing.mode, TimeMode::Delta);
    /// assert!((timing.delta_time - 5.77).abs() < 1e-9);
    /// ```
    pub fn parse(&self, line: &str) -> Result<Packet, Rejection> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            [] => Err(Rejection::Empty),
            [token] if is_control_token(token) => {
                Ok(Packet::Control(ControlPacket { command: (*token).to_string() }))
            }
            [user, channel, time, status] => {
                self.parse_timing(user, channel, time, status).map(Packet::Timing)
            }
            other => Err(Rejection::TokenCount(other.len())),
        }
    }

    fn parse_timing(
        &self,
        user: &str,
        channel: &str,
        time: &str,
        status: &str,
    ) -> Result<TimingPacket, Rejection> {
        let user_id = parse_user_id(user).ok_or_else(|| Rejection::UserId(user.to_string()))?;
        let status_value = status
            .parse::<i32>()
            .ok()
            .filter(|value| *value >= 0)
            .ok_or_else(|| Rejection::Status(status.to_string()))?;

        let channel_token =
            parse_channel(channel).ok_or_else(|| Rejection::Channel(channel.to_string()))?;

        let time = time.trim();
        let reading = parse_time(time).ok_or_else(|| Rejection::Time(time.to_string()))?;

        let (mode, absolute_time, delta_time) = match reading {
            TimeToken::Seconds(seconds) => (TimeMode::Delta, None, seconds),
            TimeToken::Clock(clock) if self.rules.converts(&channel_token, &clock) => {
                (TimeMode::Delta, None, clock.elapsed_seconds())
            }
            TimeToken::Clock(clock) => (TimeMode::Absolute, Some(clock.wall_clock()), 0.0),
        };

        Ok(TimingPacket {
            user_id,
            mode,
            channel_number: channel_token.number,
            is_manual: channel_token.is_manual,
            absolute_time,
            delta_time,
            status: status_value,
            original_time_string: time.to_string(),
            original_channel_string: channel.trim().to_string(),
        })
    }
}

/// `n<digits>`, either case.
fn is_control_token(token: &str) -> bool {
    token
        .strip_prefix(['n', 'N'])
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// First run of digits anywhere in the token, so tagged ids like `t0010`
/// parse as 10.
fn parse_user_id(token: &str) -> Option<u32> {
    let start = token.find(|c: char| c.is_ascii_digit())?;
    let digits = &token[start..];
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// Parse with both reinterpretation rules enabled.
pub fn parse(line: &str) -> Result<Packet, Rejection> {
    PacketParser::default().parse(line)
}

impl FromStr for Packet {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
