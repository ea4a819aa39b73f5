//! Channel token grammar
//!
//! Accepted spellings:
//! - `RT`, `RTM` (any case): run-time finish, channel 1, manual
//! - `C<n>[M]`, `c<n>[M]`: current firmware; channel 1 is always manual
//! - `M<n>`, `A<n>`: legacy manual/automatic impulses

use crate::types::FINISH_CHANNEL;

/// Which spelling the channel token used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelKind {
    RunTime,
    LowerC,
    UpperC,
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelToken {
    pub number: u32,
    pub is_manual: bool,
    pub kind: ChannelKind,
}

impl ChannelToken {
    /// Spellings whose channel-1 clock readings are already elapsed times.
    pub fn reports_elapsed_clock(&self) -> bool {
        matches!(self.kind, ChannelKind::LowerC | ChannelKind::RunTime)
    }
}

fn parse_digits(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub(crate) fn parse_channel(token: &str) -> Option<ChannelToken> {
    if token.eq_ignore_ascii_case("RT") || token.eq_ignore_ascii_case("RTM") {
        return Some(ChannelToken {
            number: FINISH_CHANNEL,
            is_manual: true,
            kind: ChannelKind::RunTime,
        });
    }

    let mut chars = token.chars();
    let prefix = chars.next()?;
    let rest = chars.as_str();

    match prefix {
        'C' | 'c' => {
            let (digits, manual_suffix) = match rest.strip_suffix(['M', 'm']) {
                Some(digits) => (digits, true),
                None => (rest, false),
            };
            let number = parse_digits(digits)?;
            let kind = if prefix == 'c' { ChannelKind::LowerC } else { ChannelKind::UpperC };
            // Channel 1 is always treated as manually confirmed.
            let is_manual = number == FINISH_CHANNEL || manual_suffix;
            Some(ChannelToken { number, is_manual, kind })
        }
        'M' | 'A' => {
            let number = parse_digits(rest)?;
            Some(ChannelToken { number, is_manual: prefix == 'M', kind: ChannelKind::Legacy })
        }
        _ => None,
    }
}
