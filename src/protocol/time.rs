//! Time token grammar
//!
//! - `HH:MM:SS.F{2,4}` and `HH:MM:SS:FFFF`: clock readings
//! - `S{1,9}[.F{1,4}]`: elapsed seconds

use crate::types::WallClockTime;

/// Width the fractional field is padded to for wall-clock construction.
const FRACTION_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FractionSeparator {
    Dot,
    Colon,
}

/// Clock reading with the fraction digits kept as received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClockFields<'a> {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub fraction_digits: &'a str,
    pub separator: FractionSeparator,
}

impl ClockFields<'_> {
    /// Wall-clock value with the fraction right-padded to four digits.
    pub fn wall_clock(&self) -> WallClockTime {
        let fraction = self
            .fraction_digits
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(FRACTION_WIDTH)
            .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
        WallClockTime::new(self.hours, self.minutes, self.seconds, fraction)
    }

    /// The reading as elapsed seconds, fraction taken at its own scale
    /// (`.77` is 0.77s, `.7700` is 0.77s).
    pub fn elapsed_seconds(&self) -> f64 {
        let whole = f64::from(self.hours) * 3600.0
            + f64::from(self.minutes) * 60.0
            + f64::from(self.seconds);
        let digits = self.fraction_digits.len() as i32;
        let fraction = self.fraction_digits.parse::<u32>().map(f64::from).unwrap_or(0.0);
        whole + fraction / 10f64.powi(digits)
    }

    /// `HH:MM:SS.FF` exactly.
    pub fn has_two_digit_fraction(&self) -> bool {
        self.separator == FractionSeparator::Dot && self.fraction_digits.len() == 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TimeToken<'a> {
    Clock(ClockFields<'a>),
    Seconds(f64),
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn two_digit_field(s: &str) -> Option<u8> {
    if s.len() == 2 && all_digits(s) { s.parse().ok() } else { None }
}

fn parse_clock(token: &str) -> Option<ClockFields<'_>> {
    // HH:MM:SS + separator + fraction
    if token.len() < 11 || token.as_bytes()[2] != b':' || token.as_bytes()[5] != b':' {
        return None;
    }
    let hours = two_digit_field(&token[0..2])?;
    let minutes = two_digit_field(&token[3..5])?;
    let seconds = two_digit_field(&token[6..8])?;

    let separator = match token.as_bytes()[8] {
        b'.' => FractionSeparator::Dot,
        b':' => FractionSeparator::Colon,
        _ => return None,
    };
    let fraction_digits = &token[9..];
    let width_ok = match separator {
        FractionSeparator::Dot => (2..=FRACTION_WIDTH).contains(&fraction_digits.len()),
        FractionSeparator::Colon => fraction_digits.len() == FRACTION_WIDTH,
    };
    if !width_ok || !all_digits(fraction_digits) {
        return None;
    }

    Some(ClockFields { hours, minutes, seconds, fraction_digits, separator })
}

fn parse_seconds(token: &str) -> Option<f64> {
    let (whole, fraction) = match token.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (token, None),
    };
    if !all_digits(whole) || whole.len() > 9 {
        return None;
    }
    if let Some(fraction) = fraction {
        if !all_digits(fraction) || fraction.len() > 4 {
            return None;
        }
    }
    token.parse().ok()
}

pub(crate) fn parse_time(token: &str) -> Option<TimeToken<'_>> {
    let token = token.trim();
    if !token.is_ascii() {
        return None;
    }
    if let Some(clock) = parse_clock(token) {
        return Some(TimeToken::Clock(clock));
    }
    parse_seconds(token).map(TimeToken::Seconds)
}
