//! Parsing for the duration strings miners put in the `took` field.
//!
//! Miners format durations the way their own tooling prints them: a sequence
//! of decimal numbers, each with a unit suffix, such as `12.5s`, `1m2s`,
//! `350ms` or `1h2m3.5s`. `humantime` rejects fractional components, so the
//! grammar is parsed here.

use std::time::Duration;

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("μs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

fn unit_nanos(unit: &str) -> Option<f64> {
    NANOS_PER_UNIT.iter().find(|(name, _)| *name == unit).map(|(_, nanos)| *nanos)
}

/// Parses a duration such as `"12.5s"` or `"1m2s"`.
///
/// Returns `None` for empty, negative or malformed input. A bare `"0"` is
/// accepted as zero.
#[must_use]
pub fn parse_go_duration(input: &str) -> Option<Duration> {
    let mut rest = input.trim();
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    if rest.starts_with('-') {
        return None;
    }
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return None;
        }
        let value: f64 = number.parse().ok()?;

        let unit_len = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        total_nanos += value * unit_nanos(unit)?;
        rest = tail;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(Duration::from_nanos(total_nanos.round() as u64))
}
