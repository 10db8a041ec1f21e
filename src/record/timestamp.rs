use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::foundation::error::{PlaceError, PlaceResult};

const SECONDS_LEN: usize = 19;
const SECONDS_FMT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_FRACTION_DIGITS: usize = 3;

/// UTC event time with up to millisecond precision.
///
/// The dataset drops trailing zero digits from the fraction (`.2`, `.23`, `.239`), so a missing
/// digit always means zero and an absent fraction means `.000`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Wrap an existing UTC datetime.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self(dt)
    }

    /// Underlying UTC datetime.
    pub fn as_datetime(self) -> NaiveDateTime {
        self.0
    }

    /// Seconds since the unix epoch, fraction truncated.
    pub fn whole_second(self) -> i64 {
        self.0.and_utc().timestamp()
    }

    /// Millisecond part of the fraction.
    pub fn millis(self) -> u32 {
        self.0.nanosecond() / 1_000_000
    }

    /// Parse `YYYY-MM-DD HH:MM:SS[.f{1,3}][ UTC]`.
    ///
    /// Used on the replay path: any fraction that is not 1-3 digits is rejected rather than
    /// guessed.
    pub fn parse_strict(s: &str) -> PlaceResult<Self> {
        let s = strip_zone(s);
        let base = parse_seconds(s)?;
        let rest = &s[SECONDS_LEN..];
        if rest.is_empty() {
            return Ok(Self(base));
        }

        let digits = rest.strip_prefix('.').ok_or_else(|| {
            PlaceError::ambiguous_timestamp(format!("unexpected suffix \"{rest}\" in \"{s}\""))
        })?;
        if digits.is_empty()
            || digits.len() > MAX_FRACTION_DIGITS
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(PlaceError::ambiguous_timestamp(format!(
                "fraction \"{digits}\" in \"{s}\" is not 1-3 digits"
            )));
        }
        Ok(Self(base + fraction_delta(digits)))
    }

    /// Parse for sorting: the seconds part must be valid, the fraction is recovered best-effort.
    ///
    /// Up to three fraction digits are captured; on failure trailing digits are dropped one at a
    /// time (3, 2, 1) and the fraction defaults to zero if none parse. The flag is `true` when the
    /// captured fraction was not used in full.
    pub fn parse_lenient(s: &str) -> PlaceResult<(Self, bool)> {
        let s = strip_zone(s);
        let base = parse_seconds(s)?;
        let Some(after_dot) = s[SECONDS_LEN..].strip_prefix('.') else {
            let recovered = !s[SECONDS_LEN..].is_empty();
            return Ok((Self(base), recovered));
        };

        let captured: &[u8] = &after_dot.as_bytes()[..after_dot.len().min(MAX_FRACTION_DIGITS)];
        for n in (1..=captured.len()).rev() {
            let head = &captured[..n];
            if head.iter().all(u8::is_ascii_digit) {
                // All-ASCII, so slicing the str at `n` is on a char boundary.
                let digits = &after_dot[..n];
                return Ok((Self(base + fraction_delta(digits)), n != after_dot.len()));
            }
        }
        Ok((Self(base), true))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

fn strip_zone(s: &str) -> &str {
    let s = s.trim();
    s.strip_suffix("UTC").map(str::trim_end).unwrap_or(s)
}

fn parse_seconds(s: &str) -> PlaceResult<NaiveDateTime> {
    let head = s.get(..SECONDS_LEN).ok_or_else(|| {
        PlaceError::ambiguous_timestamp(format!("\"{s}\" is shorter than a full date and time"))
    })?;
    NaiveDateTime::parse_from_str(head, SECONDS_FMT)
        .map_err(|e| PlaceError::ambiguous_timestamp(format!("\"{head}\": {e}")))
}

fn fraction_delta(digits: &str) -> TimeDelta {
    let mut millis: i64 = 0;
    for (i, b) in digits.bytes().take(MAX_FRACTION_DIGITS).enumerate() {
        let place = 10_i64.pow((MAX_FRACTION_DIGITS - 1 - i) as u32);
        millis += i64::from(b - b'0') * place;
    }
    TimeDelta::milliseconds(millis)
}

#[cfg(test)]
#[path = "../../tests/unit/record/timestamp.rs"]
mod tests;
