//! Calendar values: dates, datetimes, times, durations and fixed offsets
//!
//! Backed by `chrono`; the year range is clamped to 1..=9999 and durations
//! to ±999999999 days, like the native datetime module.

use std::cmp::Ordering;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{EvalError, Result};

/// Microseconds per day.
pub const MICROS_PER_DAY: i128 = 86_400_000_000;

/// Largest magnitude of a duration in days.
pub const MAX_DELTA_DAYS: i128 = 999_999_999;

/// Earliest supported year.
pub const MIN_YEAR: i32 = 1;

/// Latest supported year.
pub const MAX_YEAR: i32 = 9999;

pub(crate) fn out_of_range() -> EvalError {
    EvalError::overflow("date value out of range")
}

/// Reject dates outside the supported year range.
pub fn check_date(date: NaiveDate) -> Result<NaiveDate> {
    if (MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        Ok(date)
    } else {
        Err(out_of_range())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TimeDelta
// ═══════════════════════════════════════════════════════════════════════

/// `datetime.timedelta`, stored as a signed microsecond count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeDelta {
    micros: i128,
}

impl TimeDelta {
    /// Duration from a microsecond count.
    ///
    /// # Errors
    ///
    /// `OverflowError` when the day component leaves ±999999999.
    pub fn from_micros(micros: i128) -> Result<Self> {
        let delta = Self { micros };
        let days = delta.days() as i128;
        if days.abs() > MAX_DELTA_DAYS {
            return Err(EvalError::overflow(format!(
                "days={}; must have magnitude <= {}",
                days, MAX_DELTA_DAYS
            )));
        }
        Ok(delta)
    }

    /// Smallest representable duration.
    pub fn min() -> Self {
        Self {
            micros: -MAX_DELTA_DAYS * MICROS_PER_DAY,
        }
    }

    /// Largest representable duration.
    pub fn max() -> Self {
        Self {
            micros: MAX_DELTA_DAYS * MICROS_PER_DAY + MICROS_PER_DAY - 1,
        }
    }

    /// Total microseconds.
    pub fn micros(self) -> i128 {
        self.micros
    }

    /// Whether this is the zero duration.
    pub fn is_zero(self) -> bool {
        self.micros == 0
    }

    /// Normalized day component (may be negative).
    pub fn days(self) -> i64 {
        self.micros.div_euclid(MICROS_PER_DAY) as i64
    }

    /// Normalized seconds component, in `0..86400`.
    pub fn seconds(self) -> i64 {
        (self.micros.rem_euclid(MICROS_PER_DAY) / 1_000_000) as i64
    }

    /// Normalized microseconds component, in `0..1000000`.
    pub fn microseconds(self) -> i64 {
        (self.micros.rem_euclid(1_000_000)) as i64
    }

    /// Duration in seconds as a float.
    pub fn total_seconds(self) -> f64 {
        self.micros as f64 / 1e6
    }

    /// Convert to a chrono duration for calendar arithmetic.
    pub fn to_chrono(self) -> Result<Duration> {
        let micros = i64::try_from(self.micros).map_err(|_| out_of_range())?;
        Ok(Duration::microseconds(micros))
    }

    /// Convert from a chrono duration.
    pub fn from_chrono(d: Duration) -> Result<Self> {
        let micros = d
            .num_microseconds()
            .ok_or_else(|| EvalError::overflow("timedelta out of range"))?;
        Self::from_micros(micros as i128)
    }

    /// `str(td)`: `[D day[s], ]H:MM:SS[.ffffff]`.
    pub fn to_display(self) -> String {
        let seconds = self.seconds();
        let (hh, rest) = (seconds / 3600, seconds % 3600);
        let (mm, ss) = (rest / 60, rest % 60);
        let mut out = String::new();
        let days = self.days();
        if days != 0 {
            let plural = if days.abs() != 1 { "s" } else { "" };
            out.push_str(&format!("{} day{}, ", days, plural));
        }
        out.push_str(&format!("{}:{:02}:{:02}", hh, mm, ss));
        let us = self.microseconds();
        if us != 0 {
            out.push_str(&format!(".{:06}", us));
        }
        out
    }

    /// `repr(td)`.
    pub fn to_repr(self) -> String {
        let mut parts = Vec::new();
        if self.days() != 0 {
            parts.push(format!("days={}", self.days()));
        }
        if self.seconds() != 0 {
            parts.push(format!("seconds={}", self.seconds()));
        }
        if self.microseconds() != 0 {
            parts.push(format!("microseconds={}", self.microseconds()));
        }
        if parts.is_empty() {
            parts.push("0".to_string());
        }
        format!("datetime.timedelta({})", parts.join(", "))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Offsets
// ═══════════════════════════════════════════════════════════════════════

/// `±HH:MM[:SS]` rendering of an offset.
pub fn format_offset(offset: FixedOffset, with_colon: bool) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    let (hh, mm, ss) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let sep = if with_colon { ":" } else { "" };
    if ss != 0 {
        format!("{}{:02}{}{:02}{}{:02}", sign, hh, sep, mm, sep, ss)
    } else {
        format!("{}{:02}{}{:02}", sign, hh, sep, mm)
    }
}

/// `timezone.tzname()`.
pub fn tz_name(offset: FixedOffset) -> String {
    if offset.local_minus_utc() == 0 {
        "UTC".to_string()
    } else {
        format!("UTC{}", format_offset(offset, true))
    }
}

/// `repr(timezone)`.
pub fn tz_repr(offset: FixedOffset) -> String {
    if offset.local_minus_utc() == 0 {
        "datetime.timezone.utc".to_string()
    } else {
        let delta = TimeDelta {
            micros: offset.local_minus_utc() as i128 * 1_000_000,
        };
        format!("datetime.timezone({})", delta.to_repr())
    }
}

/// Offset of a duration, validated to lie strictly within ±24h.
pub fn offset_from_delta(delta: TimeDelta) -> Result<FixedOffset> {
    let micros = delta.micros();
    if micros % 1_000_000 != 0 {
        return Err(EvalError::value_error(
            "offset must be a timedelta representing a whole number of seconds",
        ));
    }
    FixedOffset::east_opt((micros / 1_000_000) as i32).ok_or_else(|| {
        EvalError::value_error(
            "offset must be a timedelta strictly between -timedelta(hours=24) and timedelta(hours=24).",
        )
    })
}

fn micro_of(time: &NaiveTime) -> u32 {
    (time.nanosecond() / 1000).min(999_999)
}

fn format_time(time: &NaiveTime, tz: Option<FixedOffset>) -> String {
    let mut out = format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second());
    let us = micro_of(time);
    if us != 0 {
        out.push_str(&format!(".{:06}", us));
    }
    if let Some(offset) = tz {
        out.push_str(&format_offset(offset, true));
    }
    out
}

/// `date.isoformat()`.
pub fn date_iso(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// `repr(date)`.
pub fn date_repr(date: NaiveDate) -> String {
    format!(
        "datetime.date({}, {}, {})",
        date.year(),
        date.month(),
        date.day()
    )
}

// ═══════════════════════════════════════════════════════════════════════
// DateTime
// ═══════════════════════════════════════════════════════════════════════

/// `datetime.datetime`: wall-clock time plus an optional fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeValue {
    /// Local wall-clock time
    pub naive: NaiveDateTime,
    /// `tzinfo`, if aware
    pub tz: Option<FixedOffset>,
}

impl DateTimeValue {
    /// Naive datetime.
    pub fn naive(naive: NaiveDateTime) -> Self {
        Self { naive, tz: None }
    }

    /// Microsecond component.
    pub fn microsecond(&self) -> u32 {
        micro_of(&self.naive.time())
    }

    /// The instant in UTC, for aware values.
    pub fn utc(&self) -> Option<NaiveDateTime> {
        self.tz
            .map(|offset| self.naive - Duration::seconds(offset.local_minus_utc() as i64))
    }

    /// `isoformat(sep)`.
    pub fn iso(&self, sep: char) -> String {
        format!(
            "{}{}{}",
            date_iso(self.naive.date()),
            sep,
            format_time(&self.naive.time(), self.tz)
        )
    }

    /// `repr(dt)`.
    pub fn to_repr(&self) -> String {
        let date = self.naive.date();
        let time = self.naive.time();
        let mut fields = vec![
            date.year() as i64,
            date.month() as i64,
            date.day() as i64,
            time.hour() as i64,
            time.minute() as i64,
            time.second() as i64,
            self.microsecond() as i64,
        ];
        for _ in 0..2 {
            if fields.last() == Some(&0) {
                fields.pop();
            }
        }
        let joined = fields
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self.tz {
            Some(offset) => format!("datetime.datetime({}, tzinfo={})", joined, tz_repr(offset)),
            None => format!("datetime.datetime({})", joined),
        }
    }

    /// `dt + td`.
    pub fn add(&self, delta: TimeDelta) -> Result<Self> {
        let naive = self
            .naive
            .checked_add_signed(delta.to_chrono()?)
            .ok_or_else(out_of_range)?;
        check_date(naive.date())?;
        Ok(Self { naive, tz: self.tz })
    }

    /// `dt - other`.
    pub fn diff(&self, other: &Self) -> Result<TimeDelta> {
        let (a, b) = match (self.utc(), other.utc()) {
            (Some(a), Some(b)) => (a, b),
            (None, None) => (self.naive, other.naive),
            _ => {
                return Err(EvalError::type_error(
                    "can't subtract offset-naive and offset-aware datetimes",
                ))
            }
        };
        TimeDelta::from_chrono(a - b)
    }

    /// Ordering; naive and aware values are not comparable.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        match (self.utc(), other.utc()) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            (None, None) => Ok(self.naive.cmp(&other.naive)),
            _ => Err(EvalError::type_error(
                "can't compare offset-naive and offset-aware datetimes",
            )),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Time
// ═══════════════════════════════════════════════════════════════════════

/// `datetime.time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeValue {
    /// Wall-clock time of day
    pub naive: NaiveTime,
    /// `tzinfo`, if aware
    pub tz: Option<FixedOffset>,
}

impl TimeValue {
    /// Microsecond component.
    pub fn microsecond(&self) -> u32 {
        micro_of(&self.naive)
    }

    /// `isoformat()`.
    pub fn iso(&self) -> String {
        format_time(&self.naive, self.tz)
    }

    /// `repr(t)`.
    pub fn to_repr(&self) -> String {
        let (second, us) = (self.naive.second(), self.microsecond());
        let tail = if us != 0 {
            format!(", {}, {}", second, us)
        } else if second != 0 {
            format!(", {}", second)
        } else {
            String::new()
        };
        let base = format!(
            "datetime.time({}, {}{})",
            self.naive.hour(),
            self.naive.minute(),
            tail
        );
        match self.tz {
            Some(offset) => format!("{}, tzinfo={})", &base[..base.len() - 1], tz_repr(offset)),
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timedelta_components() {
        let td = TimeDelta::from_micros(-1).unwrap();
        assert_eq!(td.days(), -1);
        assert_eq!(td.seconds(), 86399);
        assert_eq!(td.microseconds(), 999_999);
        assert_eq!(td.to_display(), "-1 day, 23:59:59.999999");
        assert_eq!(
            td.to_repr(),
            "datetime.timedelta(days=-1, seconds=86399, microseconds=999999)"
        );
    }

    #[test]
    fn test_timedelta_display() {
        let td = TimeDelta::from_micros(2 * MICROS_PER_DAY + 3_723_000_000).unwrap();
        assert_eq!(td.to_display(), "2 days, 1:02:03");
        assert_eq!(TimeDelta::from_micros(0).unwrap().to_repr(), "datetime.timedelta(0)");
        assert!(TimeDelta::from_micros(MICROS_PER_DAY * 1_000_000_000).is_err());
    }

    #[test]
    fn test_offsets() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(tz_name(kst), "UTC+09:00");
        assert_eq!(
            tz_repr(kst),
            "datetime.timezone(datetime.timedelta(seconds=32400))"
        );
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(tz_repr(utc), "datetime.timezone.utc");
    }

    #[test]
    fn test_datetime_repr() {
        let naive = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 0)
            .unwrap();
        let dt = DateTimeValue::naive(naive);
        assert_eq!(dt.to_repr(), "datetime.datetime(2020, 1, 2, 3, 4)");
        assert_eq!(dt.iso(' '), "2020-01-02 03:04:00");
    }

    #[test]
    fn test_time_repr() {
        let t = TimeValue {
            naive: NaiveTime::from_hms_opt(12, 30, 5).unwrap(),
            tz: None,
        };
        assert_eq!(t.to_repr(), "datetime.time(12, 30, 5)");
        assert_eq!(t.iso(), "12:30:05");
    }
}
