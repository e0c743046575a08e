//! The `datetime` namespace: constructors, class methods, instance methods
//! and `strftime`
//!
//! Calendar values live in [`crate::value::datetime`]; this module is the
//! library surface over them. Local-time conversions use the host clock
//! through `chrono::Local`.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use num_traits::ToPrimitive;

use super::Args;
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::datetime::{
    check_date, date_iso, format_offset, offset_from_delta, out_of_range, tz_name, MAX_YEAR,
    MICROS_PER_DAY, MIN_YEAR,
};
use crate::value::{DateTimeValue, PyType, TimeDelta, TimeValue, Value};

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// ═══════════════════════════════════════════════════════════════════════
// Namespace and class-level constants
// ═══════════════════════════════════════════════════════════════════════

pub(super) fn module_attr(name: &str) -> Option<Value> {
    let t = match name {
        "date" => PyType::Date,
        "datetime" => PyType::DateTime,
        "time" => PyType::Time,
        "timedelta" => PyType::TimeDelta,
        "tzinfo" => PyType::TzInfo,
        _ => return None,
    };
    Some(Value::Type(t))
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn micros(n: i128) -> Value {
    TimeDelta::from_micros(n).map_or(Value::None, Value::TimeDelta)
}

/// `min`, `max`, `resolution` and `timezone.utc`.
pub(super) fn class_constant(t: PyType, name: &str) -> Option<Value> {
    let max_time = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?;
    let first = NaiveDate::from_ymd_opt(MIN_YEAR, 1, 1)?;
    let last = NaiveDate::from_ymd_opt(MAX_YEAR, 12, 31)?;
    let value = match (t, name) {
        (PyType::Date, "min") => Value::Date(first),
        (PyType::Date, "max") => Value::Date(last),
        (PyType::Date, "resolution") => micros(MICROS_PER_DAY),
        (PyType::DateTime, "min") => Value::DateTime(DateTimeValue::naive(first.and_time(NaiveTime::default()))),
        (PyType::DateTime, "max") => Value::DateTime(DateTimeValue::naive(last.and_time(max_time))),
        (PyType::Time, "min") => Value::Time(TimeValue {
            naive: NaiveTime::default(),
            tz: None,
        }),
        (PyType::Time, "max") => Value::Time(TimeValue {
            naive: max_time,
            tz: None,
        }),
        (PyType::DateTime | PyType::Time | PyType::TimeDelta, "resolution") => micros(1),
        (PyType::TimeDelta, "min") => Value::TimeDelta(TimeDelta::min()),
        (PyType::TimeDelta, "max") => Value::TimeDelta(TimeDelta::max()),
        (PyType::TimeZone, "utc") => Value::TimeZone(utc()),
        _ => return None,
    };
    Some(value)
}

fn tz_value(tz: Option<FixedOffset>) -> Value {
    tz.map_or(Value::None, Value::TimeZone)
}

/// Data attributes of dates, datetimes and times.
pub(super) fn field(value: &Value, name: &str) -> Option<Value> {
    let (date, time, tz) = match value {
        Value::Date(d) => (Some(*d), None, None),
        Value::DateTime(dt) => (Some(dt.naive.date()), Some(dt.naive.time()), Some(dt.tz)),
        Value::Time(t) => (None, Some(t.naive), Some(t.tz)),
        _ => return None,
    };
    let n = match (name, date, time) {
        ("year", Some(d), _) => d.year() as i64,
        ("month", Some(d), _) => d.month() as i64,
        ("day", Some(d), _) => d.day() as i64,
        ("hour", _, Some(t)) => t.hour() as i64,
        ("minute", _, Some(t)) => t.minute() as i64,
        ("second", _, Some(t)) => t.second() as i64,
        ("microsecond", _, Some(t)) => (t.nanosecond() / 1000).min(999_999) as i64,
        ("fold", _, Some(_)) => 0,
        ("tzinfo", _, Some(_)) => return tz.map(tz_value),
        _ => return None,
    };
    Some(Value::from(n))
}

// ═══════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════

fn int_arg(value: Option<Value>, default: i64) -> Result<i64> {
    match value {
        Some(v) => v.to_i64(),
        None => Ok(default),
    }
}

fn make_date(year: i64, month: i64, day: i64) -> Result<NaiveDate> {
    if !(MIN_YEAR as i64..=MAX_YEAR as i64).contains(&year) {
        return Err(EvalError::value_error(format!("year {} is out of range", year)));
    }
    if !(1..=12).contains(&month) {
        return Err(EvalError::value_error("month must be in 1..12"));
    }
    if !(1..=31).contains(&day) {
        return Err(EvalError::value_error("day is out of range for month"));
    }
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| EvalError::value_error("day is out of range for month"))
}

fn make_time(hour: i64, minute: i64, second: i64, micro: i64) -> Result<NaiveTime> {
    let checks = [
        (hour, 23, "hour must be in 0..23"),
        (minute, 59, "minute must be in 0..59"),
        (second, 59, "second must be in 0..59"),
        (micro, 999_999, "microsecond must be in 0..999999"),
    ];
    for (value, max, message) in checks {
        if !(0..=max).contains(&value) {
            return Err(EvalError::value_error(message));
        }
    }
    NaiveTime::from_hms_micro_opt(hour as u32, minute as u32, second as u32, micro as u32)
        .ok_or_else(|| EvalError::value_error("time value out of range"))
}

fn tz_arg(value: &Value) -> Result<Option<FixedOffset>> {
    match value {
        Value::None => Ok(None),
        Value::TimeZone(offset) => Ok(Some(*offset)),
        other => Err(EvalError::type_error(format!(
            "tzinfo argument must be None or of a tzinfo subclass, not type '{}'",
            other.type_name()
        ))),
    }
}

fn fold_arg(value: Option<Value>) -> Result<()> {
    match int_arg(value, 0)? {
        0 | 1 => Ok(()),
        _ => Err(EvalError::value_error("fold must be either 0 or 1")),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Constructors
// ═══════════════════════════════════════════════════════════════════════

/// Call `date`, `datetime`, `time`, `timedelta` or `timezone`.
pub(super) fn construct(t: PyType, args: Args) -> Result<Value> {
    match t {
        PyType::Date => {
            let [year, month, day] = args.fixed("date", ["year", "month", "day"])?;
            Ok(Value::Date(make_date(year.to_i64()?, month.to_i64()?, day.to_i64()?)?))
        }
        PyType::DateTime => {
            let ([year, month, day], [hour, minute, second, micro, tzinfo, fold]) = args.bind(
                "datetime",
                ["year", "month", "day"],
                ["hour", "minute", "second", "microsecond", "tzinfo", "fold"],
            )?;
            fold_arg(fold)?;
            let date = make_date(year.to_i64()?, month.to_i64()?, day.to_i64()?)?;
            let time = make_time(
                int_arg(hour, 0)?,
                int_arg(minute, 0)?,
                int_arg(second, 0)?,
                int_arg(micro, 0)?,
            )?;
            let tz = tzinfo.map_or(Ok(None), |v| tz_arg(&v))?;
            Ok(Value::DateTime(DateTimeValue {
                naive: date.and_time(time),
                tz,
            }))
        }
        PyType::Time => {
            let ([], [hour, minute, second, micro, tzinfo, fold]) = args.bind(
                "time",
                [],
                ["hour", "minute", "second", "microsecond", "tzinfo", "fold"],
            )?;
            fold_arg(fold)?;
            let naive = make_time(
                int_arg(hour, 0)?,
                int_arg(minute, 0)?,
                int_arg(second, 0)?,
                int_arg(micro, 0)?,
            )?;
            let tz = tzinfo.map_or(Ok(None), |v| tz_arg(&v))?;
            Ok(Value::Time(TimeValue { naive, tz }))
        }
        PyType::TimeDelta => construct_timedelta(args),
        PyType::TimeZone => {
            let [offset] = args.fixed("timezone", ["offset"])?;
            match offset {
                Value::TimeDelta(delta) => Ok(Value::TimeZone(offset_from_delta(delta)?)),
                other => Err(EvalError::type_error(format!(
                    "timezone() argument 1 must be datetime.timedelta, not {}",
                    other.type_name()
                ))),
            }
        }
        other => Err(EvalError::type_error(format!(
            "cannot create '{}' instances",
            other.qualified_name()
        ))),
    }
}

const DELTA_UNITS: [(&str, i128); 7] = [
    ("days", MICROS_PER_DAY),
    ("seconds", 1_000_000),
    ("microseconds", 1),
    ("milliseconds", 1_000),
    ("minutes", 60_000_000),
    ("hours", 3_600_000_000),
    ("weeks", 7 * MICROS_PER_DAY),
];

fn construct_timedelta(args: Args) -> Result<Value> {
    let ([], values) = args.bind(
        "timedelta",
        [],
        ["days", "seconds", "microseconds", "milliseconds", "minutes", "hours", "weeks"],
    )?;
    let mut exact: i128 = 0;
    let mut fractional: f64 = 0.0;
    for (value, (unit, scale)) in values.into_iter().zip(DELTA_UNITS) {
        let Some(value) = value else { continue };
        let whole = match &value {
            Value::Bool(_) | Value::Int(_) => value.as_bigint(),
            Value::Decimal(d) => d.to_integer(),
            _ => None,
        };
        match (whole, &value) {
            (Some(n), _) => {
                let part = n
                    .to_i128()
                    .and_then(|n| n.checked_mul(scale))
                    .ok_or_else(|| EvalError::overflow("Python int too large to convert to C int"))?;
                exact = exact.checked_add(part).ok_or_else(out_of_range)?;
            }
            (None, Value::Float(_) | Value::Decimal(_)) => fractional += value.to_f64()? * scale as f64,
            (None, other) => {
                return Err(EvalError::type_error(format!(
                    "unsupported type for timedelta {} component: {}",
                    unit,
                    other.type_name()
                )))
            }
        }
    }
    let rounded = fractional.round_ties_even();
    if !rounded.is_finite() || rounded.abs() > 1e30 {
        return Err(EvalError::overflow("cannot convert float infinity to integer"));
    }
    let total = exact
        .checked_add(rounded as i128)
        .ok_or_else(out_of_range)?;
    Ok(Value::TimeDelta(TimeDelta::from_micros(total)?))
}

// ═══════════════════════════════════════════════════════════════════════
// Clock and timestamps
// ═══════════════════════════════════════════════════════════════════════

fn utc_from_timestamp(ts: &Value) -> Result<NaiveDateTime> {
    let seconds = ts.to_f64()?;
    let micros = (seconds * 1e6).round_ties_even();
    if !micros.is_finite() || micros.abs() > 1e18 {
        return Err(EvalError::overflow("timestamp out of range for platform time_t"));
    }
    let micros = micros as i64;
    let (secs, sub) = (micros.div_euclid(1_000_000), micros.rem_euclid(1_000_000));
    let instant = DateTime::from_timestamp(secs, (sub * 1000) as u32)
        .ok_or_else(|| EvalError::value_error("year is out of range"))?;
    let naive = instant.naive_utc();
    check_date(naive.date()).map_err(|_| EvalError::value_error("year is out of range"))?;
    Ok(naive)
}

fn local_from_utc(naive_utc: NaiveDateTime) -> NaiveDateTime {
    Local.from_utc_datetime(&naive_utc).naive_local()
}

fn local_offset_at(naive_utc: NaiveDateTime) -> FixedOffset {
    Local.from_utc_datetime(&naive_utc).offset().fix()
}

/// Interpret a naive local time as a UTC instant.
fn utc_from_local(naive: NaiveDateTime) -> NaiveDateTime {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.naive_utc(),
        None => naive,
    }
}

fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn shifted(naive_utc: NaiveDateTime, offset: FixedOffset) -> Result<DateTimeValue> {
    let naive = naive_utc + chrono::Duration::seconds(offset.local_minus_utc() as i64);
    check_date(naive.date())?;
    Ok(DateTimeValue {
        naive,
        tz: Some(offset),
    })
}

// ═══════════════════════════════════════════════════════════════════════
// ISO parsing
// ═══════════════════════════════════════════════════════════════════════

fn digits(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let (y, m, d) = match text.len() {
        10 if text.as_bytes()[4] == b'-' && text.as_bytes()[7] == b'-' => {
            (&text[0..4], &text[5..7], &text[8..10])
        }
        8 => (&text[0..4], &text[4..6], &text[6..8]),
        _ => return None,
    };
    make_date(digits(y)?, digits(m)?, digits(d)?).ok()
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    if text == "Z" {
        return Some(utc());
    }
    let sign = match text.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let body: String = text[1..].chars().filter(|c| *c != ':').collect();
    if body.len() != 4 && body.len() != 6 {
        return None;
    }
    let hours = digits(&body[0..2])?;
    let minutes = digits(&body[2..4])?;
    let seconds = if body.len() == 6 { digits(&body[4..6])? } else { 0 };
    if minutes > 59 || seconds > 59 {
        return None;
    }
    FixedOffset::east_opt((sign * (hours * 3600 + minutes * 60 + seconds)) as i32)
}

fn parse_iso_time(text: &str) -> Option<(NaiveTime, Option<FixedOffset>)> {
    let split = text.find(['+', '-', 'Z']);
    let (clock, tz) = match split {
        Some(i) => (&text[..i], Some(parse_offset(&text[i..])?)),
        None => (text, None),
    };
    let (main, fraction) = match clock.split_once(['.', ',']) {
        Some((main, fraction)) => (main, Some(fraction)),
        None => (clock, None),
    };
    let fields: Vec<&str> = if main.contains(':') {
        main.split(':').collect()
    } else {
        main.as_bytes()
            .chunks(2)
            .map(|c| std::str::from_utf8(c).unwrap_or(""))
            .collect()
    };
    if fields.is_empty() || fields.len() > 3 || fields.iter().any(|f| f.len() != 2) {
        return None;
    }
    let hour = digits(fields[0])?;
    let minute = fields.get(1).map_or(Some(0), |f| digits(f))?;
    let second = fields.get(2).map_or(Some(0), |f| digits(f))?;
    let micro = match fraction {
        Some(f) if fields.len() == 3 && (1..=9).contains(&f.len()) => {
            let mut padded: String = f.chars().take(6).collect();
            while padded.len() < 6 {
                padded.push('0');
            }
            digits(&padded)?
        }
        Some(_) => return None,
        None => 0,
    };
    let time = make_time(hour, minute, second, micro).ok()?;
    Some((time, tz))
}

fn invalid_iso(text: &str) -> EvalError {
    EvalError::value_error(format!("Invalid isoformat string: {}", Value::str(text).repr()))
}

fn parse_iso_datetime(text: &str) -> Option<DateTimeValue> {
    let date_len = if text.len() >= 10 && text.as_bytes().get(4) == Some(&b'-') { 10 } else { 8 };
    if text.len() < date_len || !text.is_char_boundary(date_len) {
        return None;
    }
    let date = parse_iso_date(&text[..date_len])?;
    let rest = &text[date_len..];
    if rest.is_empty() {
        return Some(DateTimeValue::naive(date.and_time(NaiveTime::default())));
    }
    let mut chars = rest.chars();
    chars.next()?;
    let (time, tz) = parse_iso_time(chars.as_str())?;
    Some(DateTimeValue {
        naive: date.and_time(time),
        tz,
    })
}

fn text_arg(fname: &str, value: &Value) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        EvalError::type_error(format!(
            "{}: argument must be str, not {}",
            fname,
            value.type_name()
        ))
    })
}

// ═══════════════════════════════════════════════════════════════════════
// strptime
// ═══════════════════════════════════════════════════════════════════════

fn strptime(text: &str, format: &str) -> Result<DateTimeValue> {
    let mismatch = || {
        EvalError::value_error(format!(
            "time data {} does not match format {}",
            Value::str(text).repr(),
            Value::str(format).repr()
        ))
    };
    // microseconds are always six digits when parsed
    let pattern = format.replace("%f", "%6f");
    if pattern.contains("%z") {
        let parsed = DateTime::parse_from_str(text, &pattern).map_err(|_| mismatch())?;
        return Ok(DateTimeValue {
            naive: parsed.naive_local(),
            tz: Some(*parsed.offset()),
        });
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, &pattern) {
        return Ok(DateTimeValue::naive(naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, &pattern) {
        return Ok(DateTimeValue::naive(date.and_time(NaiveTime::default())));
    }
    if let Ok(time) = NaiveTime::parse_from_str(text, &pattern) {
        let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).ok_or_else(out_of_range)?;
        return Ok(DateTimeValue::naive(epoch.and_time(time)));
    }
    Err(mismatch())
}

// ═══════════════════════════════════════════════════════════════════════
// Class methods
// ═══════════════════════════════════════════════════════════════════════

/// `date.today()`, `datetime.now(tz)`, `datetime.strptime(...)` and friends.
pub(super) fn class_method(t: PyType, name: &'static str, args: Args) -> Result<Value> {
    match (t, name) {
        (PyType::Date, "today") => {
            args.fixed("today", [])?;
            Ok(Value::Date(local_from_utc(now_utc()).date()))
        }
        (PyType::DateTime, "today") => {
            args.fixed("today", [])?;
            Ok(Value::DateTime(DateTimeValue::naive(local_from_utc(now_utc()))))
        }
        (PyType::DateTime, "now") => {
            let ([], [tz]) = args.bind("now", [], ["tz"])?;
            match tz.map_or(Ok(None), |v| tz_arg(&v))? {
                Some(offset) => shifted(now_utc(), offset).map(Value::DateTime),
                None => Ok(Value::DateTime(DateTimeValue::naive(local_from_utc(now_utc())))),
            }
        }
        (PyType::DateTime, "utcnow") => {
            args.fixed("utcnow", [])?;
            Ok(Value::DateTime(DateTimeValue::naive(now_utc())))
        }
        (PyType::Date, "fromtimestamp") => {
            let [ts] = args.fixed("fromtimestamp", ["timestamp"])?;
            Ok(Value::Date(local_from_utc(utc_from_timestamp(&ts)?).date()))
        }
        (PyType::DateTime, "fromtimestamp") => {
            let ([ts], [tz]) = args.bind("fromtimestamp", ["timestamp"], ["tz"])?;
            let instant = utc_from_timestamp(&ts)?;
            match tz.map_or(Ok(None), |v| tz_arg(&v))? {
                Some(offset) => shifted(instant, offset).map(Value::DateTime),
                None => Ok(Value::DateTime(DateTimeValue::naive(local_from_utc(instant)))),
            }
        }
        (PyType::DateTime, "utcfromtimestamp") => {
            let [ts] = args.fixed("utcfromtimestamp", ["timestamp"])?;
            Ok(Value::DateTime(DateTimeValue::naive(utc_from_timestamp(&ts)?)))
        }
        (PyType::Date | PyType::DateTime, "fromordinal") => {
            let [n] = args.fixed("fromordinal", ["ordinal"])?;
            let n = n.to_i64()?;
            if n < 1 {
                return Err(EvalError::value_error("ordinal must be >= 1"));
            }
            let date = i32::try_from(n)
                .ok()
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| EvalError::value_error(format!("year {} is out of range", n / 365 + 1)))?;
            let date = check_date(date).map_err(|_| EvalError::value_error("year is out of range"))?;
            Ok(if t == PyType::Date {
                Value::Date(date)
            } else {
                Value::DateTime(DateTimeValue::naive(date.and_time(NaiveTime::default())))
            })
        }
        (PyType::Date, "fromisoformat") => {
            let [text] = args.fixed("fromisoformat", ["date_string"])?;
            let text = text_arg("fromisoformat", &text)?;
            parse_iso_date(&text).map(Value::Date).ok_or_else(|| invalid_iso(&text))
        }
        (PyType::DateTime, "fromisoformat") => {
            let [text] = args.fixed("fromisoformat", ["date_string"])?;
            let text = text_arg("fromisoformat", &text)?;
            parse_iso_datetime(&text)
                .map(Value::DateTime)
                .ok_or_else(|| invalid_iso(&text))
        }
        (PyType::Time, "fromisoformat") => {
            let [text] = args.fixed("fromisoformat", ["time_string"])?;
            let text = text_arg("fromisoformat", &text)?;
            parse_iso_time(&text)
                .map(|(naive, tz)| Value::Time(TimeValue { naive, tz }))
                .ok_or_else(|| invalid_iso(&text))
        }
        (PyType::DateTime, "combine") => {
            let ([date, time], [tzinfo]) = args.bind("combine", ["date", "time"], ["tzinfo"])?;
            let date = match date {
                Value::Date(d) => d,
                Value::DateTime(dt) => dt.naive.date(),
                other => {
                    return Err(EvalError::type_error(format!(
                        "combine() argument 1 must be datetime.date, not {}",
                        other.type_name()
                    )))
                }
            };
            let time = match time {
                Value::Time(time) => time,
                other => {
                    return Err(EvalError::type_error(format!(
                        "combine() argument 2 must be datetime.time, not {}",
                        other.type_name()
                    )))
                }
            };
            let tz = match tzinfo {
                Some(v) => tz_arg(&v)?,
                None => time.tz,
            };
            Ok(Value::DateTime(DateTimeValue {
                naive: date.and_time(time.naive),
                tz,
            }))
        }
        (PyType::DateTime, "strptime") => {
            let [text, format] = args.fixed("strptime", ["date_string", "format"])?;
            let text = text_arg("strptime", &text)?;
            let format = text_arg("strptime", &format)?;
            strptime(&text, &format).map(Value::DateTime)
        }
        _ => Err(EvalError::attribute_error(format!(
            "type object '{}' has no attribute '{}'",
            t.qualified_name(),
            name
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Instance methods
// ═══════════════════════════════════════════════════════════════════════

fn delta_value(offset: FixedOffset) -> Result<Value> {
    TimeDelta::from_micros(offset.local_minus_utc() as i128 * 1_000_000).map(Value::TimeDelta)
}

fn timetuple(naive: NaiveDateTime, isdst: i64) -> Value {
    let date = naive.date();
    let time = naive.time();
    Value::tuple(
        [
            date.year() as i64,
            date.month() as i64,
            date.day() as i64,
            time.hour() as i64,
            time.minute() as i64,
            time.second() as i64,
            date.weekday().num_days_from_monday() as i64,
            date.ordinal() as i64,
            isdst,
        ]
        .into_iter()
        .map(Value::from)
        .collect(),
    )
}

fn isocalendar(date: NaiveDate) -> Value {
    let week = date.iso_week();
    Value::tuple(vec![
        Value::from(week.year() as i64),
        Value::from(week.week() as i64),
        Value::from(date.weekday().number_from_monday() as i64),
    ])
}

fn ctime(naive: NaiveDateTime) -> String {
    render(&naive, None, "%a %b %e %H:%M:%S %Y")
}

fn date_method(date: NaiveDate, name: &str, args: Args) -> Result<Value> {
    match name {
        "replace" => {
            let ([], [year, month, day]) = args.bind("replace", [], ["year", "month", "day"])?;
            Ok(Value::Date(make_date(
                int_arg(year, date.year() as i64)?,
                int_arg(month, date.month() as i64)?,
                int_arg(day, date.day() as i64)?,
            )?))
        }
        "timetuple" => {
            args.fixed("timetuple", [])?;
            Ok(timetuple(date.and_time(NaiveTime::default()), -1))
        }
        "toordinal" => {
            args.fixed("toordinal", [])?;
            Ok(Value::from(date.num_days_from_ce() as i64))
        }
        "weekday" => {
            args.fixed("weekday", [])?;
            Ok(Value::from(date.weekday().num_days_from_monday() as i64))
        }
        "isoweekday" => {
            args.fixed("isoweekday", [])?;
            Ok(Value::from(date.weekday().number_from_monday() as i64))
        }
        "isocalendar" => {
            args.fixed("isocalendar", [])?;
            Ok(isocalendar(date))
        }
        "isoformat" => {
            args.fixed("isoformat", [])?;
            Ok(Value::from(date_iso(date)))
        }
        "ctime" => {
            args.fixed("ctime", [])?;
            Ok(Value::from(ctime(date.and_time(NaiveTime::default()))))
        }
        _ => Err(EvalError::attribute_error(format!(
            "'date' object has no attribute '{}'",
            name
        ))),
    }
}

fn isoformat_datetime(dt: &DateTimeValue, args: Args) -> Result<Value> {
    let ([], [sep, timespec]) = args.bind("isoformat", [], ["sep", "timespec"])?;
    let sep = match sep {
        None => 'T',
        Some(Value::Str(s)) if s.chars().count() == 1 => s.chars().next().unwrap_or('T'),
        Some(other) => {
            return Err(EvalError::type_error(format!(
                "isoformat() argument 1 must be a unicode character, not {}",
                other.type_name()
            )))
        }
    };
    let date = date_iso(dt.naive.date());
    let time = TimeValue {
        naive: dt.naive.time(),
        tz: dt.tz,
    };
    Ok(Value::from(format!("{}{}{}", date, sep, time_with_spec(&time, timespec)?)))
}

fn time_with_spec(time: &TimeValue, timespec: Option<Value>) -> Result<String> {
    let spec = match &timespec {
        None => "auto".to_string(),
        Some(v) => text_arg("isoformat", v)?,
    };
    let t = time.naive;
    let us = time.microsecond();
    let body = match spec.as_str() {
        "auto" => return Ok(time.iso()),
        "hours" => format!("{:02}", t.hour()),
        "minutes" => format!("{:02}:{:02}", t.hour(), t.minute()),
        "seconds" => format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()),
        "milliseconds" => format!("{:02}:{:02}:{:02}.{:03}", t.hour(), t.minute(), t.second(), us / 1000),
        "microseconds" => format!("{:02}:{:02}:{:02}.{:06}", t.hour(), t.minute(), t.second(), us),
        _ => return Err(EvalError::value_error("Unknown timespec value")),
    };
    let suffix = time
        .tz
        .map(|offset| format_offset(offset, true))
        .unwrap_or_default();
    Ok(body + &suffix)
}

fn datetime_method(dt: DateTimeValue, name: &str, args: Args) -> Result<Value> {
    let naive = dt.naive;
    match name {
        "date" => {
            args.fixed("date", [])?;
            Ok(Value::Date(naive.date()))
        }
        "time" => {
            args.fixed("time", [])?;
            Ok(Value::Time(TimeValue {
                naive: naive.time(),
                tz: None,
            }))
        }
        "timetz" => {
            args.fixed("timetz", [])?;
            Ok(Value::Time(TimeValue {
                naive: naive.time(),
                tz: dt.tz,
            }))
        }
        "replace" => {
            let ([], [year, month, day, hour, minute, second, micro, tzinfo, fold]) = args.bind(
                "replace",
                [],
                [
                    "year",
                    "month",
                    "day",
                    "hour",
                    "minute",
                    "second",
                    "microsecond",
                    "tzinfo",
                    "fold",
                ],
            )?;
            fold_arg(fold)?;
            let date = make_date(
                int_arg(year, naive.year() as i64)?,
                int_arg(month, naive.month() as i64)?,
                int_arg(day, naive.day() as i64)?,
            )?;
            let time = make_time(
                int_arg(hour, naive.hour() as i64)?,
                int_arg(minute, naive.minute() as i64)?,
                int_arg(second, naive.second() as i64)?,
                int_arg(micro, dt.microsecond() as i64)?,
            )?;
            let tz = match tzinfo {
                Some(v) => tz_arg(&v)?,
                None => dt.tz,
            };
            Ok(Value::DateTime(DateTimeValue {
                naive: date.and_time(time),
                tz,
            }))
        }
        "astimezone" => {
            let ([], [tz]) = args.bind("astimezone", [], ["tz"])?;
            let instant = dt.utc().unwrap_or_else(|| utc_from_local(naive));
            let offset = match tz.map_or(Ok(None), |v| tz_arg(&v))? {
                Some(offset) => offset,
                None => local_offset_at(instant),
            };
            shifted(instant, offset).map(Value::DateTime)
        }
        "dst" => {
            args.fixed("dst", [])?;
            Ok(Value::None)
        }
        "tzname" => {
            args.fixed("tzname", [])?;
            Ok(dt.tz.map_or(Value::None, |offset| Value::from(tz_name(offset))))
        }
        "timetuple" => {
            args.fixed("timetuple", [])?;
            Ok(timetuple(naive, -1))
        }
        "utctimetuple" => {
            args.fixed("utctimetuple", [])?;
            Ok(timetuple(dt.utc().unwrap_or(naive), 0))
        }
        "timestamp" => {
            args.fixed("timestamp", [])?;
            let instant = dt.utc().unwrap_or_else(|| utc_from_local(naive));
            let micros = instant.and_utc().timestamp_micros();
            Ok(Value::Float(micros as f64 / 1e6))
        }
        "isoformat" => isoformat_datetime(&dt, args),
        "ctime" => {
            args.fixed("ctime", [])?;
            Ok(Value::from(ctime(naive)))
        }
        _ => date_method(naive.date(), name, args),
    }
}

fn time_method(time: TimeValue, name: &str, args: Args) -> Result<Value> {
    match name {
        "replace" => {
            let ([], [hour, minute, second, micro, tzinfo, fold]) = args.bind(
                "replace",
                [],
                ["hour", "minute", "second", "microsecond", "tzinfo", "fold"],
            )?;
            fold_arg(fold)?;
            let t = time.naive;
            let naive = make_time(
                int_arg(hour, t.hour() as i64)?,
                int_arg(minute, t.minute() as i64)?,
                int_arg(second, t.second() as i64)?,
                int_arg(micro, time.microsecond() as i64)?,
            )?;
            let tz = match tzinfo {
                Some(v) => tz_arg(&v)?,
                None => time.tz,
            };
            Ok(Value::Time(TimeValue { naive, tz }))
        }
        "isoformat" => {
            let ([], [timespec]) = args.bind("isoformat", [], ["timespec"])?;
            Ok(Value::from(time_with_spec(&time, timespec)?))
        }
        "utcoffset" => {
            args.fixed("utcoffset", [])?;
            time.tz.map_or(Ok(Value::None), delta_value)
        }
        "dst" => {
            args.fixed("dst", [])?;
            Ok(Value::None)
        }
        "tzname" => {
            args.fixed("tzname", [])?;
            Ok(time.tz.map_or(Value::None, |offset| Value::from(tz_name(offset))))
        }
        _ => Err(EvalError::attribute_error(format!(
            "'datetime.time' object has no attribute '{}'",
            name
        ))),
    }
}

fn timezone_method(offset: FixedOffset, name: &str, args: Args) -> Result<Value> {
    let [dt] = args.fixed(name, ["dt"])?;
    if !matches!(dt, Value::None | Value::DateTime(_)) {
        return Err(EvalError::type_error(format!(
            "{}() argument must be a datetime instance or None, not {}",
            name,
            dt.type_name()
        )));
    }
    match name {
        "utcoffset" => delta_value(offset),
        "tzname" => Ok(Value::from(tz_name(offset))),
        "dst" => Ok(Value::None),
        "fromutc" => match dt {
            Value::DateTime(dt) if dt.tz == Some(offset) => {
                shifted(dt.naive, offset).map(Value::DateTime)
            }
            Value::DateTime(_) => Err(EvalError::value_error("fromutc: dt.tzinfo is not self")),
            _ => Err(EvalError::type_error(
                "fromutc() argument must be a datetime instance",
            )),
        },
        _ => Err(EvalError::attribute_error(format!(
            "'datetime.timezone' object has no attribute '{}'",
            name
        ))),
    }
}

/// Call a method on a calendar value.
pub(super) fn method(_ctx: &EvalContext, receiver: &Value, name: &'static str, args: Args) -> Result<Value> {
    if name == "strftime" {
        let [format] = args.fixed("strftime", ["format"])?;
        let format = text_arg("strftime", &format)?;
        return strftime(receiver, &format).map(Value::from);
    }
    match receiver {
        Value::Date(d) => date_method(*d, name, args),
        Value::DateTime(dt) => datetime_method(*dt, name, args),
        Value::Time(t) => time_method(*t, name, args),
        Value::TimeDelta(td) if name == "total_seconds" => {
            args.fixed("total_seconds", [])?;
            Ok(Value::Float(td.total_seconds()))
        }
        Value::TimeZone(offset) => timezone_method(*offset, name, args),
        other => Err(super::no_attribute(other, name)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// strftime
// ═══════════════════════════════════════════════════════════════════════

/// `value.strftime(pattern)` for dates, datetimes and times.
///
/// Unknown directives are copied through unchanged.
pub(crate) fn strftime(value: &Value, pattern: &str) -> Result<String> {
    let (naive, tz) = match value {
        Value::Date(d) => (d.and_time(NaiveTime::default()), None),
        Value::DateTime(dt) => (dt.naive, dt.tz),
        Value::Time(t) => {
            let base = NaiveDate::from_ymd_opt(1900, 1, 1).ok_or_else(out_of_range)?;
            (base.and_time(t.naive), t.tz)
        }
        other => {
            return Err(EvalError::type_error(format!(
                "descriptor 'strftime' requires a 'datetime.date' object but received a '{}'",
                other.type_name()
            )))
        }
    };
    Ok(render(&naive, tz, pattern))
}

fn render(naive: &NaiveDateTime, tz: Option<FixedOffset>, pattern: &str) -> String {
    let date = naive.date();
    let time = naive.time();
    let weekday = date.weekday();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(directive) = chars.next() else {
            out.push('%');
            break;
        };
        let hour12 = match time.hour() % 12 {
            0 => 12,
            h => h,
        };
        let piece = match directive {
            'a' => WEEKDAYS[weekday.num_days_from_monday() as usize][..3].to_string(),
            'A' => WEEKDAYS[weekday.num_days_from_monday() as usize].to_string(),
            'w' => weekday.num_days_from_sunday().to_string(),
            'u' => weekday.number_from_monday().to_string(),
            'd' => format!("{:02}", date.day()),
            'e' => format!("{:>2}", date.day()),
            'b' | 'h' => MONTHS[date.month0() as usize][..3].to_string(),
            'B' => MONTHS[date.month0() as usize].to_string(),
            'm' => format!("{:02}", date.month()),
            'y' => format!("{:02}", date.year() % 100),
            'Y' => date.year().to_string(),
            'C' => format!("{:02}", date.year() / 100),
            'G' => date.iso_week().year().to_string(),
            'V' => format!("{:02}", date.iso_week().week()),
            'H' => format!("{:02}", time.hour()),
            'I' => format!("{:02}", hour12),
            'p' => if time.hour() < 12 { "AM" } else { "PM" }.to_string(),
            'M' => format!("{:02}", time.minute()),
            'S' => format!("{:02}", time.second()),
            'f' => format!("{:06}", (time.nanosecond() / 1000).min(999_999)),
            'j' => format!("{:03}", date.ordinal()),
            'U' => format!("{:02}", (date.ordinal0() + 7 - weekday.num_days_from_sunday()) / 7),
            'W' => format!("{:02}", (date.ordinal0() + 7 - weekday.num_days_from_monday()) / 7),
            'z' => tz
                .map(|offset| format_offset(offset, false))
                .unwrap_or_default(),
            'Z' => tz.map(tz_name).unwrap_or_default(),
            'c' => render(naive, tz, "%a %b %e %H:%M:%S %Y"),
            'x' | 'D' => render(naive, tz, "%m/%d/%y"),
            'X' | 'T' => render(naive, tz, "%H:%M:%S"),
            'R' => render(naive, tz, "%H:%M"),
            'F' => render(naive, tz, "%Y-%m-%d"),
            'n' => "\n".to_string(),
            't' => "\t".to_string(),
            '%' => "%".to_string(),
            other => format!("%{}", other),
        };
        out.push_str(&piece);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|n| Value::from(*n)).collect()
    }

    fn build(t: PyType, values: &[i64]) -> Result<Value> {
        construct(t, Args::positional(ints(values)))
    }

    fn show(result: Result<Value>) -> String {
        match result {
            Ok(v) => v.repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_date_validation() {
        assert_eq!(show(build(PyType::Date, &[2024, 2, 29])), "datetime.date(2024, 2, 29)");
        assert_eq!(
            show(build(PyType::Date, &[2023, 2, 29])),
            "ValueError: day is out of range for month"
        );
        assert_eq!(
            show(build(PyType::Date, &[2023, 13, 1])),
            "ValueError: month must be in 1..12"
        );
        assert_eq!(
            show(build(PyType::Date, &[0, 1, 1])),
            "ValueError: year 0 is out of range"
        );
        assert_eq!(
            show(build(PyType::DateTime, &[2024, 1, 1, 24])),
            "ValueError: hour must be in 0..23"
        );
    }

    #[test]
    fn test_timedelta_normalization() {
        let mut args = Args::new();
        args.keywords.insert("hours".to_string(), Value::from(1.5));
        args.keywords.insert("days".to_string(), Value::from(-1i64));
        assert_eq!(
            show(construct(PyType::TimeDelta, args)),
            "datetime.timedelta(days=-1, seconds=5400)"
        );
        assert_eq!(
            show(build(PyType::TimeDelta, &[1_000_000_000])),
            "OverflowError: days=1000000000; must have magnitude <= 999999999"
        );
    }

    #[test]
    fn test_instance_methods() {
        let date = Value::Date(make_date(2024, 3, 15).unwrap());
        let ctx = EvalContext::new();
        assert_eq!(show(method(&ctx, &date, "weekday", Args::new())), "4");
        assert_eq!(show(method(&ctx, &date, "isocalendar", Args::new())), "(2024, 11, 5)");
        assert_eq!(show(method(&ctx, &date, "toordinal", Args::new())), "738960");
        assert_eq!(
            show(method(&ctx, &date, "ctime", Args::new())),
            "'Fri Mar 15 00:00:00 2024'"
        );
    }

    #[test]
    fn test_strftime_directives() {
        let dt = build(PyType::DateTime, &[2024, 1, 5, 14, 3, 9, 120]).unwrap();
        assert_eq!(
            strftime(&dt, "%Y-%m-%d %H:%M:%S.%f %p %a %B %j").unwrap(),
            "2024-01-05 14:03:09.000120 PM Fri January 005"
        );
        assert_eq!(strftime(&dt, "%I %% %Q").unwrap(), "02 % %Q");
        assert!(strftime(&Value::from(1i64), "%Y").is_err());
    }

    #[test]
    fn test_isoformat_round_trip() {
        let parsed = class_method(
            PyType::DateTime,
            "fromisoformat",
            Args::positional(vec![Value::str("2024-01-05T14:03:09.5+09:00")]),
        )
        .unwrap();
        let ctx = EvalContext::new();
        assert_eq!(
            show(method(&ctx, &parsed, "isoformat", Args::new())),
            "'2024-01-05T14:03:09.500000+09:00'"
        );
        assert_eq!(
            show(class_method(
                PyType::Date,
                "fromisoformat",
                Args::positional(vec![Value::str("2024-1-5")])
            )),
            "ValueError: Invalid isoformat string: '2024-1-5'"
        );
    }

    #[test]
    fn test_strptime() {
        let parsed = class_method(
            PyType::DateTime,
            "strptime",
            Args::positional(vec![Value::str("05/01/2024"), Value::str("%d/%m/%Y")]),
        );
        assert_eq!(show(parsed), "datetime.datetime(2024, 1, 5, 0, 0)");
        let failed = class_method(
            PyType::DateTime,
            "strptime",
            Args::positional(vec![Value::str("nope"), Value::str("%Y")]),
        );
        assert_eq!(
            show(failed),
            "ValueError: time data 'nope' does not match format '%Y'"
        );
    }

    #[test]
    fn test_class_constants() {
        assert_eq!(
            class_constant(PyType::DateTime, "max").unwrap().repr(),
            "datetime.datetime(9999, 12, 31, 23, 59, 59, 999999)"
        );
        assert_eq!(
            class_constant(PyType::TimeZone, "utc").unwrap().repr(),
            "datetime.timezone.utc"
        );
        assert!(class_constant(PyType::Int, "max").is_none());
    }
}
