//! Date, datetime and timedelta arithmetic

use chrono::Duration;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::ToPrimitive;

use super::BinaryOp;
use crate::error::{EvalError, Result};
use crate::value::datetime::{check_date, out_of_range, MICROS_PER_DAY};
use crate::value::{TimeDelta, Value};

pub(super) fn negate(td: TimeDelta) -> Result<TimeDelta> {
    TimeDelta::from_micros(-td.micros())
}

fn delta(micros: i128) -> Result<Value> {
    TimeDelta::from_micros(micros).map(Value::TimeDelta)
}

fn scale(td: TimeDelta, factor: f64) -> Result<Value> {
    let micros = (td.micros() as f64 * factor).round_ties_even();
    if !micros.is_finite() || micros.abs() > i128::MAX as f64 {
        return Err(EvalError::overflow("cannot convert float infinity to integer"));
    }
    delta(micros as i128)
}

fn small_int(value: &Value) -> Option<i128> {
    match value {
        Value::Bool(_) | Value::Int(_) => value.as_bigint().and_then(|n| n.to_i128()),
        _ => None,
    }
}

fn div_round_half_even(n: i128, d: i128) -> i128 {
    let (q, r) = n.div_mod_floor(&d);
    let twice = 2 * r.abs();
    let d_abs = d.abs();
    if twice > d_abs || (twice == d_abs && q % 2 != 0) {
        q + 1
    } else {
        q
    }
}

pub(super) fn apply(op: BinaryOp, left: &Value, right: &Value) -> Option<Result<Value>> {
    Some(match (op, left, right) {
        // ── timedelta ⊕ timedelta ──────────────────────────────────────
        (BinaryOp::Add, Value::TimeDelta(a), Value::TimeDelta(b)) => delta(a.micros() + b.micros()),
        (BinaryOp::Sub, Value::TimeDelta(a), Value::TimeDelta(b)) => delta(a.micros() - b.micros()),
        (BinaryOp::Div, Value::TimeDelta(a), Value::TimeDelta(b)) => {
            if b.is_zero() {
                Err(EvalError::zero_division("division by zero"))
            } else {
                Ok(Value::Float(a.micros() as f64 / b.micros() as f64))
            }
        }
        (BinaryOp::FloorDiv, Value::TimeDelta(a), Value::TimeDelta(b)) => {
            if b.is_zero() {
                Err(EvalError::zero_division("integer division or modulo by zero"))
            } else {
                Ok(Value::Int(BigInt::from(a.micros().div_floor(&b.micros()))))
            }
        }
        (BinaryOp::Mod, Value::TimeDelta(a), Value::TimeDelta(b)) => {
            if b.is_zero() {
                Err(EvalError::zero_division("integer division or modulo by zero"))
            } else {
                delta(a.micros().mod_floor(&b.micros()))
            }
        }

        // ── timedelta ⊗ number ─────────────────────────────────────────
        (BinaryOp::Mul, Value::TimeDelta(td), other) | (BinaryOp::Mul, other, Value::TimeDelta(td)) => {
            match (small_int(other), other) {
                (Some(n), _) => match td.micros().checked_mul(n) {
                    Some(m) => delta(m),
                    None => Err(out_of_range()),
                },
                (None, Value::Float(f)) => scale(*td, *f),
                _ => return None,
            }
        }
        (BinaryOp::Div, Value::TimeDelta(td), other) => match (small_int(other), other) {
            (Some(0), _) => Err(EvalError::zero_division("division by zero")),
            (Some(n), _) => delta(div_round_half_even(td.micros(), n)),
            (None, Value::Float(f)) if *f == 0.0 => Err(EvalError::zero_division("division by zero")),
            (None, Value::Float(f)) => scale(*td, 1.0 / f),
            _ => return None,
        },
        (BinaryOp::FloorDiv, Value::TimeDelta(td), other) => match small_int(other) {
            Some(0) => Err(EvalError::zero_division("integer division or modulo by zero")),
            Some(n) => delta(td.micros().div_floor(&n)),
            None => return None,
        },

        // ── date ± timedelta ───────────────────────────────────────────
        (BinaryOp::Add, Value::Date(d), Value::TimeDelta(td))
        | (BinaryOp::Add, Value::TimeDelta(td), Value::Date(d)) => shift_date(*d, td.days()),
        (BinaryOp::Sub, Value::Date(d), Value::TimeDelta(td)) => shift_date(*d, -td.days()),
        (BinaryOp::Sub, Value::Date(a), Value::Date(b)) => {
            delta((*a - *b).num_days() as i128 * MICROS_PER_DAY)
        }

        // ── datetime ± timedelta ───────────────────────────────────────
        (BinaryOp::Add, Value::DateTime(dt), Value::TimeDelta(td))
        | (BinaryOp::Add, Value::TimeDelta(td), Value::DateTime(dt)) => dt.add(*td).map(Value::DateTime),
        (BinaryOp::Sub, Value::DateTime(dt), Value::TimeDelta(td)) => {
            negate(*td).and_then(|neg| dt.add(neg)).map(Value::DateTime)
        }
        (BinaryOp::Sub, Value::DateTime(a), Value::DateTime(b)) => a.diff(b).map(Value::TimeDelta),

        _ => return None,
    })
}

fn shift_date(date: chrono::NaiveDate, days: i64) -> Result<Value> {
    let shifted = Duration::try_days(days)
        .and_then(|d| date.checked_add_signed(d))
        .ok_or_else(out_of_range)?;
    check_date(shifted).map(Value::Date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn td(days: i128) -> Value {
        delta(days * MICROS_PER_DAY).unwrap()
    }

    fn run(op: BinaryOp, a: Value, b: Value) -> Value {
        apply(op, &a, &b).unwrap().unwrap()
    }

    #[test]
    fn test_date_arithmetic() {
        let d = Value::Date(NaiveDate::from_ymd_opt(2020, 2, 28).unwrap());
        assert_eq!(run(BinaryOp::Add, d.clone(), td(1)).repr(), "datetime.date(2020, 2, 29)");
        let later = Value::Date(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert_eq!(run(BinaryOp::Sub, later, d).repr(), "datetime.timedelta(days=2)");
    }

    #[test]
    fn test_timedelta_scaling() {
        assert_eq!(run(BinaryOp::Mul, td(1), Value::from(2i64)).repr(), "datetime.timedelta(days=2)");
        assert_eq!(run(BinaryOp::Div, td(1), td(2)).repr(), "0.5");
        assert_eq!(run(BinaryOp::FloorDiv, td(7), td(2)).repr(), "3");
        assert_eq!(
            run(BinaryOp::Div, td(1), Value::from(2i64)).repr(),
            "datetime.timedelta(seconds=43200)"
        );
    }

    #[test]
    fn test_date_overflow() {
        let d = Value::Date(NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
        let err = apply(BinaryOp::Add, &d, &td(1)).unwrap().unwrap_err();
        assert_eq!(err.to_string(), "date value out of range");
    }

    #[test]
    fn test_half_even_division() {
        assert_eq!(div_round_half_even(5, 2), 2);
        assert_eq!(div_round_half_even(7, 2), 4);
        assert_eq!(div_round_half_even(-5, 2), -2);
        assert_eq!(div_round_half_even(-7, 2), -4);
    }
}
