//! Concatenation and repetition of sequences

use super::BinaryOp;
use crate::context::EvalContext;
use crate::error::Result;
use crate::value::{check_len, Value};

pub(crate) fn is_sequence(value: &Value) -> bool {
    matches!(
        value,
        Value::Str(_) | Value::Bytes(_) | Value::List(_) | Value::Tuple(_)
    )
}

/// Interpret a repetition count; `None` if the value is not integer-like.
pub(crate) fn repeat_count(value: &Value) -> Option<Result<usize>> {
    match value {
        Value::Bool(_) | Value::Int(_) => Some(value.to_count()),
        Value::Decimal(d) if d.is_integral() => Some(value.to_count()),
        _ => None,
    }
}

/// First index of `needle` in `haystack` at or after `start`.
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if needle.is_empty() {
        return (start <= haystack.len()).then_some(start);
    }
    haystack
        .get(start..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + start)
}

pub(super) fn apply(ctx: &EvalContext, op: BinaryOp, left: &Value, right: &Value) -> Option<Result<Value>> {
    match op {
        BinaryOp::Add => concat(left, right),
        BinaryOp::Mul => {
            if is_sequence(left) {
                let count = repeat_count(right)?;
                Some(count.and_then(|n| repeat(ctx, left, n)))
            } else if is_sequence(right) {
                let count = repeat_count(left)?;
                Some(count.and_then(|n| repeat(ctx, right, n)))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn concat(left: &Value, right: &Value) -> Option<Result<Value>> {
    let joined = match (left, right) {
        (Value::Str(a), Value::Str(b)) => {
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(a);
            out.push_str(b);
            Value::from(out)
        }
        (Value::Bytes(a), Value::Bytes(b)) => Value::bytes([&a[..], &b[..]].concat()),
        (Value::List(a), Value::List(b)) => {
            let mut out = a.borrow().clone();
            if let Err(e) = check_len(out.len() + b.borrow().len()) {
                return Some(Err(e));
            }
            out.extend(b.borrow().iter().cloned());
            Value::list(out)
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            if let Err(e) = check_len(a.len() + b.len()) {
                return Some(Err(e));
            }
            Value::tuple(a.iter().chain(b.iter()).cloned().collect())
        }
        _ => return None,
    };
    Some(Ok(joined))
}

fn repeated(items: &[Value], count: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    out
}

fn repeat(ctx: &EvalContext, seq: &Value, count: usize) -> Result<Value> {
    let unit = match seq {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        _ => 0,
    };
    check_len(unit.saturating_mul(count))?;
    ctx.check_interrupt()?;
    Ok(match seq {
        Value::Str(s) => Value::from(s.repeat(count)),
        Value::Bytes(b) => Value::bytes(b.repeat(count)),
        Value::List(items) => Value::list(repeated(&items.borrow(), count)),
        Value::Tuple(items) => Value::tuple(repeated(items, count)),
        other => other.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Decimal;
    use pretty_assertions::assert_eq;

    fn run(op: BinaryOp, a: Value, b: Value) -> Value {
        let ctx = EvalContext::new();
        apply(&ctx, op, &a, &b).unwrap().unwrap()
    }

    #[test]
    fn test_repeat() {
        assert_eq!(run(BinaryOp::Mul, Value::str("ab"), Value::from(3i64)).repr(), "'ababab'");
        assert_eq!(run(BinaryOp::Mul, Value::from(2i64), Value::list(vec![Value::None])).repr(), "[None, None]");
        assert_eq!(run(BinaryOp::Mul, Value::str("x"), Value::from(-1i64)).repr(), "''");
        let pair = Value::tuple(vec![Value::from(1i64), Value::str("a")]);
        assert_eq!(run(BinaryOp::Mul, pair, Value::from(2i64)).repr(), "(1, 'a', 1, 'a')");
        let three = Value::Decimal(Decimal::parse("3").unwrap());
        assert_eq!(run(BinaryOp::Mul, Value::str("a"), three).repr(), "'aaa'");
    }

    #[test]
    fn test_repeat_cap() {
        let ctx = EvalContext::new();
        let out = apply(&ctx, BinaryOp::Mul, &Value::str("ab"), &Value::from(100_000_000i64)).unwrap();
        assert!(out.is_err());
    }

    #[test]
    fn test_concat_creates_new_list() {
        let a = Value::list(vec![Value::from(1i64)]);
        let joined = run(BinaryOp::Add, a.clone(), Value::list(vec![Value::from(2i64)]));
        assert_eq!(joined.repr(), "[1, 2]");
        assert_eq!(a.repr(), "[1]");
    }

    #[test]
    fn test_find_bytes() {
        assert_eq!(find_bytes(b"hello", b"ll", 0), Some(2));
        assert_eq!(find_bytes(b"hello", b"", 5), Some(5));
        assert_eq!(find_bytes(b"hello", b"z", 0), None);
    }
}
