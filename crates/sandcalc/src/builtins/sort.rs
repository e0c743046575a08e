//! Stable sorting with fallible comparisons
//!
//! `slice::sort_by` cannot propagate a comparison error and may panic on an
//! inconsistent order (NaN keys), so sorting goes through a bottom-up merge
//! sort that asks `<` of the values themselves.

use super::{call_value, Args};
use crate::context::EvalContext;
use crate::error::Result;
use crate::value::{OrderOp, Value};

/// Sort values by an optional key function.
///
/// Equal elements keep their relative order in both directions.
pub(crate) fn sort_values(
    ctx: &EvalContext,
    items: Vec<Value>,
    key: Option<&Value>,
    reverse: bool,
) -> Result<Vec<Value>> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let k = match key {
            Some(func) => call_value(ctx, func, Args::positional(vec![item.clone()]))?,
            None => item.clone(),
        };
        keyed.push((k, item));
    }
    let sorted = merge_sort(ctx, keyed, reverse)?;
    Ok(sorted.into_iter().map(|(_, item)| item).collect())
}

fn precedes(a: &Value, b: &Value, reverse: bool) -> Result<bool> {
    if reverse {
        b.py_order(a, OrderOp::Lt)
    } else {
        a.py_order(b, OrderOp::Lt)
    }
}

fn merge_sort(ctx: &EvalContext, mut items: Vec<(Value, Value)>, reverse: bool) -> Result<Vec<(Value, Value)>> {
    let len = items.len();
    let mut width = 1;
    while width < len {
        ctx.check_interrupt()?;
        let mut merged = Vec::with_capacity(len);
        let mut rest = items.into_iter().peekable();
        while rest.peek().is_some() {
            let left: Vec<_> = rest.by_ref().take(width).collect();
            let right: Vec<_> = rest.by_ref().take(width).collect();
            merge(left, right, reverse, &mut merged)?;
        }
        items = merged;
        width *= 2;
    }
    Ok(items)
}

fn merge(
    left: Vec<(Value, Value)>,
    right: Vec<(Value, Value)>,
    reverse: bool,
    out: &mut Vec<(Value, Value)>,
) -> Result<()> {
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => precedes(&r.0, &l.0, reverse)?,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => return Ok(()),
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::functions::builtin_abs;
    use crate::value::Builtin;
    use pretty_assertions::assert_eq;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|n| Value::from(*n)).collect()
    }

    fn render(values: Vec<Value>) -> String {
        Value::list(values).repr()
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let ctx = EvalContext::new();
        let sorted = sort_values(&ctx, ints(&[3, 1, 2, 5, 4]), None, false).unwrap();
        assert_eq!(render(sorted), "[1, 2, 3, 4, 5]");
        let sorted = sort_values(&ctx, ints(&[3, 1, 2]), None, true).unwrap();
        assert_eq!(render(sorted), "[3, 2, 1]");
    }

    #[test]
    fn test_sort_is_stable_with_key() {
        let ctx = EvalContext::new();
        let abs = Value::Builtin(Builtin::new("abs", builtin_abs));
        let sorted = sort_values(&ctx, ints(&[-2, 1, 2, -1]), Some(&abs), false).unwrap();
        assert_eq!(render(sorted), "[1, -1, -2, 2]");
        let sorted = sort_values(&ctx, ints(&[-2, 1, 2, -1]), Some(&abs), true).unwrap();
        assert_eq!(render(sorted), "[-2, 2, 1, -1]");
    }

    #[test]
    fn test_incomparable_values() {
        let ctx = EvalContext::new();
        let err = sort_values(&ctx, vec![Value::from(1i64), Value::str("a")], None, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'<' not supported between instances of 'str' and 'int'"
        );
    }

    #[test]
    fn test_nan_does_not_panic() {
        let ctx = EvalContext::new();
        let items = vec![Value::from(2.0), Value::from(f64::NAN), Value::from(1.0)];
        assert_eq!(sort_values(&ctx, items, None, false).unwrap().len(), 3);
    }
}
