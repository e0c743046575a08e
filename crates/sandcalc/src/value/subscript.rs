//! Item access: indexing, slicing, item assignment and deletion

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use super::{check_len, collect, HashKey, Range, Slice, Value};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};

/// Resolved slice bounds for a sequence of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceIndices {
    /// First position
    pub start: i64,
    /// Exclusive end position (may be -1 for negative steps)
    pub stop: i64,
    /// Non-zero step
    pub step: i64,
    /// Number of selected positions
    pub len: usize,
}

impl SliceIndices {
    /// Resolve `slice` against a sequence of `len` elements.
    pub fn resolve(slice: &Slice, len: usize) -> Result<Self> {
        let len = len as i64;
        let step = match &slice.step {
            Value::None => 1,
            v => clamp_bound(v)?,
        };
        if step == 0 {
            return Err(EvalError::value_error("slice step cannot be zero"));
        }
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
        let adjust = |bound: &Value, default: i64| -> Result<i64> {
            if bound.is_none() {
                return Ok(default);
            }
            let mut i = clamp_bound(bound)?;
            if i < 0 {
                i = i.saturating_add(len);
                if i < lower {
                    i = lower;
                }
            } else if i > upper {
                i = upper;
            }
            Ok(i)
        };
        let start = adjust(&slice.start, if step < 0 { upper } else { lower })?;
        let stop = adjust(&slice.stop, if step < 0 { lower } else { upper })?;
        let count = if step < 0 {
            if stop < start {
                (start - stop - 1) / (-step) + 1
            } else {
                0
            }
        } else if start < stop {
            (stop - start - 1) / step + 1
        } else {
            0
        };
        Ok(Self {
            start,
            stop,
            step,
            len: count as usize,
        })
    }

    /// Selected positions in order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).map(move |k| (self.start + k as i64 * self.step) as usize)
    }
}

fn clamp_bound(value: &Value) -> Result<i64> {
    let n = value.to_index().map_err(|_| {
        EvalError::type_error(
            "slice indices must be integers or None or have an __index__ method",
        )
    })?;
    Ok(n.to_i64().unwrap_or(if n.is_negative() { i64::MIN / 2 } else { i64::MAX / 2 }))
}

/// Normalize an integer index, failing with IndexError when out of range.
fn normalize(index: &Value, len: usize, what: &str) -> Result<usize> {
    let n: BigInt = index.to_index()?;
    let len_big = BigInt::from(len);
    let adjusted = if n.is_negative() { n + &len_big } else { n };
    if adjusted.is_negative() || adjusted >= len_big {
        return Err(EvalError::index_error(format!("{} index out of range", what)));
    }
    adjusted
        .to_usize()
        .ok_or_else(|| EvalError::index_error(format!("{} index out of range", what)))
}

fn is_index(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::Int(_))
        || matches!(value, Value::Decimal(d) if d.is_integral())
}

fn bad_index(container: &str, index: &Value) -> EvalError {
    EvalError::type_error(format!(
        "{} indices must be integers or slices, not {}",
        container,
        index.type_name()
    ))
}

fn str_chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Reads
// ═══════════════════════════════════════════════════════════════════════

/// `container[index]`.
pub fn get_item(container: &Value, index: &Value) -> Result<Value> {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            match index {
                Value::Slice(slice) => {
                    let si = SliceIndices::resolve(slice, items.len())?;
                    Ok(Value::list(si.positions().map(|i| items[i].clone()).collect()))
                }
                i if is_index(i) => Ok(items[normalize(i, items.len(), "list")?].clone()),
                other => Err(bad_index("list", other)),
            }
        }
        Value::Tuple(items) => match index {
            Value::Slice(slice) => {
                let si = SliceIndices::resolve(slice, items.len())?;
                Ok(Value::tuple(si.positions().map(|i| items[i].clone()).collect()))
            }
            i if is_index(i) => Ok(items[normalize(i, items.len(), "tuple")?].clone()),
            other => Err(bad_index("tuple", other)),
        },
        Value::Str(s) => match index {
            Value::Slice(slice) => {
                let chars = str_chars(s);
                let si = SliceIndices::resolve(slice, chars.len())?;
                Ok(Value::str(si.positions().map(|i| chars[i]).collect::<String>()))
            }
            i if is_index(i) => {
                if s.is_ascii() {
                    let pos = normalize(i, s.len(), "string")?;
                    Ok(Value::str(&s[pos..pos + 1]))
                } else {
                    let chars = str_chars(s);
                    let pos = normalize(i, chars.len(), "string")?;
                    Ok(Value::str(chars[pos].to_string()))
                }
            }
            other => Err(EvalError::type_error(format!(
                "string indices must be integers, not '{}'",
                other.type_name()
            ))),
        },
        Value::Bytes(data) => match index {
            Value::Slice(slice) => {
                let si = SliceIndices::resolve(slice, data.len())?;
                Ok(Value::bytes(si.positions().map(|i| data[i]).collect::<Vec<u8>>()))
            }
            i if is_index(i) => Ok(Value::from(data[normalize(i, data.len(), "index")?] as i64)),
            other => Err(bad_index("byte", other)),
        },
        Value::Range(r) => match index {
            Value::Slice(slice) => {
                let si = SliceIndices::resolve(slice, r.len() as usize)?;
                let base = |k: i64| -> i64 {
                    (r.start as i128 + k as i128 * r.step as i128)
                        .clamp(i64::MIN as i128, i64::MAX as i128) as i64
                };
                Ok(Value::Range(Range {
                    start: base(si.start),
                    stop: base(si.stop),
                    step: r.step.saturating_mul(si.step),
                }))
            }
            i if is_index(i) => {
                let pos = normalize(i, r.len() as usize, "range object")?;
                Ok(Value::from(r.nth(pos as i64)))
            }
            other => Err(bad_index("range", other)),
        },
        Value::Dict(map) => {
            let key = HashKey::new(index.clone())?;
            let found = map.borrow().get(&key).cloned();
            found.ok_or_else(|| EvalError::Key { key: index.repr() })
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════════════════════════════════

/// `container[index] = value`.
pub fn set_item(ctx: &EvalContext, container: &Value, index: &Value, value: Value) -> Result<()> {
    match container {
        Value::List(items) => match index {
            Value::Slice(slice) => {
                let replacement = collect(ctx, &value)?;
                let len = items.borrow().len();
                let si = SliceIndices::resolve(slice, len)?;
                let mut items = items.borrow_mut();
                if si.step == 1 {
                    let start = si.start.clamp(0, len as i64) as usize;
                    let stop = (si.stop.max(si.start)).clamp(0, len as i64) as usize;
                    check_len(len - (stop - start) + replacement.len())?;
                    items.splice(start..stop, replacement);
                } else {
                    if replacement.len() != si.len {
                        return Err(EvalError::value_error(format!(
                            "attempt to assign sequence of size {} to extended slice of size {}",
                            replacement.len(),
                            si.len
                        )));
                    }
                    let positions: Vec<usize> = si.positions().collect();
                    for (pos, item) in positions.into_iter().zip(replacement) {
                        items[pos] = item;
                    }
                }
                Ok(())
            }
            i if is_index(i) => {
                let len = items.borrow().len();
                let pos = normalize(i, len, "list assignment")?;
                items.borrow_mut()[pos] = value;
                Ok(())
            }
            other => Err(bad_index("list", other)),
        },
        Value::Dict(map) => {
            let key = HashKey::new(index.clone())?;
            map.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// `del container[index]`.
pub fn del_item(container: &Value, index: &Value) -> Result<()> {
    match container {
        Value::List(items) => match index {
            Value::Slice(slice) => {
                let len = items.borrow().len();
                let si = SliceIndices::resolve(slice, len)?;
                let mut doomed: Vec<usize> = si.positions().collect();
                doomed.sort_unstable();
                let mut items = items.borrow_mut();
                for pos in doomed.into_iter().rev() {
                    items.remove(pos);
                }
                Ok(())
            }
            i if is_index(i) => {
                let len = items.borrow().len();
                let pos = normalize(i, len, "list assignment")?;
                items.borrow_mut().remove(pos);
                Ok(())
            }
            other => Err(bad_index("list", other)),
        },
        Value::Dict(map) => {
            let key = HashKey::new(index.clone())?;
            let removed = map.borrow_mut().shift_remove(&key);
            removed
                .map(|_| ())
                .ok_or_else(|| EvalError::Key { key: index.repr() })
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object doesn't support item deletion",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn slice(start: Value, stop: Value, step: Value) -> Value {
        Value::Slice(Rc::new(Slice { start, stop, step }))
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().map(|n| Value::from(*n)).collect())
    }

    #[test]
    fn test_negative_index() {
        let list = ints(&[1, 2, 3]);
        assert_eq!(get_item(&list, &Value::from(-1i64)).unwrap().repr(), "3");
        let err = get_item(&list, &Value::from(3i64)).unwrap_err();
        assert_eq!(err.to_string(), "list index out of range");
    }

    #[test]
    fn test_slices() {
        let list = ints(&[0, 1, 2, 3, 4]);
        let rev = get_item(&list, &slice(Value::None, Value::None, Value::from(-1i64))).unwrap();
        assert_eq!(rev.repr(), "[4, 3, 2, 1, 0]");
        let mid = get_item(&list, &slice(Value::from(1i64), Value::from(-1i64), Value::None)).unwrap();
        assert_eq!(mid.repr(), "[1, 2, 3]");
        let text = Value::str("héllo");
        let part = get_item(&text, &slice(Value::from(1i64), Value::from(3i64), Value::None)).unwrap();
        assert_eq!(part.to_string(), "él");
    }

    #[test]
    fn test_range_slice() {
        let r = Value::Range(Range {
            start: 0,
            stop: 10,
            step: 1,
        });
        let sliced = get_item(&r, &slice(Value::None, Value::None, Value::from(-2i64))).unwrap();
        assert_eq!(sliced.repr(), "range(9, -1, -2)");
    }

    #[test]
    fn test_slice_assignment() {
        let ctx = EvalContext::new();
        let list = ints(&[0, 1, 2, 3]);
        set_item(
            &ctx,
            &list,
            &slice(Value::from(1i64), Value::from(3i64), Value::None),
            ints(&[9]),
        )
        .unwrap();
        assert_eq!(list.repr(), "[0, 9, 3]");

        let err = set_item(
            &ctx,
            &list,
            &slice(Value::None, Value::None, Value::from(2i64)),
            ints(&[1]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("extended slice of size 2"));
    }

    #[test]
    fn test_dict_items() {
        let ctx = EvalContext::new();
        let dict = Value::dict(Default::default());
        set_item(&ctx, &dict, &Value::str("a"), Value::from(1i64)).unwrap();
        assert_eq!(get_item(&dict, &Value::str("a")).unwrap().repr(), "1");
        let err = get_item(&dict, &Value::str("b")).unwrap_err();
        assert_eq!(err.category(), "KeyError");
        assert_eq!(err.to_string(), "'b'");
        del_item(&dict, &Value::str("a")).unwrap();
        assert!(del_item(&dict, &Value::str("a")).is_err());
    }

    #[test]
    fn test_tuple_is_immutable() {
        let tuple = Value::tuple(vec![Value::None]);
        let err = set_item(&EvalContext::new(), &tuple, &Value::from(0i64), Value::None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'tuple' object does not support item assignment"
        );
    }
}
