//! Lazy iteration over values

use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;

use super::{check_len, ListRef, Range, Value, ViewKind};
use crate::builtins::{call_value, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};

/// A single-pass iterator over values.
///
/// Iterators that apply a function (`map`, `filter`) call it lazily, so
/// every step can observe the interrupt flag.
pub struct ValueIter {
    kind: &'static str,
    state: IterState,
}

enum IterState {
    Items { items: Rc<[Value]>, pos: usize },
    List { list: ListRef, pos: usize },
    Chars { text: Rc<str>, pos: usize },
    Bytes { data: Rc<[u8]>, pos: usize },
    Range { range: Range, pos: i64, len: i64 },
    Shared(Rc<RefCell<ValueIter>>),
    Map { func: Value, sources: Vec<ValueIter> },
    Filter { func: Value, source: Box<ValueIter>, keep: bool },
    Zip { sources: Vec<ValueIter> },
    Enumerate { source: Box<ValueIter>, count: BigInt },
}

impl ValueIter {
    /// Iterator over an already materialised sequence.
    pub fn from_vec(kind: &'static str, items: Vec<Value>) -> Self {
        Self {
            kind,
            state: IterState::Items {
                items: Rc::from(items),
                pos: 0,
            },
        }
    }

    /// `map(func, *iterables)`.
    pub fn map(func: Value, sources: Vec<ValueIter>) -> Self {
        Self {
            kind: "map",
            state: IterState::Map { func, sources },
        }
    }

    /// `filter(func, iterable)`; `keep = false` gives `filterfalse`.
    pub fn filter(kind: &'static str, func: Value, source: ValueIter, keep: bool) -> Self {
        Self {
            kind,
            state: IterState::Filter {
                func,
                source: Box::new(source),
                keep,
            },
        }
    }

    /// `zip(*iterables)`.
    pub fn zip(sources: Vec<ValueIter>) -> Self {
        Self {
            kind: "zip",
            state: IterState::Zip { sources },
        }
    }

    /// `enumerate(iterable, start)`.
    pub fn enumerate(source: ValueIter, start: BigInt) -> Self {
        Self {
            kind: "enumerate",
            state: IterState::Enumerate {
                source: Box::new(source),
                count: start,
            },
        }
    }

    /// Type name shown in reprs and error messages.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Remaining length when known without consuming anything.
    pub fn len_hint(&self) -> Option<usize> {
        match &self.state {
            IterState::Items { items, pos } => Some(items.len().saturating_sub(*pos)),
            IterState::List { list, pos } => Some(list.borrow().len().saturating_sub(*pos)),
            IterState::Bytes { data, pos } => Some(data.len().saturating_sub(*pos)),
            IterState::Range { pos, len, .. } => Some((len - pos).max(0) as usize),
            IterState::Shared(inner) => inner.try_borrow().ok().and_then(|it| it.len_hint()),
            _ => None,
        }
    }

    /// Advance the iterator.
    pub fn next(&mut self, ctx: &EvalContext) -> Result<Option<Value>> {
        match &mut self.state {
            IterState::Items { items, pos } => {
                let item = items.get(*pos).cloned();
                *pos += 1;
                Ok(item)
            }
            IterState::List { list, pos } => {
                let item = list.borrow().get(*pos).cloned();
                *pos += 1;
                Ok(item)
            }
            IterState::Chars { text, pos } => match text[*pos..].chars().next() {
                Some(c) => {
                    *pos += c.len_utf8();
                    Ok(Some(Value::str(c.to_string())))
                }
                None => Ok(None),
            },
            IterState::Bytes { data, pos } => {
                let item = data.get(*pos).map(|b| Value::from(*b as i64));
                *pos += 1;
                Ok(item)
            }
            IterState::Range { range, pos, len } => {
                if *pos >= *len {
                    return Ok(None);
                }
                let value = range.nth(*pos);
                *pos += 1;
                Ok(Some(Value::from(value)))
            }
            IterState::Shared(inner) => {
                let mut inner = inner
                    .try_borrow_mut()
                    .map_err(|_| EvalError::value_error("iterator already executing"))?;
                inner.next(ctx)
            }
            IterState::Map { func, sources } => {
                let mut args = Vec::with_capacity(sources.len());
                for source in sources.iter_mut() {
                    match source.next(ctx)? {
                        Some(item) => args.push(item),
                        None => return Ok(None),
                    }
                }
                let func = func.clone();
                call_value(ctx, &func, Args::positional(args)).map(Some)
            }
            IterState::Filter { func, source, keep } => loop {
                ctx.check_interrupt()?;
                let Some(item) = source.next(ctx)? else {
                    return Ok(None);
                };
                let verdict = if func.is_none() {
                    item.truthy()
                } else {
                    let func = func.clone();
                    call_value(ctx, &func, Args::positional(vec![item.clone()]))?.truthy()
                };
                if verdict == *keep {
                    return Ok(Some(item));
                }
            },
            IterState::Zip { sources } => {
                if sources.is_empty() {
                    return Ok(None);
                }
                let mut items = Vec::with_capacity(sources.len());
                for source in sources.iter_mut() {
                    match source.next(ctx)? {
                        Some(item) => items.push(item),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Value::tuple(items)))
            }
            IterState::Enumerate { source, count } => match source.next(ctx)? {
                Some(item) => {
                    let index = Value::Int(count.clone());
                    *count += 1;
                    Ok(Some(Value::tuple(vec![index, item])))
                }
                None => Ok(None),
            },
        }
    }
}

/// Start iterating over a value.
pub fn iterate(value: &Value) -> Result<ValueIter> {
    let (kind, state) = match value {
        Value::List(list) => (
            "list_iterator",
            IterState::List {
                list: list.clone(),
                pos: 0,
            },
        ),
        Value::Tuple(items) => (
            "tuple_iterator",
            IterState::Items {
                items: items.clone(),
                pos: 0,
            },
        ),
        Value::Str(text) => (
            "str_iterator",
            IterState::Chars {
                text: text.clone(),
                pos: 0,
            },
        ),
        Value::Bytes(data) => (
            "bytes_iterator",
            IterState::Bytes {
                data: data.clone(),
                pos: 0,
            },
        ),
        Value::Range(range) => (
            "range_iterator",
            IterState::Range {
                range: *range,
                pos: 0,
                len: range.len(),
            },
        ),
        Value::Dict(map) => {
            let keys = map.borrow().keys().map(|k| k.value().clone()).collect();
            return Ok(ValueIter::from_vec("dict_keyiterator", keys));
        }
        Value::DictView(kind, map) => {
            let map = map.borrow();
            let items = match kind {
                ViewKind::Keys => map.keys().map(|k| k.value().clone()).collect(),
                ViewKind::Values => map.values().cloned().collect(),
                ViewKind::Items => map
                    .iter()
                    .map(|(k, v)| Value::tuple(vec![k.value().clone(), v.clone()]))
                    .collect(),
            };
            return Ok(ValueIter::from_vec("dict_iterator", items));
        }
        Value::Set(set) => {
            let items = set.borrow().iter().map(|k| k.value().clone()).collect();
            return Ok(ValueIter::from_vec("set_iterator", items));
        }
        Value::FrozenSet(set) => {
            let items = set.iter().map(|k| k.value().clone()).collect();
            return Ok(ValueIter::from_vec("set_iterator", items));
        }
        Value::Iterator(inner) => {
            let kind = value.type_name();
            (kind, IterState::Shared(inner.clone()))
        }
        other => {
            return Err(EvalError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            )))
        }
    };
    Ok(ValueIter { kind, state })
}

/// Materialise every element of an iterable.
///
/// Polls the interrupt flag per element and enforces the collection cap.
pub fn collect(ctx: &EvalContext, value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::List(items) => return Ok(items.borrow().clone()),
        Value::Tuple(items) => return Ok(items.to_vec()),
        Value::Range(r) => check_len(r.len().max(0) as usize)?,
        _ => {}
    }
    let mut iter = iterate(value)?;
    let mut out = Vec::with_capacity(iter.len_hint().unwrap_or(0).min(1 << 16));
    while let Some(item) = iter.next(ctx)? {
        if out.len() % 1024 == 0 {
            ctx.check_interrupt()?;
            check_len(out.len() + 1)?;
        }
        out.push(item);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_basic() {
        let ctx = EvalContext::new();
        let text = collect(&ctx, &Value::str("ab")).unwrap();
        assert_eq!(Value::list(text).repr(), "['a', 'b']");
        let r = Value::Range(Range {
            start: 3,
            stop: 0,
            step: -1,
        });
        assert_eq!(Value::list(collect(&ctx, &r).unwrap()).repr(), "[3, 2, 1]");
    }

    #[test]
    fn test_shared_iterator_is_single_pass() {
        let ctx = EvalContext::new();
        let it = Value::iterator(ValueIter::from_vec(
            "zip",
            vec![Value::from(1i64), Value::from(2i64)],
        ));
        assert_eq!(collect(&ctx, &it).unwrap().len(), 2);
        assert!(collect(&ctx, &it).unwrap().is_empty());
    }

    #[test]
    fn test_not_iterable() {
        let Err(err) = iterate(&Value::from(1i64)) else {
            panic!("int should not be iterable");
        };
        assert_eq!(err.to_string(), "'int' object is not iterable");
    }

    #[test]
    fn test_zip_and_enumerate() {
        let ctx = EvalContext::new();
        let a = iterate(&Value::str("xy")).unwrap();
        let b = iterate(&Value::list(vec![Value::None])).unwrap();
        let zipped = Value::iterator(ValueIter::zip(vec![a, b]));
        assert_eq!(Value::list(collect(&ctx, &zipped).unwrap()).repr(), "[('x', None)]");

        let e = ValueIter::enumerate(iterate(&Value::str("ab")).unwrap(), BigInt::from(1));
        let items = collect(&ctx, &Value::iterator(e)).unwrap();
        assert_eq!(Value::list(items).repr(), "[(1, 'a'), (2, 'b')]");
    }
}
