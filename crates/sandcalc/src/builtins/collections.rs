//! `list`, `tuple`, `dict` and `set` methods
//!
//! Receivers are shared `RefCell`s. No borrow is held while user code or
//! an equality test runs: items are cloned out first, and mutation happens
//! in a short borrow afterwards.

use indexmap::{IndexMap, IndexSet};
use num_traits::{Signed, ToPrimitive};

use super::sort::sort_values;
use super::text::window;
use super::Args;
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::{check_len, collect, iterate, DictRef, HashKey, ListRef, SetRef, Value, ViewKind};

fn no_args(args: &Args, name: &str) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(EvalError::type_error(format!(
            "{}() takes no arguments ({} given)",
            name,
            args.len()
        )))
    }
}

fn position_of(ctx: &EvalContext, items: &[Value], target: &Value, start: usize, end: usize) -> Result<Option<usize>> {
    for i in start..end.min(items.len()) {
        ctx.check_interrupt()?;
        if items[i].py_eq(target)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn occurrences(items: &[Value], target: &Value) -> Result<usize> {
    let mut n = 0;
    for item in items {
        if item.py_eq(target)? {
            n += 1;
        }
    }
    Ok(n)
}

/// `index`/`count`, shared by lists and tuples.
fn sequence_query(ctx: &EvalContext, items: &[Value], kind: &str, name: &str, args: Args) -> Result<Value> {
    match name {
        "count" => {
            let [x] = args.fixed("count", ["value"])?;
            Ok(Value::from(occurrences(items, &x)?))
        }
        _ => {
            let ([x], [start, end]) = args.bind("index", ["value"], ["start", "stop"])?;
            let (start, end) = window(items.len(), start, end)?;
            match position_of(ctx, items, &x, start, end)? {
                Some(i) => Ok(Value::from(i)),
                None if kind == "list" => Err(EvalError::value_error(format!("{} is not in list", x.repr()))),
                None => Err(EvalError::value_error("tuple.index(x): x not in tuple")),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// list
// ═══════════════════════════════════════════════════════════════════════

/// Call a `list` method.
pub(super) fn list_method(ctx: &EvalContext, list: &ListRef, name: &'static str, args: Args) -> Result<Value> {
    match name {
        "index" | "count" => {
            let items = list.borrow().clone();
            sequence_query(ctx, &items, "list", name, args)
        }
        "append" => {
            let [x] = args.fixed("append", ["object"])?;
            let mut items = list.borrow_mut();
            check_len(items.len() + 1)?;
            items.push(x);
            Ok(Value::None)
        }
        "clear" => {
            no_args(&args, name)?;
            list.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            no_args(&args, name)?;
            Ok(Value::list(list.borrow().clone()))
        }
        "extend" => {
            let [iterable] = args.fixed("extend", ["iterable"])?;
            let extra = collect(ctx, &iterable)?;
            let mut items = list.borrow_mut();
            check_len(items.len() + extra.len())?;
            items.extend(extra);
            Ok(Value::None)
        }
        "insert" => {
            let [index, x] = args.fixed("insert", ["index", "object"])?;
            let index = index.to_index()?;
            let mut items = list.borrow_mut();
            check_len(items.len() + 1)?;
            let len = items.len() as i64;
            let i = index.to_i64().unwrap_or(if index.is_negative() { i64::MIN / 2 } else { i64::MAX / 2 });
            let i = if i < 0 { (i + len).max(0) } else { i.min(len) };
            items.insert(i as usize, x);
            Ok(Value::None)
        }
        "pop" => {
            let ([], [index]) = args.bind("pop", [], ["index"])?;
            let mut items = list.borrow_mut();
            if items.is_empty() {
                return Err(EvalError::index_error("pop from empty list"));
            }
            let len = items.len() as i64;
            let i = match index {
                Some(v) => v.to_i64()?,
                None => -1,
            };
            let i = if i < 0 { i + len } else { i };
            if !(0..len).contains(&i) {
                return Err(EvalError::index_error("pop index out of range"));
            }
            Ok(items.remove(i as usize))
        }
        "remove" => {
            let [x] = args.fixed("remove", ["value"])?;
            let snapshot = list.borrow().clone();
            match position_of(ctx, &snapshot, &x, 0, snapshot.len())? {
                Some(i) => {
                    let mut items = list.borrow_mut();
                    if i < items.len() {
                        items.remove(i);
                    }
                    Ok(Value::None)
                }
                None => Err(EvalError::value_error("list.remove(x): x not in list")),
            }
        }
        "reverse" => {
            no_args(&args, name)?;
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "sort" => {
            let mut args = args;
            if !args.positional.is_empty() {
                return Err(EvalError::type_error("sort() takes no positional arguments"));
            }
            let key = args.take_keyword("key").filter(|k| !k.is_none());
            let reverse = args.take_keyword("reverse").map_or(false, |r| r.truthy());
            args.no_keywords("sort")?;
            let items = std::mem::take(&mut *list.borrow_mut());
            let sorted = sort_values(ctx, items.clone(), key.as_ref(), reverse);
            let mut slot = list.borrow_mut();
            match sorted {
                Ok(sorted) => {
                    *slot = sorted;
                    Ok(Value::None)
                }
                Err(e) => {
                    *slot = items;
                    Err(e)
                }
            }
        }
        _ => Err(super::no_attribute(&Value::List(list.clone()), name)),
    }
}

/// Call a `tuple` method.
pub(super) fn tuple_method(ctx: &EvalContext, items: &[Value], name: &'static str, args: Args) -> Result<Value> {
    match name {
        "index" | "count" => sequence_query(ctx, items, "tuple", name, args),
        _ => Err(EvalError::attribute_error(format!(
            "'tuple' object has no attribute '{}'",
            name
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// dict
// ═══════════════════════════════════════════════════════════════════════

/// Merge a mapping or an iterable of pairs, then keyword arguments.
pub(super) fn update_dict(
    ctx: &EvalContext,
    target: &DictRef,
    source: Option<&Value>,
    keywords: IndexMap<String, Value>,
) -> Result<()> {
    let mut entries: Vec<(HashKey, Value)> = Vec::new();
    match source {
        None => {}
        Some(Value::Dict(map)) => {
            entries.extend(map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Some(other) => {
            let mut iter = iterate(other)?;
            let mut index = 0;
            while let Some(element) = iter.next(ctx)? {
                let pair = collect(ctx, &element).map_err(|_| {
                    EvalError::type_error(format!(
                        "cannot convert dictionary update sequence element #{} to a sequence",
                        index
                    ))
                })?;
                let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
                    EvalError::value_error(format!(
                        "dictionary update sequence element #{} has length {}; 2 is required",
                        index,
                        pair.len()
                    ))
                })?;
                entries.push((HashKey::new(key)?, value));
                index += 1;
            }
        }
    }
    for (name, value) in keywords {
        entries.push((HashKey::new(Value::from(name))?, value));
    }

    let mut map = target.borrow_mut();
    for (key, value) in entries {
        map.insert(key, value);
    }
    check_len(map.len())
}

/// `dict.fromkeys(iterable, value=None)`.
pub(super) fn dict_fromkeys(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([iterable], [value]) = args.bind("fromkeys", ["iterable"], ["value"])?;
    let value = value.unwrap_or(Value::None);
    let mut map = IndexMap::new();
    let mut iter = iterate(&iterable)?;
    while let Some(key) = iter.next(ctx)? {
        map.insert(HashKey::new(key)?, value.clone());
        check_len(map.len())?;
    }
    Ok(Value::dict(map))
}

/// Call a `dict` method.
pub(super) fn dict_method(ctx: &EvalContext, map: &DictRef, name: &'static str, args: Args) -> Result<Value> {
    match name {
        "keys" | "values" | "items" => {
            no_args(&args, name)?;
            let kind = match name {
                "keys" => ViewKind::Keys,
                "values" => ViewKind::Values,
                _ => ViewKind::Items,
            };
            Ok(Value::DictView(kind, map.clone()))
        }
        "copy" => {
            no_args(&args, name)?;
            Ok(Value::dict(map.borrow().clone()))
        }
        "get" => {
            let ([key], [default]) = args.bind("get", ["key"], ["default"])?;
            let key = HashKey::new(key)?;
            let found = map.borrow().get(&key).cloned();
            Ok(found.or(default).unwrap_or(Value::None))
        }
        "pop" => {
            let ([key], [default]) = args.bind("pop", ["key"], ["default"])?;
            let hashed = HashKey::new(key)?;
            let removed = map.borrow_mut().shift_remove(&hashed);
            match (removed, default) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default),
                (None, None) => Err(EvalError::Key {
                    key: hashed.value().repr(),
                }),
            }
        }
        "popitem" => {
            no_args(&args, name)?;
            let last = map.borrow_mut().pop();
            match last {
                Some((key, value)) => Ok(Value::tuple(vec![key.into_value(), value])),
                None => Err(EvalError::Key {
                    key: "'popitem(): dictionary is empty'".to_string(),
                }),
            }
        }
        "setdefault" => {
            let ([key], [default]) = args.bind("setdefault", ["key"], ["default"])?;
            let key = HashKey::new(key)?;
            let existing = map.borrow().get(&key).cloned();
            match existing {
                Some(value) => Ok(value),
                None => {
                    let value = default.unwrap_or(Value::None);
                    let mut entries = map.borrow_mut();
                    check_len(entries.len() + 1)?;
                    entries.insert(key, value.clone());
                    Ok(value)
                }
            }
        }
        "update" => {
            let mut args = args;
            let keywords = std::mem::take(&mut args.keywords);
            let ([], [source]) = args.bind("update", [], ["other"])?;
            update_dict(ctx, map, source.as_ref(), keywords)?;
            Ok(Value::None)
        }
        _ => Err(super::no_attribute(&Value::Dict(map.clone()), name)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// set
// ═══════════════════════════════════════════════════════════════════════

fn members_of(ctx: &EvalContext, iterable: &Value) -> Result<IndexSet<HashKey>> {
    if let Value::Set(set) = iterable {
        return Ok(set.borrow().clone());
    }
    if let Value::FrozenSet(set) = iterable {
        return Ok((**set).clone());
    }
    let mut iter = iterate(iterable)?;
    let mut out = IndexSet::new();
    while let Some(item) = iter.next(ctx)? {
        out.insert(HashKey::new(item)?);
        check_len(out.len())?;
    }
    Ok(out)
}

fn others(ctx: &EvalContext, name: &str, args: Args) -> Result<Vec<IndexSet<HashKey>>> {
    args.no_keywords(name)?;
    args.positional.iter().map(|v| members_of(ctx, v)).collect()
}

fn one_other(ctx: &EvalContext, name: &str, args: Args) -> Result<IndexSet<HashKey>> {
    let [other] = args.fixed(name, ["other"])?;
    members_of(ctx, &other)
}

fn union_all(mut base: IndexSet<HashKey>, others: Vec<IndexSet<HashKey>>) -> Result<IndexSet<HashKey>> {
    for other in others {
        base.extend(other);
        check_len(base.len())?;
    }
    Ok(base)
}

fn intersect_all(mut base: IndexSet<HashKey>, others: Vec<IndexSet<HashKey>>) -> IndexSet<HashKey> {
    for other in others {
        base.retain(|k| other.contains(k));
    }
    base
}

fn difference_all(mut base: IndexSet<HashKey>, others: Vec<IndexSet<HashKey>>) -> IndexSet<HashKey> {
    for other in others {
        base.retain(|k| !other.contains(k));
    }
    base
}

fn symmetric(base: &IndexSet<HashKey>, other: &IndexSet<HashKey>) -> IndexSet<HashKey> {
    base.symmetric_difference(other).cloned().collect()
}

/// Call a `set` method.
pub(super) fn set_method(ctx: &EvalContext, set: &SetRef, name: &'static str, args: Args) -> Result<Value> {
    let current = || set.borrow().clone();
    match name {
        "isdisjoint" => {
            let other = one_other(ctx, name, args)?;
            Ok(Value::Bool(current().iter().all(|k| !other.contains(k))))
        }
        "issubset" => {
            let other = one_other(ctx, name, args)?;
            Ok(Value::Bool(current().iter().all(|k| other.contains(k))))
        }
        "issuperset" => {
            let other = one_other(ctx, name, args)?;
            let mine = current();
            Ok(Value::Bool(other.iter().all(|k| mine.contains(k))))
        }
        "union" => Ok(Value::set(union_all(current(), others(ctx, name, args)?)?)),
        "intersection" => Ok(Value::set(intersect_all(current(), others(ctx, name, args)?))),
        "difference" => Ok(Value::set(difference_all(current(), others(ctx, name, args)?))),
        "symmetric_difference" => {
            let other = one_other(ctx, name, args)?;
            Ok(Value::set(symmetric(&current(), &other)))
        }
        "copy" => {
            no_args(&args, name)?;
            Ok(Value::set(current()))
        }
        "update" | "intersection_update" | "difference_update" => {
            let others = others(ctx, name, args)?;
            let updated = match name {
                "update" => union_all(current(), others)?,
                "intersection_update" => intersect_all(current(), others),
                _ => difference_all(current(), others),
            };
            *set.borrow_mut() = updated;
            Ok(Value::None)
        }
        "symmetric_difference_update" => {
            let other = one_other(ctx, name, args)?;
            let updated = symmetric(&current(), &other);
            *set.borrow_mut() = updated;
            Ok(Value::None)
        }
        "add" => {
            let [item] = args.fixed("add", ["object"])?;
            let key = HashKey::new(item)?;
            let mut members = set.borrow_mut();
            check_len(members.len() + 1)?;
            members.insert(key);
            Ok(Value::None)
        }
        "remove" | "discard" => {
            let [item] = args.fixed(name, ["object"])?;
            let key = HashKey::new(item)?;
            let removed = set.borrow_mut().shift_remove(&key);
            if !removed && name == "remove" {
                return Err(EvalError::Key {
                    key: key.value().repr(),
                });
            }
            Ok(Value::None)
        }
        "pop" => {
            no_args(&args, name)?;
            let first = set.borrow_mut().shift_remove_index(0);
            first
                .map(HashKey::into_value)
                .ok_or_else(|| EvalError::Key {
                    key: "'pop from an empty set'".to_string(),
                })
        }
        "clear" => {
            no_args(&args, name)?;
            set.borrow_mut().clear();
            Ok(Value::None)
        }
        _ => Err(super::no_attribute(&Value::Set(set.clone()), name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|n| Value::from(*n)).collect()
    }

    fn new_list(values: &[i64]) -> ListRef {
        Rc::new(RefCell::new(ints(values)))
    }

    fn show(result: Result<Value>) -> String {
        match result {
            Ok(v) => v.repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_list_mutation() {
        let ctx = EvalContext::new();
        let list = new_list(&[3, 1, 2]);
        list_method(&ctx, &list, "append", Args::positional(ints(&[4]))).unwrap();
        list_method(&ctx, &list, "insert", Args::positional(ints(&[-100, 0]))).unwrap();
        assert_eq!(Value::List(list.clone()).repr(), "[0, 3, 1, 2, 4]");
        assert_eq!(show(list_method(&ctx, &list, "pop", Args::new())), "4");
        assert_eq!(show(list_method(&ctx, &list, "pop", Args::positional(ints(&[0])))), "0");
        list_method(&ctx, &list, "sort", Args::new()).unwrap();
        assert_eq!(Value::List(list.clone()).repr(), "[1, 2, 3]");
        assert_eq!(
            show(list_method(&ctx, &list, "remove", Args::positional(ints(&[9])))),
            "ValueError: list.remove(x): x not in list"
        );
        assert_eq!(
            show(list_method(&ctx, &list, "index", Args::positional(ints(&[9])))),
            "ValueError: 9 is not in list"
        );
    }

    #[test]
    fn test_list_extend_with_itself() {
        let ctx = EvalContext::new();
        let list = new_list(&[1, 2]);
        let args = Args::positional(vec![Value::List(list.clone())]);
        list_method(&ctx, &list, "extend", args).unwrap();
        assert_eq!(Value::List(list).repr(), "[1, 2, 1, 2]");
    }

    #[test]
    fn test_sort_failure_keeps_items() {
        let ctx = EvalContext::new();
        let list = Rc::new(RefCell::new(vec![Value::from(1i64), Value::str("a")]));
        assert!(list_method(&ctx, &list, "sort", Args::new()).is_err());
        assert_eq!(list.borrow().len(), 2);
    }

    #[test]
    fn test_pop_empty() {
        let ctx = EvalContext::new();
        let list = new_list(&[]);
        assert_eq!(
            show(list_method(&ctx, &list, "pop", Args::new())),
            "IndexError: pop from empty list"
        );
    }

    #[test]
    fn test_dict_methods() {
        let ctx = EvalContext::new();
        let value = Value::dict(IndexMap::new());
        let Value::Dict(map) = &value else { unreachable!() };
        let pairs = Value::list(vec![Value::tuple(vec![Value::str("a"), Value::from(1i64)])]);
        dict_method(&ctx, map, "update", Args::positional(vec![pairs])).unwrap();
        assert_eq!(
            show(dict_method(&ctx, map, "get", Args::positional(vec![Value::str("z"), Value::from(0i64)]))),
            "0"
        );
        assert_eq!(
            show(dict_method(&ctx, map, "setdefault", Args::positional(vec![Value::str("b"), Value::from(2i64)]))),
            "2"
        );
        assert_eq!(value.repr(), "{'a': 1, 'b': 2}");
        assert_eq!(show(dict_method(&ctx, map, "popitem", Args::new())), "('b', 2)");
        assert_eq!(
            show(dict_method(&ctx, map, "pop", Args::positional(vec![Value::str("q")]))),
            "KeyError: 'q'"
        );
    }

    #[test]
    fn test_update_sequence_errors() {
        let ctx = EvalContext::new();
        let value = Value::dict(IndexMap::new());
        let Value::Dict(map) = &value else { unreachable!() };
        let bad = Value::list(vec![Value::tuple(ints(&[1, 2, 3]))]);
        let err = update_dict(&ctx, map, Some(&bad), IndexMap::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dictionary update sequence element #0 has length 3; 2 is required"
        );
    }

    #[test]
    fn test_set_methods() {
        let ctx = EvalContext::new();
        let value = Value::set(IndexSet::new());
        let Value::Set(set) = &value else { unreachable!() };
        set_method(&ctx, set, "update", Args::positional(vec![Value::list(ints(&[1, 2, 3]))])).unwrap();
        assert_eq!(
            show(set_method(&ctx, set, "intersection", Args::positional(vec![Value::list(ints(&[2, 3, 4]))]))),
            "{2, 3}"
        );
        assert_eq!(
            show(set_method(&ctx, set, "issubset", Args::positional(vec![Value::list(ints(&[1, 2, 3, 4]))]))),
            "True"
        );
        assert_eq!(
            show(set_method(&ctx, set, "remove", Args::positional(ints(&[9])))),
            "KeyError: 9"
        );
        set_method(&ctx, set, "discard", Args::positional(ints(&[9]))).unwrap();
        assert_eq!(show(set_method(&ctx, set, "pop", Args::new())), "1");
    }
}
