//! Set algebra and dict merging

use indexmap::IndexSet;

use super::BinaryOp;
use crate::error::Result;
use crate::value::{set_contains, set_members, HashKey, Value, ViewKind};

fn is_set_operand(value: &Value) -> bool {
    matches!(
        value,
        Value::Set(_)
            | Value::FrozenSet(_)
            | Value::DictView(ViewKind::Keys, _)
            | Value::DictView(ViewKind::Items, _)
    )
}

/// Compute a set operation over member lists.
pub(crate) fn combine(op: BinaryOp, left: &Value, right: &Value) -> Result<IndexSet<HashKey>> {
    let mut out = IndexSet::new();
    match op {
        BinaryOp::BitOr => {
            for item in set_members(left).into_iter().chain(set_members(right)) {
                out.insert(HashKey::new(item)?);
            }
        }
        BinaryOp::BitAnd => {
            for item in set_members(left) {
                if set_contains(right, &item)? {
                    out.insert(HashKey::new(item)?);
                }
            }
        }
        BinaryOp::Sub => {
            for item in set_members(left) {
                if !set_contains(right, &item)? {
                    out.insert(HashKey::new(item)?);
                }
            }
        }
        BinaryOp::BitXor => {
            for item in set_members(left) {
                if !set_contains(right, &item)? {
                    out.insert(HashKey::new(item)?);
                }
            }
            for item in set_members(right) {
                if !set_contains(left, &item)? {
                    out.insert(HashKey::new(item)?);
                }
            }
        }
        _ => {}
    }
    Ok(out)
}

pub(super) fn apply(op: BinaryOp, left: &Value, right: &Value) -> Option<Result<Value>> {
    if let (BinaryOp::BitOr, Value::Dict(a), Value::Dict(b)) = (op, left, right) {
        let mut merged = a.borrow().clone();
        for (k, v) in b.borrow().iter() {
            merged.insert(k.clone(), v.clone());
        }
        return Some(Ok(Value::dict(merged)));
    }

    let set_op = matches!(
        op,
        BinaryOp::BitOr | BinaryOp::BitAnd | BinaryOp::Sub | BinaryOp::BitXor
    );
    if !set_op || !is_set_operand(left) || !is_set_operand(right) {
        return None;
    }
    // The result takes the left operand's flavour; views produce sets.
    let frozen = matches!(left, Value::FrozenSet(_));
    Some(combine(op, left, right).map(|items| {
        if frozen {
            Value::frozenset(items)
        } else {
            Value::set(items)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(items: &[i64]) -> Value {
        Value::set(
            items
                .iter()
                .map(|n| HashKey::new(Value::from(*n)).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_set_algebra() {
        let (a, b) = (set(&[1, 2, 3]), set(&[2, 3, 4]));
        let run = |op| apply(op, &a, &b).unwrap().unwrap().repr();
        assert_eq!(run(BinaryOp::BitOr), "{1, 2, 3, 4}");
        assert_eq!(run(BinaryOp::BitAnd), "{2, 3}");
        assert_eq!(run(BinaryOp::Sub), "{1}");
        assert_eq!(run(BinaryOp::BitXor), "{1, 4}");
    }

    #[test]
    fn test_dict_merge() {
        let mut left = indexmap::IndexMap::new();
        left.insert(HashKey::new(Value::str("a")).unwrap(), Value::from(1i64));
        let mut right = indexmap::IndexMap::new();
        right.insert(HashKey::new(Value::str("a")).unwrap(), Value::from(2i64));
        right.insert(HashKey::new(Value::str("b")).unwrap(), Value::from(3i64));
        let merged = apply(BinaryOp::BitOr, &Value::dict(left), &Value::dict(right))
            .unwrap()
            .unwrap();
        assert_eq!(merged.repr(), "{'a': 2, 'b': 3}");
    }

    #[test]
    fn test_not_a_set_operation() {
        assert!(apply(BinaryOp::Add, &set(&[1]), &set(&[2])).is_none());
        assert!(apply(BinaryOp::BitOr, &set(&[1]), &Value::list(vec![])).is_none());
    }
}
