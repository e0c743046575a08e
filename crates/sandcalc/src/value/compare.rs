//! Equality and ordering with native semantics

use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::{Decimal, HashKey, NestingGuard, Value, ViewKind};
use crate::error::{EvalError, Result};

/// Ordering operator of a rich comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl OrderOp {
    /// Operator symbol for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            OrderOp::Lt => "<",
            OrderOp::Le => "<=",
            OrderOp::Gt => ">",
            OrderOp::Ge => ">=",
        }
    }

    /// Apply to an ordering.
    pub fn test(self, ord: Ordering) -> bool {
        match self {
            OrderOp::Lt => ord == Ordering::Less,
            OrderOp::Le => ord != Ordering::Greater,
            OrderOp::Gt => ord == Ordering::Greater,
            OrderOp::Ge => ord != Ordering::Less,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Numeric comparison
// ═══════════════════════════════════════════════════════════════════════

enum Real<'a> {
    Int(BigInt),
    Float(f64),
    Decimal(&'a Decimal),
}

fn as_real(value: &Value) -> Option<Real<'_>> {
    match value {
        Value::Bool(b) => Some(Real::Int(BigInt::from(*b as u8))),
        Value::Int(n) => Some(Real::Int(n.clone())),
        Value::Float(f) => Some(Real::Float(*f)),
        Value::Decimal(d) => Some(Real::Decimal(d)),
        _ => None,
    }
}

const EXACT_F64_INT: i64 = 1 << 53;

fn small_int(n: &BigInt) -> Option<f64> {
    n.to_i64()
        .filter(|v| v.abs() <= EXACT_F64_INT)
        .map(|v| v as f64)
}

fn to_decimal(real: &Real<'_>) -> Decimal {
    match real {
        Real::Int(n) => Decimal::from_bigint(n),
        Real::Float(f) => Decimal::from_f64(*f),
        Real::Decimal(d) => (*d).clone(),
    }
}

/// Exact ordering of two real numbers; `None` when either is NaN.
fn real_cmp(a: &Real<'_>, b: &Real<'_>) -> Option<Ordering> {
    match (a, b) {
        (Real::Int(x), Real::Int(y)) => Some(x.cmp(y)),
        (Real::Float(x), Real::Float(y)) => x.partial_cmp(y),
        (Real::Int(x), Real::Float(y)) => match small_int(x) {
            Some(x) => x.partial_cmp(y),
            None => to_decimal(a).partial_cmp_value(&to_decimal(b)),
        },
        (Real::Float(x), Real::Int(y)) => match small_int(y) {
            Some(y) => x.partial_cmp(&y),
            None => to_decimal(a).partial_cmp_value(&to_decimal(b)),
        },
        _ => to_decimal(a).partial_cmp_value(&to_decimal(b)),
    }
}

fn numeric_eq(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Complex(x), Value::Complex(y)) => Some(x == y),
        (Value::Complex(c), other) | (other, Value::Complex(c)) => {
            if matches!(other, Value::Decimal(_)) {
                return Some(false);
            }
            let real = as_real(other)?;
            Some(c.im == 0.0 && real_cmp(&Real::Float(c.re), &real) == Some(Ordering::Equal))
        }
        _ => {
            let (x, y) = (as_real(a)?, as_real(b)?);
            Some(real_cmp(&x, &y) == Some(Ordering::Equal))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Set-like views
// ═══════════════════════════════════════════════════════════════════════

fn is_set_like(value: &Value) -> bool {
    matches!(
        value,
        Value::Set(_)
            | Value::FrozenSet(_)
            | Value::DictView(ViewKind::Keys, _)
            | Value::DictView(ViewKind::Items, _)
    )
}

/// Members of a set-like value.
pub(crate) fn set_members(value: &Value) -> Vec<Value> {
    match value {
        Value::Set(set) => set.borrow().iter().map(|k| k.value().clone()).collect(),
        Value::FrozenSet(set) => set.iter().map(|k| k.value().clone()).collect(),
        Value::DictView(ViewKind::Keys, map) => {
            map.borrow().keys().map(|k| k.value().clone()).collect()
        }
        Value::DictView(ViewKind::Items, map) => map
            .borrow()
            .iter()
            .map(|(k, v)| Value::tuple(vec![k.value().clone(), v.clone()]))
            .collect(),
        _ => Vec::new(),
    }
}

fn set_len(value: &Value) -> usize {
    match value {
        Value::Set(set) => set.borrow().len(),
        Value::FrozenSet(set) => set.len(),
        Value::DictView(_, map) => map.borrow().len(),
        _ => 0,
    }
}

/// Membership in a set-like value.
pub(crate) fn set_contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Set(set) => Ok(set.borrow().contains(&HashKey::new(item.clone())?)),
        Value::FrozenSet(set) => Ok(set.contains(&HashKey::new(item.clone())?)),
        Value::DictView(ViewKind::Keys, map) => {
            Ok(map.borrow().contains_key(&HashKey::new(item.clone())?))
        }
        Value::DictView(ViewKind::Items, map) => {
            let Value::Tuple(pair) = item else {
                return Ok(false);
            };
            if pair.len() != 2 {
                return Ok(false);
            }
            let Ok(key) = HashKey::new(pair[0].clone()) else {
                return Ok(false);
            };
            let found = map.borrow().get(&key).cloned();
            match found {
                Some(v) => v.py_eq(&pair[1]),
                None => Ok(false),
            }
        }
        _ => Ok(false),
    }
}

fn is_subset(a: &Value, b: &Value) -> Result<bool> {
    if set_len(a) > set_len(b) {
        return Ok(false);
    }
    for item in set_members(a) {
        if !set_contains(b, &item)? {
            return Ok(false);
        }
    }
    Ok(true)
}

// ═══════════════════════════════════════════════════════════════════════
// Equality
// ═══════════════════════════════════════════════════════════════════════

fn seq_eq(a: &[Value], b: &[Value]) -> Result<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    let _guard = NestingGuard::enter()?;
    for (x, y) in a.iter().zip(b.iter()) {
        if !(x.is_same(y) || x.py_eq(y)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

impl Value {
    /// Identity test used by `is` and by container equality shortcuts.
    ///
    /// Shared containers compare by address; immutable scalars by value
    /// within the same type.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) | (Value::Ellipsis, Value::Ellipsis) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Bytes(a), Value::Bytes(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b) || (a.is_empty() && b.is_empty()),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::FrozenSet(a), Value::FrozenSet(b)) => Rc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Rc::ptr_eq(a, b),
            (Value::ItemGetter(a), Value::ItemGetter(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            _ => false,
        }
    }

    /// `self == other`.
    pub fn py_eq(&self, other: &Value) -> Result<bool> {
        if let Some(eq) = numeric_eq(self, other) {
            return Ok(eq);
        }
        if is_set_like(self) && is_set_like(other) {
            let comparable = !matches!(
                (self, other),
                (Value::DictView(ViewKind::Items, _), Value::DictView(ViewKind::Keys, _))
                    | (Value::DictView(ViewKind::Keys, _), Value::DictView(ViewKind::Items, _))
            );
            return Ok(comparable && set_len(self) == set_len(other) && is_subset(self, other)?);
        }
        match (self, other) {
            (Value::None, Value::None) | (Value::Ellipsis, Value::Ellipsis) => Ok(true),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::Bytes(a), Value::Bytes(b)) => Ok(a == b),
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (x, y) = (a.borrow().clone(), b.borrow().clone());
                seq_eq(&x, &y)
            }
            (Value::Tuple(a), Value::Tuple(b)) => seq_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let _guard = NestingGuard::enter()?;
                let x: Vec<(HashKey, Value)> =
                    a.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                if x.len() != b.borrow().len() {
                    return Ok(false);
                }
                for (k, v) in x {
                    let found = b.borrow().get(&k).cloned();
                    match found {
                        Some(w) if v.is_same(&w) || v.py_eq(&w)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            (Value::Range(a), Value::Range(b)) => {
                let len = a.len();
                Ok(len == b.len()
                    && (len == 0 || (a.start == b.start && (len == 1 || a.step == b.step))))
            }
            (Value::Slice(a), Value::Slice(b)) => Ok(a.start.py_eq(&b.start)?
                && a.stop.py_eq(&b.stop)?
                && a.step.py_eq(&b.step)?),
            (Value::Date(a), Value::Date(b)) => Ok(a == b),
            (Value::DateTime(a), Value::DateTime(b)) => {
                Ok(a.compare(b).map(|o| o == Ordering::Equal).unwrap_or(false))
            }
            (Value::Time(a), Value::Time(b)) => Ok(a == b),
            (Value::TimeDelta(a), Value::TimeDelta(b)) => Ok(a == b),
            (Value::TimeZone(a), Value::TimeZone(b)) => Ok(a == b),
            (Value::Method(a), Value::Method(b)) => {
                Ok(a.name == b.name && a.receiver.is_same(&b.receiver))
            }
            _ => Ok(self.is_same(other)),
        }
    }

    /// Rich ordering comparison (`<`, `<=`, `>`, `>=`).
    pub fn py_order(&self, other: &Value, op: OrderOp) -> Result<bool> {
        if let (Some(a), Some(b)) = (as_real(self), as_real(other)) {
            return Ok(real_cmp(&a, &b).map(|o| op.test(o)).unwrap_or(false));
        }
        if is_set_like(self) && is_set_like(other) {
            return match op {
                OrderOp::Le => is_subset(self, other),
                OrderOp::Ge => is_subset(other, self),
                OrderOp::Lt => Ok(set_len(self) < set_len(other) && is_subset(self, other)?),
                OrderOp::Gt => Ok(set_len(self) > set_len(other) && is_subset(other, self)?),
            };
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(op.test(a.cmp(b))),
            (Value::Bytes(a), Value::Bytes(b)) => Ok(op.test(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                let (x, y) = (a.borrow().clone(), b.borrow().clone());
                seq_order(&x, &y, op)
            }
            (Value::Tuple(a), Value::Tuple(b)) => seq_order(a, b, op),
            (Value::Date(a), Value::Date(b)) => Ok(op.test(a.cmp(b))),
            (Value::DateTime(a), Value::DateTime(b)) => Ok(op.test(a.compare(b)?)),
            (Value::Time(a), Value::Time(b)) => {
                if a.tz.is_some() != b.tz.is_some() {
                    return Err(EvalError::type_error(
                        "can't compare offset-naive and offset-aware times",
                    ));
                }
                let shift = |t: &super::TimeValue| {
                    t.naive
                        - chrono::Duration::seconds(
                            t.tz.map(|o| o.local_minus_utc() as i64).unwrap_or(0),
                        )
                };
                Ok(op.test(shift(a).cmp(&shift(b))))
            }
            (Value::TimeDelta(a), Value::TimeDelta(b)) => Ok(op.test(a.cmp(b))),
            _ => Err(EvalError::type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.symbol(),
                self.type_name(),
                other.type_name()
            ))),
        }
    }
}

fn seq_order(a: &[Value], b: &[Value], op: OrderOp) -> Result<bool> {
    let _guard = NestingGuard::enter()?;
    for (x, y) in a.iter().zip(b.iter()) {
        if !(x.is_same(y) || x.py_eq(y)?) {
            return x.py_order(y, op);
        }
    }
    Ok(op.test(a.len().cmp(&b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Complex;

    fn int(n: i64) -> Value {
        Value::from(n)
    }

    #[test]
    fn test_cross_type_numeric_equality() {
        assert!(int(1).py_eq(&Value::from(1.0)).unwrap());
        assert!(Value::Bool(true).py_eq(&int(1)).unwrap());
        let half = Value::Decimal(Decimal::parse("0.5").unwrap());
        assert!(half.py_eq(&Value::from(0.5)).unwrap());
        let tenth = Value::Decimal(Decimal::parse("0.1").unwrap());
        assert!(!tenth.py_eq(&Value::from(0.1)).unwrap());
        assert!(Value::Complex(Complex::new(2.0, 0.0)).py_eq(&int(2)).unwrap());
    }

    #[test]
    fn test_ordering() {
        assert!(int(1).py_order(&Value::from(1.5), OrderOp::Lt).unwrap());
        assert!(!Value::from(f64::NAN).py_order(&int(1), OrderOp::Lt).unwrap());
        assert!(Value::str("abc").py_order(&Value::str("abd"), OrderOp::Lt).unwrap());
        let err = int(1).py_order(&Value::str("a"), OrderOp::Lt).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn test_sequence_ordering() {
        let a = Value::tuple(vec![int(1), int(2)]);
        let b = Value::tuple(vec![int(1), int(3)]);
        let c = Value::tuple(vec![int(1)]);
        assert!(a.py_order(&b, OrderOp::Lt).unwrap());
        assert!(c.py_order(&a, OrderOp::Lt).unwrap());
        assert!(a.py_order(&a, OrderOp::Le).unwrap());
    }

    #[test]
    fn test_container_equality() {
        let a = Value::list(vec![int(1), Value::str("x")]);
        let b = Value::list(vec![Value::from(1.0), Value::str("x")]);
        assert!(a.py_eq(&b).unwrap());
        assert!(!a.py_eq(&Value::tuple(vec![int(1), Value::str("x")])).unwrap());
    }
}
