//! Hashable wrapper for Value to enable use as dict keys and set members

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::FromPrimitive;

use super::{Decimal, NestingGuard, Value};
use crate::error::{EvalError, Result};

/// A value together with its precomputed hash.
///
/// Numbers that compare equal hash equally across types, so `1`, `1.0`,
/// `True` and `Decimal('1')` are the same key.
#[derive(Clone)]
pub struct HashKey {
    value: Value,
    hash: u64,
}

impl HashKey {
    /// Wrap a value, failing with TypeError if it is unhashable.
    pub fn new(value: Value) -> Result<Self> {
        let hash = hash_value(&value)?;
        Ok(Self { value, hash })
    }

    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Unwrap.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The precomputed hash.
    pub fn hash_code(&self) -> u64 {
        self.hash
    }
}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.value.py_eq(&other.value).unwrap_or(false)
    }
}

impl Eq for HashKey {}

impl std::fmt::Debug for HashKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value.repr())
    }
}

fn hash_integer(n: &BigInt, state: &mut DefaultHasher) {
    0u8.hash(state);
    n.hash(state);
}

fn hash_decimal(d: &Decimal, state: &mut DefaultHasher) {
    if let Some(n) = d.to_integer() {
        hash_integer(&n, state);
        return;
    }
    match d {
        Decimal::Infinite { negative } => {
            2u8.hash(state);
            negative.hash(state);
        }
        _ => {
            1u8.hash(state);
            d.normalized_key().hash(state);
        }
    }
}

fn hash_float(f: f64, state: &mut DefaultHasher) {
    if f.is_finite() && f.fract() == 0.0 {
        if let Some(n) = BigInt::from_f64(f) {
            hash_integer(&n, state);
            return;
        }
    }
    hash_decimal(&Decimal::from_f64(f), state);
}

/// Hash a value, failing with TypeError for mutable containers.
pub(crate) fn hash_value(value: &Value) -> Result<u64> {
    let mut state = DefaultHasher::new();
    match value {
        Value::None => 10u8.hash(&mut state),
        Value::Ellipsis => 11u8.hash(&mut state),
        Value::Bool(b) => hash_integer(&BigInt::from(*b as u8), &mut state),
        Value::Int(n) => hash_integer(n, &mut state),
        Value::Float(f) => hash_float(*f, &mut state),
        Value::Decimal(d) => hash_decimal(d, &mut state),
        Value::Complex(c) => {
            if c.im == 0.0 {
                hash_float(c.re, &mut state);
            } else {
                12u8.hash(&mut state);
                c.re.to_bits().hash(&mut state);
                c.im.to_bits().hash(&mut state);
            }
        }
        Value::Str(s) => {
            13u8.hash(&mut state);
            s.hash(&mut state);
        }
        Value::Bytes(b) => {
            14u8.hash(&mut state);
            b.hash(&mut state);
        }
        Value::Tuple(items) => {
            let _guard = NestingGuard::enter()?;
            15u8.hash(&mut state);
            items.len().hash(&mut state);
            for item in items.iter() {
                hash_value(item)?.hash(&mut state);
            }
        }
        Value::FrozenSet(items) => {
            16u8.hash(&mut state);
            let combined = items
                .iter()
                .fold(0u64, |acc, key| acc ^ key.hash.wrapping_mul(0x9e37_79b9_7f4a_7c15));
            combined.hash(&mut state);
        }
        Value::Range(r) => {
            17u8.hash(&mut state);
            let len = r.len();
            len.hash(&mut state);
            if len > 0 {
                r.start.hash(&mut state);
            }
            if len > 1 {
                r.step.hash(&mut state);
            }
        }
        Value::Date(d) => {
            18u8.hash(&mut state);
            d.hash(&mut state);
        }
        Value::DateTime(dt) => {
            19u8.hash(&mut state);
            dt.utc().unwrap_or(dt.naive).hash(&mut state);
        }
        Value::Time(t) => {
            20u8.hash(&mut state);
            t.naive.hash(&mut state);
            t.tz.map(|o| o.local_minus_utc()).hash(&mut state);
        }
        Value::TimeDelta(td) => {
            21u8.hash(&mut state);
            td.hash(&mut state);
        }
        Value::TimeZone(tz) => {
            22u8.hash(&mut state);
            tz.local_minus_utc().hash(&mut state);
        }
        Value::Builtin(b) => {
            23u8.hash(&mut state);
            b.name.hash(&mut state);
        }
        Value::Type(t) => {
            24u8.hash(&mut state);
            t.hash(&mut state);
        }
        Value::Module(m) => {
            25u8.hash(&mut state);
            m.hash(&mut state);
        }
        Value::Iterator(iter) => {
            26u8.hash(&mut state);
            (Rc::as_ptr(iter) as *const u8 as usize).hash(&mut state);
        }
        Value::Method(m) => {
            27u8.hash(&mut state);
            (Rc::as_ptr(m) as *const u8 as usize).hash(&mut state);
        }
        Value::ItemGetter(items) => {
            28u8.hash(&mut state);
            (Rc::as_ptr(items) as *const u8 as usize).hash(&mut state);
        }
        Value::List(_)
        | Value::Dict(_)
        | Value::DictView(..)
        | Value::Set(_)
        | Value::Slice(_) => {
            return Err(EvalError::type_error(format!(
                "unhashable type: '{}'",
                value.type_name()
            )))
        }
    }
    Ok(state.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(v: Value) -> HashKey {
        HashKey::new(v).unwrap()
    }

    #[test]
    fn test_numeric_keys_unify() {
        let one = key(Value::from(1i64));
        assert_eq!(one, key(Value::from(1.0)));
        assert_eq!(one, key(Value::Bool(true)));
        assert_eq!(one, key(Value::Decimal(Decimal::parse("1.00").unwrap())));
        assert_eq!(
            key(Value::from(0.5)),
            key(Value::Decimal(Decimal::parse("0.5").unwrap()))
        );
        assert_ne!(key(Value::from(0.1)), key(Value::Decimal(Decimal::parse("0.1").unwrap())));
    }

    #[test]
    fn test_tuple_keys() {
        let a = key(Value::tuple(vec![Value::from(1i64), Value::str("x")]));
        let b = key(Value::tuple(vec![Value::from(1.0), Value::str("x")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_unhashable() {
        let err = HashKey::new(Value::list(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "unhashable type: 'list'");
        let nested = Value::tuple(vec![Value::list(vec![])]);
        assert!(HashKey::new(nested).is_err());
    }
}
