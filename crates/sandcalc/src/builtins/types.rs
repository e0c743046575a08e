//! Type objects called as constructors, and their class-level methods

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use super::collections::{dict_fromkeys, update_dict};
use super::functions::float_to_int;
use super::numbers::{float_fromhex, int_from_bytes, parse_complex, parse_float, parse_int};
use super::strings::{byte_value, bytes_fromhex, bytes_maketrans, str_maketrans};
use super::{datetime, text, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::{check_len, collect, iterate, Complex, Decimal, HashKey, PyType, Range, Value};

/// Call a type object.
pub(super) fn construct(ctx: &EvalContext, t: PyType, args: Args) -> Result<Value> {
    match t {
        PyType::Bool => {
            let ([], [x]) = args.bind("bool", [], ["x"])?;
            Ok(Value::Bool(x.map_or(false, |v| v.truthy())))
        }
        PyType::Int => construct_int(args),
        PyType::Float => construct_float(args),
        PyType::Complex => construct_complex(args),
        PyType::Decimal => construct_decimal(args),
        PyType::Str => construct_str(args),
        PyType::Bytes => construct_bytes(ctx, args),
        PyType::List => {
            let ([], [iterable]) = args.bind("list", [], ["iterable"])?;
            let items = match iterable {
                Some(v) => collect(ctx, &v)?,
                None => Vec::new(),
            };
            Ok(Value::list(items))
        }
        PyType::Tuple => {
            let ([], [iterable]) = args.bind("tuple", [], ["iterable"])?;
            match iterable {
                Some(Value::Tuple(items)) => Ok(Value::Tuple(items)),
                Some(v) => Ok(Value::tuple(collect(ctx, &v)?)),
                None => Ok(Value::tuple(Vec::new())),
            }
        }
        PyType::Set | PyType::FrozenSet => {
            let fname = t.name();
            let ([], [iterable]) = args.bind(fname, [], ["iterable"])?;
            let members = match iterable {
                Some(v) => hash_all(ctx, &v)?,
                None => IndexSet::new(),
            };
            Ok(if t == PyType::Set {
                Value::set(members)
            } else {
                Value::frozenset(members)
            })
        }
        PyType::Dict => {
            let mut args = args;
            let keywords = std::mem::take(&mut args.keywords);
            let ([], [source]) = args.bind("dict", [], ["mapping"])?;
            let value = Value::dict(IndexMap::new());
            if let Value::Dict(map) = &value {
                update_dict(ctx, map, source.as_ref(), keywords)?;
            }
            Ok(value)
        }
        PyType::Range => construct_range(args),
        PyType::Date | PyType::DateTime | PyType::Time | PyType::TimeDelta | PyType::TimeZone => {
            datetime::construct(t, args)
        }
        PyType::Type => {
            let [obj] = args.fixed("type", ["object"])?;
            Ok(Value::Type(obj.py_type()))
        }
        other => Err(EvalError::type_error(format!(
            "cannot create '{}' instances",
            other.qualified_name()
        ))),
    }
}

/// Class-level method call such as `int.from_bytes(...)`.
pub(super) fn class_method(ctx: &EvalContext, t: PyType, name: &'static str, args: Args) -> Result<Value> {
    match (t, name) {
        (PyType::Dict, "fromkeys") => dict_fromkeys(ctx, args),
        (PyType::Float, "fromhex") => {
            let [string] = args.fixed("fromhex", ["string"])?;
            let text = string.as_str().ok_or_else(|| {
                EvalError::type_error(format!(
                    "fromhex() argument must be str, not {}",
                    string.type_name()
                ))
            })?;
            Ok(Value::Float(float_fromhex(text)?))
        }
        (PyType::Int, "from_bytes") => int_from_bytes(ctx, args),
        (PyType::Str, "maketrans") => str_maketrans(args),
        (PyType::Bytes, "fromhex") => bytes_fromhex(args),
        (PyType::Bytes, "maketrans") => bytes_maketrans(args),
        (PyType::Date | PyType::DateTime | PyType::Time, _) => datetime::class_method(t, name, args),
        _ => Err(EvalError::attribute_error(format!(
            "type object '{}' has no attribute '{}'",
            t.name(),
            name
        ))),
    }
}

fn hash_all(ctx: &EvalContext, iterable: &Value) -> Result<IndexSet<HashKey>> {
    let mut iter = iterate(iterable)?;
    let mut members = IndexSet::new();
    while let Some(item) = iter.next(ctx)? {
        members.insert(HashKey::new(item)?);
        check_len(members.len())?;
    }
    Ok(members)
}

// ═══════════════════════════════════════════════════════════════════════
// Numbers
// ═══════════════════════════════════════════════════════════════════════

fn construct_int(args: Args) -> Result<Value> {
    let ([], [x, base]) = args.bind("int", [], ["x", "base"])?;
    let Some(x) = x else {
        if base.is_some() {
            return Err(EvalError::type_error("int() missing string argument"));
        }
        return Ok(Value::int(0));
    };

    let text = match &x {
        Value::Str(s) => Some(s.to_string()),
        Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        _ => None,
    };
    let Some(text) = text else {
        if base.is_some() {
            return Err(EvalError::type_error(
                "int() can't convert non-string with explicit base",
            ));
        }
        return match &x {
            Value::Bool(_) | Value::Int(_) => Ok(Value::Int(x.to_index()?)),
            Value::Float(f) => Ok(Value::Int(float_to_int(f.trunc())?)),
            Value::Decimal(d) => Ok(Value::Int(d.to_bigint()?)),
            other => Err(EvalError::type_error(format!(
                "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                other.type_name()
            ))),
        };
    };

    let radix = match base {
        Some(b) => b.to_i64()?,
        None => 10,
    };
    if radix != 0 && !(2..=36).contains(&radix) {
        return Err(EvalError::value_error(
            "int() base must be >= 2 and <= 36, or 0",
        ));
    }
    parse_int(&text, radix as u32).map(Value::Int).ok_or_else(|| {
        EvalError::value_error(format!(
            "invalid literal for int() with base {}: {}",
            radix,
            x.repr()
        ))
    })
}

fn construct_float(args: Args) -> Result<Value> {
    let ([], [x]) = args.bind("float", [], ["x"])?;
    let Some(x) = x else {
        return Ok(Value::Float(0.0));
    };
    match &x {
        Value::Str(s) => parse_float(s).map(Value::Float).ok_or_else(|| {
            EvalError::value_error(format!("could not convert string to float: {}", x.repr()))
        }),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Decimal(_) => Ok(Value::Float(x.to_f64()?)),
        other => Err(EvalError::type_error(format!(
            "float() argument must be a string or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn complex_part(value: &Value, which: &str) -> Result<Complex> {
    match value {
        Value::Complex(c) => Ok(*c),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Decimal(_) => {
            Ok(Complex::new(value.to_f64()?, 0.0))
        }
        other => Err(EvalError::type_error(format!(
            "complex() {} must be a number, not '{}'",
            which,
            other.type_name()
        ))),
    }
}

fn construct_complex(args: Args) -> Result<Value> {
    let ([], [real, imag]) = args.bind("complex", [], ["real", "imag"])?;
    if let Some(Value::Str(s)) = &real {
        if imag.is_some() {
            return Err(EvalError::type_error(
                "complex() can't take second arg if first is a string",
            ));
        }
        return parse_complex(s)
            .map(Value::Complex)
            .ok_or_else(|| EvalError::value_error("complex() arg is a malformed string"));
    }
    if let Some(Value::Str(_)) = &imag {
        return Err(EvalError::type_error(
            "complex() second arg can't be a string",
        ));
    }
    let re = match &real {
        Some(v) => complex_part(v, "first argument")?,
        None => Complex::new(0.0, 0.0),
    };
    let im = match &imag {
        Some(v) => complex_part(v, "second argument")?,
        None => Complex::new(0.0, 0.0),
    };
    // (a+bj) + (c+dj)*1j
    Ok(Value::Complex(Complex::new(re.re - im.im, re.im + im.re)))
}

fn construct_decimal(args: Args) -> Result<Value> {
    let ([], [value]) = args.bind("Decimal", [], ["value"])?;
    let decimal = match value {
        None => Decimal::zero(),
        Some(Value::Str(s)) => Decimal::parse(&s)?,
        Some(Value::Bool(b)) => Decimal::from_i64(b as i64),
        Some(Value::Int(n)) => Decimal::from_bigint(&n),
        Some(Value::Float(f)) => Decimal::from_f64(f),
        Some(Value::Decimal(d)) => d,
        Some(Value::Tuple(parts)) => decimal_from_tuple(&parts)?,
        Some(other) => {
            return Err(EvalError::type_error(format!(
                "conversion from {} to Decimal is not supported",
                other.type_name()
            )))
        }
    };
    Ok(Value::Decimal(decimal))
}

fn decimal_from_tuple(parts: &[Value]) -> Result<Decimal> {
    let malformed = || {
        EvalError::value_error(
            "argument must be a sequence of length 3 (sign, digits, exponent)",
        )
    };
    let [sign, digits, exp] = parts else {
        return Err(malformed());
    };
    let negative = match sign.to_index()?.to_u8() {
        Some(0) => false,
        Some(1) => true,
        _ => {
            return Err(EvalError::value_error(
                "sign must be an integer with the value 0 or 1",
            ))
        }
    };
    let Value::Tuple(digits) = digits else {
        return Err(malformed());
    };
    let mut coeff = BigInt::zero();
    for digit in digits.iter() {
        match digit.to_index()?.to_u8() {
            Some(d) if d < 10 => coeff = coeff * 10 + d,
            _ => {
                return Err(EvalError::value_error(
                    "coefficient must be a tuple of digits",
                ))
            }
        }
    }
    let exp = exp.to_i64()?;
    Ok(Decimal::finite(negative, coeff, exp))
}

// ═══════════════════════════════════════════════════════════════════════
// Text
// ═══════════════════════════════════════════════════════════════════════

fn encoding_args(encoding: Option<Value>, errors: Option<Value>) -> Result<Option<(String, String)>> {
    if encoding.is_none() && errors.is_none() {
        return Ok(None);
    }
    let text_arg = |v: Option<Value>, default: &str| -> Result<String> {
        match v {
            None => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.to_string()),
            Some(other) => Err(EvalError::type_error(format!(
                "argument must be str, not {}",
                other.type_name()
            ))),
        }
    };
    Ok(Some((text_arg(encoding, "utf-8")?, text_arg(errors, "strict")?)))
}

fn construct_str(args: Args) -> Result<Value> {
    let ([], [object, encoding, errors]) = args.bind("str", [], ["object", "encoding", "errors"])?;
    let Some(object) = object else {
        return Ok(Value::str(""));
    };
    match encoding_args(encoding, errors)? {
        None => Ok(Value::from(object.to_string())),
        Some((encoding, errors)) => match &object {
            Value::Bytes(data) => Ok(Value::from(text::decode(data, &encoding, &errors)?)),
            Value::Str(_) => Err(EvalError::type_error("decoding str is not supported")),
            other => Err(EvalError::type_error(format!(
                "decoding to str: need a bytes-like object, {} found",
                other.type_name()
            ))),
        },
    }
}

fn construct_bytes(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([], [source, encoding, errors]) = args.bind("bytes", [], ["source", "encoding", "errors"])?;
    let codec = encoding_args(encoding, errors)?;
    let Some(source) = source else {
        return Ok(Value::bytes(Vec::new()));
    };
    match (&source, codec) {
        (Value::Str(s), Some((encoding, errors))) => Ok(Value::bytes(text::encode(s, &encoding, &errors)?)),
        (Value::Str(_), None) => Err(EvalError::type_error("string argument without an encoding")),
        (_, Some(_)) => Err(EvalError::type_error("encoding without a string argument")),
        (Value::Bytes(_), None) => Ok(source.clone()),
        (Value::Int(_) | Value::Bool(_), None) => {
            let n = source.to_index()?;
            if n < BigInt::zero() {
                return Err(EvalError::value_error("negative count"));
            }
            let len = n
                .to_usize()
                .ok_or_else(|| EvalError::overflow("cannot fit 'int' into an index-sized integer"))?;
            check_len(len)?;
            Ok(Value::bytes(vec![0u8; len]))
        }
        (_, None) => {
            let items = collect(ctx, &source)?;
            let data = items.iter().map(byte_value).collect::<Result<Vec<u8>>>()?;
            Ok(Value::bytes(data))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// range
// ═══════════════════════════════════════════════════════════════════════

fn range_bound(value: &Value) -> Result<i64> {
    value.to_index()?.to_i64().ok_or_else(|| {
        EvalError::overflow("Python int too large to convert to C ssize_t")
    })
}

fn construct_range(args: Args) -> Result<Value> {
    args.no_keywords("range")?;
    let bounds = args
        .positional
        .iter()
        .map(range_bound)
        .collect::<Result<Vec<i64>>>()?;
    let (start, stop, step) = match bounds[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        [] => {
            return Err(EvalError::type_error(
                "range expected at least 1 argument, got 0",
            ))
        }
        _ => {
            return Err(EvalError::type_error(format!(
                "range expected at most 3 arguments, got {}",
                bounds.len()
            )))
        }
    };
    if step == 0 {
        return Err(EvalError::value_error("range() arg 3 must not be zero"));
    }
    Ok(Value::Range(Range { start, stop, step }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(t: PyType, args: Vec<Value>) -> String {
        let ctx = EvalContext::new();
        match construct(&ctx, t, Args::positional(args)) {
            Ok(v) => v.repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_int_constructor() {
        assert_eq!(call(PyType::Int, vec![Value::str(" 42 ")]), "42");
        assert_eq!(call(PyType::Int, vec![Value::str("ff"), Value::from(16i64)]), "255");
        assert_eq!(call(PyType::Int, vec![Value::str("0b101"), Value::from(0i64)]), "5");
        assert_eq!(call(PyType::Int, vec![Value::from(-3.9)]), "-3");
        assert_eq!(
            call(PyType::Int, vec![Value::str("abc")]),
            "ValueError: invalid literal for int() with base 10: 'abc'"
        );
        assert_eq!(
            call(PyType::Int, vec![Value::from(5i64), Value::from(2i64)]),
            "TypeError: int() can't convert non-string with explicit base"
        );
        assert_eq!(
            call(PyType::Int, vec![Value::str("1"), Value::from(1i64)]),
            "ValueError: int() base must be >= 2 and <= 36, or 0"
        );
        assert_eq!(
            call(PyType::Int, vec![Value::from(f64::INFINITY)]),
            "OverflowError: cannot convert float infinity to integer"
        );
    }

    #[test]
    fn test_float_and_complex_constructors() {
        assert_eq!(call(PyType::Float, vec![Value::str("1e3")]), "1000.0");
        assert_eq!(call(PyType::Float, vec![Value::str("-inf")]), "-inf");
        assert_eq!(
            call(PyType::Float, vec![Value::str("x")]),
            "ValueError: could not convert string to float: 'x'"
        );
        assert_eq!(call(PyType::Complex, vec![Value::from(1i64), Value::from(2i64)]), "(1+2j)");
        assert_eq!(
            call(PyType::Complex, vec![Value::str("1+"), ]),
            "ValueError: complex() arg is a malformed string"
        );
    }

    #[test]
    fn test_decimal_constructor() {
        assert_eq!(call(PyType::Decimal, vec![Value::str("1.10")]), "Decimal('1.10')");
        assert_eq!(call(PyType::Decimal, vec![Value::from(0.5)]), "Decimal('0.5')");
        assert_eq!(
            call(
                PyType::Decimal,
                vec![Value::tuple(vec![
                    Value::from(1i64),
                    Value::tuple(vec![Value::from(1i64), Value::from(4i64)]),
                    Value::from(-1i64),
                ])]
            ),
            "Decimal('-1.4')"
        );
        assert_eq!(
            call(PyType::Decimal, vec![Value::list(vec![])]),
            "TypeError: conversion from list to Decimal is not supported"
        );
    }

    #[test]
    fn test_bytes_constructor() {
        assert_eq!(call(PyType::Bytes, vec![Value::from(3i64)]), "b'\\x00\\x00\\x00'");
        assert_eq!(
            call(PyType::Bytes, vec![Value::list(vec![Value::from(104i64), Value::from(105i64)])]),
            "b'hi'"
        );
        assert_eq!(
            call(PyType::Bytes, vec![Value::str("hi")]),
            "TypeError: string argument without an encoding"
        );
        assert_eq!(
            call(PyType::Bytes, vec![Value::list(vec![Value::from(256i64)])]),
            "ValueError: byte must be in range(0, 256)"
        );
    }

    #[test]
    fn test_container_constructors() {
        let pairs = Value::list(vec![Value::tuple(vec![Value::str("a"), Value::from(1i64)])]);
        assert_eq!(call(PyType::Dict, vec![pairs]), "{'a': 1}");
        assert_eq!(call(PyType::Set, vec![Value::str("aab")]), "{'a', 'b'}");
        assert_eq!(call(PyType::Tuple, vec![Value::str("ab")]), "('a', 'b')");
        assert_eq!(call(PyType::List, vec![]), "[]");
    }

    #[test]
    fn test_range_constructor() {
        assert_eq!(call(PyType::Range, vec![Value::from(5i64)]), "range(0, 5)");
        assert_eq!(
            call(PyType::Range, vec![Value::from(0i64), Value::from(5i64), Value::from(0i64)]),
            "ValueError: range() arg 3 must not be zero"
        );
        assert_eq!(
            call(PyType::Range, vec![]),
            "TypeError: range expected at least 1 argument, got 0"
        );
    }
}
