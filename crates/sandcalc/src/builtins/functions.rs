//! Builtin functions bound in the global namespace

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};

use super::{call_value, given, sort_values, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::format;
use crate::ops::{self, numeric, BinaryOp};
use crate::value::{
    collect, iterate, Decimal, OrderOp, PyType, Range, TimeDelta, Value, ValueIter, ViewKind,
};

// ═══════════════════════════════════════════════════════════════════════
// Numbers
// ═══════════════════════════════════════════════════════════════════════

pub(crate) fn builtin_abs(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("abs", ["x"])?;
    if let Some(result) = numeric::abs(&x) {
        return result;
    }
    if let Value::TimeDelta(td) = &x {
        return TimeDelta::from_micros(td.micros().abs()).map(Value::TimeDelta);
    }
    Err(EvalError::type_error(format!(
        "bad operand type for abs(): '{}'",
        x.type_name()
    )))
}

pub(crate) fn builtin_divmod(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("divmod", ["x", "y"])?;
    if let (Value::TimeDelta(_), Value::TimeDelta(_)) = (&a, &b) {
        let q = ops::binary_op(ctx, BinaryOp::FloorDiv, &a, &b)?;
        let r = ops::binary_op(ctx, BinaryOp::Mod, &a, &b)?;
        return Ok(Value::tuple(vec![q, r]));
    }
    ops::divmod(&a, &b)
}

fn integer_arg(value: &Value) -> Result<BigInt> {
    match value {
        Value::Bool(_) | Value::Int(_) => value.to_index(),
        other => Err(EvalError::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            other.type_name()
        ))),
    }
}

fn radix_literal(value: &Value, prefix: &str, radix: u32) -> Result<Value> {
    let n = integer_arg(value)?;
    let sign = if n.is_negative() { "-" } else { "" };
    Ok(Value::from(format!(
        "{}{}{}",
        sign,
        prefix,
        n.magnitude().to_str_radix(radix)
    )))
}

pub(crate) fn builtin_bin(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("bin", ["number"])?;
    radix_literal(&x, "0b", 2)
}

pub(crate) fn builtin_oct(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("oct", ["number"])?;
    radix_literal(&x, "0o", 8)
}

pub(crate) fn builtin_hex(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("hex", ["number"])?;
    radix_literal(&x, "0x", 16)
}

/// `pow(base, exp, mod)`: modular exponentiation over integers.
fn modular_pow(base: &BigInt, exp: &BigInt, modulus: &BigInt) -> Result<BigInt> {
    if modulus.is_zero() {
        return Err(EvalError::value_error("pow() 3rd argument cannot be 0"));
    }
    let (base, exp) = if exp.is_negative() {
        let inverse = mod_inverse(base, modulus).ok_or_else(|| {
            EvalError::value_error("base is not invertible for the given modulus")
        })?;
        (inverse, -exp)
    } else {
        (base.clone(), exp.clone())
    };
    Ok(base.modpow(&exp, modulus))
}

fn mod_inverse(a: &BigInt, m: &BigInt) -> Option<BigInt> {
    let m_abs = m.abs();
    let egcd = a.mod_floor(&m_abs).extended_gcd(&m_abs);
    if !egcd.gcd.is_one() {
        return None;
    }
    Some(egcd.x.mod_floor(&m_abs))
}

pub(crate) fn builtin_pow(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([base, exp], [modulus]) = args.bind("pow", ["base", "exp"], ["mod"])?;
    let Some(modulus) = given(modulus) else {
        return ops::binary_op(ctx, BinaryOp::Pow, &base, &exp);
    };
    let all_int = [&base, &exp, &modulus]
        .iter()
        .all(|v| matches!(v, Value::Bool(_) | Value::Int(_)));
    if all_int {
        let result = modular_pow(&base.to_index()?, &exp.to_index()?, &modulus.to_index()?)?;
        return Ok(Value::Int(result));
    }
    let any_decimal = [&base, &exp, &modulus]
        .iter()
        .any(|v| matches!(v, Value::Decimal(_)));
    if any_decimal {
        let ints = (base.to_index(), exp.to_index(), modulus.to_index());
        let (Ok(b), Ok(e), Ok(m)) = ints else {
            return Err(EvalError::invalid_operation(
                "pow() 3rd argument not allowed unless all arguments are integers",
            ));
        };
        if e.is_negative() {
            return Err(EvalError::invalid_operation(
                "pow() 2nd argument cannot be negative when 3rd argument specified",
            ));
        }
        if m.is_zero() {
            return Err(EvalError::invalid_operation("pow() 3rd argument cannot be 0"));
        }
        // The decimal result takes the sign of the base, not the modulus
        let magnitude = b.abs().modpow(&e, &m.abs());
        let negative = b.is_negative() && e.is_odd();
        return Ok(Value::Decimal(Decimal::finite(negative, magnitude, 0)));
    }
    Err(EvalError::type_error(
        "pow() 3rd argument not allowed unless all arguments are integers",
    ))
}

fn round_half_even_int(n: &BigInt, digits: u32) -> BigInt {
    let unit = BigInt::from(10u32).pow(digits);
    let (q, r) = n.div_mod_floor(&unit);
    let twice: BigInt = &r * 2u32;
    let q = match twice.cmp(&unit) {
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal if q.is_odd() => q + 1,
        _ => q,
    };
    q * unit
}

/// Integral float to int, failing like the native conversion.
pub(crate) fn float_to_int(f: f64) -> Result<BigInt> {
    if f.is_nan() {
        return Err(EvalError::value_error("cannot convert float NaN to integer"));
    }
    BigInt::from_f64(f).ok_or_else(|| EvalError::overflow("cannot convert float infinity to integer"))
}

/// `round(x, ndigits)` for floats: half-even on the exact binary value.
fn round_float(x: f64, ndigits: i64) -> Result<f64> {
    if !x.is_finite() || x == 0.0 {
        return Ok(x);
    }
    if ndigits > 323 {
        return Ok(x);
    }
    if ndigits < -308 {
        return Ok(0.0_f64.copysign(x));
    }
    let rounded = Decimal::from_f64(x).rescale(-ndigits)?.to_f64();
    if rounded.is_infinite() {
        return Err(EvalError::overflow("rounded value too large to represent"));
    }
    Ok(rounded)
}

pub(crate) fn builtin_round(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([number], [ndigits]) = args.bind("round", ["number"], ["ndigits"])?;
    let ndigits = match given(ndigits) {
        Some(nd) => Some(nd.to_i64()?),
        None => None,
    };
    match (&number, ndigits) {
        (Value::Bool(_) | Value::Int(_), None) => Ok(Value::Int(number.to_index()?)),
        (Value::Bool(_) | Value::Int(_), Some(nd)) => {
            let n = number.to_index()?;
            if nd >= 0 {
                return Ok(Value::Int(n));
            }
            let digits = u32::try_from(nd.unsigned_abs()).unwrap_or(u32::MAX);
            if u64::from(digits) > n.bits() {
                return Ok(Value::Int(BigInt::zero()));
            }
            Ok(Value::Int(round_half_even_int(&n, digits)))
        }
        (Value::Float(f), None) => float_to_int(f.round_ties_even()).map(Value::Int),
        (Value::Float(f), Some(nd)) => round_float(*f, nd).map(Value::Float),
        (Value::Decimal(d), None) => {
            if d.is_nan() {
                return Err(EvalError::value_error("cannot round a NaN"));
            }
            if !d.is_finite() {
                return Err(EvalError::overflow("cannot round an infinity"));
            }
            d.rescale(0)?.to_bigint().map(Value::Int)
        }
        (Value::Decimal(d), Some(nd)) => d.quantize_exp(-nd).map(Value::Decimal),
        _ => Err(EvalError::type_error(format!(
            "type {} doesn't define __round__ method",
            number.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Text
// ═══════════════════════════════════════════════════════════════════════

pub(crate) fn builtin_ascii(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [obj] = args.fixed("ascii", ["obj"])?;
    Ok(Value::from(format::ascii_repr(&obj)))
}

pub(crate) fn builtin_repr(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [obj] = args.fixed("repr", ["obj"])?;
    Ok(Value::from(obj.repr()))
}

pub(crate) fn builtin_chr(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [i] = args.fixed("chr", ["i"])?;
    let code = integer_arg(&i)?;
    let code = code
        .to_u32()
        .filter(|c| *c <= 0x10FFFF)
        .ok_or_else(|| EvalError::value_error("chr() arg not in range(0x110000)"))?;
    let c = char::from_u32(code)
        .ok_or_else(|| EvalError::value_error("surrogate code points are not supported"))?;
    Ok(Value::from(c.to_string()))
}

pub(crate) fn builtin_ord(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [c] = args.fixed("ord", ["c"])?;
    match &c {
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(Value::from(ch as i64)),
                _ => Err(EvalError::type_error(format!(
                    "ord() expected a character, but string of length {} found",
                    s.chars().count()
                ))),
            }
        }
        Value::Bytes(b) if b.len() == 1 => Ok(Value::from(b[0] as i64)),
        Value::Bytes(b) => Err(EvalError::type_error(format!(
            "ord() expected a character, but string of length {} found",
            b.len()
        ))),
        other => Err(EvalError::type_error(format!(
            "ord() expected string of length 1, but {} found",
            other.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Introspection
// ═══════════════════════════════════════════════════════════════════════

fn class_matches(t: PyType, classinfo: &Value, fname: &str, what: &str) -> Result<bool> {
    match classinfo {
        Value::Type(target) => Ok(t.is_subtype_of(*target)),
        Value::Tuple(options) => {
            for option in options.iter() {
                if class_matches(t, option, fname, what)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(EvalError::type_error(format!(
            "{}() arg 2 must be {}",
            fname, what
        ))),
    }
}

pub(crate) fn builtin_isinstance(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [obj, classinfo] = args.fixed("isinstance", ["obj", "class_or_tuple"])?;
    let t = obj.py_type();
    class_matches(t, &classinfo, "isinstance", "a type, a tuple of types, or a union").map(Value::Bool)
}

pub(crate) fn builtin_issubclass(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [cls, classinfo] = args.fixed("issubclass", ["cls", "class_or_tuple"])?;
    let Value::Type(t) = cls else {
        return Err(EvalError::type_error("issubclass() arg 1 must be a class"));
    };
    class_matches(t, &classinfo, "issubclass", "a class, a tuple of classes, or a union")
        .map(Value::Bool)
}

pub(crate) fn builtin_len(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [obj] = args.fixed("len", ["obj"])?;
    let len = match &obj {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(map) | Value::DictView(_, map) => map.borrow().len(),
        Value::Set(set) => set.borrow().len(),
        Value::FrozenSet(set) => set.len(),
        Value::Range(r) => {
            if r.len() == i64::MAX {
                return Err(EvalError::overflow(
                    "Python int too large to convert to C ssize_t",
                ));
            }
            r.len() as usize
        }
        other => {
            return Err(EvalError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::from(len))
}

// ═══════════════════════════════════════════════════════════════════════
// Iteration
// ═══════════════════════════════════════════════════════════════════════

fn truth_scan(ctx: &EvalContext, iterable: &Value, want: bool) -> Result<bool> {
    let mut iter = iterate(iterable)?;
    let mut seen = 0usize;
    while let Some(item) = iter.next(ctx)? {
        seen += 1;
        if seen % 1024 == 0 {
            ctx.check_interrupt()?;
        }
        if item.truthy() == want {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn builtin_all(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [iterable] = args.fixed("all", ["iterable"])?;
    truth_scan(ctx, &iterable, false).map(|found| Value::Bool(!found))
}

pub(crate) fn builtin_any(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [iterable] = args.fixed("any", ["iterable"])?;
    truth_scan(ctx, &iterable, true).map(Value::Bool)
}

pub(crate) fn builtin_enumerate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([iterable], [start]) = args.bind("enumerate", ["iterable"], ["start"])?;
    let start = match start {
        Some(s) => integer_arg(&s)?,
        None => BigInt::zero(),
    };
    Ok(Value::iterator(ValueIter::enumerate(iterate(&iterable)?, start)))
}

pub(crate) fn builtin_filter(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [func, iterable] = args.fixed("filter", ["function", "iterable"])?;
    Ok(Value::iterator(ValueIter::filter(
        "filter",
        func,
        iterate(&iterable)?,
        true,
    )))
}

pub(crate) fn builtin_map(_ctx: &EvalContext, args: Args) -> Result<Value> {
    args.no_keywords("map")?;
    let mut positional = args.positional.into_iter();
    let (Some(func), Some(first)) = (positional.next(), positional.next()) else {
        return Err(EvalError::type_error("map() must have at least two arguments."));
    };
    let sources = std::iter::once(first)
        .chain(positional)
        .map(|v| iterate(&v))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::iterator(ValueIter::map(func, sources)))
}

pub(crate) fn builtin_zip(_ctx: &EvalContext, args: Args) -> Result<Value> {
    args.no_keywords("zip")?;
    let sources = args
        .positional
        .iter()
        .map(iterate)
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::iterator(ValueIter::zip(sources)))
}

fn reversed_range(r: &Range) -> Value {
    let len = r.len();
    if len == 0 {
        return Value::Range(Range {
            start: 0,
            stop: 0,
            step: 1,
        });
    }
    let last = r.nth(len - 1);
    match (r.start.checked_sub(r.step), r.step.checked_neg()) {
        (Some(stop), Some(step)) => Value::Range(Range {
            start: last,
            stop,
            step,
        }),
        _ => Value::Range(*r),
    }
}

pub(crate) fn builtin_reversed(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [seq] = args.fixed("reversed", ["sequence"])?;
    let (kind, mut items): (&'static str, Vec<Value>) = match &seq {
        Value::List(items) => ("list_reverseiterator", items.borrow().clone()),
        Value::Tuple(items) => ("reversed", items.to_vec()),
        Value::Str(s) => ("reversed", s.chars().map(|c| Value::from(c.to_string())).collect()),
        Value::Bytes(b) => ("reversed", b.iter().map(|x| Value::from(*x as i64)).collect()),
        Value::Range(r) => return iterate(&reversed_range(r)).map(Value::iterator),
        Value::Dict(map) | Value::DictView(ViewKind::Keys, map) => (
            "dict_reversekeyiterator",
            map.borrow().keys().map(|k| k.value().clone()).collect(),
        ),
        Value::DictView(ViewKind::Values, map) => (
            "dict_reversevalueiterator",
            map.borrow().values().cloned().collect(),
        ),
        Value::DictView(ViewKind::Items, map) => (
            "dict_reverseitemiterator",
            map.borrow()
                .iter()
                .map(|(k, v)| Value::tuple(vec![k.value().clone(), v.clone()]))
                .collect(),
        ),
        other => {
            return Err(EvalError::type_error(format!(
                "'{}' object is not reversible",
                other.type_name()
            )))
        }
    };
    items.reverse();
    Ok(Value::iterator(ValueIter::from_vec(kind, items)))
}

pub(crate) fn builtin_sorted(ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let key = given(args.take_keyword("key"));
    let reverse = args.take_keyword("reverse").map(|r| r.truthy()).unwrap_or(false);
    let [iterable] = args.fixed("sorted", ["iterable"])?;
    let items = collect(ctx, &iterable)?;
    sort_values(ctx, items, key.as_ref(), reverse).map(Value::list)
}

fn extreme(ctx: &EvalContext, fname: &str, mut args: Args, op: OrderOp) -> Result<Value> {
    let key = given(args.take_keyword("key"));
    let default = args.take_keyword("default");
    args.no_keywords(fname)?;
    let items = match args.positional.len() {
        0 => {
            return Err(EvalError::type_error(format!(
                "{} expected at least 1 argument, got 0",
                fname
            )))
        }
        1 => collect(ctx, &args.positional[0])?,
        _ => {
            if default.is_some() {
                return Err(EvalError::type_error(format!(
                    "Cannot specify a default for {}() with multiple positional arguments",
                    fname
                )));
            }
            args.positional
        }
    };

    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let k = match &key {
            Some(func) => call_value(ctx, func, Args::positional(vec![item.clone()]))?,
            None => item.clone(),
        };
        let replace = match &best {
            None => true,
            Some((best_key, _)) => k.py_order(best_key, op)?,
        };
        if replace {
            best = Some((k, item));
        }
    }
    match (best, default) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(EvalError::value_error(format!(
            "{}() iterable argument is empty",
            fname
        ))),
    }
}

pub(crate) fn builtin_max(ctx: &EvalContext, args: Args) -> Result<Value> {
    extreme(ctx, "max", args, OrderOp::Gt)
}

pub(crate) fn builtin_min(ctx: &EvalContext, args: Args) -> Result<Value> {
    extreme(ctx, "min", args, OrderOp::Lt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(f: fn(&EvalContext, Args) -> Result<Value>, args: Vec<Value>) -> Result<Value> {
        f(&EvalContext::new(), Args::positional(args))
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().map(|n| Value::from(*n)).collect())
    }

    #[test]
    fn test_radix_literals() {
        assert_eq!(call(builtin_bin, vec![Value::from(10i64)]).unwrap().repr(), "'0b1010'");
        assert_eq!(call(builtin_hex, vec![Value::from(-255i64)]).unwrap().repr(), "'-0xff'");
        assert_eq!(call(builtin_oct, vec![Value::from(8i64)]).unwrap().repr(), "'0o10'");
        let err = call(builtin_hex, vec![Value::from(1.5)]).unwrap_err();
        assert_eq!(err.to_string(), "'float' object cannot be interpreted as an integer");
    }

    #[test]
    fn test_round() {
        let r = |args: Vec<Value>| call(builtin_round, args).unwrap().repr();
        assert_eq!(r(vec![Value::from(2.5)]), "2");
        assert_eq!(r(vec![Value::from(3.5)]), "4");
        assert_eq!(r(vec![Value::from(2.675), Value::from(2i64)]), "2.67");
        assert_eq!(r(vec![Value::from(1250i64), Value::from(-2i64)]), "1200");
        assert_eq!(r(vec![Value::from(1350i64), Value::from(-2i64)]), "1400");
        let d = Value::Decimal(Decimal::parse("1.25").unwrap());
        assert_eq!(r(vec![d, Value::from(1i64)]), "Decimal('1.2')");
    }

    #[test]
    fn test_pow_modular() {
        let p = |a: i64, b: i64, m: i64| {
            call(builtin_pow, vec![Value::from(a), Value::from(b), Value::from(m)])
        };
        assert_eq!(p(3, 4, 5).unwrap().repr(), "1");
        assert_eq!(p(3, -1, 7).unwrap().repr(), "5");
        assert_eq!(p(2, 3, -5).unwrap().repr(), "-2");
        assert_eq!(p(2, 3, 0).unwrap_err().to_string(), "pow() 3rd argument cannot be 0");
        assert_eq!(
            p(2, -1, 4).unwrap_err().to_string(),
            "base is not invertible for the given modulus"
        );
    }

    #[test]
    fn test_len_and_chr_ord() {
        assert_eq!(call(builtin_len, vec![Value::str("héllo")]).unwrap().repr(), "5");
        let err = call(builtin_len, vec![Value::from(1i64)]).unwrap_err();
        assert_eq!(err.to_string(), "object of type 'int' has no len()");
        assert_eq!(call(builtin_chr, vec![Value::from(65i64)]).unwrap().repr(), "'A'");
        assert_eq!(call(builtin_ord, vec![Value::str("가")]).unwrap().repr(), "44032");
    }

    #[test]
    fn test_min_max() {
        assert_eq!(call(builtin_max, vec![ints(&[3, 9, 2])]).unwrap().repr(), "9");
        assert_eq!(
            call(builtin_min, vec![Value::from(4i64), Value::from(1i64)]).unwrap().repr(),
            "1"
        );
        let err = call(builtin_max, vec![ints(&[])]).unwrap_err();
        assert_eq!(err.to_string(), "max() iterable argument is empty");

        let mut args = Args::positional(vec![ints(&[])]);
        args.keywords.insert("default".into(), Value::None);
        assert_eq!(builtin_min(&EvalContext::new(), args).unwrap().repr(), "None");
    }

    #[test]
    fn test_isinstance() {
        let yes = call(
            builtin_isinstance,
            vec![Value::Bool(true), Value::Type(PyType::Int)],
        )
        .unwrap();
        assert_eq!(yes.repr(), "True");
        let tuple = Value::tuple(vec![Value::Type(PyType::Str), Value::Type(PyType::Float)]);
        let no = call(builtin_isinstance, vec![Value::from(1i64), tuple]).unwrap();
        assert_eq!(no.repr(), "False");
    }

    #[test]
    fn test_reversed_range() {
        let ctx = EvalContext::new();
        let r = Value::Range(Range {
            start: 0,
            stop: 10,
            step: 3,
        });
        let rev = call(builtin_reversed, vec![r]).unwrap();
        assert_eq!(Value::list(collect(&ctx, &rev).unwrap()).repr(), "[9, 6, 3, 0]");
    }

    #[test]
    fn test_any_all() {
        assert_eq!(call(builtin_all, vec![ints(&[])]).unwrap().repr(), "True");
        assert_eq!(call(builtin_any, vec![ints(&[0, 0, 3])]).unwrap().repr(), "True");
        assert_eq!(call(builtin_all, vec![ints(&[1, 0])]).unwrap().repr(), "False");
    }
}
