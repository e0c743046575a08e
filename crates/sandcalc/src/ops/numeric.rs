//! Numeric tower arithmetic
//!
//! Operands are promoted along `bool < int < float < complex`. A precision
//! decimal absorbs `int`, `bool` and `float` operands (floats convert
//! exactly from their binary value) and rejects `complex`.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::{BinaryOp, MAX_INT_BITS};
use crate::error::{EvalError, Result};
use crate::value::{int_to_f64, Complex, Decimal, Value};

/// A numeric operand after unwrapping `bool`.
#[derive(Debug, Clone)]
pub(crate) enum Num {
    Int(BigInt),
    Float(f64),
    Complex(Complex),
    Decimal(Decimal),
}

impl Num {
    pub(crate) fn from_value(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(BigInt::from(*b as u8))),
            Value::Int(n) => Some(Num::Int(n.clone())),
            Value::Float(f) => Some(Num::Float(*f)),
            Value::Complex(c) => Some(Num::Complex(*c)),
            Value::Decimal(d) => Some(Num::Decimal(d.clone())),
            _ => None,
        }
    }

    fn to_f64(&self) -> Result<f64> {
        match self {
            Num::Int(n) => int_to_f64(n),
            Num::Float(f) => Ok(*f),
            Num::Decimal(d) => Ok(d.to_f64()),
            Num::Complex(c) => Ok(c.re),
        }
    }

    fn to_complex(&self) -> Result<Complex> {
        match self {
            Num::Complex(c) => Ok(*c),
            other => Ok(Complex::new(other.to_f64()?, 0.0)),
        }
    }

    fn to_decimal(&self) -> Decimal {
        match self {
            Num::Int(n) => Decimal::from_bigint(n),
            Num::Float(f) => Decimal::from_f64(*f),
            Num::Decimal(d) => d.clone(),
            Num::Complex(c) => Decimal::from_f64(c.re),
        }
    }
}

/// Operands promoted to a common representation.
enum Pair {
    Int(BigInt, BigInt),
    Float(f64, f64),
    Complex(Complex, Complex),
    Decimal(Decimal, Decimal),
}

fn promote(a: &Num, b: &Num) -> Result<Option<Pair>> {
    Ok(Some(match (a, b) {
        (Num::Decimal(_), Num::Complex(_)) | (Num::Complex(_), Num::Decimal(_)) => return Ok(None),
        (Num::Decimal(_), _) | (_, Num::Decimal(_)) => Pair::Decimal(a.to_decimal(), b.to_decimal()),
        (Num::Complex(_), _) | (_, Num::Complex(_)) => Pair::Complex(a.to_complex()?, b.to_complex()?),
        (Num::Float(_), _) | (_, Num::Float(_)) => Pair::Float(a.to_f64()?, b.to_f64()?),
        (Num::Int(x), Num::Int(y)) => Pair::Int(x.clone(), y.clone()),
    }))
}

pub(crate) fn unsupported(op: &str, a: &Value, b: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        a.type_name(),
        b.type_name()
    ))
}

/// Apply a binary operator to two numbers.
///
/// Returns `None` when either operand is not a number, so the caller can
/// try sequence, set and calendar rules next.
pub(crate) fn arith(op: BinaryOp, a: &Value, b: &Value) -> Option<Result<Value>> {
    let (x, y) = (Num::from_value(a)?, Num::from_value(b)?);

    if let (Value::Bool(p), Value::Bool(q)) = (a, b) {
        match op {
            BinaryOp::BitAnd => return Some(Ok(Value::Bool(p & q))),
            BinaryOp::BitOr => return Some(Ok(Value::Bool(p | q))),
            BinaryOp::BitXor => return Some(Ok(Value::Bool(p ^ q))),
            _ => {}
        }
    }

    let pair = match promote(&x, &y) {
        Ok(Some(pair)) => pair,
        Ok(None) => return Some(Err(unsupported(op.symbol(), a, b))),
        Err(e) => return Some(Err(e)),
    };
    Some(match pair {
        Pair::Int(x, y) => int_op(op, x, y),
        Pair::Float(x, y) => float_op(op, x, y),
        Pair::Complex(x, y) => complex_op(op, x, y),
        Pair::Decimal(x, y) => decimal_op(op, &x, &y),
    }
    .map_err(|e| match e {
        EvalError::Type { .. } => unsupported(op.symbol(), a, b),
        other => other,
    }))
}

fn type_mismatch() -> EvalError {
    EvalError::type_error("unsupported operand")
}

// ═══════════════════════════════════════════════════════════════════════
// int
// ═══════════════════════════════════════════════════════════════════════

fn check_bits(bits: u64) -> Result<()> {
    if bits > MAX_INT_BITS {
        Err(EvalError::overflow(format!(
            "integer result would exceed {} bits",
            MAX_INT_BITS
        )))
    } else {
        Ok(())
    }
}

fn int_op(op: BinaryOp, x: BigInt, y: BigInt) -> Result<Value> {
    Ok(Value::Int(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => {
            if !x.is_zero() && !y.is_zero() {
                check_bits(x.bits() + y.bits())?;
            }
            x * y
        }
        BinaryOp::Div => return int_true_div(&x, &y).map(Value::Float),
        BinaryOp::FloorDiv => {
            if y.is_zero() {
                return Err(int_zero_division());
            }
            x.div_floor(&y)
        }
        BinaryOp::Mod => {
            if y.is_zero() {
                return Err(int_zero_division());
            }
            x.mod_floor(&y)
        }
        BinaryOp::Pow => return int_pow(&x, &y),
        BinaryOp::LShift => {
            let shift = shift_count(&y)?;
            if x.is_zero() {
                return Ok(Value::Int(x));
            }
            let shift = shift.ok_or_else(|| EvalError::overflow("too many digits in integer"))?;
            check_bits(x.bits() + shift as u64)?;
            x << shift
        }
        BinaryOp::RShift => match shift_count(&y)? {
            Some(shift) => x >> shift,
            None if x.is_negative() => BigInt::from(-1),
            None => BigInt::zero(),
        },
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::MatMul => return Err(type_mismatch()),
    }))
}

fn int_zero_division() -> EvalError {
    EvalError::zero_division("integer division or modulo by zero")
}

fn shift_count(y: &BigInt) -> Result<Option<usize>> {
    if y.is_negative() {
        return Err(EvalError::value_error("negative shift count"));
    }
    Ok(y.to_usize())
}

/// Correctly rounded `int / int`.
pub(crate) fn int_true_div(x: &BigInt, y: &BigInt) -> Result<f64> {
    if y.is_zero() {
        return Err(EvalError::zero_division("division by zero"));
    }
    const EXACT: u64 = 1 << 53;
    if let (Some(a), Some(b)) = (x.to_i64(), y.to_i64()) {
        if a.unsigned_abs() <= EXACT && b.unsigned_abs() <= EXACT {
            return Ok(a as f64 / b as f64);
        }
    }
    if x.is_zero() {
        return Ok(if y.is_negative() { -0.0 } else { 0.0 });
    }
    let negative = x.is_negative() != y.is_negative();
    let (n, d) = (x.abs(), y.abs());

    // Scale so the integer quotient carries 55 or 56 significant bits.
    let shift = 55 - (n.bits() as i64 - d.bits() as i64);
    let (num, den) = if shift >= 0 {
        (n << shift as usize, d)
    } else {
        (n, d << (-shift) as usize)
    };
    let (q, r) = num.div_rem(&den);
    let extra = q.bits().saturating_sub(53) as usize;
    let mut mantissa = &q >> extra;
    if extra > 0 {
        let low = &q - (&mantissa << extra);
        let half = BigInt::one() << (extra - 1);
        let odd = (&mantissa & BigInt::one()).is_one();
        if low > half || (low == half && (!r.is_zero() || odd)) {
            mantissa += 1;
        }
    }
    let mantissa = mantissa.to_f64().unwrap_or(f64::INFINITY);
    let result = scale_pow2(mantissa, extra as i64 - shift);
    if result.is_infinite() {
        return Err(EvalError::overflow(
            "integer division result too large for a float",
        ));
    }
    Ok(if negative { -result } else { result })
}

fn scale_pow2(mut value: f64, mut exp: i64) -> f64 {
    while exp > 1000 {
        value *= 2f64.powi(1000);
        exp -= 1000;
    }
    while exp < -1000 {
        value *= 2f64.powi(-1000);
        exp += 1000;
    }
    value * 2f64.powi(exp as i32)
}

fn int_pow(x: &BigInt, y: &BigInt) -> Result<Value> {
    if y.is_negative() {
        let base = int_to_f64(x)?;
        let exp = int_to_f64(y)?;
        return float_op(BinaryOp::Pow, base, exp);
    }
    if x.is_zero() || x.is_one() {
        return Ok(Value::Int(if y.is_zero() { BigInt::one() } else { x.clone() }));
    }
    if *x == BigInt::from(-1) {
        let odd = (y & BigInt::one()).is_one();
        return Ok(Value::from(if odd { -1i64 } else { 1 }));
    }
    let exp = y
        .to_u32()
        .filter(|e| (x.bits() - 1).saturating_mul(*e as u64) <= MAX_INT_BITS)
        .ok_or_else(|| {
            EvalError::overflow(format!(
                "integer result would exceed {} bits",
                MAX_INT_BITS
            ))
        })?;
    Ok(Value::Int(x.pow(exp)))
}

// ═══════════════════════════════════════════════════════════════════════
// float
// ═══════════════════════════════════════════════════════════════════════

/// Floor division and modulo with the native float sign rules.
pub(crate) fn float_divmod(x: f64, y: f64) -> (f64, f64) {
    let mut rem = x % y;
    let mut div = (x - rem) / y;
    if rem != 0.0 {
        if (y < 0.0) != (rem < 0.0) {
            rem += y;
            div -= 1.0;
        }
    } else {
        rem = 0.0f64.copysign(y);
    }
    let floor = if div != 0.0 {
        let mut f = div.floor();
        if div - f > 0.5 {
            f += 1.0;
        }
        f
    } else {
        0.0f64.copysign(x / y)
    };
    (floor, rem)
}

fn float_op(op: BinaryOp, x: f64, y: f64) -> Result<Value> {
    Ok(Value::Float(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float division by zero"));
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float floor division by zero"));
            }
            float_divmod(x, y).0
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float modulo"));
            }
            float_divmod(x, y).1
        }
        BinaryOp::Pow => return float_pow(x, y),
        _ => return Err(type_mismatch()),
    }))
}

pub(crate) fn float_pow(x: f64, y: f64) -> Result<Value> {
    if y == 0.0 {
        return Ok(Value::Float(1.0));
    }
    if x == 0.0 && y < 0.0 {
        return Err(EvalError::zero_division(
            "0.0 cannot be raised to a negative power",
        ));
    }
    if x < 0.0 && y.is_finite() && y.fract() != 0.0 {
        return Complex::new(x, 0.0)
            .pow(Complex::new(y, 0.0))
            .map(Value::Complex);
    }
    let result = x.powf(y);
    if result.is_infinite() && x.is_finite() && y.is_finite() {
        return Err(EvalError::overflow("(34, 'Numerical result out of range')"));
    }
    Ok(Value::Float(result))
}

// ═══════════════════════════════════════════════════════════════════════
// complex and decimal
// ═══════════════════════════════════════════════════════════════════════

fn complex_op(op: BinaryOp, x: Complex, y: Complex) -> Result<Value> {
    Ok(Value::Complex(match op {
        BinaryOp::Add => x.add(y),
        BinaryOp::Sub => x.sub(y),
        BinaryOp::Mul => x.mul(y),
        BinaryOp::Div => x.div(y)?,
        BinaryOp::Pow => x.pow(y)?,
        _ => return Err(type_mismatch()),
    }))
}

fn decimal_op(op: BinaryOp, x: &Decimal, y: &Decimal) -> Result<Value> {
    Ok(Value::Decimal(match op {
        BinaryOp::Add => x.add(y)?,
        BinaryOp::Sub => x.sub(y)?,
        BinaryOp::Mul => x.mul(y)?,
        BinaryOp::Div => x.div(y)?,
        BinaryOp::FloorDiv => x.floor_div(y)?,
        BinaryOp::Mod => x.rem(y)?,
        BinaryOp::Pow => x.pow(y)?,
        _ => return Err(type_mismatch()),
    }))
}

// ═══════════════════════════════════════════════════════════════════════
// Unary helpers
// ═══════════════════════════════════════════════════════════════════════

/// `divmod(a, b)` for real numbers.
pub(crate) fn divmod(a: &Value, b: &Value) -> Result<Value> {
    let (Some(x), Some(y)) = (Num::from_value(a), Num::from_value(b)) else {
        return Err(unsupported("divmod()", a, b));
    };
    match promote(&x, &y)? {
        Some(Pair::Int(x, y)) => {
            if y.is_zero() {
                return Err(int_zero_division());
            }
            let (q, r) = x.div_mod_floor(&y);
            Ok(Value::tuple(vec![Value::Int(q), Value::Int(r)]))
        }
        Some(Pair::Float(x, y)) => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float divmod()"));
            }
            let (q, r) = float_divmod(x, y);
            Ok(Value::tuple(vec![Value::Float(q), Value::Float(r)]))
        }
        Some(Pair::Decimal(x, y)) => {
            let (q, r) = x.divmod(&y)?;
            Ok(Value::tuple(vec![Value::Decimal(q), Value::Decimal(r)]))
        }
        _ => Err(unsupported("divmod()", a, b)),
    }
}

/// `abs(x)` for numbers.
pub(crate) fn abs(value: &Value) -> Option<Result<Value>> {
    Some(Ok(match value {
        Value::Bool(b) => Value::from(*b as i64),
        Value::Int(n) => Value::Int(n.abs()),
        Value::Float(f) => Value::Float(f.abs()),
        Value::Complex(c) => Value::Float(c.abs()),
        Value::Decimal(d) => return Some(d.abs().map(Value::Decimal)),
        _ => return None,
    }))
}

/// Sign of an integer as -1, 0 or 1.
pub(crate) fn int_sign(n: &BigInt) -> i32 {
    match n.sign() {
        Sign::Minus => -1,
        Sign::NoSign => 0,
        Sign::Plus => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(op: BinaryOp, a: Value, b: Value) -> Result<Value> {
        arith(op, &a, &b).unwrap_or_else(|| Err(EvalError::type_error("not numeric")))
    }

    fn repr(op: BinaryOp, a: Value, b: Value) -> String {
        run(op, a, b).unwrap().repr()
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::parse(s).unwrap())
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(repr(BinaryOp::FloorDiv, Value::from(-7i64), Value::from(2i64)), "-4");
        assert_eq!(repr(BinaryOp::Mod, Value::from(-7i64), Value::from(2i64)), "1");
        assert_eq!(repr(BinaryOp::Div, Value::from(1i64), Value::from(4i64)), "0.25");
        assert_eq!(repr(BinaryOp::Pow, Value::from(2i64), Value::from(-1i64)), "0.5");
        assert_eq!(repr(BinaryOp::Pow, Value::from(2i64), Value::from(100i64)), "1267650600228229401496703205376");
        assert_eq!(repr(BinaryOp::RShift, Value::from(-1i64), Value::from(5i64)), "-1");
        assert_eq!(repr(BinaryOp::BitAnd, Value::Bool(true), Value::Bool(false)), "False");
        assert_eq!(repr(BinaryOp::Add, Value::Bool(true), Value::Bool(true)), "2");
    }

    #[test]
    fn test_big_int_true_division() {
        let big = BigInt::from(10).pow(30u32);
        let out = run(BinaryOp::Div, Value::Int(big.clone() * 3), Value::Int(big)).unwrap();
        assert_eq!(out.repr(), "3.0");
        let third = run(
            BinaryOp::Div,
            Value::Int(BigInt::from(10).pow(25u32)),
            Value::Int(BigInt::from(3) * BigInt::from(10).pow(25u32)),
        )
        .unwrap();
        assert_eq!(third.repr(), "0.3333333333333333");
    }

    #[test]
    fn test_zero_division_messages() {
        let err = run(BinaryOp::Div, Value::from(1i64), Value::from(0i64)).unwrap_err();
        assert_eq!(err.to_string(), "division by zero");
        let err = run(BinaryOp::Mod, Value::from(1i64), Value::from(0i64)).unwrap_err();
        assert_eq!(err.to_string(), "integer division or modulo by zero");
        let err = run(BinaryOp::Div, Value::from(1.0), Value::from(0i64)).unwrap_err();
        assert_eq!(err.to_string(), "float division by zero");
        assert!(run(BinaryOp::Div, dec("1"), dec("0")).unwrap_err().is_zero_division());
    }

    #[test]
    fn test_float_sign_rules() {
        assert_eq!(repr(BinaryOp::Mod, Value::from(-1.0), Value::from(3.0)), "2.0");
        assert_eq!(repr(BinaryOp::FloorDiv, Value::from(7.5), Value::from(-2.0)), "-4.0");
        assert_eq!(repr(BinaryOp::Mod, Value::from(0.0), Value::from(-2.0)), "-0.0");
    }

    #[test]
    fn test_negative_base_fractional_power_is_complex() {
        let out = run(BinaryOp::Pow, Value::from(-8.0), Value::from(1.0 / 3.0)).unwrap();
        assert!(matches!(out, Value::Complex(_)));
    }

    #[test]
    fn test_decimal_absorbs_native_operands() {
        assert_eq!(repr(BinaryOp::Add, dec("0.1"), dec("0.2")), "Decimal('0.3')");
        assert_eq!(repr(BinaryOp::Mul, Value::from(3i64), dec("1.5")), "Decimal('4.5')");
        assert_eq!(repr(BinaryOp::Add, dec("1"), Value::from(0.5)), "Decimal('1.5')");
        let err = run(BinaryOp::Add, dec("1"), Value::Complex(Complex::new(0.0, 1.0))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for +: 'Decimal' and 'complex'"
        );
    }

    #[test]
    fn test_power_cap() {
        let err = run(BinaryOp::Pow, Value::from(10i64), Value::from(10_000_000i64)).unwrap_err();
        assert_eq!(err.category(), "OverflowError");
        let err = run(BinaryOp::LShift, Value::from(1i64), Value::from(2_000_000i64)).unwrap_err();
        assert_eq!(err.category(), "OverflowError");
    }

    #[test]
    fn test_divmod() {
        let out = divmod(&Value::from(-7i64), &Value::from(2i64)).unwrap();
        assert_eq!(out.repr(), "(-4, 1)");
        let out = divmod(&Value::from(7.0), &Value::from(2i64)).unwrap();
        assert_eq!(out.repr(), "(3.0, 1.0)");
    }
}
