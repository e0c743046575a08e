//! The `math` namespace
//!
//! Float results follow the native module's error model: a NaN produced
//! from non-NaN input is `ValueError("math domain error")`, an infinity
//! produced from finite input is `OverflowError("math range error")`
//! unless the function has a pole there.

use std::f64::consts::{E, PI, TAU};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::functions::float_to_int;
use super::numbers::ldexp;
use super::{builtin, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::ops::MAX_INT_BITS;
use crate::value::{collect, int_to_f64, Value};

fn domain_error() -> EvalError {
    EvalError::value_error("math domain error")
}

fn range_error() -> EvalError {
    EvalError::overflow("math range error")
}

/// Classify a float result computed from finite-or-not input `x`.
fn checked(x: f64, r: f64, pole: bool) -> Result<Value> {
    if r.is_nan() && !x.is_nan() {
        return Err(domain_error());
    }
    if r.is_infinite() && x.is_finite() {
        return Err(if pole { domain_error() } else { range_error() });
    }
    Ok(Value::Float(r))
}

macro_rules! float_fn {
    ($fn_name:ident, $py_name:literal, $f:expr) => {
        float_fn!($fn_name, $py_name, $f, false);
    };
    ($fn_name:ident, $py_name:literal, $f:expr, $pole:expr) => {
        fn $fn_name(_ctx: &EvalContext, args: Args) -> Result<Value> {
            let [x] = args.fixed($py_name, ["x"])?;
            let x = x.to_f64()?;
            let f: fn(f64) -> f64 = $f;
            checked(x, f(x), $pole)
        }
    };
}

float_fn!(math_acos, "acos", f64::acos);
float_fn!(math_acosh, "acosh", f64::acosh);
float_fn!(math_asin, "asin", f64::asin);
float_fn!(math_asinh, "asinh", f64::asinh);
float_fn!(math_atan, "atan", f64::atan);
float_fn!(math_atanh, "atanh", |x| if x.abs() >= 1.0 { f64::NAN } else { x.atanh() });
float_fn!(math_cos, "cos", f64::cos);
float_fn!(math_cosh, "cosh", f64::cosh);
float_fn!(math_exp, "exp", f64::exp);
float_fn!(math_expm1, "expm1", f64::exp_m1);
float_fn!(math_fabs, "fabs", f64::abs);
float_fn!(math_sin, "sin", f64::sin);
float_fn!(math_sinh, "sinh", f64::sinh);
float_fn!(math_sqrt, "sqrt", f64::sqrt);
float_fn!(math_tan, "tan", f64::tan);
float_fn!(math_tanh, "tanh", f64::tanh);
float_fn!(math_degrees, "degrees", f64::to_degrees);
float_fn!(math_radians, "radians", f64::to_radians);
float_fn!(math_erf, "erf", erf);
float_fn!(math_erfc, "erfc", erfc);
float_fn!(math_log1p, "log1p", |x| if x <= -1.0 { f64::NAN } else { x.ln_1p() });

fn math_gamma(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("gamma", ["x"])?;
    gamma(x.to_f64()?).map(Value::Float)
}

fn math_lgamma(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("lgamma", ["x"])?;
    lgamma(x.to_f64()?).map(Value::Float)
}

// ═══════════════════════════════════════════════════════════════════════
// Logarithms
// ═══════════════════════════════════════════════════════════════════════

/// Logarithm in the base implied by `f`, exact for ints beyond float range.
fn log_of(value: &Value, f: fn(f64) -> f64) -> Result<f64> {
    if let Value::Int(n) = value {
        if !n.is_positive() {
            return Err(domain_error());
        }
        if int_to_f64(n).is_err() {
            let shift = n.bits() - 64;
            let head = int_to_f64(&(n >> shift))?;
            return Ok(f(head) + shift as f64 * f(2.0));
        }
    }
    let x = value.to_f64()?;
    if x.is_nan() {
        return Ok(x);
    }
    if x <= 0.0 {
        return Err(domain_error());
    }
    Ok(f(x))
}

fn math_log(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([x], [base]) = args.bind("log", ["x"], ["base"])?;
    let num = log_of(&x, f64::ln)?;
    match base {
        None => Ok(Value::Float(num)),
        Some(base) => {
            let den = log_of(&base, f64::ln)?;
            if den == 0.0 {
                return Err(EvalError::zero_division("float division by zero"));
            }
            Ok(Value::Float(num / den))
        }
    }
}

fn math_log2(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("log2", ["x"])?;
    log_of(&x, f64::log2).map(Value::Float)
}

fn math_log10(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("log10", ["x"])?;
    log_of(&x, f64::log10).map(Value::Float)
}

// ═══════════════════════════════════════════════════════════════════════
// Rounding to integers
// ═══════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum Rounding {
    Floor,
    Ceil,
    Trunc,
}

fn to_integer(value: &Value, mode: Rounding) -> Result<Value> {
    match value {
        Value::Bool(_) | Value::Int(_) => Ok(Value::Int(value.to_index()?)),
        Value::Float(f) => {
            let r = match mode {
                Rounding::Floor => f.floor(),
                Rounding::Ceil => f.ceil(),
                Rounding::Trunc => f.trunc(),
            };
            float_to_int(r).map(Value::Int)
        }
        Value::Decimal(d) => {
            let truncated = d.to_bigint()?;
            if d.is_integral() {
                return Ok(Value::Int(truncated));
            }
            let adjusted = match mode {
                Rounding::Floor if d.is_negative() => truncated - 1,
                Rounding::Ceil if !d.is_negative() => truncated + 1,
                _ => truncated,
            };
            Ok(Value::Int(adjusted))
        }
        other => Err(EvalError::type_error(format!(
            "must be real number, not {}",
            other.type_name()
        ))),
    }
}

fn math_floor(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("floor", ["x"])?;
    to_integer(&x, Rounding::Floor)
}

fn math_ceil(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("ceil", ["x"])?;
    to_integer(&x, Rounding::Ceil)
}

fn math_trunc(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("trunc", ["x"])?;
    to_integer(&x, Rounding::Trunc)
}

// ═══════════════════════════════════════════════════════════════════════
// Two-argument and variadic float functions
// ═══════════════════════════════════════════════════════════════════════

fn math_atan2(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [y, x] = args.fixed("atan2", ["y", "x"])?;
    Ok(Value::Float(y.to_f64()?.atan2(x.to_f64()?)))
}

fn math_copysign(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x, y] = args.fixed("copysign", ["x", "y"])?;
    Ok(Value::Float(x.to_f64()?.copysign(y.to_f64()?)))
}

fn math_fmod(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x, y] = args.fixed("fmod", ["x", "y"])?;
    let (x, y) = (x.to_f64()?, y.to_f64()?);
    if y.is_infinite() && x.is_finite() {
        return Ok(Value::Float(x));
    }
    if (y == 0.0 || x.is_infinite()) && !x.is_nan() && !y.is_nan() {
        return Err(domain_error());
    }
    Ok(Value::Float(x % y))
}

fn math_pow(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x, y] = args.fixed("pow", ["x", "y"])?;
    let (x, y) = (x.to_f64()?, y.to_f64()?);
    let r = x.powf(y);
    if r.is_nan() && !x.is_nan() && !y.is_nan() {
        return Err(domain_error());
    }
    if r.is_infinite() && x.is_finite() && y.is_finite() {
        return Err(if x == 0.0 { domain_error() } else { range_error() });
    }
    Ok(Value::Float(r))
}

fn math_hypot(_ctx: &EvalContext, args: Args) -> Result<Value> {
    args.no_keywords("hypot")?;
    let coords = args
        .positional
        .iter()
        .map(Value::to_f64)
        .collect::<Result<Vec<f64>>>()?;
    if coords.iter().any(|c| c.is_infinite()) {
        return Ok(Value::Float(f64::INFINITY));
    }
    let r = coords.iter().fold(0.0_f64, |acc, c| acc.hypot(*c));
    if r.is_infinite() {
        return Err(range_error());
    }
    Ok(Value::Float(r))
}

fn math_isclose(_ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let rel_tol = args.take_keyword("rel_tol").map_or(Ok(1e-9), |v| v.to_f64())?;
    let abs_tol = args.take_keyword("abs_tol").map_or(Ok(0.0), |v| v.to_f64())?;
    let [a, b] = args.fixed("isclose", ["a", "b"])?;
    let (a, b) = (a.to_f64()?, b.to_f64()?);
    if rel_tol < 0.0 || abs_tol < 0.0 {
        return Err(EvalError::value_error("tolerances must be non-negative"));
    }
    if a == b {
        return Ok(Value::Bool(true));
    }
    if a.is_infinite() || b.is_infinite() {
        return Ok(Value::Bool(false));
    }
    let diff = (b - a).abs();
    let close = diff <= (rel_tol * b).abs() || diff <= (rel_tol * a).abs() || diff <= abs_tol;
    Ok(Value::Bool(close))
}

fn math_isfinite(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("isfinite", ["x"])?;
    Ok(Value::Bool(x.to_f64()?.is_finite()))
}

fn math_isinf(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("isinf", ["x"])?;
    Ok(Value::Bool(x.to_f64()?.is_infinite()))
}

fn math_isnan(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("isnan", ["x"])?;
    Ok(Value::Bool(x.to_f64()?.is_nan()))
}

// ═══════════════════════════════════════════════════════════════════════
// Float decomposition
// ═══════════════════════════════════════════════════════════════════════

/// Mantissa in `[0.5, 1)` and exponent with `x == m * 2**e`.
fn frexp(x: f64) -> (f64, i64) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let (x, bias) = if x.abs() < f64::MIN_POSITIVE {
        (x * 2f64.powi(54), -54)
    } else {
        (x, 0)
    };
    let bits = x.to_bits();
    let exp = ((bits >> 52) & 0x7ff) as i64 - 1022;
    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (1022 << 52));
    (mantissa, exp + bias)
}

fn math_frexp(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("frexp", ["x"])?;
    let (m, e) = frexp(x.to_f64()?);
    Ok(Value::tuple(vec![Value::Float(m), Value::from(e)]))
}

fn math_ldexp(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x, i] = args.fixed("ldexp", ["x", "i"])?;
    let x = x.to_f64()?;
    let exp = match &i {
        Value::Bool(_) | Value::Int(_) => {
            let n = i.to_index()?;
            n.clamp(BigInt::from(-100_000), BigInt::from(100_000))
                .to_i64()
                .unwrap_or(0)
        }
        other => {
            return Err(EvalError::type_error(format!(
                "Expected an int as second argument to ldexp, not {}",
                other.type_name()
            )))
        }
    };
    checked(x, ldexp(x, exp), false)
}

fn math_modf(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("modf", ["x"])?;
    let x = x.to_f64()?;
    let (frac, whole) = if x.is_infinite() {
        (0.0_f64.copysign(x), x)
    } else {
        (x.fract(), x.trunc())
    };
    Ok(Value::tuple(vec![Value::Float(frac), Value::Float(whole)]))
}

// ═══════════════════════════════════════════════════════════════════════
// Exact summation
// ═══════════════════════════════════════════════════════════════════════

/// Shewchuk's exact summation, rounded once at the end.
fn fsum(values: &[f64]) -> Result<f64> {
    let mut partials: Vec<f64> = Vec::new();
    let mut special = 0.0_f64;
    let mut infinities = 0.0_f64;
    for &value in values {
        if !value.is_finite() {
            infinities += value;
            special += value;
            continue;
        }
        let mut x = value;
        let mut kept = 0;
        for j in 0..partials.len() {
            let mut y = partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            let lo = y - (hi - x);
            if lo != 0.0 {
                partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        if !x.is_finite() {
            return Err(EvalError::overflow("intermediate overflow in fsum"));
        }
        partials.truncate(kept);
        partials.push(x);
    }
    if special != 0.0 || infinities.is_nan() {
        if infinities.is_nan() {
            return Err(EvalError::value_error("-inf + inf in fsum"));
        }
        return Ok(special);
    }

    let mut n = partials.len();
    if n == 0 {
        return Ok(0.0);
    }
    n -= 1;
    let mut hi = partials[n];
    let mut lo = 0.0;
    while n > 0 {
        let x = hi;
        n -= 1;
        let y = partials[n];
        hi = x + y;
        lo = y - (hi - x);
        if lo != 0.0 {
            break;
        }
    }
    if n > 0 && ((lo < 0.0 && partials[n - 1] < 0.0) || (lo > 0.0 && partials[n - 1] > 0.0)) {
        let y = lo * 2.0;
        let x = hi + y;
        if y == x - hi {
            hi = x;
        }
    }
    Ok(hi)
}

fn math_fsum(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [iterable] = args.fixed("fsum", ["seq"])?;
    let values = collect(ctx, &iterable)?
        .iter()
        .map(Value::to_f64)
        .collect::<Result<Vec<f64>>>()?;
    fsum(&values).map(Value::Float)
}

// ═══════════════════════════════════════════════════════════════════════
// Integer functions
// ═══════════════════════════════════════════════════════════════════════

fn math_factorial(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [n] = args.fixed("factorial", ["n"])?;
    if matches!(n, Value::Float(_)) {
        return Err(EvalError::type_error(
            "'float' object cannot be interpreted as an integer",
        ));
    }
    let n = n.to_index()?;
    if n.is_negative() {
        return Err(EvalError::value_error(
            "factorial() not defined for negative values",
        ));
    }
    let mut result = BigInt::one();
    let mut k = BigInt::from(2);
    while k <= n {
        if result.bits() > MAX_INT_BITS {
            return Err(EvalError::overflow(format!(
                "integer result would exceed {} bits",
                MAX_INT_BITS
            )));
        }
        if (&k % 4096u32).is_zero() {
            ctx.check_interrupt()?;
        }
        result *= &k;
        k += 1;
    }
    Ok(Value::Int(result))
}

fn math_gcd(_ctx: &EvalContext, args: Args) -> Result<Value> {
    args.no_keywords("gcd")?;
    let mut acc = BigInt::zero();
    for value in &args.positional {
        let n = match value {
            Value::Bool(_) | Value::Int(_) | Value::Decimal(_) => value.to_index()?,
            other => {
                return Err(EvalError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    other.type_name()
                )))
            }
        };
        acc = acc.gcd(&n);
    }
    Ok(Value::Int(acc))
}

// ═══════════════════════════════════════════════════════════════════════
// Special functions
// ═══════════════════════════════════════════════════════════════════════

const SQRT_PI: f64 = 1.772_453_850_905_516;
const ERF_SERIES_CUTOFF: f64 = 1.5;
const ERF_SERIES_TERMS: usize = 25;
const ERFC_CONTFRAC_CUTOFF: f64 = 30.0;
const ERFC_CONTFRAC_TERMS: usize = 50;

fn erf_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut acc = 0.0;
    let mut fk = ERF_SERIES_TERMS as f64 + 0.5;
    for _ in 0..ERF_SERIES_TERMS {
        acc = 2.0 + x2 * acc / fk;
        fk -= 1.0;
    }
    acc * x * (-x2).exp() / SQRT_PI
}

fn erfc_contfrac(x: f64) -> f64 {
    if x >= ERFC_CONTFRAC_CUTOFF {
        return 0.0;
    }
    let x2 = x * x;
    let (mut a, mut da) = (0.0, 0.5);
    let (mut p, mut p_last) = (1.0, 0.0);
    let (mut q, mut q_last) = (da + x2, 1.0);
    for _ in 0..ERFC_CONTFRAC_TERMS {
        a += da;
        da += 2.0;
        let b = da + x2;
        (p, p_last) = (b * p - a * p_last, p);
        (q, q_last) = (b * q - a * q_last, q);
    }
    p / q * x * (-x2).exp() / SQRT_PI
}

/// Error function: power series near zero, continued fraction in the tails.
pub(crate) fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }
    if x.abs() < ERF_SERIES_CUTOFF {
        return erf_series(x);
    }
    let cf = erfc_contfrac(x.abs());
    if x > 0.0 {
        1.0 - cf
    } else {
        cf - 1.0
    }
}

/// Complementary error function.
pub(crate) fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }
    if x.abs() < ERF_SERIES_CUTOFF {
        return 1.0 - erf_series(x);
    }
    let cf = erfc_contfrac(x.abs());
    if x > 0.0 {
        cf
    } else {
        2.0 - cf
    }
}

const LANCZOS_G: f64 = 6.024_680_040_776_729_583_740_234_375;
const LANCZOS_G_MINUS_HALF: f64 = 5.524_680_040_776_729_583_740_234_375;
const LANCZOS_NUM: [f64; 13] = [
    23531376880.410759688572007674451636754734846804940,
    42919803642.649098768957899047001988850926355848959,
    35711959237.355668049440185451547166705960488635843,
    17921034426.037209699919755754458931112671403265390,
    6039542586.3520280050642916443072979210699388420708,
    1439720407.3117216736632230727949123939715485786772,
    248874557.86205415651146038641322942321632125127801,
    31426415.585400194380614231628318205362874684987640,
    2876370.6289353724412254090516208496135991145378768,
    186056.26539522349504029498971604569928220784236328,
    8071.6720023658162106380029022722506138218516325024,
    210.82427775157934587250973392071336271166969580291,
    2.5066282746310002701649081771338373386264310793408,
];
const LANCZOS_DEN: [f64; 13] = [
    0.0,
    39916800.0,
    120543840.0,
    150917976.0,
    105258076.0,
    45995730.0,
    13339535.0,
    2637558.0,
    357423.0,
    32670.0,
    1925.0,
    66.0,
    1.0,
];

fn lanczos_sum(x: f64) -> f64 {
    let (mut num, mut den) = (0.0, 0.0);
    if x < 5.0 {
        for i in (0..LANCZOS_NUM.len()).rev() {
            num = num * x + LANCZOS_NUM[i];
            den = den * x + LANCZOS_DEN[i];
        }
    } else {
        for i in 0..LANCZOS_NUM.len() {
            num = num / x + LANCZOS_NUM[i];
            den = den / x + LANCZOS_DEN[i];
        }
    }
    num / den
}

/// `sin(pi * x)`, exact at integers and half-integers.
fn sin_pi(x: f64) -> f64 {
    let y = x.abs() % 2.0;
    let r = match (2.0 * y).round() as i64 {
        0 => (PI * y).sin(),
        1 => (PI * (y - 0.5)).cos(),
        2 => (PI * (1.0 - y)).sin(),
        3 => -(PI * (y - 1.5)).cos(),
        _ => (PI * (y - 2.0)).sin(),
    };
    1.0_f64.copysign(x) * r
}

/// Gamma via the Lanczos approximation; exact factorials for small integers.
pub(crate) fn gamma(x: f64) -> Result<f64> {
    if !x.is_finite() {
        if x.is_nan() || x > 0.0 {
            return Ok(x);
        }
        return Err(domain_error());
    }
    if x == 0.0 {
        return Err(domain_error());
    }
    if x == x.floor() {
        if x < 0.0 {
            return Err(domain_error());
        }
        if x <= 23.0 {
            return Ok((1..x as u64).map(|k| k as f64).product());
        }
    }
    let absx = x.abs();
    if absx < 1e-20 {
        let r = 1.0 / x;
        return if r.is_infinite() { Err(range_error()) } else { Ok(r) };
    }
    if absx > 200.0 {
        if x < 0.0 {
            return Ok(0.0 / sin_pi(x));
        }
        return Err(range_error());
    }
    let y = absx + LANCZOS_G_MINUS_HALF;
    let z = if absx > LANCZOS_G_MINUS_HALF {
        let q = y - absx;
        q - LANCZOS_G_MINUS_HALF
    } else {
        let q = y - LANCZOS_G_MINUS_HALF;
        q - absx
    };
    let z = z * LANCZOS_G / y;
    let r = if x < 0.0 {
        let mut r = -PI / sin_pi(absx) / absx * y.exp() / lanczos_sum(absx);
        r -= z * r;
        if absx < 140.0 {
            r / y.powf(absx - 0.5)
        } else {
            let half = y.powf(absx / 2.0 - 0.25);
            r / half / half
        }
    } else {
        let mut r = lanczos_sum(absx) / y.exp();
        r += z * r;
        if absx < 140.0 {
            r * y.powf(absx - 0.5)
        } else {
            let half = y.powf(absx / 2.0 - 0.25);
            r * half * half
        }
    };
    if r.is_infinite() {
        return Err(range_error());
    }
    Ok(r)
}

/// Natural log of `|gamma(x)|`.
pub(crate) fn lgamma(x: f64) -> Result<f64> {
    if !x.is_finite() {
        return Ok(if x.is_nan() { x } else { f64::INFINITY });
    }
    if x == x.floor() && x <= 2.0 {
        if x <= 0.0 {
            return Err(domain_error());
        }
        return Ok(0.0);
    }
    let absx = x.abs();
    if absx < 1e-20 {
        return Ok(-absx.ln());
    }
    let mut r = lanczos_sum(absx).ln() - LANCZOS_G;
    r += (absx - 0.5) * ((absx + LANCZOS_G - 0.5).ln() - 1.0);
    if x < 0.0 {
        r = PI.ln() - sin_pi(absx).abs().ln() - absx.ln() - r;
    }
    if r.is_infinite() {
        return Err(range_error());
    }
    Ok(r)
}

// ═══════════════════════════════════════════════════════════════════════
// Namespace
// ═══════════════════════════════════════════════════════════════════════

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    let func: fn(&EvalContext, Args) -> Result<Value> = match name {
        "pi" => return Some(Value::Float(PI)),
        "e" => return Some(Value::Float(E)),
        "tau" => return Some(Value::Float(TAU)),
        "inf" => return Some(Value::Float(f64::INFINITY)),
        "nan" => return Some(Value::Float(f64::NAN)),
        "acos" => math_acos,
        "acosh" => math_acosh,
        "asin" => math_asin,
        "asinh" => math_asinh,
        "atan" => math_atan,
        "atan2" => math_atan2,
        "atanh" => math_atanh,
        "ceil" => math_ceil,
        "copysign" => math_copysign,
        "cos" => math_cos,
        "cosh" => math_cosh,
        "degrees" => math_degrees,
        "erf" => math_erf,
        "erfc" => math_erfc,
        "exp" => math_exp,
        "expm1" => math_expm1,
        "fabs" => math_fabs,
        "factorial" => math_factorial,
        "floor" => math_floor,
        "fmod" => math_fmod,
        "frexp" => math_frexp,
        "fsum" => math_fsum,
        "gamma" => math_gamma,
        "gcd" => math_gcd,
        "hypot" => math_hypot,
        "isclose" => math_isclose,
        "isfinite" => math_isfinite,
        "isinf" => math_isinf,
        "isnan" => math_isnan,
        "ldexp" => math_ldexp,
        "lgamma" => math_lgamma,
        "log" => math_log,
        "log1p" => math_log1p,
        "log10" => math_log10,
        "log2" => math_log2,
        "modf" => math_modf,
        "pow" => math_pow,
        "radians" => math_radians,
        "sin" => math_sin,
        "sinh" => math_sinh,
        "sqrt" => math_sqrt,
        "tan" => math_tan,
        "tanh" => math_tanh,
        "trunc" => math_trunc,
        _ => return None,
    };
    Some(builtin(name, func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &'static str, args: Vec<Value>) -> Result<Value> {
        let ctx = EvalContext::new();
        let Some(Value::Builtin(f)) = module_attr(name) else {
            panic!("math.{} is not a function", name);
        };
        f.call(&ctx, Args::positional(args))
    }

    fn float(name: &'static str, x: f64) -> f64 {
        match call(name, vec![Value::Float(x)]).unwrap() {
            Value::Float(r) => r,
            other => panic!("unexpected {}", other.repr()),
        }
    }

    #[test]
    fn test_domain_and_range_errors() {
        let err = call("sqrt", vec![Value::from(-1i64)]).unwrap_err();
        assert_eq!(err.to_string(), "math domain error");
        let err = call("exp", vec![Value::from(1000i64)]).unwrap_err();
        assert_eq!(err.to_string(), "math range error");
        let err = call("log", vec![Value::from(0i64)]).unwrap_err();
        assert_eq!(err.to_string(), "math domain error");
        assert!(float("sqrt", f64::NAN).is_nan());
    }

    #[test]
    fn test_log_of_huge_int() {
        let huge = Value::Int(BigInt::from(10).pow(400));
        match call("log10", vec![huge]).unwrap() {
            Value::Float(r) => assert!((r - 400.0).abs() < 1e-9),
            other => panic!("unexpected {}", other.repr()),
        }
        assert_eq!(call("log2", vec![Value::from(8i64)]).unwrap().repr(), "3.0");
    }

    #[test]
    fn test_rounding_to_int() {
        assert_eq!(call("floor", vec![Value::Float(-2.5)]).unwrap().repr(), "-3");
        assert_eq!(call("ceil", vec![Value::Float(2.1)]).unwrap().repr(), "3");
        let d = Value::Decimal(crate::value::Decimal::parse("-2.5").unwrap());
        assert_eq!(call("ceil", vec![d.clone()]).unwrap().repr(), "-2");
        assert_eq!(call("floor", vec![d]).unwrap().repr(), "-3");
        let err = call("floor", vec![Value::Float(f64::INFINITY)]).unwrap_err();
        assert_eq!(err.category(), "OverflowError");
    }

    #[test]
    fn test_special_functions() {
        assert!((erf(0.5) - 0.520_499_877_813_046_5).abs() < 1e-15);
        assert!((erfc(2.0) - 0.004_677_734_981_047_266).abs() < 1e-15);
        assert_eq!(gamma(5.0).unwrap(), 24.0);
        assert!((gamma(0.5).unwrap() - SQRT_PI).abs() < 1e-14);
        assert!((lgamma(10.0).unwrap() - 12.801_827_480_081_469).abs() < 1e-12);
        assert!((gamma(3.7).unwrap() - 4.170_651_783_796_603).abs() < 1e-14);
        assert!((gamma(10.5).unwrap() / 1_133_278.388_948_785_4 - 1.0).abs() < 1e-15);
        assert!((lgamma(0.5).unwrap() - 0.572_364_942_924_700_4).abs() < 1e-15);
        assert!((lgamma(2.5).unwrap() - 0.284_682_870_472_919_6).abs() < 1e-15);
        assert_eq!(gamma(-1.0).unwrap_err().to_string(), "math domain error");
        assert_eq!(gamma(500.0).unwrap_err().to_string(), "math range error");
    }

    #[test]
    fn test_fsum_is_exact() {
        let values = vec![0.1; 10];
        assert_eq!(fsum(&values).unwrap(), 1.0);
        assert_eq!(fsum(&[1e100, 1.0, -1e100]).unwrap(), 1.0);
        assert_eq!(
            fsum(&[f64::INFINITY, f64::NEG_INFINITY]).unwrap_err().to_string(),
            "-inf + inf in fsum"
        );
    }

    #[test]
    fn test_factorial_and_gcd() {
        assert_eq!(call("factorial", vec![Value::from(20i64)]).unwrap().repr(), "2432902008176640000");
        let err = call("factorial", vec![Value::from(-1i64)]).unwrap_err();
        assert_eq!(err.to_string(), "factorial() not defined for negative values");
        let gcd = call("gcd", vec![Value::from(12i64), Value::from(-18i64)]).unwrap();
        assert_eq!(gcd.repr(), "6");
    }

    #[test]
    fn test_frexp_and_isclose() {
        assert_eq!(frexp(8.0), (0.5, 4));
        assert_eq!(frexp(-0.75), (-0.75, 0));
        let close = call("isclose", vec![Value::Float(1.0), Value::Float(1.0 + 1e-10)]).unwrap();
        assert_eq!(close.repr(), "True");
    }
}
