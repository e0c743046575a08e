//! `int` and `float` methods, and text-to-number parsing

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use super::Args;
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::{check_len, collect, Complex, Value};

// ═══════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════

/// Drop `_` separators that sit between two digits; `None` if any other
/// underscore appears.
fn strip_separators(text: &str, is_digit: impl Fn(char) -> bool) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, c) in chars.iter().enumerate() {
        if *c == '_' {
            let before = i > 0 && is_digit(chars[i - 1]);
            let after = chars.get(i + 1).is_some_and(|n| is_digit(*n));
            if !(before && after) {
                return None;
            }
        } else {
            out.push(*c);
        }
    }
    Some(out)
}

/// Parse an integer literal the way `int(text, base)` does.
pub(crate) fn parse_int(text: &str, base: u32) -> Option<BigInt> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lower = body.to_ascii_lowercase();
    let prefixed = |p: &str| lower.strip_prefix(p).map(str::to_string);
    let (radix, digits) = match base {
        0 => {
            if let Some(rest) = prefixed("0x") {
                (16, rest)
            } else if let Some(rest) = prefixed("0o") {
                (8, rest)
            } else if let Some(rest) = prefixed("0b") {
                (2, rest)
            } else {
                let stripped = lower.trim_start_matches(['0', '_']);
                if !stripped.is_empty() && lower.starts_with('0') {
                    return None;
                }
                (10, lower.clone())
            }
        }
        16 => (16, prefixed("0x").unwrap_or_else(|| lower.clone())),
        8 => (8, prefixed("0o").unwrap_or_else(|| lower.clone())),
        2 => (2, prefixed("0b").unwrap_or_else(|| lower.clone())),
        b => (b, lower.clone()),
    };
    // a separator may directly follow the base prefix
    let digits = if digits.len() < lower.len() {
        digits.strip_prefix('_').map(str::to_string).unwrap_or(digits)
    } else {
        digits
    };
    if digits.is_empty() {
        return None;
    }
    let cleaned = strip_separators(&digits, |c| c.is_digit(radix))?;
    if !cleaned.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = BigInt::parse_bytes(cleaned.as_bytes(), radix)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a float literal the way `float(text)` does.
pub(crate) fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = strip_separators(trimmed, |c| c.is_ascii_digit())?;
    let word = cleaned.trim_start_matches(['+', '-']).to_ascii_lowercase();
    let is_word = matches!(word.as_str(), "inf" | "infinity" | "nan");
    let is_numeral = cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !(is_word || is_numeral) {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Parse `complex(text)`: `a`, `bj`, `a+bj`, optionally parenthesised.
pub(crate) fn parse_complex(text: &str) -> Option<Complex> {
    let mut s = text.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        s = inner.trim();
    }
    if s.is_empty() || s.contains(char::is_whitespace) {
        return None;
    }
    let Some(body) = s.strip_suffix(['j', 'J']) else {
        return parse_float(s).map(|re| Complex::new(re, 0.0));
    };
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'));
    let imag_of = |part: &str| match part {
        "" | "+" => Some(1.0),
        "-" => Some(-1.0),
        other => parse_float(other),
    };
    match split {
        Some(i) => Some(Complex::new(parse_float(&body[..i])?, imag_of(&body[i..])?)),
        None => Some(Complex::new(0.0, imag_of(body)?)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Float helpers
// ═══════════════════════════════════════════════════════════════════════

/// `x * 2**exp` without intermediate overflow.
pub(crate) fn ldexp(mut x: f64, mut exp: i64) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    while exp > 1000 {
        x *= 2f64.powi(1000);
        exp -= 1000;
        if x.is_infinite() {
            return x;
        }
    }
    while exp < -1000 {
        x *= 2f64.powi(-1000);
        exp += 1000;
        if x == 0.0 {
            return x;
        }
    }
    x * 2f64.powi(exp as i32)
}

/// Decompose a finite float into `mantissa * 2**exp` with an odd (or
/// zero) mantissa.
fn decompose(f: f64) -> (bool, u64, i64) {
    let bits = f.to_bits();
    let negative = bits >> 63 == 1;
    let exp_bits = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mut mantissa, mut exp) = if exp_bits == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), exp_bits - 1075)
    };
    if mantissa == 0 {
        return (negative, 0, 0);
    }
    let shift = mantissa.trailing_zeros();
    mantissa >>= shift;
    exp += shift as i64;
    (negative, mantissa, exp)
}

fn float_as_integer_ratio(f: f64) -> Result<Value> {
    if f.is_nan() {
        return Err(EvalError::value_error("cannot convert NaN to integer ratio"));
    }
    if f.is_infinite() {
        return Err(EvalError::overflow("cannot convert Infinity to integer ratio"));
    }
    let (negative, mantissa, exp) = decompose(f);
    let mut numerator = BigInt::from(mantissa);
    let mut denominator = BigInt::from(1u8);
    if exp >= 0 {
        numerator <<= exp as usize;
    } else {
        denominator <<= (-exp) as usize;
    }
    if negative {
        numerator = -numerator;
    }
    Ok(Value::tuple(vec![Value::Int(numerator), Value::Int(denominator)]))
}

fn float_hex(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    let bits = f.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let exp_bits = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    if exp_bits == 0 && fraction == 0 {
        return format!("{}0x0.0p+0", sign);
    }
    let (lead, exp) = if exp_bits == 0 {
        (0, -1022)
    } else {
        (1, exp_bits - 1023)
    };
    let exp_sign = if exp < 0 { '-' } else { '+' };
    format!(
        "{}0x{}.{:013x}p{}{}",
        sign,
        lead,
        fraction,
        exp_sign,
        exp.abs()
    )
}

fn invalid_hex_float() -> EvalError {
    EvalError::value_error("invalid hexadecimal floating-point string")
}

/// `float.fromhex(text)`.
pub(crate) fn float_fromhex(text: &str) -> Result<f64> {
    let s = text.trim().to_ascii_lowercase();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s.as_str()),
    };
    let signed = |x: f64| if negative { -x } else { x };
    match body {
        "inf" | "infinity" => return Ok(signed(f64::INFINITY)),
        "nan" => return Ok(f64::NAN),
        _ => {}
    }
    let body = body.strip_prefix("0x").unwrap_or(body);
    let (mantissa_text, exp_text) = match body.find('p') {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };
    let (int_part, frac_part) = match mantissa_text.find('.') {
        Some(pos) => (&mantissa_text[..pos], &mantissa_text[pos + 1..]),
        None => (mantissa_text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid_hex_float());
    }
    let digits = format!("{}{}", int_part, frac_part);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid_hex_float());
    }
    let exp: i64 = match exp_text {
        Some(e) => e.parse().map_err(|_| invalid_hex_float())?,
        None => 0,
    };
    let mantissa = BigInt::parse_bytes(digits.as_bytes(), 16).ok_or_else(invalid_hex_float)?;
    let mut exp = exp
        .checked_sub(4 * frac_part.len() as i64)
        .ok_or_else(invalid_hex_float)?;

    // Keep 64 significant bits with a sticky bit so the final rounding is
    // done once by the hardware conversion.
    let bits = mantissa.bits();
    let mut top = mantissa.clone();
    if bits > 64 {
        let drop = bits - 64;
        let sticky = !(&mantissa & ((BigInt::from(1u8) << drop as usize) - 1u8)).is_zero();
        top = &mantissa >> drop as usize;
        if sticky {
            top |= BigInt::from(1u8);
        }
        exp += drop as i64;
    }
    let top = top.to_u64().ok_or_else(invalid_hex_float)?;
    let value = ldexp(top as f64, exp);
    if value.is_infinite() {
        return Err(EvalError::overflow(
            "hexadecimal value too large to represent as a float",
        ));
    }
    Ok(signed(value))
}

// ═══════════════════════════════════════════════════════════════════════
// Byte conversion
// ═══════════════════════════════════════════════════════════════════════

fn byteorder(value: Option<Value>) -> Result<bool> {
    match value {
        None => Ok(true),
        Some(Value::Str(s)) if &*s == "big" => Ok(true),
        Some(Value::Str(s)) if &*s == "little" => Ok(false),
        Some(Value::Str(_)) => Err(EvalError::value_error(
            "byteorder must be either 'little' or 'big'",
        )),
        Some(other) => Err(EvalError::type_error(format!(
            "to_bytes() argument 'byteorder' must be str, not {}",
            other.type_name()
        ))),
    }
}

fn int_to_bytes(n: &BigInt, mut args: Args) -> Result<Value> {
    let signed = args.take_keyword("signed").map(|v| v.truthy()).unwrap_or(false);
    let ([], [length, order]) = args.bind("to_bytes", [], ["length", "byteorder"])?;
    let length = match length {
        Some(l) => {
            let l = l.to_i64()?;
            if l < 0 {
                return Err(EvalError::value_error("length argument must be non-negative"));
            }
            l as usize
        }
        None => 1,
    };
    check_len(length)?;
    let big_endian = byteorder(order)?;
    if !signed && n.is_negative() {
        return Err(EvalError::overflow("can't convert negative int to unsigned"));
    }
    let mut raw = if signed {
        n.to_signed_bytes_be()
    } else if n.is_zero() {
        Vec::new()
    } else {
        n.to_bytes_be().1
    };
    if signed && n.is_zero() {
        raw.clear();
    }
    if raw.len() > length {
        return Err(EvalError::overflow("int too big to convert"));
    }
    let fill = if signed && n.is_negative() { 0xff } else { 0x00 };
    let mut out = vec![fill; length - raw.len()];
    out.extend(raw);
    if !big_endian {
        out.reverse();
    }
    Ok(Value::bytes(out))
}

/// `int.from_bytes(bytes, byteorder='big', *, signed=False)`.
pub(crate) fn int_from_bytes(ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let signed = args.take_keyword("signed").map(|v| v.truthy()).unwrap_or(false);
    let ([source], [order]) = args.bind("from_bytes", ["bytes"], ["byteorder"])?;
    let mut data: Vec<u8> = match &source {
        Value::Bytes(b) => b.to_vec(),
        other => collect(ctx, other)?
            .iter()
            .map(|v| {
                v.to_i64()
                    .ok()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| EvalError::value_error("bytes must be in range(0, 256)"))
            })
            .collect::<Result<_>>()?,
    };
    if !byteorder(order)? {
        data.reverse();
    }
    let n = if signed {
        BigInt::from_signed_bytes_be(&data)
    } else {
        BigInt::from_bytes_be(Sign::Plus, &data)
    };
    Ok(Value::Int(n))
}

// ═══════════════════════════════════════════════════════════════════════
// Method dispatch
// ═══════════════════════════════════════════════════════════════════════

pub(super) fn int_method(n: &BigInt, name: &str, args: Args) -> Result<Value> {
    match name {
        "bit_length" => {
            args.fixed("bit_length", [])?;
            Ok(Value::from(n.bits() as i64))
        }
        "to_bytes" => int_to_bytes(n, args),
        _ => Err(super::no_attribute(&Value::Int(n.clone()), name)),
    }
}

pub(super) fn float_method(f: f64, name: &str, args: Args) -> Result<Value> {
    match name {
        "as_integer_ratio" => {
            args.fixed("as_integer_ratio", [])?;
            float_as_integer_ratio(f)
        }
        "is_integer" => {
            args.fixed("is_integer", [])?;
            Ok(Value::Bool(f.is_finite() && f.fract() == 0.0))
        }
        "hex" => {
            args.fixed("hex", [])?;
            Ok(Value::from(float_hex(f)))
        }
        _ => Err(super::no_attribute(&Value::Float(f), name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 42 ", 10), Some(BigInt::from(42)));
        assert_eq!(parse_int("-0x_ff", 0), Some(BigInt::from(-255)));
        assert_eq!(parse_int("1_000", 10), Some(BigInt::from(1000)));
        assert_eq!(parse_int("z", 36), Some(BigInt::from(35)));
        assert_eq!(parse_int("010", 0), None);
        assert_eq!(parse_int("000", 0), Some(BigInt::from(0)));
        assert_eq!(parse_int("1__0", 10), None);
        assert_eq!(parse_int("12a", 10), None);
        assert_eq!(parse_int("", 10), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("1_000.5"), Some(1000.5));
        assert_eq!(parse_float(" -1e3 "), Some(-1000.0));
        assert_eq!(parse_float("Infinity"), Some(f64::INFINITY));
        assert!(parse_float("nan").is_some_and(f64::is_nan));
        assert_eq!(parse_float("1,5"), None);
        assert_eq!(parse_float("infinite"), None);
    }

    #[test]
    fn test_parse_complex() {
        assert_eq!(parse_complex("1+2j"), Some(Complex::new(1.0, 2.0)));
        assert_eq!(parse_complex("(-j)"), Some(Complex::new(0.0, -1.0)));
        assert_eq!(parse_complex("1e-3-4.5J"), Some(Complex::new(0.001, -4.5)));
        assert_eq!(parse_complex("3"), Some(Complex::new(3.0, 0.0)));
        assert_eq!(parse_complex("1 + 2j"), None);
    }

    #[test]
    fn test_float_hex_roundtrip() {
        assert_eq!(float_hex(1.5), "0x1.8000000000000p+0");
        assert_eq!(float_hex(-0.0), "-0x0.0p+0");
        assert_eq!(float_fromhex("0x1.8p1").unwrap(), 3.0);
        assert_eq!(float_fromhex("-0x.8").unwrap(), -0.5);
        assert_eq!(float_fromhex(&float_hex(0.1)).unwrap(), 0.1);
        assert!(float_fromhex("0x1p99999").is_err());
        assert!(float_fromhex("0xg").is_err());
    }

    #[test]
    fn test_integer_ratio() {
        assert_eq!(float_as_integer_ratio(0.75).unwrap().repr(), "(3, 4)");
        assert_eq!(float_as_integer_ratio(-2.0).unwrap().repr(), "(-2, 1)");
    }

    #[test]
    fn test_to_bytes() {
        let n = BigInt::from(1024);
        let mut args = Args::positional(vec![Value::from(2i64), Value::str("big")]);
        assert_eq!(int_to_bytes(&n, args).unwrap().repr(), "b'\\x04\\x00'");

        args = Args::positional(vec![Value::from(2i64), Value::str("little")]);
        args.keywords.insert("signed".into(), Value::Bool(true));
        assert_eq!(int_to_bytes(&BigInt::from(-1), args).unwrap().repr(), "b'\\xff\\xff'");

        let err = int_to_bytes(&BigInt::from(256), Args::new()).unwrap_err();
        assert_eq!(err.to_string(), "int too big to convert");
    }
}
