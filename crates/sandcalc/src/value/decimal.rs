//! Precision decimal arithmetic
//!
//! A decimal floating-point number with the default context of the
//! standard decimal module: 28 significant digits, ROUND_HALF_EVEN,
//! exponents within ±999999. Construction is exact; every arithmetic
//! result is rounded to the context precision.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{EvalError, Result};

/// Significant digits kept by arithmetic.
pub const PRECISION: usize = 28;

/// Largest adjusted exponent.
pub const EMAX: i64 = 999_999;

/// Smallest adjusted exponent of a normal number.
pub const EMIN: i64 = -999_999;

/// Smallest exponent of a subnormal number.
pub const ETINY: i64 = EMIN - (PRECISION as i64 - 1);

/// Result size (in digits) above which integral powers stop being exact.
const EXACT_POW_DIGITS: u64 = 4_000;

/// A precision decimal value.
#[derive(Clone, Debug)]
pub enum Decimal {
    /// `(-1)^negative * coeff * 10^exp`, with `coeff >= 0`
    Finite {
        /// Sign bit (also set for negative zero)
        negative: bool,
        /// Non-negative coefficient
        coeff: BigInt,
        /// Decimal exponent
        exp: i64,
    },
    /// Signed infinity
    Infinite {
        /// Sign bit
        negative: bool,
    },
    /// Quiet NaN
    NaN,
}

fn pow10(n: u64) -> Result<BigInt> {
    let n = u32::try_from(n).map_err(|_| EvalError::overflow("decimal exponent too large"))?;
    Ok(BigInt::from(10u32).pow(n))
}

fn digit_count(n: &BigInt) -> usize {
    if n.is_zero() {
        1
    } else {
        n.magnitude().to_string().len()
    }
}

fn conversion_syntax() -> EvalError {
    EvalError::invalid_operation("[<class 'decimal.ConversionSyntax'>]")
}

fn invalid() -> EvalError {
    EvalError::invalid_operation("[<class 'decimal.InvalidOperation'>]")
}

impl Decimal {
    // ═══════════════════════════════════════════════════════════════════
    // Construction
    // ═══════════════════════════════════════════════════════════════════

    /// Build a finite decimal from sign, coefficient and exponent.
    pub fn finite(negative: bool, coeff: BigInt, exp: i64) -> Self {
        Decimal::Finite {
            negative,
            coeff: coeff.abs(),
            exp,
        }
    }

    /// Zero with exponent 0.
    pub fn zero() -> Self {
        Decimal::finite(false, BigInt::zero(), 0)
    }

    /// Exact conversion from an integer.
    pub fn from_bigint(n: &BigInt) -> Self {
        Decimal::finite(n.is_negative(), n.abs(), 0)
    }

    /// Exact conversion from an `i64`.
    pub fn from_i64(n: i64) -> Self {
        Decimal::from_bigint(&BigInt::from(n))
    }

    /// Exact conversion from the binary value of a float.
    pub fn from_f64(f: f64) -> Self {
        if f.is_nan() {
            return Decimal::NaN;
        }
        if f.is_infinite() {
            return Decimal::Infinite {
                negative: f < 0.0,
            };
        }
        let bits = f.to_bits();
        let negative = bits >> 63 == 1;
        let exp_bits = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1u64 << 52) - 1);
        let (mut mantissa, mut exp2) = if exp_bits == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), exp_bits - 1075)
        };
        if mantissa == 0 {
            return Decimal::finite(negative, BigInt::zero(), 0);
        }
        while mantissa & 1 == 0 && exp2 < 0 {
            mantissa >>= 1;
            exp2 += 1;
        }
        if exp2 >= 0 {
            Decimal::finite(negative, BigInt::from(mantissa) << (exp2 as usize), 0)
        } else {
            let five_pow = BigInt::from(5u32).pow((-exp2) as u32);
            Decimal::finite(negative, BigInt::from(mantissa) * five_pow, exp2)
        }
    }

    /// Parse the textual forms accepted by the decimal constructor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` (ConversionSyntax) on malformed input.
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
        let (negative, body) = match cleaned.as_bytes().first() {
            Some(b'-') => (true, &cleaned[1..]),
            Some(b'+') => (false, &cleaned[1..]),
            _ => (false, cleaned.as_str()),
        };
        let lower = body.to_ascii_lowercase();
        match lower.as_str() {
            "inf" | "infinity" => return Ok(Decimal::Infinite { negative }),
            "nan" | "snan" => return Ok(Decimal::NaN),
            _ => {}
        }

        let (mantissa, exponent) = match lower.find('e') {
            Some(pos) => (&lower[..pos], Some(&lower[pos + 1..])),
            None => (lower.as_str(), None),
        };
        let (int_part, frac_part) = match mantissa.find('.') {
            Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(conversion_syntax());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(conversion_syntax());
        }

        let mut exp: i64 = match exponent {
            Some(e) => {
                let digits = e.strip_prefix('+').unwrap_or(e);
                if digits.is_empty() || digits == "-" {
                    return Err(conversion_syntax());
                }
                digits.parse().map_err(|_| conversion_syntax())?
            }
            None => 0,
        };
        exp -= frac_part.len() as i64;

        let digits = format!("{}{}", int_part, frac_part);
        let coeff: BigInt = digits.parse().map_err(|_| conversion_syntax())?;
        Ok(Decimal::finite(negative, coeff, exp))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Predicates and accessors
    // ═══════════════════════════════════════════════════════════════════

    /// Whether this is a finite number.
    pub fn is_finite(&self) -> bool {
        matches!(self, Decimal::Finite { .. })
    }

    /// Whether this is NaN.
    pub fn is_nan(&self) -> bool {
        matches!(self, Decimal::NaN)
    }

    /// Whether this is a (signed) zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Decimal::Finite { coeff, .. } if coeff.is_zero())
    }

    /// Whether the sign bit is set.
    pub fn is_negative(&self) -> bool {
        match self {
            Decimal::Finite { negative, .. } | Decimal::Infinite { negative } => *negative,
            Decimal::NaN => false,
        }
    }

    /// Whether the value is a finite integer.
    pub fn is_integral(&self) -> bool {
        match self {
            Decimal::Finite { coeff, exp, .. } => {
                if *exp >= 0 || coeff.is_zero() {
                    return true;
                }
                match pow10((-exp) as u64) {
                    Ok(p) => (coeff % p).is_zero(),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }

    /// Exponent of the most significant digit.
    pub fn adjusted(&self) -> i64 {
        match self {
            Decimal::Finite { coeff, exp, .. } => exp + digit_count(coeff) as i64 - 1,
            _ => 0,
        }
    }

    /// Sign, coefficient digits and exponent of a finite value.
    pub fn parts(&self) -> Option<(bool, String, i64)> {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => Some((*negative, coeff.to_string(), *exp)),
            _ => None,
        }
    }

    /// Nearest binary float.
    pub fn to_f64(&self) -> f64 {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => {
                let magnitude: f64 = format!("{}e{}", coeff, exp).parse().unwrap_or(f64::INFINITY);
                if *negative {
                    -magnitude
                } else {
                    magnitude
                }
            }
            Decimal::Infinite { negative: true } => f64::NEG_INFINITY,
            Decimal::Infinite { negative: false } => f64::INFINITY,
            Decimal::NaN => f64::NAN,
        }
    }

    /// Integer part, truncated toward zero.
    ///
    /// # Errors
    ///
    /// `ValueError` for NaN, `OverflowError` for infinities or results
    /// too large to materialise.
    pub fn to_bigint(&self) -> Result<BigInt> {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => {
                let magnitude = if *exp >= 0 {
                    if *exp > 300_000 {
                        return Err(EvalError::overflow("int too large to convert"));
                    }
                    coeff * pow10(*exp as u64)?
                } else if digit_count(coeff) as i64 <= -exp {
                    BigInt::zero()
                } else {
                    coeff / pow10((-exp) as u64)?
                };
                Ok(if *negative { -magnitude } else { magnitude })
            }
            Decimal::Infinite { .. } => Err(EvalError::overflow(
                "cannot convert Infinity to integer",
            )),
            Decimal::NaN => Err(EvalError::value_error("cannot convert NaN to integer")),
        }
    }

    /// Exact integer value if this decimal is integral.
    pub fn to_integer(&self) -> Option<BigInt> {
        if self.is_integral() {
            self.to_bigint().ok()
        } else {
            None
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Context rounding
    // ═══════════════════════════════════════════════════════════════════

    /// Round to the context precision and check the exponent range.
    ///
    /// # Errors
    ///
    /// `OverflowError` when the adjusted exponent exceeds `EMAX`.
    pub fn fix(self) -> Result<Self> {
        let Decimal::Finite {
            negative,
            coeff,
            exp,
        } = self
        else {
            return Ok(self);
        };

        if coeff.is_zero() {
            let exp = exp.clamp(ETINY, EMAX - (PRECISION as i64 - 1));
            return Ok(Decimal::Finite {
                negative,
                coeff,
                exp,
            });
        }

        let digits = digit_count(&coeff);
        let mut drop = digits.saturating_sub(PRECISION) as i64;
        if exp + drop < ETINY {
            drop = ETINY - exp;
        }

        let (mut coeff, mut exp) = (coeff, exp);
        if drop > 0 {
            coeff = round_half_even(&coeff, drop as u64)?;
            exp += drop;
            if digit_count(&coeff) > PRECISION {
                coeff /= 10;
                exp += 1;
            }
        }

        let result = Decimal::Finite {
            negative,
            coeff,
            exp,
        };
        if result.adjusted() > EMAX {
            return Err(EvalError::overflow("[<class 'decimal.Overflow'>]"));
        }
        Ok(result)
    }

    /// Rescale to the given exponent with half-even rounding.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` when the result would need more than the
    /// context precision.
    pub fn quantize_exp(&self, target: i64) -> Result<Self> {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => {
                let coeff = if *exp >= target {
                    if exp - target > (PRECISION as i64) * 2 && !coeff.is_zero() {
                        return Err(invalid());
                    }
                    coeff * pow10((exp - target) as u64)?
                } else {
                    round_half_even(coeff, (target - exp) as u64)?
                };
                if !coeff.is_zero() && digit_count(&coeff) > PRECISION {
                    return Err(invalid());
                }
                Ok(Decimal::Finite {
                    negative: *negative,
                    coeff,
                    exp: target,
                })
            }
            _ => Err(invalid()),
        }
    }

    /// Rescale to the given exponent with half-even rounding, without the
    /// context precision limit. Used by formatting and `round()`.
    pub fn rescale(&self, target: i64) -> Result<Self> {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => {
                let coeff = if *exp >= target {
                    if coeff.is_zero() {
                        BigInt::zero()
                    } else if exp - target > 400_000 {
                        return Err(EvalError::overflow("decimal exponent too large"));
                    } else {
                        coeff * pow10((exp - target) as u64)?
                    }
                } else {
                    round_half_even(coeff, (target - exp) as u64)?
                };
                Ok(Decimal::Finite {
                    negative: *negative,
                    coeff,
                    exp: target,
                })
            }
            _ => Ok(self.clone()),
        }
    }

    /// Round to `sig` significant digits (half-even), keeping the value
    /// finite. Used by the formatter.
    pub fn round_significant(&self, sig: usize) -> Self {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => {
                let digits = digit_count(coeff);
                if digits <= sig || coeff.is_zero() {
                    return self.clone();
                }
                let drop = (digits - sig) as u64;
                let Ok(mut rounded) = round_half_even(coeff, drop) else {
                    return self.clone();
                };
                let mut new_exp = exp + drop as i64;
                if digit_count(&rounded) > sig {
                    rounded /= 10;
                    new_exp += 1;
                }
                Decimal::Finite {
                    negative: *negative,
                    coeff: rounded,
                    exp: new_exp,
                }
            }
            _ => self.clone(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic
    // ═══════════════════════════════════════════════════════════════════

    /// Negation (rounded).
    pub fn neg(&self) -> Result<Self> {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => Decimal::Finite {
                negative: !negative && !coeff.is_zero(),
                coeff: coeff.clone(),
                exp: *exp,
            }
            .fix(),
            Decimal::Infinite { negative } => Ok(Decimal::Infinite {
                negative: !negative,
            }),
            Decimal::NaN => Ok(Decimal::NaN),
        }
    }

    /// Unary plus (rounded).
    pub fn pos(&self) -> Result<Self> {
        match self {
            Decimal::Finite { coeff, exp, .. } if coeff.is_zero() => {
                Decimal::finite(false, BigInt::zero(), *exp).fix()
            }
            other => other.clone().fix(),
        }
    }

    /// Absolute value (rounded).
    pub fn abs(&self) -> Result<Self> {
        match self {
            Decimal::Finite { coeff, exp, .. } => Decimal::finite(false, coeff.clone(), *exp).fix(),
            Decimal::Infinite { .. } => Ok(Decimal::Infinite { negative: false }),
            Decimal::NaN => Ok(Decimal::NaN),
        }
    }

    /// Addition.
    pub fn add(&self, other: &Self) -> Result<Self> {
        let (
            Decimal::Finite {
                negative: n1,
                coeff: c1,
                exp: e1,
            },
            Decimal::Finite {
                negative: n2,
                coeff: c2,
                exp: e2,
            },
        ) = (self, other)
        else {
            return non_finite(self, other, |a, b| a + b);
        };

        if c1.is_zero() || c2.is_zero() {
            let exp = (*e1).min(*e2);
            if c1.is_zero() && c2.is_zero() {
                return Decimal::finite(*n1 && *n2, BigInt::zero(), exp).fix();
            }
            let (negative, coeff, e) = if c1.is_zero() {
                (*n2, c2, *e2)
            } else {
                (*n1, c1, *e1)
            };
            let target = exp.max(e - PRECISION as i64 - 1);
            let coeff = coeff * pow10((e - target) as u64)?;
            return Decimal::finite(negative, coeff, target).fix();
        }

        let (a, b) = normalize((*n1, c1, *e1), (*n2, c2, *e2))?;
        let signed_a = if a.0 { -a.1 } else { a.1 };
        let signed_b = if b.0 { -b.1 } else { b.1 };
        let sum = signed_a + signed_b;
        let negative = sum.is_negative();
        Decimal::finite(negative, sum, a.2).fix()
    }

    /// Subtraction.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        let negated = match other {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => Decimal::Finite {
                negative: !negative,
                coeff: coeff.clone(),
                exp: *exp,
            },
            Decimal::Infinite { negative } => Decimal::Infinite {
                negative: !negative,
            },
            Decimal::NaN => Decimal::NaN,
        };
        self.add(&negated)
    }

    /// Multiplication.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        match (self, other) {
            (
                Decimal::Finite {
                    negative: n1,
                    coeff: c1,
                    exp: e1,
                },
                Decimal::Finite {
                    negative: n2,
                    coeff: c2,
                    exp: e2,
                },
            ) => Decimal::Finite {
                negative: n1 ^ n2,
                coeff: c1 * c2,
                exp: e1 + e2,
            }
            .fix(),
            _ => non_finite(self, other, |a, b| a * b),
        }
    }

    /// True division, correctly rounded.
    ///
    /// # Errors
    ///
    /// `ZeroDivisionError` when dividing by zero (including 0/0).
    pub fn div(&self, other: &Self) -> Result<Self> {
        let (
            Decimal::Finite {
                negative: n1,
                coeff: c1,
                exp: e1,
            },
            Decimal::Finite {
                negative: n2,
                coeff: c2,
                exp: e2,
            },
        ) = (self, other)
        else {
            if other.is_zero() {
                return Err(EvalError::zero_division("[<class 'decimal.DivisionByZero'>]"));
            }
            return non_finite(self, other, |a, b| a / b);
        };

        if c2.is_zero() {
            return Err(if c1.is_zero() {
                EvalError::zero_division("[<class 'decimal.DivisionUndefined'>]")
            } else {
                EvalError::zero_division("[<class 'decimal.DivisionByZero'>]")
            });
        }

        let negative = n1 ^ n2;
        let ideal_exp = e1 - e2;
        if c1.is_zero() {
            return Decimal::finite(negative, BigInt::zero(), ideal_exp).fix();
        }

        let shift = digit_count(c2) as i64 - digit_count(c1) as i64 + PRECISION as i64 + 1;
        let mut exp = e1 - e2 - shift;
        let (mut coeff, remainder) = if shift >= 0 {
            (c1 * pow10(shift as u64)?).div_rem(c2)
        } else {
            c1.div_rem(&(c2 * pow10((-shift) as u64)?))
        };
        if !remainder.is_zero() {
            if (&coeff % 5u32).is_zero() {
                coeff += 1u32;
            }
        } else {
            while exp < ideal_exp && (&coeff % 10u32).is_zero() {
                coeff /= 10u32;
                exp += 1;
            }
        }
        Decimal::finite(negative, coeff, exp).fix()
    }

    /// Integer division and remainder, truncating toward zero.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for a zero divisor or when the quotient needs more
    /// than the context precision.
    pub fn divmod(&self, other: &Self) -> Result<(Self, Self)> {
        self.check_remainder_divisor(other)?;
        self.div_rem_trunc(other)
    }

    /// A remainder by zero is an invalid operation, never a division by
    /// zero; `0 % 0` reports DivisionUndefined.
    fn check_remainder_divisor(&self, other: &Self) -> Result<()> {
        if self.is_nan() || !other.is_zero() {
            return Ok(());
        }
        Err(if self.is_zero() {
            EvalError::invalid_operation("[<class 'decimal.DivisionUndefined'>]")
        } else {
            invalid()
        })
    }

    fn div_rem_trunc(&self, other: &Self) -> Result<(Self, Self)> {
        let (
            Decimal::Finite {
                negative: n1,
                coeff: c1,
                exp: e1,
            },
            Decimal::Finite {
                negative: n2,
                coeff: c2,
                exp: e2,
            },
        ) = (self, other)
        else {
            if other.is_zero() {
                return Err(EvalError::zero_division("[<class 'decimal.DivisionByZero'>]"));
            }
            return Err(invalid());
        };

        if c2.is_zero() {
            return Err(if c1.is_zero() {
                EvalError::zero_division("[<class 'decimal.DivisionUndefined'>]")
            } else {
                EvalError::zero_division("[<class 'decimal.DivisionByZero'>]")
            });
        }

        let sign = n1 ^ n2;
        let ideal_exp = (*e1).min(*e2);
        let expdiff = self.adjusted() - other.adjusted();
        if c1.is_zero() || expdiff <= -2 {
            let rescaled = c1 * pow10((e1 - ideal_exp) as u64)?;
            return Ok((
                Decimal::finite(sign, BigInt::zero(), 0),
                Decimal::finite(*n1, rescaled, ideal_exp).fix()?,
            ));
        }
        if expdiff <= PRECISION as i64 {
            let (a, b) = if e1 >= e2 {
                (c1 * pow10((e1 - e2) as u64)?, c2.clone())
            } else {
                (c1.clone(), c2 * pow10((e2 - e1) as u64)?)
            };
            let (q, r) = a.div_rem(&b);
            if digit_count(&q) <= PRECISION {
                return Ok((
                    Decimal::finite(sign, q, 0),
                    Decimal::finite(*n1, r, ideal_exp).fix()?,
                ));
            }
        }
        Err(EvalError::invalid_operation(
            "[<class 'decimal.DivisionImpossible'>]",
        ))
    }

    /// Truncating integer division.
    pub fn floor_div(&self, other: &Self) -> Result<Self> {
        Ok(self.div_rem_trunc(other)?.0)
    }

    /// Remainder with the sign of the dividend.
    pub fn rem(&self, other: &Self) -> Result<Self> {
        Ok(self.divmod(other)?.1)
    }

    /// Exponentiation.
    ///
    /// Integral exponents are computed exactly before rounding, square
    /// roots are correctly rounded, other fractional exponents go through
    /// binary floating point.
    pub fn pow(&self, other: &Self) -> Result<Self> {
        if !self.is_finite() || !other.is_finite() {
            return non_finite(self, other, f64::powf);
        }
        if let Some(n) = other.to_integer() {
            return self.pow_integer(&n);
        }
        if self.is_negative() && !self.is_zero() {
            return Err(invalid());
        }
        if other.cmp_total(&Decimal::parse("0.5")?) == Ordering::Equal {
            return self.sqrt();
        }
        let result = self.to_f64().powf(other.to_f64());
        if result.is_nan() {
            return Err(invalid());
        }
        if result.is_infinite() {
            return Err(EvalError::overflow("[<class 'decimal.Overflow'>]"));
        }
        Decimal::parse(&crate::value::display::float_repr(result))?.fix()
    }

    fn pow_integer(&self, n: &BigInt) -> Result<Self> {
        let Decimal::Finite {
            negative,
            coeff,
            exp,
        } = self
        else {
            return Err(invalid());
        };

        if n.is_zero() {
            if coeff.is_zero() {
                return Err(EvalError::invalid_operation(
                    "[<class 'decimal.InvalidOperation'>]",
                ));
            }
            return Ok(Decimal::finite(false, BigInt::one(), 0));
        }
        let result_negative = *negative && n.is_odd();
        if coeff.is_zero() {
            if n.is_negative() {
                return Err(EvalError::zero_division("[<class 'decimal.DivisionByZero'>]"));
            }
            return Ok(Decimal::finite(result_negative, BigInt::zero(), 0));
        }

        let magnitude = n.abs();
        if coeff.is_one() && *exp == 0 {
            return Ok(Decimal::finite(result_negative, BigInt::one(), 0));
        }

        // Estimate the adjusted exponent of the result before computing it.
        let coeff_log10 = match coeff.to_f64() {
            Some(c) if c.is_finite() => c.log10(),
            _ => digit_count(coeff) as f64 - 1.0,
        };
        let log10 = coeff_log10 + *exp as f64;
        let estimate = magnitude.to_f64().unwrap_or(f64::INFINITY) * log10;
        let estimate = if n.is_negative() { -estimate } else { estimate };
        if estimate > (EMAX + 1) as f64 {
            return Err(EvalError::overflow("[<class 'decimal.Overflow'>]"));
        }
        if estimate < (ETINY - 1) as f64 {
            return Ok(Decimal::finite(result_negative, BigInt::zero(), ETINY));
        }

        let k = magnitude
            .to_u64()
            .ok_or_else(|| EvalError::overflow("[<class 'decimal.Overflow'>]"))?;
        let base = Decimal::finite(false, coeff.clone(), *exp);
        let exact_digits = digit_count(coeff) as u64 * k;
        let powered = if exact_digits <= EXACT_POW_DIGITS {
            let k32 = k as u32;
            Decimal::finite(false, coeff.pow(k32), exp * k as i64)
        } else {
            base.pow_by_squaring(k)?
        };

        let powered = if n.is_negative() {
            Decimal::finite(false, BigInt::one(), 0).div(&powered)?
        } else {
            powered.fix()?
        };
        Ok(match powered {
            Decimal::Finite { coeff, exp, .. } => Decimal::Finite {
                negative: result_negative && !coeff.is_zero(),
                coeff,
                exp,
            },
            other => other,
        })
    }

    fn pow_by_squaring(&self, mut k: u64) -> Result<Self> {
        const GUARD: usize = PRECISION + 12;
        let mut result = Decimal::finite(false, BigInt::one(), 0);
        let mut base = self.clone();
        while k > 0 {
            if k & 1 == 1 {
                result = result.mul_unrounded(&base).round_significant(GUARD);
            }
            k >>= 1;
            if k > 0 {
                base = base.mul_unrounded(&base).round_significant(GUARD);
            }
        }
        Ok(result)
    }

    fn mul_unrounded(&self, other: &Self) -> Self {
        match (self, other) {
            (
                Decimal::Finite {
                    negative: n1,
                    coeff: c1,
                    exp: e1,
                },
                Decimal::Finite {
                    negative: n2,
                    coeff: c2,
                    exp: e2,
                },
            ) => Decimal::Finite {
                negative: n1 ^ n2,
                coeff: c1 * c2,
                exp: e1 + e2,
            },
            _ => Decimal::NaN,
        }
    }

    /// Correctly rounded square root.
    pub fn sqrt(&self) -> Result<Self> {
        let Decimal::Finite {
            negative,
            coeff,
            exp,
        } = self
        else {
            return match self {
                Decimal::Infinite { negative: false } => Ok(self.clone()),
                _ => Err(invalid()),
            };
        };
        if coeff.is_zero() {
            return Ok(Decimal::finite(*negative, BigInt::zero(), exp.div_floor(&2)));
        }
        if *negative {
            return Err(invalid());
        }

        let (mut c, mut e) = (coeff.clone(), *exp);
        if e.is_odd() {
            c *= 10u32;
            e -= 1;
        }
        let target_digits = 2 * (PRECISION + 2);
        let current = digit_count(&c);
        let mut shift = 0u64;
        if current < target_digits {
            shift = ((target_digits - current + 1) / 2) as u64;
            c *= pow10(2 * shift)?;
        }
        let mut root = c.sqrt();
        let exact = &root * &root == c;
        let mut root_exp = e / 2 - shift as i64;
        if exact {
            let ideal = exp.div_floor(&2);
            while root_exp < ideal && (&root % 10u32).is_zero() {
                root /= 10u32;
                root_exp += 1;
            }
        } else if (&root % 5u32).is_zero() {
            root += 1u32;
        }
        Decimal::finite(false, root, root_exp).fix()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Comparison
    // ═══════════════════════════════════════════════════════════════════

    /// Numeric comparison; `None` if either side is NaN.
    pub fn partial_cmp_value(&self, other: &Self) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        Some(self.cmp_total(other))
    }

    fn cmp_total(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Decimal::Infinite { negative: a }, Decimal::Infinite { negative: b }) => b.cmp(a),
            (Decimal::Infinite { negative }, _) => {
                if *negative {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (_, Decimal::Infinite { negative }) => {
                if *negative {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (
                Decimal::Finite {
                    negative: n1,
                    coeff: c1,
                    exp: e1,
                },
                Decimal::Finite {
                    negative: n2,
                    coeff: c2,
                    exp: e2,
                },
            ) => {
                let s1 = if c1.is_zero() { 0 } else if *n1 { -1 } else { 1 };
                let s2 = if c2.is_zero() { 0 } else if *n2 { -1 } else { 1 };
                if s1 != s2 || s1 == 0 {
                    return s1.cmp(&s2);
                }
                let magnitude = match self.adjusted().cmp(&other.adjusted()) {
                    Ordering::Equal => {
                        let (a, b) = if e1 >= e2 {
                            (c1 * pow10_lossy((e1 - e2) as u64), c2.clone())
                        } else {
                            (c1.clone(), c2 * pow10_lossy((e2 - e1) as u64))
                        };
                        a.cmp(&b)
                    }
                    other => other,
                };
                if s1 < 0 {
                    magnitude.reverse()
                } else {
                    magnitude
                }
            }
            _ => Ordering::Equal,
        }
    }

    /// Canonical form used for hashing: trailing zeros stripped.
    pub fn normalized_key(&self) -> (bool, String, i64) {
        match self {
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => {
                if coeff.is_zero() {
                    return (false, "0".to_string(), 0);
                }
                let digits = coeff.to_string();
                let trimmed = digits.trim_end_matches('0');
                let stripped = digits.len() - trimmed.len();
                (*negative, trimmed.to_string(), exp + stripped as i64)
            }
            Decimal::Infinite { negative } => (*negative, "inf".to_string(), 0),
            Decimal::NaN => (false, "nan".to_string(), 0),
        }
    }
}

fn pow10_lossy(n: u64) -> BigInt {
    BigInt::from(10u32).pow(n.min(u32::MAX as u64) as u32)
}

/// Divide by `10^drop`, rounding half to even.
fn round_half_even(coeff: &BigInt, drop: u64) -> Result<BigInt> {
    if drop as usize > digit_count(coeff) + 1 {
        return Ok(BigInt::zero());
    }
    let divisor = pow10(drop)?;
    let (mut q, r) = coeff.div_rem(&divisor);
    let twice = &r * 2u32;
    match twice.cmp(&divisor) {
        Ordering::Greater => q += 1u32,
        Ordering::Equal if q.is_odd() => q += 1u32,
        _ => {}
    }
    Ok(q)
}

type Operand<'a> = (bool, &'a BigInt, i64);

/// Align two operands to a common exponent for addition.
///
/// When one operand is far below the other's precision window it is
/// replaced by a single unit just below that window, which rounds the
/// same way and avoids huge intermediate coefficients.
fn normalize(
    op1: Operand<'_>,
    op2: Operand<'_>,
) -> Result<((bool, BigInt, i64), (bool, BigInt, i64))> {
    let swapped = op1.2 < op2.2;
    let (tmp, other) = if swapped { (op2, op1) } else { (op1, op2) };

    let tmp_len = digit_count(tmp.1) as i64;
    let other_len = digit_count(other.1) as i64;
    let exp = tmp.2 + (-1i64).min(tmp_len - PRECISION as i64 - 2);

    let (other_coeff, other_exp) = if other_len + other.2 - 1 < exp {
        (BigInt::one(), exp)
    } else {
        (other.1.clone(), other.2)
    };
    let tmp_coeff = tmp.1 * pow10((tmp.2 - other_exp) as u64)?;

    let tmp = (tmp.0, tmp_coeff, other_exp);
    let other = (other.0, other_coeff, other_exp);
    Ok(if swapped { (other, tmp) } else { (tmp, other) })
}

/// Arithmetic involving NaN or infinities, via binary floats.
fn non_finite(a: &Decimal, b: &Decimal, op: impl Fn(f64, f64) -> f64) -> Result<Decimal> {
    if a.is_nan() || b.is_nan() {
        return Ok(Decimal::NaN);
    }
    let result = op(a.to_f64(), b.to_f64());
    if result.is_nan() {
        return Err(invalid());
    }
    if result.is_infinite() {
        return Ok(Decimal::Infinite {
            negative: result < 0.0,
        });
    }
    Ok(Decimal::from_f64(result))
}

// ═══════════════════════════════════════════════════════════════════════
// Display
// ═══════════════════════════════════════════════════════════════════════

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decimal::NaN => write!(f, "NaN"),
            Decimal::Infinite { negative } => {
                write!(f, "{}Infinity", if *negative { "-" } else { "" })
            }
            Decimal::Finite {
                negative,
                coeff,
                exp,
            } => {
                let digits = coeff.to_string();
                let len = digits.len() as i64;
                let left_digits = exp + len;
                let dot_place = if *exp <= 0 && left_digits > -6 {
                    left_digits
                } else {
                    1
                };

                let (int_part, frac_part) = if dot_place <= 0 {
                    (
                        "0".to_string(),
                        format!(".{}{}", "0".repeat((-dot_place) as usize), digits),
                    )
                } else if dot_place >= len {
                    (
                        format!("{}{}", digits, "0".repeat((dot_place - len) as usize)),
                        String::new(),
                    )
                } else {
                    let split = dot_place as usize;
                    (digits[..split].to_string(), format!(".{}", &digits[split..]))
                };

                let exp_part = if left_digits == dot_place {
                    String::new()
                } else {
                    format!("E{:+}", left_digits - dot_place)
                };

                write!(
                    f,
                    "{}{}{}{}",
                    if *negative { "-" } else { "" },
                    int_part,
                    frac_part,
                    exp_part
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(d("0.1").to_string(), "0.1");
        assert_eq!(d("-1.50").to_string(), "-1.50");
        assert_eq!(d("1e3").to_string(), "1E+3");
        assert_eq!(d("0.0000001").to_string(), "1E-7");
        assert_eq!(d("0.000001").to_string(), "0.000001");
        assert_eq!(d("1_000").to_string(), "1000");
        assert_eq!(d(" 12.5 ").to_string(), "12.5");
        assert_eq!(d("-inf").to_string(), "-Infinity");
        assert!(Decimal::parse("abc").is_err());
        assert!(Decimal::parse("1.2.3").is_err());
    }

    #[test]
    fn test_add_is_exact() {
        assert_eq!(d("0.1").add(&d("0.2")).unwrap().to_string(), "0.3");
        assert_eq!(d("1.0").add(&d("2")).unwrap().to_string(), "3.0");
        assert_eq!(d("5").sub(&d("7")).unwrap().to_string(), "-2");
    }

    #[test]
    fn test_mul() {
        assert_eq!(d("1.5").mul(&d("2")).unwrap().to_string(), "3.0");
        assert_eq!(d("-0.1").mul(&d("0.1")).unwrap().to_string(), "-0.01");
    }

    #[test]
    fn test_div() {
        assert_eq!(d("1").div(&d("4")).unwrap().to_string(), "0.25");
        assert_eq!(d("10").div(&d("2")).unwrap().to_string(), "5");
        assert_eq!(
            d("1").div(&d("3")).unwrap().to_string(),
            "0.3333333333333333333333333333"
        );
        assert_eq!(
            d("2").div(&d("3")).unwrap().to_string(),
            "0.6666666666666666666666666667"
        );
        assert!(d("1").div(&d("0")).unwrap_err().is_zero_division());
        assert!(d("0").div(&d("0")).unwrap_err().is_zero_division());
    }

    #[test]
    fn test_divmod_truncates() {
        let (q, r) = d("-7").divmod(&d("2")).unwrap();
        assert_eq!(q.to_string(), "-3");
        assert_eq!(r.to_string(), "-1");
        let (q, r) = d("7.5").divmod(&d("2")).unwrap();
        assert_eq!(q.to_string(), "3");
        assert_eq!(r.to_string(), "1.5");
    }

    #[test]
    fn test_remainder_by_zero_is_invalid_operation() {
        let err = d("1").rem(&d("0")).unwrap_err();
        assert!(!err.is_zero_division());
        assert_eq!(err.category(), "InvalidOperation");
        assert_eq!(err.to_string(), "[<class 'decimal.InvalidOperation'>]");
        let err = d("0").rem(&d("0")).unwrap_err();
        assert_eq!(err.to_string(), "[<class 'decimal.DivisionUndefined'>]");
        assert_eq!(d("5").divmod(&d("0")).unwrap_err().category(), "InvalidOperation");
        assert!(d("1").floor_div(&d("0")).unwrap_err().is_zero_division());
    }

    #[test]
    fn test_pow() {
        assert_eq!(d("2").pow(&d("10")).unwrap().to_string(), "1024");
        assert_eq!(d("2").pow(&d("-2")).unwrap().to_string(), "0.25");
        assert_eq!(
            d("2").pow(&d("0.5")).unwrap().to_string(),
            "1.414213562373095048801688724"
        );
        assert_eq!(d("1.1").pow(&d("2")).unwrap().to_string(), "1.21");
        assert!(d("10").pow(&d("10000000")).is_err());
    }

    #[test]
    fn test_rounding_half_even() {
        let x = d("1.00000000000000000000000000005");
        assert_eq!(x.pos().unwrap().to_string(), "1.000000000000000000000000000");
        let y = d("1.00000000000000000000000000015");
        assert_eq!(y.pos().unwrap().to_string(), "1.000000000000000000000000000");
    }

    #[test]
    fn test_from_f64_exact() {
        assert_eq!(
            Decimal::from_f64(0.1).to_string(),
            "0.1000000000000000055511151231257827021181583404541015625"
        );
        assert_eq!(Decimal::from_f64(2.5).to_string(), "2.5");
        assert_eq!(Decimal::from_f64(-0.0).to_string(), "-0");
    }

    #[test]
    fn test_compare() {
        assert_eq!(d("1.0").partial_cmp_value(&d("1")), Some(Ordering::Equal));
        assert_eq!(d("-2").partial_cmp_value(&d("1")), Some(Ordering::Less));
        assert_eq!(d("1e5").partial_cmp_value(&d("99999")), Some(Ordering::Greater));
        assert_eq!(d("NaN").partial_cmp_value(&d("1")), None);
    }

    #[test]
    fn test_integral_conversions() {
        assert!(d("3.000").is_integral());
        assert!(!d("3.5").is_integral());
        assert_eq!(d("-3.9").to_bigint().unwrap(), BigInt::from(-3));
        assert_eq!(d("1E+2").to_integer(), Some(BigInt::from(100)));
    }

    #[test]
    fn test_quantize() {
        assert_eq!(d("2.675").quantize_exp(-2).unwrap().to_string(), "2.68");
        assert_eq!(d("2.665").quantize_exp(-2).unwrap().to_string(), "2.66");
        assert_eq!(d("7").quantize_exp(-1).unwrap().to_string(), "7.0");
    }
}
