//! The `statistics` namespace
//!
//! Sums are exact: every data point is turned into a ratio of big
//! integers and only the final result is converted back, to `int` when it
//! is integral, otherwise to the widest input type (`float` or `Decimal`).

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Pow, Signed, Zero};

use super::{builtin, given, sort_values, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::ops::{self, int_true_div, BinaryOp};
use crate::value::{collect, Decimal, HashKey, Value};

fn statistics_error(message: &str) -> EvalError {
    EvalError::value_error(message)
}

// ═══════════════════════════════════════════════════════════════════════
// Exact ratios
// ═══════════════════════════════════════════════════════════════════════

/// A reduced fraction with a positive denominator.
#[derive(Debug, Clone, PartialEq)]
struct Ratio {
    num: BigInt,
    den: BigInt,
}

impl Ratio {
    fn new(num: BigInt, den: BigInt) -> Self {
        let g = num.gcd(&den);
        let (mut num, mut den) = if g.is_zero() { (num, den) } else { (num / &g, den / g) };
        if den.is_negative() {
            num = -num;
            den = -den;
        }
        Self { num, den }
    }

    fn integer(n: BigInt) -> Self {
        Self { num: n, den: BigInt::one() }
    }

    fn from_f64(f: f64) -> Self {
        let bits = f.to_bits();
        let negative = bits >> 63 == 1;
        let exp = ((bits >> 52) & 0x7ff) as i64;
        let frac = bits & ((1u64 << 52) - 1);
        let (mantissa, exp) = if exp == 0 {
            (frac, -1074)
        } else {
            (frac | (1u64 << 52), exp - 1075)
        };
        let mut num = BigInt::from(mantissa);
        if negative {
            num = -num;
        }
        if exp >= 0 {
            Self::integer(num << exp as usize)
        } else {
            Self::new(num, BigInt::one() << (-exp) as usize)
        }
    }

    fn from_decimal(negative: bool, coeff: &BigInt, exp: i64) -> Self {
        let coeff = if negative { -coeff.clone() } else { coeff.clone() };
        let scale = Pow::pow(BigInt::from(10u32), exp.unsigned_abs());
        if exp >= 0 {
            Self::integer(coeff * scale)
        } else {
            Self::new(coeff, scale)
        }
    }

    fn add(&self, other: &Self) -> Self {
        Self::new(&self.num * &other.den + &other.num * &self.den, &self.den * &other.den)
    }

    fn sub(&self, other: &Self) -> Self {
        Self::new(&self.num * &other.den - &other.num * &self.den, &self.den * &other.den)
    }

    fn mul(&self, other: &Self) -> Self {
        Self::new(&self.num * &other.num, &self.den * &other.den)
    }

    fn div(&self, other: &Self) -> Result<Self> {
        if other.num.is_zero() {
            return Err(EvalError::zero_division("division by zero"));
        }
        Ok(Self::new(&self.num * &other.den, &self.den * &other.num))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Data classification
// ═══════════════════════════════════════════════════════════════════════

/// Result type of a computation, widened across the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Int,
    Float,
    Decimal,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Decimal => "Decimal",
        }
    }

    fn widen(self, other: Kind) -> Result<Kind> {
        match (self, other) {
            (Kind::Float, Kind::Decimal) | (Kind::Decimal, Kind::Float) => {
                Err(EvalError::type_error(format!(
                    "don't know how to coerce {} and {}",
                    self.name(),
                    other.name()
                )))
            }
            _ => Ok(self.max(other)),
        }
    }

    /// Convert an exact result back to a runtime value.
    fn convert(self, value: &Ratio) -> Result<Value> {
        match self {
            Kind::Int if value.den.is_one() => Ok(Value::Int(value.num.clone())),
            Kind::Int | Kind::Float => int_true_div(&value.num, &value.den).map(Value::Float),
            Kind::Decimal => Decimal::from_bigint(&value.num)
                .div(&Decimal::from_bigint(&value.den))
                .map(Value::Decimal),
        }
    }
}

/// Numeric data, either exact or containing non-finite floats.
enum Data {
    Exact { kind: Kind, values: Vec<Ratio> },
    Inexact(Vec<f64>),
}

fn classify(values: &[Value]) -> Result<Data> {
    let mut kind = Kind::Int;
    let mut exact = Vec::with_capacity(values.len());
    let mut inexact = false;
    for value in values {
        let (k, ratio) = match value {
            Value::Bool(_) | Value::Int(_) => (Kind::Int, value.as_bigint().map(Ratio::integer)),
            Value::Float(f) if f.is_finite() => (Kind::Float, Some(Ratio::from_f64(*f))),
            Value::Float(_) => (Kind::Float, None),
            Value::Decimal(Decimal::Finite { negative, coeff, exp }) => {
                (Kind::Decimal, Some(Ratio::from_decimal(*negative, coeff, *exp)))
            }
            Value::Decimal(_) => (Kind::Decimal, None),
            other => {
                return Err(EvalError::type_error(format!(
                    "can't convert type '{}' to numerator/denominator",
                    other.type_name()
                )))
            }
        };
        kind = kind.widen(k)?;
        match ratio {
            Some(r) => exact.push(r),
            None => inexact = true,
        }
    }
    if inexact {
        let floats = values.iter().map(Value::to_f64).collect::<Result<Vec<f64>>>()?;
        return Ok(Data::Inexact(floats));
    }
    Ok(Data::Exact { kind, values: exact })
}

fn exact_sum(values: &[Ratio]) -> Ratio {
    values
        .iter()
        .fold(Ratio::integer(BigInt::zero()), |acc, r| acc.add(r))
}

fn data_arg(ctx: &EvalContext, fname: &str, args: Args) -> Result<Vec<Value>> {
    let [data] = args.fixed(fname, ["data"])?;
    collect(ctx, &data)
}

// ═══════════════════════════════════════════════════════════════════════
// Averages
// ═══════════════════════════════════════════════════════════════════════

fn statistics_mean(ctx: &EvalContext, args: Args) -> Result<Value> {
    let data = data_arg(ctx, "mean", args)?;
    if data.is_empty() {
        return Err(statistics_error("mean requires at least one data point"));
    }
    let n = Ratio::integer(BigInt::from(data.len()));
    match classify(&data)? {
        Data::Exact { kind, values } => kind.convert(&exact_sum(&values).div(&n)?),
        Data::Inexact(floats) => Ok(Value::Float(floats.iter().sum::<f64>() / floats.len() as f64)),
    }
}

fn statistics_harmonic_mean(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([data], [weights]) = args.bind("harmonic_mean", ["data"], ["weights"])?;
    let data = collect(ctx, &data)?;
    if data.is_empty() {
        return Err(statistics_error("harmonic_mean requires at least one data point"));
    }
    let weights = match given(weights) {
        Some(w) => {
            let w = collect(ctx, &w)?;
            if w.len() != data.len() {
                return Err(statistics_error(
                    "Number of weights does not match data size",
                ));
            }
            w
        }
        None => vec![Value::from(1i64); data.len()],
    };
    let weighted = weights.iter().any(|w| !matches!(w, Value::Int(n) if n.is_one()));
    let Data::Exact { kind, values } = classify(&data)? else {
        return Ok(Value::Float(f64::NAN));
    };
    let Data::Exact { values: weights, .. } = classify(&weights)? else {
        return Ok(Value::Float(f64::NAN));
    };
    if values.iter().any(|r| r.num.is_negative()) || weights.iter().any(|w| w.num.is_negative()) {
        return Err(statistics_error(
            "harmonic mean does not support negative values",
        ));
    }
    if data.len() == 1 && !weighted {
        return Ok(data[0].clone());
    }
    if values.iter().any(|r| r.num.is_zero()) {
        return Ok(Value::from(0i64));
    }
    let kind = kind.max(Kind::Float);
    let mut denominator = Ratio::integer(BigInt::zero());
    for (x, w) in values.iter().zip(&weights) {
        denominator = denominator.add(&w.div(x)?);
    }
    if denominator.num.is_zero() {
        return Err(statistics_error("Weight sum must be positive"));
    }
    kind.convert(&exact_sum(&weights).div(&denominator)?)
}

fn sorted_data(ctx: &EvalContext, fname: &str, args: Args) -> Result<Vec<Value>> {
    let data = data_arg(ctx, fname, args)?;
    if data.is_empty() {
        return Err(statistics_error("no median for empty data"));
    }
    sort_values(ctx, data, None, false)
}

fn statistics_median(ctx: &EvalContext, args: Args) -> Result<Value> {
    let data = sorted_data(ctx, "median", args)?;
    let n = data.len();
    if n % 2 == 1 {
        return Ok(data[n / 2].clone());
    }
    let sum = ops::binary_op(ctx, BinaryOp::Add, &data[n / 2 - 1], &data[n / 2])?;
    ops::binary_op(ctx, BinaryOp::Div, &sum, &Value::from(2i64))
}

fn statistics_median_low(ctx: &EvalContext, args: Args) -> Result<Value> {
    let data = sorted_data(ctx, "median_low", args)?;
    let n = data.len();
    Ok(data[if n % 2 == 1 { n / 2 } else { n / 2 - 1 }].clone())
}

fn statistics_median_high(ctx: &EvalContext, args: Args) -> Result<Value> {
    let data = sorted_data(ctx, "median_high", args)?;
    Ok(data[data.len() / 2].clone())
}

fn statistics_median_grouped(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([data], [interval]) = args.bind("median_grouped", ["data"], ["interval"])?;
    let data = collect(ctx, &data)?;
    if data.is_empty() {
        return Err(statistics_error("no median for empty data"));
    }
    let data = sort_values(ctx, data, None, false)?;
    let n = data.len();
    let not_float = |_: EvalError| EvalError::type_error("Value cannot be converted to a float");
    let interval = match interval {
        Some(i) => i.to_f64().map_err(not_float)?,
        None => 1.0,
    };
    let points = data
        .iter()
        .map(|v| v.to_f64().map_err(not_float))
        .collect::<Result<Vec<f64>>>()?;
    let x = points[n / 2];
    let lower = x - interval / 2.0;
    let below = points.partition_point(|p| *p < x);
    let through = points.partition_point(|p| *p <= x);
    let frequency = (through - below) as f64;
    Ok(Value::Float(
        lower + interval * (n as f64 / 2.0 - below as f64) / frequency,
    ))
}

fn statistics_mode(ctx: &EvalContext, args: Args) -> Result<Value> {
    let data = data_arg(ctx, "mode", args)?;
    let mut counts: IndexMap<HashKey, usize> = IndexMap::new();
    for item in data {
        *counts.entry(HashKey::new(item)?).or_insert(0) += 1;
    }
    let mut best: Option<(&HashKey, usize)> = None;
    for (key, count) in &counts {
        if best.map_or(true, |(_, top)| *count > top) {
            best = Some((key, *count));
        }
    }
    best.map(|(key, _)| key.value().clone())
        .ok_or_else(|| statistics_error("no mode for empty data"))
}

// ═══════════════════════════════════════════════════════════════════════
// Spread
// ═══════════════════════════════════════════════════════════════════════

/// Sum of squared deviations about `centre` (or the exact mean).
fn squared_deviations(values: &[Ratio], centre: Option<Ratio>) -> Result<Ratio> {
    let n = Ratio::integer(BigInt::from(values.len()));
    let centre = match centre {
        Some(c) => c,
        None => exact_sum(values).div(&n)?,
    };
    let mut total = Ratio::integer(BigInt::zero());
    let mut drift = Ratio::integer(BigInt::zero());
    for x in values {
        let d = x.sub(&centre);
        total = total.add(&d.mul(&d));
        drift = drift.add(&d);
    }
    Ok(total.sub(&drift.mul(&drift).div(&n)?))
}

fn centre_arg(value: Option<Value>) -> Result<Option<Ratio>> {
    let Some(value) = given(value) else {
        return Ok(None);
    };
    match classify(std::slice::from_ref(&value))? {
        Data::Exact { mut values, .. } => Ok(values.pop()),
        Data::Inexact(_) => Ok(None),
    }
}

fn inexact_variance(floats: &[f64], ddof: usize) -> f64 {
    let n = floats.len() as f64;
    let mean = floats.iter().sum::<f64>() / n;
    floats.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - ddof as f64)
}

/// Variance as an exact ratio plus the result kind.
fn variance(
    ctx: &EvalContext,
    fname: &str,
    centre_name: &str,
    ddof: usize,
    args: Args,
) -> Result<std::result::Result<(Kind, Ratio), f64>> {
    let ([data], [centre]) = args.bind(fname, ["data"], [centre_name])?;
    let data = collect(ctx, &data)?;
    if data.len() < ddof + 1 {
        let message = if ddof == 1 {
            format!("{} requires at least two data points", fname)
        } else {
            format!("{} requires at least one data point", fname)
        };
        return Err(EvalError::value_error(message));
    }
    match classify(&data)? {
        Data::Exact { kind, values } => {
            let ss = squared_deviations(&values, centre_arg(centre)?)?;
            let divisor = Ratio::integer(BigInt::from(values.len() - ddof));
            Ok(Ok((kind, ss.div(&divisor)?)))
        }
        Data::Inexact(floats) => Ok(Err(inexact_variance(&floats, ddof))),
    }
}

fn finish_variance(result: std::result::Result<(Kind, Ratio), f64>) -> Result<Value> {
    match result {
        Ok((kind, var)) => kind.convert(&var),
        Err(f) => Ok(Value::Float(f)),
    }
}

fn finish_stdev(result: std::result::Result<(Kind, Ratio), f64>) -> Result<Value> {
    match result {
        Ok((Kind::Decimal, var)) => match Kind::Decimal.convert(&var)? {
            Value::Decimal(d) => d.sqrt().map(Value::Decimal),
            other => Ok(other),
        },
        Ok((_, var)) => Ok(Value::Float(int_true_div(&var.num, &var.den)?.sqrt())),
        Err(f) => Ok(Value::Float(f.sqrt())),
    }
}

fn statistics_pvariance(ctx: &EvalContext, args: Args) -> Result<Value> {
    finish_variance(variance(ctx, "pvariance", "mu", 0, args)?)
}

fn statistics_variance(ctx: &EvalContext, args: Args) -> Result<Value> {
    finish_variance(variance(ctx, "variance", "xbar", 1, args)?)
}

fn statistics_pstdev(ctx: &EvalContext, args: Args) -> Result<Value> {
    finish_stdev(variance(ctx, "pstdev", "mu", 0, args)?)
}

fn statistics_stdev(ctx: &EvalContext, args: Args) -> Result<Value> {
    finish_stdev(variance(ctx, "stdev", "xbar", 1, args)?)
}

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    let func: fn(&EvalContext, Args) -> Result<Value> = match name {
        "mean" => statistics_mean,
        "harmonic_mean" => statistics_harmonic_mean,
        "median" => statistics_median,
        "median_low" => statistics_median_low,
        "median_high" => statistics_median_high,
        "median_grouped" => statistics_median_grouped,
        "mode" => statistics_mode,
        "pstdev" => statistics_pstdev,
        "pvariance" => statistics_pvariance,
        "stdev" => statistics_stdev,
        "variance" => statistics_variance,
        _ => return None,
    };
    Some(builtin(name, func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().map(|n| Value::from(*n)).collect())
    }

    fn run(name: &'static str, data: Value) -> String {
        let ctx = EvalContext::new();
        let Some(Value::Builtin(f)) = module_attr(name) else {
            panic!("statistics.{} missing", name);
        };
        match f.call(&ctx, Args::positional(vec![data])) {
            Ok(v) => v.repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_mean_preserves_type() {
        assert_eq!(run("mean", ints(&[1, 2, 3])), "2");
        assert_eq!(run("mean", ints(&[1, 2, 3, 4])), "2.5");
        let floats = Value::list(vec![Value::Float(0.1), Value::Float(0.2), Value::Float(0.3)]);
        assert_eq!(run("mean", floats), "0.2");
        let decimals = Value::list(vec![
            Value::Decimal(Decimal::parse("0.5").unwrap()),
            Value::Decimal(Decimal::parse("0.75").unwrap()),
        ]);
        assert_eq!(run("mean", decimals), "Decimal('0.625')");
        assert_eq!(
            run("mean", ints(&[])),
            "ValueError: mean requires at least one data point"
        );
    }

    #[test]
    fn test_medians() {
        assert_eq!(run("median", ints(&[3, 1, 4, 2])), "2.5");
        assert_eq!(run("median_low", ints(&[3, 1, 4, 2])), "2");
        assert_eq!(run("median_high", ints(&[3, 1, 4, 2])), "3");
        assert_eq!(run("median_grouped", ints(&[1, 2, 2, 3, 4, 4, 4, 4, 4, 5])), "3.7");
    }

    #[test]
    fn test_mode_first_wins() {
        assert_eq!(run("mode", ints(&[1, 2, 2, 3, 3])), "2");
        assert_eq!(run("mode", ints(&[])), "ValueError: no mode for empty data");
    }

    #[test]
    fn test_variance_family() {
        let data = ints(&[2, 4, 4, 4, 5, 5, 7, 9]);
        assert_eq!(run("pvariance", data.clone()), "4");
        assert_eq!(run("pstdev", data.clone()), "2.0");
        assert_eq!(run("variance", ints(&[1, 2, 3, 4])), "1.6666666666666667");
        assert_eq!(
            run("variance", ints(&[1])),
            "ValueError: variance requires at least two data points"
        );
    }

    #[test]
    fn test_mixed_float_decimal_is_rejected() {
        let mixed = Value::list(vec![
            Value::Float(1.0),
            Value::Decimal(Decimal::parse("2").unwrap()),
        ]);
        assert_eq!(
            run("mean", mixed),
            "TypeError: don't know how to coerce float and Decimal"
        );
    }

    #[test]
    fn test_harmonic_mean() {
        assert_eq!(run("harmonic_mean", ints(&[40, 60])), "48.0");
        assert_eq!(run("harmonic_mean", ints(&[5])), "5");
        assert_eq!(run("harmonic_mean", ints(&[1, 0])), "0");
    }
}
