//! The `random` namespace
//!
//! Draws come from `rand::thread_rng()`. The distribution algorithms are
//! the classic ones (Kinderman-Monahan, Marsaglia-style gamma, Best-Fisher
//! von Mises), written against any `Rng` so tests can seed them.

use std::f64::consts::{E, PI, TAU};

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, Zero};
use rand::Rng;

use super::{builtin, given, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::{check_len, collect, get_item, Value};

const LOG4: f64 = 1.386_294_361_119_890_6;
const SG_MAGICCONST: f64 = 2.504_077_396_776_274;
const NV_MAGICCONST: f64 = 1.715_527_769_921_413_5;

// ═══════════════════════════════════════════════════════════════════════
// Core draws
// ═══════════════════════════════════════════════════════════════════════

fn unit<R: Rng>(rng: &mut R) -> f64 {
    rng.gen::<f64>()
}

/// Uniform integer in `[0, n)` by rejection sampling on `n.bits()` bits.
fn below<R: Rng>(rng: &mut R, n: &BigUint) -> BigUint {
    let bits = n.bits();
    if bits == 0 {
        return BigUint::zero();
    }
    let nbytes = bits.div_ceil(8) as usize;
    let excess = nbytes as u64 * 8 - bits;
    let mut buf = vec![0u8; nbytes];
    loop {
        rng.fill(&mut buf[..]);
        let candidate = BigUint::from_bytes_le(&buf) >> excess;
        if &candidate < n {
            return candidate;
        }
    }
}

fn below_usize<R: Rng>(rng: &mut R, n: usize) -> usize {
    rng.gen_range(0..n)
}

fn randrange<R: Rng>(rng: &mut R, start: &BigInt, stop: &BigInt, step: &BigInt) -> Result<BigInt> {
    if step.is_zero() {
        return Err(EvalError::value_error("zero step for randrange()"));
    }
    let width = stop - start;
    let count = if step.is_positive() {
        Integer::div_floor(&(&width + step - 1u32), step)
    } else {
        Integer::div_floor(&(&width + step + 1u32), step)
    };
    match count.to_biguint() {
        Some(n) if !n.is_zero() => {
            let pick = BigInt::from_biguint(Sign::Plus, below(rng, &n));
            Ok(start + step * pick)
        }
        _ => Err(EvalError::value_error(format!(
            "empty range for randrange() ({}, {}, {})",
            start, stop, step
        ))),
    }
}

fn gammavariate<R: Rng>(rng: &mut R, alpha: f64, beta: f64) -> Result<f64> {
    if alpha <= 0.0 || beta <= 0.0 {
        return Err(EvalError::value_error(
            "gammavariate: alpha and beta must be > 0.0",
        ));
    }
    if alpha > 1.0 {
        let ainv = (2.0 * alpha - 1.0).sqrt();
        let bbb = alpha - LOG4;
        let ccc = alpha + ainv;
        loop {
            let u1 = unit(rng);
            if !(1e-7 < u1 && u1 < 0.999_999_9) {
                continue;
            }
            let u2 = 1.0 - unit(rng);
            let v = (u1 / (1.0 - u1)).ln() / ainv;
            let x = alpha * v.exp();
            let z = u1 * u1 * u2;
            let r = bbb + ccc * v - x;
            if r + SG_MAGICCONST - 4.5 * z >= 0.0 || r >= z.ln() {
                return Ok(x * beta);
            }
        }
    }
    if alpha == 1.0 {
        return Ok(-(1.0 - unit(rng)).ln() * beta);
    }
    loop {
        let u = unit(rng);
        let b = (E + alpha) / E;
        let p = b * u;
        let x = if p <= 1.0 {
            p.powf(1.0 / alpha)
        } else {
            -((b - p) / alpha).ln()
        };
        let u1 = unit(rng);
        let accept = if p > 1.0 {
            u1 <= x.powf(alpha - 1.0)
        } else {
            u1 <= (-x).exp()
        };
        if accept {
            return Ok(x * beta);
        }
    }
}

fn normalvariate<R: Rng>(rng: &mut R, mu: f64, sigma: f64) -> f64 {
    loop {
        let u1 = unit(rng);
        let u2 = 1.0 - unit(rng);
        let z = NV_MAGICCONST * (u1 - 0.5) / u2;
        if z * z / 4.0 <= -u2.ln() {
            return mu + z * sigma;
        }
    }
}

fn vonmisesvariate<R: Rng>(rng: &mut R, mu: f64, kappa: f64) -> f64 {
    if kappa <= 1e-6 {
        return TAU * unit(rng);
    }
    let s = 0.5 / kappa;
    let r = s + (1.0 + s * s).sqrt();
    let z = loop {
        let u1 = unit(rng);
        let z = (PI * u1).cos();
        let d = z / (r + z);
        let u2 = unit(rng);
        if u2 < 1.0 - d * d || u2 <= (1.0 - d) * d.exp() {
            break z;
        }
    };
    let q = 1.0 / r;
    let f = (q + z) / (1.0 + q * z);
    if unit(rng) > 0.5 {
        (mu + f.acos()).rem_euclid(TAU)
    } else {
        (mu - f.acos()).rem_euclid(TAU)
    }
}

/// Fisher-Yates, in place.
fn shuffle<R: Rng>(rng: &mut R, items: &mut [Value]) {
    for i in (1..items.len()).rev() {
        let j = below_usize(rng, i + 1);
        items.swap(i, j);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Argument helpers
// ═══════════════════════════════════════════════════════════════════════

fn float_or(value: Option<Value>, default: f64) -> Result<f64> {
    match given(value) {
        Some(v) => v.to_f64(),
        None => Ok(default),
    }
}

fn integer(value: &Value, fname: &str) -> Result<BigInt> {
    match value {
        Value::Bool(_) | Value::Int(_) | Value::Decimal(_) => value.to_index(),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => super::functions::float_to_int(*f),
        other => Err(EvalError::type_error(format!(
            "{}() argument must be an integer, not '{}'",
            fname,
            other.type_name()
        ))),
    }
}

/// Length of an indexable population.
fn sequence_len(value: &Value) -> Result<usize> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::Bytes(b) => Ok(b.len()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Tuple(items) => Ok(items.len()),
        Value::Range(r) => Ok(r.len().max(0) as usize),
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Module functions
// ═══════════════════════════════════════════════════════════════════════

fn random_random(_ctx: &EvalContext, args: Args) -> Result<Value> {
    args.fixed("random", [])?;
    Ok(Value::Float(unit(&mut rand::thread_rng())))
}

fn random_uniform(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("uniform", ["a", "b"])?;
    let (a, b) = (a.to_f64()?, b.to_f64()?);
    Ok(Value::Float(a + (b - a) * unit(&mut rand::thread_rng())))
}

fn random_randrange(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([start], [stop, step]) = args.bind("randrange", ["start"], ["stop", "step"])?;
    let first = integer(&start, "randrange")?;
    let (start, stop) = match given(stop) {
        Some(stop) => (first, integer(&stop, "randrange")?),
        None => (BigInt::zero(), first),
    };
    let step = match step {
        Some(step) => integer(&step, "randrange")?,
        None => BigInt::from(1),
    };
    randrange(&mut rand::thread_rng(), &start, &stop, &step).map(Value::Int)
}

fn random_randint(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("randint", ["a", "b"])?;
    let a = integer(&a, "randint")?;
    let b = integer(&b, "randint")? + 1;
    randrange(&mut rand::thread_rng(), &a, &b, &BigInt::from(1)).map(Value::Int)
}

fn random_choice(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [seq] = args.fixed("choice", ["seq"])?;
    let len = sequence_len(&seq)?;
    if len == 0 {
        return Err(EvalError::index_error(
            "Cannot choose from an empty sequence",
        ));
    }
    let index = below_usize(&mut rand::thread_rng(), len);
    get_item(&seq, &Value::from(index))
}

fn random_choices(ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let cum_weights = given(args.take_keyword("cum_weights"));
    let k = match args.take_keyword("k") {
        Some(k) => k.to_count()?,
        None => 1,
    };
    let ([population], [weights]) = args.bind("choices", ["population"], ["weights"])?;
    let population = collect(ctx, &population)?;
    check_len(k)?;
    let n = population.len();
    let mut rng = rand::thread_rng();

    let cumulative = match (given(weights), cum_weights) {
        (Some(_), Some(_)) => {
            return Err(EvalError::type_error(
                "Cannot specify both weights and cumulative weights",
            ))
        }
        (None, None) => {
            if n == 0 {
                return Err(EvalError::index_error(
                    "Cannot choose from an empty sequence",
                ));
            }
            let picks = (0..k)
                .map(|_| population[(unit(&mut rng) * n as f64) as usize % n].clone())
                .collect();
            return Ok(Value::list(picks));
        }
        (Some(weights), None) => {
            let mut total = 0.0;
            collect(ctx, &weights)?
                .iter()
                .map(|w| {
                    total += w.to_f64()?;
                    Ok(total)
                })
                .collect::<Result<Vec<f64>>>()?
        }
        (None, Some(cum)) => collect(ctx, &cum)?
            .iter()
            .map(Value::to_f64)
            .collect::<Result<Vec<f64>>>()?,
    };
    if cumulative.len() != n {
        return Err(EvalError::value_error(
            "The number of weights does not match the population",
        ));
    }
    let total = cumulative.last().copied().unwrap_or(0.0);
    if total <= 0.0 {
        return Err(EvalError::value_error(
            "Total of weights must be greater than zero",
        ));
    }
    if !total.is_finite() {
        return Err(EvalError::value_error("Total of weights must be finite"));
    }
    let picks = (0..k)
        .map(|_| {
            let target = unit(&mut rng) * total;
            let index = cumulative.partition_point(|c| *c <= target).min(n - 1);
            population[index].clone()
        })
        .collect();
    Ok(Value::list(picks))
}

fn random_shuffle(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [x] = args.fixed("shuffle", ["x"])?;
    let Value::List(list) = &x else {
        return Err(EvalError::type_error(format!(
            "'{}' object does not support item assignment",
            x.type_name()
        )));
    };
    let mut items = list.borrow().clone();
    shuffle(&mut rand::thread_rng(), &mut items);
    *list.borrow_mut() = items;
    Ok(Value::None)
}

fn random_sample(ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let counts = given(args.take_keyword("counts"));
    let [population, k] = args.fixed("sample", ["population", "k"])?;
    if matches!(population, Value::Set(_) | Value::FrozenSet(_) | Value::Dict(_)) {
        return Err(EvalError::type_error(
            "Population must be a sequence.  For dicts or sets, use sorted(d).",
        ));
    }
    let mut pool = collect(ctx, &population)?;
    if let Some(counts) = counts {
        let counts = collect(ctx, &counts)?;
        if counts.len() != pool.len() {
            return Err(EvalError::value_error(
                "The number of counts does not match the population",
            ));
        }
        let mut expanded = Vec::new();
        for (item, count) in pool.iter().zip(&counts) {
            let count = count.to_count()?;
            check_len(expanded.len().saturating_add(count))?;
            expanded.extend(std::iter::repeat(item.clone()).take(count));
        }
        pool = expanded;
    }
    let k = k.to_i64()?;
    if k < 0 || k as usize > pool.len() {
        return Err(EvalError::value_error(
            "Sample larger than population or is negative",
        ));
    }
    let k = k as usize;
    let mut rng = rand::thread_rng();
    for i in 0..k {
        let j = i + below_usize(&mut rng, pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(k);
    Ok(Value::list(pool))
}

fn random_triangular(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([], [low, high, mode]) = args.bind("triangular", [], ["low", "high", "mode"])?;
    let mut low = float_or(low, 0.0)?;
    let mut high = float_or(high, 1.0)?;
    let mut u = unit(&mut rand::thread_rng());
    let mut c = match given(mode) {
        None => 0.5,
        Some(mode) => {
            if high == low {
                return Ok(Value::Float(low));
            }
            (mode.to_f64()? - low) / (high - low)
        }
    };
    if u > c {
        u = 1.0 - u;
        c = 1.0 - c;
        std::mem::swap(&mut low, &mut high);
    }
    Ok(Value::Float(low + (high - low) * (u * c).sqrt()))
}

fn random_betavariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [alpha, beta] = args.fixed("betavariate", ["alpha", "beta"])?;
    let mut rng = rand::thread_rng();
    let y = gammavariate(&mut rng, alpha.to_f64()?, 1.0)?;
    if y == 0.0 {
        return Ok(Value::Float(0.0));
    }
    let other = gammavariate(&mut rng, beta.to_f64()?, 1.0)?;
    Ok(Value::Float(y / (y + other)))
}

fn random_expovariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([], [lambd]) = args.bind("expovariate", [], ["lambd"])?;
    let lambd = float_or(lambd, 1.0)?;
    if lambd == 0.0 {
        return Err(EvalError::zero_division("float division by zero"));
    }
    Ok(Value::Float(-(1.0 - unit(&mut rand::thread_rng())).ln() / lambd))
}

fn random_gammavariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [alpha, beta] = args.fixed("gammavariate", ["alpha", "beta"])?;
    gammavariate(&mut rand::thread_rng(), alpha.to_f64()?, beta.to_f64()?).map(Value::Float)
}

fn random_gauss(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([], [mu, sigma]) = args.bind("gauss", [], ["mu", "sigma"])?;
    let (mu, sigma) = (float_or(mu, 0.0)?, float_or(sigma, 1.0)?);
    let mut rng = rand::thread_rng();
    let angle = unit(&mut rng) * TAU;
    let radius = (-2.0 * (1.0 - unit(&mut rng)).ln()).sqrt();
    Ok(Value::Float(mu + angle.cos() * radius * sigma))
}

fn random_normalvariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([], [mu, sigma]) = args.bind("normalvariate", [], ["mu", "sigma"])?;
    let (mu, sigma) = (float_or(mu, 0.0)?, float_or(sigma, 1.0)?);
    Ok(Value::Float(normalvariate(&mut rand::thread_rng(), mu, sigma)))
}

fn random_lognormvariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [mu, sigma] = args.fixed("lognormvariate", ["mu", "sigma"])?;
    let z = normalvariate(&mut rand::thread_rng(), mu.to_f64()?, sigma.to_f64()?);
    Ok(Value::Float(z.exp()))
}

fn random_vonmisesvariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [mu, kappa] = args.fixed("vonmisesvariate", ["mu", "kappa"])?;
    let theta = vonmisesvariate(&mut rand::thread_rng(), mu.to_f64()?, kappa.to_f64()?);
    Ok(Value::Float(theta))
}

fn random_paretovariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [alpha] = args.fixed("paretovariate", ["alpha"])?;
    let alpha = alpha.to_f64()?;
    if alpha == 0.0 {
        return Err(EvalError::zero_division("float division by zero"));
    }
    let u = 1.0 - unit(&mut rand::thread_rng());
    Ok(Value::Float(u.powf(-1.0 / alpha)))
}

fn random_weibullvariate(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [alpha, beta] = args.fixed("weibullvariate", ["alpha", "beta"])?;
    let (alpha, beta) = (alpha.to_f64()?, beta.to_f64()?);
    if beta == 0.0 {
        return Err(EvalError::zero_division("float division by zero"));
    }
    let u = 1.0 - unit(&mut rand::thread_rng());
    Ok(Value::Float(alpha * (-u.ln()).powf(1.0 / beta)))
}

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    let func: fn(&EvalContext, Args) -> Result<Value> = match name {
        "randrange" => random_randrange,
        "randint" => random_randint,
        "choice" => random_choice,
        "choices" => random_choices,
        "shuffle" => random_shuffle,
        "sample" => random_sample,
        "random" => random_random,
        "uniform" => random_uniform,
        "triangular" => random_triangular,
        "betavariate" => random_betavariate,
        "expovariate" => random_expovariate,
        "gammavariate" => random_gammavariate,
        "gauss" => random_gauss,
        "lognormvariate" => random_lognormvariate,
        "normalvariate" => random_normalvariate,
        "vonmisesvariate" => random_vonmisesvariate,
        "paretovariate" => random_paretovariate,
        "weibullvariate" => random_weibullvariate,
        _ => return None,
    };
    Some(builtin(name, func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_randrange_stays_in_range() {
        let mut rng = seeded();
        let (start, stop, step) = (BigInt::from(10), BigInt::from(-10), BigInt::from(-3));
        for _ in 0..200 {
            let n = randrange(&mut rng, &start, &stop, &step).unwrap();
            assert!(n <= start && n > stop);
            assert!(((&n - &start) % &step).is_zero());
        }
        let err = randrange(&mut rng, &start, &start, &BigInt::from(1)).unwrap_err();
        assert_eq!(err.to_string(), "empty range for randrange() (10, 10, 1)");
    }

    #[test]
    fn test_below_handles_big_bounds() {
        let mut rng = seeded();
        let bound = BigUint::from(2u32).pow(200) + 1u32;
        for _ in 0..20 {
            assert!(below(&mut rng, &bound) < bound);
        }
        assert!(below(&mut rng, &BigUint::zero()).is_zero());
    }

    #[test]
    fn test_distributions_are_in_support() {
        let mut rng = seeded();
        for _ in 0..100 {
            assert!(gammavariate(&mut rng, 0.5, 2.0).unwrap() >= 0.0);
            assert!(gammavariate(&mut rng, 3.0, 1.0).unwrap() >= 0.0);
            let theta = vonmisesvariate(&mut rng, 1.0, 4.0);
            assert!((0.0..TAU).contains(&theta));
            assert!(normalvariate(&mut rng, 0.0, 1.0).is_finite());
        }
        assert!(gammavariate(&mut rng, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_shuffle_keeps_members() {
        let mut rng = seeded();
        let mut items: Vec<Value> = (0..20i64).map(Value::from).collect();
        shuffle(&mut rng, &mut items);
        let mut seen: Vec<i64> = items.iter().map(|v| v.to_i64().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_and_choice_errors() {
        let ctx = EvalContext::new();
        let err = random_sample(
            &ctx,
            Args::positional(vec![Value::list(vec![Value::from(1i64)]), Value::from(2i64)]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Sample larger than population or is negative");
        let err = random_choice(&ctx, Args::positional(vec![Value::list(vec![])])).unwrap_err();
        assert_eq!(err.to_string(), "Cannot choose from an empty sequence");
    }
}
