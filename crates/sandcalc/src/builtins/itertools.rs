//! The `itertools` namespace
//!
//! Results are materialised up front and handed back as iterators, except
//! `filterfalse`, which stays lazy. Combinatoric generators check their
//! output size against the collection cap before producing anything.

use super::{builtin, call_value, given, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::ops::{self, BinaryOp};
use crate::value::{check_len, collect, iterate, Value, ValueIter};

fn finished(kind: &'static str, items: Vec<Value>) -> Value {
    Value::iterator(ValueIter::from_vec(kind, items))
}

fn call1(ctx: &EvalContext, func: &Value, arg: Value) -> Result<Value> {
    call_value(ctx, func, Args::positional(vec![arg]))
}

/// Reject a combinatoric result larger than the collection cap.
fn check_count(count: Option<u128>) -> Result<()> {
    let count = count
        .and_then(|c| usize::try_from(c).ok())
        .unwrap_or(usize::MAX);
    check_len(count)
}

fn r_arg(value: Option<Value>, default: usize) -> Result<usize> {
    match given(value) {
        None => Ok(default),
        Some(v) => {
            if v.to_index()?.sign() == num_bigint::Sign::Minus {
                return Err(EvalError::value_error("r must be non-negative"));
            }
            v.to_count()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Terminating iterators
// ═══════════════════════════════════════════════════════════════════════

fn itertools_accumulate(ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let initial = args.take_keyword("initial");
    let ([iterable], [func]) = args.bind("accumulate", ["iterable"], ["func"])?;
    let func = given(func);
    let mut out = Vec::new();
    let mut total = given(initial);
    if let Some(start) = &total {
        out.push(start.clone());
    }
    for item in collect(ctx, &iterable)? {
        let next = match total {
            None => item,
            Some(acc) => match &func {
                Some(f) => call_value(ctx, f, Args::positional(vec![acc, item]))?,
                None => ops::binary_op(ctx, BinaryOp::Add, &acc, &item)?,
            },
        };
        out.push(next.clone());
        total = Some(next);
    }
    Ok(finished("accumulate", out))
}

fn itertools_chain(ctx: &EvalContext, args: Args) -> Result<Value> {
    args.no_keywords("chain")?;
    let mut out = Vec::new();
    for iterable in &args.positional {
        out.extend(collect(ctx, iterable)?);
        check_len(out.len())?;
    }
    Ok(finished("chain", out))
}

fn itertools_compress(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [data, selectors] = args.fixed("compress", ["data", "selectors"])?;
    let data = collect(ctx, &data)?;
    let selectors = collect(ctx, &selectors)?;
    let out = data
        .into_iter()
        .zip(selectors)
        .filter_map(|(item, keep)| keep.truthy().then_some(item))
        .collect();
    Ok(finished("compress", out))
}

fn itertools_dropwhile(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [predicate, iterable] = args.fixed("dropwhile", ["predicate", "iterable"])?;
    let items = collect(ctx, &iterable)?;
    let mut start = items.len();
    for (i, item) in items.iter().enumerate() {
        if !call1(ctx, &predicate, item.clone())?.truthy() {
            start = i;
            break;
        }
    }
    Ok(finished("dropwhile", items[start..].to_vec()))
}

fn itertools_takewhile(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [predicate, iterable] = args.fixed("takewhile", ["predicate", "iterable"])?;
    let mut source = iterate(&iterable)?;
    let mut out = Vec::new();
    while let Some(item) = source.next(ctx)? {
        ctx.check_interrupt()?;
        if !call1(ctx, &predicate, item.clone())?.truthy() {
            break;
        }
        out.push(item);
        check_len(out.len())?;
    }
    Ok(finished("takewhile", out))
}

fn itertools_filterfalse(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [predicate, iterable] = args.fixed("filterfalse", ["function", "iterable"])?;
    let source = iterate(&iterable)?;
    Ok(Value::iterator(ValueIter::filter(
        "filterfalse",
        predicate,
        source,
        false,
    )))
}

fn itertools_groupby(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([iterable], [key]) = args.bind("groupby", ["iterable"], ["key"])?;
    let key = given(key);
    let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
    for item in collect(ctx, &iterable)? {
        let k = match &key {
            Some(f) => call1(ctx, f, item.clone())?,
            None => item.clone(),
        };
        let same = match groups.last() {
            Some((last, _)) => last.py_eq(&k)?,
            None => false,
        };
        match groups.last_mut() {
            Some((_, members)) if same => members.push(item),
            _ => groups.push((k, vec![item])),
        }
    }
    let out = groups
        .into_iter()
        .map(|(k, members)| Value::tuple(vec![k, finished("_grouper", members)]))
        .collect();
    Ok(finished("groupby", out))
}

fn itertools_starmap(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [function, iterable] = args.fixed("starmap", ["function", "iterable"])?;
    let mut out = Vec::new();
    for item in collect(ctx, &iterable)? {
        let call_args = collect(ctx, &item)?;
        out.push(call_value(ctx, &function, Args::positional(call_args))?);
    }
    Ok(finished("starmap", out))
}

fn itertools_tee(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([iterable], [n]) = args.bind("tee", ["iterable"], ["n"])?;
    let n = match n {
        Some(n) => {
            let n = n.to_i64()?;
            if n < 0 {
                return Err(EvalError::value_error("n must be >= 0"));
            }
            n as usize
        }
        None => 2,
    };
    let items = collect(ctx, &iterable)?;
    check_len(items.len().saturating_mul(n))?;
    let copies = (0..n).map(|_| finished("_tee", items.clone())).collect();
    Ok(Value::tuple(copies))
}

fn itertools_zip_longest(ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let fill = args.take_keyword("fillvalue").unwrap_or(Value::None);
    args.no_keywords("zip_longest")?;
    let columns = args
        .positional
        .iter()
        .map(|iterable| collect(ctx, iterable))
        .collect::<Result<Vec<_>>>()?;
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
    let out = (0..rows)
        .map(|i| {
            Value::tuple(
                columns
                    .iter()
                    .map(|column| column.get(i).cloned().unwrap_or_else(|| fill.clone()))
                    .collect(),
            )
        })
        .collect();
    Ok(finished("zip_longest", out))
}

// ═══════════════════════════════════════════════════════════════════════
// Combinatoric iterators
// ═══════════════════════════════════════════════════════════════════════

fn pick(pool: &[Value], indices: &[usize]) -> Value {
    Value::tuple(indices.iter().map(|&i| pool[i].clone()).collect())
}

fn falling(n: usize, r: usize) -> Option<u128> {
    (0..r).try_fold(1u128, |acc, k| acc.checked_mul((n - k) as u128))
}

fn binomial(n: usize, r: usize) -> Option<u128> {
    let r = r.min(n - r);
    (0..r).try_fold(1u128, |acc, k| {
        acc.checked_mul((n - k) as u128).map(|v| v / (k as u128 + 1))
    })
}

fn itertools_product(ctx: &EvalContext, mut args: Args) -> Result<Value> {
    let repeat = match args.take_keyword("repeat") {
        Some(r) => {
            let r = r.to_i64()?;
            if r < 0 {
                return Err(EvalError::value_error("repeat argument cannot be negative"));
            }
            r as usize
        }
        None => 1,
    };
    args.no_keywords("product")?;
    let pools = args
        .positional
        .iter()
        .map(|iterable| collect(ctx, iterable))
        .collect::<Result<Vec<_>>>()?;
    let pools: Vec<&Vec<Value>> = (0..repeat).flat_map(|_| pools.iter()).collect();
    check_count(
        pools
            .iter()
            .try_fold(1u128, |acc, pool| acc.checked_mul(pool.len() as u128)),
    )?;

    let mut rows: Vec<Vec<Value>> = vec![Vec::new()];
    for pool in pools {
        ctx.check_interrupt()?;
        rows = rows
            .iter()
            .flat_map(|row| {
                pool.iter().map(move |item| {
                    let mut next = row.clone();
                    next.push(item.clone());
                    next
                })
            })
            .collect();
    }
    Ok(finished("product", rows.into_iter().map(Value::tuple).collect()))
}

fn itertools_permutations(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([iterable], [r]) = args.bind("permutations", ["iterable"], ["r"])?;
    let pool = collect(ctx, &iterable)?;
    let n = pool.len();
    let r = r_arg(r, n)?;
    if r > n {
        return Ok(finished("permutations", Vec::new()));
    }
    check_count(falling(n, r))?;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut cycles: Vec<usize> = (n - r + 1..=n).rev().collect();
    let mut out = vec![pick(&pool, &indices[..r])];
    'outer: loop {
        if out.len() % 1024 == 0 {
            ctx.check_interrupt()?;
        }
        for i in (0..r).rev() {
            cycles[i] -= 1;
            if cycles[i] == 0 {
                indices[i..].rotate_left(1);
                cycles[i] = n - i;
            } else {
                let j = cycles[i];
                indices.swap(i, n - j);
                out.push(pick(&pool, &indices[..r]));
                continue 'outer;
            }
        }
        break;
    }
    Ok(finished("permutations", out))
}

fn itertools_combinations(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [iterable, r] = args.fixed("combinations", ["iterable", "r"])?;
    let pool = collect(ctx, &iterable)?;
    let n = pool.len();
    let r = r_arg(Some(r), n)?;
    if r > n {
        return Ok(finished("combinations", Vec::new()));
    }
    check_count(binomial(n, r))?;

    let mut indices: Vec<usize> = (0..r).collect();
    let mut out = vec![pick(&pool, &indices)];
    loop {
        if out.len() % 1024 == 0 {
            ctx.check_interrupt()?;
        }
        let Some(i) = (0..r).rev().find(|&i| indices[i] != i + n - r) else {
            break;
        };
        indices[i] += 1;
        for j in i + 1..r {
            indices[j] = indices[j - 1] + 1;
        }
        out.push(pick(&pool, &indices));
    }
    Ok(finished("combinations", out))
}

fn itertools_combinations_with_replacement(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [iterable, r] = args.fixed("combinations_with_replacement", ["iterable", "r"])?;
    let pool = collect(ctx, &iterable)?;
    let n = pool.len();
    let r = r_arg(Some(r), n)?;
    if n == 0 && r > 0 {
        return Ok(finished("combinations_with_replacement", Vec::new()));
    }
    check_count(if n == 0 { Some(1) } else { binomial(n + r - 1, r) })?;

    let mut indices = vec![0usize; r];
    let mut out = vec![pick(&pool, &indices)];
    loop {
        if out.len() % 1024 == 0 {
            ctx.check_interrupt()?;
        }
        let Some(i) = (0..r).rev().find(|&i| indices[i] != n - 1) else {
            break;
        };
        let next = indices[i] + 1;
        indices[i..].fill(next);
        out.push(pick(&pool, &indices));
    }
    Ok(finished("combinations_with_replacement", out))
}

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    let func: fn(&EvalContext, Args) -> Result<Value> = match name {
        "accumulate" => itertools_accumulate,
        "chain" => itertools_chain,
        "compress" => itertools_compress,
        "dropwhile" => itertools_dropwhile,
        "filterfalse" => itertools_filterfalse,
        "groupby" => itertools_groupby,
        "starmap" => itertools_starmap,
        "takewhile" => itertools_takewhile,
        "tee" => itertools_tee,
        "zip_longest" => itertools_zip_longest,
        "product" => itertools_product,
        "permutations" => itertools_permutations,
        "combinations" => itertools_combinations,
        "combinations_with_replacement" => itertools_combinations_with_replacement,
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

    fn run(name: &'static str, args: Args) -> String {
        let ctx = EvalContext::new();
        let Some(Value::Builtin(f)) = module_attr(name) else {
            panic!("itertools.{} missing", name);
        };
        match f.call(&ctx, args) {
            Ok(result) => Value::list(collect(&ctx, &result).unwrap()).repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_permutations_order() {
        let out = run(
            "permutations",
            Args::positional(vec![ints(&[1, 2, 3]), Value::from(2i64)]),
        );
        assert_eq!(out, "[(1, 2), (1, 3), (2, 1), (2, 3), (3, 1), (3, 2)]");
    }

    #[test]
    fn test_combinations() {
        let out = run(
            "combinations",
            Args::positional(vec![ints(&[1, 2, 3, 4]), Value::from(2i64)]),
        );
        assert_eq!(out, "[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]");
        let out = run(
            "combinations_with_replacement",
            Args::positional(vec![ints(&[1, 2]), Value::from(2i64)]),
        );
        assert_eq!(out, "[(1, 1), (1, 2), (2, 2)]");
    }

    #[test]
    fn test_product_with_repeat() {
        let mut args = Args::positional(vec![ints(&[0, 1])]);
        args.keywords.insert("repeat".to_string(), Value::from(2i64));
        assert_eq!(run("product", args), "[(0, 0), (0, 1), (1, 0), (1, 1)]");
    }

    #[test]
    fn test_product_size_is_capped() {
        let big = Value::Range(crate::value::Range {
            start: 0,
            stop: 100_000,
            step: 1,
        });
        let out = run("product", Args::positional(vec![big.clone(), big]));
        assert!(out.starts_with("MemoryError"), "{}", out);
    }

    #[test]
    fn test_accumulate_and_groupby() {
        assert_eq!(
            run("accumulate", Args::positional(vec![ints(&[1, 2, 3])])),
            "[1, 3, 6]"
        );
        let ctx = EvalContext::new();
        let Some(Value::Builtin(groupby)) = module_attr("groupby") else {
            panic!("groupby missing");
        };
        let groups = groupby
            .call(&ctx, Args::positional(vec![Value::str("aabccc")]))
            .unwrap();
        let keys: Vec<String> = collect(&ctx, &groups)
            .unwrap()
            .iter()
            .map(|pair| match pair {
                Value::Tuple(kv) => {
                    let members = collect(&ctx, &kv[1]).unwrap().len();
                    format!("{}{}", kv[0], members)
                }
                other => other.repr(),
            })
            .collect();
        assert_eq!(keys, vec!["a2", "b1", "c3"]);
    }

    #[test]
    fn test_zip_longest_fill() {
        let mut args = Args::positional(vec![ints(&[1, 2, 3]), ints(&[4])]);
        args.keywords.insert("fillvalue".to_string(), Value::from(0i64));
        assert_eq!(run("zip_longest", args), "[(1, 4), (2, 0), (3, 0)]");
    }
}
