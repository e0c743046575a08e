//! The `functools` namespace

use super::{builtin, call_value, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::{iterate, Value};

/// `reduce(function, iterable[, initial])`.
fn functools_reduce(ctx: &EvalContext, args: Args) -> Result<Value> {
    args.no_keywords("reduce")?;
    let mut positional = args.positional.into_iter();
    let (Some(function), Some(iterable)) = (positional.next(), positional.next()) else {
        return Err(EvalError::type_error(
            "reduce expected at least 2 arguments",
        ));
    };
    let mut acc = positional.next();
    if positional.next().is_some() {
        return Err(EvalError::type_error("reduce expected at most 3 arguments"));
    }

    let mut source = iterate(&iterable)?;
    while let Some(item) = source.next(ctx)? {
        ctx.check_interrupt()?;
        acc = Some(match acc {
            None => item,
            Some(prev) => call_value(ctx, &function, Args::positional(vec![prev, item]))?,
        });
    }
    acc.ok_or_else(|| {
        EvalError::type_error("reduce() of empty iterable with no initial value")
    })
}

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    match name {
        "reduce" => Some(builtin(name, functools_reduce)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reduce() {
        let ctx = EvalContext::new();
        let add = capability::global("max").unwrap();
        let data = Value::list(vec![Value::from(3i64), Value::from(9i64), Value::from(4i64)]);
        let result = functools_reduce(&ctx, Args::positional(vec![add.clone(), data])).unwrap();
        assert_eq!(result.repr(), "9");

        let empty = Value::list(vec![]);
        let err = functools_reduce(&ctx, Args::positional(vec![add.clone(), empty.clone()]))
            .unwrap_err();
        assert_eq!(err.to_string(), "reduce() of empty iterable with no initial value");

        let seeded =
            functools_reduce(&ctx, Args::positional(vec![add, empty, Value::from(7i64)])).unwrap();
        assert_eq!(seeded.repr(), "7");
    }
}
