//! Call evaluation
//!
//! The callee is an ordinary expression, so it has already passed name or
//! attribute resolution by the time it is applied: nothing outside the
//! capability tables can be called.

use rustpython_parser::ast;

use super::{not_implemented, Evaluate};
use crate::builtins::{call_value, Args};
use crate::error::{EvalError, Result};
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprCall {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let func = self.func.eval(env, ctx)?;
        let args = eval_args(&self.args, &self.keywords, env, ctx)?;
        call_value(ctx, &func, args)
    }
}

/// Evaluate positional then keyword arguments in source order.
///
/// # Errors
///
/// Returns errors from argument evaluation, or a TypeError for a repeated
/// keyword.
pub fn eval_args(
    positional: &[ast::Expr],
    keywords: &[ast::Keyword],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Args> {
    let mut args = Args::new();
    for arg in positional {
        if let ast::Expr::Starred(_) = arg {
            return Err(not_implemented("argument unpacking"));
        }
        args.positional.push(arg.eval(env, ctx)?);
    }
    for keyword in keywords {
        let Some(name) = &keyword.arg else {
            return Err(not_implemented("keyword argument unpacking"));
        };
        let value = keyword.value.eval(env, ctx)?;
        if args.keywords.insert(name.as_str().to_string(), value).is_some() {
            return Err(EvalError::type_error(format!(
                "keyword argument repeated: {}",
                name.as_str()
            )));
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_calls() {
        assert_eq!(show("len('abc')"), "3");
        assert_eq!(show("max([3, 1, 2])"), "3");
        assert_eq!(show("sorted([3, 1, 2], reverse=True)"), "[3, 2, 1]");
        assert_eq!(show("int('ff', 16)"), "255");
    }

    #[test]
    fn test_method_calls() {
        assert_eq!(show("'a,b'.split(',')"), "['a', 'b']");
        assert_eq!(show("math.sqrt(16)"), "4.0");
    }

    #[test]
    fn test_not_callable() {
        assert_eq!(show("1()"), "TypeError: 'int' object is not callable");
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(
            show("len('a', key=1)"),
            "TypeError: len() got an unexpected keyword argument 'key'"
        );
    }
}
