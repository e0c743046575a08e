//! Program-level entry points
//!
//! ```text
//! source ─parse─▶ Program ─policy check─▶ statements ─▶ Evaluation
//! ```
//!
//! Each evaluation gets a fresh [`Environment`]; nothing survives between
//! calls except the read-only capability tables.

use indexmap::IndexMap;
use rustpython_parser::ast;
use tracing::debug;

use crate::eval::control::outside_loop;
use crate::eval::{exec_stmt, policy, Evaluate, Flow};
use crate::frontend::{check_source, parse_program, Program};
use crate::{Environment, EvalContext, Result, Value};

/// Outcome of one successful evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Value of the last top-level statement, if that statement was an
    /// expression
    pub result: Option<Value>,

    /// Every binding left in the symbol table, in definition order
    pub locals: IndexMap<String, Value>,
}

/// Run a parsed program against a fresh symbol table.
///
/// The whole tree passes the policy check before the first statement runs,
/// so a rejected program never has side effects.
///
/// # Errors
///
/// Returns the first policy rejection or runtime error.
pub fn evaluate(program: &Program, ctx: &EvalContext) -> Result<Evaluation> {
    policy::check_program(&program.body)?;

    let mut env = Environment::new();
    let mut result = None;
    let last = program.body.len().saturating_sub(1);

    for (i, stmt) in program.body.iter().enumerate() {
        match stmt {
            ast::Stmt::Expr(expr) if i == last => {
                ctx.check_interrupt()?;
                result = Some(expr.value.eval(&mut env, ctx)?);
            }
            _ => match exec_stmt(stmt, &mut env, ctx)? {
                Flow::Normal => {}
                jump => return Err(outside_loop(jump)),
            },
        }
    }

    debug!(
        statements = program.body.len(),
        locals = env.len(),
        has_result = result.is_some(),
        "evaluation finished"
    );

    Ok(Evaluation {
        result,
        locals: env.into_bindings(),
    })
}

/// Parse and evaluate `source` in one step.
///
/// # Errors
///
/// Returns a size error for text rejected by [`check_source`], a syntax
/// error for malformed text, otherwise as [`evaluate`].
pub fn evaluate_source(source: &str, precision: bool) -> Result<Evaluation> {
    check_source(source)?;
    let program = parse_program(source)?;
    evaluate(&program, &EvalContext::with_precision(precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result_repr(source: &str, precision: bool) -> String {
        match evaluate_source(source, precision) {
            Ok(eval) => eval.result.map(|v| v.repr()).unwrap_or_default(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_last_expression_is_result() {
        assert_eq!(result_repr("x = 2\nx * 21", false), "42");
        assert_eq!(result_repr("1\nx = 2", false), "");
    }

    #[test]
    fn test_locals_in_order() {
        let eval = evaluate_source("b = 1\na = 2\nb = 3", false).unwrap();
        assert!(eval.result.is_none());
        let names: Vec<_> = eval.locals.keys().cloned().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(eval.locals["b"].repr(), "3");
    }

    #[test]
    fn test_precision_mode() {
        assert_eq!(result_repr("0.1 + 0.2", true), "Decimal('0.3')");
        assert_eq!(result_repr("0.1 + 0.2", false), "0.30000000000000004");
    }

    #[test]
    fn test_policy_runs_before_side_effects() {
        let program = parse_program("l = []\nl.append(1)\nimport os").unwrap();
        let err = evaluate(&program, &EvalContext::new()).unwrap_err();
        assert!(err.is_security());
    }

    #[test]
    fn test_none_result_is_kept() {
        let eval = evaluate_source("None", false).unwrap();
        assert!(matches!(eval.result, Some(Value::None)));
    }

    #[test]
    fn test_empty_program() {
        let eval = evaluate_source("", false).unwrap();
        assert!(eval.result.is_none());
        assert!(eval.locals.is_empty());
    }
}
