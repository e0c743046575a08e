//! Assignment, augmented assignment and deletion
//!
//! Targets are never evaluated as expressions. Each supported target shape
//! is matched here and everything else is a security error, so attribute
//! writes and other exotic targets can never reach a native object.

use rustpython_parser::ast;

use super::control::Flow;
use super::subscript::is_simple_index;
use super::{not_implemented, Evaluate};
use crate::error::{EvalError, Result};
use crate::ops::{self, BinaryOp};
use crate::value::{collect, del_item, get_item, set_item};
use crate::{Environment, EvalContext, Value};

const ASSIGN_DENIED: &str = "This assign method is not allowed";
const DELETE_DENIED: &str = "This delete method is not allowed";

// ═══════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════

/// `a = b = value`: evaluate once, bind every target in source order.
pub fn exec_assign(stmt: &ast::StmtAssign, env: &mut Environment, ctx: &EvalContext) -> Result<Flow> {
    let value = stmt.value.eval(env, ctx)?;
    for target in &stmt.targets {
        assign_target(target, value.clone(), env, ctx)?;
    }
    Ok(Flow::Normal)
}

/// `target op= value`.
///
/// Only a name or a subscript with a plain index may be the target. The
/// right-hand side is evaluated first, then the current value is read,
/// combined and written back.
pub fn exec_aug_assign(
    stmt: &ast::StmtAugAssign,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Flow> {
    let op = BinaryOp::from(stmt.op);
    match &*stmt.target {
        ast::Expr::Name(name) => {
            let rhs = stmt.value.eval(env, ctx)?;
            let current = env
                .get(name.id.as_str())
                .cloned()
                .ok_or_else(|| EvalError::UndefinedName {
                    name: name.id.as_str().to_string(),
                })?;
            let updated = ops::binary_op(ctx, op, &current, &rhs)?;
            env.define(name.id.as_str(), updated);
        }
        ast::Expr::Subscript(sub) if is_simple_index(&sub.slice) => {
            let rhs = stmt.value.eval(env, ctx)?;
            let container = sub.value.eval(env, ctx)?;
            let index = sub.slice.eval(env, ctx)?;
            let current = get_item(&container, &index)?;
            let updated = ops::binary_op(ctx, op, &current, &rhs)?;
            set_item(ctx, &container, &index, updated)?;
        }
        _ => return Err(EvalError::security(ASSIGN_DENIED)),
    }
    Ok(Flow::Normal)
}

/// `del a, b[0], (c, d)`.
pub fn exec_delete(stmt: &ast::StmtDelete, env: &mut Environment, ctx: &EvalContext) -> Result<Flow> {
    for target in &stmt.targets {
        delete_target(target, env, ctx)?;
    }
    Ok(Flow::Normal)
}

// ═══════════════════════════════════════════════════════════════════════
// Targets
// ═══════════════════════════════════════════════════════════════════════

/// Bind `value` to an assignment target.
///
/// Shared by assignment, `for` loops and comprehensions.
///
/// # Errors
///
/// Destructuring needs an exact arity match; unsupported target shapes fail
/// with a security error.
pub(crate) fn assign_target(
    target: &ast::Expr,
    value: Value,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<()> {
    match target {
        ast::Expr::Name(name) => {
            env.define(name.id.as_str(), value);
            Ok(())
        }
        ast::Expr::Tuple(ast::ExprTuple { elts, .. }) | ast::Expr::List(ast::ExprList { elts, .. }) => {
            unpack(elts, value, env, ctx)
        }
        ast::Expr::Subscript(sub) => {
            let container = sub.value.eval(env, ctx)?;
            let index = sub.slice.eval(env, ctx)?;
            set_item(ctx, &container, &index, value)
        }
        ast::Expr::Starred(_) => Err(not_implemented("starred assignment")),
        _ => Err(EvalError::security(ASSIGN_DENIED)),
    }
}

fn unpack(targets: &[ast::Expr], value: Value, env: &mut Environment, ctx: &EvalContext) -> Result<()> {
    if targets.iter().any(|t| matches!(t, ast::Expr::Starred(_))) {
        return Err(not_implemented("starred assignment"));
    }
    let items = collect(ctx, &value)?;
    if items.len() > targets.len() {
        return Err(EvalError::TooManyValues {
            expected: targets.len(),
        });
    }
    if items.len() < targets.len() {
        return Err(EvalError::NotEnoughValues {
            expected: targets.len(),
            got: items.len(),
        });
    }
    for (target, item) in targets.iter().zip(items) {
        assign_target(target, item, env, ctx)?;
    }
    Ok(())
}

fn delete_target(target: &ast::Expr, env: &mut Environment, ctx: &EvalContext) -> Result<()> {
    match target {
        ast::Expr::Name(name) => env.remove(name.id.as_str()).map(|_| ()),
        ast::Expr::Tuple(ast::ExprTuple { elts, .. }) | ast::Expr::List(ast::ExprList { elts, .. }) => {
            for elt in elts {
                delete_target(elt, env, ctx)?;
            }
            Ok(())
        }
        ast::Expr::Subscript(sub) if is_simple_index(&sub.slice) => {
            let container = sub.value.eval(env, ctx)?;
            let index = sub.slice.eval(env, ctx)?;
            del_item(&container, &index)
        }
        _ => Err(EvalError::security(DELETE_DENIED)),
    }
}

/// Collect every name a target binds, in source order.
pub(crate) fn target_names<'a>(target: &'a ast::Expr, names: &mut Vec<&'a str>) {
    match target {
        ast::Expr::Name(name) => names.push(name.id.as_str()),
        ast::Expr::Tuple(ast::ExprTuple { elts, .. }) | ast::Expr::List(ast::ExprList { elts, .. }) => {
            for elt in elts {
                target_names(elt, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::test_support::eval_in;
    use crate::frontend::parse_program;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> std::result::Result<(Value, Environment), String> {
        let mut env = Environment::new();
        match eval_in(src, &mut env, &EvalContext::new()) {
            Ok(v) => Ok((v, env)),
            Err(e) => Err(format!("{}: {}", e.category(), e)),
        }
    }

    fn result(src: &str) -> String {
        match run(src) {
            Ok((v, _)) => v.repr(),
            Err(e) => e,
        }
    }

    #[test]
    fn test_chained_assignment() {
        let (_, env) = run("a = b = [1]").unwrap();
        assert!(env.get("a").unwrap().is_same(env.get("b").unwrap()));
    }

    #[test]
    fn test_destructuring() {
        assert_eq!(result("a, (b, c) = 1, [2, 3]\na + b + c"), "6");
        assert_eq!(result("[x, y] = 'hi'\ny"), "'i'");
        assert_eq!(
            result("a, b = 1, 2, 3"),
            "ValueError: too many values to unpack (expected 2)"
        );
        assert_eq!(
            result("a, b, c = 1, 2"),
            "ValueError: not enough values to unpack (expected 3, got 2)"
        );
    }

    #[test]
    fn test_subscript_targets() {
        assert_eq!(result("l = [1, 2, 3]\nl[0] = 9\nl"), "[9, 2, 3]");
        assert_eq!(result("l = [1, 2, 3]\nl[1:] = 'ab'\nl"), "[1, 'a', 'b']");
        assert_eq!(result("d = {}\nd['k'] = 1\nd"), "{'k': 1}");
    }

    #[test]
    fn test_attribute_target_denied() {
        assert_eq!(
            result("math.pi = 3"),
            "SyntaxSecurityError: This assign method is not allowed"
        );
    }

    #[test]
    fn test_aug_assign() {
        assert_eq!(result("x = 1\nx += 2\nx"), "3");
        assert_eq!(result("l = [1, 2]\nl[0] *= 5\nl"), "[5, 2]");
        assert_eq!(result("s = 'a'\ns += 'b'\ns"), "'ab'");
        assert_eq!(result("y += 1"), "NameError: name 'y' is not defined");
    }

    #[test]
    fn test_aug_assign_rebinds() {
        assert_eq!(result("a = [1]\nb = a\na += [2]\nb"), "[1]");
    }

    #[test]
    fn test_aug_assign_slice_denied() {
        assert_eq!(
            result("l = [1, 2]\nl[0:1] += [3]"),
            "SyntaxSecurityError: This assign method is not allowed"
        );
    }

    #[test]
    fn test_delete() {
        let (_, env) = run("a = 1\nb = 2\nc = 3\ndel a, (b,)").unwrap();
        assert_eq!(env.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(result("l = [1, 2, 3]\ndel l[0]\nl"), "[2, 3]");
        assert_eq!(result("d = {'a': 1}\ndel d['a']\nd"), "{}");
        assert_eq!(result("del nothing"), "NameError: name 'nothing' is not defined");
    }

    #[test]
    fn test_delete_denied() {
        assert_eq!(
            result("l = [1, 2]\ndel l[0:1]"),
            "SyntaxSecurityError: This delete method is not allowed"
        );
        assert_eq!(
            result("del math.pi"),
            "SyntaxSecurityError: This delete method is not allowed"
        );
    }

    #[test]
    fn test_target_names() {
        let program = parse_program("a, [b, c[0]], d = x").unwrap();
        let ast::Stmt::Assign(assign) = &program.body[0] else {
            panic!("not an assignment");
        };
        let mut names = Vec::new();
        target_names(&assign.targets[0], &mut names);
        assert_eq!(names, vec!["a", "b", "d"]);
    }
}
