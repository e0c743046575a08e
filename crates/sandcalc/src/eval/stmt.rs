//! Statement execution

use rustpython_parser::ast;

use super::assign::{exec_assign, exec_aug_assign, exec_delete};
use super::control::{exec_break, exec_continue, Flow};
use super::if_expr::exec_if;
use super::loops::{exec_for, exec_while};
use super::{not_implemented, policy, Evaluate};
use crate::error::{EvalError, Result};
use crate::{Environment, EvalContext};

/// Execute a statement.
///
/// # Errors
///
/// Returns errors from statement evaluation; forbidden kinds fail with a
/// security error before anything is evaluated.
pub fn exec_stmt(stmt: &ast::Stmt, env: &mut Environment, ctx: &EvalContext) -> Result<Flow> {
    ctx.check_interrupt()?;

    if let Some(message) = policy::forbidden_stmt(stmt) {
        return Err(EvalError::security(message));
    }

    match stmt {
        // Expression statement: evaluated for side effects
        ast::Stmt::Expr(s) => {
            s.value.eval(env, ctx)?;
            Ok(Flow::Normal)
        }

        // Bindings
        ast::Stmt::Assign(s) => exec_assign(s, env, ctx),
        ast::Stmt::AugAssign(s) => exec_aug_assign(s, env, ctx),
        ast::Stmt::Delete(s) => exec_delete(s, env, ctx),

        // Control flow
        ast::Stmt::If(s) => exec_if(s, env, ctx),
        ast::Stmt::For(s) => exec_for(s, env, ctx),
        ast::Stmt::While(s) => exec_while(s, env, ctx),
        ast::Stmt::Break(s) => exec_break(s),
        ast::Stmt::Continue(s) => exec_continue(s),
        ast::Stmt::Pass(_) => Ok(Flow::Normal),

        other => Err(not_implemented(stmt_kind_name(other))),
    }
}

/// Execute statements in order, stopping at the first loop jump.
///
/// # Errors
///
/// Returns errors from statement evaluation.
pub fn exec_block(body: &[ast::Stmt], env: &mut Environment, ctx: &EvalContext) -> Result<Flow> {
    for stmt in body {
        let flow = exec_stmt(stmt, env, ctx)?;
        if flow.interrupts() {
            return Ok(flow);
        }
    }
    Ok(Flow::Normal)
}

/// Get a human-readable name for a statement kind.
pub fn stmt_kind_name(stmt: &ast::Stmt) -> &'static str {
    match stmt {
        ast::Stmt::FunctionDef(_) => "function definition",
        ast::Stmt::AsyncFunctionDef(_) => "async function definition",
        ast::Stmt::ClassDef(_) => "class definition",
        ast::Stmt::Return(_) => "return",
        ast::Stmt::Delete(_) => "del",
        ast::Stmt::Assign(_) => "assignment",
        ast::Stmt::AugAssign(_) => "augmented assignment",
        ast::Stmt::AnnAssign(_) => "annotated assignment",
        ast::Stmt::For(_) => "for loop",
        ast::Stmt::AsyncFor(_) => "async for loop",
        ast::Stmt::While(_) => "while loop",
        ast::Stmt::If(_) => "if",
        ast::Stmt::With(_) => "with",
        ast::Stmt::AsyncWith(_) => "async with",
        ast::Stmt::Match(_) => "match statement",
        ast::Stmt::Raise(_) => "raise",
        ast::Stmt::Try(_) | ast::Stmt::TryStar(_) => "try",
        ast::Stmt::Assert(_) => "assert",
        ast::Stmt::Import(_) | ast::Stmt::ImportFrom(_) => "import",
        ast::Stmt::Global(_) => "global",
        ast::Stmt::Nonlocal(_) => "nonlocal",
        ast::Stmt::Expr(_) => "expression statement",
        ast::Stmt::Pass(_) => "pass",
        ast::Stmt::Break(_) => "break",
        ast::Stmt::Continue(_) => "continue",
        _ => "statement",
    }
}
