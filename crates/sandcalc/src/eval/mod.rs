//! Expression and statement evaluation

pub mod assign;
pub mod attribute;
pub mod binary;
pub mod call;
pub mod collection;
pub mod compare;
pub mod comprehension;
pub mod control;
pub mod fstring;
pub mod if_expr;
pub mod literal;
pub mod loops;
pub mod name;
pub mod policy;
pub mod stmt;
pub mod subscript;
pub mod unary;

use rustpython_parser::ast;

use crate::error::{EvalError, Result};
use crate::{Environment, EvalContext, Value};

/// Trait for evaluating syntax nodes to values.
///
/// This is the core abstraction for the tree-walking interpreter.
/// Each supported `rustpython_parser::ast` expression node implements it.
pub trait Evaluate {
    /// Evaluate this node against the symbol table.
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// Main Expression Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for ast::Expr {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        ctx.check_interrupt()?;
        let _depth = ctx.enter()?;

        if let Some(message) = policy::forbidden_expr(self) {
            return Err(EvalError::security(message));
        }

        match self {
            // Leaves
            ast::Expr::Constant(expr) => expr.eval(env, ctx),
            ast::Expr::Name(expr) => expr.eval(env, ctx),

            // Operators
            ast::Expr::BinOp(expr) => expr.eval(env, ctx),
            ast::Expr::BoolOp(expr) => expr.eval(env, ctx),
            ast::Expr::UnaryOp(expr) => expr.eval(env, ctx),
            ast::Expr::Compare(expr) => expr.eval(env, ctx),
            ast::Expr::IfExp(expr) => expr.eval(env, ctx),

            // Capability-gated access
            ast::Expr::Call(expr) => expr.eval(env, ctx),
            ast::Expr::Attribute(expr) => expr.eval(env, ctx),
            ast::Expr::Subscript(expr) => expr.eval(env, ctx),
            ast::Expr::Slice(expr) => expr.eval(env, ctx),

            // Displays
            ast::Expr::List(expr) => expr.eval(env, ctx),
            ast::Expr::Tuple(expr) => expr.eval(env, ctx),
            ast::Expr::Set(expr) => expr.eval(env, ctx),
            ast::Expr::Dict(expr) => expr.eval(env, ctx),
            ast::Expr::ListComp(expr) => expr.eval(env, ctx),
            ast::Expr::SetComp(expr) => expr.eval(env, ctx),
            ast::Expr::DictComp(expr) => expr.eval(env, ctx),

            // String interpolation
            ast::Expr::JoinedStr(expr) => expr.eval(env, ctx),
            ast::Expr::FormattedValue(expr) => expr.eval(env, ctx),

            // No rule
            ast::Expr::NamedExpr(_) | ast::Expr::Starred(_) => Err(not_implemented(expr_kind_name(self))),

            // Rejected by `forbidden_expr` above
            ast::Expr::Lambda(_)
            | ast::Expr::GeneratorExp(_)
            | ast::Expr::Await(_)
            | ast::Expr::Yield(_)
            | ast::Expr::YieldFrom(_) => Err(not_implemented(expr_kind_name(self))),
        }
    }
}

/// Get a human-readable name for an expression kind.
pub fn expr_kind_name(expr: &ast::Expr) -> &'static str {
    match expr {
        ast::Expr::BoolOp(_) => "boolean operation",
        ast::Expr::NamedExpr(_) => "assignment expression",
        ast::Expr::BinOp(_) => "binary operation",
        ast::Expr::UnaryOp(_) => "unary operation",
        ast::Expr::Lambda(_) => "lambda",
        ast::Expr::IfExp(_) => "conditional expression",
        ast::Expr::Dict(_) => "dict display",
        ast::Expr::Set(_) => "set display",
        ast::Expr::ListComp(_) => "list comprehension",
        ast::Expr::SetComp(_) => "set comprehension",
        ast::Expr::DictComp(_) => "dict comprehension",
        ast::Expr::GeneratorExp(_) => "generator expression",
        ast::Expr::Await(_) => "await",
        ast::Expr::Yield(_) => "yield",
        ast::Expr::YieldFrom(_) => "yield from",
        ast::Expr::Compare(_) => "comparison",
        ast::Expr::Call(_) => "call",
        ast::Expr::FormattedValue(_) => "formatted value",
        ast::Expr::JoinedStr(_) => "f-string",
        ast::Expr::Constant(_) => "literal",
        ast::Expr::Attribute(_) => "attribute access",
        ast::Expr::Subscript(_) => "subscript",
        ast::Expr::Starred(_) => "starred expression",
        ast::Expr::Name(_) => "name",
        ast::Expr::List(_) => "list display",
        ast::Expr::Tuple(_) => "tuple display",
        ast::Expr::Slice(_) => "slice",
    }
}

/// Create a "no rule for this node" error.
pub(crate) fn not_implemented(kind: &str) -> EvalError {
    EvalError::NotImplemented {
        kind: kind.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience Functions
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate an expression (convenience wrapper).
pub fn eval_expr(expr: &ast::Expr, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
    expr.eval(env, ctx)
}

/// Evaluate an optional expression, mapping absence to `None`.
pub(crate) fn eval_optional(
    expr: Option<&ast::Expr>,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value> {
    match expr {
        Some(expr) => expr.eval(env, ctx),
        None => Ok(Value::None),
    }
}

// Re-export for use by other modules
pub use control::Flow;
pub use stmt::{exec_block, exec_stmt};

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::frontend::parse_program;

    /// Evaluate a single expression in native mode.
    pub fn eval_str(src: &str) -> Result<Value> {
        let mut env = Environment::new();
        eval_in(src, &mut env, &EvalContext::new())
    }

    /// Evaluate the statements of `src`, returning the last expression.
    pub fn eval_in(src: &str, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let program = parse_program(src)?;
        let mut last = Value::None;
        for stmt in &program.body {
            match stmt {
                ast::Stmt::Expr(expr) => last = expr.value.eval(env, ctx)?,
                other => {
                    exec_stmt(other, env, ctx)?;
                    last = Value::None;
                }
            }
        }
        Ok(last)
    }

    /// repr() of the result, or `Category: message` on failure.
    pub fn show(src: &str) -> String {
        match eval_str(src) {
            Ok(v) => v.repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }
}
