//! Static sandbox policy
//!
//! The whole tree is walked once before the first statement runs, so a
//! forbidden construct anywhere in the input is rejected before any side
//! effect happens. The runtime handlers consult the same tables and stay
//! exhaustive on their own.

use rustpython_parser::ast;

use super::control::{outside_loop, Flow};
use super::{expr_kind_name, not_implemented};
use crate::error::{EvalError, Result};

/// Rejection message for a forbidden statement kind.
pub fn forbidden_stmt(stmt: &ast::Stmt) -> Option<&'static str> {
    let message = match stmt {
        ast::Stmt::FunctionDef(_) => "Defining new function via def syntax is not allowed",
        ast::Stmt::AsyncFunctionDef(_) => "Defining new coroutine via def syntax is not allowed",
        ast::Stmt::ClassDef(_) => "Defining new class via def syntax is not allowed",
        ast::Stmt::Return(_) => "You can not use `return` syntax",
        ast::Stmt::AnnAssign(_) => "You can not use annotation syntax",
        ast::Stmt::AsyncFor(_) => "You can not use `async for` loop syntax",
        ast::Stmt::With(_) => "You can not use `with` syntax",
        ast::Stmt::AsyncWith(_) => "You can not use `async with` syntax",
        ast::Stmt::Raise(_) => "You can not use `raise` syntax",
        ast::Stmt::Try(_) | ast::Stmt::TryStar(_) => "You can not use `try` syntax",
        ast::Stmt::Assert(_) => "You can not use assertion syntax",
        ast::Stmt::Import(_) | ast::Stmt::ImportFrom(_) => "You can not import anything",
        ast::Stmt::Global(_) => "You can not use `global` syntax",
        ast::Stmt::Nonlocal(_) => "You can not use `nonlocal` syntax",
        _ => return None,
    };
    Some(message)
}

/// Rejection message for a forbidden expression kind.
pub fn forbidden_expr(expr: &ast::Expr) -> Option<&'static str> {
    let message = match expr {
        ast::Expr::Lambda(_) => "Defining new function via lambda syntax is not allowed",
        ast::Expr::GeneratorExp(_) => "Defining new generator expression is not allowed",
        ast::Expr::Await(_) => "You can not await anything",
        ast::Expr::Yield(_) => "You can not use `yield` syntax",
        ast::Expr::YieldFrom(_) => "You can not use `yield from` syntax",
        ast::Expr::ListComp(ast::ExprListComp { generators, .. })
        | ast::Expr::SetComp(ast::ExprSetComp { generators, .. })
        | ast::Expr::DictComp(ast::ExprDictComp { generators, .. })
            if generators.iter().any(|g| g.is_async) =>
        {
            "You can not use `async for` loop syntax"
        }
        _ => return None,
    };
    Some(message)
}

// ═══════════════════════════════════════════════════════════════════════
// Tree walk
// ═══════════════════════════════════════════════════════════════════════

/// Check every node of a program before it runs.
///
/// # Errors
///
/// `SyntaxSecurityError` for forbidden constructs, `SyntaxError` for a
/// loop jump outside any loop, `NotImplementedError` for node kinds the
/// interpreter has no rule for.
pub fn check_program(body: &[ast::Stmt]) -> Result<()> {
    check_block(body, 0)
}

fn check_block(body: &[ast::Stmt], loops: usize) -> Result<()> {
    body.iter().try_for_each(|stmt| check_stmt(stmt, loops))
}

fn check_stmt(stmt: &ast::Stmt, loops: usize) -> Result<()> {
    if let Some(message) = forbidden_stmt(stmt) {
        return Err(EvalError::security(message));
    }
    match stmt {
        ast::Stmt::Expr(s) => check_expr(&s.value),
        ast::Stmt::Assign(s) => {
            check_exprs(&s.targets)?;
            check_expr(&s.value)
        }
        ast::Stmt::AugAssign(s) => {
            check_expr(&s.target)?;
            check_expr(&s.value)
        }
        ast::Stmt::Delete(s) => check_exprs(&s.targets),
        ast::Stmt::If(s) => {
            check_expr(&s.test)?;
            check_block(&s.body, loops)?;
            check_block(&s.orelse, loops)
        }
        ast::Stmt::For(s) => {
            check_expr(&s.target)?;
            check_expr(&s.iter)?;
            check_block(&s.body, loops + 1)?;
            check_block(&s.orelse, loops)
        }
        ast::Stmt::While(s) => {
            check_expr(&s.test)?;
            check_block(&s.body, loops + 1)?;
            check_block(&s.orelse, loops)
        }
        ast::Stmt::Break(_) if loops == 0 => Err(outside_loop(Flow::Break)),
        ast::Stmt::Continue(_) if loops == 0 => Err(outside_loop(Flow::Continue)),
        ast::Stmt::Break(_) | ast::Stmt::Continue(_) | ast::Stmt::Pass(_) => Ok(()),
        other => Err(not_implemented(super::stmt::stmt_kind_name(other))),
    }
}

fn check_exprs(exprs: &[ast::Expr]) -> Result<()> {
    exprs.iter().try_for_each(check_expr)
}

fn check_optional(expr: Option<&ast::Expr>) -> Result<()> {
    expr.map_or(Ok(()), check_expr)
}

fn check_generators(generators: &[ast::Comprehension]) -> Result<()> {
    for generator in generators {
        check_expr(&generator.target)?;
        check_expr(&generator.iter)?;
        check_exprs(&generator.ifs)?;
    }
    Ok(())
}

fn check_expr(expr: &ast::Expr) -> Result<()> {
    if let Some(message) = forbidden_expr(expr) {
        return Err(EvalError::security(message));
    }
    match expr {
        ast::Expr::Constant(_) | ast::Expr::Name(_) => Ok(()),
        ast::Expr::BoolOp(e) => check_exprs(&e.values),
        ast::Expr::BinOp(e) => {
            check_expr(&e.left)?;
            check_expr(&e.right)
        }
        ast::Expr::UnaryOp(e) => check_expr(&e.operand),
        ast::Expr::IfExp(e) => {
            check_expr(&e.test)?;
            check_expr(&e.body)?;
            check_expr(&e.orelse)
        }
        ast::Expr::Compare(e) => {
            check_expr(&e.left)?;
            check_exprs(&e.comparators)
        }
        ast::Expr::Call(e) => {
            check_expr(&e.func)?;
            check_exprs(&e.args)?;
            for keyword in &e.keywords {
                if keyword.arg.is_none() {
                    return Err(not_implemented("keyword argument unpacking"));
                }
                check_expr(&keyword.value)?;
            }
            Ok(())
        }
        ast::Expr::Attribute(e) => check_expr(&e.value),
        ast::Expr::Subscript(e) => {
            check_expr(&e.value)?;
            check_expr(&e.slice)
        }
        ast::Expr::Slice(e) => {
            check_optional(e.lower.as_deref())?;
            check_optional(e.upper.as_deref())?;
            check_optional(e.step.as_deref())
        }
        ast::Expr::List(e) => check_exprs(&e.elts),
        ast::Expr::Tuple(e) => check_exprs(&e.elts),
        ast::Expr::Set(e) => check_exprs(&e.elts),
        ast::Expr::Dict(e) => {
            for key in &e.keys {
                match key {
                    Some(key) => check_expr(key)?,
                    None => return Err(not_implemented("dict unpacking")),
                }
            }
            check_exprs(&e.values)
        }
        ast::Expr::ListComp(e) => {
            check_generators(&e.generators)?;
            check_expr(&e.elt)
        }
        ast::Expr::SetComp(e) => {
            check_generators(&e.generators)?;
            check_expr(&e.elt)
        }
        ast::Expr::DictComp(e) => {
            check_generators(&e.generators)?;
            check_expr(&e.key)?;
            check_expr(&e.value)
        }
        ast::Expr::JoinedStr(e) => check_exprs(&e.values),
        ast::Expr::FormattedValue(e) => {
            check_expr(&e.value)?;
            check_optional(e.format_spec.as_deref())
        }
        other @ (ast::Expr::NamedExpr(_)
        | ast::Expr::Starred(_)
        | ast::Expr::Lambda(_)
        | ast::Expr::GeneratorExp(_)
        | ast::Expr::Await(_)
        | ast::Expr::Yield(_)
        | ast::Expr::YieldFrom(_)) => Err(not_implemented(expr_kind_name(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_program;
    use pretty_assertions::assert_eq;

    fn check(src: &str) -> std::result::Result<(), String> {
        let program = parse_program(src).map_err(|e| e.to_string())?;
        check_program(&program.body).map_err(|e| format!("{}: {}", e.category(), e))
    }

    #[test]
    fn test_forbidden_statements() {
        let cases = [
            ("def f(): pass", "Defining new function via def syntax is not allowed"),
            ("async def f(): pass", "Defining new coroutine via def syntax is not allowed"),
            ("class X: pass", "Defining new class via def syntax is not allowed"),
            ("import os", "You can not import anything"),
            ("from os import path", "You can not import anything"),
            ("global x", "You can not use `global` syntax"),
            ("with x: pass", "You can not use `with` syntax"),
            ("try:\n  pass\nexcept: pass", "You can not use `try` syntax"),
            ("assert x", "You can not use assertion syntax"),
            ("raise x", "You can not use `raise` syntax"),
            ("x: int = 1", "You can not use annotation syntax"),
        ];
        for (src, message) in cases {
            assert_eq!(check(src), Err(format!("SyntaxSecurityError: {}", message)), "{}", src);
        }
    }

    #[test]
    fn test_forbidden_nested_expressions() {
        assert_eq!(
            check("x = 1\ny = [lambda: 1]"),
            Err("SyntaxSecurityError: Defining new function via lambda syntax is not allowed".into())
        );
        assert_eq!(
            check("for i in range(3):\n  if i:\n    sum(j for j in i)"),
            Err("SyntaxSecurityError: Defining new generator expression is not allowed".into())
        );
    }

    #[test]
    fn test_loop_jumps() {
        assert!(check("for i in x:\n  if i:\n    break\n  continue").is_ok());
        assert_eq!(check("break"), Err("SyntaxError: 'break' outside loop".into()));
        assert_eq!(
            check("for i in x:\n  pass\nelse:\n  continue"),
            Err("SyntaxError: 'continue' not properly in loop".into())
        );
    }

    #[test]
    fn test_unsupported_kinds() {
        assert_eq!(
            check("(y := 1)"),
            Err("NotImplementedError: assignment expression is not supported".into())
        );
        assert_eq!(
            check("f(**x)"),
            Err("NotImplementedError: keyword argument unpacking is not supported".into())
        );
    }

    #[test]
    fn test_allowed_program() {
        assert!(check("a, b = 1, 2\na += 1\ndel b\n[x for x in range(a) if x]").is_ok());
    }
}
