//! Conditionals: the `a if c else b` expression and the `if` statement

use rustpython_parser::ast;

use super::control::Flow;
use super::stmt::exec_block;
use super::Evaluate;
use crate::error::Result;
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprIfExp {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        if self.test.eval(env, ctx)?.truthy() {
            self.body.eval(env, ctx)
        } else {
            self.orelse.eval(env, ctx)
        }
    }
}

/// Execute exactly one branch of an `if` statement.
///
/// `elif` chains arrive as a nested `if` in the `orelse` block.
pub fn exec_if(stmt: &ast::StmtIf, env: &mut Environment, ctx: &EvalContext) -> Result<Flow> {
    if stmt.test.eval(env, ctx)?.truthy() {
        exec_block(&stmt.body, env, ctx)
    } else {
        exec_block(&stmt.orelse, env, ctx)
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_conditional_expression() {
        assert_eq!(show("'yes' if 1 else 'no'"), "'yes'");
        assert_eq!(show("'yes' if [] else 'no'"), "'no'");
        assert_eq!(show("1 if True else undefined_name"), "1");
    }

    #[test]
    fn test_if_statement() {
        assert_eq!(show("x = 5\nif x > 3:\n    y = 'big'\nelse:\n    y = 'small'\ny"), "'big'");
        assert_eq!(
            show("x = 2\nif x > 3:\n    y = 'a'\nelif x > 1:\n    y = 'b'\nelse:\n    y = 'c'\ny"),
            "'b'"
        );
    }

    #[test]
    fn test_only_one_branch_runs() {
        assert_eq!(show("n = 0\nif n:\n    n = 1 / n\nelse:\n    n = -1\nn"), "-1");
    }
}
