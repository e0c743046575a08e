//! Binary and boolean operator evaluation

use rustpython_parser::ast;

use super::Evaluate;
use crate::error::Result;
use crate::ops::{self, BinaryOp};
use crate::{Environment, EvalContext, Value};

// ═══════════════════════════════════════════════════════════════════════
// Arithmetic
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for ast::ExprBinOp {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let left = self.left.eval(env, ctx)?;
        let right = self.right.eval(env, ctx)?;
        ops::binary_op(ctx, BinaryOp::from(self.op), &left, &right)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// and / or
// ═══════════════════════════════════════════════════════════════════════

/// `and` yields the first falsy operand, `or` the first truthy one; either
/// falls back to the last operand. Operands after the deciding one are not
/// evaluated.
impl Evaluate for ast::ExprBoolOp {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let stop_when = matches!(self.op, ast::BoolOp::Or);
        let mut last = Value::Bool(true);
        for operand in &self.values {
            last = operand.eval(env, ctx)?;
            if last.truthy() == stop_when {
                break;
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arithmetic() {
        assert_eq!(show("1 + 2 * 3"), "7");
        assert_eq!(show("7 // 2, 7 % 2, 2 ** 10"), "(3, 1, 1024)");
        assert_eq!(show("1 / 4"), "0.25");
        assert_eq!(show("'ab' * 2"), "'abab'");
    }

    #[test]
    fn test_zero_division() {
        assert_eq!(show("1 / 0"), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_boolean_operands() {
        assert_eq!(show("0 or '' or 'x' or 1"), "'x'");
        assert_eq!(show("0 or ''"), "''");
        assert_eq!(show("1 and [] and 2"), "[]");
        assert_eq!(show("1 and 2 and 3"), "3");
        assert_eq!(show("1 or undefined_name"), "1");
        assert_eq!(show("0 and undefined_name"), "0");
    }
}
