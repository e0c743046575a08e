//! Comparison chains
//!
//! `a < b < c` compares each adjacent pair, the right operand of one pair
//! becoming the left operand of the next. The chain is false at the first
//! failing pair and later operands are never evaluated.

use rustpython_parser::ast;

use super::Evaluate;
use crate::error::Result;
use crate::ops::{self, CompareOp};
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprCompare {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let mut left = self.left.eval(env, ctx)?;
        for (op, right) in self.ops.iter().zip(&self.comparators) {
            let right = right.eval(env, ctx)?;
            if !ops::compare_op(ctx, CompareOp::from(*op), &left, &right)? {
                return Ok(Value::Bool(false));
            }
            left = right;
        }
        Ok(Value::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chain() {
        assert_eq!(show("1 < 2 < 3"), "True");
        assert_eq!(show("1 < 3 < 2"), "False");
        assert_eq!(show("3 > 2 == 2 >= 1"), "True");
        assert_eq!(show("2 in [1, 2] in [[3]]"), "False");
    }

    #[test]
    fn test_chain_stops_early() {
        assert_eq!(show("2 < 1 < undefined_name"), "False");
    }

    #[test]
    fn test_identity() {
        assert_eq!(show("None is None"), "True");
        assert_eq!(show("[] is []"), "False");
        assert_eq!(show("1 is not None"), "True");
    }

    #[test]
    fn test_unorderable() {
        assert_eq!(
            show("1 < 'a'"),
            "TypeError: '<' not supported between instances of 'int' and 'str'"
        );
    }
}
