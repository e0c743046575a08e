//! Unary operator evaluation

use rustpython_parser::ast;

use super::Evaluate;
use crate::error::Result;
use crate::ops::{self, UnaryOp};
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprUnaryOp {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let operand = self.operand.eval(env, ctx)?;
        ops::unary_op(UnaryOp::from(self.op), &operand)
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unary() {
        assert_eq!(show("-5"), "-5");
        assert_eq!(show("~5"), "-6");
        assert_eq!(show("not []"), "True");
        assert_eq!(show("+True"), "1");
        assert_eq!(show("-'x'"), "TypeError: bad operand type for unary -: 'str'");
    }
}
