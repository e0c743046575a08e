//! Literal evaluation
//!
//! In precision mode every numeric literal becomes a `Decimal`: integers
//! exactly, floats from their shortest repr, so `0.1` is `Decimal('0.1')`
//! and not the binary neighbour. Complex literals stay complex.

use rustpython_parser::ast;

use super::Evaluate;
use crate::error::Result;
use crate::value::{float_repr, Complex, Decimal};
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprConstant {
    fn eval(&self, _env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        constant_value(&self.value, ctx.precision)
    }
}

/// Convert a parsed constant into a runtime value.
///
/// # Errors
///
/// Only precision-mode float conversion can fail, and only for text the
/// decimal parser rejects.
pub fn constant_value(constant: &ast::Constant, precision: bool) -> Result<Value> {
    Ok(match constant {
        ast::Constant::None => Value::None,
        ast::Constant::Ellipsis => Value::Ellipsis,
        ast::Constant::Bool(b) => Value::Bool(*b),
        ast::Constant::Str(s) => Value::str(s),
        ast::Constant::Bytes(b) => Value::bytes(b.clone()),
        ast::Constant::Int(n) if precision => Value::Decimal(Decimal::from_bigint(n)),
        ast::Constant::Int(n) => Value::Int(n.clone()),
        ast::Constant::Float(f) if precision => Value::Decimal(Decimal::parse(&float_repr(*f))?),
        ast::Constant::Float(f) => Value::Float(*f),
        ast::Constant::Complex { real, imag } => Value::Complex(Complex::new(*real, *imag)),
        ast::Constant::Tuple(items) => Value::tuple(
            items
                .iter()
                .map(|item| constant_value(item, precision))
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::test_support::eval_in;
    use pretty_assertions::assert_eq;

    fn eval(src: &str, precision: bool) -> String {
        let mut env = Environment::new();
        let ctx = EvalContext::with_precision(precision);
        eval_in(src, &mut env, &ctx).unwrap().repr()
    }

    #[test]
    fn test_native_literals() {
        assert_eq!(eval("42", false), "42");
        assert_eq!(eval("0.5", false), "0.5");
        assert_eq!(eval("2j", false), "2j");
        assert_eq!(eval("'hi'", false), "'hi'");
        assert_eq!(eval("b'\\x00'", false), "b'\\x00'");
        assert_eq!(eval("None", false), "None");
        assert_eq!(eval("...", false), "Ellipsis");
        assert_eq!(eval("True", false), "True");
    }

    #[test]
    fn test_precision_literals() {
        assert_eq!(eval("42", true), "Decimal('42')");
        assert_eq!(eval("0.1", true), "Decimal('0.1')");
        assert_eq!(eval("1e100", true), "Decimal('1E+100')");
        assert_eq!(eval("2j", true), "2j");
        assert_eq!(eval("'s'", true), "'s'");
    }
}
