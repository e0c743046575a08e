//! Attribute access: the sandbox's main chokepoint

use rustpython_parser::ast;

use super::Evaluate;
use crate::capability::resolve_attribute;
use crate::error::Result;
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprAttribute {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let value = self.value.eval(env, ctx)?;
        resolve_attribute(&value, self.attr.as_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::{eval_str, show};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_allowed_attributes() {
        assert_eq!(show("math.floor(2.5)"), "2");
        assert_eq!(show("'abc'.upper()"), "'ABC'");
        assert_eq!(show("range(1, 10, 2).step"), "2");
        assert_eq!(show("datetime.date(2024, 1, 31).day"), "31");
    }

    #[test]
    fn test_reflection_probes_are_denied() {
        let probes = [
            "().__class__",
            "str.__subclasses__",
            "''.__class__.__mro__",
            "len.__self__",
            "math.__loader__",
            "random._os",
            "datetime.sys",
            "(1).__add__",
            "[].__class__.__base__",
            "int.__dict__",
        ];
        for probe in probes {
            let err = eval_str(probe).unwrap_err();
            assert!(err.is_security(), "{} gave {:?}", probe, err);
        }
    }

    #[test]
    fn test_denial_messages() {
        assert_eq!(
            show("().__class__"),
            "SyntaxSecurityError: You can not access `__class__` attribute"
        );
        assert_eq!(
            show("len.__name__"),
            "SyntaxSecurityError: You can not access attributes of <class 'builtin_function_or_method'>"
        );
    }
}
