//! Name resolution

use rustpython_parser::ast;

use super::Evaluate;
use crate::error::{EvalError, Result};
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprName {
    fn eval(&self, env: &mut Environment, _ctx: &EvalContext) -> Result<Value> {
        match self.ctx {
            ast::ExprContext::Load => env.lookup(self.id.as_str()),
            // Store/Del names only appear as targets, which never reach here
            _ => Err(EvalError::security("This assign method is not allowed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_global_lookup() {
        assert_eq!(show("len"), "<built-in function len>");
        assert_eq!(show("math.pi"), "3.141592653589793");
    }

    #[test]
    fn test_undefined() {
        assert_eq!(show("open"), "NameError: name 'open' is not defined");
        assert_eq!(show("__builtins__"), "NameError: name '__builtins__' is not defined");
    }
}
