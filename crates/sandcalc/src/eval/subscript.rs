//! Subscript and slice evaluation

use std::rc::Rc;

use rustpython_parser::ast;

use super::{eval_optional, Evaluate};
use crate::error::Result;
use crate::value::{get_item, Slice};
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprSubscript {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let container = self.value.eval(env, ctx)?;
        let index = self.slice.eval(env, ctx)?;
        get_item(&container, &index)
    }
}

impl Evaluate for ast::ExprSlice {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let start = eval_optional(self.lower.as_deref(), env, ctx)?;
        let stop = eval_optional(self.upper.as_deref(), env, ctx)?;
        let step = eval_optional(self.step.as_deref(), env, ctx)?;
        Ok(Value::Slice(Rc::new(Slice { start, stop, step })))
    }
}

/// Whether a subscript index is a plain index rather than a slice.
///
/// Augmented assignment and deletion accept only plain indices.
pub fn is_simple_index(index: &ast::Expr) -> bool {
    match index {
        ast::Expr::Slice(_) => false,
        ast::Expr::Tuple(t) => !t.elts.iter().any(|e| matches!(e, ast::Expr::Slice(_))),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::test_support::show;
    use crate::frontend::parse_program;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_indexing() {
        assert_eq!(show("[1, 2, 3][-1]"), "3");
        assert_eq!(show("'hello'[1:4]"), "'ell'");
        assert_eq!(show("'hello'[::-1]"), "'olleh'");
        assert_eq!(show("{'a': 1}['a']"), "1");
        assert_eq!(show("(1, 2)[5]"), "IndexError: tuple index out of range");
        assert_eq!(show("{'a': 1}['b']"), "KeyError: 'b'");
    }

    #[test]
    fn test_slice_value() {
        assert_eq!(show("range(10)[2:8:3]"), "range(2, 8, 3)");
    }

    #[test]
    fn test_simple_index() {
        let index = |src: &str| {
            let program = parse_program(src).unwrap();
            match &program.body[0] {
                ast::Stmt::Expr(e) => match &*e.value {
                    ast::Expr::Subscript(s) => is_simple_index(&s.slice),
                    _ => panic!("not a subscript"),
                },
                _ => panic!("not an expression"),
            }
        };
        assert!(index("a[1]"));
        assert!(index("a[1, 2]"));
        assert!(!index("a[1:2]"));
        assert!(!index("a[1:2, 3]"));
    }
}
