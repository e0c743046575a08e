//! Collection displays: list, tuple, set and dict literals

use indexmap::{IndexMap, IndexSet};
use rustpython_parser::ast;

use super::{not_implemented, Evaluate};
use crate::error::Result;
use crate::value::{check_len, HashKey};
use crate::{Environment, EvalContext, Value};

/// Evaluate display elements left to right.
fn eval_elements(elts: &[ast::Expr], env: &mut Environment, ctx: &EvalContext) -> Result<Vec<Value>> {
    check_len(elts.len())?;
    let mut items = Vec::with_capacity(elts.len());
    for elt in elts {
        if let ast::Expr::Starred(_) = elt {
            return Err(not_implemented("iterable unpacking"));
        }
        items.push(elt.eval(env, ctx)?);
    }
    Ok(items)
}

impl Evaluate for ast::ExprList {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        Ok(Value::list(eval_elements(&self.elts, env, ctx)?))
    }
}

impl Evaluate for ast::ExprTuple {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        Ok(Value::tuple(eval_elements(&self.elts, env, ctx)?))
    }
}

impl Evaluate for ast::ExprSet {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let mut set = IndexSet::with_capacity(self.elts.len());
        for item in eval_elements(&self.elts, env, ctx)? {
            set.insert(HashKey::new(item)?);
        }
        Ok(Value::set(set))
    }
}

impl Evaluate for ast::ExprDict {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        check_len(self.values.len())?;
        let mut map = IndexMap::with_capacity(self.values.len());
        for (key, value) in self.keys.iter().zip(&self.values) {
            let Some(key) = key else {
                return Err(not_implemented("dict unpacking"));
            };
            let key = HashKey::new(key.eval(env, ctx)?)?;
            let value = value.eval(env, ctx)?;
            // A repeated key keeps its first position and takes the last value
            map.insert(key, value);
        }
        Ok(Value::dict(map))
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_displays() {
        assert_eq!(show("[1, 'a', None]"), "[1, 'a', None]");
        assert_eq!(show("(1,)"), "(1,)");
        assert_eq!(show("()"), "()");
        assert_eq!(show("{1, 2, 2}"), "{1, 2}");
        assert_eq!(show("{'a': 1, 'b': 2}"), "{'a': 1, 'b': 2}");
    }

    #[test]
    fn test_repeated_dict_key() {
        assert_eq!(show("{'a': 1, 'b': 2, 'a': 3}"), "{'a': 3, 'b': 2}");
    }

    #[test]
    fn test_unhashable_keys() {
        assert_eq!(show("{[1]: 2}"), "TypeError: unhashable type: 'list'");
        assert_eq!(show("{[1]}"), "TypeError: unhashable type: 'list'");
    }

    #[test]
    fn test_nested() {
        assert_eq!(show("[[1, 2], {'k': (3, 4)}]"), "[[1, 2], {'k': (3, 4)}]");
    }
}
