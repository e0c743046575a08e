//! List, set and dict comprehensions
//!
//! Generator clauses are walked as nested iteration: the first clause
//! drives the outer loop and each accepted element recurses into the
//! remaining clauses. Loop variables are removed from the symbol table
//! after every element, accepted or rejected, so they never leak. A local
//! of the same name is gone afterwards too, unless the iterable was empty.

use indexmap::{IndexMap, IndexSet};
use rustpython_parser::ast;

use super::assign::{assign_target, target_names};
use super::{not_implemented, Evaluate};
use crate::error::Result;
use crate::value::{check_len, iterate, HashKey};
use crate::{Environment, EvalContext, Value};

/// What a comprehension builds.
enum Accumulator {
    List(Vec<Value>),
    Set(IndexSet<HashKey>),
    Dict(IndexMap<HashKey, Value>),
}

impl Accumulator {
    fn len(&self) -> usize {
        match self {
            Accumulator::List(items) => items.len(),
            Accumulator::Set(items) => items.len(),
            Accumulator::Dict(items) => items.len(),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Accumulator::List(items) => Value::list(items),
            Accumulator::Set(items) => Value::set(items),
            Accumulator::Dict(items) => Value::dict(items),
        }
    }
}

/// The element expression(s) of a comprehension.
#[derive(Clone, Copy)]
enum Element<'a> {
    Single(&'a ast::Expr),
    Pair(&'a ast::Expr, &'a ast::Expr),
}

impl Element<'_> {
    fn push(self, acc: &mut Accumulator, env: &mut Environment, ctx: &EvalContext) -> Result<()> {
        match (self, acc) {
            (Element::Single(elt), Accumulator::List(items)) => items.push(elt.eval(env, ctx)?),
            (Element::Single(elt), Accumulator::Set(items)) => {
                items.insert(HashKey::new(elt.eval(env, ctx)?)?);
            }
            (Element::Pair(key, value), Accumulator::Dict(items)) => {
                let key = HashKey::new(key.eval(env, ctx)?)?;
                let value = value.eval(env, ctx)?;
                items.insert(key, value);
            }
            _ => return Err(not_implemented("mismatched comprehension element")),
        }
        Ok(())
    }
}

impl Evaluate for ast::ExprListComp {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        comprehend(
            &self.generators,
            Element::Single(&self.elt),
            Accumulator::List(Vec::new()),
            env,
            ctx,
        )
    }
}

impl Evaluate for ast::ExprSetComp {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        comprehend(
            &self.generators,
            Element::Single(&self.elt),
            Accumulator::Set(IndexSet::new()),
            env,
            ctx,
        )
    }
}

impl Evaluate for ast::ExprDictComp {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        comprehend(
            &self.generators,
            Element::Pair(&self.key, &self.value),
            Accumulator::Dict(IndexMap::new()),
            env,
            ctx,
        )
    }
}

fn comprehend(
    generators: &[ast::Comprehension],
    element: Element<'_>,
    mut acc: Accumulator,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value> {
    run_clauses(generators, element, &mut acc, env, ctx)?;
    Ok(acc.into_value())
}

fn run_clauses(
    generators: &[ast::Comprehension],
    element: Element<'_>,
    acc: &mut Accumulator,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<()> {
    let Some((clause, rest)) = generators.split_first() else {
        element.push(acc, env, ctx)?;
        return check_len(acc.len());
    };

    let mut names = Vec::new();
    target_names(&clause.target, &mut names);

    let source = clause.iter.eval(env, ctx)?;
    let mut iter = iterate(&source)?;
    while let Some(item) = iter.next(ctx)? {
        ctx.check_interrupt()?;
        let step = accept(clause, item, env, ctx).and_then(|accepted| {
            if accepted {
                run_clauses(rest, element, acc, env, ctx)
            } else {
                Ok(())
            }
        });
        for name in &names {
            env.discard(name);
        }
        step?;
    }
    Ok(())
}

/// Bind one element to the clause target and test every filter.
fn accept(
    clause: &ast::Comprehension,
    item: Value,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<bool> {
    assign_target(&clause.target, item, env, ctx)?;
    for condition in &clause.ifs {
        if !condition.eval(env, ctx)?.truthy() {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::{eval_in, show};
    use crate::{Environment, EvalContext};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_comprehension() {
        assert_eq!(show("[x * x for x in range(5)]"), "[0, 1, 4, 9, 16]");
        assert_eq!(show("[x for x in range(10) if x % 2 if x > 3]"), "[5, 7, 9]");
    }

    #[test]
    fn test_chained_clauses() {
        assert_eq!(
            show("[(x, y) for x in range(3) for y in range(x)]"),
            "[(1, 0), (2, 0), (2, 1)]"
        );
        assert_eq!(show("[c for w in ['ab', 'cd'] for c in w]"), "['a', 'b', 'c', 'd']");
    }

    #[test]
    fn test_set_and_dict() {
        assert_eq!(show("{x % 3 for x in range(10)}"), "{0, 1, 2}");
        assert_eq!(show("{k: v for k, v in [('a', 1), ('b', 2)]}"), "{'a': 1, 'b': 2}");
    }

    #[test]
    fn test_variables_do_not_leak() {
        let mut env = Environment::new();
        let ctx = EvalContext::new();
        eval_in("r = [i for i in range(3)]", &mut env, &ctx).unwrap();
        assert!(env.get("i").is_none());
        assert!(env.get("r").is_some());
    }

    #[test]
    fn test_shadowed_local_is_removed() {
        assert_eq!(
            show("x = 'outer'\n[x for x in range(2)]\nx"),
            "NameError: name 'x' is not defined"
        );
        assert_eq!(show("x = 'outer'\n[x for x in []]\nx"), "'outer'");
    }

    #[test]
    fn test_failure_cleans_up() {
        let mut env = Environment::new();
        let ctx = EvalContext::new();
        assert!(eval_in("[1 / (2 - n) for n in range(5)]", &mut env, &ctx).is_err());
        assert!(env.get("n").is_none());
    }

    #[test]
    fn test_unhashable_set_element() {
        assert_eq!(
            show("{[x] for x in range(2)}"),
            "TypeError: unhashable type: 'list'"
        );
    }
}
