//! The `operator` namespace: operators as plain functions

use std::rc::Rc;

use super::{builtin, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::ops::{self, BinaryOp, CompareOp, UnaryOp};
use crate::value::{del_item, get_item, iterate, set_item, Value};

fn binary(fname: &str, op: BinaryOp, ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed(fname, ["a", "b"])?;
    ops::binary_op(ctx, op, &a, &b)
}

fn compare(fname: &str, op: CompareOp, ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed(fname, ["a", "b"])?;
    ops::compare_op(ctx, op, &a, &b).map(Value::Bool)
}

fn unary(fname: &str, op: UnaryOp, args: Args) -> Result<Value> {
    let [a] = args.fixed(fname, ["a"])?;
    ops::unary_op(op, &a)
}

macro_rules! binary_fn {
    ($($fn_name:ident => ($py_name:literal, $op:expr)),* $(,)?) => {
        $(
            fn $fn_name(ctx: &EvalContext, args: Args) -> Result<Value> {
                binary($py_name, $op, ctx, args)
            }
        )*
    };
}

macro_rules! compare_fn {
    ($($fn_name:ident => ($py_name:literal, $op:expr)),* $(,)?) => {
        $(
            fn $fn_name(ctx: &EvalContext, args: Args) -> Result<Value> {
                compare($py_name, $op, ctx, args)
            }
        )*
    };
}

macro_rules! unary_fn {
    ($($fn_name:ident => ($py_name:literal, $op:expr)),* $(,)?) => {
        $(
            fn $fn_name(_ctx: &EvalContext, args: Args) -> Result<Value> {
                unary($py_name, $op, args)
            }
        )*
    };
}

binary_fn! {
    operator_add => ("add", BinaryOp::Add),
    operator_and => ("and_", BinaryOp::BitAnd),
    operator_floordiv => ("floordiv", BinaryOp::FloorDiv),
    operator_lshift => ("lshift", BinaryOp::LShift),
    operator_mod => ("mod", BinaryOp::Mod),
    operator_mul => ("mul", BinaryOp::Mul),
    operator_matmul => ("matmul", BinaryOp::MatMul),
    operator_or => ("or_", BinaryOp::BitOr),
    operator_pow => ("pow", BinaryOp::Pow),
    operator_rshift => ("rshift", BinaryOp::RShift),
    operator_sub => ("sub", BinaryOp::Sub),
    operator_truediv => ("truediv", BinaryOp::Div),
    operator_xor => ("xor", BinaryOp::BitXor),
}

compare_fn! {
    operator_lt => ("lt", CompareOp::Lt),
    operator_le => ("le", CompareOp::LtE),
    operator_eq => ("eq", CompareOp::Eq),
    operator_ne => ("ne", CompareOp::NotEq),
    operator_ge => ("ge", CompareOp::GtE),
    operator_gt => ("gt", CompareOp::Gt),
    operator_is => ("is_", CompareOp::Is),
    operator_is_not => ("is_not", CompareOp::IsNot),
}

unary_fn! {
    operator_not => ("not_", UnaryOp::Not),
    operator_inv => ("inv", UnaryOp::Invert),
    operator_invert => ("invert", UnaryOp::Invert),
    operator_neg => ("neg", UnaryOp::Neg),
    operator_pos => ("pos", UnaryOp::Pos),
}

fn operator_truth(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a] = args.fixed("truth", ["a"])?;
    Ok(Value::Bool(a.truthy()))
}

fn operator_index(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a] = args.fixed("index", ["a"])?;
    match a {
        Value::Bool(_) | Value::Int(_) => a.to_index().map(Value::Int),
        other => Err(EvalError::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            other.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Sequences
// ═══════════════════════════════════════════════════════════════════════

fn operator_concat(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("concat", ["a", "b"])?;
    if !matches!(
        a,
        Value::Str(_) | Value::Bytes(_) | Value::List(_) | Value::Tuple(_)
    ) {
        return Err(EvalError::type_error(format!(
            "'{}' object can't be concatenated",
            a.type_name()
        )));
    }
    ops::binary_op(ctx, BinaryOp::Add, &a, &b)
}

fn operator_contains(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("contains", ["a", "b"])?;
    ops::contains(ctx, &a, &b).map(Value::Bool)
}

fn operator_count_of(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("countOf", ["a", "b"])?;
    let mut source = iterate(&a)?;
    let mut count = 0usize;
    while let Some(item) = source.next(ctx)? {
        if item.is_same(&b) || item.py_eq(&b)? {
            count += 1;
        }
    }
    Ok(Value::from(count))
}

fn operator_index_of(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("indexOf", ["a", "b"])?;
    let mut source = iterate(&a)?;
    let mut index = 0usize;
    while let Some(item) = source.next(ctx)? {
        if item.is_same(&b) || item.py_eq(&b)? {
            return Ok(Value::from(index));
        }
        index += 1;
    }
    Err(EvalError::value_error("sequence.index(x): x not in sequence"))
}

fn operator_getitem(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("getitem", ["a", "b"])?;
    get_item(&a, &b)
}

fn operator_setitem(ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b, c] = args.fixed("setitem", ["a", "b", "c"])?;
    set_item(ctx, &a, &b, c)?;
    Ok(Value::None)
}

fn operator_delitem(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [a, b] = args.fixed("delitem", ["a", "b"])?;
    del_item(&a, &b)?;
    Ok(Value::None)
}

fn operator_length_hint(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([obj], [default]) = args.bind("length_hint", ["obj"], ["default"])?;
    let default = match default {
        Some(d) => match d {
            Value::Bool(_) | Value::Int(_) => d,
            other => {
                return Err(EvalError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    other.type_name()
                )))
            }
        },
        None => Value::from(0i64),
    };
    let hint = match &obj {
        Value::Str(s) => Some(s.chars().count()),
        Value::Bytes(b) => Some(b.len()),
        Value::List(items) => Some(items.borrow().len()),
        Value::Tuple(items) => Some(items.len()),
        Value::Dict(map) | Value::DictView(_, map) => Some(map.borrow().len()),
        Value::Set(set) => Some(set.borrow().len()),
        Value::FrozenSet(set) => Some(set.len()),
        Value::Range(r) => Some(r.len().max(0) as usize),
        Value::Iterator(iter) => iter.try_borrow().ok().and_then(|it| it.len_hint()),
        _ => None,
    };
    Ok(hint.map_or(default, Value::from))
}

fn operator_itemgetter(_ctx: &EvalContext, args: Args) -> Result<Value> {
    args.no_keywords("itemgetter")?;
    if args.positional.is_empty() {
        return Err(EvalError::type_error(
            "itemgetter expected 1 argument, got 0",
        ));
    }
    Ok(Value::ItemGetter(Rc::from(args.positional)))
}

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    let func: fn(&EvalContext, Args) -> Result<Value> = match name {
        "lt" => operator_lt,
        "le" => operator_le,
        "eq" => operator_eq,
        "ne" => operator_ne,
        "ge" => operator_ge,
        "gt" => operator_gt,
        "not_" => operator_not,
        "truth" => operator_truth,
        "is_" => operator_is,
        "is_not" => operator_is_not,
        "add" => operator_add,
        "and_" => operator_and,
        "floordiv" => operator_floordiv,
        "index" => operator_index,
        "inv" => operator_inv,
        "invert" => operator_invert,
        "lshift" => operator_lshift,
        "mod" => operator_mod,
        "mul" => operator_mul,
        "matmul" => operator_matmul,
        "neg" => operator_neg,
        "or_" => operator_or,
        "pos" => operator_pos,
        "pow" => operator_pow,
        "rshift" => operator_rshift,
        "sub" => operator_sub,
        "truediv" => operator_truediv,
        "xor" => operator_xor,
        "concat" => operator_concat,
        "contains" => operator_contains,
        "countOf" => operator_count_of,
        "delitem" => operator_delitem,
        "getitem" => operator_getitem,
        "indexOf" => operator_index_of,
        "setitem" => operator_setitem,
        "length_hint" => operator_length_hint,
        "itemgetter" => operator_itemgetter,
        _ => return None,
    };
    Some(builtin(name, func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(name: &'static str, args: Vec<Value>) -> String {
        let ctx = EvalContext::new();
        let Some(Value::Builtin(f)) = module_attr(name) else {
            panic!("operator.{} missing", name);
        };
        match f.call(&ctx, Args::positional(args)) {
            Ok(v) => v.repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_arithmetic_and_comparison() {
        assert_eq!(run("add", vec![Value::from(2i64), Value::from(3i64)]), "5");
        assert_eq!(run("truediv", vec![Value::from(1i64), Value::from(4i64)]), "0.25");
        assert_eq!(run("lt", vec![Value::from(1i64), Value::from(2i64)]), "True");
        assert_eq!(run("neg", vec![Value::from(5i64)]), "-5");
        assert_eq!(
            run("floordiv", vec![Value::from(1i64), Value::from(0i64)]),
            "ZeroDivisionError: integer division or modulo by zero"
        );
    }

    #[test]
    fn test_sequence_helpers() {
        let data = Value::list(vec![Value::from(1i64), Value::from(2i64), Value::from(1i64)]);
        assert_eq!(run("countOf", vec![data.clone(), Value::from(1i64)]), "2");
        assert_eq!(run("indexOf", vec![data.clone(), Value::from(2i64)]), "1");
        assert_eq!(
            run("indexOf", vec![data.clone(), Value::from(9i64)]),
            "ValueError: sequence.index(x): x not in sequence"
        );
        assert_eq!(run("contains", vec![data.clone(), Value::from(2i64)]), "True");
        assert_eq!(run("length_hint", vec![data]), "3");
        assert_eq!(
            run("concat", vec![Value::from(1i64), Value::from(2i64)]),
            "TypeError: 'int' object can't be concatenated"
        );
    }

    #[test]
    fn test_itemgetter_builds_getter() {
        let getter = run("itemgetter", vec![Value::from(1i64)]);
        assert!(getter.contains("itemgetter"), "{}", getter);
        assert_eq!(
            run("itemgetter", vec![]),
            "TypeError: itemgetter expected 1 argument, got 0"
        );
    }
}
