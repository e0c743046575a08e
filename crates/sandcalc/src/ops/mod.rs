//! Operator semantics shared by expressions, augmented assignment and the
//! `operator` module

mod calendar;
pub(crate) mod numeric;
mod sequence;
mod sets;

pub(crate) use numeric::{divmod, int_true_div};

use rustpython_parser::ast;

use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::format;
use crate::value::{iterate, set_contains, Complex, HashKey, OrderOp, Value, ViewKind};

/// Largest integer result (in bits) produced by `**`, `<<` and `*`.
pub const MAX_INT_BITS: u64 = 1_000_000;

// ═══════════════════════════════════════════════════════════════════════
// Operator kinds
// ═══════════════════════════════════════════════════════════════════════

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinaryOp {
    /// Operator token as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::MatMul => "@",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "** or pow()",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
        }
    }
}

impl From<ast::Operator> for BinaryOp {
    fn from(op: ast::Operator) -> Self {
        match op {
            ast::Operator::Add => BinaryOp::Add,
            ast::Operator::Sub => BinaryOp::Sub,
            ast::Operator::Mult => BinaryOp::Mul,
            ast::Operator::MatMult => BinaryOp::MatMul,
            ast::Operator::Div => BinaryOp::Div,
            ast::Operator::Mod => BinaryOp::Mod,
            ast::Operator::Pow => BinaryOp::Pow,
            ast::Operator::LShift => BinaryOp::LShift,
            ast::Operator::RShift => BinaryOp::RShift,
            ast::Operator::BitOr => BinaryOp::BitOr,
            ast::Operator::BitXor => BinaryOp::BitXor,
            ast::Operator::BitAnd => BinaryOp::BitAnd,
            ast::Operator::FloorDiv => BinaryOp::FloorDiv,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum UnaryOp {
    Invert,
    Not,
    Pos,
    Neg,
}

impl From<ast::UnaryOp> for UnaryOp {
    fn from(op: ast::UnaryOp) -> Self {
        match op {
            ast::UnaryOp::Invert => UnaryOp::Invert,
            ast::UnaryOp::Not => UnaryOp::Not,
            ast::UnaryOp::UAdd => UnaryOp::Pos,
            ast::UnaryOp::USub => UnaryOp::Neg,
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl From<ast::CmpOp> for CompareOp {
    fn from(op: ast::CmpOp) -> Self {
        match op {
            ast::CmpOp::Eq => CompareOp::Eq,
            ast::CmpOp::NotEq => CompareOp::NotEq,
            ast::CmpOp::Lt => CompareOp::Lt,
            ast::CmpOp::LtE => CompareOp::LtE,
            ast::CmpOp::Gt => CompareOp::Gt,
            ast::CmpOp::GtE => CompareOp::GtE,
            ast::CmpOp::Is => CompareOp::Is,
            ast::CmpOp::IsNot => CompareOp::IsNot,
            ast::CmpOp::In => CompareOp::In,
            ast::CmpOp::NotIn => CompareOp::NotIn,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Binary dispatch
// ═══════════════════════════════════════════════════════════════════════

/// Apply a binary operator.
///
/// Rules are tried in order: numbers, `str % args`, sequences, sets and
/// dicts, calendar values.
pub fn binary_op(ctx: &EvalContext, op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if let Some(result) = numeric::arith(op, left, right) {
        return result;
    }
    if op == BinaryOp::Mod {
        if let Value::Str(template) = left {
            return format::printf(ctx, template, right).map(Value::from);
        }
    }
    if let Some(result) = sequence::apply(ctx, op, left, right) {
        return result;
    }
    if let Some(result) = sets::apply(op, left, right) {
        return result;
    }
    if let Some(result) = calendar::apply(op, left, right) {
        return result;
    }
    Err(mismatch_error(op, left, right))
}

fn mismatch_error(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    match (op, left) {
        (BinaryOp::Add, Value::Bytes(_)) => EvalError::type_error(format!(
            "can't concat {} to bytes",
            right.type_name()
        )),
        (BinaryOp::Add, Value::Str(_) | Value::List(_) | Value::Tuple(_)) => {
            EvalError::type_error(format!(
                "can only concatenate {0} (not \"{1}\") to {0}",
                left.type_name(),
                right.type_name()
            ))
        }
        (BinaryOp::Mul, _) if sequence::is_sequence(left) || sequence::is_sequence(right) => {
            let other = if sequence::is_sequence(left) { right } else { left };
            EvalError::type_error(format!(
                "can't multiply sequence by non-int of type '{}'",
                other.type_name()
            ))
        }
        _ => numeric::unsupported(op.symbol(), left, right),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Unary dispatch
// ═══════════════════════════════════════════════════════════════════════

/// Apply a unary operator.
pub fn unary_op(op: UnaryOp, operand: &Value) -> Result<Value> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!operand.truthy()));
    }
    let result = match (op, operand) {
        (UnaryOp::Neg, Value::Bool(b)) => Value::from(-(*b as i64)),
        (UnaryOp::Neg, Value::Int(n)) => Value::Int(-n),
        (UnaryOp::Neg, Value::Float(f)) => Value::Float(-f),
        (UnaryOp::Neg, Value::Complex(c)) => Value::Complex(Complex::new(-c.re, -c.im)),
        (UnaryOp::Neg, Value::Decimal(d)) => Value::Decimal(d.neg()?),
        (UnaryOp::Neg, Value::TimeDelta(td)) => Value::TimeDelta(calendar::negate(*td)?),
        (UnaryOp::Pos, Value::Bool(b)) => Value::from(*b as i64),
        (UnaryOp::Pos, Value::Decimal(d)) => Value::Decimal(d.pos()?),
        (UnaryOp::Pos, Value::Int(_) | Value::Float(_) | Value::Complex(_) | Value::TimeDelta(_)) => {
            operand.clone()
        }
        (UnaryOp::Invert, Value::Bool(b)) => Value::from(!(*b as i64)),
        (UnaryOp::Invert, Value::Int(n)) => Value::Int(!n.clone()),
        _ => {
            let symbol = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                _ => "~",
            };
            return Err(EvalError::type_error(format!(
                "bad operand type for unary {}: '{}'",
                symbol,
                operand.type_name()
            )));
        }
    };
    Ok(result)
}

// ═══════════════════════════════════════════════════════════════════════
// Comparison
// ═══════════════════════════════════════════════════════════════════════

/// Apply one comparison of a chain.
pub fn compare_op(ctx: &EvalContext, op: CompareOp, left: &Value, right: &Value) -> Result<bool> {
    match op {
        CompareOp::Eq => left.py_eq(right),
        CompareOp::NotEq => left.py_eq(right).map(|eq| !eq),
        CompareOp::Lt => left.py_order(right, OrderOp::Lt),
        CompareOp::LtE => left.py_order(right, OrderOp::Le),
        CompareOp::Gt => left.py_order(right, OrderOp::Gt),
        CompareOp::GtE => left.py_order(right, OrderOp::Ge),
        CompareOp::Is => Ok(left.is_same(right)),
        CompareOp::IsNot => Ok(!left.is_same(right)),
        CompareOp::In => contains(ctx, right, left),
        CompareOp::NotIn => contains(ctx, right, left).map(|found| !found),
    }
}

/// `item in container`.
pub fn contains(ctx: &EvalContext, container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(EvalError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Bytes(haystack) => match item {
            Value::Bytes(needle) => Ok(sequence::find_bytes(haystack, needle, 0).is_some()),
            other => {
                let byte = other.to_i64().map_err(|_| {
                    EvalError::type_error(format!(
                        "a bytes-like object is required, not '{}'",
                        other.type_name()
                    ))
                })?;
                if !(0..=255).contains(&byte) {
                    return Err(EvalError::value_error("byte must be in range(0, 256)"));
                }
                Ok(haystack.contains(&(byte as u8)))
            }
        },
        Value::Range(range) => match item {
            Value::Int(_) | Value::Bool(_) => Ok(item
                .as_bigint()
                .map(|n| range.contains(&n))
                .unwrap_or(false)),
            _ => scan(ctx, container, item),
        },
        Value::Dict(map) => {
            let key = HashKey::new(item.clone())?;
            Ok(map.borrow().contains_key(&key))
        }
        Value::Set(_) | Value::FrozenSet(_) | Value::DictView(..) => {
            if let Value::DictView(ViewKind::Values, _) = container {
                return scan(ctx, container, item);
            }
            set_contains(container, item)
        }
        Value::List(items) => {
            let len = items.borrow().len();
            for i in 0..len {
                let Some(candidate) = items.borrow().get(i).cloned() else {
                    break;
                };
                if candidate.is_same(item) || candidate.py_eq(item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Tuple(items) => {
            for candidate in items.iter() {
                if candidate.is_same(item) || candidate.py_eq(item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Iterator(_) => scan(ctx, container, item),
        other => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn scan(ctx: &EvalContext, container: &Value, item: &Value) -> Result<bool> {
    let mut iter = iterate(container)?;
    while let Some(candidate) = iter.next(ctx)? {
        ctx.check_interrupt()?;
        if candidate.is_same(item) || candidate.py_eq(item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx() -> EvalContext {
        EvalContext::new()
    }

    #[test]
    fn test_concat_errors() {
        let err = binary_op(&ctx(), BinaryOp::Add, &Value::str("a"), &Value::from(1i64)).unwrap_err();
        assert_eq!(err.to_string(), "can only concatenate str (not \"int\") to str");
        let err = binary_op(&ctx(), BinaryOp::Sub, &Value::str("a"), &Value::from(1i64)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for -: 'str' and 'int'"
        );
        let err = binary_op(&ctx(), BinaryOp::Mul, &Value::list(vec![]), &Value::from(1.5)).unwrap_err();
        assert_eq!(err.to_string(), "can't multiply sequence by non-int of type 'float'");
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary_op(UnaryOp::Invert, &Value::from(5i64)).unwrap().repr(), "-6");
        assert_eq!(unary_op(UnaryOp::Neg, &Value::Bool(true)).unwrap().repr(), "-1");
        assert_eq!(unary_op(UnaryOp::Not, &Value::list(vec![])).unwrap().repr(), "True");
        let err = unary_op(UnaryOp::Neg, &Value::str("x")).unwrap_err();
        assert_eq!(err.to_string(), "bad operand type for unary -: 'str'");
    }

    #[test]
    fn test_membership() {
        let c = ctx();
        assert!(contains(&c, &Value::str("hello"), &Value::str("ell")).unwrap());
        let list = Value::list(vec![Value::from(1i64), Value::from(2.0)]);
        assert!(contains(&c, &list, &Value::from(2i64)).unwrap());
        assert!(!contains(&c, &list, &Value::from(3i64)).unwrap());
        let err = contains(&c, &Value::from(1i64), &Value::from(1i64)).unwrap_err();
        assert_eq!(err.to_string(), "argument of type 'int' is not iterable");
    }

    #[test]
    fn test_compare_identity() {
        let c = ctx();
        let list = Value::list(vec![]);
        assert!(compare_op(&c, CompareOp::Is, &list, &list.clone()).unwrap());
        assert!(!compare_op(&c, CompareOp::Is, &list, &Value::list(vec![])).unwrap());
        assert!(compare_op(&c, CompareOp::Is, &Value::None, &Value::None).unwrap());
    }
}
