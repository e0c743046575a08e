//! Value representation for runtime values

mod compare;
mod complex;
pub(crate) mod datetime;
mod decimal;
pub(crate) mod display;
mod hashable;
mod iter;
mod subscript;

pub use compare::OrderOp;
pub(crate) use compare::{set_contains, set_members};
pub use complex::Complex;
pub use datetime::{DateTimeValue, TimeDelta, TimeValue};
pub use decimal::Decimal;
pub use display::{float_repr, Rendered};
pub use hashable::HashKey;
pub use iter::{collect, iterate, ValueIter};
pub use subscript::{del_item, get_item, set_item, SliceIndices};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use chrono::{FixedOffset, NaiveDate};
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::builtins::Args;
use crate::capability::ModuleId;
use crate::context::EvalContext;
use crate::error::{EvalError, Result};

/// Largest collection the evaluator will materialise.
pub const MAX_COLLECTION_LEN: usize = 10_000_000;

/// Nesting limit for structural recursion (equality, hashing, rendering).
pub const MAX_NESTING: usize = 1_000;

/// Shared, mutable list storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable, insertion-ordered dict storage.
pub type DictRef = Rc<RefCell<IndexMap<HashKey, Value>>>;

/// Shared, mutable, insertion-ordered set storage.
pub type SetRef = Rc<RefCell<IndexSet<HashKey>>>;

/// Native function signature.
pub type BuiltinFnPtr = fn(&EvalContext, Args) -> Result<Value>;

/// Runtime value representation for the sandboxed interpreter.
///
/// Values are organized into four tiers:
/// - Tier 1: Immediate scalars
/// - Tier 2: Shared containers (`Rc`-wrapped, interior mutability where the
///   native type is mutable)
/// - Tier 3: Calendar values
/// - Tier 4: Capabilities (functions, types, modules, bound methods)
#[derive(Clone)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Tier 1: Immediate scalars
    // ═══════════════════════════════════════════════════════════════════
    /// The absence value
    None,

    /// The `...` literal
    Ellipsis,

    /// Boolean (a subtype of int for arithmetic)
    Bool(bool),

    /// Arbitrary-precision integer
    Int(BigInt),

    /// Binary floating point
    Float(f64),

    /// Complex number
    Complex(Complex),

    /// Precision decimal (numeric literals in precision mode)
    Decimal(Decimal),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 2: Containers
    // ═══════════════════════════════════════════════════════════════════
    /// Immutable text
    Str(Rc<str>),

    /// Immutable byte string
    Bytes(Rc<[u8]>),

    /// Mutable list
    List(ListRef),

    /// Immutable tuple
    Tuple(Rc<[Value]>),

    /// Mutable mapping
    Dict(DictRef),

    /// Live view over a dict
    DictView(ViewKind, DictRef),

    /// Mutable set
    Set(SetRef),

    /// Immutable set
    FrozenSet(Rc<IndexSet<HashKey>>),

    /// Lazy integer progression
    Range(Range),

    /// Slice object produced by `a[x:y:z]`
    Slice(Rc<Slice>),

    /// Lazy single-pass iterator
    Iterator(Rc<RefCell<ValueIter>>),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 3: Calendar values
    // ═══════════════════════════════════════════════════════════════════
    /// `datetime.date`
    Date(NaiveDate),

    /// `datetime.datetime`, naive or with a fixed offset
    DateTime(DateTimeValue),

    /// `datetime.time`
    Time(TimeValue),

    /// `datetime.timedelta`
    TimeDelta(TimeDelta),

    /// `datetime.timezone`
    TimeZone(FixedOffset),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 4: Capabilities
    // ═══════════════════════════════════════════════════════════════════
    /// Native function
    Builtin(Builtin),

    /// Type object (constructor and class-attribute namespace)
    Type(PyType),

    /// Allowlisted module namespace
    Module(ModuleId),

    /// Method bound to its receiver
    Method(Rc<BoundMethod>),

    /// `operator.itemgetter(...)` result
    ItemGetter(Rc<[Value]>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Supporting types
// ═══════════════════════════════════════════════════════════════════════

/// Native function value.
#[derive(Clone, Copy)]
pub struct Builtin {
    /// Name shown in reprs and error messages
    pub name: &'static str,

    /// Implementation
    pub func: BuiltinFnPtr,
}

impl Builtin {
    /// Create a builtin function value.
    pub const fn new(name: &'static str, func: BuiltinFnPtr) -> Self {
        Self { name, func }
    }

    /// Invoke the function.
    pub fn call(&self, ctx: &EvalContext, args: Args) -> Result<Value> {
        (self.func)(ctx, args)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.func as usize == other.func as usize
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

/// A method looked up on a receiver, called later.
#[derive(Clone)]
pub struct BoundMethod {
    /// The value (or type object) the method was read from
    pub receiver: Value,

    /// Allowlisted method name
    pub name: &'static str,
}

/// Which projection of a dict a view exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// `dict.keys()`
    Keys,
    /// `dict.values()`
    Values,
    /// `dict.items()`
    Items,
}

/// `range(start, stop, step)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// First value
    pub start: i64,
    /// Exclusive bound
    pub stop: i64,
    /// Non-zero increment
    pub step: i64,
}

impl Range {
    /// Number of values produced.
    pub fn len(&self) -> i64 {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let n = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / (-step) + 1
        } else {
            0
        };
        n.min(i64::MAX as i128) as i64
    }

    /// Whether the range produces no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th value (caller checks bounds).
    pub fn nth(&self, i: i64) -> i64 {
        (self.start as i128 + i as i128 * self.step as i128) as i64
    }

    /// Membership test for an integer.
    pub fn contains(&self, n: &BigInt) -> bool {
        let Some(n) = n.to_i64() else {
            return false;
        };
        let (n, start, stop, step) = (n as i128, self.start as i128, self.stop as i128, self.step as i128);
        let in_bounds = if step > 0 {
            start <= n && n < stop
        } else {
            stop < n && n <= start
        };
        in_bounds && (n - start) % step == 0
    }
}

/// Slice object: each bound is `None` or an integer-like value.
#[derive(Clone)]
pub struct Slice {
    /// Lower bound
    pub start: Value,
    /// Upper bound
    pub stop: Value,
    /// Step
    pub step: Value,
}

/// Stable identity for every native type the sandbox can name.
///
/// Capability maps and `isinstance` checks key on this instead of any
/// live object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum PyType {
    NoneType,
    Ellipsis,
    Bool,
    Int,
    Float,
    Complex,
    Decimal,
    Str,
    Bytes,
    List,
    Tuple,
    Dict,
    DictKeys,
    DictValues,
    DictItems,
    Set,
    FrozenSet,
    Range,
    Slice,
    Iterator,
    Date,
    DateTime,
    Time,
    TimeDelta,
    TimeZone,
    TzInfo,
    BuiltinFunction,
    Type,
    Module,
    ItemGetter,
}

impl PyType {
    /// The type's `__name__`.
    pub fn name(self) -> &'static str {
        match self {
            PyType::NoneType => "NoneType",
            PyType::Ellipsis => "ellipsis",
            PyType::Bool => "bool",
            PyType::Int => "int",
            PyType::Float => "float",
            PyType::Complex => "complex",
            PyType::Decimal => "Decimal",
            PyType::Str => "str",
            PyType::Bytes => "bytes",
            PyType::List => "list",
            PyType::Tuple => "tuple",
            PyType::Dict => "dict",
            PyType::DictKeys => "dict_keys",
            PyType::DictValues => "dict_values",
            PyType::DictItems => "dict_items",
            PyType::Set => "set",
            PyType::FrozenSet => "frozenset",
            PyType::Range => "range",
            PyType::Slice => "slice",
            PyType::Iterator => "iterator",
            PyType::Date => "date",
            PyType::DateTime => "datetime",
            PyType::Time => "time",
            PyType::TimeDelta => "timedelta",
            PyType::TimeZone => "timezone",
            PyType::TzInfo => "tzinfo",
            PyType::BuiltinFunction => "builtin_function_or_method",
            PyType::Type => "type",
            PyType::Module => "module",
            PyType::ItemGetter => "itemgetter",
        }
    }

    /// Module-qualified name used by `repr(type)`.
    pub fn qualified_name(self) -> String {
        match self {
            PyType::Decimal => "decimal.Decimal".to_string(),
            PyType::Date
            | PyType::DateTime
            | PyType::Time
            | PyType::TimeDelta
            | PyType::TimeZone
            | PyType::TzInfo => format!("datetime.{}", self.name()),
            PyType::ItemGetter => "operator.itemgetter".to_string(),
            other => other.name().to_string(),
        }
    }

    /// Direct base type, if any besides `object`.
    pub fn base(self) -> Option<PyType> {
        match self {
            PyType::Bool => Some(PyType::Int),
            PyType::DateTime => Some(PyType::Date),
            PyType::TimeZone => Some(PyType::TzInfo),
            _ => None,
        }
    }

    /// `issubclass(self, other)`.
    pub fn is_subtype_of(self, other: PyType) -> bool {
        let mut current = Some(self);
        while let Some(t) = current {
            if t == other {
                return true;
            }
            current = t.base();
        }
        false
    }
}

impl fmt::Display for PyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.qualified_name())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Structural recursion guard
// ═══════════════════════════════════════════════════════════════════════

thread_local! {
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

/// Guard for recursive walks over nested values.
pub(crate) struct NestingGuard;

impl NestingGuard {
    pub(crate) fn enter() -> Result<Self> {
        NESTING.with(|depth| {
            let current = depth.get();
            if current >= MAX_NESTING {
                return Err(EvalError::Recursion { depth: MAX_NESTING });
            }
            depth.set(current + 1);
            Ok(NestingGuard)
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        NESTING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Fail with MemoryError if a collection would exceed the size cap.
pub fn check_len(len: usize) -> Result<()> {
    if len > MAX_COLLECTION_LEN {
        Err(EvalError::memory(format!(
            "collection of {} elements exceeds the limit of {}",
            len, MAX_COLLECTION_LEN
        )))
    } else {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Constructors
// ═══════════════════════════════════════════════════════════════════════

impl Value {
    /// Text value.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Byte string value.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(Rc::from(data.into()))
    }

    /// Integer value.
    pub fn int(n: impl Into<BigInt>) -> Self {
        Value::Int(n.into())
    }

    /// New list.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// New tuple.
    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::from(items))
    }

    /// New dict.
    pub fn dict(entries: IndexMap<HashKey, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    /// New set.
    pub fn set(items: IndexSet<HashKey>) -> Self {
        Value::Set(Rc::new(RefCell::new(items)))
    }

    /// New frozenset.
    pub fn frozenset(items: IndexSet<HashKey>) -> Self {
        Value::FrozenSet(Rc::new(items))
    }

    /// Wrap a lazy iterator.
    pub fn iterator(iter: ValueIter) -> Self {
        Value::Iterator(Rc::new(RefCell::new(iter)))
    }

    /// Bind a method name to a receiver.
    pub fn method(receiver: Value, name: &'static str) -> Self {
        Value::Method(Rc::new(BoundMethod { receiver, name }))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Type queries and conversions
// ═══════════════════════════════════════════════════════════════════════

impl Value {
    /// Runtime type of this value.
    pub fn py_type(&self) -> PyType {
        match self {
            Value::None => PyType::NoneType,
            Value::Ellipsis => PyType::Ellipsis,
            Value::Bool(_) => PyType::Bool,
            Value::Int(_) => PyType::Int,
            Value::Float(_) => PyType::Float,
            Value::Complex(_) => PyType::Complex,
            Value::Decimal(_) => PyType::Decimal,
            Value::Str(_) => PyType::Str,
            Value::Bytes(_) => PyType::Bytes,
            Value::List(_) => PyType::List,
            Value::Tuple(_) => PyType::Tuple,
            Value::Dict(_) => PyType::Dict,
            Value::DictView(ViewKind::Keys, _) => PyType::DictKeys,
            Value::DictView(ViewKind::Values, _) => PyType::DictValues,
            Value::DictView(ViewKind::Items, _) => PyType::DictItems,
            Value::Set(_) => PyType::Set,
            Value::FrozenSet(_) => PyType::FrozenSet,
            Value::Range(_) => PyType::Range,
            Value::Slice(_) => PyType::Slice,
            Value::Iterator(_) => PyType::Iterator,
            Value::Date(_) => PyType::Date,
            Value::DateTime(_) => PyType::DateTime,
            Value::Time(_) => PyType::Time,
            Value::TimeDelta(_) => PyType::TimeDelta,
            Value::TimeZone(_) => PyType::TimeZone,
            Value::Builtin(_) | Value::Method(_) => PyType::BuiltinFunction,
            Value::Type(_) => PyType::Type,
            Value::Module(_) => PyType::Module,
            Value::ItemGetter(_) => PyType::ItemGetter,
        }
    }

    /// Type name as used in native error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Iterator(iter) => iter.try_borrow().map(|it| it.kind()).unwrap_or("iterator"),
            other => other.py_type().name(),
        }
    }

    /// Whether this is the absence value.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Whether this is a real or complex number (bool included).
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Complex(_) | Value::Decimal(_)
        )
    }

    /// Truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => !n.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::Complex(c) => c.re != 0.0 || c.im != 0.0,
            Value::Decimal(d) => !d.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(map) | Value::DictView(_, map) => !map.borrow().is_empty(),
            Value::Set(set) => !set.borrow().is_empty(),
            Value::FrozenSet(set) => !set.is_empty(),
            Value::Range(r) => !r.is_empty(),
            Value::TimeDelta(td) => !td.is_zero(),
            _ => true,
        }
    }

    /// Integer value of a bool or int.
    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Bool(b) => Some(BigInt::from(*b as u8)),
            Value::Int(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Interpret as an integer index.
    ///
    /// Integral decimals are accepted so precision-mode literals work as
    /// indices and counts.
    pub fn to_index(&self) -> Result<BigInt> {
        match self {
            Value::Bool(b) => Ok(BigInt::from(*b as u8)),
            Value::Int(n) => Ok(n.clone()),
            Value::Decimal(d) => d.to_integer().ok_or_else(|| not_an_integer(self)),
            _ => Err(not_an_integer(self)),
        }
    }

    /// Interpret as a machine-sized integer index.
    pub fn to_i64(&self) -> Result<i64> {
        self.to_index()?.to_i64().ok_or_else(|| {
            EvalError::overflow("Python int too large to convert to C ssize_t")
        })
    }

    /// Interpret as a non-negative count (negative counts become zero).
    pub fn to_count(&self) -> Result<usize> {
        let n = self.to_index()?;
        if n.is_negative() {
            return Ok(0);
        }
        n.to_usize()
            .ok_or_else(|| EvalError::overflow("cannot fit 'int' into an index-sized integer"))
    }

    /// Interpret as a binary float.
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => int_to_f64(n),
            Value::Float(f) => Ok(*f),
            Value::Decimal(d) => Ok(d.to_f64()),
            _ => Err(EvalError::type_error(format!(
                "must be real number, not {}",
                self.type_name()
            ))),
        }
    }

    /// Borrow the text of a `str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Convert an integer to the nearest float, failing like the native
/// conversion when out of range.
pub fn int_to_f64(n: &BigInt) -> Result<f64> {
    match n.to_f64() {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(EvalError::overflow("int too large to convert to float")),
    }
}

fn not_an_integer(value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "'{}' object cannot be interpreted as an integer",
        value.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_len_and_contains() {
        let r = Range {
            start: 0,
            stop: 10,
            step: 3,
        };
        assert_eq!(r.len(), 4);
        assert_eq!(r.nth(3), 9);
        assert!(r.contains(&BigInt::from(6)));
        assert!(!r.contains(&BigInt::from(7)));

        let down = Range {
            start: 5,
            stop: 0,
            step: -2,
        };
        assert_eq!(down.len(), 3);
        assert!(down.contains(&BigInt::from(1)));
        assert!(!down.contains(&BigInt::from(0)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.truthy());
        assert!(!Value::from(0i64).truthy());
        assert!(Value::from(0.5).truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::list(vec![Value::None]).truthy());
        assert!(!Value::Decimal(Decimal::zero()).truthy());
    }

    #[test]
    fn test_subtypes() {
        assert!(PyType::Bool.is_subtype_of(PyType::Int));
        assert!(PyType::DateTime.is_subtype_of(PyType::Date));
        assert!(!PyType::Int.is_subtype_of(PyType::Bool));
        assert_eq!(PyType::Decimal.to_string(), "<class 'decimal.Decimal'>");
    }

    #[test]
    fn test_index_conversion() {
        assert_eq!(Value::Bool(true).to_i64().unwrap(), 1);
        assert_eq!(
            Value::Decimal(Decimal::parse("3.0").unwrap()).to_i64().unwrap(),
            3
        );
        assert!(Value::from(1.5).to_index().is_err());
        assert_eq!(Value::from(-4i64).to_count().unwrap(), 0);
    }

    #[test]
    fn test_collection_cap() {
        assert!(check_len(10).is_ok());
        assert!(matches!(
            check_len(MAX_COLLECTION_LEN + 1),
            Err(EvalError::Memory { .. })
        ));
    }
}
