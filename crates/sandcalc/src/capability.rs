//! Capability tables: the global namespace and the attribute allowlists
//!
//! Everything an expression can reach starts here. Names resolve through
//! [`global`]; every `value.attr` goes through [`resolve_attribute`], which
//! consults three allowlists in order:
//!
//! 1. module attributes, keyed by [`ModuleId`]
//! 2. class-level attributes, keyed by the type object
//! 3. instance attributes, keyed by the runtime type of the value
//!
//! Nothing falls through to an unrestricted lookup. All tables are static
//! and never mutated.

use std::fmt;

use crate::builtins::{self, functions as f};
use crate::error::{EvalError, Result};
use crate::value::{Builtin, PyType, Value};

/// Allowlisted library namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ModuleId {
    Datetime,
    Functools,
    Html,
    Itertools,
    Json,
    Math,
    Operator,
    Random,
    Statistics,
}

impl ModuleId {
    /// Module name as shown by `repr`.
    pub fn name(self) -> &'static str {
        match self {
            ModuleId::Datetime => "datetime",
            ModuleId::Functools => "functools",
            ModuleId::Html => "html",
            ModuleId::Itertools => "itertools",
            ModuleId::Json => "json",
            ModuleId::Math => "math",
            ModuleId::Operator => "operator",
            ModuleId::Random => "random",
            ModuleId::Statistics => "statistics",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Global capability table
// ═══════════════════════════════════════════════════════════════════════

/// A global binding.
#[derive(Clone, Copy)]
enum Global {
    Type(PyType),
    Function(Builtin),
    Module(ModuleId),
}

impl Global {
    fn to_value(self) -> Value {
        match self {
            Global::Type(t) => Value::Type(t),
            Global::Function(b) => Value::Builtin(b),
            Global::Module(m) => Value::Module(m),
        }
    }
}

const fn func(name: &'static str, ptr: crate::value::BuiltinFnPtr) -> Global {
    Global::Function(Builtin::new(name, ptr))
}

static GLOBALS: &[(&str, Global)] = &[
    // builtin types
    ("bool", Global::Type(PyType::Bool)),
    ("bytes", Global::Type(PyType::Bytes)),
    ("complex", Global::Type(PyType::Complex)),
    ("dict", Global::Type(PyType::Dict)),
    ("float", Global::Type(PyType::Float)),
    ("frozenset", Global::Type(PyType::FrozenSet)),
    ("int", Global::Type(PyType::Int)),
    ("list", Global::Type(PyType::List)),
    ("set", Global::Type(PyType::Set)),
    ("str", Global::Type(PyType::Str)),
    ("tuple", Global::Type(PyType::Tuple)),
    // builtin functions
    ("abs", func("abs", f::builtin_abs)),
    ("all", func("all", f::builtin_all)),
    ("any", func("any", f::builtin_any)),
    ("ascii", func("ascii", f::builtin_ascii)),
    ("bin", func("bin", f::builtin_bin)),
    ("chr", func("chr", f::builtin_chr)),
    ("divmod", func("divmod", f::builtin_divmod)),
    ("enumerate", func("enumerate", f::builtin_enumerate)),
    ("filter", func("filter", f::builtin_filter)),
    ("hex", func("hex", f::builtin_hex)),
    ("isinstance", func("isinstance", f::builtin_isinstance)),
    ("issubclass", func("issubclass", f::builtin_issubclass)),
    ("len", func("len", f::builtin_len)),
    ("map", func("map", f::builtin_map)),
    ("max", func("max", f::builtin_max)),
    ("min", func("min", f::builtin_min)),
    ("oct", func("oct", f::builtin_oct)),
    ("ord", func("ord", f::builtin_ord)),
    ("pow", func("pow", f::builtin_pow)),
    ("range", Global::Type(PyType::Range)),
    ("repr", func("repr", f::builtin_repr)),
    ("reversed", func("reversed", f::builtin_reversed)),
    ("round", func("round", f::builtin_round)),
    ("sorted", func("sorted", f::builtin_sorted)),
    ("zip", func("zip", f::builtin_zip)),
    // precision decimal
    ("Decimal", Global::Type(PyType::Decimal)),
    // library namespaces
    ("datetime", Global::Module(ModuleId::Datetime)),
    ("functools", Global::Module(ModuleId::Functools)),
    ("html", Global::Module(ModuleId::Html)),
    ("itertools", Global::Module(ModuleId::Itertools)),
    ("json", Global::Module(ModuleId::Json)),
    ("math", Global::Module(ModuleId::Math)),
    ("operator", Global::Module(ModuleId::Operator)),
    ("random", Global::Module(ModuleId::Random)),
    ("statistics", Global::Module(ModuleId::Statistics)),
];

/// Look up a name in the global capability table.
pub fn global(name: &str) -> Option<Value> {
    GLOBALS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, g)| g.to_value())
}

/// Every global name, in table order.
pub fn global_names() -> impl Iterator<Item = &'static str> {
    GLOBALS.iter().map(|(name, _)| *name)
}

// ═══════════════════════════════════════════════════════════════════════
// Module allowlist
// ═══════════════════════════════════════════════════════════════════════

static MODULE_ATTRS: &[(ModuleId, &[&str])] = &[
    (
        ModuleId::Datetime,
        &["date", "datetime", "time", "timedelta", "tzinfo"],
    ),
    (ModuleId::Functools, &["reduce"]),
    (ModuleId::Html, &["escape", "unescape"]),
    (
        ModuleId::Itertools,
        &[
            "accumulate",
            "chain",
            "compress",
            "dropwhile",
            "filterfalse",
            "groupby",
            "starmap",
            "takewhile",
            "tee",
            "zip_longest",
            "product",
            "permutations",
            "combinations",
            "combinations_with_replacement",
        ],
    ),
    (
        ModuleId::Math,
        &[
            "acos", "acosh", "asin", "asinh", "atan", "atan2", "atanh", "ceil", "copysign", "cos",
            "cosh", "degrees", "erf", "erfc", "exp", "expm1", "fabs", "factorial", "floor", "fmod",
            "frexp", "fsum", "gamma", "gcd", "hypot", "isclose", "isfinite", "isinf", "isnan",
            "ldexp", "lgamma", "log", "log1p", "log10", "log2", "modf", "pow", "radians", "sin",
            "sinh", "sqrt", "tan", "tanh", "trunc", "pi", "e", "tau", "inf", "nan",
        ],
    ),
    (
        ModuleId::Operator,
        &[
            "lt",
            "le",
            "eq",
            "ne",
            "ge",
            "gt",
            "not_",
            "truth",
            "is_",
            "is_not",
            "add",
            "and_",
            "floordiv",
            "index",
            "inv",
            "invert",
            "lshift",
            "mod",
            "mul",
            "matmul",
            "neg",
            "or_",
            "pos",
            "pow",
            "rshift",
            "sub",
            "truediv",
            "xor",
            "concat",
            "contains",
            "countOf",
            "delitem",
            "getitem",
            "indexOf",
            "setitem",
            "length_hint",
            "itemgetter",
        ],
    ),
    (
        ModuleId::Random,
        &[
            "randrange",
            "randint",
            "choice",
            "choices",
            "shuffle",
            "sample",
            "random",
            "uniform",
            "triangular",
            "betavariate",
            "expovariate",
            "gammavariate",
            "gauss",
            "lognormvariate",
            "normalvariate",
            "vonmisesvariate",
            "paretovariate",
            "weibullvariate",
        ],
    ),
    (
        ModuleId::Statistics,
        &[
            "mean",
            "harmonic_mean",
            "median",
            "median_low",
            "median_high",
            "median_grouped",
            "mode",
            "pstdev",
            "pvariance",
            "stdev",
            "variance",
        ],
    ),
    (ModuleId::Json, &["dumps", "loads"]),
];

// ═══════════════════════════════════════════════════════════════════════
// Class allowlist
// ═══════════════════════════════════════════════════════════════════════

static CLASS_ATTRS: &[(PyType, &[&str])] = &[
    (PyType::Bytes, &["fromhex", "maketrans"]),
    (
        PyType::Date,
        &[
            "today",
            "fromtimestamp",
            "fromordinal",
            "fromisoformat",
            "min",
            "max",
            "resolution",
        ],
    ),
    (
        PyType::DateTime,
        &[
            "today",
            "now",
            "utcnow",
            "fromtimestamp",
            "utcfromtimestamp",
            "fromordinal",
            "combine",
            "fromisoformat",
            "strptime",
            "min",
            "max",
            "resolution",
        ],
    ),
    (PyType::Time, &["min", "max", "resolution", "fromisoformat"]),
    (PyType::TimeDelta, &["min", "max", "resolution"]),
    (PyType::TimeZone, &["utc"]),
    (PyType::Dict, &["fromkeys"]),
    (PyType::Float, &["fromhex"]),
    (PyType::Int, &["from_bytes"]),
    (PyType::Str, &["maketrans"]),
];

// ═══════════════════════════════════════════════════════════════════════
// Instance allowlist
// ═══════════════════════════════════════════════════════════════════════

const LIST_METHODS: &[&str] = &[
    "index", "count", "append", "clear", "copy", "extend", "insert", "pop", "remove", "reverse",
];

static INSTANCE_ATTRS: &[(PyType, &[&str])] = &[
    (
        PyType::Bytes,
        &[
            "hex",
            "count",
            "decode",
            "endswith",
            "find",
            "index",
            "join",
            "partition",
            "replace",
            "rfind",
            "rindex",
            "rpartition",
            "startswith",
            "translate",
            "center",
            "ljust",
            "lstrip",
            "rjust",
            "rsplit",
            "rstrip",
            "split",
            "strip",
            "capitalize",
            "expandtabs",
            "isalnum",
            "isalpha",
            "isdigit",
            "islower",
            "isspace",
            "istitle",
            "isupper",
            "lower",
            "splitlines",
            "swapcase",
            "title",
            "upper",
            "zfill",
        ],
    ),
    (
        PyType::Date,
        &[
            "year",
            "month",
            "day",
            "replace",
            "timetuple",
            "toordinal",
            "weekday",
            "isoweekday",
            "isocalendar",
            "isoformat",
            "ctime",
            "strftime",
        ],
    ),
    (
        PyType::DateTime,
        &[
            "year",
            "month",
            "day",
            "hour",
            "minute",
            "second",
            "microsecond",
            "tzinfo",
            "fold",
            "date",
            "time",
            "timetz",
            "replace",
            "astimezone",
            "dst",
            "tzname",
            "timetuple",
            "utctimetuple",
            "toordinal",
            "timestamp",
            "weekday",
            "isoweekday",
            "isocalendar",
            "isoformat",
            "ctime",
            "strftime",
        ],
    ),
    (
        PyType::Time,
        &[
            "hour",
            "minute",
            "second",
            "microsecond",
            "tzinfo",
            "fold",
            "replace",
            "isoformat",
            "strftime",
            "utcoffset",
            "dst",
            "tzname",
        ],
    ),
    (PyType::TimeDelta, &["total_seconds"]),
    (PyType::TimeZone, &["utcoffset", "tzname", "dst", "fromutc"]),
    (PyType::TzInfo, &["utcoffset", "dst", "tzname", "fromutc"]),
    (
        PyType::Dict,
        &[
            "copy",
            "get",
            "items",
            "keys",
            "pop",
            "popitem",
            "setdefault",
            "update",
            "values",
        ],
    ),
    (PyType::Float, &["as_integer_ratio", "is_integer", "hex"]),
    (PyType::Int, &["bit_length", "to_bytes"]),
    (
        PyType::List,
        &[
            "index", "count", "append", "clear", "copy", "extend", "insert", "pop", "remove",
            "reverse", "sort",
        ],
    ),
    (PyType::Range, &["start", "stop", "step"]),
    (
        PyType::Str,
        &[
            "capitalize",
            "casefold",
            "center",
            "count",
            "encode",
            "endswith",
            "expandtabs",
            "find",
            "format",
            "format_map",
            "index",
            "isalnum",
            "isalpha",
            "isdecimal",
            "isdigit",
            "isidentifier",
            "islower",
            "isnumeric",
            "isprintable",
            "isspace",
            "istitle",
            "isupper",
            "join",
            "ljust",
            "lower",
            "lstrip",
            "partition",
            "replace",
            "rfind",
            "rindex",
            "rjust",
            "rpartition",
            "rsplit",
            "rstrip",
            "split",
            "splitlines",
            "swapcase",
            "startswith",
            "strip",
            "title",
            "translate",
            "upper",
            "zfill",
        ],
    ),
    (
        PyType::Set,
        &[
            "isdisjoint",
            "issubset",
            "issuperset",
            "union",
            "intersection",
            "difference",
            "symmetric_difference",
            "copy",
            "update",
            "intersection_update",
            "difference_update",
            "symmetric_difference_update",
            "add",
            "remove",
            "discard",
            "pop",
            "clear",
        ],
    ),
    (PyType::Tuple, LIST_METHODS),
];

fn lookup<K: PartialEq + Copy>(table: &'static [(K, &'static [&'static str])], key: K) -> Option<&'static [&'static str]> {
    table.iter().find(|(k, _)| *k == key).map(|(_, names)| *names)
}

/// Attribute names readable on a module.
pub fn module_allowlist(module: ModuleId) -> &'static [&'static str] {
    lookup(MODULE_ATTRS, module).unwrap_or(&[])
}

/// Class-level attribute names readable on a type object, if the type
/// is in the class map at all.
pub fn class_allowlist(t: PyType) -> Option<&'static [&'static str]> {
    lookup(CLASS_ATTRS, t)
}

/// Instance attribute names readable on values of a type, if the type is
/// in the instance map at all.
pub fn instance_allowlist(t: PyType) -> Option<&'static [&'static str]> {
    lookup(INSTANCE_ATTRS, t)
}

// ═══════════════════════════════════════════════════════════════════════
// Enforcement
// ═══════════════════════════════════════════════════════════════════════

fn denied(attr: &str) -> EvalError {
    EvalError::security(format!("You can not access `{}` attribute", attr))
}

fn class_label(value: &Value) -> String {
    match value {
        Value::Iterator(_) => format!("<class '{}'>", value.type_name()),
        other => other.py_type().to_string(),
    }
}

/// Resolve `value.attr` under the allowlists.
///
/// An allowlisted name without an implementation fails with the same
/// AttributeError a native lookup would give.
pub fn resolve_attribute(value: &Value, attr: &str) -> Result<Value> {
    if let Value::Module(module) = value {
        return match find(module_allowlist(*module), attr) {
            Some(name) => builtins::module_attr(*module, name),
            None => Err(denied(attr)),
        };
    }

    if let Value::Type(t) = value {
        if let Some(allowed) = class_allowlist(*t) {
            return match find(allowed, attr) {
                Some(name) => builtins::class_attr(*t, name),
                None => Err(denied(attr)),
            };
        }
    }

    match instance_allowlist(value.py_type()) {
        Some(allowed) => match find(allowed, attr) {
            Some(name) => builtins::instance_attr(value, name),
            None => Err(denied(attr)),
        },
        None => Err(EvalError::security(format!(
            "You can not access attributes of {}",
            class_label(value)
        ))),
    }
}

fn find(allowed: &'static [&'static str], attr: &str) -> Option<&'static str> {
    allowed.iter().copied().find(|name| *name == attr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message(result: Result<Value>) -> String {
        match result {
            Err(e) => {
                assert!(e.is_security(), "expected security error, got {:?}", e);
                e.to_string()
            }
            Ok(v) => panic!("expected denial, got {}", v.repr()),
        }
    }

    #[test]
    fn test_globals_resolve() {
        assert!(matches!(global("math"), Some(Value::Module(ModuleId::Math))));
        assert!(matches!(global("int"), Some(Value::Type(PyType::Int))));
        assert!(matches!(global("sorted"), Some(Value::Builtin(_))));
        assert!(global("open").is_none());
        assert!(global("__import__").is_none());
        assert!(global("eval").is_none());
    }

    #[test]
    fn test_module_denial() {
        let math = Value::Module(ModuleId::Math);
        assert_eq!(
            message(resolve_attribute(&math, "__loader__")),
            "You can not access `__loader__` attribute"
        );
        assert!(resolve_attribute(&math, "pi").is_ok());
    }

    #[test]
    fn test_class_denial() {
        let s = Value::Type(PyType::Str);
        assert_eq!(
            message(resolve_attribute(&s, "__subclasses__")),
            "You can not access `__subclasses__` attribute"
        );
        // A type absent from the class map is treated as an instance of `type`
        let d = Value::Type(PyType::Decimal);
        assert_eq!(
            message(resolve_attribute(&d, "from_float")),
            "You can not access attributes of <class 'type'>"
        );
    }

    #[test]
    fn test_instance_denial() {
        let t = Value::tuple(vec![]);
        assert_eq!(
            message(resolve_attribute(&t, "__class__")),
            "You can not access `__class__` attribute"
        );
        assert_eq!(
            message(resolve_attribute(&Value::Bool(true), "real")),
            "You can not access attributes of <class 'bool'>"
        );
        let len = global("len").unwrap_or(Value::None);
        assert_eq!(
            message(resolve_attribute(&len, "__self__")),
            "You can not access attributes of <class 'builtin_function_or_method'>"
        );
    }

    #[test]
    fn test_listed_but_missing_is_attribute_error() {
        let t = Value::tuple(vec![]);
        let err = resolve_attribute(&t, "append").unwrap_err();
        assert_eq!(err.category(), "AttributeError");
        assert_eq!(err.to_string(), "'tuple' object has no attribute 'append'");
    }
}
