//! Native library: functions, constructors, methods and module members
//!
//! Every callable reachable from an expression ends up in [`call_value`].
//! Attribute reads arrive here only after the capability tables have
//! approved the name (see [`crate::capability`]).

mod collections;
mod datetime;
mod functools;
pub(crate) mod functions;
mod html;
mod itertools;
mod json;
mod math;
mod numbers;
mod operator;
mod random;
mod sort;
mod statistics;
mod strings;
mod text;
mod types;

pub(crate) use datetime::strftime;
pub(crate) use sort::sort_values;

use indexmap::IndexMap;

use crate::capability::ModuleId;
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::{get_item, Builtin, BuiltinFnPtr, PyType, Value};

// ═══════════════════════════════════════════════════════════════════════
// Call arguments
// ═══════════════════════════════════════════════════════════════════════

/// Evaluated call arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Positional arguments, in order
    pub positional: Vec<Value>,

    /// Keyword arguments, in source order
    pub keywords: IndexMap<String, Value>,
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

impl Args {
    /// Empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional-only argument list.
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keywords: IndexMap::new(),
        }
    }

    /// Total number of arguments.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    /// Whether no arguments were passed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return a keyword argument.
    pub fn take_keyword(&mut self, name: &str) -> Option<Value> {
        self.keywords.shift_remove(name)
    }

    /// Fail if any keyword argument is left over.
    pub fn no_keywords(&self, fname: &str) -> Result<()> {
        match self.keywords.keys().next() {
            Some(key) => Err(EvalError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                fname, key
            ))),
            None => Ok(()),
        }
    }

    /// Bind arguments to `required` then `optional` parameter names.
    ///
    /// Parameters may be passed positionally or by keyword.
    ///
    /// # Errors
    ///
    /// `TypeError` for surplus, duplicate, unknown or missing arguments.
    pub fn bind<const R: usize, const O: usize>(
        self,
        fname: &str,
        required: [&str; R],
        optional: [&str; O],
    ) -> Result<([Value; R], [Option<Value>; O])> {
        let total = R + O;
        let given = self.positional.len();
        if given > total {
            let qualifier = if O == 0 { "exactly" } else { "at most" };
            return Err(EvalError::type_error(format!(
                "{}() takes {} {} argument{} ({} given)",
                fname,
                qualifier,
                total,
                plural(total),
                given
            )));
        }

        let mut slots: Vec<Option<Value>> = self.positional.into_iter().map(Some).collect();
        slots.resize(total, None);
        for (key, value) in self.keywords {
            let position = required
                .iter()
                .chain(optional.iter())
                .position(|name| *name == key)
                .ok_or_else(|| {
                    EvalError::type_error(format!(
                        "{}() got an unexpected keyword argument '{}'",
                        fname, key
                    ))
                })?;
            if slots[position].is_some() {
                return Err(EvalError::type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    fname, key
                )));
            }
            slots[position] = Some(value);
        }

        let mut optional_slots = slots.split_off(R);
        let mut bound = Vec::with_capacity(R);
        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(value) => bound.push(value),
                None => {
                    return Err(EvalError::type_error(format!(
                        "{}() missing required argument '{}' (pos {})",
                        fname,
                        required[i],
                        i + 1
                    )))
                }
            }
        }
        let bound: [Value; R] = bound
            .try_into()
            .map_err(|_| EvalError::type_error(format!("{}() argument mismatch", fname)))?;
        let optional_slots: [Option<Value>; O] = std::array::from_fn(|i| optional_slots[i].take());
        Ok((bound, optional_slots))
    }

    /// Bind exactly `N` required arguments.
    pub fn fixed<const N: usize>(self, fname: &str, names: [&str; N]) -> Result<[Value; N]> {
        self.bind(fname, names, []).map(|(bound, [])| bound)
    }
}

/// Treat an explicit `None` like an omitted optional argument.
pub(crate) fn given(slot: Option<Value>) -> Option<Value> {
    slot.filter(|v| !v.is_none())
}

// ═══════════════════════════════════════════════════════════════════════
// Calling
// ═══════════════════════════════════════════════════════════════════════

/// Call any callable value.
///
/// # Errors
///
/// `TypeError` if the value is not callable; otherwise whatever the
/// callee raises.
pub fn call_value(ctx: &EvalContext, func: &Value, args: Args) -> Result<Value> {
    ctx.check_interrupt()?;
    let _guard = ctx.enter()?;
    match func {
        Value::Builtin(builtin) => builtin.call(ctx, args),
        Value::Type(t) => types::construct(ctx, *t, args),
        Value::Method(method) => call_method(ctx, &method.receiver, method.name, args),
        Value::ItemGetter(items) => {
            let [obj] = args.fixed("itemgetter", ["obj"])?;
            match &items[..] {
                [single] => get_item(&obj, single),
                many => many
                    .iter()
                    .map(|item| get_item(&obj, item))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::tuple),
            }
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

fn call_method(ctx: &EvalContext, receiver: &Value, name: &'static str, args: Args) -> Result<Value> {
    match receiver {
        Value::Type(t) => types::class_method(ctx, *t, name, args),
        Value::Str(s) => strings::str_method(ctx, s, name, args),
        Value::Bytes(b) => strings::bytes_method(ctx, b, name, args),
        Value::List(list) => collections::list_method(ctx, list, name, args),
        Value::Tuple(items) => collections::tuple_method(ctx, items, name, args),
        Value::Dict(map) => collections::dict_method(ctx, map, name, args),
        Value::Set(set) => collections::set_method(ctx, set, name, args),
        Value::Int(n) => numbers::int_method(n, name, args),
        Value::Float(f) => numbers::float_method(*f, name, args),
        Value::Date(_)
        | Value::DateTime(_)
        | Value::Time(_)
        | Value::TimeDelta(_)
        | Value::TimeZone(_) => datetime::method(ctx, receiver, name, args),
        _ => Err(no_attribute(receiver, name)),
    }
}

/// `'X' object has no attribute 'y'`.
pub(crate) fn no_attribute(value: &Value, name: &str) -> EvalError {
    EvalError::attribute_error(format!(
        "'{}' object has no attribute '{}'",
        value.type_name(),
        name
    ))
}

pub(crate) fn builtin(name: &'static str, func: BuiltinFnPtr) -> Value {
    Value::Builtin(Builtin::new(name, func))
}

// ═══════════════════════════════════════════════════════════════════════
// Attribute resolution (after the allowlists)
// ═══════════════════════════════════════════════════════════════════════

/// Member of an allowlisted module.
pub fn module_attr(module: ModuleId, name: &'static str) -> Result<Value> {
    let found = match module {
        ModuleId::Datetime => datetime::module_attr(name),
        ModuleId::Functools => functools::module_attr(name),
        ModuleId::Html => html::module_attr(name),
        ModuleId::Itertools => itertools::module_attr(name),
        ModuleId::Json => json::module_attr(name),
        ModuleId::Math => math::module_attr(name),
        ModuleId::Operator => operator::module_attr(name),
        ModuleId::Random => random::module_attr(name),
        ModuleId::Statistics => statistics::module_attr(name),
    };
    found.ok_or_else(|| {
        EvalError::attribute_error(format!(
            "module '{}' has no attribute '{}'",
            module.name(),
            name
        ))
    })
}

/// Class-level attribute of a type object.
pub fn class_attr(t: PyType, name: &'static str) -> Result<Value> {
    if let Some(constant) = datetime::class_constant(t, name) {
        return Ok(constant);
    }
    Ok(Value::method(Value::Type(t), name))
}

/// Instance attribute: a data field or a bound method.
pub fn instance_attr(value: &Value, name: &'static str) -> Result<Value> {
    if let Some(field) = data_attr(value, name) {
        return Ok(field);
    }
    let implemented = match value {
        Value::Tuple(_) => matches!(name, "index" | "count"),
        _ => true,
    };
    if implemented {
        Ok(Value::method(value.clone(), name))
    } else {
        Err(no_attribute(value, name))
    }
}

fn data_attr(value: &Value, name: &str) -> Option<Value> {
    match (value, name) {
        (Value::Range(r), "start") => Some(Value::from(r.start)),
        (Value::Range(r), "stop") => Some(Value::from(r.stop)),
        (Value::Range(r), "step") => Some(Value::from(r.step)),
        (Value::Date(_) | Value::DateTime(_) | Value::Time(_), _) => datetime::field(value, name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kw(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_bind_positional_and_keyword() {
        let args = Args {
            positional: vec![Value::from(1i64)],
            keywords: kw(&[("base", Value::from(16i64))]),
        };
        let ([x], [base]) = args.bind("int", ["x"], ["base"]).unwrap();
        assert_eq!(x.repr(), "1");
        assert_eq!(base.unwrap().repr(), "16");
    }

    #[test]
    fn test_bind_errors() {
        let err = Args::positional(vec![Value::None, Value::None])
            .fixed("len", ["obj"])
            .unwrap_err();
        assert_eq!(err.to_string(), "len() takes exactly 1 argument (2 given)");

        let err = Args::new().fixed("len", ["obj"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "len() missing required argument 'obj' (pos 1)"
        );

        let args = Args {
            positional: vec![],
            keywords: kw(&[("nope", Value::None)]),
        };
        let err = args.bind("round", ["number"], ["ndigits"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "round() got an unexpected keyword argument 'nope'"
        );
    }

    #[test]
    fn test_not_callable() {
        let ctx = EvalContext::new();
        let err = call_value(&ctx, &Value::from(3i64), Args::new()).unwrap_err();
        assert_eq!(err.to_string(), "'int' object is not callable");
    }

    #[test]
    fn test_itemgetter() {
        let ctx = EvalContext::new();
        let getter = Value::ItemGetter(std::rc::Rc::from(vec![Value::from(0i64), Value::from(2i64)]));
        let data = Value::list(vec![Value::from(5i64), Value::from(6i64), Value::from(7i64)]);
        let result = call_value(&ctx, &getter, Args::positional(vec![data])).unwrap();
        assert_eq!(result.repr(), "(5, 7)");
    }

    #[test]
    fn test_every_module_member_resolves() {
        for module in [
            ModuleId::Datetime,
            ModuleId::Functools,
            ModuleId::Html,
            ModuleId::Itertools,
            ModuleId::Json,
            ModuleId::Math,
            ModuleId::Operator,
            ModuleId::Random,
            ModuleId::Statistics,
        ] {
            for name in crate::capability::module_allowlist(module) {
                assert!(module_attr(module, name).is_ok(), "{}.{}", module, name);
            }
        }
    }
}
