//! Per-evaluation symbol table

use indexmap::IndexMap;

use crate::capability;
use crate::error::{EvalError, Result};
use crate::value::Value;

/// The mutable, flat symbol table of one evaluation.
///
/// There are no nested scopes: defining callables is forbidden, so every
/// binding lives at the top level. Insertion order is kept for the final
/// locals report; rebinding a name keeps its original position.
///
/// # Example
///
/// ```
/// use sandcalc::{Environment, Value};
///
/// let mut env = Environment::new();
/// env.define("x", Value::from(1i64));
/// assert!(env.lookup("x").is_ok());
///
/// // Globals are visible but never stored locally
/// assert!(env.lookup("len").is_ok());
/// assert!(env.get("len").is_none());
///
/// env.remove("x").unwrap();
/// assert!(env.lookup("x").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
}

impl Environment {
    /// Create an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Get a local binding only.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Resolve a name: local bindings shadow the global capability table.
    pub fn lookup(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        capability::global(name).ok_or_else(|| EvalError::UndefinedName {
            name: name.to_string(),
        })
    }

    /// Whether a local binding exists.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════

    /// Bind or rebind a name.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Remove a local binding.
    ///
    /// Globals can never be deleted, so a name bound only globally fails
    /// like an undefined one.
    pub fn remove(&mut self, name: &str) -> Result<Value> {
        self.bindings
            .shift_remove(name)
            .ok_or_else(|| EvalError::UndefinedName {
                name: name.to_string(),
            })
    }

    /// Remove a binding if present.
    pub fn discard(&mut self, name: &str) {
        self.bindings.shift_remove(name);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════════

    /// Number of local bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no local binding exists.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Consume the table into its ordered bindings.
    pub fn into_bindings(self) -> IndexMap<String, Value> {
        self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_shadows_global() {
        let mut env = Environment::new();
        assert!(matches!(env.lookup("len").unwrap(), Value::Builtin(_)));
        env.define("len", Value::from(3i64));
        assert_eq!(env.lookup("len").unwrap().repr(), "3");
        env.remove("len").unwrap();
        assert!(matches!(env.lookup("len").unwrap(), Value::Builtin(_)));
    }

    #[test]
    fn test_undefined_name() {
        let env = Environment::new();
        let err = env.lookup("open").unwrap_err();
        assert_eq!(err.to_string(), "name 'open' is not defined");
    }

    #[test]
    fn test_remove_global_fails() {
        let mut env = Environment::new();
        assert!(matches!(
            env.remove("abs"),
            Err(EvalError::UndefinedName { .. })
        ));
    }

    #[test]
    fn test_order_preserved_on_rebind() {
        let mut env = Environment::new();
        env.define("a", Value::from(1i64));
        env.define("b", Value::from(2i64));
        env.define("a", Value::from(3i64));
        let names: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(env.len(), 2);
    }
}
