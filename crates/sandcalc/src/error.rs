//! Error types for sandcalc evaluation

use thiserror::Error;

use crate::frontend::ParseError;

/// Main error type for parsing and evaluation.
///
/// Every variant maps to the native exception category a user would expect
/// (see [`EvalError::category`]). The host converts all of them into a chat
/// reply; none of them is allowed to take the process down.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Malformed source text
    #[error("{0}")]
    Syntax(#[from] ParseError),

    /// A forbidden construct or a denied attribute access.
    ///
    /// Always a deliberate policy rejection, never a bug in the input.
    #[error("{message}")]
    Security {
        /// What was rejected
        message: String,
    },

    /// Name absent from both the symbol table and the global table
    #[error("name '{name}' is not defined")]
    UndefinedName {
        /// The unresolved identifier
        name: String,
    },

    /// Destructuring target shorter than the value
    #[error("too many values to unpack (expected {expected})")]
    TooManyValues {
        /// Number of targets
        expected: usize,
    },

    /// Destructuring target longer than the value
    #[error("not enough values to unpack (expected {expected}, got {got})")]
    NotEnoughValues {
        /// Number of targets
        expected: usize,
        /// Number of values produced
        got: usize,
    },

    /// Division or modulo by zero (native or decimal)
    #[error("{message}")]
    ZeroDivision {
        /// Native-style message
        message: String,
    },

    /// Operation applied to a value of the wrong type
    #[error("{message}")]
    Type {
        /// Native-style message
        message: String,
    },

    /// Right type, inappropriate value
    #[error("{message}")]
    Value {
        /// Native-style message
        message: String,
    },

    /// Sequence index out of range
    #[error("{message}")]
    Index {
        /// Native-style message
        message: String,
    },

    /// Mapping key not found; the message is the key's repr
    #[error("{key}")]
    Key {
        /// repr() of the missing key
        key: String,
    },

    /// Allowlisted attribute that the value does not actually have
    #[error("{message}")]
    Attribute {
        /// Native-style message
        message: String,
    },

    /// Numeric result out of range
    #[error("{message}")]
    Overflow {
        /// Native-style message
        message: String,
    },

    /// A collection would grow past the evaluator's size cap
    #[error("{message}")]
    Memory {
        /// What grew too large
        message: String,
    },

    /// Expression nesting exceeded the depth limit
    #[error("maximum nesting depth exceeded ({depth})")]
    Recursion {
        /// The configured limit
        depth: usize,
    },

    /// Decimal context signal (invalid operation, conversion syntax, ...)
    #[error("{message}")]
    InvalidOperation {
        /// What the decimal context rejected
        message: String,
    },

    /// Node kind the interpreter has no rule for.
    ///
    /// Signals an incomplete dispatch table, not malicious input.
    #[error("{kind} is not supported")]
    NotImplemented {
        /// Human-readable node kind
        kind: String,
    },

    /// Evaluation was cancelled through the interrupt flag
    #[error("evaluation interrupted")]
    Interrupted,
}

impl EvalError {
    /// Native exception class name for user-facing messages.
    pub fn category(&self) -> &'static str {
        match self {
            EvalError::Syntax(_) => "SyntaxError",
            EvalError::Security { .. } => "SyntaxSecurityError",
            EvalError::UndefinedName { .. } => "NameError",
            EvalError::TooManyValues { .. } | EvalError::NotEnoughValues { .. } => "ValueError",
            EvalError::ZeroDivision { .. } => "ZeroDivisionError",
            EvalError::Type { .. } => "TypeError",
            EvalError::Value { .. } => "ValueError",
            EvalError::Index { .. } => "IndexError",
            EvalError::Key { .. } => "KeyError",
            EvalError::Attribute { .. } => "AttributeError",
            EvalError::Overflow { .. } => "OverflowError",
            EvalError::Memory { .. } => "MemoryError",
            EvalError::Recursion { .. } => "RecursionError",
            EvalError::InvalidOperation { .. } => "InvalidOperation",
            EvalError::NotImplemented { .. } => "NotImplementedError",
            EvalError::Interrupted => "TimeoutError",
        }
    }

    /// Whether this is a sandbox policy rejection.
    pub fn is_security(&self) -> bool {
        matches!(self, EvalError::Security { .. })
    }

    /// Whether this is a division-by-zero condition.
    pub fn is_zero_division(&self) -> bool {
        matches!(self, EvalError::ZeroDivision { .. })
    }

    /// Create a security rejection.
    pub fn security(message: impl Into<String>) -> Self {
        EvalError::Security {
            message: message.into(),
        }
    }

    /// Create a TypeError.
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type {
            message: message.into(),
        }
    }

    /// Create a ValueError.
    pub fn value_error(message: impl Into<String>) -> Self {
        EvalError::Value {
            message: message.into(),
        }
    }

    /// Create an IndexError.
    pub fn index_error(message: impl Into<String>) -> Self {
        EvalError::Index {
            message: message.into(),
        }
    }

    /// Create an AttributeError.
    pub fn attribute_error(message: impl Into<String>) -> Self {
        EvalError::Attribute {
            message: message.into(),
        }
    }

    /// Create an OverflowError.
    pub fn overflow(message: impl Into<String>) -> Self {
        EvalError::Overflow {
            message: message.into(),
        }
    }

    /// Create a MemoryError.
    pub fn memory(message: impl Into<String>) -> Self {
        EvalError::Memory {
            message: message.into(),
        }
    }

    /// Create a ZeroDivisionError.
    pub fn zero_division(message: impl Into<String>) -> Self {
        EvalError::ZeroDivision {
            message: message.into(),
        }
    }

    /// Create a decimal InvalidOperation.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        EvalError::InvalidOperation {
            message: message.into(),
        }
    }
}

/// Result type alias for sandcalc operations
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(EvalError::security("x").category(), "SyntaxSecurityError");
        assert_eq!(
            EvalError::UndefinedName { name: "x".into() }.category(),
            "NameError"
        );
        assert_eq!(EvalError::TooManyValues { expected: 2 }.category(), "ValueError");
        assert_eq!(EvalError::zero_division("x").category(), "ZeroDivisionError");
    }

    #[test]
    fn test_unpack_messages() {
        assert_eq!(
            EvalError::TooManyValues { expected: 2 }.to_string(),
            "too many values to unpack (expected 2)"
        );
        assert_eq!(
            EvalError::NotEnoughValues {
                expected: 3,
                got: 2
            }
            .to_string(),
            "not enough values to unpack (expected 3, got 2)"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(EvalError::security("no").is_security());
        assert!(!EvalError::type_error("no").is_security());
        assert!(EvalError::zero_division("division by zero").is_zero_division());
    }
}
