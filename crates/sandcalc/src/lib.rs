//! # Sandcalc
//!
//! A sandboxed tree-walking evaluator for a safe subset of Python.
//!
//! Sandcalc backs a chat calculator: untrusted users type expressions and
//! small statement blocks, and get the result back as a reply. Source text is
//! parsed with `rustpython-parser` and interpreted directly; nothing is ever
//! handed to a host language runtime.
//!
//! ## Architecture
//!
//! - **Frontend**: parse source text into a syntax tree
//! - **Policy check**: reject forbidden constructs before anything runs
//! - **Interpreter**: evaluate statements against a fresh symbol table
//! - **Capability tables**: the only names and attributes an expression can
//!   reach
//! - **Command**: trigger parsing, worker dispatch with a deadline, reply
//!   templates
//!
//! ## Example
//!
//! ```
//! use sandcalc::evaluate_source;
//!
//! let eval = evaluate_source("x = 0.1\nx + 0.2", true).unwrap();
//! assert_eq!(eval.result.unwrap().to_string(), "0.3");
//!
//! let err = evaluate_source("().__class__", false).unwrap_err();
//! assert!(err.is_security());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins;
pub mod capability;
pub mod command;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod eval;
pub mod format;
pub mod frontend;
pub mod interpreter;
pub mod ops;
pub mod value;

// Re-export main types
pub use command::{Calculator, Invocation, Message, Mode, Reply};
pub use config::{CalcConfig, ConfigError};
pub use context::EvalContext;
pub use environment::Environment;
pub use error::{EvalError, Result};
pub use eval::{eval_expr, exec_block, exec_stmt, Evaluate, Flow};
pub use frontend::{parse_program, ParseError, Program, SourceLocation};
pub use interpreter::{evaluate, evaluate_source, Evaluation};
pub use value::{Decimal, HashKey, Value};

/// Sandcalc version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
