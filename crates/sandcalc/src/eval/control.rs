//! Loop-control signalling for `break` and `continue`

use rustpython_parser::ast;

use crate::error::{EvalError, Result};
use crate::frontend::ParseError;

/// Outcome of executing a statement.
///
/// `break` and `continue` do not unwind through the error channel; they
/// come back as a value and travel up through block execution until the
/// innermost loop consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the next statement
    Normal,

    /// Leave the innermost loop, skipping its `else` clause
    Break,

    /// Skip to the next iteration of the innermost loop
    Continue,
}

impl Flow {
    /// Whether the enclosing block should stop executing.
    pub fn interrupts(self) -> bool {
        self != Flow::Normal
    }
}

/// `break` statement.
pub fn exec_break(_stmt: &ast::StmtBreak) -> Result<Flow> {
    Ok(Flow::Break)
}

/// `continue` statement.
pub fn exec_continue(_stmt: &ast::StmtContinue) -> Result<Flow> {
    Ok(Flow::Continue)
}

/// The SyntaxError native compilation gives a jump outside any loop.
pub(crate) fn outside_loop(kind: Flow) -> EvalError {
    let message = match kind {
        Flow::Continue => "'continue' not properly in loop",
        _ => "'break' outside loop",
    };
    EvalError::Syntax(ParseError::new(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupts() {
        assert!(!Flow::Normal.interrupts());
        assert!(Flow::Break.interrupts());
        assert!(Flow::Continue.interrupts());
    }

    #[test]
    fn test_outside_loop_messages() {
        assert_eq!(outside_loop(Flow::Break).to_string(), "'break' outside loop");
        assert_eq!(
            outside_loop(Flow::Continue).to_string(),
            "'continue' not properly in loop"
        );
        assert_eq!(outside_loop(Flow::Break).category(), "SyntaxError");
    }
}
