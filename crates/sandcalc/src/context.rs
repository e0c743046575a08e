//! Evaluation context configuration

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{EvalError, Result};

/// Default nesting limit for expression evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Configuration and state for one evaluation.
///
/// This is passed through all evaluation calls and controls
/// literal interpretation, nesting limits and interruption.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Interpret numeric literals as precision decimals
    pub precision: bool,

    /// Maximum expression nesting depth
    pub max_depth: usize,

    /// Interrupt flag - set to true to abort evaluation
    pub interrupt: Arc<AtomicBool>,

    depth: Cell<usize>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            precision: false,
            max_depth: DEFAULT_MAX_DEPTH,
            interrupt: Arc::new(AtomicBool::new(false)),
            depth: Cell::new(0),
        }
    }
}

impl EvalContext {
    /// Create a context with default settings (native numeric mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with the given precision mode.
    pub fn with_precision(precision: bool) -> Self {
        Self {
            precision,
            ..Default::default()
        }
    }

    /// Share an externally owned interrupt flag.
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Check if evaluation has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Fail with `Interrupted` if the flag is set.
    pub fn check_interrupt(&self) -> Result<()> {
        if self.is_interrupted() {
            Err(EvalError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Request interruption of evaluation.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Reset the interrupt flag.
    pub fn reset_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }

    /// Enter one nesting level; the guard leaves it on drop.
    pub fn enter(&self) -> Result<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(EvalError::Recursion {
                depth: self.max_depth,
            });
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard { ctx: self })
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }
}

/// RAII guard returned by [`EvalContext::enter`].
pub struct DepthGuard<'a> {
    ctx: &'a EvalContext,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.ctx.depth.set(self.ctx.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_roundtrip() {
        let ctx = EvalContext::new();
        assert!(ctx.check_interrupt().is_ok());
        ctx.interrupt();
        assert!(matches!(ctx.check_interrupt(), Err(EvalError::Interrupted)));
        ctx.reset_interrupt();
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_shared_interrupt() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = EvalContext::with_precision(true).with_interrupt(flag.clone());
        flag.store(true, Ordering::Relaxed);
        assert!(ctx.is_interrupted());
        assert!(ctx.precision);
    }

    #[test]
    fn test_depth_guard() {
        let ctx = EvalContext {
            max_depth: 2,
            ..Default::default()
        };
        let a = ctx.enter().unwrap();
        let b = ctx.enter().unwrap();
        assert!(matches!(ctx.enter(), Err(EvalError::Recursion { depth: 2 })));
        drop(b);
        assert_eq!(ctx.depth(), 1);
        drop(a);
        assert_eq!(ctx.depth(), 0);
    }
}
