//! `for` and `while` loops
//!
//! A `break` leaves the loop and skips its `else` block; `continue` only
//! ends the current iteration. Jump state lives in the returned [`Flow`]
//! and never outlives one iteration. The interrupt flag is polled at the
//! top of every iteration so a runaway loop stops at the host's deadline.

use rustpython_parser::ast;

use super::assign::assign_target;
use super::control::Flow;
use super::stmt::exec_block;
use super::Evaluate;
use crate::error::Result;
use crate::value::iterate;
use crate::{Environment, EvalContext};

/// Execute a `for` loop.
pub fn exec_for(stmt: &ast::StmtFor, env: &mut Environment, ctx: &EvalContext) -> Result<Flow> {
    let source = stmt.iter.eval(env, ctx)?;
    let mut iter = iterate(&source)?;
    while let Some(item) = iter.next(ctx)? {
        ctx.check_interrupt()?;
        assign_target(&stmt.target, item, env, ctx)?;
        if let Flow::Break = exec_block(&stmt.body, env, ctx)? {
            return Ok(Flow::Normal);
        }
    }
    exec_block(&stmt.orelse, env, ctx)
}

/// Execute a `while` loop.
pub fn exec_while(stmt: &ast::StmtWhile, env: &mut Environment, ctx: &EvalContext) -> Result<Flow> {
    loop {
        ctx.check_interrupt()?;
        if !stmt.test.eval(env, ctx)?.truthy() {
            break;
        }
        if let Flow::Break = exec_block(&stmt.body, env, ctx)? {
            return Ok(Flow::Normal);
        }
    }
    exec_block(&stmt.orelse, env, ctx)
}
