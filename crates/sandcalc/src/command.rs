//! The chat-facing calculator command
//!
//! ```text
//! message ─parse─▶ Invocation ─worker thread─▶ Outcome ─templates─▶ reply
//!                                    ▲
//!                  timeout ──────────┘ (sets the interrupt flag)
//! ```
//!
//! Evaluation runs on a dedicated OS thread with a large stack. Values are
//! `Rc`-based and never leave that thread: the worker renders everything
//! to text before sending it back over a oneshot channel. The async side
//! only waits, applies the deadline and fills in the reply templates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::CalcConfig;
use crate::error::EvalError;
use crate::frontend::{check_source, parse_program};
use crate::interpreter::evaluate;
use crate::{EvalContext, Value};

/// Stack size of the evaluation worker.
///
/// Deeply nested values are dropped recursively on this thread.
pub const WORKER_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Rendered text kept per value; newline and length checks look at this
/// prefix only.
const RENDER_CAP: usize = 1 << 20;

const TOO_MANY_NEWLINES: &str = "The result contains too many newlines!";

// ═══════════════════════════════════════════════════════════════════════
// Invocation
// ═══════════════════════════════════════════════════════════════════════

/// Numeric mode selected by the trigger word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `=` or `calc`: numeric literals are precision decimals
    Precision,
    /// `==`: numeric literals are native int/float
    Native,
}

impl Mode {
    /// Resolve a trigger word.
    pub fn from_trigger(word: &str) -> Option<Self> {
        match word {
            "=" | "calc" => Some(Mode::Precision),
            "==" => Some(Mode::Native),
            _ => None,
        }
    }

    /// Canonical trigger shown in usage help.
    pub fn trigger(self) -> &'static str {
        match self {
            Mode::Precision => "=",
            Mode::Native => "==",
        }
    }

    /// Whether literals evaluate as decimals.
    pub fn precision(self) -> bool {
        matches!(self, Mode::Precision)
    }
}

/// A recognised command: the mode and the expression text after the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Numeric mode
    pub mode: Mode,
    /// Source text, possibly empty
    pub expr: &'a str,
}

/// An incoming chat message.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Channel the message was posted in
    pub channel: String,
    /// Full message text, prefix included
    pub text: String,
    /// Timestamp identifying the message
    pub ts: Option<String>,
    /// Whether this is an edit of an earlier message
    pub edited: bool,
}

/// An outgoing chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Destination channel
    pub channel: String,
    /// Reply text
    pub text: String,
    /// Thread to reply into, if any
    pub thread: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Worker outcome
// ═══════════════════════════════════════════════════════════════════════

/// A value rendered to text on the worker thread.
#[derive(Debug, Clone)]
struct RenderedText {
    text: String,
    truncated: bool,
}

impl RenderedText {
    fn of(value: &Value) -> Self {
        let rendered = value.render(RENDER_CAP);
        Self {
            text: rendered.text,
            truncated: rendered.truncated,
        }
    }

    /// The first `limit` characters, plus whether anything was cut.
    fn clipped(&self, limit: usize) -> (String, bool) {
        let mut chars = self.text.chars();
        let shown: String = chars.by_ref().take(limit).collect();
        let more = self.truncated || chars.next().is_some();
        (shown, more)
    }
}

/// Everything the async side needs from one evaluation.
#[derive(Debug, Clone)]
enum Outcome {
    /// The last statement was an expression with a non-`None` value
    Value(RenderedText),
    /// No result; the final bindings in definition order
    Locals(Vec<(String, RenderedText)>),
}

fn run_on_worker(source: &str, precision: bool, interrupt: Arc<AtomicBool>) -> Result<Outcome, EvalError> {
    check_source(source)?;
    let program = parse_program(source)?;
    let ctx = EvalContext::with_precision(precision).with_interrupt(interrupt);
    let evaluation = evaluate(&program, &ctx)?;
    Ok(match evaluation.result {
        Some(value) if !value.is_none() => Outcome::Value(RenderedText::of(&value)),
        _ => Outcome::Locals(
            evaluation
                .locals
                .iter()
                .map(|(name, value)| (name.clone(), RenderedText::of(value)))
                .collect(),
        ),
    })
}

/// Why no outcome arrived.
enum Failure {
    Eval(EvalError),
    Timeout,
    Worker(String),
}

// ═══════════════════════════════════════════════════════════════════════
// Command
// ═══════════════════════════════════════════════════════════════════════

/// The calculator command bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    config: CalcConfig,
}

impl Calculator {
    /// Create a command handler.
    pub fn new(config: CalcConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &CalcConfig {
        &self.config
    }

    /// Recognise `{prefix}{trigger} <expr>` in a message.
    ///
    /// The trigger must be followed by whitespace or the end of the text.
    pub fn parse<'a>(&self, text: &'a str) -> Option<Invocation<'a>> {
        let rest = text.strip_prefix(self.config.prefix.as_str())?;
        let (word, expr) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        let mode = Mode::from_trigger(word)?;
        Some(Invocation {
            mode,
            expr: expr.trim(),
        })
    }

    /// Usage help for a mode.
    pub fn usage(&self, mode: Mode) -> String {
        format!("Usage: `{}{} <expression>`", self.config.prefix, mode.trigger())
    }

    /// Handle a chat message, returning the reply if it was a calculator
    /// command.
    ///
    /// Replies to an edited message go into that message's thread.
    pub async fn handle(&self, message: &Message) -> Option<Reply> {
        let invocation = self.parse(&message.text)?;
        if invocation.expr.is_empty() {
            return Some(Reply {
                channel: message.channel.clone(),
                text: self.usage(invocation.mode),
                thread: None,
            });
        }
        let thread = if message.edited {
            message.ts.clone()
        } else {
            None
        };
        let text = self.run(invocation.mode, invocation.expr).await;
        Some(Reply {
            channel: message.channel.clone(),
            text,
            thread,
        })
    }

    /// Evaluate `expr` under the configured deadline and render the reply.
    pub async fn run(&self, mode: Mode, expr: &str) -> String {
        if expr.is_empty() {
            return self.usage(mode);
        }
        let multiline = expr.contains('\n');
        debug!(?mode, multiline, len = expr.len(), "calc requested");

        match self.dispatch(mode, expr).await {
            Ok(outcome) => self.render(expr, multiline, &outcome),
            Err(failure) => self.render_failure(expr, multiline, failure),
        }
    }

    async fn dispatch(&self, mode: Mode, expr: &str) -> Result<Outcome, Failure> {
        let interrupt = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();

        let source = expr.to_string();
        let flag = interrupt.clone();
        let precision = mode.precision();
        let spawned = thread::Builder::new()
            .name("sandcalc-worker".to_string())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                // The receiver is gone once the deadline passed
                let _ = tx.send(run_on_worker(&source, precision, flag));
            });
        if let Err(e) = spawned {
            return Err(Failure::Worker(e.to_string()));
        }

        match tokio::time::timeout(self.config.timeout(), rx).await {
            Ok(Ok(Ok(outcome))) => Ok(outcome),
            Ok(Ok(Err(EvalError::Interrupted))) => Err(Failure::Timeout),
            Ok(Ok(Err(e))) => Err(Failure::Eval(e)),
            Ok(Err(_)) => Err(Failure::Worker("worker exited without a result".to_string())),
            Err(_) => {
                interrupt.store(true, Ordering::Relaxed);
                Err(Failure::Timeout)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Rendering
    // ═══════════════════════════════════════════════════════════════════

    fn render(&self, expr: &str, multiline: bool, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Value(rendered) => {
                if rendered.text.matches('\n').count() > self.config.newline_limit {
                    return TOO_MANY_NEWLINES.to_string();
                }
                let (shown, more) = rendered.clipped(self.config.length_limit);
                let more = if more { "⋯" } else { "" };
                result_template(
                    expr,
                    multiline,
                    rendered.text.contains('\n'),
                    rendered.text.trim().is_empty(),
                    &shown,
                    more,
                )
            }
            Outcome::Locals(locals) if locals.is_empty() => {
                if multiline {
                    format!("*Expr*\n```{}```\n*Local*: Empty", expr)
                } else {
                    format!("*Expr*: `{}`\n*Local*: Empty", expr)
                }
            }
            Outcome::Locals(locals) => {
                let lines: Vec<String> = locals
                    .iter()
                    .map(|(name, rendered)| {
                        let (shown, more) = rendered.clipped(self.config.length_limit);
                        format!("{} = {}{}", name, shown, if more { "⋯" } else { "" })
                    })
                    .collect();
                let body = lines.join("\n");
                if body.matches('\n').count() > self.config.newline_limit {
                    return TOO_MANY_NEWLINES.to_string();
                }
                if multiline {
                    format!("*Expr*\n```{}```\n*Local*\n```{}```", expr, body)
                } else {
                    format!("*Expr*: `{}`\n*Local*\n```{}```", expr, body)
                }
            }
        }
    }

    fn render_failure(&self, expr: &str, multiline: bool, failure: Failure) -> String {
        match failure {
            Failure::Timeout => {
                info!(timeout_ms = self.config.timeout_ms, "calc timed out");
                if multiline {
                    "The given expression takes too long to run!".to_string()
                } else {
                    format!("`{}` takes too long to run!", expr)
                }
            }
            Failure::Worker(reason) => {
                error!(%reason, "calc worker failed");
                format!("An error occurred! {}", reason)
            }
            Failure::Eval(EvalError::Syntax(e)) => {
                debug!(error = %e, "calc syntax error");
                format!("An error occurred! {}", e)
            }
            Failure::Eval(e) if e.is_zero_division() => {
                debug!(error = %e, "calc division by zero");
                if multiline {
                    "The given expression divides by zero. Dividing by zero is not allowed!".to_string()
                } else {
                    format!("`{}` divides by zero. Dividing by zero is not allowed!", expr)
                }
            }
            Failure::Eval(e) => {
                if e.is_security() {
                    warn!(error = %e, expr, "sandbox probe rejected");
                } else {
                    debug!(category = e.category(), error = %e, "calc failed");
                }
                format!("An error occurred! {}: {}", e.category(), e)
            }
        }
    }
}

/// Pick one of the eight result templates.
fn result_template(
    expr: &str,
    multiline_expr: bool,
    multiline_result: bool,
    empty: bool,
    result: &str,
    more: &str,
) -> String {
    match (multiline_expr, multiline_result, empty) {
        (true, _, true) => format!("*Expr*\n```{}```\n*Result*: Empty string", expr),
        (true, true, false) => format!("*Expr*\n```{}```\n*Result*\n```{}{}```", expr, result, more),
        (true, false, false) => format!("*Expr*\n```{}```\n*Result*: `{}{}`", expr, result, more),
        (false, true, true) => format!("*Expr*: `{}`\n*Result*: Empty string", expr),
        (false, true, false) => format!("*Expr*: `{}`\n*Result*\n```{}{}```", expr, result, more),
        (false, false, true) => format!("`{}` == Empty string", expr),
        (false, false, false) => format!("`{}` == `{}{}`", expr, result, more),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn calc() -> Calculator {
        Calculator::default()
    }

    #[test]
    fn test_parse_triggers() {
        let c = calc();
        assert_eq!(
            c.parse(".= 1+2"),
            Some(Invocation {
                mode: Mode::Precision,
                expr: "1+2"
            })
        );
        assert_eq!(c.parse(".calc 1").map(|i| i.mode), Some(Mode::Precision));
        assert_eq!(c.parse(".== 1/3").map(|i| i.mode), Some(Mode::Native));
        assert_eq!(c.parse(".=").map(|i| i.expr), Some(""));
        assert_eq!(c.parse(".=1"), None);
        assert_eq!(c.parse("= 1"), None);
        assert_eq!(c.parse(".calculate 1"), None);
    }

    #[test]
    fn test_parse_keeps_inner_newlines() {
        let inv = calc().parse(".= \nx = 1\nx\n").unwrap();
        assert_eq!(inv.expr, "x = 1\nx");
    }

    #[test]
    fn test_result_templates() {
        assert_eq!(result_template("e", false, false, false, "r", ""), "`e` == `r`");
        assert_eq!(result_template("e", false, false, true, "", ""), "`e` == Empty string");
        assert_eq!(
            result_template("e", false, true, false, "a\nb", "⋯"),
            "*Expr*: `e`\n*Result*\n```a\nb⋯```"
        );
        assert_eq!(
            result_template("e\nf", true, false, false, "r", ""),
            "*Expr*\n```e\nf```\n*Result*: `r`"
        );
        assert_eq!(
            result_template("e\nf", true, true, true, " \n", ""),
            "*Expr*\n```e\nf```\n*Result*: Empty string"
        );
    }

    #[tokio::test]
    async fn test_simple_result() {
        assert_eq!(calc().run(Mode::Precision, "0.1 + 0.2").await, "`0.1 + 0.2` == `0.3`");
        assert_eq!(
            calc().run(Mode::Native, "0.1 + 0.2").await,
            "`0.1 + 0.2` == `0.30000000000000004`"
        );
    }

    #[tokio::test]
    async fn test_usage() {
        assert_eq!(calc().run(Mode::Native, "").await, "Usage: `.== <expression>`");
    }

    #[tokio::test]
    async fn test_truncation() {
        let reply = calc().run(Mode::Native, "'a' * 500").await;
        let expected = format!("`'a' * 500` == `{}⋯`", "a".repeat(300));
        assert_eq!(reply, expected);
    }

    #[tokio::test]
    async fn test_too_many_newlines() {
        let reply = calc().run(Mode::Native, "'\\n' * 31").await;
        assert_eq!(reply, TOO_MANY_NEWLINES);
        let reply = calc().run(Mode::Native, "'x\\n' * 30").await;
        assert!(reply.starts_with("*Expr*: `'x\\n' * 30`\n*Result*\n```x\n"));
    }

    #[tokio::test]
    async fn test_locals() {
        assert_eq!(
            calc().run(Mode::Native, "a = 1\nb = 'x'").await,
            "*Expr*\n```a = 1\nb = 'x'```\n*Local*\n```a = 1\nb = x```"
        );
        assert_eq!(calc().run(Mode::Native, "pass").await, "*Expr*: `pass`\n*Local*: Empty");
        assert_eq!(calc().run(Mode::Native, "None").await, "*Expr*: `None`\n*Local*: Empty");
    }

    #[tokio::test]
    async fn test_error_messages() {
        assert_eq!(
            calc().run(Mode::Native, "1/0").await,
            "`1/0` divides by zero. Dividing by zero is not allowed!"
        );
        assert_eq!(
            calc().run(Mode::Precision, "x = 0\n1 / x").await,
            "The given expression divides by zero. Dividing by zero is not allowed!"
        );
        assert_eq!(
            calc().run(Mode::Native, "undefined").await,
            "An error occurred! NameError: name 'undefined' is not defined"
        );
        assert_eq!(
            calc().run(Mode::Native, "import os").await,
            "An error occurred! SyntaxSecurityError: You can not import anything"
        );
        assert!(calc()
            .run(Mode::Native, "1 +")
            .await
            .starts_with("An error occurred! "));
    }

    #[tokio::test]
    async fn test_timeout() {
        let c = Calculator::new(CalcConfig {
            timeout_ms: 100,
            ..CalcConfig::default()
        });
        assert_eq!(
            c.run(Mode::Native, "while True: pass").await,
            "`while True: pass` takes too long to run!"
        );
        assert_eq!(
            c.run(Mode::Native, "x = 0\nwhile True:\n    x += 1").await,
            "The given expression takes too long to run!"
        );
    }

    #[tokio::test]
    async fn test_handle_message() {
        let c = calc();
        let message = Message {
            channel: "C1".to_string(),
            text: ".== 6 * 7".to_string(),
            ts: Some("123.45".to_string()),
            edited: false,
        };
        let reply = c.handle(&message).await.unwrap();
        assert_eq!(reply.text, "`6 * 7` == `42`");
        assert_eq!(reply.thread, None);

        let edited = Message {
            edited: true,
            ..message
        };
        let reply = c.handle(&edited).await.unwrap();
        assert_eq!(reply.thread.as_deref(), Some("123.45"));

        let other = Message {
            text: "hello".to_string(),
            ..Message::default()
        };
        assert!(c.handle(&other).await.is_none());
    }
}
