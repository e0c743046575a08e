//! Parser adapter
//!
//! Turns source text into a syntax tree using the `rustpython-parser`
//! grammar. Nothing here rewrites the tree:
//!
//! ```text
//! Source Text → [Frontend] → ast::Suite → [Policy check] → [Interpreter] → Value
//! ```

use std::fmt;

use rustpython_parser::{ast, Mode};

use crate::error::EvalError;

/// Name reported to the parser for diagnostics.
const SOURCE_PATH: &str = "<calc>";

/// Longest source text accepted for parsing, in characters.
pub const MAX_SOURCE_CHARS: usize = 100_000;

/// Deepest bracket and prefix-operator nesting accepted for parsing.
pub const MAX_SOURCE_NESTING: usize = 1_000;

// ═══════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════

/// Error that occurred during parsing.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable error message from the grammar
    pub message: String,

    /// Optional source location
    pub location: Option<SourceLocation>,
}

impl ParseError {
    /// Create a new parse error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Add location information to the error.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    fn from_parser(source: &str, error: rustpython_parser::ParseError) -> Self {
        let offset = u32::from(error.offset) as usize;
        Self::new(error.error.to_string()).with_location(SourceLocation::at_offset(source, offset))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " (line {}, column {})", loc.line, loc.column)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Source code location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed, in characters)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Compute the line and column of a byte offset into `source`.
    pub fn at_offset(source: &str, offset: usize) -> Self {
        let mut end = offset.min(source.len());
        while !source.is_char_boundary(end) {
            end -= 1;
        }
        let before = &source[..end];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PROGRAM
// ═══════════════════════════════════════════════════════════════════════

/// A parsed program: the statement list of one module and its source.
#[derive(Debug, Clone)]
pub struct Program {
    /// Top-level statements in source order
    pub body: Vec<ast::Stmt>,

    /// The text the statements were parsed from
    pub source: String,
}

impl Program {
    /// Whether the program has no statements at all.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Whether the source spans more than one line.
    pub fn is_multiline(&self) -> bool {
        self.source.trim_end().contains('\n')
    }
}

/// Parse source text as a sequence of statements.
///
/// # Errors
///
/// Returns the grammar's diagnostic when the text is malformed.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let module = rustpython_parser::parse(source, Mode::Module, SOURCE_PATH)
        .map_err(|e| ParseError::from_parser(source, e))?;

    match module {
        ast::Mod::Module(module) => Ok(Program {
            body: module.body,
            source: source.to_string(),
        }),
        _ => Err(ParseError::new("expected a module")),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SIZE GUARD
// ═══════════════════════════════════════════════════════════════════════

/// Reject source text too large or too deeply nested to parse safely.
///
/// Parsing and the policy walk both recurse over the tree, so this runs on
/// the raw text before either of them.
///
/// # Errors
///
/// `MemoryError` past [`MAX_SOURCE_CHARS`], `RecursionError` past
/// [`MAX_SOURCE_NESTING`].
pub fn check_source(source: &str) -> Result<(), EvalError> {
    if source.chars().count() > MAX_SOURCE_CHARS {
        return Err(EvalError::Memory {
            message: "source text is too long".to_string(),
        });
    }
    if nesting_depth(source) > MAX_SOURCE_NESTING {
        return Err(EvalError::Recursion {
            depth: MAX_SOURCE_NESTING,
        });
    }
    Ok(())
}

/// Estimate how deep the syntax tree of `source` will nest.
///
/// Counts open brackets plus the current run of prefix operators
/// (`-`, `+`, `~`). String literals and comments are skipped.
pub fn nesting_depth(source: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut prefix_run = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        if let Some(open) = quote {
            if c == '\\' {
                chars.next();
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                prefix_run = 0;
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                prefix_run = 0;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                prefix_run = 0;
            }
            '-' | '+' | '~' => prefix_run += 1,
            c if c.is_whitespace() => {}
            _ => prefix_run = 0,
        }
        deepest = deepest.max(depth + prefix_run);
    }
    deepest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statements() {
        let program = parse_program("x = 1\nx + 1").unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(matches!(program.body[0], ast::Stmt::Assign(_)));
        assert!(matches!(program.body[1], ast::Stmt::Expr(_)));
    }

    #[test]
    fn test_parse_empty() {
        let program = parse_program("").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn test_program_keeps_source() {
        let program = parse_program("a = 1\na\n").unwrap();
        assert_eq!(program.source, "a = 1\na\n");
        assert!(program.is_multiline());
        assert!(!parse_program("1 + 1\n").unwrap().is_multiline());
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = parse_program("x = (1 +").unwrap_err();
        assert!(err.location.is_some());
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_location_from_offset() {
        let src = "a = 1\nbb = 2";
        assert_eq!(SourceLocation::at_offset(src, 0), SourceLocation::new(1, 1));
        assert_eq!(SourceLocation::at_offset(src, 7), SourceLocation::new(2, 2));
        assert_eq!(SourceLocation::at_offset(src, 999), SourceLocation::new(2, 7));
    }

    #[test]
    fn test_nesting_depth() {
        assert_eq!(nesting_depth("1 + 2"), 1);
        assert_eq!(nesting_depth("((1))"), 2);
        assert_eq!(nesting_depth("[(-1), {2: ~-3}]"), 4);
        assert_eq!(nesting_depth("1 - 2 - 3 - 4"), 1);
        assert_eq!(nesting_depth("'((((' + \"[[\\\"[\"  # (((((("), 1);
    }

    #[test]
    fn test_check_source_limits() {
        assert!(check_source(&format!("{}1{}", "(".repeat(150), ")".repeat(150))).is_ok());
        let deep = format!("{}1", "-".repeat(300_000));
        assert!(matches!(
            check_source(&deep),
            Err(EvalError::Memory { .. })
        ));
        let deep = format!("{}1", "-".repeat(MAX_SOURCE_NESTING + 1));
        assert!(matches!(
            check_source(&deep),
            Err(EvalError::Recursion { depth: MAX_SOURCE_NESTING })
        ));
        let long = "1 + ".repeat(MAX_SOURCE_CHARS / 4) + "1";
        assert_eq!(check_source(&long).unwrap_err().category(), "MemoryError");
    }

    #[test]
    fn test_display_with_location() {
        let err = ParseError::new("invalid syntax").with_location(SourceLocation::new(2, 5));
        assert_eq!(err.to_string(), "invalid syntax (line 2, column 5)");
    }
}
