//! f-string interpolation

use rustpython_parser::ast;

use super::Evaluate;
use crate::error::Result;
use crate::format::{convert, format_value};
use crate::{Environment, EvalContext, Value};

impl Evaluate for ast::ExprJoinedStr {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let mut out = String::new();
        for part in &self.values {
            match part.eval(env, ctx)? {
                Value::Str(s) => out.push_str(&s),
                other => out.push_str(&other.to_string()),
            }
        }
        Ok(Value::str(out))
    }
}

impl Evaluate for ast::ExprFormattedValue {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value> {
        let value = self.value.eval(env, ctx)?;
        let value = convert(&value, conversion_char(self.conversion))?;
        let spec = match &self.format_spec {
            Some(spec) => spec.eval(env, ctx)?.to_string(),
            None => String::new(),
        };
        Ok(Value::str(format_value(&value, &spec)?))
    }
}

fn conversion_char(flag: ast::ConversionFlag) -> Option<char> {
    match flag {
        ast::ConversionFlag::None => None,
        ast::ConversionFlag::Str => Some('s'),
        ast::ConversionFlag::Ascii => Some('a'),
        ast::ConversionFlag::Repr => Some('r'),
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::test_support::show;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interpolation() {
        assert_eq!(show("x = 3\nf'x={x}'"), "'x=3'");
        assert_eq!(show("f'{1 + 1} and {\"a\"!r}'"), "\"2 and 'a'\"");
    }

    #[test]
    fn test_format_spec() {
        assert_eq!(show("f'{3.14159:.2f}'"), "'3.14'");
        assert_eq!(show("f'{42:>5}|'"), "'   42|'");
        assert_eq!(show("w = 6\nf'{7:0{w}d}'"), "'000007'");
        assert_eq!(show("f'{255:x}'"), "'ff'");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(show("f'{\"é\"!a}'"), "\"'\\\\xe9'\"");
        assert_eq!(show("f'{[1]!s}'"), "'[1]'");
    }

    #[test]
    fn test_bad_spec() {
        assert_eq!(show("f'{\"a\":d}'"), "ValueError: Unknown format code 'd' for object of type 'str'");
    }
}
