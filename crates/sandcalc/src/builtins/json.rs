//! The `json` namespace
//!
//! `dumps` writes the compact layout (no spaces after separators, ASCII
//! output, escaped forward slashes); `loads` parses with `serde_json`.

use std::fmt::Write as _;

use indexmap::IndexMap;
use num_traits::ToPrimitive;

use super::{builtin, given, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::{float_repr, HashKey, NestingGuard, Value};

// ═══════════════════════════════════════════════════════════════════════
// Encoding
// ═══════════════════════════════════════════════════════════════════════

struct Encoder<'a> {
    ctx: &'a EvalContext,
    out: String,
    indent: Option<usize>,
    sort_keys: bool,
    depth: usize,
}

fn not_serializable(value: &Value) -> EvalError {
    EvalError::type_error(format!("{} is not JSON serializable", value.repr()))
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

fn write_float(out: &mut String, f: f64) -> Result<()> {
    if f.is_nan() {
        return Err(EvalError::overflow("Invalid Nan value when encoding double"));
    }
    if f.is_infinite() {
        return Err(EvalError::overflow("Invalid Inf value when encoding double"));
    }
    out.push_str(&float_repr(f));
    Ok(())
}

impl<'a> Encoder<'a> {
    fn newline(&mut self) {
        if let Some(width) = self.indent {
            self.out.push('\n');
            for _ in 0..width * self.depth {
                self.out.push(' ');
            }
        }
    }

    fn key_text(key: &Value) -> Result<String> {
        Ok(match key {
            Value::Str(s) => s.to_string(),
            Value::None => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => float_repr(*f),
            other => {
                return Err(EvalError::type_error(format!(
                    "keys must be str, int, float, bool or None, not {}",
                    other.type_name()
                )))
            }
        })
    }

    fn sequence(&mut self, items: &[Value]) -> Result<()> {
        self.out.push('[');
        if items.is_empty() {
            self.out.push(']');
            return Ok(());
        }
        self.depth += 1;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline();
            self.encode(item)?;
        }
        self.depth -= 1;
        self.newline();
        self.out.push(']');
        Ok(())
    }

    fn mapping(&mut self, entries: Vec<(Value, Value)>) -> Result<()> {
        let mut pairs = entries
            .iter()
            .map(|(k, v)| Ok((Self::key_text(k)?, v)))
            .collect::<Result<Vec<_>>>()?;
        if self.sort_keys {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
        }
        self.out.push('{');
        if pairs.is_empty() {
            self.out.push('}');
            return Ok(());
        }
        self.depth += 1;
        for (i, (key, value)) in pairs.into_iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline();
            write_string(&mut self.out, &key);
            self.out.push(':');
            if self.indent.is_some() {
                self.out.push(' ');
            }
            self.encode(value)?;
        }
        self.depth -= 1;
        self.newline();
        self.out.push('}');
        Ok(())
    }

    fn encode(&mut self, value: &Value) -> Result<()> {
        let _guard = NestingGuard::enter()?;
        self.ctx.check_interrupt()?;
        match value {
            Value::None => self.out.push_str("null"),
            Value::Bool(true) => self.out.push_str("true"),
            Value::Bool(false) => self.out.push_str("false"),
            Value::Int(n) => {
                if n.to_i64().is_none() && n.to_u64().is_none() {
                    return Err(EvalError::overflow("int too big to convert"));
                }
                let _ = write!(self.out, "{}", n);
            }
            Value::Float(f) => write_float(&mut self.out, *f)?,
            Value::Decimal(d) => write_float(&mut self.out, d.to_f64())?,
            Value::Str(s) => write_string(&mut self.out, s),
            Value::List(items) => {
                let items = items.borrow().clone();
                self.sequence(&items)?;
            }
            Value::Tuple(items) => self.sequence(items)?,
            Value::Dict(map) => {
                let entries = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.value().clone(), v.clone()))
                    .collect();
                self.mapping(entries)?;
            }
            other => return Err(not_serializable(other)),
        }
        Ok(())
    }
}

fn json_dumps(ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([obj], [_ensure_ascii, indent, sort_keys]) =
        args.bind("dumps", ["obj"], ["ensure_ascii", "indent", "sort_keys"])?;
    let indent = match given(indent) {
        Some(v) => Some(v.to_count()?).filter(|width| *width > 0),
        None => None,
    };
    let mut encoder = Encoder {
        ctx,
        out: String::new(),
        indent,
        sort_keys: sort_keys.map_or(false, |v| v.truthy()),
        depth: 0,
    };
    encoder.encode(&obj)?;
    Ok(Value::str(encoder.out))
}

// ═══════════════════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════════════════

fn from_json(value: serde_json::Value) -> Result<Value> {
    let _guard = NestingGuard::enter()?;
    Ok(match value {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::int(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(items) => Value::list(
            items
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_json::Value::Object(map) => {
            let mut entries = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                entries.insert(HashKey::new(Value::str(key))?, from_json(item)?);
            }
            Value::dict(entries)
        }
    })
}

fn json_loads(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [s] = args.fixed("loads", ["s"])?;
    let text = match &s {
        Value::Str(s) => s.to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        other => {
            return Err(EvalError::type_error(format!(
                "Expected String or Unicode, not {}",
                other.type_name()
            )))
        }
    };
    let parsed: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| EvalError::value_error(e.to_string()))?;
    from_json(parsed)
}

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    match name {
        "dumps" => Some(builtin(name, json_dumps)),
        "loads" => Some(builtin(name, json_loads)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dumps(value: Value, keywords: &[(&str, Value)]) -> String {
        let ctx = EvalContext::new();
        let mut args = Args::positional(vec![value]);
        for (k, v) in keywords {
            args.keywords.insert(k.to_string(), v.clone());
        }
        match json_dumps(&ctx, args) {
            Ok(v) => v.to_string(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    fn sample() -> Value {
        let mut entries = IndexMap::new();
        entries.insert(
            HashKey::new(Value::str("b")).unwrap(),
            Value::list(vec![Value::from(1i64), Value::Float(2.5), Value::None]),
        );
        entries.insert(HashKey::new(Value::str("a")).unwrap(), Value::str("x/y"));
        Value::dict(entries)
    }

    #[test]
    fn test_dumps_compact() {
        assert_eq!(dumps(sample(), &[]), r#"{"b":[1,2.5,null],"a":"x\/y"}"#);
        assert_eq!(dumps(Value::str("한"), &[]), r#""\ud55c""#);
        assert_eq!(
            dumps(Value::Float(f64::INFINITY), &[]),
            "OverflowError: Invalid Inf value when encoding double"
        );
    }

    #[test]
    fn test_dumps_options() {
        assert_eq!(
            dumps(sample(), &[("sort_keys", Value::Bool(true))]),
            r#"{"a":"x\/y","b":[1,2.5,null]}"#
        );
        assert_eq!(
            dumps(Value::list(vec![Value::from(1i64)]), &[("indent", Value::from(2i64))]),
            "[\n  1\n]"
        );
    }

    #[test]
    fn test_loads() {
        let ctx = EvalContext::new();
        let text = Value::str(r#"{"z": [1, 2.0, true, null], "a": "s"}"#);
        let value = json_loads(&ctx, Args::positional(vec![text])).unwrap();
        assert_eq!(value.repr(), "{'z': [1, 2.0, True, None], 'a': 's'}");

        let err = json_loads(&ctx, Args::positional(vec![Value::str("{")])).unwrap_err();
        assert_eq!(err.category(), "ValueError");
    }
}
