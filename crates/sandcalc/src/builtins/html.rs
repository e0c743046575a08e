//! The `html` namespace

use super::{builtin, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::Value;

/// Named references understood by `unescape`. Entries flagged `true` are
/// also recognised without the trailing semicolon.
const ENTITIES: &[(&str, char, bool)] = &[
    ("amp", '&', true),
    ("lt", '<', true),
    ("gt", '>', true),
    ("quot", '"', true),
    ("apos", '\'', false),
    ("nbsp", '\u{a0}', true),
    ("iexcl", '¡', true),
    ("cent", '¢', true),
    ("pound", '£', true),
    ("curren", '¤', true),
    ("yen", '¥', true),
    ("brvbar", '¦', true),
    ("sect", '§', true),
    ("uml", '¨', true),
    ("copy", '©', true),
    ("ordf", 'ª', true),
    ("laquo", '«', true),
    ("not", '¬', true),
    ("shy", '\u{ad}', true),
    ("reg", '®', true),
    ("macr", '¯', true),
    ("deg", '°', true),
    ("plusmn", '±', true),
    ("sup2", '²', true),
    ("sup3", '³', true),
    ("acute", '´', true),
    ("micro", 'µ', true),
    ("para", '¶', true),
    ("middot", '·', true),
    ("cedil", '¸', true),
    ("sup1", '¹', true),
    ("ordm", 'º', true),
    ("raquo", '»', true),
    ("frac14", '¼', true),
    ("frac12", '½', true),
    ("frac34", '¾', true),
    ("iquest", '¿', true),
    ("times", '×', true),
    ("divide", '÷', true),
    ("euro", '€', false),
    ("hellip", '…', false),
    ("mdash", '—', false),
    ("ndash", '–', false),
    ("lsquo", '‘', false),
    ("rsquo", '’', false),
    ("ldquo", '“', false),
    ("rdquo", '”', false),
    ("bull", '•', false),
    ("trade", '™', false),
    ("larr", '←', false),
    ("rarr", '→', false),
    ("uarr", '↑', false),
    ("darr", '↓', false),
    ("harr", '↔', false),
    ("le", '≤', false),
    ("ge", '≥', false),
    ("ne", '≠', false),
    ("infin", '∞', false),
    ("sum", '∑', false),
    ("prod", '∏', false),
    ("radic", '√', false),
    ("minus", '−', false),
    ("alpha", 'α', false),
    ("beta", 'β', false),
    ("gamma", 'γ', false),
    ("delta", 'δ', false),
    ("epsilon", 'ε', false),
    ("lambda", 'λ', false),
    ("mu", 'μ', false),
    ("pi", 'π', false),
    ("sigma", 'σ', false),
    ("tau", 'τ', false),
    ("phi", 'φ', false),
    ("omega", 'ω', false),
    ("Delta", 'Δ', false),
    ("Sigma", 'Σ', false),
    ("Omega", 'Ω', false),
];

/// Code points 0x80..=0x9f mapped the way browsers do (windows-1252).
const WINDOWS_1252: [char; 32] = [
    '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8d}', 'Ž',
    '\u{8f}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9d}',
    'ž', 'Ÿ',
];

fn html_escape(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let ([s], [quote]) = args.bind("escape", ["s"], ["quote"])?;
    let s = match s {
        Value::Str(s) => s,
        other => {
            return Err(EvalError::attribute_error(format!(
                "'{}' object has no attribute 'replace'",
                other.type_name()
            )))
        }
    };
    let quote = quote.map_or(true, |q| q.truthy());
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote => out.push_str("&quot;"),
            '\'' if quote => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    Ok(Value::str(out))
}

/// Decode a numeric reference body (`123` or `x7b`).
fn numeric_reference(body: &str) -> String {
    let code = match body.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => body.parse::<u32>().ok(),
    }
    .unwrap_or(u32::MAX);
    match code {
        0 => "\u{fffd}".to_string(),
        0x80..=0x9f => WINDOWS_1252[(code - 0x80) as usize].to_string(),
        0xd800..=0xdfff => "\u{fffd}".to_string(),
        0x1..=0x8 | 0xe..=0x1f | 0x7f | 0xfdd0..=0xfdef | 0xb | 0xfffe | 0xffff => String::new(),
        c => char::from_u32(c).map_or("\u{fffd}".to_string(), String::from),
    }
}

fn html_unescape(_ctx: &EvalContext, args: Args) -> Result<Value> {
    let [s] = args.fixed("unescape", ["s"])?;
    let s = match s {
        Value::Str(s) => s,
        other => {
            return Err(EvalError::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            )))
        }
    };
    let mut out = String::with_capacity(s.len());
    let mut rest: &str = &s;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        if let Some(num) = after.strip_prefix('#') {
            let hex = num.starts_with(['x', 'X']);
            let skip = usize::from(hex);
            let digits = num[skip..]
                .char_indices()
                .take_while(|(_, c)| if hex { c.is_ascii_hexdigit() } else { c.is_ascii_digit() })
                .count();
            if digits > 0 {
                out.push_str(&numeric_reference(&num[..skip + digits]));
                let tail = &num[skip + digits..];
                rest = tail.strip_prefix(';').unwrap_or(tail);
                continue;
            }
        } else {
            let name_len = after
                .char_indices()
                .take_while(|(_, c)| c.is_ascii_alphanumeric())
                .count();
            let name = &after[..name_len];
            let terminated = after[name_len..].starts_with(';');
            let found = ENTITIES.iter().find(|(entity, _, bare)| {
                if terminated && *entity == name {
                    return true;
                }
                *bare && name.starts_with(entity)
            });
            if let Some((entity, c, _)) = found {
                out.push(*c);
                rest = if terminated && *entity == name {
                    &after[name_len + 1..]
                } else {
                    &after[entity.len()..]
                };
                continue;
            }
        }
        out.push('&');
        rest = after;
    }
    out.push_str(rest);
    Ok(Value::str(out))
}

pub(super) fn module_attr(name: &'static str) -> Option<Value> {
    match name {
        "escape" => Some(builtin(name, html_escape)),
        "unescape" => Some(builtin(name, html_unescape)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(f: fn(&EvalContext, Args) -> Result<Value>, args: Vec<Value>) -> String {
        let ctx = EvalContext::new();
        f(&ctx, Args::positional(args)).unwrap().to_string()
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            call(html_escape, vec![Value::str(r#"<a href="x">'&'</a>"#)]),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
        assert_eq!(
            call(html_escape, vec![Value::str(r#""&""#), Value::Bool(false)]),
            r#""&amp;""#
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(
            call(html_unescape, vec![Value::str("&lt;b&gt; &amp;amp; &copy;2024")]),
            "<b> &amp; ©2024"
        );
        assert_eq!(call(html_unescape, vec![Value::str("&#65;&#x42;&#X43")]), "ABC");
        assert_eq!(call(html_unescape, vec![Value::str("&#150; &#0;")]), "– \u{fffd}");
        assert_eq!(call(html_unescape, vec![Value::str("&ampx &bogus; &")]), "&x &bogus; &");
    }
}
