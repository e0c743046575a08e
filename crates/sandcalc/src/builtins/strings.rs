//! `str` and `bytes` methods

use std::rc::Rc;

use indexmap::IndexMap;
use num_traits::ToPrimitive;

use super::text::{self, Align, Unit};
use super::{given, no_attribute, Args};
use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::format::{format_args, format_map};
use crate::value::display::is_printable;
use crate::value::{check_len, collect, get_item, HashKey, Value};

/// Element type of a text-like receiver, with its argument conversions.
trait TextLike: Unit {
    /// Name used in "must be X" messages
    const LABEL: &'static str;
    /// Message for a failed `index`/`rindex`
    const NOT_FOUND: &'static str;

    fn units(fname: &str, value: &Value) -> Result<Vec<Self>>;
    fn wrap(units: Vec<Self>) -> Value;
    fn fill(fname: &str, value: &Value) -> Result<Self>;
}

impl TextLike for char {
    const LABEL: &'static str = "str";
    const NOT_FOUND: &'static str = "substring not found";

    fn units(_fname: &str, value: &Value) -> Result<Vec<Self>> {
        match value {
            Value::Str(s) => Ok(s.chars().collect()),
            other => Err(EvalError::type_error(format!(
                "must be str, not {}",
                other.type_name()
            ))),
        }
    }

    fn wrap(units: Vec<Self>) -> Value {
        Value::from(units.into_iter().collect::<String>())
    }

    fn fill(fname: &str, value: &Value) -> Result<Self> {
        let mut chars = value.as_str().map(|s| s.chars());
        match chars.as_mut().map(|c| (c.next(), c.next())) {
            Some((Some(c), None)) => Ok(c),
            Some(_) => Err(EvalError::type_error(
                "The fill character must be exactly one character long",
            )),
            None => Err(EvalError::type_error(format!(
                "{}() argument 2 must be str, not {}",
                fname,
                value.type_name()
            ))),
        }
    }
}

impl TextLike for u8 {
    const LABEL: &'static str = "bytes";
    const NOT_FOUND: &'static str = "subsection not found";

    fn units(_fname: &str, value: &Value) -> Result<Vec<Self>> {
        match value {
            Value::Bytes(b) => Ok(b.to_vec()),
            Value::Int(_) | Value::Bool(_) => Ok(vec![byte_value(value)?]),
            other => Err(EvalError::type_error(format!(
                "a bytes-like object is required, not '{}'",
                other.type_name()
            ))),
        }
    }

    fn wrap(units: Vec<Self>) -> Value {
        Value::bytes(units)
    }

    fn fill(fname: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Bytes(b) if b.len() == 1 => Ok(b[0]),
            _ => Err(EvalError::type_error(format!(
                "{}() argument 2 must be a byte string of length 1, not {}",
                fname,
                value.type_name()
            ))),
        }
    }
}

/// Integer in `range(0, 256)`.
pub(super) fn byte_value(value: &Value) -> Result<u8> {
    value
        .to_index()?
        .to_u8()
        .ok_or_else(|| EvalError::value_error("byte must be in range(0, 256)"))
}

// ═══════════════════════════════════════════════════════════════════════
// Methods shared by str and bytes
// ═══════════════════════════════════════════════════════════════════════

fn width_arg(value: &Value) -> Result<usize> {
    value.to_count()
}

fn affix_candidates<T: TextLike>(fname: &str, value: &Value) -> Result<Vec<Vec<T>>> {
    let wrong = |found: &Value| {
        EvalError::type_error(format!(
            "{} first arg must be {} or a tuple of {}, not {}",
            fname,
            T::LABEL,
            T::LABEL,
            found.type_name()
        ))
    };
    match value {
        Value::Tuple(items) => items
            .iter()
            .map(|item| match item {
                Value::Str(_) | Value::Bytes(_) => T::units(fname, item),
                other => Err(wrong(other)),
            })
            .collect(),
        Value::Str(_) | Value::Bytes(_) => Ok(vec![T::units(fname, value).map_err(|_| wrong(value))?]),
        other => Err(wrong(other)),
    }
}

fn wrap_parts<T: TextLike>(parts: Vec<Vec<T>>) -> Value {
    Value::list(parts.into_iter().map(T::wrap).collect())
}

/// Methods with identical semantics on `str` and `bytes`.
fn common<T: TextLike>(hay: &[T], name: &'static str, args: Args) -> Result<Option<Value>> {
    let value = match name {
        "count" | "find" | "rfind" | "index" | "rindex" => {
            let ([sub], [start, end]) = args.bind(name, ["sub"], ["start", "end"])?;
            let needle = T::units(name, &sub)?;
            let (start, end) = text::window(hay.len(), start, end)?;
            if name == "count" {
                return Ok(Some(Value::from(text::count(hay, &needle, start, end))));
            }
            let found = if name.starts_with('r') {
                text::rfind(hay, &needle, start, end)
            } else {
                text::find(hay, &needle, start, end)
            };
            match (found, name) {
                (Some(i), _) => Value::from(i),
                (None, "find" | "rfind") => Value::from(-1i64),
                (None, _) => return Err(EvalError::value_error(T::NOT_FOUND)),
            }
        }
        "startswith" | "endswith" => {
            let ([affix], [start, end]) = args.bind(name, ["prefix"], ["start", "end"])?;
            let candidates = affix_candidates::<T>(name, &affix)?;
            let (start, end) = text::window(hay.len(), start, end)?;
            let suffix = name == "endswith";
            Value::Bool(
                candidates
                    .iter()
                    .any(|c| text::has_affix(hay, c, start, end, suffix)),
            )
        }
        "split" | "rsplit" => {
            let ([], [sep, maxsplit]) = args.bind(name, [], ["sep", "maxsplit"])?;
            let maxsplit = text::maxsplit_arg(maxsplit)?;
            let parts = match given(sep) {
                None if name == "split" => text::split_whitespace(hay, maxsplit),
                None => text::rsplit_whitespace(hay, maxsplit),
                Some(sep) => {
                    let sep = T::units(name, &sep)?;
                    if sep.is_empty() {
                        return Err(EvalError::value_error("empty separator"));
                    }
                    if name == "split" {
                        text::split_on(hay, &sep, maxsplit)
                    } else {
                        text::rsplit_on(hay, &sep, maxsplit)
                    }
                }
            };
            wrap_parts(parts)
        }
        "splitlines" => {
            let ([], [keepends]) = args.bind(name, [], ["keepends"])?;
            let keepends = keepends.map_or(false, |k| k.truthy());
            wrap_parts(text::split_lines(hay, keepends))
        }
        "partition" | "rpartition" => {
            let [sep] = args.fixed(name, ["sep"])?;
            let sep = T::units(name, &sep)?;
            if sep.is_empty() {
                return Err(EvalError::value_error("empty separator"));
            }
            let (a, b, c) = text::partition(hay, &sep, name == "rpartition");
            Value::tuple(vec![T::wrap(a), T::wrap(b), T::wrap(c)])
        }
        "replace" => {
            let ([old, new], [limit]) = args.bind(name, ["old", "new"], ["count"])?;
            let old = T::units(name, &old)?;
            let new = T::units(name, &new)?;
            let limit = text::maxsplit_arg(limit)?;
            T::wrap(text::replace(hay, &old, &new, limit)?)
        }
        "strip" | "lstrip" | "rstrip" => {
            let ([], [chars]) = args.bind(name, [], ["chars"])?;
            let chars = given(chars).map(|c| T::units(name, &c)).transpose()?;
            T::wrap(text::strip(
                hay,
                chars.as_deref(),
                name != "rstrip",
                name != "lstrip",
            ))
        }
        "center" | "ljust" | "rjust" => {
            let ([width], [fill]) = args.bind(name, ["width"], ["fillchar"])?;
            let width = width_arg(&width)?;
            let fill = match fill {
                Some(f) => T::fill(name, &f)?,
                None => T::ascii(b' '),
            };
            let align = match name {
                "center" => Align::Center,
                "ljust" => Align::Left,
                _ => Align::Right,
            };
            T::wrap(text::pad(hay, width, fill, align)?)
        }
        "zfill" => {
            let [width] = args.fixed(name, ["width"])?;
            T::wrap(text::zfill(hay, width_arg(&width)?)?)
        }
        "expandtabs" => {
            let ([], [tabsize]) = args.bind(name, [], ["tabsize"])?;
            let tabsize = match tabsize {
                Some(t) => t.to_i64()?,
                None => 8,
            };
            T::wrap(text::expand_tabs(hay, tabsize)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn no_args(args: &Args, name: &str) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(EvalError::type_error(format!(
            "{}() takes no arguments ({} given)",
            name,
            args.len()
        )))
    }
}

/// `istitle` over case predicates.
fn is_title<I: Iterator<Item = (bool, bool)>>(cases: I) -> bool {
    let mut cased = false;
    let mut previous_cased = false;
    for (upper, lower) in cases {
        if upper {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else if lower {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else {
            previous_cased = false;
        }
    }
    cased
}

// ═══════════════════════════════════════════════════════════════════════
// str
// ═══════════════════════════════════════════════════════════════════════

const DECIMAL_BLOCKS: &[u32] = &[
    0x30, 0x660, 0x6f0, 0x7c0, 0x966, 0x9e6, 0xa66, 0xae6, 0xb66, 0xbe6, 0xc66, 0xce6, 0xd66,
    0xde6, 0xe50, 0xed0, 0xf20, 0x1040, 0x1090, 0x17e0, 0x1810, 0xff10,
];

fn is_decimal(c: char) -> bool {
    let code = c as u32;
    DECIMAL_BLOCKS
        .iter()
        .any(|&start| (start..start + 10).contains(&code))
}

fn is_digit(c: char) -> bool {
    is_decimal(c)
        || matches!(
            c,
            '\u{b2}' | '\u{b3}' | '\u{b9}' | '\u{2070}' | '\u{2074}'..='\u{2079}' | '\u{2080}'..='\u{2089}'
                | '\u{2460}'..='\u{2468}' | '\u{24ea}'
        )
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

fn all_chars(s: &str, pred: impl Fn(char) -> bool) -> bool {
    !s.is_empty() && s.chars().all(pred)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_cased = false;
    for c in s.chars() {
        if is_cased(c) {
            if previous_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            out.push(c);
            previous_cased = false;
        }
    }
    out
}

fn swapcase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_uppercase() {
            out.extend(c.to_lowercase());
        } else if c.is_lowercase() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}

fn str_predicate(s: &str, name: &str) -> Option<bool> {
    let result = match name {
        "isalnum" => all_chars(s, |c| c.is_alphanumeric()),
        "isalpha" => all_chars(s, char::is_alphabetic),
        "isdecimal" => all_chars(s, is_decimal),
        "isdigit" => all_chars(s, is_digit),
        "isnumeric" => all_chars(s, |c| is_digit(c) || c.is_numeric()),
        "isspace" => all_chars(s, |c| c.is_space()),
        "isprintable" => s.chars().all(is_printable),
        "isidentifier" => is_identifier(s),
        "islower" => s.chars().any(is_cased) && !s.chars().any(char::is_uppercase),
        "isupper" => s.chars().any(is_cased) && !s.chars().any(char::is_lowercase),
        "istitle" => is_title(s.chars().map(|c| (c.is_uppercase(), c.is_lowercase()))),
        _ => return None,
    };
    Some(result)
}

/// Call a `str` method.
pub(super) fn str_method(ctx: &EvalContext, s: &Rc<str>, name: &'static str, args: Args) -> Result<Value> {
    let text: &str = s;
    if let Some(result) = str_predicate(text, name) {
        no_args(&args, name)?;
        return Ok(Value::Bool(result));
    }
    let simple = match name {
        "lower" => Some(text.to_lowercase()),
        "upper" => Some(text.to_uppercase()),
        "casefold" => Some(text.to_lowercase().replace('ß', "ss")),
        "capitalize" => Some(capitalize(text)),
        "title" => Some(title(text)),
        "swapcase" => Some(swapcase(text)),
        _ => None,
    };
    if let Some(result) = simple {
        no_args(&args, name)?;
        return Ok(Value::from(result));
    }

    match name {
        "format" => {
            let Args { positional, keywords } = args;
            Ok(Value::from(format_args(ctx, text, &positional, &keywords)?))
        }
        "format_map" => {
            let [mapping] = args.fixed(name, ["mapping"])?;
            Ok(Value::from(format_map(ctx, text, &mapping)?))
        }
        "encode" => {
            let ([], [encoding, errors]) = args.bind(name, [], ["encoding", "errors"])?;
            let encoding = str_arg(name, encoding, "utf-8")?;
            let errors = str_arg(name, errors, "strict")?;
            Ok(Value::bytes(text::encode(text, &encoding, &errors)?))
        }
        "join" => {
            let [iterable] = args.fixed(name, ["iterable"])?;
            join_str(ctx, text, &iterable)
        }
        "translate" => {
            let [table] = args.fixed(name, ["table"])?;
            translate_str(text, &table)
        }
        _ => {
            let units: Vec<char> = text.chars().collect();
            common(&units, name, args)?.ok_or_else(|| no_attribute(&Value::Str(s.clone()), name))
        }
    }
}

fn str_arg(fname: &str, value: Option<Value>, default: &str) -> Result<String> {
    match value {
        None => Ok(default.to_string()),
        Some(Value::Str(s)) => Ok(s.to_string()),
        Some(other) => Err(EvalError::type_error(format!(
            "{}() argument must be str, not {}",
            fname,
            other.type_name()
        ))),
    }
}

fn join_str(ctx: &EvalContext, sep: &str, iterable: &Value) -> Result<Value> {
    let items = collect(ctx, iterable)?;
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let piece = item.as_str().ok_or_else(|| {
            EvalError::type_error(format!(
                "sequence item {}: expected str instance, {} found",
                i,
                item.type_name()
            ))
        })?;
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(piece);
        check_len(out.len())?;
    }
    Ok(Value::from(out))
}

fn translate_str(text: &str, table: &Value) -> Result<Value> {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match get_item(table, &Value::from(c as u32 as i64)) {
            Ok(Value::None) => {}
            Ok(Value::Str(s)) => out.push_str(&s),
            Ok(mapped @ (Value::Int(_) | Value::Bool(_))) => {
                let code = mapped.to_index()?;
                let ch = code.to_u32().and_then(char::from_u32).ok_or_else(|| {
                    EvalError::value_error("character mapping must be in range(0x110000)")
                })?;
                out.push(ch);
            }
            Ok(_) => {
                return Err(EvalError::type_error(
                    "character mapping must return integer, None or str",
                ))
            }
            Err(EvalError::Key { .. } | EvalError::Index { .. }) => out.push(c),
            Err(other) => return Err(other),
        }
        check_len(out.len())?;
    }
    Ok(Value::from(out))
}

fn char_key(fname: &str, key: &Value) -> Result<Value> {
    match key {
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::from(c as u32 as i64)),
                _ => Err(EvalError::value_error(format!(
                    "string keys in translate table must be of length 1 ({})",
                    fname
                ))),
            }
        }
        Value::Int(_) | Value::Bool(_) => Ok(Value::from(key.to_index()?)),
        other => Err(EvalError::type_error(format!(
            "keys in translate table must be strings or integers, not {}",
            other.type_name()
        ))),
    }
}

/// `str.maketrans(x[, y[, z]])`.
pub(super) fn str_maketrans(args: Args) -> Result<Value> {
    let ([x], [y, z]) = args.bind("maketrans", ["x"], ["y", "z"])?;
    let mut table = IndexMap::new();
    match y {
        None => {
            let Value::Dict(map) = &x else {
                return Err(EvalError::type_error(
                    "if you give only one argument to maketrans it must be a dict",
                ));
            };
            let entries: Vec<(Value, Value)> = map
                .borrow()
                .iter()
                .map(|(k, v)| (k.value().clone(), v.clone()))
                .collect();
            for (key, value) in entries {
                table.insert(HashKey::new(char_key("maketrans", &key)?)?, value);
            }
        }
        Some(y) => {
            let (Some(from), Some(to)) = (x.as_str(), y.as_str()) else {
                return Err(EvalError::type_error("maketrans() argument must be str"));
            };
            if from.chars().count() != to.chars().count() {
                return Err(EvalError::value_error(
                    "the first two maketrans arguments must have equal length",
                ));
            }
            for (a, b) in from.chars().zip(to.chars()) {
                table.insert(
                    HashKey::new(Value::from(a as u32 as i64))?,
                    Value::from(b as u32 as i64),
                );
            }
            if let Some(z) = z {
                let removed = z
                    .as_str()
                    .ok_or_else(|| EvalError::type_error("maketrans() argument 3 must be str"))?;
                for c in removed.chars() {
                    table.insert(HashKey::new(Value::from(c as u32 as i64))?, Value::None);
                }
            }
        }
    }
    Ok(Value::dict(table))
}

// ═══════════════════════════════════════════════════════════════════════
// bytes
// ═══════════════════════════════════════════════════════════════════════

fn all_bytes(data: &[u8], pred: impl Fn(&u8) -> bool) -> bool {
    !data.is_empty() && data.iter().all(pred)
}

fn bytes_predicate(data: &[u8], name: &str) -> Option<bool> {
    let result = match name {
        "isalnum" => all_bytes(data, u8::is_ascii_alphanumeric),
        "isalpha" => all_bytes(data, u8::is_ascii_alphabetic),
        "isdigit" => all_bytes(data, u8::is_ascii_digit),
        "isspace" => all_bytes(data, |b| b.is_space()),
        "islower" => data.iter().any(u8::is_ascii_lowercase) && !data.iter().any(u8::is_ascii_uppercase),
        "isupper" => data.iter().any(u8::is_ascii_uppercase) && !data.iter().any(u8::is_ascii_lowercase),
        "istitle" => is_title(data.iter().map(|b| (b.is_ascii_uppercase(), b.is_ascii_lowercase()))),
        _ => return None,
    };
    Some(result)
}

fn bytes_title(data: &[u8]) -> Vec<u8> {
    let mut previous_cased = false;
    data.iter()
        .map(|&b| {
            let cased = b.is_ascii_alphabetic();
            let out = match (cased, previous_cased) {
                (true, true) => b.to_ascii_lowercase(),
                (true, false) => b.to_ascii_uppercase(),
                _ => b,
            };
            previous_cased = cased;
            out
        })
        .collect()
}

fn bytes_case(data: &[u8], name: &str) -> Option<Vec<u8>> {
    let out = match name {
        "lower" => data.to_ascii_lowercase(),
        "upper" => data.to_ascii_uppercase(),
        "capitalize" => data
            .iter()
            .enumerate()
            .map(|(i, b)| if i == 0 { b.to_ascii_uppercase() } else { b.to_ascii_lowercase() })
            .collect(),
        "swapcase" => data
            .iter()
            .map(|b| {
                if b.is_ascii_uppercase() {
                    b.to_ascii_lowercase()
                } else {
                    b.to_ascii_uppercase()
                }
            })
            .collect(),
        "title" => bytes_title(data),
        _ => return None,
    };
    Some(out)
}

/// Call a `bytes` method.
pub(super) fn bytes_method(ctx: &EvalContext, data: &Rc<[u8]>, name: &'static str, args: Args) -> Result<Value> {
    if let Some(result) = bytes_predicate(data, name) {
        no_args(&args, name)?;
        return Ok(Value::Bool(result));
    }
    if let Some(result) = bytes_case(data, name) {
        no_args(&args, name)?;
        return Ok(Value::bytes(result));
    }

    match name {
        "decode" => {
            let ([], [encoding, errors]) = args.bind(name, [], ["encoding", "errors"])?;
            let encoding = str_arg(name, encoding, "utf-8")?;
            let errors = str_arg(name, errors, "strict")?;
            Ok(Value::from(text::decode(data, &encoding, &errors)?))
        }
        "hex" => {
            let ([], [sep, per]) = args.bind(name, [], ["sep", "bytes_per_sep"])?;
            hex(data, sep, per)
        }
        "join" => {
            let [iterable] = args.fixed(name, ["iterable_of_bytes"])?;
            join_bytes(ctx, data, &iterable)
        }
        "translate" => {
            let ([table], [delete]) = args.bind(name, ["table"], ["delete"])?;
            translate_bytes(data, &table, delete)
        }
        _ => common(&data[..], name, args)?.ok_or_else(|| no_attribute(&Value::Bytes(data.clone()), name)),
    }
}

fn hex(data: &[u8], sep: Option<Value>, per: Option<Value>) -> Result<Value> {
    let digits: Vec<String> = data.iter().map(|b| format!("{:02x}", b)).collect();
    let Some(sep) = sep else {
        return Ok(Value::from(digits.concat()));
    };
    let sep = match &sep {
        Value::Str(s) => s.to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        other => {
            return Err(EvalError::type_error(format!(
                "sep must be str or bytes, not {}",
                other.type_name()
            )))
        }
    };
    if sep.chars().count() != 1 {
        return Err(EvalError::value_error("sep must be length 1."));
    }
    let per = match per {
        Some(p) => p.to_i64()?,
        None => 1,
    };
    if per == 0 {
        return Ok(Value::from(digits.concat()));
    }
    let group = per.unsigned_abs() as usize;
    let mut groups: Vec<String> = Vec::new();
    if per > 0 {
        let head = digits.len() % group;
        if head > 0 {
            groups.push(digits[..head].concat());
        }
        groups.extend(digits[head..].chunks(group).map(|c| c.concat()));
    } else {
        groups.extend(digits.chunks(group).map(|c| c.concat()));
    }
    Ok(Value::from(groups.join(&sep)))
}

fn join_bytes(ctx: &EvalContext, sep: &[u8], iterable: &Value) -> Result<Value> {
    let items = collect(ctx, iterable)?;
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let piece = match item {
            Value::Bytes(piece) => piece,
            other => {
                return Err(EvalError::type_error(format!(
                    "sequence item {}: expected a bytes-like object, {} found",
                    i,
                    other.type_name()
                )))
            }
        };
        if i > 0 {
            out.extend_from_slice(sep);
        }
        out.extend_from_slice(piece);
        check_len(out.len())?;
    }
    Ok(Value::bytes(out))
}

fn translate_bytes(data: &[u8], table: &Value, delete: Option<Value>) -> Result<Value> {
    let deleted = match delete {
        Some(d) => u8::units("translate", &d)?,
        None => Vec::new(),
    };
    let mapping: Option<Rc<[u8]>> = match table {
        Value::None => None,
        Value::Bytes(b) if b.len() == 256 => Some(b.clone()),
        Value::Bytes(_) => {
            return Err(EvalError::value_error(
                "translation table must be 256 characters long",
            ))
        }
        other => {
            return Err(EvalError::type_error(format!(
                "a bytes-like object is required, not '{}'",
                other.type_name()
            )))
        }
    };
    let out: Vec<u8> = data
        .iter()
        .filter(|b| !deleted.contains(b))
        .map(|&b| mapping.as_ref().map_or(b, |m| m[b as usize]))
        .collect();
    Ok(Value::bytes(out))
}

/// `bytes.fromhex(string)`.
pub(super) fn bytes_fromhex(args: Args) -> Result<Value> {
    let [string] = args.fixed("fromhex", ["string"])?;
    let text = string.as_str().ok_or_else(|| {
        EvalError::type_error(format!(
            "fromhex() argument must be str, not {}",
            string.type_name()
        ))
    })?;
    let chars: Vec<char> = text.chars().collect();
    let bad = |position: usize| {
        EvalError::value_error(format!(
            "non-hexadecimal number found in fromhex() arg at position {}",
            position
        ))
    };
    let mut out = Vec::with_capacity(chars.len() / 2);
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let high = chars[i].to_digit(16).ok_or_else(|| bad(i))?;
        let low = chars
            .get(i + 1)
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| bad(i + 1))?;
        out.push((high * 16 + low) as u8);
        i += 2;
    }
    Ok(Value::bytes(out))
}

/// `bytes.maketrans(from, to)`.
pub(super) fn bytes_maketrans(args: Args) -> Result<Value> {
    let [from, to] = args.fixed("maketrans", ["frm", "to"])?;
    let from = u8::units("maketrans", &from)?;
    let to = u8::units("maketrans", &to)?;
    if from.len() != to.len() {
        return Err(EvalError::value_error(
            "maketrans arguments must have same length",
        ));
    }
    let mut table: Vec<u8> = (0..=255).collect();
    for (a, b) in from.iter().zip(to.iter()) {
        table[*a as usize] = *b;
    }
    Ok(Value::bytes(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call_str(s: &str, name: &'static str, args: Vec<Value>) -> Result<Value> {
        let ctx = EvalContext::new();
        str_method(&ctx, &Rc::from(s), name, Args::positional(args))
    }

    fn call_bytes(b: &[u8], name: &'static str, args: Vec<Value>) -> Result<Value> {
        let ctx = EvalContext::new();
        bytes_method(&ctx, &Rc::from(b), name, Args::positional(args))
    }

    fn repr(result: Result<Value>) -> String {
        match result {
            Ok(v) => v.repr(),
            Err(e) => format!("{}: {}", e.category(), e),
        }
    }

    #[test]
    fn test_str_search() {
        assert_eq!(repr(call_str("héllo", "find", vec![Value::str("l")])), "2");
        assert_eq!(repr(call_str("hello", "rfind", vec![Value::str("z")])), "-1");
        assert_eq!(
            repr(call_str("hello", "index", vec![Value::str("z")])),
            "ValueError: substring not found"
        );
        assert_eq!(
            repr(call_str(
                "hello",
                "startswith",
                vec![Value::tuple(vec![Value::str("x"), Value::str("he")])]
            )),
            "True"
        );
        assert_eq!(
            repr(call_str("hello", "endswith", vec![Value::from(1i64)])),
            "TypeError: endswith first arg must be str or a tuple of str, not int"
        );
    }

    #[test]
    fn test_str_split_and_join() {
        assert_eq!(
            repr(call_str("a b  c", "split", vec![])),
            "['a', 'b', 'c']"
        );
        assert_eq!(
            repr(call_str("a,b", "split", vec![Value::str("")])),
            "ValueError: empty separator"
        );
        assert_eq!(
            repr(call_str(
                "-",
                "join",
                vec![Value::list(vec![Value::str("a"), Value::str("b")])]
            )),
            "'a-b'"
        );
        assert_eq!(
            repr(call_str("-", "join", vec![Value::list(vec![Value::from(1i64)])])),
            "TypeError: sequence item 0: expected str instance, int found"
        );
    }

    #[test]
    fn test_str_casing() {
        assert_eq!(repr(call_str("they're bill's", "title", vec![])), "\"They'Re Bill'S\"");
        assert_eq!(repr(call_str("hELLO", "capitalize", vec![])), "'Hello'");
        assert_eq!(repr(call_str("Straße", "casefold", vec![])), "'strasse'");
        assert_eq!(repr(call_str("Hello World", "istitle", vec![])), "True");
        assert_eq!(repr(call_str("123", "isdigit", vec![])), "True");
        assert_eq!(repr(call_str("", "isalpha", vec![])), "False");
    }

    #[test]
    fn test_str_translate_and_maketrans() {
        let table = str_maketrans(Args::positional(vec![
            Value::str("ab"),
            Value::str("xy"),
            Value::str("c"),
        ]))
        .unwrap();
        assert_eq!(repr(call_str("abcd", "translate", vec![table])), "'xyd'");
        let err = str_maketrans(Args::positional(vec![Value::str("ab"), Value::str("x")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the first two maketrans arguments must have equal length"
        );
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(repr(call_str("é", "encode", vec![])), "b'\\xc3\\xa9'");
        assert_eq!(
            repr(call_bytes(&[0xc3, 0xa9], "decode", vec![])),
            "'é'"
        );
        assert_eq!(
            repr(call_str("x", "encode", vec![Value::str("klingon")])),
            "ValueError: unknown encoding: klingon"
        );
    }

    #[test]
    fn test_bytes_methods() {
        assert_eq!(repr(call_bytes(b"\xde\xad\xbe", "hex", vec![])), "'deadbe'");
        assert_eq!(
            repr(call_bytes(b"\xde\xad\xbe\xef", "hex", vec![Value::str(":"), Value::from(2i64)])),
            "'dead:beef'"
        );
        assert_eq!(repr(call_bytes(b"abc", "upper", vec![])), "b'ABC'");
        assert_eq!(repr(call_bytes(b"abcb", "count", vec![Value::from(98i64)])), "2");
        assert_eq!(
            repr(call_bytes(b"abc", "find", vec![Value::str("b")])),
            "TypeError: a bytes-like object is required, not 'str'"
        );
        assert_eq!(
            repr(bytes_fromhex(Args::positional(vec![Value::str("de ad")]))),
            "b'\\xde\\xad'"
        );
        assert_eq!(
            repr(bytes_fromhex(Args::positional(vec![Value::str("zz")]))),
            "ValueError: non-hexadecimal number found in fromhex() arg at position 0"
        );
    }

    #[test]
    fn test_padding() {
        assert_eq!(repr(call_str("ab", "center", vec![Value::from(5i64), Value::str("*")])), "'**ab*'");
        assert_eq!(
            repr(call_str("ab", "ljust", vec![Value::from(5i64), Value::str("**")])),
            "TypeError: The fill character must be exactly one character long"
        );
        assert_eq!(repr(call_str("+7", "zfill", vec![Value::from(4i64)])), "'+007'");
    }
}
