//! String formatting: the format-spec mini-language, `str.format` and
//! `%`-interpolation
//!
//! All three front ends funnel into [`format_value`], so `f"{x:>8.2f}"`,
//! `"{:>8.2f}".format(x)` and `"%8.2f" % x` agree. Replacement fields may
//! only name positional or keyword arguments: `{0.attr}` and `{0[key]}`
//! would reach attributes without passing the capability check, so they
//! are rejected outright.

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::value::display::complex_repr;
use crate::value::{check_len, float_repr, get_item, int_to_f64, Complex, Decimal, Value};

// ═══════════════════════════════════════════════════════════════════════
// Format spec
// ═══════════════════════════════════════════════════════════════════════

/// Parsed `[[fill]align][sign][#][0][width][grouping][.precision][type]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    /// Padding character
    pub fill: Option<char>,
    /// One of `<`, `>`, `^`, `=`
    pub align: Option<char>,
    /// One of `+`, `-`, ` `
    pub sign: char,
    /// `#` flag
    pub alternate: bool,
    /// `0` flag
    pub zero: bool,
    /// Minimum width in characters
    pub width: usize,
    /// Thousands separator, `,` or `_`
    pub grouping: Option<char>,
    /// Digits after the point (or significant digits for `g`)
    pub precision: Option<usize>,
    /// Presentation type
    pub kind: Option<char>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            fill: None,
            align: None,
            sign: '-',
            alternate: false,
            zero: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

fn is_align(c: char) -> bool {
    matches!(c, '<' | '>' | '^' | '=')
}

fn invalid_spec() -> EvalError {
    EvalError::value_error("Invalid format specifier")
}

impl FormatSpec {
    /// Parse a format spec.
    ///
    /// # Errors
    ///
    /// `ValueError` on malformed specs.
    pub fn parse(text: &str) -> Result<Self> {
        let chars: Vec<char> = text.chars().collect();
        let mut spec = FormatSpec::default();
        let mut i = 0;

        if chars.len() >= 2 && is_align(chars[1]) {
            spec.fill = Some(chars[0]);
            spec.align = Some(chars[1]);
            i = 2;
        } else if chars.first().copied().is_some_and(is_align) {
            spec.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
            spec.sign = c;
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            spec.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            spec.zero = true;
            i += 1;
        }
        let start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        if i > start {
            let digits: String = chars[start..i].iter().collect();
            spec.width = digits.parse().map_err(|_| EvalError::value_error("Too many decimal digits in format string"))?;
            check_len(spec.width)?;
        }
        if let Some(&c @ (',' | '_')) = chars.get(i) {
            spec.grouping = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
            if i == start {
                return Err(EvalError::value_error("Format specifier missing precision"));
            }
            let digits: String = chars[start..i].iter().collect();
            let precision: usize = digits
                .parse()
                .map_err(|_| EvalError::value_error("Too many decimal digits in format string"))?;
            check_len(precision)?;
            spec.precision = Some(precision);
        }
        match chars.len() - i {
            0 => {}
            1 => spec.kind = Some(chars[i]),
            _ => return Err(invalid_spec()),
        }
        Ok(spec)
    }

    fn fill_char(&self) -> char {
        match self.fill {
            Some(c) => c,
            None if self.zero => '0',
            None => ' ',
        }
    }

    fn sign_for(&self, negative: bool) -> &'static str {
        match (negative, self.sign) {
            (true, _) => "-",
            (false, '+') => "+",
            (false, ' ') => " ",
            _ => "",
        }
    }

    fn unknown_code(&self, value: &Value) -> EvalError {
        EvalError::value_error(format!(
            "Unknown format code '{}' for object of type '{}'",
            self.kind.unwrap_or(' '),
            value.type_name()
        ))
    }
}

/// Pad `text` to the spec's width.
fn pad(text: String, spec: &FormatSpec, default_align: char) -> String {
    let len = text.chars().count();
    if len >= spec.width {
        return text;
    }
    let fill = spec.fill_char();
    let gap = spec.width - len;
    let fill_str = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
    match spec.align.unwrap_or(default_align) {
        '<' => text + &fill_str(gap),
        '^' => {
            let left = gap / 2;
            fill_str(left) + &text + &fill_str(gap - left)
        }
        _ => fill_str(gap) + &text,
    }
}

/// Insert a separator every `every` digits, counting from the right.
fn group_digits(digits: &str, sep: char, every: usize) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / every);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % every == 0 {
            out.push(sep);
        }
        out.push(*b as char);
    }
    out
}

/// A number split into the pieces alignment and grouping work on.
struct Numeral {
    negative: bool,
    prefix: String,
    int_digits: String,
    rest: String,
    suffix: &'static str,
}

fn assemble(spec: &FormatSpec, num: Numeral, every: usize) -> String {
    let sign = spec.sign_for(num.negative);
    let numeric_align = spec.align.or(if spec.zero && spec.fill.is_none() {
        Some('=')
    } else {
        None
    });
    let mut digits = num.int_digits;
    let head_len = sign.len() + num.prefix.len();
    let tail_len = num.rest.chars().count() + num.suffix.len();

    if numeric_align == Some('=') && spec.fill_char() == '0' {
        if spec.grouping.is_some() {
            let needed = spec.width.saturating_sub(head_len + tail_len);
            let mut count = digits.len().max(needed * every / (every + 1));
            while count + count.saturating_sub(1) / every < needed {
                count += 1;
            }
            if count > digits.len() {
                digits = "0".repeat(count - digits.len()) + &digits;
            }
        }
    }
    let grouped = match spec.grouping {
        Some(sep) => group_digits(&digits, sep, every),
        None => digits,
    };
    let body = format!("{}{}{}", grouped, num.rest, num.suffix);

    if numeric_align == Some('=') {
        let len = head_len + body.chars().count();
        let fill: String = std::iter::repeat(spec.fill_char())
            .take(spec.width.saturating_sub(len))
            .collect();
        return format!("{}{}{}{}", sign, num.prefix, fill, body);
    }
    let spec = FormatSpec {
        align: numeric_align,
        ..spec.clone()
    };
    pad(format!("{}{}{}", sign, num.prefix, body), &spec, '>')
}

// ═══════════════════════════════════════════════════════════════════════
// format(value, spec)
// ═══════════════════════════════════════════════════════════════════════

/// `format(value, spec)`.
///
/// # Errors
///
/// `ValueError` for malformed or mismatched specs, `TypeError` for
/// values without a formatter.
pub fn format_value(value: &Value, spec_text: &str) -> Result<String> {
    match value {
        Value::Date(_) | Value::DateTime(_) | Value::Time(_) if !spec_text.is_empty() => {
            return crate::builtins::strftime(value, spec_text);
        }
        Value::Bool(_) if spec_text.is_empty() => return Ok(value.to_string()),
        _ => {}
    }
    let spec = FormatSpec::parse(spec_text)?;
    match value {
        Value::Str(s) => format_str(s, &spec),
        Value::Bool(_) | Value::Int(_) => {
            let n = value.as_bigint().unwrap_or_default();
            format_int(value, &n, &spec)
        }
        Value::Float(x) => format_float(value, *x, &spec),
        Value::Decimal(d) => format_decimal(value, d, &spec),
        Value::Complex(c) => format_complex(value, c.re, c.im, &spec),
        _ if spec_text.is_empty() => Ok(value.to_string()),
        _ => Err(EvalError::type_error(format!(
            "unsupported format string passed to {}.__format__",
            value.type_name()
        ))),
    }
}

fn format_str(s: &str, spec: &FormatSpec) -> Result<String> {
    if !matches!(spec.kind, None | Some('s')) {
        return Err(spec.unknown_code(&Value::str(s)));
    }
    if spec.sign != '-' {
        return Err(EvalError::value_error("Sign not allowed in string format specifier"));
    }
    if spec.align == Some('=') {
        return Err(EvalError::value_error(
            "'=' alignment not allowed in string format specifier",
        ));
    }
    let text: String = match spec.precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    };
    Ok(pad(text, spec, '<'))
}

fn format_int(value: &Value, n: &BigInt, spec: &FormatSpec) -> Result<String> {
    let kind = spec.kind.unwrap_or('d');
    if matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') {
        return format_float(value, int_to_f64(n)?, spec);
    }
    if spec.precision.is_some() {
        return Err(EvalError::value_error("Precision not allowed in integer format specifier"));
    }
    let magnitude = n.abs();
    let (digits, prefix, every) = match kind {
        'd' | 'n' => (magnitude.to_string(), "", 3),
        'b' => (magnitude.to_str_radix(2), "0b", 4),
        'o' => (magnitude.to_str_radix(8), "0o", 4),
        'x' => (magnitude.to_str_radix(16), "0x", 4),
        'X' => (magnitude.to_str_radix(16).to_uppercase(), "0X", 4),
        'c' => {
            let code = n
                .to_u32()
                .and_then(char::from_u32)
                .ok_or_else(|| EvalError::overflow("%c arg not in range(0x110000)"))?;
            return Ok(pad(code.to_string(), spec, '<'));
        }
        _ => return Err(spec.unknown_code(value)),
    };
    if spec.grouping == Some(',') && every == 4 {
        return Err(EvalError::value_error(format!("Cannot specify ',' with '{}'.", kind)));
    }
    let num = Numeral {
        negative: n.is_negative(),
        prefix: if spec.alternate { prefix.to_string() } else { String::new() },
        int_digits: digits,
        rest: String::new(),
        suffix: "",
    };
    Ok(assemble(spec, num, every))
}

// ── floats ──────────────────────────────────────────────────────────────

fn sci_parts(x: f64, precision: usize) -> (String, i32) {
    let text = format!("{:.*e}", precision, x);
    match text.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn exp_suffix(exp: i64, upper: bool, min_digits: usize) -> String {
    format!(
        "{}{}{:0width$}",
        if upper { 'E' } else { 'e' },
        if exp < 0 { '-' } else { '+' },
        exp.abs(),
        width = min_digits
    )
}

fn strip_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Body of a finite, non-negative float for one presentation type.
fn float_body(x: f64, kind: Option<char>, precision: Option<usize>, alternate: bool) -> String {
    match kind {
        Some('f' | 'F' | '%') => {
            let text = format!("{:.*}", precision.unwrap_or(6), x);
            if alternate && !text.contains('.') {
                text + "."
            } else {
                text
            }
        }
        Some(k @ ('e' | 'E')) => {
            let (mantissa, exp) = sci_parts(x, precision.unwrap_or(6));
            let mantissa = if alternate && !mantissa.contains('.') {
                mantissa + "."
            } else {
                mantissa
            };
            mantissa + &exp_suffix(exp as i64, k == 'E', 2)
        }
        Some(k @ ('g' | 'G' | 'n' | 'r')) => {
            // 'r' marks the no-type form with an explicit precision
            let repr_style = k == 'r';
            let p = precision.unwrap_or(6).max(1);
            let (_, exp) = sci_parts(x, p - 1);
            let fixed_limit = if repr_style { p as i32 - 1 } else { p as i32 };
            if x == 0.0 || (-4..fixed_limit).contains(&exp) {
                let decimals = (p as i32 - 1 - if x == 0.0 { 0 } else { exp }).max(0) as usize;
                let text = format!("{:.*}", decimals, x);
                let mut text = if alternate { text } else { strip_zeros(&text) };
                if repr_style && !text.contains('.') {
                    text.push_str(".0");
                }
                text
            } else {
                let (mantissa, exp) = sci_parts(x, p - 1);
                let mantissa = if alternate { mantissa } else { strip_zeros(&mantissa) };
                mantissa + &exp_suffix(exp as i64, k == 'G', 2)
            }
        }
        _ => float_repr(x),
    }
}

fn format_float(value: &Value, x: f64, spec: &FormatSpec) -> Result<String> {
    let kind = match spec.kind {
        None if spec.precision.is_some() => Some('r'),
        None => None,
        Some(k @ ('e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'n' | '%')) => Some(k),
        Some(_) => return Err(spec.unknown_code(value)),
    };
    let upper = matches!(kind, Some('E' | 'F' | 'G'));
    let negative = x.is_sign_negative() && !x.is_nan();
    let magnitude = x.abs();
    let (body, suffix) = if !x.is_finite() {
        let text = if x.is_nan() { "nan" } else { "inf" };
        let text = if upper { text.to_uppercase() } else { text.to_string() };
        (text, if kind == Some('%') { "%" } else { "" })
    } else if kind == Some('%') {
        (float_body(magnitude * 100.0, kind, spec.precision, spec.alternate), "%")
    } else {
        (float_body(magnitude, kind, spec.precision, spec.alternate), "")
    };
    Ok(assemble(spec, split_numeral(negative, body, suffix), 3))
}

fn split_numeral(negative: bool, body: String, suffix: &'static str) -> Numeral {
    let split = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (int_digits, rest) = body.split_at(split);
    Numeral {
        negative,
        prefix: String::new(),
        int_digits: int_digits.to_string(),
        rest: rest.to_string(),
        suffix,
    }
}

// ── decimals ────────────────────────────────────────────────────────────

/// Plain notation of a finite decimal with its own exponent.
fn decimal_fixed(digits: &str, exp: i64) -> String {
    if exp >= 0 {
        let zeros = if digits == "0" { 0 } else { exp as usize };
        return format!("{}{}", digits, "0".repeat(zeros));
    }
    let frac = (-exp) as usize;
    if digits.len() > frac {
        let (int, dec) = digits.split_at(digits.len() - frac);
        format!("{}.{}", int, dec)
    } else {
        format!("0.{}{}", "0".repeat(frac - digits.len()), digits)
    }
}

fn decimal_sci(digits: &str, exp: i64, upper: bool, alternate: bool) -> String {
    let adjusted = exp + digits.len() as i64 - 1;
    let (head, tail) = digits.split_at(1);
    let mut out = head.to_string();
    if !tail.is_empty() || alternate {
        out.push('.');
        out.push_str(tail);
    }
    out + &exp_suffix(adjusted, upper, 1)
}

fn decimal_body(d: &Decimal, kind: Option<char>, precision: Option<usize>, alternate: bool) -> Result<String> {
    let upper = matches!(kind, Some('E' | 'F' | 'G'));
    let finite = |d: &Decimal| d.parts().map(|(_, digits, exp)| (digits, exp));
    let Some((digits, exp)) = finite(d) else {
        let text = if d.is_nan() { "NaN" } else { "Infinity" };
        return Ok(text.to_string());
    };
    match kind {
        Some('f' | 'F' | '%') => {
            let source = if kind == Some('%') {
                Decimal::finite(false, digits.parse().unwrap_or_default(), exp + 2)
            } else {
                Decimal::finite(false, digits.parse().unwrap_or_default(), exp)
            };
            let rounded = match precision {
                Some(p) => source.rescale(-(p as i64))?,
                None => source,
            };
            let (digits, exp) = finite(&rounded).unwrap_or(("0".to_string(), 0));
            let text = decimal_fixed(&digits, exp);
            Ok(if alternate && !text.contains('.') { text + "." } else { text })
        }
        Some('e' | 'E') => {
            let (digits, exp) = match precision {
                Some(p) => {
                    let rounded = Decimal::finite(false, digits.parse().unwrap_or_default(), exp)
                        .round_significant(p + 1);
                    let (mut digits, mut exp) = finite(&rounded).unwrap_or(("0".to_string(), 0));
                    while digits.len() < p + 1 {
                        digits.push('0');
                        exp -= 1;
                    }
                    (digits, exp)
                }
                None => (digits, exp),
            };
            Ok(decimal_sci(&digits, exp, upper, alternate))
        }
        _ => {
            // 'g', 'G', 'n' and the no-type form share the to-sci-string layout
            let (digits, exp) = match precision {
                Some(p) => {
                    let rounded = Decimal::finite(false, digits.parse().unwrap_or_default(), exp)
                        .round_significant(p.max(1));
                    finite(&rounded).unwrap_or(("0".to_string(), 0))
                }
                None => (digits, exp),
            };
            let left_digits = exp + digits.len() as i64;
            if exp <= 0 && left_digits > -6 {
                Ok(decimal_fixed(&digits, exp))
            } else {
                Ok(decimal_sci(&digits, exp, upper, alternate))
            }
        }
    }
}

fn format_decimal(value: &Value, d: &Decimal, spec: &FormatSpec) -> Result<String> {
    if !matches!(spec.kind, None | Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'n' | '%')) {
        return Err(spec.unknown_code(value));
    }
    let body = decimal_body(d, spec.kind, spec.precision, spec.alternate)?;
    let suffix = if spec.kind == Some('%') { "%" } else { "" };
    let negative = d.is_negative() && !d.is_nan();
    Ok(assemble(spec, split_numeral(negative, body, suffix), 3))
}

// ── complex ─────────────────────────────────────────────────────────────

fn format_complex(value: &Value, re: f64, im: f64, spec: &FormatSpec) -> Result<String> {
    if spec.zero || spec.align == Some('=') {
        return Err(EvalError::value_error(
            "Zero padding is not allowed in complex format specifier",
        ));
    }
    let kind = match spec.kind {
        None if spec.precision.is_none() => {
            return Ok(pad(complex_repr(Complex::new(re, im)), spec, '>'));
        }
        None => Some('g'),
        Some(k @ ('e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'n')) => Some(k),
        Some(_) => return Err(spec.unknown_code(value)),
    };
    let part = |x: f64| -> String {
        if x.is_finite() {
            float_body(x.abs(), kind, spec.precision, spec.alternate)
        } else if x.is_nan() {
            "nan".to_string()
        } else {
            "inf".to_string()
        }
    };
    let re_sign = spec.sign_for(re.is_sign_negative());
    let im_sign = if im.is_sign_negative() { "-" } else { "+" };
    let text = format!("{}{}{}{}j", re_sign, part(re), im_sign, part(im));
    Ok(pad(text, spec, '>'))
}

// ═══════════════════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════════════════

/// `ascii(value)`: `repr` with every non-ASCII character escaped.
pub fn ascii_repr(value: &Value) -> String {
    let mut out = String::new();
    for c in value.repr().chars() {
        match c as u32 {
            0..=0x7f => out.push(c),
            code @ 0x80..=0xff => out.push_str(&format!("\\x{:02x}", code)),
            code @ 0x100..=0xffff => out.push_str(&format!("\\u{:04x}", code)),
            code => out.push_str(&format!("\\U{:08x}", code)),
        }
    }
    out
}

/// Apply an `!r` / `!s` / `!a` conversion.
pub fn convert(value: &Value, conversion: Option<char>) -> Result<Value> {
    match conversion {
        None => Ok(value.clone()),
        Some('s') => Ok(Value::from(value.to_string())),
        Some('r') => Ok(Value::from(value.repr())),
        Some('a') => Ok(Value::from(ascii_repr(value))),
        Some(c) => Err(EvalError::value_error(format!(
            "Unknown conversion specifier {}",
            c
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// str.format / str.format_map
// ═══════════════════════════════════════════════════════════════════════

enum FieldRef<'a> {
    Auto,
    Index(usize),
    Name(&'a str),
}

struct Field<'a> {
    name: &'a str,
    conversion: Option<char>,
    spec: &'a str,
}

fn parse_field(inner: &str) -> Result<Field<'_>> {
    let (head, spec) = match inner.find(':') {
        Some(pos) => (&inner[..pos], &inner[pos + 1..]),
        None => (inner, ""),
    };
    let (name, conversion) = match head.find('!') {
        Some(pos) => {
            let conv = &head[pos + 1..];
            let mut chars = conv.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => (&head[..pos], Some(c)),
                _ => {
                    return Err(EvalError::value_error(
                        "expected ':' after conversion specifier",
                    ))
                }
            }
        }
        None => (head, None),
    };
    if name.contains('.') || name.contains('[') {
        return Err(EvalError::security(
            "You can not access attributes or items in a replacement field",
        ));
    }
    Ok(Field {
        name,
        conversion,
        spec,
    })
}

fn field_ref(name: &str) -> FieldRef<'_> {
    if name.is_empty() {
        FieldRef::Auto
    } else if let Ok(i) = name.parse::<usize>() {
        FieldRef::Index(i)
    } else {
        FieldRef::Name(name)
    }
}

type Lookup<'a> = dyn Fn(&FieldRef<'_>, usize) -> Result<Value> + 'a;

/// Expand a template, resolving each field through `lookup`.
fn expand(ctx: &EvalContext, template: &str, lookup: &Lookup<'_>, depth: usize) -> Result<String> {
    if depth > 1 {
        return Err(EvalError::value_error("Max string recursion exceeded"));
    }
    let mut auto_index = 0usize;
    let mut numbering: Option<bool> = None;
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        ctx.check_interrupt()?;
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            return Err(EvalError::value_error("Single '}' encountered in format string"));
        }

        // Find the matching close brace, allowing one level of nesting in the spec
        let mut depth = 0usize;
        let mut end = None;
        for (i, c) in tail.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| EvalError::value_error("Single '{' encountered in format string"))?;
        let field = parse_field(&tail[1..end])?;

        let reference = field_ref(field.name);
        let manual = !matches!(reference, FieldRef::Auto);
        match numbering {
            Some(prev) if prev != manual && !matches!(reference, FieldRef::Name(_)) => {
                return Err(EvalError::value_error(if manual {
                    "cannot switch from automatic field numbering to manual field specification"
                } else {
                    "cannot switch from manual field specification to automatic field numbering"
                }));
            }
            None if !matches!(reference, FieldRef::Name(_)) => numbering = Some(manual),
            _ => {}
        }
        let value = lookup(&reference, auto_index)?;
        if matches!(reference, FieldRef::Auto) {
            auto_index += 1;
        }

        let spec = if field.spec.contains('{') {
            let base = auto_index;
            let nested = |r: &FieldRef<'_>, auto: usize| lookup(r, base + auto);
            let expanded = expand(ctx, field.spec, &nested, depth + 1)?;
            auto_index += field.spec.matches("{}").count();
            expanded
        } else {
            field.spec.to_string()
        };

        let converted = convert(&value, field.conversion)?;
        let text = format_value(&converted, &spec)?;
        check_len(out.len() + text.len())?;
        out.push_str(&text);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// `template.format(*args, **kwargs)`.
pub fn format_args(
    ctx: &EvalContext,
    template: &str,
    args: &[Value],
    kwargs: &IndexMap<String, Value>,
) -> Result<String> {
    let lookup = |r: &FieldRef<'_>, auto: usize| -> Result<Value> {
        let index = match r {
            FieldRef::Name(name) => {
                return kwargs.get(*name).cloned().ok_or_else(|| EvalError::Key {
                    key: Value::str(name).repr(),
                })
            }
            FieldRef::Index(i) => *i,
            FieldRef::Auto => auto,
        };
        args.get(index).cloned().ok_or_else(|| {
            EvalError::index_error(format!(
                "Replacement index {} out of range for positional args tuple",
                index
            ))
        })
    };
    expand(ctx, template, &lookup, 0)
}

/// `template.format_map(mapping)`.
pub fn format_map(ctx: &EvalContext, template: &str, mapping: &Value) -> Result<String> {
    let lookup = |r: &FieldRef<'_>, _: usize| -> Result<Value> {
        match r {
            FieldRef::Name(name) => get_item(mapping, &Value::str(name)),
            _ => Err(EvalError::value_error("Format string contains positional fields")),
        }
    };
    expand(ctx, template, &lookup, 0)
}

// ═══════════════════════════════════════════════════════════════════════
// printf-style `%`
// ═══════════════════════════════════════════════════════════════════════

fn printf_int(value: &Value, conv: char) -> Result<BigInt> {
    match value {
        Value::Bool(_) | Value::Int(_) => Ok(value.as_bigint().unwrap_or_default()),
        Value::Float(f) if matches!(conv, 'd' | 'i' | 'u') => {
            if !f.is_finite() {
                return Err(EvalError::overflow("cannot convert float infinity to integer"));
            }
            Ok(BigInt::from(f.trunc() as i128))
        }
        Value::Decimal(d) if matches!(conv, 'd' | 'i' | 'u') => d.to_bigint(),
        other if matches!(conv, 'd' | 'i' | 'u') => Err(EvalError::type_error(format!(
            "%{} format: a real number is required, not {}",
            conv,
            other.type_name()
        ))),
        other => Err(EvalError::type_error(format!(
            "%{} format: an integer is required, not {}",
            conv,
            other.type_name()
        ))),
    }
}

fn printf_one(value: &Value, conv: char, spec: FormatSpec) -> Result<String> {
    match conv {
        's' | 'r' | 'a' => {
            let text = match conv {
                's' => value.to_string(),
                'r' => value.repr(),
                _ => ascii_repr(value),
            };
            let spec = FormatSpec {
                kind: None,
                sign: '-',
                zero: false,
                ..spec
            };
            format_str(&text, &spec)
        }
        'd' | 'i' | 'u' | 'x' | 'X' | 'o' => {
            let n = printf_int(value, conv)?;
            let kind = match conv {
                'x' | 'X' | 'o' => conv,
                _ => 'd',
            };
            let spec = FormatSpec {
                kind: Some(kind),
                precision: None,
                ..spec
            };
            format_int(&Value::Int(n.clone()), &n, &spec)
        }
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' => {
            let x = match value {
                Value::Decimal(d) => d.to_f64(),
                other => other.to_f64().map_err(|_| {
                    EvalError::type_error(format!(
                        "must be real number, not {}",
                        other.type_name()
                    ))
                })?,
            };
            let spec = FormatSpec {
                kind: Some(conv),
                precision: Some(spec.precision.unwrap_or(6)),
                ..spec
            };
            format_float(&Value::Float(x), x, &spec)
        }
        'c' => {
            let c = match value {
                Value::Str(s) if s.chars().count() == 1 => s.to_string(),
                Value::Str(_) => {
                    return Err(EvalError::type_error("%c requires int or char"));
                }
                other => {
                    let n = other.to_index().map_err(|_| EvalError::type_error("%c requires int or char"))?;
                    n.to_u32()
                        .and_then(char::from_u32)
                        .ok_or_else(|| EvalError::overflow("%c arg not in range(0x110000)"))?
                        .to_string()
                }
            };
            format_str(&c, &FormatSpec { zero: false, sign: '-', precision: None, kind: None, ..spec })
        }
        other => Err(EvalError::value_error(format!(
            "unsupported format character '{}' ({:#x})",
            other, other as u32
        ))),
    }
}

/// `template % values`.
///
/// # Errors
///
/// `TypeError` when the argument count does not match the conversions,
/// `ValueError` for malformed conversions.
pub fn printf(ctx: &EvalContext, template: &str, values: &Value) -> Result<String> {
    let (args, mapping): (Vec<Value>, Option<&Value>) = match values {
        Value::Tuple(items) => (items.to_vec(), None),
        Value::Dict(_) => (vec![values.clone()], Some(values)),
        other => (vec![other.clone()], None),
    };
    let mut next_arg = 0usize;
    let mut take = || -> Result<Value> {
        let arg = args
            .get(next_arg)
            .cloned()
            .ok_or_else(|| EvalError::type_error("not enough arguments for format string"))?;
        next_arg += 1;
        Ok(arg)
    };

    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut used_mapping = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '%' {
            out.push(c);
            i += 1;
            continue;
        }
        ctx.check_interrupt()?;
        i += 1;
        let incomplete = || EvalError::value_error("incomplete format");

        // %(key)
        let mut keyed: Option<Value> = None;
        if chars.get(i) == Some(&'(') {
            let map = mapping.ok_or_else(|| EvalError::type_error("format requires a mapping"))?;
            let mut depth = 1;
            let start = i + 1;
            i += 1;
            while i < chars.len() && depth > 0 {
                match chars[i] {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                i += 1;
            }
            if depth > 0 {
                return Err(EvalError::value_error("incomplete format key"));
            }
            let key: String = chars[start..i - 1].iter().collect();
            keyed = Some(get_item(map, &Value::from(key))?);
            used_mapping = true;
        }

        let mut spec = FormatSpec::default();
        while let Some(&flag) = chars.get(i) {
            match flag {
                '-' => spec.align = Some('<'),
                '+' => spec.sign = '+',
                ' ' if spec.sign != '+' => spec.sign = ' ',
                ' ' => {}
                '#' => spec.alternate = true,
                '0' => spec.zero = true,
                _ => break,
            }
            i += 1;
        }
        if spec.align == Some('<') {
            spec.zero = false;
        }
        if chars.get(i) == Some(&'*') {
            let width = take()?.to_i64()?;
            if width < 0 {
                spec.align = Some('<');
            }
            spec.width = width.unsigned_abs() as usize;
            check_len(spec.width)?;
            i += 1;
        } else {
            let mut width = 0usize;
            while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                width = width.saturating_mul(10).saturating_add(d as usize);
                i += 1;
            }
            check_len(width)?;
            spec.width = width;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            if chars.get(i) == Some(&'*') {
                spec.precision = Some(take()?.to_count()?);
                i += 1;
            } else {
                let mut precision = 0usize;
                while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                    precision = precision.saturating_mul(10).saturating_add(d as usize);
                    i += 1;
                }
                check_len(precision)?;
                spec.precision = Some(precision);
            }
        }
        while matches!(chars.get(i), Some('h' | 'l' | 'L')) {
            i += 1;
        }
        let conv = *chars.get(i).ok_or_else(incomplete)?;
        i += 1;
        if conv == '%' {
            out.push('%');
            continue;
        }
        if !matches!(
            conv,
            's' | 'r' | 'a' | 'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'c'
        ) {
            return Err(EvalError::value_error(format!(
                "unsupported format character '{}' ({:#x}) at index {}",
                conv,
                conv as u32,
                i - 1
            )));
        }
        let value = match keyed {
            Some(v) => v,
            None => take()?,
        };
        let text = printf_one(&value, conv, spec)?;
        check_len(out.len() + text.len())?;
        out.push_str(&text);
    }
    if next_arg < args.len() && !used_mapping && mapping.is_none() {
        return Err(EvalError::type_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(out)
}
