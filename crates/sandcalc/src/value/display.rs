//! `str()` and `repr()` rendering
//!
//! Rendering is budgeted: the host only ever shows a prefix of a result, so
//! a renderer can stop once it has produced enough text. Self-referential
//! containers render as `[...]` / `{...}`.

use std::fmt;
use std::rc::Rc;

use super::datetime::{date_iso, date_repr, tz_name, tz_repr};
use super::{Complex, Value, ViewKind, MAX_NESTING};

/// Text produced by a budgeted render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The rendered prefix
    pub text: String,
    /// Whether rendering stopped before the value was complete
    pub truncated: bool,
}

struct Renderer {
    out: String,
    limit: usize,
    active: Vec<usize>,
}

impl Renderer {
    fn new(limit: usize) -> Self {
        Self {
            out: String::new(),
            limit,
            active: Vec::new(),
        }
    }

    fn full(&self) -> bool {
        self.out.len() >= self.limit
    }

    fn push(&mut self, s: &str) {
        if !self.full() {
            self.out.push_str(s);
        }
    }

    /// Enter a container; returns false if it is already being rendered.
    fn enter(&mut self, ptr: usize) -> bool {
        if self.active.contains(&ptr) || self.active.len() >= MAX_NESTING {
            return false;
        }
        self.active.push(ptr);
        true
    }

    fn leave(&mut self) {
        self.active.pop();
    }

    fn items<'a>(&mut self, open: &str, items: impl IntoIterator<Item = &'a Value>, close: &str) {
        self.push(open);
        for (i, item) in items.into_iter().enumerate() {
            if self.full() {
                break;
            }
            if i > 0 {
                self.push(", ");
            }
            self.repr(item);
        }
        self.push(close);
    }

    /// Render elements fetched one at a time, so a live container is
    /// never copied wholesale.
    fn indexed(&mut self, open: &str, close: &str, fetch: impl Fn(usize) -> Option<Value>) {
        self.push(open);
        let mut i = 0;
        while !self.full() {
            let Some(item) = fetch(i) else {
                break;
            };
            if i > 0 {
                self.push(", ");
            }
            self.repr(&item);
            i += 1;
        }
        self.push(close);
    }

    fn str(&mut self, value: &Value) {
        match value {
            Value::Str(s) => self.push(s),
            Value::Date(d) => self.push(&date_iso(*d)),
            Value::DateTime(dt) => self.push(&dt.iso(' ')),
            Value::Time(t) => self.push(&t.iso()),
            Value::TimeDelta(td) => self.push(&td.to_display()),
            Value::TimeZone(tz) => self.push(&tz_name(*tz)),
            Value::Decimal(d) => self.push(&d.to_string()),
            other => self.repr(other),
        }
    }

    fn repr(&mut self, value: &Value) {
        if self.full() {
            return;
        }
        match value {
            Value::None => self.push("None"),
            Value::Ellipsis => self.push("Ellipsis"),
            Value::Bool(true) => self.push("True"),
            Value::Bool(false) => self.push("False"),
            Value::Int(n) => self.push(&n.to_string()),
            Value::Float(f) => self.push(&float_repr(*f)),
            Value::Complex(c) => self.push(&complex_repr(*c)),
            Value::Decimal(d) => self.push(&format!("Decimal('{}')", d)),
            Value::Str(s) => self.push(&str_repr(s)),
            Value::Bytes(b) => self.push(&bytes_repr(b)),
            Value::List(items) => {
                let ptr = Rc::as_ptr(items) as *const u8 as usize;
                if !self.enter(ptr) {
                    self.push("[...]");
                    return;
                }
                self.indexed("[", "]", |i| items.borrow().get(i).cloned());
                self.leave();
            }
            Value::Tuple(items) => {
                let ptr = Rc::as_ptr(items) as *const u8 as usize;
                if !self.enter(ptr) {
                    self.push("(...)");
                    return;
                }
                if items.len() == 1 {
                    self.push("(");
                    self.repr(&items[0]);
                    self.push(",)");
                } else {
                    self.items("(", items.iter(), ")");
                }
                self.leave();
            }
            Value::Dict(map) => {
                let ptr = Rc::as_ptr(map) as *const u8 as usize;
                if !self.enter(ptr) {
                    self.push("{...}");
                    return;
                }
                self.push("{");
                let mut i = 0;
                while !self.full() {
                    let entry = map
                        .borrow()
                        .get_index(i)
                        .map(|(k, v)| (k.value().clone(), v.clone()));
                    let Some((k, v)) = entry else {
                        break;
                    };
                    if i > 0 {
                        self.push(", ");
                    }
                    self.repr(&k);
                    self.push(": ");
                    self.repr(&v);
                    i += 1;
                }
                self.push("}");
                self.leave();
            }
            Value::DictView(kind, map) => {
                let ptr = Rc::as_ptr(map) as *const u8 as usize;
                if !self.enter(ptr) {
                    self.push("...");
                    return;
                }
                let open = match kind {
                    ViewKind::Keys => "dict_keys([",
                    ViewKind::Values => "dict_values([",
                    ViewKind::Items => "dict_items([",
                };
                self.indexed(open, "])", |i| {
                    map.borrow().get_index(i).map(|(k, v)| match kind {
                        ViewKind::Keys => k.value().clone(),
                        ViewKind::Values => v.clone(),
                        ViewKind::Items => Value::tuple(vec![k.value().clone(), v.clone()]),
                    })
                });
                self.leave();
            }
            Value::Set(set) => {
                if set.borrow().is_empty() {
                    self.push("set()");
                } else {
                    self.indexed("{", "}", |i| set.borrow().get_index(i).map(|k| k.value().clone()));
                }
            }
            Value::FrozenSet(set) => {
                if set.is_empty() {
                    self.push("frozenset()");
                } else {
                    self.push("frozenset(");
                    self.items("{", set.iter().map(|k| k.value()), "}");
                    self.push(")");
                }
            }
            Value::Range(r) => {
                if r.step == 1 {
                    self.push(&format!("range({}, {})", r.start, r.stop));
                } else {
                    self.push(&format!("range({}, {}, {})", r.start, r.stop, r.step));
                }
            }
            Value::Slice(s) => {
                self.push("slice(");
                self.repr(&s.start);
                self.push(", ");
                self.repr(&s.stop);
                self.push(", ");
                self.repr(&s.step);
                self.push(")");
            }
            Value::Iterator(iter) => {
                let kind = value.type_name();
                let ptr = Rc::as_ptr(iter) as *const u8 as usize;
                self.push(&format!("<{} object at {:#x}>", kind, ptr));
            }
            Value::Date(d) => self.push(&date_repr(*d)),
            Value::DateTime(dt) => self.push(&dt.to_repr()),
            Value::Time(t) => self.push(&t.to_repr()),
            Value::TimeDelta(td) => self.push(&td.to_repr()),
            Value::TimeZone(tz) => self.push(&tz_repr(*tz)),
            Value::Builtin(b) => self.push(&format!("<built-in function {}>", b.name)),
            Value::Type(t) => self.push(&t.to_string()),
            Value::Module(m) => self.push(&format!("<module '{}' (built-in)>", m.name())),
            Value::Method(m) => {
                let owner = match &m.receiver {
                    Value::Type(_) => "type",
                    receiver => receiver.type_name(),
                };
                self.push(&format!(
                    "<built-in method {} of {} object at {:#x}>",
                    m.name,
                    owner,
                    Rc::as_ptr(m) as *const u8 as usize
                ));
            }
            Value::ItemGetter(items) => {
                self.push("operator.itemgetter(");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.repr(item);
                }
                self.push(")");
            }
        }
    }
}

impl Value {
    /// `repr(value)`.
    pub fn repr(&self) -> String {
        let mut r = Renderer::new(usize::MAX);
        r.repr(self);
        r.out
    }

    /// `str(value)` rendered up to `limit` bytes.
    pub fn render(&self, limit: usize) -> Rendered {
        let mut r = Renderer::new(limit.saturating_add(1));
        r.str(self);
        let mut text = r.out;
        let truncated = text.len() > limit;
        if truncated {
            let mut end = limit;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
        Rendered { text, truncated }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut r = Renderer::new(usize::MAX);
        r.str(self);
        f.write_str(&r.out)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Scalar renderings
// ═══════════════════════════════════════════════════════════════════════

/// Shortest round-tripping float text, laid out the native way:
/// scientific notation below 1e-4 and from 1e16 up.
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let (negative, digits, exp) = shortest_digits(x);
    let body = layout_digits(&digits, exp, true);
    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

/// Shortest significant digits and decimal exponent of a finite float.
pub(crate) fn shortest_digits(x: f64) -> (bool, String, i32) {
    let sci = format!("{:e}", x.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    (x.is_sign_negative(), digits, exp.parse().unwrap_or(0))
}

/// Lay out `d.ddd × 10^exp` the way `repr(float)` does.
fn layout_digits(digits: &str, exp: i32, force_point: bool) -> String {
    let n = digits.len() as i32;
    if !(-4..16).contains(&exp) {
        let mut out = digits[..1].to_string();
        if n > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push_str(&format!("e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs()));
        return out;
    }
    if exp < 0 {
        return format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits);
    }
    let int_len = (exp + 1) as usize;
    if digits.len() <= int_len {
        let mut out = format!("{}{}", digits, "0".repeat(int_len - digits.len()));
        if force_point {
            out.push_str(".0");
        }
        out
    } else {
        format!("{}.{}", &digits[..int_len], &digits[int_len..])
    }
}

fn complex_part(x: f64) -> String {
    let text = float_repr(x);
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

/// `repr(complex)`.
pub fn complex_repr(c: Complex) -> String {
    if c.re == 0.0 && c.re.is_sign_positive() {
        return format!("{}j", complex_part(c.im));
    }
    let im = complex_part(c.im);
    let sign = if im.starts_with('-') { "" } else { "+" };
    format!("({}{}{}j)", complex_part(c.re), sign, im)
}

pub(crate) fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{00ad}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2060}'..='\u{2064}'
            | '\u{feff}'
    )
}

/// `repr(str)` with native quote selection and escaping.
pub fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x100 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push(quote);
    out
}

/// `repr(bytes)`.
pub fn bytes_repr(data: &[u8]) -> String {
    let quote = if data.contains(&b'\'') && !data.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::with_capacity(data.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &b in data {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            b => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push(quote as char);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(-2.5), "-2.5");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1e15), "1000000000000000.0");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(0.00001), "1e-05");
        assert_eq!(float_repr(1.5e-7), "1.5e-07");
        assert_eq!(float_repr(f64::INFINITY), "inf");
        assert_eq!(float_repr(-0.0), "-0.0");
    }

    #[test]
    fn test_complex_repr() {
        assert_eq!(complex_repr(Complex::new(0.0, 1.0)), "1j");
        assert_eq!(complex_repr(Complex::new(1.0, -2.5)), "(1-2.5j)");
        assert_eq!(complex_repr(Complex::new(-0.0, 1.0)), "(-0+1j)");
    }

    #[test]
    fn test_str_repr_quoting() {
        assert_eq!(str_repr("abc"), "'abc'");
        assert_eq!(str_repr("it's"), "\"it's\"");
        assert_eq!(str_repr("a'b\"c"), "'a\\'b\"c'");
        assert_eq!(str_repr("한글\n"), "'한글\\n'");
        assert_eq!(str_repr("\u{3000}"), "'\\u3000'");
    }

    #[test]
    fn test_bytes_repr() {
        assert_eq!(bytes_repr(b"ab\x00"), "b'ab\\x00'");
    }

    #[test]
    fn test_container_repr() {
        let list = Value::list(vec![Value::from(1i64), Value::str("a"), Value::None]);
        assert_eq!(list.repr(), "[1, 'a', None]");
        assert_eq!(Value::tuple(vec![Value::from(1i64)]).repr(), "(1,)");
        assert_eq!(list.to_string(), "[1, 'a', None]");
        assert_eq!(Value::str("x").to_string(), "x");
    }

    #[test]
    fn test_self_referential_list() {
        let list = Value::list(vec![]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.repr(), "[[...]]");
        if let Value::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_budgeted_render() {
        let list = Value::list((0..1000i64).map(Value::from).collect());
        let rendered = list.render(10);
        assert_eq!(rendered.text, "[0, 1, 2, ");
        assert!(rendered.truncated);
        let short = Value::str("abc").render(10);
        assert_eq!(short.text, "abc");
        assert!(!short.truncated);
    }
}
