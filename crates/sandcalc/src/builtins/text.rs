//! Sequence algorithms shared by `str` and `bytes` methods, plus codecs
//!
//! Text is handled as `&[char]` and bytes as `&[u8]`; every algorithm here
//! is generic over [`Unit`] so the two method tables stay in step.

use num_traits::{Signed, ToPrimitive};

use crate::error::{EvalError, Result};
use crate::value::{check_len, Value};

/// One element of a text-like sequence.
pub(super) trait Unit: Copy + PartialEq {
    fn is_space(self) -> bool;
    fn is_line_break(self) -> bool;
    fn ascii(b: u8) -> Self;
}

impl Unit for char {
    fn is_space(self) -> bool {
        self.is_whitespace() || ('\x1c'..='\x1f').contains(&self)
    }

    fn is_line_break(self) -> bool {
        matches!(
            self,
            '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
        )
    }

    fn ascii(b: u8) -> Self {
        b as char
    }
}

impl Unit for u8 {
    fn is_space(self) -> bool {
        matches!(self, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
    }

    fn is_line_break(self) -> bool {
        matches!(self, b'\n' | b'\r')
    }

    fn ascii(b: u8) -> Self {
        b
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Bounds
// ═══════════════════════════════════════════════════════════════════════

fn clamp_position(value: &Value, len: usize) -> Result<usize> {
    let n = value.to_index()?;
    let len_i = len as i64;
    let i = n
        .to_i64()
        .unwrap_or(if n.is_negative() { i64::MIN / 2 } else { i64::MAX / 2 });
    let i = if i < 0 { (i + len_i).max(0) } else { i.min(len_i) };
    Ok(i as usize)
}

/// Normalize optional `start`/`end` arguments the way slicing does.
///
/// The returned start may exceed the end; callers treat that as an empty
/// window.
pub(super) fn window(len: usize, start: Option<Value>, end: Option<Value>) -> Result<(usize, usize)> {
    let start = match start.filter(|v| !v.is_none()) {
        Some(v) => clamp_position(&v, len)?,
        None => 0,
    };
    let end = match end.filter(|v| !v.is_none()) {
        Some(v) => clamp_position(&v, len)?,
        None => len,
    };
    Ok((start, end))
}

// ═══════════════════════════════════════════════════════════════════════
// Searching
// ═══════════════════════════════════════════════════════════════════════

/// Lowest index of `needle` within `hay[start..end]`.
pub(super) fn find<T: Unit>(hay: &[T], needle: &[T], start: usize, end: usize) -> Option<usize> {
    if start > end || start > hay.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(start);
    }
    hay[start..end]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + start)
}

/// Highest index of `needle` within `hay[start..end]`.
pub(super) fn rfind<T: Unit>(hay: &[T], needle: &[T], start: usize, end: usize) -> Option<usize> {
    if start > end || start > hay.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(end);
    }
    hay[start..end]
        .windows(needle.len())
        .rposition(|w| w == needle)
        .map(|i| i + start)
}

/// Non-overlapping occurrences of `needle` in `hay[start..end]`.
pub(super) fn count<T: Unit>(hay: &[T], needle: &[T], start: usize, end: usize) -> usize {
    if start > end || start > hay.len() {
        return 0;
    }
    if needle.is_empty() {
        return end - start + 1;
    }
    let mut n = 0;
    let mut pos = start;
    while let Some(found) = find(hay, needle, pos, end) {
        n += 1;
        pos = found + needle.len();
    }
    n
}

/// Whether `hay[start..end]` starts (or ends) with `affix`.
pub(super) fn has_affix<T: Unit>(hay: &[T], affix: &[T], start: usize, end: usize, suffix: bool) -> bool {
    if start > hay.len() {
        return false;
    }
    let window = &hay[start..end.max(start)];
    if suffix {
        window.ends_with(affix)
    } else {
        window.starts_with(affix)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Splitting and joining
// ═══════════════════════════════════════════════════════════════════════

/// `split(sep, maxsplit)` with an explicit separator.
pub(super) fn split_on<T: Unit>(hay: &[T], sep: &[T], maxsplit: Option<usize>) -> Vec<Vec<T>> {
    let mut parts = Vec::new();
    let mut pos = 0;
    while maxsplit.map_or(true, |m| parts.len() < m) {
        match find(hay, sep, pos, hay.len()) {
            Some(found) => {
                parts.push(hay[pos..found].to_vec());
                pos = found + sep.len();
            }
            None => break,
        }
    }
    parts.push(hay[pos..].to_vec());
    parts
}

/// `rsplit(sep, maxsplit)` with an explicit separator.
pub(super) fn rsplit_on<T: Unit>(hay: &[T], sep: &[T], maxsplit: Option<usize>) -> Vec<Vec<T>> {
    let mut parts = Vec::new();
    let mut end = hay.len();
    while maxsplit.map_or(true, |m| parts.len() < m) {
        match rfind(hay, sep, 0, end) {
            Some(found) => {
                parts.push(hay[found + sep.len()..end].to_vec());
                end = found;
            }
            None => break,
        }
    }
    parts.push(hay[..end].to_vec());
    parts.reverse();
    parts
}

/// `split()` on runs of whitespace.
pub(super) fn split_whitespace<T: Unit>(hay: &[T], maxsplit: Option<usize>) -> Vec<Vec<T>> {
    let mut parts = Vec::new();
    let mut i = 0;
    let n = hay.len();
    loop {
        while i < n && hay[i].is_space() {
            i += 1;
        }
        if i == n {
            break;
        }
        if maxsplit.map_or(false, |m| parts.len() >= m) {
            parts.push(hay[i..].to_vec());
            break;
        }
        let begin = i;
        while i < n && !hay[i].is_space() {
            i += 1;
        }
        parts.push(hay[begin..i].to_vec());
    }
    parts
}

/// `rsplit()` on runs of whitespace.
pub(super) fn rsplit_whitespace<T: Unit>(hay: &[T], maxsplit: Option<usize>) -> Vec<Vec<T>> {
    let mut parts = Vec::new();
    let mut i = hay.len();
    loop {
        while i > 0 && hay[i - 1].is_space() {
            i -= 1;
        }
        if i == 0 {
            break;
        }
        if maxsplit.map_or(false, |m| parts.len() >= m) {
            parts.push(hay[..i].to_vec());
            break;
        }
        let end = i;
        while i > 0 && !hay[i - 1].is_space() {
            i -= 1;
        }
        parts.push(hay[i..end].to_vec());
    }
    parts.reverse();
    parts
}

/// `splitlines(keepends)`; `\r\n` counts as one boundary.
pub(super) fn split_lines<T: Unit>(hay: &[T], keepends: bool) -> Vec<Vec<T>> {
    let (cr, lf) = (T::ascii(b'\r'), T::ascii(b'\n'));
    let mut lines = Vec::new();
    let mut begin = 0;
    let mut i = 0;
    while i < hay.len() {
        if hay[i].is_line_break() {
            let mut next = i + 1;
            if hay[i] == cr && hay.get(next) == Some(&lf) {
                next += 1;
            }
            let end = if keepends { next } else { i };
            lines.push(hay[begin..end].to_vec());
            begin = next;
            i = next;
        } else {
            i += 1;
        }
    }
    if begin < hay.len() {
        lines.push(hay[begin..].to_vec());
    }
    lines
}

/// `partition(sep)` or `rpartition(sep)`.
pub(super) fn partition<T: Unit>(hay: &[T], sep: &[T], from_right: bool) -> (Vec<T>, Vec<T>, Vec<T>) {
    let found = if from_right {
        rfind(hay, sep, 0, hay.len())
    } else {
        find(hay, sep, 0, hay.len())
    };
    match found {
        Some(i) => (hay[..i].to_vec(), sep.to_vec(), hay[i + sep.len()..].to_vec()),
        None if from_right => (Vec::new(), Vec::new(), hay.to_vec()),
        None => (hay.to_vec(), Vec::new(), Vec::new()),
    }
}

/// Parse a `maxsplit` argument; negative means unlimited.
pub(super) fn maxsplit_arg(value: Option<Value>) -> Result<Option<usize>> {
    match value {
        None => Ok(None),
        Some(v) => {
            let n = v.to_index()?;
            if n.is_negative() {
                Ok(None)
            } else {
                Ok(Some(n.to_usize().unwrap_or(usize::MAX)))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Transformations
// ═══════════════════════════════════════════════════════════════════════

/// `strip`/`lstrip`/`rstrip`; no `chars` means whitespace.
pub(super) fn strip<T: Unit>(hay: &[T], chars: Option<&[T]>, left: bool, right: bool) -> Vec<T> {
    let strip_this = |c: &T| match chars {
        Some(set) => set.contains(c),
        None => c.is_space(),
    };
    let mut begin = 0;
    let mut end = hay.len();
    if left {
        while begin < end && strip_this(&hay[begin]) {
            begin += 1;
        }
    }
    if right {
        while end > begin && strip_this(&hay[end - 1]) {
            end -= 1;
        }
    }
    hay[begin..end].to_vec()
}

/// `replace(old, new, count)`.
pub(super) fn replace<T: Unit>(hay: &[T], old: &[T], new: &[T], limit: Option<usize>) -> Result<Vec<T>> {
    let occurrences = count(hay, old, 0, hay.len());
    let replaced = limit.map_or(occurrences, |m| m.min(occurrences));
    let grown = hay.len() + replaced.saturating_mul(new.len());
    check_len(grown)?;

    let mut out = Vec::with_capacity(grown);
    if old.is_empty() {
        let mut done = 0;
        for (i, unit) in hay.iter().enumerate() {
            if done < replaced {
                out.extend_from_slice(new);
                done += 1;
            }
            out.push(*unit);
            if i + 1 == hay.len() && done < replaced {
                out.extend_from_slice(new);
                done += 1;
            }
        }
        if hay.is_empty() && replaced > 0 {
            out.extend_from_slice(new);
        }
        return Ok(out);
    }

    let mut pos = 0;
    let mut done = 0;
    while done < replaced {
        match find(hay, old, pos, hay.len()) {
            Some(found) => {
                out.extend_from_slice(&hay[pos..found]);
                out.extend_from_slice(new);
                pos = found + old.len();
                done += 1;
            }
            None => break,
        }
    }
    out.extend_from_slice(&hay[pos..]);
    Ok(out)
}

/// Alignment for [`pad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Align {
    Left,
    Right,
    Center,
}

/// `ljust`/`rjust`/`center`.
pub(super) fn pad<T: Unit>(hay: &[T], width: usize, fill: T, align: Align) -> Result<Vec<T>> {
    if width <= hay.len() {
        return Ok(hay.to_vec());
    }
    check_len(width)?;
    let margin = width - hay.len();
    let left = match align {
        Align::Left => 0,
        Align::Right => margin,
        Align::Center => margin / 2 + (margin & width & 1),
    };
    let mut out = Vec::with_capacity(width);
    out.extend(std::iter::repeat(fill).take(left));
    out.extend_from_slice(hay);
    out.extend(std::iter::repeat(fill).take(margin - left));
    Ok(out)
}

/// `zfill(width)`: zero padding after any sign.
pub(super) fn zfill<T: Unit>(hay: &[T], width: usize) -> Result<Vec<T>> {
    if width <= hay.len() {
        return Ok(hay.to_vec());
    }
    check_len(width)?;
    let mut out = pad(hay, width, T::ascii(b'0'), Align::Right)?;
    let fill = width - hay.len();
    if let Some(&first) = hay.first() {
        if first == T::ascii(b'+') || first == T::ascii(b'-') {
            out[0] = first;
            out[fill] = T::ascii(b'0');
        }
    }
    Ok(out)
}

/// `expandtabs(tabsize)`.
pub(super) fn expand_tabs<T: Unit>(hay: &[T], tabsize: i64) -> Result<Vec<T>> {
    let (tab, space) = (T::ascii(b'\t'), T::ascii(b' '));
    let mut out = Vec::with_capacity(hay.len());
    let mut column: usize = 0;
    for &unit in hay {
        if unit == tab {
            if tabsize > 0 {
                let size = tabsize as usize;
                let spaces = size - column % size;
                check_len(out.len().saturating_add(spaces))?;
                out.extend(std::iter::repeat(space).take(spaces));
                column += spaces;
            }
        } else {
            out.push(unit);
            column = if unit.is_line_break() { 0 } else { column + 1 };
        }
    }
    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════
// Codecs
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Utf8,
    Ascii,
    Latin1,
}

impl Codec {
    fn lookup(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" | "u8" => Ok(Codec::Utf8),
            "ascii" | "us-ascii" => Ok(Codec::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => Ok(Codec::Latin1),
            _ => Err(EvalError::value_error(format!("unknown encoding: {}", name))),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Codec::Utf8 => "utf-8",
            Codec::Ascii => "ascii",
            Codec::Latin1 => "latin-1",
        }
    }

    fn limit(self) -> u32 {
        match self {
            Codec::Utf8 => u32::MAX,
            Codec::Ascii => 0x80,
            Codec::Latin1 => 0x100,
        }
    }
}

fn unknown_handler(errors: &str) -> EvalError {
    EvalError::value_error(format!("unknown error handler name '{}'", errors))
}

/// `str.encode(encoding, errors)`.
pub(super) fn encode(text: &str, encoding: &str, errors: &str) -> Result<Vec<u8>> {
    let codec = Codec::lookup(encoding)?;
    if codec == Codec::Utf8 {
        return Ok(text.as_bytes().to_vec());
    }
    let mut out = Vec::with_capacity(text.len());
    for (position, c) in text.chars().enumerate() {
        let code = c as u32;
        if code < codec.limit() {
            out.push(code as u8);
            continue;
        }
        match errors {
            "strict" => {
                return Err(EvalError::value_error(format!(
                    "'{}' codec can't encode character '\\u{{{:04x}}}' in position {}: ordinal not in range({})",
                    codec.name(),
                    code,
                    position,
                    codec.limit()
                )))
            }
            "ignore" => {}
            "replace" => out.push(b'?'),
            "xmlcharrefreplace" => out.extend_from_slice(format!("&#{};", code).as_bytes()),
            "backslashreplace" => {
                let escaped = match code {
                    0..=0xff => format!("\\x{:02x}", code),
                    0x100..=0xffff => format!("\\u{:04x}", code),
                    _ => format!("\\U{:08x}", code),
                };
                out.extend_from_slice(escaped.as_bytes());
            }
            other => return Err(unknown_handler(other)),
        }
    }
    Ok(out)
}

/// `bytes.decode(encoding, errors)`.
pub(super) fn decode(data: &[u8], encoding: &str, errors: &str) -> Result<String> {
    let codec = Codec::lookup(encoding)?;
    match codec {
        Codec::Latin1 => Ok(data.iter().map(|&b| b as char).collect()),
        Codec::Ascii => {
            let mut out = String::with_capacity(data.len());
            for (position, &b) in data.iter().enumerate() {
                if b < 0x80 {
                    out.push(b as char);
                } else {
                    bad_byte(&mut out, codec, b, position, "ordinal not in range(128)", errors)?;
                }
            }
            Ok(out)
        }
        Codec::Utf8 => {
            let mut out = String::with_capacity(data.len());
            let mut pos = 0;
            while pos < data.len() {
                match std::str::from_utf8(&data[pos..]) {
                    Ok(valid) => {
                        out.push_str(valid);
                        break;
                    }
                    Err(err) => {
                        let good = err.valid_up_to();
                        out.push_str(&String::from_utf8_lossy(&data[pos..pos + good]));
                        pos += good;
                        let bad = err.error_len().unwrap_or(data.len() - pos);
                        let reason = match err.error_len() {
                            None => "unexpected end of data",
                            Some(_) if is_continuation(data[pos]) || data[pos] >= 0xf8 => "invalid start byte",
                            Some(_) => "invalid continuation byte",
                        };
                        if errors == "replace" {
                            out.push('\u{fffd}');
                        } else {
                            for offset in 0..bad {
                                bad_byte(&mut out, codec, data[pos + offset], pos + offset, reason, errors)?;
                            }
                        }
                        pos += bad;
                    }
                }
            }
            Ok(out)
        }
    }
}

fn is_continuation(b: u8) -> bool {
    b & 0xc0 == 0x80
}

fn bad_byte(
    out: &mut String,
    codec: Codec,
    byte: u8,
    position: usize,
    reason: &str,
    errors: &str,
) -> Result<()> {
    match errors {
        "strict" => Err(EvalError::value_error(format!(
            "'{}' codec can't decode byte 0x{:02x} in position {}: {}",
            codec.name(),
            byte,
            position,
            reason
        ))),
        "ignore" => Ok(()),
        "replace" => {
            out.push('\u{fffd}');
            Ok(())
        }
        "backslashreplace" => {
            out.push_str(&format!("\\x{:02x}", byte));
            Ok(())
        }
        other => Err(unknown_handler(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn strings(parts: Vec<Vec<char>>) -> Vec<String> {
        parts.into_iter().map(|p| p.into_iter().collect()).collect()
    }

    #[test]
    fn test_find_and_count() {
        let hay = chars("abcabcabc");
        assert_eq!(find(&hay, &chars("c"), 0, 9), Some(2));
        assert_eq!(rfind(&hay, &chars("c"), 0, 9), Some(8));
        assert_eq!(find(&hay, &chars(""), 10, 9), None);
        assert_eq!(count(&hay, &chars("abc"), 0, 9), 3);
        assert_eq!(count(&chars("aaaa"), &chars("aa"), 0, 4), 2);
        assert_eq!(count(&chars("abc"), &chars(""), 0, 3), 4);
    }

    #[test]
    fn test_split_variants() {
        let hay = chars("a,b,,c");
        assert_eq!(strings(split_on(&hay, &chars(","), None)), vec!["a", "b", "", "c"]);
        assert_eq!(strings(split_on(&hay, &chars(","), Some(1))), vec!["a", "b,,c"]);
        assert_eq!(strings(rsplit_on(&hay, &chars(","), Some(1))), vec!["a,b,", "c"]);
        let hay = chars("  one  two three ");
        assert_eq!(strings(split_whitespace(&hay, None)), vec!["one", "two", "three"]);
        assert_eq!(strings(split_whitespace(&hay, Some(1))), vec!["one", "two three "]);
        assert_eq!(strings(rsplit_whitespace(&hay, Some(1))), vec!["  one  two", "three"]);
    }

    #[test]
    fn test_split_lines() {
        let hay = chars("a\nb\r\nc\rd");
        assert_eq!(strings(split_lines(&hay, false)), vec!["a", "b", "c", "d"]);
        assert_eq!(strings(split_lines(&hay, true)), vec!["a\n", "b\r\n", "c\r", "d"]);
        assert!(split_lines(&chars(""), false).is_empty());
    }

    #[test]
    fn test_replace_and_pad() {
        let out: String = replace(&chars("aaa"), &chars("a"), &chars("b"), Some(2))
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(out, "bba");
        let out: String = replace(&chars("ab"), &chars(""), &chars("-"), None)
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(out, "-a-b-");
        let out: String = pad(&chars("abc"), 6, '*', Align::Center).unwrap().into_iter().collect();
        assert_eq!(out, "*abc**");
        let out: String = zfill(&chars("-42"), 5).unwrap().into_iter().collect();
        assert_eq!(out, "-0042");
    }

    #[test]
    fn test_codecs() {
        assert_eq!(encode("é", "latin-1", "strict").unwrap(), vec![0xe9]);
        assert_eq!(encode("é", "ascii", "replace").unwrap(), b"?".to_vec());
        assert_eq!(encode("é", "ascii", "xmlcharrefreplace").unwrap(), b"&#233;".to_vec());
        assert_eq!(decode(&[0x68, 0xff], "utf-8", "replace").unwrap(), "h\u{fffd}");
        let err = decode(&[0xff], "utf-8", "strict").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'utf-8' codec can't decode byte 0xff in position 0: invalid start byte"
        );
        assert!(decode(b"x", "rot13", "strict").is_err());
    }
}
