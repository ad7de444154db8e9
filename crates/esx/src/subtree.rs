//! 🌳 Subtree serializer: takes an already-parsed JSON value and writes it back out as compact text.
//!
//! This is what turns a hit's `_source` (shape unknown, vibes unknown) back into a string.
//! It is NOT a JSON library. It is one recursive function and a string escaper who takes
//! their job very seriously.
//!
//! 🧠 Knowledge graph:
//! - Object keys come out in the order they were parsed (serde_json `preserve_order`).
//! - Numbers keep their digits (serde_json `arbitrary_precision`), so `1.50` stays `1.50` and
//!   big integers stay exact. Exponents come out in canonical form: `1e3` becomes `1e+3`.
//! - Output goes into any `fmt::Write`. A [`BoundedWriter`] refuses to grow past a limit and
//!   makes the whole walk stop early instead of finishing a string nobody will keep.

use std::fmt::{self, Write};

use serde_json::Value;

/// 🔁 Walk `value` and write compact JSON into `out`.
pub fn write_subtree<W: Write + ?Sized>(value: &Value, out: &mut W) -> fmt::Result {
    match value {
        Value::Null => out.write_str("null"),
        Value::Bool(true) => out.write_str("true"),
        Value::Bool(false) => out.write_str("false"),
        Value::Number(number) => write!(out, "{number}"),
        Value::String(s) => write_escaped(s, out),
        Value::Array(items) => {
            out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                write_subtree(item, out)?;
            }
            out.write_char(']')
        }
        Value::Object(map) => {
            out.write_char('{')?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                write_escaped(key, out)?;
                out.write_char(':')?;
                write_subtree(item, out)?;
            }
            out.write_char('}')
        }
    }
}

/// 🧵 Convenience: the whole subtree as a fresh `String`.
pub fn serialize_subtree(value: &Value) -> String {
    let mut out = String::new();
    // -- writing into a String cannot fail. fmt::Write for String is infallible, we checked.
    let _ = write_subtree(value, &mut out);
    out
}

/// 📏 Serialize, but give up the moment the output would exceed `limit` bytes.
///
/// Returns `None` on overflow. The partial text is not returned, because a partial
/// JSON document is just a syntax error with ambition.
pub fn serialize_subtree_bounded(value: &Value, limit: usize) -> Option<String> {
    let mut writer = BoundedWriter::new(limit);
    write_subtree(value, &mut writer).ok()?;
    Some(writer.into_inner())
}

/// ✍️ JSON string literal rules: quote, backslash and control characters get escaped,
/// everything else (including non-ASCII) goes through untouched.
fn write_escaped<W: Write + ?Sized>(s: &str, out: &mut W) -> fmt::Result {
    out.write_char('"')?;
    let mut run_start = 0;
    for (i, c) in s.char_indices() {
        let escape = match c {
            '"' => Some("\\\""),
            '\\' => Some("\\\\"),
            '\n' => Some("\\n"),
            '\r' => Some("\\r"),
            '\t' => Some("\\t"),
            '\u{08}' => Some("\\b"),
            '\u{0C}' => Some("\\f"),
            c if (c as u32) < 0x20 => None,
            _ => continue,
        };
        // -- 📦 flush the boring run before this character in one go
        out.write_str(&s[run_start..i])?;
        match escape {
            Some(esc) => out.write_str(esc)?,
            None => write!(out, "\\u{:04x}", c as u32)?,
        }
        run_start = i + c.len_utf8();
    }
    out.write_str(&s[run_start..])?;
    out.write_char('"')
}

/// 🚧 A `String` with a ceiling. Writes past `limit` bytes fail with `fmt::Error`.
#[derive(Debug)]
pub struct BoundedWriter {
    buf: String,
    limit: usize,
}

impl BoundedWriter {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: String::new(),
            limit,
        }
    }

    pub fn into_inner(self) -> String {
        self.buf
    }
}

impl Write for BoundedWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > self.limit {
            return Err(fmt::Error);
        }
        self.buf.push_str(s);
        Ok(())
    }
}
