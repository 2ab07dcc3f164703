//! Serialization of the binary buffer back to JSON text.

use alloc::string::String;
use core::fmt::Write as _;

use crate::layout::{self, Tag, ValueRecord};

/// Output style for [`Document::to_json`](crate::Document::to_json).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// Human-readable output: four-space indentation, one item per line.
    #[default]
    Indented,
    /// No insignificant whitespace at all.
    Compact,
}

pub(crate) fn object_to_json(buf: &[u8], base: u32, format: JsonFormat) -> String {
    let mut out = String::new();
    match format {
        JsonFormat::Indented => {
            out.push_str("{\n");
            object_content(&mut out, buf, base, 1, false);
            out.push_str("}\n");
        }
        JsonFormat::Compact => {
            out.push('{');
            object_content(&mut out, buf, base, 0, true);
            out.push('}');
        }
    }
    out
}

pub(crate) fn array_to_json(buf: &[u8], base: u32, format: JsonFormat) -> String {
    let mut out = String::new();
    match format {
        JsonFormat::Indented => {
            out.push_str("[\n");
            array_content(&mut out, buf, base, 1, false);
            out.push_str("]\n");
        }
        JsonFormat::Compact => {
            out.push('[');
            array_content(&mut out, buf, base, 0, true);
            out.push(']');
        }
    }
    out
}

fn indent(out: &mut String, level: u32, compact: bool) {
    if !compact {
        for _ in 0..level {
            out.push_str("    ");
        }
    }
}

fn object_content(out: &mut String, buf: &[u8], base: u32, level: u32, compact: bool) {
    let length = layout::base_length(buf, base);
    for i in 0..length {
        let entry = layout::object_entry_at(buf, base, i);
        let rec = layout::entry_value(buf, entry);
        indent(out, level, compact);
        out.push('"');
        escape_into(out, &layout::entry_key(buf, entry), rec.latin_key());
        out.push_str(if compact { "\":" } else { "\": " });
        value_to_json(out, buf, base, rec, level, compact);
        if i + 1 < length {
            out.push(',');
        }
        if !compact {
            out.push('\n');
        }
    }
}

fn array_content(out: &mut String, buf: &[u8], base: u32, level: u32, compact: bool) {
    let length = layout::base_length(buf, base);
    for i in 0..length {
        indent(out, level, compact);
        value_to_json(out, buf, base, layout::array_value_at(buf, base, i), level, compact);
        if i + 1 < length {
            out.push(',');
        }
        if !compact {
            out.push('\n');
        }
    }
}

fn value_to_json(
    out: &mut String,
    buf: &[u8],
    base: u32,
    rec: ValueRecord,
    level: u32,
    compact: bool,
) {
    match rec.tag() {
        Some(Tag::Bool) => out.push_str(if rec.payload() != 0 { "true" } else { "false" }),
        Some(Tag::Double) => {
            if rec.latin_or_int() {
                let _ = write!(out, "{}", rec.int_value());
            } else {
                append_number(out, layout::read_f64(buf, base + rec.payload()));
            }
        }
        Some(Tag::String) => {
            let (s, latin) = layout::string_value(buf, base, rec);
            out.push('"');
            escape_into(out, &s, latin);
            out.push('"');
        }
        Some(Tag::Array) => {
            let child = base + rec.payload();
            if compact {
                out.push('[');
                array_content(out, buf, child, 0, true);
                out.push(']');
            } else {
                out.push_str("[\n");
                array_content(out, buf, child, level + 1, false);
                indent(out, level, false);
                out.push(']');
            }
        }
        Some(Tag::Object) => {
            let child = base + rec.payload();
            if compact {
                out.push('{');
                object_content(out, buf, child, 0, true);
                out.push('}');
            } else {
                out.push_str("{\n");
                object_content(out, buf, child, level + 1, false);
                indent(out, level, false);
                out.push('}');
            }
        }
        Some(Tag::Null) | None => out.push_str("null"),
    }
}

/// Numbers render in plain decimal (`Display` never emits an exponent, and
/// integral doubles drop the fractional part). NaN and infinities are not
/// representable in JSON and come out as `null`.
fn append_number(out: &mut String, d: f64) {
    if d.is_finite() {
        let _ = write!(out, "{d}");
    } else {
        out.push_str("null");
    }
}

/// Escapes a string for JSON output. `ascii_only` (used for Latin-1-stored
/// strings and keys) additionally escapes everything above 0x7F as `\u00xx`,
/// producing pure-ASCII output for that storage class.
fn escape_into(out: &mut String, s: &str, ascii_only: bool) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || (ascii_only && (c as u32) > 0x7F) => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}
