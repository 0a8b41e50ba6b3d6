//! Literal notation for Values
//!
//! Formats a [`Value`] as a runtime table-constructor literal, so printed
//! values can be pasted back into a script.
//!
//! # Format Examples
//!
//! - Nil: `nil`
//! - Boolean: `true` / `false`
//! - Integer: `42`
//! - Double: `3.0`, `0.5`, `1/0`
//! - Character, String: `"hello"` (with escaping)
//! - Table: `{[1] = "a", [2] = "b", k = 42, ["not an ident"] = true}`
//!
//! Integer keys print first, then string keys, each in key order. A table
//! that refers back to one of its enclosing tables prints as `{...}`, as does
//! anything nested past `max_depth`. `Display`
//! on `Value` uses the compact form; the alternate flag (`{:#}`) selects the
//! pretty form.

use crate::table::Table;
use crate::value::{Value, ValueKind};
use sel_core::DEFAULT_MAX_TABLE_DEPTH;
use sel_core::slot::format_float;
use std::fmt;

/// Configuration for notation output formatting
#[derive(Clone)]
pub struct NotationConfig {
    /// Use pretty printing with indentation
    pub pretty: bool,
    /// Number of spaces per indentation level
    pub indent: usize,
    /// Tables nested deeper than this print as `{...}`
    pub max_depth: usize,
}

impl Default for NotationConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: 2,
            max_depth: DEFAULT_MAX_TABLE_DEPTH,
        }
    }
}

impl NotationConfig {
    /// Create a compact (single-line) config
    pub fn compact() -> Self {
        Self::default()
    }

    /// Create a pretty-printed config
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}

/// Format a Value as a literal
pub fn value_to_notation(value: &Value, config: &NotationConfig) -> String {
    let mut buf = String::new();
    format_value(value, config, &mut Vec::new(), &mut buf);
    buf
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = if f.alternate() {
            NotationConfig::pretty()
        } else {
            NotationConfig::compact()
        };
        f.write_str(&value_to_notation(self, &config))
    }
}

fn format_value(
    value: &Value,
    config: &NotationConfig,
    path: &mut Vec<*const Table>,
    buf: &mut String,
) {
    match value.kind() {
        ValueKind::Nil => buf.push_str("nil"),
        ValueKind::Boolean => buf.push_str(if value.bool_value() { "true" } else { "false" }),
        ValueKind::Character => {
            let mut tmp = [0u8; 4];
            format_string(value.char_value().encode_utf8(&mut tmp), buf);
        }
        ValueKind::Integer => buf.push_str(&value.int_value().to_string()),
        ValueKind::WideInteger => buf.push_str(&value.wide_int_value().to_string()),
        ValueKind::Double => format_double(value.double_value(), buf),
        ValueKind::String => format_string(value.string_value(), buf),
        ValueKind::Table => match value.table_ref() {
            Some(table) => format_table(&table, config, path, buf),
            None => buf.push_str("{}"),
        },
    }
}

fn format_double(d: f64, buf: &mut String) {
    // Non-finite numbers have no literal; use expressions that evaluate to them
    if d.is_nan() {
        buf.push_str("0/0");
    } else if d.is_infinite() {
        buf.push_str(if d > 0.0 { "1/0" } else { "-1/0" });
    } else {
        buf.push_str(&format_float(d));
    }
}

/// Format a string with proper escaping
fn format_string(s: &str, buf: &mut String) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\x07' => buf.push_str("\\a"),
            '\x08' => buf.push_str("\\b"),
            '\x0C' => buf.push_str("\\f"),
            '\x0B' => buf.push_str("\\v"),
            // Three digits so a following digit is not absorbed
            c if c.is_control() && (c as u32) < 256 => {
                buf.push_str(&format!("\\{:03}", c as u32));
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}

const RESERVED: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(&key)
}

fn format_table(
    table: &Table,
    config: &NotationConfig,
    path: &mut Vec<*const Table>,
    buf: &mut String,
) {
    if table.is_empty() {
        buf.push_str("{}");
        return;
    }
    let depth = path.len();
    let id: *const Table = table;
    if depth >= config.max_depth || path.contains(&id) {
        buf.push_str("{...}");
        return;
    }
    path.push(id);

    buf.push('{');
    let mut first = true;
    let mut entry_sep = |buf: &mut String| {
        if !first {
            buf.push(',');
            if !config.pretty {
                buf.push(' ');
            }
        }
        first = false;
        if config.pretty {
            buf.push('\n');
            push_indent(buf, depth + 1, config.indent);
        }
    };

    for (key, value) in table.int_map() {
        entry_sep(buf);
        buf.push_str(&format!("[{}] = ", key));
        format_value(value, config, path, buf);
    }
    for (key, value) in table.str_map() {
        entry_sep(buf);
        if is_identifier(key) {
            buf.push_str(key);
        } else {
            buf.push('[');
            format_string(key, buf);
            buf.push(']');
        }
        buf.push_str(" = ");
        format_value(value, config, path, buf);
    }
    path.pop();

    if config.pretty {
        buf.push('\n');
        push_indent(buf, depth, config.indent);
    }
    buf.push('}');
}

/// Push indentation spaces
fn push_indent(buf: &mut String, depth: usize, indent_size: usize) {
    for _ in 0..(depth * indent_size) {
        buf.push(' ');
    }
}
