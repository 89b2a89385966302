//! Column values carried by a snapshot and their SQL literal form.

use gcs_core::sql_utils::quote_literal;
use serde_json::Value;
use std::fmt::Write;

/// One exported column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    /// Exact decimal in the store's text form, e.g. `80.500`
    Numeric(String),
    Text(String),
    Json(Value),
    /// Timestamp in the store's text form, e.g. `2024-05-01 12:00:00.123456`
    Timestamp(String),
}

impl SqlValue {
    /// Render as a SQL literal that evaluates back to the same value.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(n) => n.to_string(),
            SqlValue::Numeric(text) => text.clone(),
            SqlValue::Text(text) => quote_literal(text),
            SqlValue::Json(value) => quote_literal(&canonical_json(value)),
            SqlValue::Timestamp(text) => format!("TIMESTAMP {}", quote_literal(text)),
        }
    }
}

/// Whether `text` is a plain decimal literal (`-12.50`, `3`).
pub fn is_decimal_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.map_or(true, |f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
}

/// Serialize `value` with object keys sorted at every depth and no
/// insignificant whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Serializing a string key cannot fail
                let _ = write!(out, "{}:", Value::String(key.clone()));
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}
