//! Output rendering: human-readable text or pretty JSON.

use serde_json::Value;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented key-value listing
    #[default]
    Plain,
    /// JSON (pretty-printed)
    Json,
}

/// Render an API payload in the chosen format.
pub fn render(value: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => {
            let mut out = String::new();
            render_plain(value, 0, &mut out);
            out
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}

fn render_plain(value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Array(items) if items.is_empty() => {
            let _ = writeln!(out, "{pad}(none)");
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    let _ = writeln!(out, "{pad}#{}", index + 1);
                    render_plain(item, indent + 1, out);
                } else {
                    let _ = writeln!(out, "{pad}{}", scalar(item));
                }
            }
        }
        Value::Object(map) => {
            for (key, val) in map {
                if val.is_object() || val.is_array() {
                    let _ = writeln!(out, "{pad}{key}:");
                    render_plain(val, indent + 1, out);
                } else {
                    let _ = writeln!(out, "{pad}{key}: {}", scalar(val));
                }
            }
        }
        other => {
            let _ = writeln!(out, "{pad}{}", scalar(other));
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
