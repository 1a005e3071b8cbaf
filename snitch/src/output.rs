//! Output formatting: plain text (human-readable) and JSON.

use serde_json::Value;
use snitch_lib::format_timestamp_display;
use std::fmt::Write;

/// Snitch fields rendered through the timestamp formatter in plain output.
const TIMESTAMP_KEYS: [&str; 3] = ["created_at", "checked_in_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable tables and key-value
    #[default]
    Plain,
    /// JSON (pretty-printed)
    Json,
}

/// Plain output options.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainOptions {
    /// Show timestamps in UTC instead of the local timezone.
    pub use_utc: bool,
}

/// Format value as plain text (tables for arrays of objects, key-value for objects).
pub fn format_plain(value: &Value, opts: PlainOptions) -> String {
    let mut out = String::new();
    format_plain_impl(value, &mut out, 0, opts);
    out
}

fn format_plain_impl(v: &Value, out: &mut String, indent: usize, opts: PlainOptions) {
    let pad = "  ".repeat(indent);
    match v {
        Value::Null => {
            let _ = writeln!(out, "{}null", pad);
        }
        Value::Bool(b) => {
            let _ = writeln!(out, "{}{}", pad, b);
        }
        Value::Number(n) => {
            let _ = writeln!(out, "{}{}", pad, n);
        }
        Value::String(s) => {
            let _ = writeln!(out, "{}{}", pad, s.trim_end());
        }
        Value::Array(arr) => {
            if arr.is_empty() {
                _ = writeln!(out, "{}<empty>", pad);
                return;
            }
            if arr.iter().all(Value::is_object) && arr.len() > 1 {
                let keys = table_keys(&arr[0]);
                if !keys.is_empty() {
                    let header: String = keys
                        .iter()
                        .map(|k| format!("{:<14}", k))
                        .collect::<Vec<_>>()
                        .join(" ");
                    let _ = writeln!(out, "{}{}", pad, header.trim_end());
                    let _ = writeln!(out, "{}{}", pad, "-".repeat(header.len().min(80)));
                    for obj in arr {
                        let row: String = keys
                            .iter()
                            .map(|k| {
                                let val = obj
                                    .get(k)
                                    .and_then(|v| cell(k, v, opts))
                                    .unwrap_or_else(|| "-".to_string());
                                format!("{:<14}", truncate(val.as_str(), 14))
                            })
                            .collect::<Vec<_>>()
                            .join(" ");
                        let _ = writeln!(out, "{}{}", pad, row.trim_end());
                    }
                    return;
                }
            }
            for (i, item) in arr.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    let _ = writeln!(out, "{}[{}]", pad, i + 1);
                    format_plain_impl(item, out, indent + 1, opts);
                } else {
                    let s = as_short_str(item).unwrap_or_else(|| "null".to_string());
                    let _ = writeln!(out, "{}{}", pad, s);
                }
            }
        }
        Value::Object(map) => {
            for (k, val) in map {
                if val.is_object() || (val.is_array() && !is_string_list(val)) {
                    let _ = writeln!(out, "{}{}:", pad, k);
                    format_plain_impl(val, out, indent + 1, opts);
                } else {
                    let s = cell(k, val, opts).unwrap_or_else(|| "null".to_string());
                    let _ = writeln!(out, "{}{}: {}", pad, k, s);
                }
            }
        }
    }
}

/// Columns for a snitch table: the scalar and tag-list fields of the first row.
fn table_keys(obj: &Value) -> Vec<String> {
    obj.as_object()
        .map(|m| {
            m.iter()
                .filter(|(_, v)| !v.is_object() && (!v.is_array() || is_string_list(v)))
                .map(|(k, _)| k.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn is_string_list(v: &Value) -> bool {
    v.as_array()
        .map(|a| a.iter().all(Value::is_string))
        .unwrap_or(false)
}

fn cell(key: &str, v: &Value, opts: PlainOptions) -> Option<String> {
    match v {
        Value::String(s) if TIMESTAMP_KEYS.contains(&key) => {
            Some(format_timestamp_display(s, opts.use_utc))
        }
        Value::Array(items) if is_string_list(v) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => as_short_str(v),
    }
}

fn as_short_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max {
        s
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

/// Format value as JSON (pretty).
pub fn format_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
