//! Shared utility functions for tool inputs and formatting.
//!
//! ## JSON Extraction Helpers
//!
//! Agent tools receive loosely-typed JSON arguments:
//! - `json_string`, `json_string_or` - Extract strings
//! - `json_string_array` - Extract string arrays (or comma lists)
//! - `json_f64`, `json_i64` - Extract numbers

use chrono::{DateTime, Utc};
use std::fmt::Display;

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

/// Extract a non-empty string from JSON value by key.
#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[inline]
pub fn json_string_or(value: &serde_json::Value, key: &str, default: &str) -> String {
    json_string(value, key).unwrap_or_else(|| default.to_string())
}

/// Extract a string list. Accepts a JSON array or a comma-separated string.
pub fn json_string_array(value: &serde_json::Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|s| s.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_json::Value::String(list)) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract f64, accepting numeric strings.
#[inline]
pub fn json_f64(value: &serde_json::Value, key: &str) -> Option<f64> {
    let v = value.get(key)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

#[inline]
pub fn json_i64(value: &serde_json::Value, key: &str, default: i64) -> i64 {
    value.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
}

// =============================================================================
// String Utilities
// =============================================================================

/// Truncate to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Timestamp format used in reports and the dashboard
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

// =============================================================================
// Type Parsing
// =============================================================================

/// Trait for parsing strings into enum types with a default fallback.
/// Used for stored metadata and LLM-supplied values, where invalid strings
/// should fall back gracefully instead of failing the whole record.
pub trait ParseWithDefault: Sized {
    fn type_name() -> &'static str;

    fn default_value() -> Self;

    fn try_parse(s: &str) -> Option<Self>;

    /// Logs a warning for invalid values.
    fn parse_or_default(s: &str) -> Self {
        match Self::try_parse(s) {
            Some(v) => v,
            None => {
                tracing::warn!("Invalid {} value '{}', using default", Self::type_name(), s);
                Self::default_value()
            }
        }
    }
}

/// Filter an iterator of Results, logging errors at warn level before discarding.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}
