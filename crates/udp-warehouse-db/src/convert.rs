use serde_json::Value;

use crate::types::is_nvarchar;

/// Truncation length applied to ISO-8601 timestamp strings before parsing,
/// to avoid ODBC datetime field overflow on over-precise source values.
const DATETIME_TRUNCATE_LEN: usize = 23;

/// Coerces one captured row (already positioned against `target_types`, one
/// entry per column in DDL order) into values safe to bind against the
/// target warehouse: date/time columns are truncated and left as strings
/// for the driver to parse, `nvarchar` columns are force-stringified even
/// when the source JSON value arrived as a non-string scalar.
pub fn convert_row(row: &mut [Value], target_types: &[String]) {
    for (value, target_type) in row.iter_mut().zip(target_types) {
        if value.is_null() {
            continue;
        }
        if is_datetime(target_type) {
            if let Some(text) = value.as_str() {
                *value = Value::String(truncate_datetime(text));
            }
        } else if is_nvarchar(target_type) {
            if !value.is_string() {
                *value = Value::String(stringify_scalar(value));
            }
        }
    }
}

fn is_datetime(target_type: &str) -> bool {
    matches!(target_type, "date" | "datetime" | "smalldatetime" | "time") || target_type.starts_with("datetime2")
}

fn truncate_datetime(text: &str) -> String {
    if text.len() > DATETIME_TRUNCATE_LEN {
        text.chars().take(DATETIME_TRUNCATE_LEN).collect()
    } else {
        text.to_string()
    }
}

fn stringify_scalar(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
