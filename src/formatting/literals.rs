use std::fmt::Write as _;

use serde_json::Value as JsonValue;

use crate::error::SqlContractDbError;
use crate::types::RowValues;

/// Quote text as a standard SQL string literal.
#[must_use]
pub fn as_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    out.push_str(&escape_text(text));
    out.push('\'');
    out
}

pub(super) fn escape_text(text: &str) -> String {
    text.replace('\'', "''")
}

fn as_float(value: f64) -> String {
    if value.is_nan() {
        "'NaN'".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "'+Infinity'".to_string()
        } else {
            "'-Infinity'".to_string()
        }
    } else {
        value.to_string()
    }
}

fn as_bytea(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 4);
    out.push_str("'\\x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out.push('\'');
    out
}

/// Render a value as a SQL literal.
#[must_use]
pub fn as_literal(value: &RowValues) -> String {
    match value {
        RowValues::Null => "null".to_string(),
        RowValues::Bool(b) => b.to_string(),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => as_float(*f),
        RowValues::Text(s) => as_text(s),
        RowValues::Timestamp(dt) => as_text(&dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
        RowValues::JSON(json) => as_text(&json.to_string()),
        RowValues::Blob(bytes) => as_bytea(bytes),
        RowValues::Array(items) => {
            let inner: Vec<String> = items.iter().map(as_literal).collect();
            format!("array[{}]", inner.join(","))
        }
    }
}

/// Render a value as a quoted JSON literal.
#[must_use]
pub fn as_json(value: &RowValues) -> String {
    as_text(&to_json(value).to_string())
}

fn to_json(value: &RowValues) -> JsonValue {
    match value {
        RowValues::Null => JsonValue::Null,
        RowValues::Bool(b) => JsonValue::Bool(*b),
        RowValues::Int(i) => JsonValue::from(*i),
        RowValues::Float(f) => serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        RowValues::Text(s) => JsonValue::String(s.clone()),
        RowValues::Timestamp(dt) => JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        RowValues::JSON(json) => json.clone(),
        RowValues::Blob(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        RowValues::Array(items) => JsonValue::Array(items.iter().map(to_json).collect()),
    }
}

/// Render a value as a comma-separated list; arrays are expanded one level.
#[must_use]
pub fn as_csv(value: &RowValues) -> String {
    match value {
        RowValues::Array(items) => items.iter().map(as_literal).collect::<Vec<_>>().join(","),
        other => as_literal(other),
    }
}

/// Text injected as-is; non-text values fall back to their literal.
#[must_use]
pub fn as_raw(value: &RowValues) -> String {
    match value {
        RowValues::Text(s) => s.clone(),
        other => as_literal(other),
    }
}

/// Escaped text without the surrounding quotes.
#[must_use]
pub fn as_value(value: &RowValues) -> String {
    match value {
        RowValues::Text(s) => escape_text(s),
        other => as_literal(other),
    }
}

/// Identifiers from a text value or an array of text values.
///
/// # Errors
/// Returns `SqlContractDbError::ParameterError` for non-text values or invalid names.
pub fn as_names(value: &RowValues) -> Result<String, SqlContractDbError> {
    match value {
        RowValues::Text(s) => super::as_name(s),
        RowValues::Array(items) => {
            let names = items
                .iter()
                .map(|item| match item {
                    RowValues::Text(s) => super::as_name(s),
                    other => Err(not_a_name(other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names.join(","))
        }
        other => Err(not_a_name(other)),
    }
}

fn not_a_name(value: &RowValues) -> SqlContractDbError {
    SqlContractDbError::ParameterError(format!("{value:?} cannot be used as an identifier"))
}
