//! Row-to-entity parsing helpers.
//!
//! Every repo converts `libsql::Row` (column-indexed) into typed entity
//! structs. These helpers isolate the parsing logic and handle the dual
//! datetime format (`SQLite`'s `datetime('now')` vs Rust's `to_rfc3339()`).

use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if the string matches neither format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::InvalidState(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all sift-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if the string matches no variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::InvalidState(format!("Failed to parse enum from '{s}': {e}")))
}

/// Parse an optional TEXT column into an enum; NULL and empty are `None`.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if a non-empty value matches no variant.
pub fn parse_optional_enum<T: serde::de::DeserializeOwned>(
    s: Option<&str>,
) -> Result<Option<T>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_enum(s)?)),
        _ => Ok(None),
    }
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Decode a JSON-encoded string list column (`authors`, `keywords`).
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if the column is not a JSON string array.
pub fn parse_string_list(s: &str) -> Result<Vec<String>, DatabaseError> {
    serde_json::from_str(s)
        .map_err(|e| DatabaseError::InvalidState(format!("Invalid JSON list in column: {e}")))
}

/// Encode a string list for storage.
///
/// # Errors
///
/// Returns `DatabaseError::Other` if serialization fails.
pub fn encode_string_list(items: &[String]) -> Result<String, DatabaseError> {
    serde_json::to_string(items).map_err(|e| DatabaseError::Other(e.into()))
}

/// Booleans are stored as `INTEGER` 0/1.
#[must_use]
pub fn bool_to_sql(value: bool) -> i64 {
    i64::from(value)
}

/// Saturating `u64` -> `i64` for count columns.
#[must_use]
pub fn count_to_sql(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Negative counts read back from SQL clamp to zero.
#[must_use]
pub fn count_from_sql(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
