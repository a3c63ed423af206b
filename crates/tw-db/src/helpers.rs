//! Row-to-entity parsing helpers.
//!
//! Every repo converts `libsql::Row` (column-indexed) into typed entity
//! structs. These helpers isolate the parsing and the datetime encoding.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DatabaseError;

/// Encode a timestamp for storage.
///
/// Fixed-width (microseconds, `Z` suffix) so that string comparison in SQL
/// orders the same way as the timestamps themselves.
#[must_use]
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 and `SQLite`'s default format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all tw-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
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

/// Read a non-negative INTEGER column as `u32`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the stored value does not fit.
pub fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    u32::try_from(value)
        .map_err(|_| DatabaseError::Query(format!("column {idx} holds out-of-range count {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    #[test]
    fn formatted_datetimes_sort_chronologically() {
        let a = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let b = a + Duration::microseconds(1);
        let c = a + Duration::hours(15);
        let mut encoded = vec![format_datetime(c), format_datetime(a), format_datetime(b)];
        encoded.sort();
        assert_eq!(
            encoded,
            vec![format_datetime(a), format_datetime(b), format_datetime(c)]
        );
    }

    #[test]
    fn datetime_roundtrips_through_storage_format() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 15).unwrap() + Duration::microseconds(42);
        assert_eq!(parse_datetime(&format_datetime(dt)).unwrap(), dt);
        assert_eq!(format_datetime(dt), "2026-03-01T09:30:15.000042Z");
    }

    #[test]
    fn parses_sqlite_default_format() {
        let dt = parse_datetime("2026-02-09 14:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 2, 9, 14, 30, 0).unwrap());
    }

    #[test]
    fn optional_datetime_treats_empty_as_none() {
        assert_eq!(parse_optional_datetime(None).unwrap(), None);
        assert_eq!(parse_optional_datetime(Some("")).unwrap(), None);
        assert!(parse_optional_datetime(Some("nope")).is_err());
    }

    #[test]
    fn parse_enum_uses_snake_case() {
        let status: tw_core::enums::QueueStatus = parse_enum("dismissed").unwrap();
        assert_eq!(status, tw_core::enums::QueueStatus::Dismissed);
        assert!(parse_enum::<tw_core::enums::QueueStatus>("archived").is_err());
    }
}
