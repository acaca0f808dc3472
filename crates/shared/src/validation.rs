//! Common validation utilities.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use validator::ValidationError;

/// Longest identifier PostgreSQL accepts without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Parses an ISO-8601 date or timestamp into a UTC instant.
///
/// Accepted forms:
/// - RFC 3339 with offset (`2025-06-01T10:30:00Z`, `2025-06-01T12:30:00+02:00`)
/// - naive date-time, read as UTC (`2025-06-01T10:30:00`, fractional seconds allowed)
/// - plain date, read as midnight UTC (`2025-06-01`)
pub fn parse_iso_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    let mut err = ValidationError::new("iso_timestamp");
    err.message = Some(format!("'{}' is not a valid ISO-8601 date", value).into());
    Err(err)
}

/// Validates a SQL identifier used for table or index names.
///
/// Only lowercase ASCII letters, digits and underscores are allowed, and the
/// first character must not be a digit.
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("identifier");
        err.message = Some(
            "Identifier must be 1-63 chars of lowercase letters, digits or underscores".into(),
        );
        Err(err)
    }
}

/// Treats an empty or whitespace-only filter as absent.
///
/// Only fully blank values are dropped. Any other value is returned
/// unchanged, surrounding whitespace included, so a search term like `" B1"`
/// still matches literally.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
