//! Input validation and timestamp formatting.
//!
//! Record dates arrive as ISO 8601 strings from clients and are stored as naive UTC
//! date-times. Creation/update stamps are stored as RFC 3339 UTC strings with a fixed
//! precision so they also compare correctly as text.

use crate::{RecordsError, RecordsResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a client-supplied record date.
///
/// Accepted forms, tried in order:
/// - RFC 3339 with an offset (`2024-01-15T10:30:00+05:30`), converted to UTC;
/// - naive date-time with `T` or space separator, seconds and fraction optional;
/// - bare date (`2024-01-15`), interpreted as midnight.
///
/// # Errors
///
/// Returns [`RecordsError::InvalidInput`] naming the rejected value.
pub fn parse_record_date(input: &str) -> RecordsResult<NaiveDateTime> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt);
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight);
    }

    Err(RecordsError::InvalidInput(format!(
        "recordDate must be an ISO 8601 date or date-time, got: '{}'",
        input
    )))
}

/// Formats a naive date-time as ISO 8601 without offset, e.g. `2024-01-15T10:30:00`.
///
/// Fractional seconds are only printed when present.
pub fn format_iso(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

pub(crate) fn stamp_to_sql(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn stamp_from_sql(column: &'static str, value: &str) -> RecordsResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RecordsError::CorruptRow {
            column,
            value: value.to_string(),
        })
}

pub(crate) fn record_date_from_sql(value: &str) -> RecordsResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map_err(|_| {
        RecordsError::CorruptRow {
            column: "record_date",
            value: value.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_bare_date_is_midnight() {
        let dt = parse_record_date("2024-01-15").unwrap();
        assert_eq!(format_iso(&dt), "2024-01-15T00:00:00");
    }

    #[test]
    fn test_parse_naive_date_time_variants() {
        for input in [
            "2024-01-15T10:30:00",
            "2024-01-15 10:30:00",
            "2024-01-15T10:30",
        ] {
            let dt = parse_record_date(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(format_iso(&dt), "2024-01-15T10:30:00", "{input}");
        }
    }

    #[test]
    fn test_parse_keeps_fractional_seconds() {
        let dt = parse_record_date("2024-01-15T10:30:00.250").unwrap();
        assert_eq!(dt.nanosecond(), 250_000_000);
        assert_eq!(format_iso(&dt), "2024-01-15T10:30:00.250");
    }

    #[test]
    fn test_parse_rfc3339_converts_to_utc() {
        let dt = parse_record_date("2024-01-15T10:30:00+05:30").unwrap();
        assert_eq!(format_iso(&dt), "2024-01-15T05:00:00");

        let dt = parse_record_date("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(format_iso(&dt), "2024-01-15T10:30:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "yesterday", "15/01/2024", "2024-13-01"] {
            let err = parse_record_date(input).expect_err(input);
            assert!(matches!(err, RecordsError::InvalidInput(_)), "{input}");
        }
    }

    #[test]
    fn test_stamp_round_trip_through_sql_text() {
        let now = Utc::now();
        let text = stamp_to_sql(&now);
        assert!(text.ends_with('Z'));
        let back = stamp_from_sql("created_at", &text).unwrap();
        assert_eq!(back.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_stamp_from_sql_reports_column() {
        let err = stamp_from_sql("updated_at", "nope").unwrap_err();
        assert!(matches!(
            err,
            RecordsError::CorruptRow {
                column: "updated_at",
                ..
            }
        ));
    }
}
