//! Date parsing and formatting shared by ordering and remote translation.
//!
//! Due dates are calendar dates (`YYYY-MM-DD`). Creation times are full
//! ISO-8601 timestamps in UTC with millisecond precision, e.g.
//! `2025-01-01T09:30:00.000Z`.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

/// Parse a due date into the instant it denotes (UTC midnight).
///
/// Accepts a bare calendar date or a full RFC 3339 timestamp. Returns
/// `None` for empty or malformed input.
pub fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    parse_timestamp(value)
}

/// Parse an RFC 3339 timestamp. Returns `None` for empty or malformed input.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an instant as a calendar date (`YYYY-MM-DD`, UTC).
pub fn format_calendar_date(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Format an instant as an ISO timestamp with millisecond precision.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current instant as an ISO timestamp.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_date_is_utc_midnight() {
        let dt = parse_due_date("2025-01-01").unwrap();
        assert_eq!(format_timestamp(dt), "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn due_date_accepts_full_timestamp() {
        let dt = parse_due_date("2025-03-04T10:00:00Z").unwrap();
        assert_eq!(format_calendar_date(dt), "2025-03-04");
    }

    #[test]
    fn malformed_inputs_are_none() {
        assert!(parse_due_date("").is_none());
        assert!(parse_due_date("   ").is_none());
        assert!(parse_due_date("tomorrow").is_none());
        assert!(parse_due_date("2025-13-40").is_none());
        assert!(parse_timestamp("2025-01-01").is_none());
    }

    #[test]
    fn timestamp_roundtrips_through_format() {
        let ts = "2024-06-30T23:59:59.123Z";
        let dt = parse_timestamp(ts).unwrap();
        assert_eq!(format_timestamp(dt), ts);
    }

    #[test]
    fn offsets_normalise_to_utc() {
        let dt = parse_timestamp("2025-01-01T01:00:00+02:00").unwrap();
        assert_eq!(format_timestamp(dt), "2024-12-31T23:00:00.000Z");
    }
}
