//! Timestamp utilities
//!
//! Timestamps are persisted as RFC 3339 text with millisecond precision and
//! a `Z` suffix, so string comparison in SQL matches chronological order.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp, truncated to the stored millisecond precision
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Format a timestamp for storage
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
pub fn from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

/// Parse an optional stored timestamp
pub fn from_db_opt(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(from_db).transpose()
}

/// Whole seconds from `start` to `end`, never negative
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0)
}

/// Next daily quota reset relative to `from`
pub fn next_daily_reset(from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::days(1)
}

/// Next weekly quota reset relative to `from`
pub fn next_weekly_reset(from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::days(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_survives_storage_unchanged() {
        let ts = now();
        assert_eq!(from_db(&to_db(ts)).unwrap(), ts);
    }

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_db_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).unwrap();
        let b = a + Duration::milliseconds(123);
        assert_eq!(to_db(a), "2025-03-01T09:05:00.000Z");
        assert_eq!(to_db(b), "2025-03-01T09:05:00.123Z");
        assert_eq!(to_db(a).len(), to_db(b).len());
    }

    #[test]
    fn test_db_string_order_matches_time_order() {
        let early = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let late = early + Duration::milliseconds(1);
        assert!(to_db(early) < to_db(late));
    }

    #[test]
    fn test_round_trip_preserves_millis() {
        let ts = Utc.with_ymd_and_hms(2024, 7, 14, 12, 0, 0).unwrap() + Duration::milliseconds(450);
        assert_eq!(from_db(&to_db(ts)).unwrap(), ts);
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(from_db("yesterday").is_err());
        assert!(from_db_opt(None).unwrap().is_none());
    }

    #[test]
    fn test_elapsed_seconds_clamps_negative() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(elapsed_seconds(start, start + Duration::seconds(42)), 42);
        assert_eq!(elapsed_seconds(start + Duration::seconds(5), start), 0);
    }

    #[test]
    fn test_reset_schedule() {
        let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(next_daily_reset(from), from + Duration::hours(24));
        assert_eq!(next_weekly_reset(from), from + Duration::days(7));
    }
}
