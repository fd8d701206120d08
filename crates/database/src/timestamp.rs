//! Timestamp encoding shared by every table.
//!
//! Timestamps are stored as RFC 3339 UTC text with millisecond precision and a
//! `Z` suffix. Fixed width keeps lexical order equal to chronological order,
//! which the overlap and expiry queries rely on.

use chrono::{DateTime, SecondsFormat, Utc};

/// Encode a timestamp for storage or comparison in SQL.
pub fn format(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_opt(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_uses_fixed_width_zulu_form() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(format(ts), "2025-03-09T07:05:00.000Z");
    }

    #[test]
    fn lexical_order_matches_time_order() {
        let earlier = Utc.with_ymd_and_hms(2025, 3, 9, 9, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap();
        assert!(format(earlier) < format(later));
    }
}
