//! Half-open booking windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LaundryError, LaundryResult};

/// `[start, end)`; windows that only touch do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> LaundryResult<Self> {
        if end <= start {
            return Err(LaundryError::validation("end time must be after start time"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 12, hour, minute, 0).unwrap()
    }

    fn range(from: (u32, u32), to: (u32, u32)) -> TimeRange {
        TimeRange::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(TimeRange::new(at(10, 0), at(10, 0)).is_err());
        assert!(TimeRange::new(at(11, 0), at(10, 0)).is_err());
        assert_eq!(range((10, 0), (11, 30)).minutes(), 90);
    }

    #[test]
    fn overlap_is_symmetric_and_excludes_touching() {
        let morning = range((9, 0), (10, 0));
        let late_morning = range((9, 30), (10, 30));
        let next = range((10, 0), (11, 0));
        let inside = range((9, 15), (9, 45));

        assert!(morning.overlaps(&late_morning));
        assert!(late_morning.overlaps(&morning));
        assert!(morning.overlaps(&inside));
        assert!(inside.overlaps(&morning));
        assert!(!morning.overlaps(&next));
        assert!(!next.overlaps(&morning));
    }
}
