//! Half-open time intervals and the conflict predicate.
//!
//! Every conflict decision in the system, display-time and booking-time
//! alike, goes through [`TimeRange::overlaps`].

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::ScheduleError;
use crate::wire::hhmm;

/// A half-open `[start, end)` interval within one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
}

impl TimeRange {
    /// Create an interval.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::EmptyInterval`] unless `end` is after `start`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ScheduleError> {
        if end <= start {
            return Err(ScheduleError::EmptyInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create an interval of `minutes` length starting at `start`.
    ///
    /// Returns `None` when the interval would run past midnight.
    #[must_use]
    pub fn starting_at(start: NaiveTime, minutes: u32) -> Option<Self> {
        let (end, wrapped) = start.overflowing_add_signed(TimeDelta::minutes(i64::from(minutes)));
        (wrapped == 0 && end > start).then_some(Self { start, end })
    }

    /// Start of the interval (inclusive).
    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// End of the interval (exclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Length of the interval in minutes.
    #[must_use]
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether two intervals share any instant.
    ///
    /// Covers the three overlap cases (start inside, end inside, full
    /// containment). Touching intervals such as `[14:00,14:45)` and
    /// `[14:45,15:30)` do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Return the first existing interval that overlaps `candidate`.
pub fn first_conflict<'a, I>(candidate: &TimeRange, existing: I) -> Option<TimeRange>
where
    I: IntoIterator<Item = &'a TimeRange>,
{
    existing.into_iter().find(|r| r.overlaps(candidate)).copied()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::new(
            NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_partial_overlap_conflicts() {
        let existing = range("14:30", "15:15");
        assert!(range("14:00", "14:45").overlaps(&existing));
        assert!(existing.overlaps(&range("14:00", "14:45")));
    }

    #[test]
    fn test_adjacent_intervals_do_not_conflict() {
        let existing = range("14:00", "14:45");
        assert!(!range("14:45", "15:30").overlaps(&existing));
        assert!(!range("13:15", "14:00").overlaps(&existing));
    }

    #[test]
    fn test_containment_conflicts_both_ways() {
        let outer = range("10:00", "12:00");
        let inner = range("10:30", "11:00");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&outer));
    }

    #[test]
    fn test_empty_and_inverted_intervals_rejected() {
        let t = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(TimeRange::new(t, t).is_err());
        assert!(TimeRange::new(t, NaiveTime::from_hms_opt(8, 0, 0).unwrap()).is_err());
    }

    #[test]
    fn test_starting_at_rejects_midnight_wrap() {
        let late = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert!(TimeRange::starting_at(late, 45).is_none());
        let slot = TimeRange::starting_at(NaiveTime::from_hms_opt(9, 30, 0).unwrap(), 45).unwrap();
        assert_eq!(slot.to_string(), "09:30-10:15");
        assert_eq!(slot.minutes(), 45);
    }

    #[test]
    fn test_first_conflict_reports_the_clash() {
        let booked = [range("09:30", "10:15"), range("10:15", "11:00")];
        assert_eq!(
            first_conflict(&range("10:30", "10:45"), &booked),
            Some(range("10:15", "11:00"))
        );
        assert_eq!(first_conflict(&range("11:00", "11:45"), &booked), None);
    }

    #[test]
    fn test_serializes_as_clock_strings() {
        let json = serde_json::to_value(range("10:15", "11:00")).unwrap();
        assert_eq!(json, serde_json::json!({"start": "10:15", "end": "11:00"}));
    }
}
