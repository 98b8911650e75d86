//! Month-view aggregation and the availability badge.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ScheduleError;
use super::grid::ShopSchedule;
use crate::wire::calendar_date;

/// Longest range a calendar request may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Capacity used for the badge when neither the shop nor the deployment
/// configures one.
pub const DEFAULT_DAILY_CAPACITY: u32 = 32;

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create an inclusive range.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvertedRange`] when `end < start` and
    /// [`ScheduleError::RangeTooLong`] past [`MAX_RANGE_DAYS`].
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScheduleError> {
        if end < start {
            return Err(ScheduleError::InvertedRange { start, end });
        }
        if (end - start).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(ScheduleError::RangeTooLong {
                max_days: MAX_RANGE_DAYS,
            });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over every day in the range.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|d| *d <= self.end)
    }
}

/// Three-tier availability badge shown on calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityTier {
    High,
    Medium,
    Low,
    Closed,
}

impl AvailabilityTier {
    /// Classify a day by the share of capacity still free.
    ///
    /// At least half free is `High`, at least a fifth is `Medium`,
    /// anything less (including a zero capacity) is `Low`.
    #[must_use]
    pub fn classify(booked: u32, capacity: u32, closed: bool) -> Self {
        if closed {
            return Self::Closed;
        }
        if capacity == 0 {
            return Self::Low;
        }
        let remaining = u64::from(capacity.saturating_sub(booked)) * 100;
        let capacity = u64::from(capacity);
        if remaining >= capacity * 50 {
            Self::High
        } else if remaining >= capacity * 20 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One calendar day of the month view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub is_specifically_closed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_reason: Option<String>,
    pub booked_appointments_count: u32,
    pub availability: AvailabilityTier,
}

/// Roll per-day counts and closures up into one entry per day.
///
/// `closures` maps shop-wide closed override dates to their reason;
/// `counts` maps dates to booked appointment counts. Days missing from
/// `counts` have zero bookings.
#[must_use]
pub fn aggregate(
    range: &DateRange,
    schedule: &ShopSchedule,
    capacity: u32,
    closures: &HashMap<NaiveDate, Option<String>>,
    counts: &HashMap<NaiveDate, u32>,
) -> Vec<DaySummary> {
    range
        .days()
        .map(|date| {
            let override_reason = closures.get(&date);
            let weekly = schedule.is_weekly_closed(date);
            let closed = override_reason.is_some() || weekly;
            let closure_reason = match override_reason {
                Some(reason) => Some(reason.clone().unwrap_or_else(|| "closed".to_string())),
                None if weekly => Some("weekly closing day".to_string()),
                None => None,
            };
            let booked = counts.get(&date).copied().unwrap_or(0);

            DaySummary {
                date,
                is_specifically_closed: closed,
                closure_reason,
                booked_appointments_count: booked,
                availability: AvailabilityTier::classify(booked, capacity, closed),
            }
        })
        .collect()
}
