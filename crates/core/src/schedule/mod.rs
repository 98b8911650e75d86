//! Slot availability and booking conflict resolution.
//!
//! - [`grid`] - Slot grid derived from shop working hours
//! - [`interval`] - `[start, end)` intervals and the single overlap predicate
//! - [`availability`] - Day status and per-slot availability
//! - [`calendar`] - Month aggregation and the availability badge

pub mod availability;
pub mod calendar;
pub mod grid;
pub mod interval;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

pub use availability::{DayAvailability, DayOverride, DayStatus, SlotAvailability, SlotState};
pub use calendar::{AvailabilityTier, DateRange, DaySummary, aggregate};
pub use grid::{ShopSchedule, SlotGrid, WorkingHours};
pub use interval::{TimeRange, first_conflict};

/// Errors from scheduling value construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// End time is not after start time.
    #[error("end time {end} must be after start time {start}")]
    EmptyInterval { start: NaiveTime, end: NaiveTime },

    /// Date range ends before it starts.
    #[error("end date {end} is before start date {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    /// Date range is longer than allowed.
    #[error("date range may cover at most {max_days} days")]
    RangeTooLong { max_days: i64 },
}
