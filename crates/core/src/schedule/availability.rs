//! Day-level and slot-level availability.
//!
//! The evaluator here is pure: callers load the shop schedule, the
//! applicable override and the booked intervals, then hand them over.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::grid::{ShopSchedule, SlotGrid};
use super::interval::TimeRange;
use crate::wire::{calendar_date, hhmm};

/// An override record as the evaluator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DayOverride {
    pub is_available: bool,
    pub reason: Option<String>,
    /// Per-slot states from the `time_slots` payload.
    pub slot_states: Vec<SlotState>,
}

/// Declared state of a single slot inside an override payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotState {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub available: bool,
}

impl SlotState {
    /// Parse the `time_slots` JSON payload of an override.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the payload is not an array of
    /// `{"time": "HH:MM", "available": bool}` objects.
    pub fn parse_payload(value: &serde_json::Value) -> Result<Vec<Self>, serde_json::Error> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        Vec::<Self>::deserialize(value)
    }
}

/// Whether a day is open, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayStatus {
    Open,
    WeeklyClosed,
    ClosedByOverride { reason: Option<String> },
}

impl DayStatus {
    /// Resolve the day status. The override wins over the weekly rule only
    /// to close a day, never to open a weekly closing day.
    #[must_use]
    pub fn resolve(
        schedule: &ShopSchedule,
        date: NaiveDate,
        day_override: Option<&DayOverride>,
    ) -> Self {
        if let Some(o) = day_override
            && !o.is_available
        {
            return Self::ClosedByOverride {
                reason: o.reason.clone(),
            };
        }
        if schedule.is_weekly_closed(date) {
            return Self::WeeklyClosed;
        }
        Self::Open
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Human-readable closure reason.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Open => None,
            Self::WeeklyClosed => Some("weekly closing day".to_string()),
            Self::ClosedByOverride { reason } => {
                Some(reason.clone().unwrap_or_else(|| "closed".to_string()))
            }
        }
    }
}

/// One grid entry in an availability response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    /// 1-based position in the grid.
    pub id: usize,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub available: bool,
}

/// Availability of one shop (optionally one employee) on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub is_available: bool,
    pub booked_time_slots: Vec<TimeRange>,
    pub available_times: Vec<SlotAvailability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_reason: Option<String>,
}

impl DayAvailability {
    /// Evaluate a day against the grid.
    ///
    /// Closed days mark every slot unavailable and ignore bookings. On open
    /// days a slot is taken when it overlaps any booked interval or when the
    /// override payload declares it unavailable.
    #[must_use]
    pub fn evaluate(
        date: NaiveDate,
        grid: &SlotGrid,
        status: &DayStatus,
        slot_states: &[SlotState],
        booked: &[TimeRange],
    ) -> Self {
        if !status.is_open() {
            return Self {
                date,
                is_available: false,
                booked_time_slots: Vec::new(),
                available_times: entries(grid, |_| false),
                closure_reason: status.reason(),
            };
        }

        let mut booked_time_slots = booked.to_vec();
        booked_time_slots.sort();

        let available_times = entries(grid, |slot| {
            let declared_closed = slot_states
                .iter()
                .any(|s| s.time == slot.start() && !s.available);
            !declared_closed && !booked.iter().any(|b| b.overlaps(slot))
        });

        Self {
            date,
            is_available: true,
            booked_time_slots,
            available_times,
            closure_reason: None,
        }
    }

    /// Every slot available. Used when the backing queries fail.
    #[must_use]
    pub fn all_open(date: NaiveDate, grid: &SlotGrid) -> Self {
        Self {
            date,
            is_available: true,
            booked_time_slots: Vec::new(),
            available_times: entries(grid, |_| true),
            closure_reason: None,
        }
    }

    /// Number of slots still free.
    #[must_use]
    pub fn free_slot_count(&self) -> usize {
        self.available_times.iter().filter(|s| s.available).count()
    }

    /// The grid entry starting at `time`.
    #[must_use]
    pub fn slot(&self, time: NaiveTime) -> Option<&SlotAvailability> {
        self.available_times.iter().find(|s| s.time == time)
    }
}

fn entries(grid: &SlotGrid, available: impl Fn(&TimeRange) -> bool) -> Vec<SlotAvailability> {
    grid.slots()
        .iter()
        .enumerate()
        .map(|(i, slot)| SlotAvailability {
            id: i + 1,
            time: slot.start(),
            end_time: slot.end(),
            available: available(slot),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn evaluate(date: NaiveDate, o: Option<&DayOverride>, booked: &[TimeRange]) -> DayAvailability {
        let schedule = ShopSchedule::default();
        let status = DayStatus::resolve(&schedule, date, o);
        let states = o.map(|o| o.slot_states.clone()).unwrap_or_default();
        DayAvailability::evaluate(date, &schedule.grid(), &status, &states, booked)
    }

    #[test]
    fn test_open_day_without_bookings_is_fully_available() {
        let day = evaluate(monday(), None, &[]);
        assert!(day.is_available);
        assert_eq!(day.available_times.len(), 16);
        assert!(day.available_times.iter().all(|s| s.available));
        assert_eq!(day.free_slot_count(), 16);
    }

    #[test]
    fn test_closed_override_marks_everything_unavailable() {
        let closed = DayOverride {
            is_available: false,
            reason: Some("Public holiday".to_string()),
            slot_states: Vec::new(),
        };
        let booked = [TimeRange::new(t(10, 15), t(11, 0)).unwrap()];
        let day = evaluate(monday(), Some(&closed), &booked);
        assert!(!day.is_available);
        assert_eq!(day.available_times.len(), 16);
        assert!(day.available_times.iter().all(|s| !s.available));
        assert!(day.booked_time_slots.is_empty());
        assert_eq!(day.closure_reason.as_deref(), Some("Public holiday"));
    }

    #[test]
    fn test_sunday_is_closed_server_side() {
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        let day = evaluate(sunday, None, &[]);
        assert!(!day.is_available);
        assert_eq!(day.free_slot_count(), 0);
    }

    #[test]
    fn test_open_override_does_not_reopen_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        let open = DayOverride {
            is_available: true,
            ..DayOverride::default()
        };
        assert!(!evaluate(sunday, Some(&open), &[]).is_available);
    }

    #[test]
    fn test_booking_at_two_pm_only_takes_that_slot() {
        let booked = [TimeRange::new(t(14, 0), t(14, 45)).unwrap()];
        let day = evaluate(monday(), None, &booked);
        assert!(!day.slot(t(14, 0)).unwrap().available);
        assert_eq!(day.free_slot_count(), 15);
        assert_eq!(day.booked_time_slots, booked.to_vec());
    }

    #[test]
    fn test_off_grid_booking_blocks_every_overlapped_slot() {
        // 10:30-11:30 straddles the 10:15 and 11:00 slots.
        let booked = [TimeRange::new(t(10, 30), t(11, 30)).unwrap()];
        let day = evaluate(monday(), None, &booked);
        assert!(!day.slot(t(10, 15)).unwrap().available);
        assert!(!day.slot(t(11, 0)).unwrap().available);
        assert!(day.slot(t(11, 45)).unwrap().available);
        assert_eq!(day.free_slot_count(), 14);
    }

    #[test]
    fn test_override_payload_closes_single_slots() {
        let payload = serde_json::json!([
            {"time": "09:30", "available": false},
            {"time": "10:15", "available": true}
        ]);
        let partial = DayOverride {
            is_available: true,
            reason: None,
            slot_states: SlotState::parse_payload(&payload).unwrap(),
        };
        let day = evaluate(monday(), Some(&partial), &[]);
        assert!(day.is_available);
        assert!(!day.slot(t(9, 30)).unwrap().available);
        assert!(day.slot(t(10, 15)).unwrap().available);
        assert_eq!(day.free_slot_count(), 15);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(SlotState::parse_payload(&serde_json::json!({"slots": 3})).is_err());
        assert!(SlotState::parse_payload(&serde_json::Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_fail_open_result() {
        let day = DayAvailability::all_open(monday(), &SlotGrid::default());
        assert!(day.is_available);
        assert_eq!(day.free_slot_count(), 16);
    }

    #[test]
    fn test_response_shape() {
        let day = evaluate(monday(), None, &[]);
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["date"], "2024-06-10");
        assert_eq!(json["isAvailable"], true);
        assert_eq!(json["availableTimes"][0]["id"], 1);
        assert_eq!(json["availableTimes"][0]["time"], "09:30");
        assert!(json.get("closureReason").is_none());
    }
}
