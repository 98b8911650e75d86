//! Client-held booking draft.
//!
//! A booking is assembled in steps: pick a date, then a staff member and a
//! slot, then confirm with optional notes. Nothing is stored server-side
//! until the confirmed draft is submitted as a [`CreateAppointment`].
//! Each step is its own type, so a draft cannot be submitted before a slot
//! has been chosen.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::booking::{CreateAppointment, clean_notes};
use crate::schedule::{DayAvailability, TimeRange};
use crate::types::{ShopId, UserId};

/// Reasons a draft step is refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("availability is for {found}, draft is for {expected}")]
    DateMismatch { expected: NaiveDate, found: NaiveDate },
    #[error("no slot starts at {0}")]
    UnknownSlot(String),
    #[error("slot {0} is not available")]
    SlotUnavailable(String),
}

/// First step: shop and date chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSelected {
    pub shop_id: ShopId,
    pub date: NaiveDate,
}

/// Second step: staff member (or "anyone") and slot chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffTimeSelected {
    pub shop_id: ShopId,
    pub date: NaiveDate,
    pub employee_id: Option<UserId>,
    pub slot: TimeRange,
}

/// Final step: ready to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmed {
    pub shop_id: ShopId,
    pub date: NaiveDate,
    pub employee_id: Option<UserId>,
    pub slot: TimeRange,
    pub notes: Option<String>,
    pub service_name: Option<String>,
}

/// A draft at any step, for storing in client state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DraftBooking {
    DateSelected(DateSelected),
    StaffTimeSelected(StaffTimeSelected),
    Confirmed(Confirmed),
}

impl DateSelected {
    #[must_use]
    pub const fn new(shop_id: ShopId, date: NaiveDate) -> Self {
        Self { shop_id, date }
    }

    /// Choose a slot from an availability response for the same date.
    ///
    /// # Errors
    ///
    /// Fails when the availability belongs to another date, when no grid
    /// slot starts at `time`, or when that slot is taken.
    pub fn choose_slot(
        self,
        employee_id: Option<UserId>,
        availability: &DayAvailability,
        time: NaiveTime,
    ) -> Result<StaffTimeSelected, DraftError> {
        if availability.date != self.date {
            return Err(DraftError::DateMismatch {
                expected: self.date,
                found: availability.date,
            });
        }
        let label = crate::wire::format_clock(time);
        let entry = availability
            .slot(time)
            .ok_or_else(|| DraftError::UnknownSlot(label.clone()))?;
        if !availability.is_available || !entry.available {
            return Err(DraftError::SlotUnavailable(label));
        }
        let slot = TimeRange::new(entry.time, entry.end_time)
            .map_err(|_| DraftError::UnknownSlot(label))?;

        Ok(StaffTimeSelected {
            shop_id: self.shop_id,
            date: self.date,
            employee_id,
            slot,
        })
    }
}

impl StaffTimeSelected {
    /// Go back and pick a different date.
    #[must_use]
    pub const fn back(self) -> DateSelected {
        DateSelected {
            shop_id: self.shop_id,
            date: self.date,
        }
    }

    #[must_use]
    pub fn confirm(self, notes: Option<String>, service_name: Option<String>) -> Confirmed {
        Confirmed {
            shop_id: self.shop_id,
            date: self.date,
            employee_id: self.employee_id,
            slot: self.slot,
            notes: clean_notes(notes),
            service_name: clean_notes(service_name),
        }
    }
}

impl Confirmed {
    /// The request body for `POST /appointments`.
    #[must_use]
    pub fn into_request(self) -> CreateAppointment {
        CreateAppointment {
            shop_id: self.shop_id,
            date: self.date,
            time: self.slot.start(),
            end_time: self.slot.end(),
            notes: self.notes,
            employee_id: self.employee_id,
            customer_id: None,
            service_name: self.service_name,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schedule::{DayStatus, SlotGrid};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn availability(booked: &[TimeRange]) -> DayAvailability {
        DayAvailability::evaluate(day(), &SlotGrid::default(), &DayStatus::Open, &[], booked)
    }

    #[test]
    fn test_full_flow_produces_request() {
        let request = DateSelected::new(ShopId::new(1), day())
            .choose_slot(Some(UserId::new(4)), &availability(&[]), at(10, 15))
            .unwrap()
            .confirm(Some("  fade  ".to_string()), None)
            .into_request();

        assert_eq!(request.shop_id, ShopId::new(1));
        assert_eq!(request.time, at(10, 15));
        assert_eq!(request.end_time, at(11, 0));
        assert_eq!(request.employee_id, Some(UserId::new(4)));
        assert_eq!(request.notes.as_deref(), Some("fade"));
    }

    #[test]
    fn test_taken_slot_is_refused() {
        let booked = [TimeRange::new(at(10, 15), at(11, 0)).unwrap()];
        let err = DateSelected::new(ShopId::new(1), day())
            .choose_slot(None, &availability(&booked), at(10, 15))
            .unwrap_err();
        assert_eq!(err, DraftError::SlotUnavailable("10:15".to_string()));
    }

    #[test]
    fn test_off_grid_time_is_refused() {
        let err = DateSelected::new(ShopId::new(1), day())
            .choose_slot(None, &availability(&[]), at(10, 0))
            .unwrap_err();
        assert!(matches!(err, DraftError::UnknownSlot(_)));
    }

    #[test]
    fn test_other_date_is_refused() {
        let other = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
        let err = DateSelected::new(ShopId::new(1), other)
            .choose_slot(None, &availability(&[]), at(10, 15))
            .unwrap_err();
        assert!(matches!(err, DraftError::DateMismatch { .. }));
    }

    #[test]
    fn test_draft_serializes_with_step_tag() {
        let draft = DraftBooking::DateSelected(DateSelected::new(ShopId::new(2), day()));
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["step"], "date_selected");
        assert_eq!(json["shopId"], 2);
    }
}
