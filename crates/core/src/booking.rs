//! Appointment request bodies and role-based field filtering.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::schedule::{ScheduleError, TimeRange};
use crate::types::{AppointmentStatus, Role, ShopId, UserId};
use crate::wire::{calendar_date, hhmm, lenient_user_id};

/// Body of `POST /appointments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointment {
    pub shop_id: ShopId,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_user_id::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub employee_id: Option<UserId>,
    /// Only honoured for staff and admins booking on a customer's behalf.
    #[serde(
        default,
        deserialize_with = "lenient_user_id::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

impl CreateAppointment {
    /// The requested interval.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::EmptyInterval`] if `endTime` is not after `time`.
    pub fn interval(&self) -> Result<TimeRange, ScheduleError> {
        TimeRange::new(self.time, self.end_time)
    }
}

/// Body of `PATCH /appointments/{id}`.
///
/// Every field is optional. [`AppointmentPatch::restrict_to`] drops the
/// fields the caller's role may not write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(
        default,
        with = "calendar_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(
        default,
        deserialize_with = "lenient_user_id::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub employee_id: Option<UserId>,
}

impl AppointmentPatch {
    /// Keep only the fields `role` may change.
    ///
    /// Customers may change `notes` and `status`; everyone else may also
    /// reschedule and reassign. Dropped fields are not an error.
    #[must_use]
    pub fn restrict_to(self, role: Role) -> Self {
        if role.can_manage_schedule() {
            return self;
        }
        Self {
            notes: self.notes,
            status: self.status,
            ..Self::default()
        }
    }

    /// Whether the patch moves the appointment in time or to another employee.
    #[must_use]
    pub const fn touches_schedule(&self) -> bool {
        self.date.is_some()
            || self.time.is_some()
            || self.end_time.is_some()
            || self.employee_id.is_some()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.notes.is_none() && self.status.is_none() && !self.touches_schedule()
    }
}

/// Normalize free-text notes: trimmed, empty becomes `None`.
#[must_use]
pub fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn full_patch() -> AppointmentPatch {
        serde_json::from_value(serde_json::json!({
            "notes": "skin fade",
            "status": "confirmed",
            "date": "2024-06-11",
            "time": "11:00",
            "endTime": "11:45",
            "employeeId": 9
        }))
        .unwrap()
    }

    #[test]
    fn test_customer_patch_drops_schedule_fields() {
        let patch = full_patch().restrict_to(Role::Customer);
        assert_eq!(patch.notes.as_deref(), Some("skin fade"));
        assert_eq!(patch.status, Some(AppointmentStatus::Confirmed));
        assert_eq!(patch.employee_id, None);
        assert_eq!(patch.date, None);
        assert_eq!(patch.time, None);
        assert_eq!(patch.end_time, None);
        assert!(!patch.touches_schedule());
    }

    #[test]
    fn test_staff_patch_keeps_everything() {
        for role in [Role::Employee, Role::Barber, Role::Admin] {
            let patch = full_patch().restrict_to(role);
            assert_eq!(patch, full_patch());
            assert!(patch.touches_schedule());
        }
    }

    #[test]
    fn test_customer_employee_only_patch_becomes_empty() {
        let patch: AppointmentPatch =
            serde_json::from_value(serde_json::json!({"employeeId": "12"})).unwrap();
        assert!(!patch.is_empty());
        assert!(patch.restrict_to(Role::Customer).is_empty());
    }

    #[test]
    fn test_create_body_parses_wire_formats() {
        let body: CreateAppointment = serde_json::from_value(serde_json::json!({
            "shopId": 1,
            "date": "2024-06-10T00:00:00.000Z",
            "time": "10:15",
            "endTime": "11:00",
            "employeeId": "undefined"
        }))
        .unwrap();
        assert_eq!(body.date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(body.employee_id, None);
        assert_eq!(body.interval().unwrap().to_string(), "10:15-11:00");
    }

    #[test]
    fn test_create_body_rejects_inverted_interval() {
        let body: CreateAppointment = serde_json::from_value(serde_json::json!({
            "shopId": 1, "date": "2024-06-10", "time": "11:00", "endTime": "10:15"
        }))
        .unwrap();
        assert!(body.interval().is_err());
    }

    #[test]
    fn test_clean_notes() {
        assert_eq!(clean_notes(Some("  ".to_string())), None);
        assert_eq!(clean_notes(Some(" beard ".to_string())).as_deref(), Some("beard"));
        assert_eq!(clean_notes(None), None);
    }
}
