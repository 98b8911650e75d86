//! Appointment domain types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use chairbook_core::access::AppointmentScope;
use chairbook_core::schedule::TimeRange;
use chairbook_core::wire::{calendar_date, hhmm};
use chairbook_core::{AppointmentId, AppointmentStatus, Lifecycle, ShopId, UserId};

/// A booked appointment.
#[derive(Debug, Clone)]
pub struct Appointment {
    pub id: AppointmentId,
    pub shop_id: ShopId,
    /// Owner of the shop, joined in for permission checks.
    pub shop_owner_id: Option<UserId>,
    pub customer_id: UserId,
    pub employee_id: UserId,
    pub date: NaiveDate,
    pub slot: TimeRange,
    pub notes: Option<String>,
    pub service_name: Option<String>,
    pub status: AppointmentStatus,
    pub has_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    #[must_use]
    pub const fn scope(&self) -> AppointmentScope {
        AppointmentScope {
            customer_id: self.customer_id,
            employee_id: self.employee_id,
            shop_owner_id: self.shop_owner_id,
        }
    }

    /// When the appointment ends, as a naive date-time.
    #[must_use]
    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.slot.end())
    }

    /// Lifecycle stage relative to `now`.
    #[must_use]
    pub fn lifecycle(&self, now: NaiveDateTime) -> Lifecycle {
        Lifecycle::derive(self.ends_at() <= now, self.has_review)
    }

    /// JSON shape of the appointment at `now`.
    #[must_use]
    pub fn view(&self, now: NaiveDateTime) -> AppointmentView {
        AppointmentView {
            id: self.id,
            shop_id: self.shop_id,
            customer_id: self.customer_id,
            employee_id: self.employee_id,
            date: self.date,
            time: self.slot.start(),
            end_time: self.slot.end(),
            notes: self.notes.clone(),
            service_name: self.service_name.clone(),
            status: self.status,
            lifecycle: self.lifecycle(now),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// JSON shape of an appointment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: AppointmentId,
    pub shop_id: ShopId,
    pub customer_id: UserId,
    pub employee_id: UserId,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: chrono::NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: chrono::NaiveTime,
    pub notes: Option<String>,
    pub service_name: Option<String>,
    pub status: AppointmentStatus,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn appointment(has_review: bool) -> Appointment {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        Appointment {
            id: AppointmentId::new(10),
            shop_id: ShopId::new(1),
            shop_owner_id: Some(UserId::new(3)),
            customer_id: UserId::new(1),
            employee_id: UserId::new(2),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            slot: TimeRange::new(at(10, 15), at(11, 0)).unwrap(),
            notes: None,
            service_name: Some("Haircut".to_string()),
            status: AppointmentStatus::Booked,
            has_review,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn moment(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_lifecycle_follows_clock() {
        let appt = appointment(false);
        assert_eq!(appt.lifecycle(moment(10, 10, 30)), Lifecycle::Booked);
        assert_eq!(appt.lifecycle(moment(10, 11, 0)), Lifecycle::Completed);
        assert_eq!(appointment(true).lifecycle(moment(11, 9, 0)), Lifecycle::Reviewed);
    }

    #[test]
    fn test_view_serializes_wire_formats() {
        let json = serde_json::to_value(appointment(false).view(moment(1, 0, 0))).unwrap();
        assert_eq!(json["date"], "2024-06-10");
        assert_eq!(json["time"], "10:15");
        assert_eq!(json["endTime"], "11:00");
        assert_eq!(json["employeeId"], 2);
        assert_eq!(json["status"], "booked");
        assert_eq!(json["lifecycle"], "booked");
    }
}
