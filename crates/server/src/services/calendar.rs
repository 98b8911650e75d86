//! Shop calendars: month view, day staff list, team calendar and the
//! override records behind them.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use chairbook_core::schedule::{
    DateRange, DayAvailability, DayStatus, DaySummary, ScheduleError, aggregate,
};
use chairbook_core::wire::calendar_date;
use chairbook_core::{AvailableTimeId, Role, UserId};

use crate::db::{AppointmentRepository, OverrideRepository, RepositoryError, ShopRepository};
use crate::models::{CurrentUser, OverrideRecord, Shop, UpsertOverride};
use crate::services::availability::pick_override;

/// Reasons a calendar operation is refused.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("{0}")]
    Range(#[from] ScheduleError),

    #[error("{0}")]
    Validation(String),

    #[error("you may not manage this shop's schedule")]
    Forbidden,

    #[error("override not found")]
    OverrideNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One staff member's view of a single day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDay {
    pub employee_id: UserId,
    pub name: String,
    pub role: Role,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure_reason: Option<String>,
    pub booked_count: usize,
    pub free_slots: usize,
}

/// A day cell of the team calendar.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDay {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub is_available: bool,
    pub booked_count: u32,
}

/// A staff member's row of the team calendar.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRow {
    pub employee_id: UserId,
    pub name: String,
    pub days: Vec<TeamDay>,
}

/// Calendar queries for one pool.
pub struct CalendarService<'a> {
    pool: &'a PgPool,
    default_capacity: u32,
}

impl<'a> CalendarService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, default_capacity: u32) -> Self {
        Self {
            pool,
            default_capacity,
        }
    }

    /// One summary per day in `range`.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::Repository` if a lookup fails.
    #[instrument(skip(self, shop), fields(shop_id = %shop.id))]
    pub async fn month(
        &self,
        shop: &Shop,
        range: &DateRange,
    ) -> Result<Vec<DaySummary>, CalendarError> {
        let records = OverrideRepository::new(self.pool)
            .in_range(shop.id, range)
            .await?;
        let closures = shop_wide_closures(&records);
        let counts = AppointmentRepository::new(self.pool)
            .counts_by_date(shop.id, range)
            .await?;
        let capacity = shop.schedule.capacity_or(self.default_capacity);

        Ok(aggregate(range, &shop.schedule, capacity, &closures, &counts))
    }

    /// Every staff member's availability for one day.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::Repository` if a lookup fails.
    #[instrument(skip(self, shop), fields(shop_id = %shop.id))]
    pub async fn day_staff(
        &self,
        shop: &Shop,
        date: NaiveDate,
    ) -> Result<Vec<StaffDay>, CalendarError> {
        let staff = ShopRepository::new(self.pool).staff(shop.id).await?;
        let records = OverrideRepository::new(self.pool)
            .for_day(shop.id, date)
            .await?;
        let intervals = AppointmentRepository::new(self.pool)
            .intervals_by_staff(shop.id, date)
            .await?;
        let grid = shop.schedule.grid();

        Ok(staff
            .into_iter()
            .map(|member| {
                let day_override = pick_override(&records, Some(member.id))
                    .map(OverrideRecord::to_day_override);
                let status = DayStatus::resolve(&shop.schedule, date, day_override.as_ref());
                let booked = intervals.get(&member.id).map_or(&[][..], Vec::as_slice);
                let slot_states = day_override.map(|o| o.slot_states).unwrap_or_default();
                let day = DayAvailability::evaluate(date, &grid, &status, &slot_states, booked);

                StaffDay {
                    employee_id: member.id,
                    name: member.display_name(),
                    role: member.role,
                    is_available: day.is_available,
                    closure_reason: status.reason(),
                    booked_count: booked.len(),
                    free_slots: day.free_slot_count(),
                }
            })
            .collect())
    }

    /// Per staff member, per day: open or closed and the booking count.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::Forbidden` unless the actor manages the shop.
    #[instrument(skip(self, actor, shop), fields(shop_id = %shop.id))]
    pub async fn team(
        &self,
        actor: &CurrentUser,
        shop: &Shop,
        range: &DateRange,
    ) -> Result<Vec<TeamRow>, CalendarError> {
        self.ensure_manager(actor, shop).await?;
        let staff = ShopRepository::new(self.pool).staff(shop.id).await?;
        let records = OverrideRepository::new(self.pool)
            .in_range(shop.id, range)
            .await?;
        let counts = AppointmentRepository::new(self.pool)
            .counts_by_staff_and_date(shop.id, range)
            .await?;

        let mut by_date: HashMap<NaiveDate, Vec<OverrideRecord>> = HashMap::new();
        for record in records {
            by_date.entry(record.date).or_default().push(record);
        }

        Ok(staff
            .into_iter()
            .map(|member| {
                let days = range
                    .days()
                    .map(|date| {
                        let day_records = by_date.get(&date).map_or(&[][..], Vec::as_slice);
                        let day_override = pick_override(day_records, Some(member.id))
                            .map(OverrideRecord::to_day_override);
                        let status =
                            DayStatus::resolve(&shop.schedule, date, day_override.as_ref());
                        TeamDay {
                            date,
                            is_available: status.is_open(),
                            booked_count: counts.get(&(member.id, date)).copied().unwrap_or(0),
                        }
                    })
                    .collect();

                TeamRow {
                    employee_id: member.id,
                    name: member.display_name(),
                    days,
                }
            })
            .collect())
    }

    /// Override records in `range`.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::Forbidden` unless the actor manages the shop.
    pub async fn overrides(
        &self,
        actor: &CurrentUser,
        shop: &Shop,
        range: &DateRange,
    ) -> Result<Vec<OverrideRecord>, CalendarError> {
        self.ensure_manager(actor, shop).await?;
        Ok(OverrideRepository::new(self.pool)
            .in_range(shop.id, range)
            .await?)
    }

    /// Create or replace the override for a date and staff set.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::Forbidden` unless the actor manages the shop,
    /// and `CalendarError::Validation` if a listed id is not on its staff.
    #[instrument(skip(self, actor, shop, input), fields(shop_id = %shop.id, date = %input.date))]
    pub async fn upsert_override(
        &self,
        actor: &CurrentUser,
        shop: &Shop,
        input: &UpsertOverride,
    ) -> Result<OverrideRecord, CalendarError> {
        self.ensure_manager(actor, shop).await?;
        let shops = ShopRepository::new(self.pool);
        for &id in &input.staff_ids {
            if !shops.is_staff(shop.id, id).await? {
                return Err(CalendarError::Validation(format!(
                    "user {id} is not on the staff of shop {}",
                    shop.id
                )));
            }
        }
        let record = OverrideRepository::new(self.pool)
            .upsert(shop.id, input)
            .await?;
        tracing::info!(
            override_id = %record.id,
            is_available = record.is_available,
            staff = record.staff_ids.len(),
            "Override saved"
        );
        Ok(record)
    }

    /// Delete an override of the shop.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::Forbidden` unless the actor manages the shop,
    /// and `CalendarError::OverrideNotFound` if the shop has no such override.
    #[instrument(skip(self, actor, shop), fields(shop_id = %shop.id))]
    pub async fn delete_override(
        &self,
        actor: &CurrentUser,
        shop: &Shop,
        id: AvailableTimeId,
    ) -> Result<(), CalendarError> {
        self.ensure_manager(actor, shop).await?;
        OverrideRepository::new(self.pool)
            .delete(shop.id, id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CalendarError::OverrideNotFound,
                other => CalendarError::Repository(other),
            })?;
        tracing::info!(override_id = %id, "Override deleted");
        Ok(())
    }

    async fn ensure_manager(&self, actor: &CurrentUser, shop: &Shop) -> Result<(), CalendarError> {
        let is_staff = ShopRepository::new(self.pool)
            .is_staff(shop.id, actor.id)
            .await?;
        if actor.actor().can_manage_shop(shop.owner_id, is_staff) {
            Ok(())
        } else {
            Err(CalendarError::Forbidden)
        }
    }
}

/// Dates closed by a shop-wide override, with their reason.
fn shop_wide_closures(records: &[OverrideRecord]) -> HashMap<NaiveDate, Option<String>> {
    records
        .iter()
        .filter(|r| r.is_shop_wide() && !r.is_available)
        .map(|r| (r.date, r.reason.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chairbook_core::ShopId;

    fn record(day: u32, available: bool, staff: &[i32], reason: Option<&str>) -> OverrideRecord {
        OverrideRecord {
            id: AvailableTimeId::new(i32::try_from(day).unwrap()),
            shop_id: ShopId::new(1),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            is_available: available,
            time_slots: None,
            reason: reason.map(String::from),
            staff_ids: staff.iter().copied().map(UserId::new).collect(),
        }
    }

    #[test]
    fn test_only_shop_wide_closures_count() {
        let records = [
            record(3, false, &[], Some("Holiday")),
            record(4, false, &[7], Some("Sick")),
            record(5, true, &[], None),
        ];
        let closures = shop_wide_closures(&records);
        assert_eq!(closures.len(), 1);
        let june_3 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(closures.get(&june_3).unwrap().as_deref(), Some("Holiday"));
    }

    #[test]
    fn test_staff_day_serializes_camel_case() {
        let day = StaffDay {
            employee_id: UserId::new(4),
            name: "Alex".to_string(),
            role: Role::Barber,
            is_available: true,
            closure_reason: None,
            booked_count: 2,
            free_slots: 14,
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["employeeId"], 4);
        assert_eq!(json["freeSlots"], 14);
        assert!(json.get("closureReason").is_none());
    }
}
