//! Availability evaluation against stored data.
//!
//! Loads the shop schedule, the applicable override and booked intervals,
//! then hands them to the pure evaluator in `chairbook_core::schedule`.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use chairbook_core::schedule::{DayAvailability, DayOverride, DayStatus};
use chairbook_core::{ShopId, UserId};

use crate::db::{AppointmentRepository, OverrideRepository, RepositoryError, ShopRepository};
use crate::models::{OverrideRecord, Shop};

/// Pick the override that applies to `employee`.
///
/// A record linked to the employee wins over the shop-wide record (one with
/// no staff links). Records linked only to other staff never apply.
#[must_use]
pub fn pick_override(
    records: &[OverrideRecord],
    employee: Option<UserId>,
) -> Option<&OverrideRecord> {
    employee
        .and_then(|id| records.iter().find(|r| r.staff_ids.contains(&id)))
        .or_else(|| records.iter().find(|r| r.is_shop_wide()))
}

/// Availability lookups for one pool.
pub struct AvailabilityService<'a> {
    pool: &'a PgPool,
}

impl<'a> AvailabilityService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve the employee a lookup is about.
    ///
    /// An explicit id is used as given. Without one, the shop's first staff
    /// member is used; a shop with no staff is evaluated shop-wide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the staff lookup fails.
    pub async fn resolve_employee(
        &self,
        shop_id: ShopId,
        employee: Option<UserId>,
    ) -> Result<Option<UserId>, RepositoryError> {
        match employee {
            Some(id) => Ok(Some(id)),
            None => ShopRepository::new(self.pool).first_staff(shop_id).await,
        }
    }

    /// Day status and override for a shop (and optionally an employee).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the override lookup fails.
    pub async fn day_status(
        &self,
        shop: &Shop,
        employee: Option<UserId>,
        date: NaiveDate,
    ) -> Result<(DayStatus, Option<DayOverride>), RepositoryError> {
        let records = OverrideRepository::new(self.pool)
            .for_day(shop.id, date)
            .await?;
        let day_override = pick_override(&records, employee).map(OverrideRecord::to_day_override);
        let status = DayStatus::resolve(&shop.schedule, date, day_override.as_ref());
        Ok((status, day_override))
    }

    /// Evaluate every grid slot for a day. Errors propagate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any lookup fails.
    #[instrument(skip(self, shop), fields(shop_id = %shop.id))]
    pub async fn evaluate(
        &self,
        shop: &Shop,
        employee: Option<UserId>,
        date: NaiveDate,
    ) -> Result<DayAvailability, RepositoryError> {
        let (status, day_override) = self.day_status(shop, employee, date).await?;
        let grid = shop.schedule.grid();

        let booked = if status.is_open() {
            AppointmentRepository::new(self.pool)
                .booked_intervals(shop.id, employee, date)
                .await?
        } else {
            Vec::new()
        };

        let slot_states = day_override.map(|o| o.slot_states).unwrap_or_default();
        Ok(DayAvailability::evaluate(
            date,
            &grid,
            &status,
            &slot_states,
            &booked,
        ))
    }

    /// Evaluate for the public availability check. Never fails.
    ///
    /// Repository errors are logged and answered with every slot open.
    #[instrument(skip(self, shop), fields(shop_id = %shop.id))]
    pub async fn evaluate_fail_open(
        &self,
        shop: &Shop,
        employee: Option<UserId>,
        date: NaiveDate,
    ) -> DayAvailability {
        let result = match self.resolve_employee(shop.id, employee).await {
            Ok(employee) => self.evaluate(shop, employee, date).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, %date, "Availability lookup failed, answering all-open");
            DayAvailability::all_open(date, &shop.schedule.grid())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chairbook_core::AvailableTimeId;

    fn record(id: i32, available: bool, staff: &[i32]) -> OverrideRecord {
        OverrideRecord {
            id: AvailableTimeId::new(id),
            shop_id: ShopId::new(1),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            is_available: available,
            time_slots: None,
            reason: None,
            staff_ids: staff.iter().copied().map(UserId::new).collect(),
        }
    }

    #[test]
    fn test_employee_record_wins_over_shop_wide() {
        let records = [record(1, true, &[]), record(2, false, &[4])];
        let picked = pick_override(&records, Some(UserId::new(4))).unwrap();
        assert_eq!(picked.id, AvailableTimeId::new(2));
    }

    #[test]
    fn test_falls_back_to_shop_wide() {
        let records = [record(1, false, &[]), record(2, false, &[4])];
        let picked = pick_override(&records, Some(UserId::new(5))).unwrap();
        assert_eq!(picked.id, AvailableTimeId::new(1));
        let picked = pick_override(&records, None).unwrap();
        assert_eq!(picked.id, AvailableTimeId::new(1));
    }

    #[test]
    fn test_other_staff_records_never_apply() {
        let records = [record(2, false, &[4])];
        assert!(pick_override(&records, Some(UserId::new(5))).is_none());
        assert!(pick_override(&records, None).is_none());
        assert!(pick_override(&[], None).is_none());
    }
}
