//! Appointment lifecycle: create, read, reschedule, cancel.
//!
//! Creation and rescheduling run check-and-write in one transaction that
//! first takes an advisory lock on (employee, date). Concurrent requests for
//! the same employee and day queue behind each other, and the exclusion
//! constraint on `appointments` rejects anything that still slips through.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use tracing::instrument;

use chairbook_core::booking::{AppointmentPatch, CreateAppointment, clean_notes};
use chairbook_core::schedule::{TimeRange, first_conflict};
use chairbook_core::{AppointmentId, UserId};

use crate::db::appointments::{self as appointment_db, AppointmentChanges, NewAppointment};
use crate::db::{AppointmentRepository, RepositoryError, ShopRepository, UserRepository};
use crate::models::{Appointment, CurrentUser, Shop};
use crate::services::availability::AvailabilityService;

/// Reasons a booking operation is refused.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// The request is malformed or names an invalid party.
    #[error("{0}")]
    Validation(String),

    #[error("shop not found")]
    ShopNotFound,

    #[error("appointment not found")]
    NotFound,

    #[error("you do not have access to this appointment")]
    Forbidden,

    #[error("shop is closed on {0}")]
    Closed(NaiveDate),

    /// The requested interval overlaps this existing booking.
    #[error("time slot {0} is already booked")]
    SlotTaken(TimeRange),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Booking operations for one pool.
pub struct BookingService<'a> {
    pool: &'a PgPool,
}

impl<'a> BookingService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Book an appointment.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty interval, an unknown customer, an
    ///   employee who is not staff of the shop, or a shop without staff
    /// - `ShopNotFound` if the shop does not exist
    /// - `Closed` if the shop is closed that day
    /// - `SlotTaken` if the interval overlaps an existing booking
    #[instrument(skip(self, actor, request), fields(user_id = %actor.id, shop_id = %request.shop_id))]
    pub async fn create(
        &self,
        actor: &CurrentUser,
        request: CreateAppointment,
    ) -> Result<Appointment, BookingError> {
        let slot = request
            .interval()
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        let shop = ShopRepository::new(self.pool)
            .get(request.shop_id)
            .await?
            .ok_or(BookingError::ShopNotFound)?;

        let customer_id = self.resolve_customer(actor, request.customer_id).await?;
        let employee_id = self.resolve_employee(&shop, request.employee_id).await?;
        self.ensure_open(&shop, employee_id, request.date).await?;

        let new = NewAppointment {
            shop_id: shop.id,
            customer_id,
            employee_id,
            date: request.date,
            slot,
            notes: clean_notes(request.notes),
            service_name: clean_notes(request.service_name),
        };

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        appointment_db::lock_employee_day(&mut tx, employee_id, new.date).await?;

        let existing = appointment_db::employee_intervals(&mut tx, employee_id, new.date, None).await?;
        if let Some(clash) = first_conflict(&slot, &existing) {
            return Err(BookingError::SlotTaken(clash));
        }

        let id = appointment_db::insert(&mut tx, &new)
            .await
            .map_err(|e| conflict_as_taken(e, slot))?;
        let appointment = appointment_db::fetch(&mut tx, id)
            .await?
            .ok_or(BookingError::NotFound)?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            appointment_id = %appointment.id,
            employee_id = %employee_id,
            date = %appointment.date,
            slot = %appointment.slot,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// Read an appointment the actor may see.
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist, `Forbidden` if the actor may not see it.
    pub async fn get(
        &self,
        actor: &CurrentUser,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        let appointment = AppointmentRepository::new(self.pool)
            .get(id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !actor.actor().can_view(&appointment.scope()) {
            return Err(BookingError::Forbidden);
        }
        Ok(appointment)
    }

    /// Apply a partial update.
    ///
    /// Fields the actor's role may not write are dropped. Moving the
    /// appointment re-runs the closure and conflict checks, ignoring the
    /// appointment itself.
    ///
    /// # Errors
    ///
    /// As [`Self::get`], plus `Validation`, `Closed` and `SlotTaken` for
    /// schedule changes.
    #[instrument(skip(self, actor, patch), fields(user_id = %actor.id))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> Result<Appointment, BookingError> {
        let current = self.get(actor, id).await?;
        let patch = patch.restrict_to(actor.role);
        if patch.is_empty() {
            return Ok(current);
        }

        let changes = merge(&current, &patch)?;
        let moved = changes.employee_id != current.employee_id
            || changes.date != current.date
            || changes.slot != current.slot;

        if moved {
            let shop = ShopRepository::new(self.pool)
                .get(current.shop_id)
                .await?
                .ok_or(BookingError::ShopNotFound)?;
            if changes.employee_id != current.employee_id {
                self.resolve_employee(&shop, Some(changes.employee_id))
                    .await?;
            }
            self.ensure_open(&shop, changes.employee_id, changes.date)
                .await?;
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        if moved {
            appointment_db::lock_employee_day(&mut tx, changes.employee_id, changes.date).await?;
            let existing = appointment_db::employee_intervals(
                &mut tx,
                changes.employee_id,
                changes.date,
                Some(id),
            )
            .await?;
            if let Some(clash) = first_conflict(&changes.slot, &existing) {
                return Err(BookingError::SlotTaken(clash));
            }
        }

        appointment_db::update(&mut tx, id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BookingError::NotFound,
                other => conflict_as_taken(other, changes.slot),
            })?;
        let appointment = appointment_db::fetch(&mut tx, id)
            .await?
            .ok_or(BookingError::NotFound)?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(appointment_id = %id, moved, "Appointment updated");
        Ok(appointment)
    }

    /// Cancel (permanently delete) an appointment.
    ///
    /// # Errors
    ///
    /// As [`Self::get`].
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn delete(&self, actor: &CurrentUser, id: AppointmentId) -> Result<(), BookingError> {
        self.get(actor, id).await?;
        AppointmentRepository::new(self.pool)
            .delete(id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BookingError::NotFound,
                other => BookingError::Repository(other),
            })?;
        tracing::info!(appointment_id = %id, "Appointment cancelled");
        Ok(())
    }

    /// Customers book for themselves; staff and admins may name a customer.
    async fn resolve_customer(
        &self,
        actor: &CurrentUser,
        requested: Option<UserId>,
    ) -> Result<UserId, BookingError> {
        match requested {
            Some(id) if id != actor.id && actor.actor().can_book_for_others() => {
                if UserRepository::new(self.pool).exists(id).await? {
                    Ok(id)
                } else {
                    Err(BookingError::Validation(format!("unknown customer {id}")))
                }
            }
            _ => Ok(actor.id),
        }
    }

    /// An explicit employee must be staff of the shop. Without one, the
    /// shop's first staff member is assigned.
    async fn resolve_employee(
        &self,
        shop: &Shop,
        requested: Option<UserId>,
    ) -> Result<UserId, BookingError> {
        let shops = ShopRepository::new(self.pool);
        match requested {
            Some(id) => {
                if shops.is_staff(shop.id, id).await? {
                    Ok(id)
                } else {
                    Err(BookingError::Validation(format!(
                        "employee {id} does not work at this shop"
                    )))
                }
            }
            None => shops.first_staff(shop.id).await?.ok_or_else(|| {
                BookingError::Validation("shop has no staff to assign".to_string())
            }),
        }
    }

    async fn ensure_open(
        &self,
        shop: &Shop,
        employee_id: UserId,
        date: NaiveDate,
    ) -> Result<(), BookingError> {
        let (status, _) = AvailabilityService::new(self.pool)
            .day_status(shop, Some(employee_id), date)
            .await?;
        if status.is_open() {
            Ok(())
        } else {
            Err(BookingError::Closed(date))
        }
    }
}

/// Merge a role-filtered patch into the current values.
fn merge(current: &Appointment, patch: &AppointmentPatch) -> Result<AppointmentChanges, BookingError> {
    let start = patch.time.unwrap_or_else(|| current.slot.start());
    let end = patch.end_time.unwrap_or_else(|| current.slot.end());
    let slot = if patch.time.is_some() || patch.end_time.is_some() {
        TimeRange::new(start, end).map_err(|e| BookingError::Validation(e.to_string()))?
    } else {
        current.slot
    };

    Ok(AppointmentChanges {
        employee_id: patch.employee_id.unwrap_or(current.employee_id),
        date: patch.date.unwrap_or(current.date),
        slot,
        notes: match &patch.notes {
            Some(notes) => clean_notes(Some(notes.clone())),
            None => current.notes.clone(),
        },
        status: patch.status.unwrap_or(current.status),
    })
}

/// A constraint violation on write means a concurrent booking won the race.
fn conflict_as_taken(err: RepositoryError, slot: TimeRange) -> BookingError {
    match err {
        RepositoryError::Conflict(constraint) => {
            tracing::warn!(%constraint, %slot, "Booking rejected by database constraint");
            BookingError::SlotTaken(slot)
        }
        other => BookingError::Repository(other),
    }
}

/// Current wall-clock time used for lifecycle and `past` filtering.
#[must_use]
pub fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chairbook_core::{AppointmentStatus, Role, ShopId};
    use chrono::{NaiveTime, Utc};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn current() -> Appointment {
        Appointment {
            id: AppointmentId::new(1),
            shop_id: ShopId::new(1),
            shop_owner_id: None,
            customer_id: UserId::new(1),
            employee_id: UserId::new(2),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            slot: TimeRange::new(at(10, 15), at(11, 0)).unwrap(),
            notes: Some("fade".to_string()),
            service_name: None,
            status: AppointmentStatus::Booked,
            has_review: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_keeps_unpatched_fields() {
        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Confirmed),
            ..AppointmentPatch::default()
        };
        let changes = merge(&current(), &patch).unwrap();
        assert_eq!(changes.status, AppointmentStatus::Confirmed);
        assert_eq!(changes.slot, current().slot);
        assert_eq!(changes.notes.as_deref(), Some("fade"));
        assert_eq!(changes.employee_id, UserId::new(2));
    }

    #[test]
    fn test_merge_moves_start_only() {
        let patch = AppointmentPatch {
            time: Some(at(10, 30)),
            ..AppointmentPatch::default()
        };
        let changes = merge(&current(), &patch).unwrap();
        assert_eq!(changes.slot.to_string(), "10:30-11:00");
    }

    #[test]
    fn test_merge_rejects_inverted_interval() {
        let patch = AppointmentPatch {
            time: Some(at(11, 30)),
            ..AppointmentPatch::default()
        };
        assert!(matches!(
            merge(&current(), &patch),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_merge_blank_notes_clear() {
        let patch = AppointmentPatch {
            notes: Some("   ".to_string()),
            ..AppointmentPatch::default()
        };
        assert_eq!(merge(&current(), &patch).unwrap().notes, None);
    }

    #[test]
    fn test_customer_patch_never_moves() {
        let patch = AppointmentPatch {
            employee_id: Some(UserId::new(9)),
            date: Some(NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()),
            ..AppointmentPatch::default()
        }
        .restrict_to(Role::Customer);
        let changes = merge(&current(), &patch).unwrap();
        assert_eq!(changes.employee_id, UserId::new(2));
        assert_eq!(changes.date, current().date);
    }

    #[test]
    fn test_constraint_conflict_becomes_slot_taken() {
        let slot = TimeRange::new(at(10, 15), at(11, 0)).unwrap();
        let err = conflict_as_taken(
            RepositoryError::Conflict("appointments_no_overlap".to_string()),
            slot,
        );
        assert_eq!(err.to_string(), "time slot 10:15-11:00 is already booked");
    }
}
