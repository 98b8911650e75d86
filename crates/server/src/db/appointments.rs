//! Appointment repository.
//!
//! Reads go through [`AppointmentRepository`]. Writes that must be checked
//! against existing bookings take a `&mut PgConnection` so the booking
//! service can run lock, check and write inside one transaction.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{PgConnection, PgPool};

use chairbook_core::access::Actor;
use chairbook_core::schedule::{DateRange, TimeRange};
use chairbook_core::{AppointmentId, AppointmentStatus, ShopId, UserId};

use super::RepositoryError;
use crate::models::Appointment;

const APPOINTMENT_SELECT: &str = r"
    SELECT a.id, a.shop_id, s.owner_id AS shop_owner_id, a.customer_id, a.employee_id,
           a.date, a.start_time, a.end_time, a.notes, a.service_name, a.status,
           EXISTS (SELECT 1 FROM reviews r WHERE r.appointment_id = a.id) AS has_review,
           a.created_at, a.updated_at
    FROM appointments a
    JOIN shops s ON s.id = a.shop_id
";

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: AppointmentId,
    shop_id: ShopId,
    shop_owner_id: Option<UserId>,
    customer_id: UserId,
    employee_id: UserId,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    notes: Option<String>,
    service_name: Option<String>,
    status: AppointmentStatus,
    has_review: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = RepositoryError;

    fn try_from(r: AppointmentRow) -> Result<Self, Self::Error> {
        let slot = TimeRange::new(r.start_time, r.end_time).map_err(|e| {
            RepositoryError::DataCorruption(format!("appointment {}: {e}", r.id))
        })?;

        Ok(Self {
            id: r.id,
            shop_id: r.shop_id,
            shop_owner_id: r.shop_owner_id,
            customer_id: r.customer_id,
            employee_id: r.employee_id,
            date: r.date,
            slot,
            notes: r.notes,
            service_name: r.service_name,
            status: r.status,
            has_review: r.has_review,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IntervalRow {
    employee_id: UserId,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl IntervalRow {
    fn range(&self) -> Option<TimeRange> {
        TimeRange::new(self.start_time, self.end_time).ok()
    }
}

/// Filters for listing appointments.
#[derive(Debug, Clone)]
pub struct AppointmentFilter {
    pub shop_id: Option<ShopId>,
    pub date: Option<NaiveDate>,
    pub employee_id: Option<UserId>,
    /// `Some(true)`: ended before `now`. `Some(false)`: not ended yet.
    pub past: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

/// Values written when creating an appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub shop_id: ShopId,
    pub customer_id: UserId,
    pub employee_id: UserId,
    pub date: NaiveDate,
    pub slot: TimeRange,
    pub notes: Option<String>,
    pub service_name: Option<String>,
}

/// Full set of mutable values after a patch has been merged.
#[derive(Debug, Clone)]
pub struct AppointmentChanges {
    pub employee_id: UserId,
    pub date: NaiveDate,
    pub slot: TimeRange,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

/// An appointment whose notes still carry a legacy employee marker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LegacyNotesRow {
    pub id: AppointmentId,
    pub employee_id: UserId,
    pub notes: String,
}

/// Repository for appointment reads and simple writes.
pub struct AppointmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppointmentRepository<'a> {
    /// Create a new appointment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an appointment by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = $1");
        sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    /// List the appointments `actor` may see, ordered by date and start time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        actor: Actor,
        filter: &AppointmentFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!(
            r"{APPOINTMENT_SELECT}
            WHERE ($1::user_role = 'admin'
                   OR ($1 = 'customer' AND a.customer_id = $2)
                   OR ($1 = 'employee' AND a.employee_id = $2)
                   OR ($1 = 'barber' AND (a.employee_id = $2 OR s.owner_id = $2)))
              AND ($3::int IS NULL OR a.shop_id = $3)
              AND ($4::date IS NULL OR a.date = $4)
              AND ($5::int IS NULL OR a.employee_id = $5)
              AND ($6::bool IS NULL
                   OR ($6 AND a.date + a.end_time <= $7)
                   OR (NOT $6 AND a.date + a.end_time > $7))
            ORDER BY a.date, a.start_time, a.id
            LIMIT $8 OFFSET $9
            "
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(actor.role)
            .bind(actor.user_id)
            .bind(filter.shop_id)
            .bind(filter.date)
            .bind(filter.employee_id)
            .bind(filter.past)
            .bind(now)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    /// Booked intervals on `date`.
    ///
    /// With an employee, every booking of that employee counts, whichever
    /// shop it is in. Without one, every booking in the shop counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn booked_intervals(
        &self,
        shop_id: ShopId,
        employee_id: Option<UserId>,
        date: NaiveDate,
    ) -> Result<Vec<TimeRange>, RepositoryError> {
        let rows = sqlx::query_as::<_, IntervalRow>(
            r"
            SELECT employee_id, start_time, end_time
            FROM appointments
            WHERE date = $3
              AND CASE WHEN $2::int IS NULL THEN shop_id = $1 ELSE employee_id = $2 END
            ORDER BY start_time
            ",
        )
        .bind(shop_id)
        .bind(employee_id)
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.iter().filter_map(IntervalRow::range).collect())
    }

    /// Booked intervals on `date` for every staff member of the shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn intervals_by_staff(
        &self,
        shop_id: ShopId,
        date: NaiveDate,
    ) -> Result<HashMap<UserId, Vec<TimeRange>>, RepositoryError> {
        let rows = sqlx::query_as::<_, IntervalRow>(
            r"
            SELECT a.employee_id, a.start_time, a.end_time
            FROM appointments a
            JOIN shop_staff ss ON ss.user_id = a.employee_id AND ss.shop_id = $1
            WHERE a.date = $2
            ORDER BY a.start_time
            ",
        )
        .bind(shop_id)
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        let mut by_staff: HashMap<UserId, Vec<TimeRange>> = HashMap::new();
        for row in &rows {
            if let Some(range) = row.range() {
                by_staff.entry(row.employee_id).or_default().push(range);
            }
        }
        Ok(by_staff)
    }

    /// Number of appointments per day in the shop, in one grouped query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts_by_date(
        &self,
        shop_id: ShopId,
        range: &DateRange,
    ) -> Result<HashMap<NaiveDate, u32>, RepositoryError> {
        let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
            r"
            SELECT date, COUNT(*)
            FROM appointments
            WHERE shop_id = $1 AND date BETWEEN $2 AND $3
            GROUP BY date
            ",
        )
        .bind(shop_id)
        .bind(range.start())
        .bind(range.end())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, count)| (date, u32::try_from(count).unwrap_or(u32::MAX)))
            .collect())
    }

    /// Number of appointments per staff member and day in the shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts_by_staff_and_date(
        &self,
        shop_id: ShopId,
        range: &DateRange,
    ) -> Result<HashMap<(UserId, NaiveDate), u32>, RepositoryError> {
        let rows: Vec<(UserId, NaiveDate, i64)> = sqlx::query_as(
            r"
            SELECT employee_id, date, COUNT(*)
            FROM appointments
            WHERE shop_id = $1 AND date BETWEEN $2 AND $3
            GROUP BY employee_id, date
            ",
        )
        .bind(shop_id)
        .bind(range.start())
        .bind(range.end())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(employee, date, count)| {
                ((employee, date), u32::try_from(count).unwrap_or(u32::MAX))
            })
            .collect())
    }

    /// Permanently delete an appointment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the appointment does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Appointments whose notes contain an `EmployeeId:` marker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn with_legacy_notes(&self) -> Result<Vec<LegacyNotesRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, LegacyNotesRow>(
            r"
            SELECT id, employee_id, notes
            FROM appointments
            WHERE notes ~* 'EmployeeId:\s*\d+'
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Rewrite notes and employee after a legacy cleanup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the move would overlap another booking.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn apply_legacy_cleanup(
        &self,
        id: AppointmentId,
        employee_id: UserId,
        notes: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE appointments SET employee_id = $2, notes = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(employee_id)
        .bind(notes)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;
        Ok(())
    }
}

// =============================================================================
// Transactional operations
// =============================================================================

/// Serialize bookings for one employee and day until the transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the lock cannot be taken.
pub async fn lock_employee_day(
    conn: &mut PgConnection,
    employee_id: UserId,
    date: NaiveDate,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(employee_id.as_i32())
        .bind(date.num_days_from_ce())
        .execute(conn)
        .await?;
    Ok(())
}

/// Intervals the employee is already booked for on `date`, optionally
/// ignoring one appointment (the one being rescheduled).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn employee_intervals(
    conn: &mut PgConnection,
    employee_id: UserId,
    date: NaiveDate,
    exclude: Option<AppointmentId>,
) -> Result<Vec<TimeRange>, RepositoryError> {
    let rows = sqlx::query_as::<_, IntervalRow>(
        r"
        SELECT employee_id, start_time, end_time
        FROM appointments
        WHERE employee_id = $1 AND date = $2 AND ($3::int IS NULL OR id <> $3)
        ORDER BY start_time
        ",
    )
    .bind(employee_id)
    .bind(date)
    .bind(exclude)
    .fetch_all(conn)
    .await?;

    Ok(rows.iter().filter_map(IntervalRow::range).collect())
}

/// Insert an appointment.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a unique or exclusion violation.
/// Returns `RepositoryError::Database` if the insert fails otherwise.
pub async fn insert(
    conn: &mut PgConnection,
    new: &NewAppointment,
) -> Result<AppointmentId, RepositoryError> {
    let id = sqlx::query_scalar::<_, AppointmentId>(
        r"
        INSERT INTO appointments
            (shop_id, customer_id, employee_id, date, start_time, end_time, notes, service_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        ",
    )
    .bind(new.shop_id)
    .bind(new.customer_id)
    .bind(new.employee_id)
    .bind(new.date)
    .bind(new.slot.start())
    .bind(new.slot.end())
    .bind(&new.notes)
    .bind(&new.service_name)
    .fetch_one(conn)
    .await
    .map_err(RepositoryError::from_write)?;
    Ok(id)
}

/// Write merged changes to an appointment.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the appointment no longer exists.
/// Returns `RepositoryError::Conflict` on a unique or exclusion violation.
/// Returns `RepositoryError::Database` if the update fails otherwise.
pub async fn update(
    conn: &mut PgConnection,
    id: AppointmentId,
    changes: &AppointmentChanges,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE appointments
        SET employee_id = $2, date = $3, start_time = $4, end_time = $5,
            notes = $6, status = $7, updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(changes.employee_id)
    .bind(changes.date)
    .bind(changes.slot.start())
    .bind(changes.slot.end())
    .bind(&changes.notes)
    .bind(changes.status)
    .execute(conn)
    .await
    .map_err(RepositoryError::from_write)?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Fetch an appointment inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn fetch(
    conn: &mut PgConnection,
    id: AppointmentId,
) -> Result<Option<Appointment>, RepositoryError> {
    let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = $1");
    sqlx::query_as::<_, AppointmentRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(Appointment::try_from)
        .transpose()
}
