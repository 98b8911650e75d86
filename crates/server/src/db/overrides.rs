//! Availability override repository (`available_times` and its staff links).

use chrono::NaiveDate;
use sqlx::PgPool;

use chairbook_core::schedule::DateRange;
use chairbook_core::{AvailableTimeId, ShopId, UserId};

use super::RepositoryError;
use crate::models::{OverrideRecord, UpsertOverride};

const OVERRIDE_SELECT: &str = r"
    SELECT t.id, t.shop_id, t.date, t.is_available, t.time_slots, t.reason,
           COALESCE(
               array_agg(ts.user_id ORDER BY ts.user_id) FILTER (WHERE ts.user_id IS NOT NULL),
               '{}'
           ) AS staff_ids
    FROM available_times t
    LEFT JOIN available_time_staff ts ON ts.available_time_id = t.id
";

#[derive(sqlx::FromRow)]
struct OverrideRow {
    id: AvailableTimeId,
    shop_id: ShopId,
    date: NaiveDate,
    is_available: bool,
    time_slots: Option<serde_json::Value>,
    reason: Option<String>,
    staff_ids: Vec<i32>,
}

impl From<OverrideRow> for OverrideRecord {
    fn from(r: OverrideRow) -> Self {
        Self {
            id: r.id,
            shop_id: r.shop_id,
            date: r.date,
            is_available: r.is_available,
            time_slots: r.time_slots,
            reason: r.reason,
            staff_ids: r.staff_ids.into_iter().map(UserId::new).collect(),
        }
    }
}

/// Repository for availability overrides.
pub struct OverrideRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OverrideRepository<'a> {
    /// Create a new override repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All override records for a shop on one date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_day(
        &self,
        shop_id: ShopId,
        date: NaiveDate,
    ) -> Result<Vec<OverrideRecord>, RepositoryError> {
        let sql = format!(
            "{OVERRIDE_SELECT} WHERE t.shop_id = $1 AND t.date = $2 GROUP BY t.id ORDER BY t.id"
        );
        let rows = sqlx::query_as::<_, OverrideRow>(&sql)
            .bind(shop_id)
            .bind(date)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(OverrideRecord::from).collect())
    }

    /// All override records for a shop in a date range, ordered by date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn in_range(
        &self,
        shop_id: ShopId,
        range: &DateRange,
    ) -> Result<Vec<OverrideRecord>, RepositoryError> {
        let sql = format!(
            "{OVERRIDE_SELECT} WHERE t.shop_id = $1 AND t.date BETWEEN $2 AND $3 \
             GROUP BY t.id ORDER BY t.date, t.id"
        );
        let rows = sqlx::query_as::<_, OverrideRow>(&sql)
            .bind(shop_id)
            .bind(range.start())
            .bind(range.end())
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(OverrideRecord::from).collect())
    }

    /// Insert or replace the override for (shop, date, staff set).
    ///
    /// A record with exactly the same staff set on the same date is updated
    /// in place; otherwise a new record is created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn upsert(
        &self,
        shop_id: ShopId,
        input: &UpsertOverride,
    ) -> Result<OverrideRecord, RepositoryError> {
        let mut staff: Vec<i32> = input.staff_ids.iter().map(UserId::as_i32).collect();
        staff.sort_unstable();
        staff.dedup();

        let time_slots = input
            .time_slots
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("time_slots: {e}")))?;

        let mut tx = self.pool.begin().await?;

        let existing: Option<AvailableTimeId> = sqlx::query_scalar(
            r"
            SELECT t.id
            FROM available_times t
            LEFT JOIN available_time_staff ts ON ts.available_time_id = t.id
            WHERE t.shop_id = $1 AND t.date = $2
            GROUP BY t.id
            HAVING COALESCE(
                array_agg(ts.user_id ORDER BY ts.user_id) FILTER (WHERE ts.user_id IS NOT NULL),
                '{}'
            ) = $3::int[]
            LIMIT 1
            ",
        )
        .bind(shop_id)
        .bind(input.date)
        .bind(&staff)
        .fetch_optional(&mut *tx)
        .await?;

        let id = if let Some(id) = existing {
            sqlx::query(
                r"
                UPDATE available_times
                SET is_available = $2, time_slots = $3, reason = $4, updated_at = now()
                WHERE id = $1
                ",
            )
            .bind(id)
            .bind(input.is_available)
            .bind(&time_slots)
            .bind(&input.reason)
            .execute(&mut *tx)
            .await?;
            id
        } else {
            let id: AvailableTimeId = sqlx::query_scalar(
                r"
                INSERT INTO available_times (shop_id, date, is_available, time_slots, reason)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                ",
            )
            .bind(shop_id)
            .bind(input.date)
            .bind(input.is_available)
            .bind(&time_slots)
            .bind(&input.reason)
            .fetch_one(&mut *tx)
            .await?;

            if !staff.is_empty() {
                sqlx::query(
                    r"
                    INSERT INTO available_time_staff (available_time_id, user_id)
                    SELECT $1, unnest($2::int[])
                    ",
                )
                .bind(id)
                .bind(&staff)
                .execute(&mut *tx)
                .await?;
            }
            id
        };

        tx.commit().await?;

        Ok(OverrideRecord {
            id,
            shop_id,
            date: input.date,
            is_available: input.is_available,
            time_slots,
            reason: input.reason.clone(),
            staff_ids: staff.into_iter().map(UserId::new).collect(),
        })
    }

    /// Delete an override belonging to the shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such override exists in the shop.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        shop_id: ShopId,
        id: AvailableTimeId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM available_times WHERE id = $1 AND shop_id = $2")
            .bind(id)
            .bind(shop_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
