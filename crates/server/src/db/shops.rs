//! Shop, staff and service repository.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use chairbook_core::schedule::{ShopSchedule, WorkingHours};
use chairbook_core::{Price, Role, ServiceId, ShopId, UserId};

use super::RepositoryError;
use crate::models::{Service, Shop};

const SHOP_COLUMNS: &str = "id, name, owner_id, address, opens_at, closes_at, slot_minutes, \
                            closed_weekdays, daily_capacity, created_at";

#[derive(sqlx::FromRow)]
struct ShopRow {
    id: ShopId,
    name: String,
    owner_id: Option<UserId>,
    address: Option<String>,
    opens_at: Option<NaiveTime>,
    closes_at: Option<NaiveTime>,
    slot_minutes: Option<i32>,
    closed_weekdays: Vec<i32>,
    daily_capacity: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<ShopRow> for Shop {
    fn from(r: ShopRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            owner_id: r.owner_id,
            address: r.address,
            schedule: ShopSchedule {
                hours: WorkingHours::from_columns(r.opens_at, r.closes_at, r.slot_minutes),
                closed_weekdays: ShopSchedule::weekdays_from_column(&r.closed_weekdays),
                daily_capacity: r
                    .daily_capacity
                    .and_then(|c| u32::try_from(c).ok())
                    .filter(|c| *c > 0),
            },
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: ServiceId,
    shop_id: ShopId,
    name: String,
    description: Option<String>,
    price: Option<Decimal>,
    duration_minutes: Option<i32>,
}

impl TryFrom<ServiceRow> for Service {
    type Error = RepositoryError;

    fn try_from(r: ServiceRow) -> Result<Self, Self::Error> {
        let price = r
            .price
            .map(|p| {
                Price::new(p).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!("negative price for service {}", r.id))
                })
            })
            .transpose()?;

        Ok(Self {
            id: r.id,
            shop_id: r.shop_id,
            name: r.name,
            description: r.description,
            price,
            duration_minutes: r.duration_minutes.and_then(|m| u32::try_from(m).ok()),
        })
    }
}

/// A staff member as listed for a shop.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StaffMember {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

impl StaffMember {
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => format!("Staff #{}", self.id),
        }
    }
}

/// Parameters for creating a shop.
#[derive(Debug, Clone)]
pub struct NewShop {
    pub name: String,
    pub owner_id: Option<UserId>,
    pub address: Option<String>,
    pub schedule: ShopSchedule,
}

/// Repository for shop database operations.
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    /// Create a new shop repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all shops by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Shop>, RepositoryError> {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shops ORDER BY name, id");
        let rows = sqlx::query_as::<_, ShopRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Shop::from).collect())
    }

    /// Get a shop by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1");
        let row = sqlx::query_as::<_, ShopRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Shop::from))
    }

    /// Services offered by a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is negative.
    pub async fn services(&self, shop_id: ShopId) -> Result<Vec<Service>, RepositoryError> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            r"
            SELECT id, shop_id, name, description, price, duration_minutes
            FROM services
            WHERE shop_id = $1
            ORDER BY name, id
            ",
        )
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Service::try_from).collect()
    }

    /// Staff linked to a shop, lowest id first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn staff(&self, shop_id: ShopId) -> Result<Vec<StaffMember>, RepositoryError> {
        let rows = sqlx::query_as::<_, StaffMember>(
            r"
            SELECT u.id, u.first_name, u.last_name, u.role
            FROM shop_staff ss
            JOIN users u ON u.id = ss.user_id
            WHERE ss.shop_id = $1
            ORDER BY u.id
            ",
        )
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// The staff member used when a booking names nobody: the lowest id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first_staff(&self, shop_id: ShopId) -> Result<Option<UserId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM shop_staff WHERE shop_id = $1 ORDER BY user_id LIMIT 1",
        )
        .bind(shop_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }

    /// Whether a user is linked to the shop as staff.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_staff(&self, shop_id: ShopId, user_id: UserId) -> Result<bool, RepositoryError> {
        let linked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop_staff WHERE shop_id = $1 AND user_id = $2)",
        )
        .bind(shop_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(linked)
    }

    /// Create a shop (CLI and seeding).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, shop: &NewShop) -> Result<Shop, RepositoryError> {
        let hours = &shop.schedule.hours;
        let sql = format!(
            r"
            INSERT INTO shops (name, owner_id, address, opens_at, closes_at, slot_minutes,
                               closed_weekdays, daily_capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SHOP_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ShopRow>(&sql)
            .bind(&shop.name)
            .bind(shop.owner_id)
            .bind(&shop.address)
            .bind(hours.opens_at)
            .bind(hours.closes_at)
            .bind(i32::try_from(hours.slot_minutes).unwrap_or(i32::MAX))
            .bind(ShopSchedule::weekdays_to_column(&shop.schedule.closed_weekdays))
            .bind(
                shop.schedule
                    .daily_capacity
                    .and_then(|c| i32::try_from(c).ok()),
            )
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::from_write)?;
        Ok(Shop::from(row))
    }

    /// Link a user to a shop as staff. Linking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_staff(&self, shop_id: ShopId, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO shop_staff (shop_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(shop_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Add a service to a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_service(
        &self,
        shop_id: ShopId,
        name: &str,
        price: Option<Price>,
        duration_minutes: Option<u32>,
    ) -> Result<Service, RepositoryError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r"
            INSERT INTO services (shop_id, name, price, duration_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING id, shop_id, name, description, price, duration_minutes
            ",
        )
        .bind(shop_id)
        .bind(name)
        .bind(price.map(|p| p.amount()))
        .bind(duration_minutes.and_then(|m| i32::try_from(m).ok()))
        .fetch_one(self.pool)
        .await?;
        Service::try_from(row)
    }
}
