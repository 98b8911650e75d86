//! Database operations for the booking `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Local mirror of identity provider users, with their role
//! - `shops` - Shops with working hours, weekly closing days and capacity
//! - `shop_staff` - Which users work in which shop
//! - `services` - Services offered by a shop
//! - `appointments` - Booked intervals (no overlap per employee and day)
//! - `reviews` - Customer reviews, one per appointment
//! - `available_times` - Per-date availability overrides
//! - `available_time_staff` - Staff an override applies to
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p chairbook-cli -- migrate
//! ```

pub mod appointments;
pub mod overrides;
pub mod shops;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use appointments::AppointmentRepository;
pub use overrides::OverrideRepository;
pub use shops::ShopRepository;
pub use users::UserRepository;

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., overlapping appointment).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Turn unique and exclusion violations into [`RepositoryError::Conflict`].
    ///
    /// Everything else stays a database error.
    #[must_use]
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err
            && matches!(
                db.code().as_deref(),
                Some(UNIQUE_VIOLATION | EXCLUSION_VIOLATION)
            )
        {
            return Self::Conflict(db.constraint().unwrap_or("unknown").to_string());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
