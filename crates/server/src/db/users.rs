//! User repository for database operations.
//!
//! Users are created on first authentication from the identity provider's
//! session payload. Roles are managed locally (see `chairbook user set-role`).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use chairbook_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str =
    "id, external_id, email, first_name, last_name, phone, role, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    external_id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            external_id: r.external_id,
            email,
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            role: r.role,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Profile fields reported by the identity provider.
#[derive(Debug, Clone)]
pub struct IdentityProfile {
    pub external_id: String,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Role claimed by the provider. Only used when the user is first created.
    pub role: Option<Role>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Insert the user on first sight, or refresh their profile fields.
    ///
    /// The stored role is never overwritten by the provider once the user exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email belongs to another subject.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_from_identity(
        &self,
        profile: &IdentityProfile,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO users (external_id, email, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = COALESCE(EXCLUDED.first_name, users.first_name),
                last_name = COALESCE(EXCLUDED.last_name, users.last_name),
                updated_at = now()
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&profile.external_id)
            .bind(&profile.email)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(profile.role.unwrap_or_default())
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        User::try_from(row)
    }

    /// Create a user directly (CLI and seeding).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or external id already exists.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        external_id: &str,
        email: &Email,
        first_name: Option<&str>,
        last_name: Option<&str>,
        role: Role,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO users (external_id, email, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(external_id)
            .bind(email)
            .bind(first_name)
            .bind(last_name)
            .bind(role)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        User::try_from(row)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that email.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE email = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .bind(role)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(User::try_from)
    }

    /// Check whether a user exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }
}
