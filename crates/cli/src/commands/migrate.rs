//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! chairbook migrate
//! ```
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time. The server never runs them on startup.

use super::CommandError;

/// Run all pending migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
