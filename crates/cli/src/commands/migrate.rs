//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! foodcoop-cli migrate
//! ```
//!
//! Applies `crates/web/migrations/` and creates the session table used by
//! `tower-sessions`.
//!
//! # Environment Variables
//!
//! - `FOODCOOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Run all dashboard migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running dashboard migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Creating session storage...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
