//! CLI command implementations.

pub mod ledger;
pub mod migrate;
pub mod users;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use foodcoop_web::db::{PgStore, StoreError, create_pool};
use foodcoop_web::services::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Account creation failed.
    #[error("Account error: {0}")]
    Auth(#[from] AuthError),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An argument could not be used.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Read the database URL the same way the server does.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("FOODCOOP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("FOODCOOP_DATABASE_URL"))
}

/// Connect to the dashboard database.
async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(create_pool(&url).await?)
}

/// Connect and wrap the pool in the dashboard store.
async fn store() -> Result<PgStore, CommandError> {
    Ok(PgStore::new(connect().await?))
}
