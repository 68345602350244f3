//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod tokens;

use secrecy::SecretString;
use sqlx::PgPool;

use pawfect_storefront::db;

/// Environment variable holding the storefront database URL.
pub const DATABASE_URL_VAR: &str = "STOREFRONT_DATABASE_URL";

/// Errors shared by every command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] db::RepositoryError),

    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the variable is unset or the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(DATABASE_URL_VAR)
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar(DATABASE_URL_VAR))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}
