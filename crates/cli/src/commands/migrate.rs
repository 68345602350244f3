//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! pawfect migrate
//! ```
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! build time.

use super::{CommandError, connect};

/// Apply pending storefront migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
