//! Verification token maintenance.

use pawfect_storefront::db::VerificationTokenRepository;

use super::{CommandError, connect};

/// Delete expired signup codes, pending signups and reset tokens.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn purge() -> Result<(), CommandError> {
    let pool = connect().await?;
    let removed = VerificationTokenRepository::new(&pool)
        .purge_expired()
        .await?;

    tracing::info!(removed, "Expired verification tokens purged");
    Ok(())
}
