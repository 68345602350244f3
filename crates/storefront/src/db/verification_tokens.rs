//! Verification token storage.
//!
//! One row per identifier. Writing an identifier that already exists replaces
//! the previous token, so a resend never leaves two live codes behind.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::signup::{TokenStore, VerificationToken};

#[derive(sqlx::FromRow)]
struct TokenRow {
    identifier: String,
    token: String,
    expires: DateTime<Utc>,
    attempts: i32,
}

impl From<TokenRow> for VerificationToken {
    fn from(row: TokenRow) -> Self {
        Self {
            identifier: row.identifier,
            token: row.token,
            expires: row.expires,
            attempts: row.attempts,
        }
    }
}

pub struct VerificationTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationTokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Remove every expired token. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires < NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl TokenStore for VerificationTokenRepository<'_> {
    async fn put(&self, token: &VerificationToken) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO verification_tokens (identifier, token, expires, attempts)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (identifier) DO UPDATE
                SET token = EXCLUDED.token,
                    expires = EXCLUDED.expires,
                    attempts = EXCLUDED.attempts
            ",
        )
        .bind(&token.identifier)
        .bind(&token.token)
        .bind(token.expires)
        .bind(token.attempts)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, identifier: &str) -> Result<Option<VerificationToken>, RepositoryError> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT identifier, token, expires, attempts FROM verification_tokens WHERE identifier = $1",
        )
        .bind(identifier)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(VerificationToken::from))
    }

    async fn delete(&self, identifier: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE identifier = $1")
            .bind(identifier)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
