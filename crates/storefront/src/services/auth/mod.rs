//! Authentication service.
//!
//! Password login and password reset. Account creation goes through the
//! signup flow in [`crate::services::signup`], which shares the password
//! helpers defined here.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::instrument;

use pawfect_core::Email;

use crate::db::{UserRepository, VerificationTokenRepository};
use crate::models::User;
use crate::services::signup::{TokenKind, TokenStore, VerificationToken};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a password reset link stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// A freshly issued reset token, to be mailed to the account owner.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub email: Email,
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: VerificationTokenRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens: VerificationTokenRepository::new(pool),
        }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Issue a reset token for the account behind `email`.
    ///
    /// Returns `None` when no such account exists; callers answer the same way
    /// in both cases so the endpoint can't be used to probe for accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address, or a
    /// repository error.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<ResetToken>, AuthError> {
        let email = Email::parse(email)?;
        if self.users.get_by_email(&email).await?.is_none() {
            return Ok(None);
        }

        let token = generate_reset_token();
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.tokens
            .put(&VerificationToken::new(
                TokenKind::PasswordReset.identifier(&email),
                token.clone(),
                expires,
            ))
            .await?;

        Ok(Some(ResetToken {
            email,
            token,
            expires,
        }))
    }

    /// Consume a reset token and replace the account's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` or `AuthError::ResetTokenExpired`
    /// if the token can't be used, `AuthError::WeakPassword` if the new
    /// password is rejected.
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(new_password)?;

        let identifier = TokenKind::PasswordReset.identifier(&email);
        let stored = self.tokens.get(&identifier).await?;
        if let Err(e) = check_reset_token(stored.as_ref(), token, Utc::now()) {
            if matches!(e, AuthError::ResetTokenExpired) {
                self.tokens.delete(&identifier).await?;
            }
            return Err(e);
        }

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = hash_password(new_password)?;
        self.users.update_password(user.id, &password_hash).await?;
        self.tokens.delete(&identifier).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }
}

/// 32 random bytes, URL-safe base64.
#[must_use]
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn check_reset_token(
    stored: Option<&VerificationToken>,
    presented: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let stored = stored.ok_or(AuthError::InvalidResetToken)?;
    if stored.is_expired(now) {
        return Err(AuthError::ResetTokenExpired);
    }
    if stored.token != presented {
        return Err(AuthError::InvalidResetToken);
    }
    Ok(())
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stored(token: &str, expires: DateTime<Utc>) -> VerificationToken {
        VerificationToken::new("reset:owner@example.com".to_owned(), token.to_owned(), expires)
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_reset_identifier() {
        let email = Email::parse("Owner@Example.com").unwrap();
        assert_eq!(
            TokenKind::PasswordReset.identifier(&email),
            "reset:owner@example.com"
        );
    }

    #[test]
    fn test_reset_tokens_are_url_safe_and_distinct() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_check_reset_token() {
        let now = Utc::now();
        let live = stored("abc", now + Duration::minutes(5));
        let dead = stored("abc", now - Duration::minutes(5));

        assert!(check_reset_token(Some(&live), "abc", now).is_ok());
        assert!(matches!(
            check_reset_token(Some(&live), "xyz", now),
            Err(AuthError::InvalidResetToken)
        ));
        assert!(matches!(
            check_reset_token(Some(&dead), "abc", now),
            Err(AuthError::ResetTokenExpired)
        ));
        assert!(matches!(
            check_reset_token(None, "abc", now),
            Err(AuthError::InvalidResetToken)
        ));
    }
}
