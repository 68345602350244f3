//! Email-verified signup.
//!
//! ```text
//! NEW ──start──▶ OTP_ISSUED ──verify──▶ CONSUMED
//!                  │    ▲
//!                resend─┘      (code past expiry) ──▶ EXPIRED
//! ```
//!
//! `start` stores two verification token records:
//!
//! - `otp:<email>` holds the 6-digit code (10 minutes)
//! - `<email>:userData` holds the pending account as JSON (1 hour)
//!
//! `resend` replaces the code but reuses the pending account, and refuses to
//! run when that record is missing or expired. `verify` creates the account
//! and removes both records. A code is dropped after
//! [`MAX_CODE_ATTEMPTS`] wrong guesses.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use pawfect_core::{Email, UserRole};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};
use crate::services::auth::{self, AuthError};
use crate::services::email::generate_verification_code;

/// How long a verification code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// How long a pending signup can be resent or verified.
pub const PENDING_TTL_MINUTES: i64 = 60;

/// Wrong guesses allowed before a code is thrown away.
pub const MAX_CODE_ATTEMPTS: i32 = 5;

/// A stored token with an identifier and expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
    /// Failed checks against this token so far.
    pub attempts: i32,
}

impl VerificationToken {
    #[must_use]
    pub const fn new(identifier: String, token: String, expires: DateTime<Utc>) -> Self {
        Self {
            identifier,
            token,
            expires,
            attempts: 0,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// What a verification token is for.
///
/// All kinds share one table. `Email` rejects `:`, so the prefixed
/// identifiers can never be produced from another kind's email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    SignupCode,
    PendingSignup,
    PasswordReset,
}

impl TokenKind {
    /// Row identifier of this kind of token for `email`.
    #[must_use]
    pub fn identifier(self, email: &Email) -> String {
        match self {
            Self::SignupCode => format!("otp:{email}"),
            Self::PendingSignup => format!("{email}:userData"),
            Self::PasswordReset => format!("reset:{email}"),
        }
    }
}

/// Storage for verification tokens, keyed by identifier.
pub trait TokenStore: Sync {
    /// Insert or replace the token for `token.identifier`.
    fn put(
        &self,
        token: &VerificationToken,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn get(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<VerificationToken>, RepositoryError>> + Send;

    /// Returns whether a record was removed.
    fn delete(&self, identifier: &str)
    -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// The account lookups the signup flow needs.
pub trait UserStore: Sync {
    fn find_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn insert(&self, user: &NewUser) -> impl Future<Output = Result<User, RepositoryError>> + Send;
}

impl UserStore for UserRepository<'_> {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.get_by_email(email).await
    }

    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        self.create(user).await
    }
}

/// Errors from the signup flow.
#[derive(Debug, Error)]
pub enum SignupError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] pawfect_core::EmailError),

    #[error("name is required")]
    MissingName,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("an account with this email already exists")]
    AlreadyRegistered,

    /// No pending signup to resend or verify; the user has to start over.
    #[error("no pending signup for this email, please sign up again")]
    NoPendingSignup,

    #[error("invalid verification code")]
    InvalidCode,

    /// The code took too many wrong guesses and was discarded.
    #[error("too many incorrect codes, please request a new one")]
    TooManyAttempts,

    #[error("verification code has expired")]
    Expired,

    #[error("pending signup record is unreadable: {0}")]
    CorruptPending(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// The account details held until the email is verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingUser {
    name: String,
    email: Email,
    password_hash: String,
}

/// A code that has been stored and now needs to be mailed.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub name: String,
    pub email: Email,
    pub code: String,
    pub expires: DateTime<Utc>,
}

/// Signup flow over a token store and a user store.
pub struct SignupService<T, U> {
    tokens: T,
    users: U,
}

impl<T: TokenStore, U: UserStore> SignupService<T, U> {
    pub const fn new(tokens: T, users: U) -> Self {
        Self { tokens, users }
    }

    /// Validate the submission, store the pending account and issue a code.
    ///
    /// Starting again for the same email replaces both records.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or
    /// `SignupError::AlreadyRegistered` if the email has an account.
    #[instrument(skip(self, name, password))]
    pub async fn start(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<IssuedCode, SignupError> {
        let email = Email::parse(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SignupError::MissingName);
        }
        auth::validate_password(password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(SignupError::AlreadyRegistered);
        }

        let pending = PendingUser {
            name: name.to_owned(),
            email: email.clone(),
            password_hash: auth::hash_password(password)?,
        };
        let now = Utc::now();
        self.tokens
            .put(&VerificationToken::new(
                TokenKind::PendingSignup.identifier(&email),
                serde_json::to_string(&pending)?,
                now + Duration::minutes(PENDING_TTL_MINUTES),
            ))
            .await?;

        self.issue_code(pending, now).await
    }

    /// Replace the code for a pending signup.
    ///
    /// # Errors
    ///
    /// Returns `SignupError::NoPendingSignup` if there is no live pending
    /// account; no code is created in that case.
    #[instrument(skip(self))]
    pub async fn resend(&self, email: &str) -> Result<IssuedCode, SignupError> {
        let email = Email::parse(email)?;
        let now = Utc::now();
        let pending = self.load_pending(&email, now).await?;

        self.tokens
            .delete(&TokenKind::SignupCode.identifier(&email))
            .await?;
        self.issue_code(pending, now).await
    }

    /// Check the code and create the verified account.
    ///
    /// # Errors
    ///
    /// Returns `SignupError::InvalidCode` for a wrong or missing code,
    /// `SignupError::TooManyAttempts` once a code has been guessed wrong
    /// [`MAX_CODE_ATTEMPTS`] times (it is removed), `SignupError::Expired` for
    /// an expired one (also removed), and `SignupError::NoPendingSignup` if
    /// the pending account is gone.
    #[instrument(skip(self, code))]
    pub async fn verify(&self, email: &str, code: &str) -> Result<User, SignupError> {
        let email = Email::parse(email)?;
        let code_identifier = TokenKind::SignupCode.identifier(&email);
        let now = Utc::now();

        let stored = self
            .tokens
            .get(&code_identifier)
            .await?
            .ok_or(SignupError::InvalidCode)?;
        if stored.is_expired(now) {
            self.tokens.delete(&code_identifier).await?;
            return Err(SignupError::Expired);
        }
        if stored.token != code.trim() {
            return Err(self.record_wrong_code(stored).await?);
        }

        let pending = self.load_pending(&email, now).await?;
        let user = self
            .users
            .insert(&NewUser {
                name: pending.name,
                email: pending.email,
                password_hash: pending.password_hash,
                email_verified: true,
                role: UserRole::User,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => SignupError::AlreadyRegistered,
                other => SignupError::Repository(other),
            })?;

        self.tokens.delete(&code_identifier).await?;
        self.tokens
            .delete(&TokenKind::PendingSignup.identifier(&email))
            .await?;

        tracing::info!(user_id = %user.id, "Signup verified");
        Ok(user)
    }

    /// Count a wrong guess, dropping the code once it runs out of attempts.
    /// Returns the error to answer with.
    async fn record_wrong_code(
        &self,
        mut stored: VerificationToken,
    ) -> Result<SignupError, SignupError> {
        stored.attempts += 1;
        if stored.attempts >= MAX_CODE_ATTEMPTS {
            self.tokens.delete(&stored.identifier).await?;
            tracing::warn!(identifier = %stored.identifier, "Verification code locked out");
            return Ok(SignupError::TooManyAttempts);
        }
        self.tokens.put(&stored).await?;
        Ok(SignupError::InvalidCode)
    }

    async fn load_pending(
        &self,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<PendingUser, SignupError> {
        let identifier = TokenKind::PendingSignup.identifier(email);
        let record = self
            .tokens
            .get(&identifier)
            .await?
            .ok_or(SignupError::NoPendingSignup)?;

        if record.is_expired(now) {
            self.tokens.delete(&identifier).await?;
            return Err(SignupError::NoPendingSignup);
        }

        Ok(serde_json::from_str(&record.token)?)
    }

    async fn issue_code(
        &self,
        pending: PendingUser,
        now: DateTime<Utc>,
    ) -> Result<IssuedCode, SignupError> {
        let code = generate_verification_code();
        let expires = now + Duration::minutes(OTP_TTL_MINUTES);

        self.tokens
            .put(&VerificationToken::new(
                TokenKind::SignupCode.identifier(&pending.email),
                code.clone(),
                expires,
            ))
            .await?;

        Ok(IssuedCode {
            name: pending.name,
            email: pending.email,
            code,
            expires,
        })
    }
}
