//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account (password read from the flag or env)
//! PAWFECT_ADMIN_PASSWORD=... pawfect admin create -e admin@example.com -n "Admin Name"
//!
//! # Grant or revoke the admin role on an existing account
//! pawfect admin promote -e shopper@example.com
//! pawfect admin demote -e shopper@example.com
//! ```

use pawfect_core::{Email, UserRole};
use pawfect_storefront::db::{RepositoryError, UserRepository};
use pawfect_storefront::models::NewUser;
use pawfect_storefront::services::auth::{hash_password, validate_password};

use super::{CommandError, connect};

fn parse_email(email: &str) -> Result<Email, CommandError> {
    Email::parse(email).map_err(|e| CommandError::Invalid(format!("email {email}: {e}")))
}

/// Create a verified admin account.
///
/// # Errors
///
/// Returns an error if the input is invalid or the email is already
/// registered.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<(), CommandError> {
    let email = parse_email(email)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::Invalid("name must not be blank".to_owned()));
    }
    validate_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;
    let password_hash = hash_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let pool = connect().await?;
    tracing::info!("Creating admin account: {}", email);

    let user = UserRepository::new(&pool)
        .create(&NewUser {
            name: name.to_owned(),
            email,
            password_hash,
            email_verified: true,
            role: UserRole::Admin,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CommandError::Invalid(
                "an account with this email exists, use `admin promote` instead".to_owned(),
            ),
            other => other.into(),
        })?;

    tracing::info!(
        "Admin account created! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}

/// Change the role of an existing account.
///
/// # Errors
///
/// Returns an error if no account has this email.
pub async fn set_role(email: &str, role: UserRole) -> Result<(), CommandError> {
    let email = parse_email(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                CommandError::Invalid(format!("no account with email {email}"))
            }
            other => other.into(),
        })?;

    tracing::info!("{} is now {}", user.email, user.role);
    Ok(())
}
