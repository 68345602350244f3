//! User account records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pawfect_core::{Email, UserId, UserRole};

/// A registered account. The password hash never leaves the repository layer
/// except for login verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub email_verified: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub email_verified: bool,
    pub role: UserRole,
}
