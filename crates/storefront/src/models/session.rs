//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use pawfect_core::{Email, UserId, UserRole};

use super::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    pub name: String,
    /// User's email address.
    pub email: Email,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Ids of orders placed in this session, so guests can pay for them.
    pub const PLACED_ORDERS: &str = "placed_orders";

    /// Reviews this session already marked helpful.
    pub const HELPFUL_REVIEWS: &str = "helpful_reviews";
}

/// Most order ids a session remembers.
pub const MAX_PLACED_ORDERS: usize = 10;

/// Most helpful votes a session remembers.
pub const MAX_HELPFUL_VOTES: usize = 200;

/// Add `id` to a session-held list, dropping the oldest entries beyond `cap`.
///
/// Returns `false` (and leaves the list alone) if `id` was already there.
pub fn remember<T: PartialEq>(list: &mut Vec<T>, id: T, cap: usize) -> bool {
    if list.contains(&id) {
        return false;
    }
    list.push(id);
    if list.len() > cap {
        list.drain(..list.len() - cap);
    }
    true
}
