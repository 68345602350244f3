//! Cookie sessions backed by the `tower_sessions.session` table.
//!
//! A session carries the signed-in shopper (if any) and the ids of orders a
//! guest placed from this browser, which is what lets a guest pay for them.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "pawfect_session";

/// Two weeks of inactivity, long enough to come back to an unpaid order.
const SESSION_IDLE_DAYS: i64 = 14;

/// Cookies are only marked `Secure` when the site is served over HTTPS,
/// otherwise a local `http://` dev server would never get its cookie back.
fn secure_cookies(config: &StorefrontConfig) -> bool {
    config.environment.is_production() || config.base_url.starts_with("https://")
}

/// Create the session layer.
///
/// The store table comes from the storefront migrations, not from
/// `PostgresStore::migrate`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    // Lax so the session survives the redirect back from hosted checkout.
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_IDLE_DAYS)))
        .with_secure(secure_cookies(config))
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
