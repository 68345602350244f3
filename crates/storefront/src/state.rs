//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use pawfect_core::catalog::Category;

use crate::config::StorefrontConfig;
use crate::db::{CategoryRepository, RepositoryError};
use crate::services::email::EmailService;
use crate::services::payment::{PaymentClient, PaymentError};

const CATEGORIES_KEY: &str = "categories";

/// Errors building the shared state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("SMTP configuration error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("payment client error: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    email: Option<EmailService>,
    payment: Option<PaymentClient>,
    categories: Cache<&'static str, Arc<Vec<Category>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport or payment client can't be built
    /// from the configuration.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        let payment = config.payment.as_ref().map(PaymentClient::new).transpose()?;

        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                payment,
                categories,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The SMTP email service, if configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// The payment client, if configured.
    #[must_use]
    pub fn payment(&self) -> Option<&PaymentClient> {
        self.inner.payment.as_ref()
    }

    /// Category listing with product counts, cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns a repository error on a cache miss that fails to load.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(cached) = self.inner.categories.get(CATEGORIES_KEY).await {
            debug!("Cache hit for categories");
            return Ok(cached);
        }

        let categories = Arc::new(CategoryRepository::new(self.pool()).list().await?);
        self.inner
            .categories
            .insert(CATEGORIES_KEY, Arc::clone(&categories))
            .await;
        Ok(categories)
    }

    /// Drop the cached category listing after catalog changes.
    pub async fn invalidate_categories(&self) {
        self.inner.categories.invalidate(CATEGORIES_KEY).await;
    }
}
