//! Wishlist repository.

use sqlx::PgPool;

use pawfect_core::catalog::Product;
use pawfect_core::{ProductId, UserId};

use super::RepositoryError;
use super::products::{LISTING_ORDER, PRODUCT_COLUMNS, ProductRow, into_products};

/// Repository for a user's saved products.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE id IN (SELECT product_id FROM wishlist_items WHERE user_id = $1) \
             {LISTING_ORDER}"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        into_products(rows)
    }

    /// Add a product. Adding one that is already saved is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| match RepositoryError::from_constraint(e, "") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;

        Ok(())
    }

    /// Remove a product. Returns whether it was on the list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
