//! Review repository.
//!
//! Adding a review recomputes the product's `rating` and `review_count` from
//! the reviews table inside the same transaction, so the summary returned to
//! the client is the authoritative one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use pawfect_core::catalog::{RatingSummary, Stars};
use pawfect_core::{ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::{NewReview, Review};

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    author_name: String,
    rating: i16,
    title: String,
    comment: String,
    images: Vec<String>,
    verified: bool,
    helpful: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Stars::new(i64::from(row.rating))
            .map_err(|e| RepositoryError::DataCorruption(format!("review {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            author_name: row.author_name,
            rating,
            title: row.title,
            comment: row.comment,
            images: row.images,
            verified: row.verified,
            helpful: row.helpful,
            created_at: row.created_at,
        })
    }
}

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews for a product, most helpful first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT r.id, r.product_id, r.user_id, u.name AS author_name, r.rating, r.title,
                   r.comment, r.images, r.verified, r.helpful, r.created_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.helpful DESC, r.created_at DESC
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    /// Insert a review and recompute the product's rating summary.
    ///
    /// The review is marked verified when the author has a non-cancelled,
    /// non-refunded order containing the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed this
    /// product.
    pub async fn create(
        &self,
        review: &NewReview,
    ) -> Result<(Review, RatingSummary), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: ReviewRow = sqlx::query_as(
            r"
            WITH inserted AS (
                INSERT INTO reviews (product_id, user_id, rating, title, comment, images, verified)
                VALUES ($1, $2, $3, $4, $5, $6, EXISTS (
                    SELECT 1 FROM order_items oi
                    JOIN orders o ON o.id = oi.order_id
                    WHERE oi.product_id = $1
                      AND o.user_id = $2
                      AND o.status NOT IN ('CANCELLED', 'REFUNDED')
                ))
                RETURNING *
            )
            SELECT i.id, i.product_id, i.user_id, u.name AS author_name, i.rating, i.title,
                   i.comment, i.images, i.verified, i.helpful, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            ",
        )
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(i16::from(review.rating.get()))
        .bind(&review.title)
        .bind(&review.comment)
        .bind(&review.images)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "you have already reviewed this product"))?;

        let (rating, review_count): (Decimal, i32) = sqlx::query_as(
            r"
            UPDATE products SET
                rating = COALESCE(
                    (SELECT ROUND(AVG(rating)::numeric, 1) FROM reviews WHERE product_id = $1),
                    0
                ),
                review_count = (SELECT COUNT(*) FROM reviews WHERE product_id = $1),
                updated_at = NOW()
            WHERE id = $1
            RETURNING rating, review_count
            ",
        )
        .bind(review.product_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((row.try_into()?, RatingSummary::new(rating, review_count)))
    }

    /// Increment a review's helpful counter. Returns the new count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn mark_helpful(&self, id: ReviewId) -> Result<i32, RepositoryError> {
        let helpful: Option<i32> = sqlx::query_scalar(
            "UPDATE reviews SET helpful = helpful + 1 WHERE id = $1 RETURNING helpful",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        helpful.ok_or(RepositoryError::NotFound)
    }
}
