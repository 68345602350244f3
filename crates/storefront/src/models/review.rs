//! Product reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pawfect_core::catalog::Stars;
use pawfect_core::{ProductId, ReviewId, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author_name: String,
    pub rating: Stars,
    pub title: String,
    pub comment: String,
    pub images: Vec<String>,
    /// The author has a non-cancelled order containing this product.
    pub verified: bool,
    pub helpful: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Stars,
    pub title: String,
    pub comment: String,
    pub images: Vec<String>,
}
