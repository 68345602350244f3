//! Review routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use pawfect_core::ReviewId;
use pawfect_core::catalog::{Product, RatingSummary, Stars};

use crate::db::{ProductRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::session::{MAX_HELPFUL_VOTES, remember};
use crate::models::{NewReview, Review, session_keys};
use crate::services::product_form::FieldErrors;
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 120;
const MAX_COMMENT_LEN: usize = 4000;
const MAX_IMAGES: usize = 6;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}

/// A stored review plus the product's summary, both as recomputed by the
/// database and as the client would have previewed it before submitting.
#[derive(Debug, Serialize)]
pub struct ReviewCreated {
    pub review: Review,
    pub summary: RatingSummary,
    pub preview: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct HelpfulCount {
    pub helpful: i32,
}

impl ReviewRequest {
    fn validate(self) -> std::result::Result<(Stars, String, String, Vec<String>), FieldErrors> {
        let mut errors = FieldErrors::new();

        let stars = Stars::new(self.rating)
            .map_err(|e| errors.insert("rating".into(), e.to_string()))
            .ok();

        let title = self.title.trim().to_owned();
        if title.chars().count() > MAX_TITLE_LEN {
            errors.insert(
                "title".into(),
                format!("must be at most {MAX_TITLE_LEN} characters"),
            );
        }

        let comment = self.comment.trim().to_owned();
        if comment.is_empty() {
            errors.insert("comment".into(), "is required".into());
        } else if comment.chars().count() > MAX_COMMENT_LEN {
            errors.insert(
                "comment".into(),
                format!("must be at most {MAX_COMMENT_LEN} characters"),
            );
        }

        if self.images.len() > MAX_IMAGES {
            errors.insert("images".into(), format!("at most {MAX_IMAGES} images"));
        }

        match stars {
            Some(stars) if errors.is_empty() => Ok((stars, title, comment, self.images)),
            _ => Err(errors),
        }
    }
}

async fn product_by_slug(state: &AppState, slug: &str) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No product named `{slug}`")))
}

/// `GET /api/products/{slug}/reviews`
pub async fn index(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ReviewList>> {
    let product = product_by_slug(&state, &slug).await?;
    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(product.id)
        .await?;

    Ok(Json(ReviewList {
        summary: RatingSummary::new(product.rating, product.review_count),
        reviews,
    }))
}

/// `POST /api/products/{slug}/reviews`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewCreated>)> {
    let (rating, title, comment, images) = body.validate().map_err(AppError::validation)?;
    let product = product_by_slug(&state, &slug).await?;
    let preview = RatingSummary::new(product.rating, product.review_count).with_review(rating);

    let (review, summary) = ReviewRepository::new(state.pool())
        .create(&NewReview {
            product_id: product.id,
            user_id: user.id,
            rating,
            title,
            comment,
            images,
        })
        .await?;

    tracing::info!(
        product = %product.slug,
        review_id = %review.id,
        verified = review.verified,
        "Review posted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ReviewCreated {
            review,
            summary,
            preview,
        }),
    ))
}

/// `POST /api/reviews/{id}/helpful`
///
/// One vote per review per session.
pub async fn helpful(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ReviewId>,
) -> Result<Json<HelpfulCount>> {
    let mut voted: Vec<ReviewId> = session
        .get(session_keys::HELPFUL_REVIEWS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    if !remember(&mut voted, id, MAX_HELPFUL_VOTES) {
        return Err(AppError::Conflict(
            "You already marked this review helpful".to_owned(),
        ));
    }

    let helpful = ReviewRepository::new(state.pool())
        .mark_helpful(id)
        .await?;
    session
        .insert(session_keys::HELPFUL_REVIEWS, voted)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    Ok(Json(HelpfulCount { helpful }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(rating: i64, comment: &str) -> ReviewRequest {
        ReviewRequest {
            rating,
            title: "  Great  ".into(),
            comment: comment.into(),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_validate_trims() {
        let (stars, title, comment, _) = request(4, " Sturdy leash ").validate().unwrap();
        assert_eq!(stars.get(), 4);
        assert_eq!(title, "Great");
        assert_eq!(comment, "Sturdy leash");
    }

    #[test]
    fn test_validate_rejects_out_of_range_rating() {
        let errors = request(6, "ok").validate().unwrap_err();
        assert!(errors.contains_key("rating"));
        assert!(!errors.contains_key("comment"));
    }

    #[test]
    fn test_validate_requires_comment() {
        let errors = request(3, "   ").validate().unwrap_err();
        assert_eq!(errors["comment"], "is required");
    }
}
