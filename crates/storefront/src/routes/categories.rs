//! Category routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;

use pawfect_core::catalog::{Category, ProductFilters};

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::products::ProductListing;

#[derive(Debug, Serialize)]
pub struct CategoryListing {
    pub category: Category,
    #[serde(flatten)]
    pub listing: ProductListing,
}

/// `GET /api/categories`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.categories().await?;
    Ok(Json(categories.as_ref().clone()))
}

/// `GET /api/categories/{slug}/products`
pub async fn products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(filters): Query<ProductFilters>,
) -> Result<Json<CategoryListing>> {
    let category = CategoryRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No category named `{slug}`")))?;

    let products = ProductRepository::new(state.pool())
        .list_by_category(category.id)
        .await?;

    Ok(Json(CategoryListing {
        listing: ProductListing::build(&products, filters),
        category,
    }))
}
