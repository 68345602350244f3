//! Signed-in shopper routes: order history and wishlist.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use pawfect_core::{OrderId, ProductId};

use crate::db::{OrderRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::TrackedOrder;
use crate::state::AppState;

use super::products::ProductView;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistAdd {
    pub product_id: ProductId,
}

/// `GET /api/user/orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<TrackedOrder>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders.into_iter().map(TrackedOrder::from).collect()))
}

/// `GET /api/user/orders/{id}`
///
/// Someone else's order answers 404, same as a missing one.
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<TrackedOrder>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|order| order.is_owned_by(user.id))
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(order.into()))
}

/// `GET /api/user/wishlist`
pub async fn wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ProductView>>> {
    let products = WishlistRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// `POST /api/user/wishlist`
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<WishlistAdd>,
) -> Result<StatusCode> {
    WishlistRepository::new(state.pool())
        .add(user.id, body.product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/user/wishlist/{productId}`
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    let removed = WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(
            "That product is not on your wishlist".to_owned(),
        ))
    }
}
