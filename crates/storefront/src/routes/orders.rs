//! Order placement, checkout and staff order management.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use pawfect_core::catalog::Product;
use pawfect_core::orders::{LineItem, OrderTotals, format_order_number};
use pawfect_core::{
    Address, Email, OrderId, OrderStatus, ProductId, deserialize_address,
    deserialize_optional_address,
};

use crate::db::{OrderRepository, ProductRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::session::{MAX_PLACED_ORDERS, remember};
use crate::models::{NewOrder, Order, TrackedOrder, session_keys};
use crate::services::email::{self, Notification};
use crate::services::payment::PaymentError;
use crate::services::product_form::FieldErrors;
use crate::state::AppState;

/// Most units of one product in a single order.
pub const MAX_QUANTITY: i32 = 99;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    /// Required for guests, ignored when signed in.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(deserialize_with = "deserialize_address")]
    pub shipping_address: Address,
    #[serde(default, deserialize_with = "deserialize_optional_address")]
    pub billing_address: Option<Address>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub id: String,
    pub url: Option<String>,
}

/// Merge duplicate product lines and check quantities, keeping first-seen
/// order.
fn merge_items(items: &[OrderItemRequest]) -> Result<Vec<(ProductId, i32)>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("An order needs at least one item".into()));
    }

    let mut merged: Vec<(ProductId, i32)> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "Quantity for product {} must be at least 1",
                item.product_id
            )));
        }
        match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => *quantity = quantity.saturating_add(item.quantity),
            None => merged.push((item.product_id, item.quantity)),
        }
    }

    if let Some((id, _)) = merged.iter().find(|(_, q)| *q > MAX_QUANTITY) {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_QUANTITY} units of product {id} per order"
        )));
    }
    Ok(merged)
}

/// Whether `quantity` units can be sold right now. The order transaction
/// re-checks this against the live row when it decrements stock.
fn check_available(product: &Product, quantity: i32) -> Result<()> {
    if !product.in_stock || product.stock < 1 {
        return Err(AppError::Conflict(format!("{} is out of stock", product.name)));
    }
    if product.stock < quantity {
        return Err(AppError::Conflict(format!(
            "Only {} of {} left in stock",
            product.stock, product.name
        )));
    }
    Ok(())
}

/// Price the requested items from catalog rows.
///
/// Returns the line items and whether every product ships free.
fn build_line_items(
    requested: &[OrderItemRequest],
    products: &[Product],
) -> Result<(Vec<LineItem>, bool)> {
    let merged = merge_items(requested)?;
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(merged.len());
    let mut ships_free = true;
    for (product_id, quantity) in merged {
        let product = by_id.get(&product_id).ok_or_else(|| {
            AppError::validation(FieldErrors::from([(
                "items".to_owned(),
                format!("product {product_id} does not exist"),
            )]))
        })?;
        check_available(product, quantity)?;
        ships_free &= product.free_shipping;
        lines.push(LineItem {
            product_id,
            name: product.name.clone(),
            price: product.price,
            quantity,
        });
    }
    Ok((lines, ships_free))
}

fn contact_email(user_email: Option<Email>, submitted: Option<&str>) -> Result<Email> {
    if let Some(email) = user_email {
        return Ok(email);
    }
    let field = |message: &str| {
        AppError::validation(FieldErrors::from([("email".to_owned(), message.to_owned())]))
    };
    let raw = submitted
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| field("is required for guest checkout"))?;
    Email::parse(raw).map_err(|_| field("is not a valid email address"))
}

async fn placed_in_session(session: &Session) -> Vec<OrderId> {
    session
        .get::<Vec<OrderId>>(session_keys::PLACED_ORDERS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn find_order(state: &AppState, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
}

/// `POST /api/orders`
pub async fn place(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<TrackedOrder>)> {
    let email = contact_email(user.as_ref().map(|u| u.email.clone()), body.email.as_deref())?;

    let mut address_errors = FieldErrors::new();
    if let Err(e) = body.shipping_address.validate() {
        address_errors.insert("shippingAddress".into(), e.to_string());
    }
    if let Some(Err(e)) = body.billing_address.as_ref().map(Address::validate) {
        address_errors.insert("billingAddress".into(), e.to_string());
    }
    if !address_errors.is_empty() {
        return Err(AppError::validation(address_errors));
    }

    let ids: Vec<ProductId> = body.items.iter().map(|i| i.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    let (items, ships_free) = build_line_items(&body.items, &products)?;
    let totals = OrderTotals::compute(&items, ships_free, &state.config().pricing);

    let placed_at = Utc::now();
    let order_number = format_order_number(placed_at, rand::rng().random_range(0..1_000_000));

    let order = OrderRepository::new(state.pool())
        .create(&NewOrder {
            order_number,
            user_id: user.as_ref().map(|u| u.id),
            guest_email: user.is_none().then(|| email.clone()),
            items,
            totals,
            shipping_address: body.shipping_address,
            billing_address: body.billing_address,
        })
        .await?;

    let mut placed = placed_in_session(&session).await;
    remember(&mut placed, order.id, MAX_PLACED_ORDERS);
    session
        .insert(session_keys::PLACED_ORDERS, placed)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    add_breadcrumb(
        "order",
        "Order placed",
        &[
            ("order_number", order.order_number.as_str()),
            ("guest", if user.is_none() { "true" } else { "false" }),
        ],
    );
    tracing::info!(
        order_number = %order.order_number,
        total = %order.totals.total,
        items = order.items.len(),
        "Order placed"
    );

    let order_url = state
        .config()
        .url_for(&format!("orders/{}", order.order_number));
    if let Err(e) = email::deliver(
        state.email(),
        state.config().environment,
        &email,
        Notification::OrderConfirmation {
            order: &order,
            order_url: &order_url,
        },
    )
    .await
    {
        tracing::error!(order_number = %order.order_number, error = %e, "Order confirmation not sent");
    }

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// `POST /api/orders/{id}/checkout`
///
/// Allowed for the order's owner, an admin, or the session that placed it.
pub async fn checkout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(id): Path<OrderId>,
) -> Result<Json<CheckoutResponse>> {
    let order = find_order(&state, id).await?;

    let allowed = match &user {
        Some(u) if u.is_admin() || order.is_owned_by(u.id) => true,
        _ => placed_in_session(&session).await.contains(&order.id),
    };
    if !allowed {
        // Same answer as a missing order so ids can't be probed.
        return Err(AppError::NotFound(format!("Order {id} not found")));
    }
    if order.status != OrderStatus::Pending {
        return Err(PaymentError::NotPayable(order.order_number).into());
    }

    let payment = state
        .payment()
        .ok_or_else(|| AppError::ServiceUnavailable("Online payment is not available".into()))?;

    let base = format!("orders/{}", order.order_number);
    let success_url = state.config().url_for(&format!("{base}?checkout=success"));
    let cancel_url = state.config().url_for(&format!("{base}?checkout=cancelled"));

    let checkout = payment
        .create_checkout_session(&order, &success_url, &cancel_url)
        .await?;
    OrderRepository::new(state.pool())
        .set_payment_session(order.id, &checkout.id)
        .await?;

    Ok(Json(CheckoutResponse {
        id: checkout.id,
        url: checkout.url,
    }))
}

/// `GET /api/orders` - every order, optionally narrowed by `?status=`.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list(filter.status).await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<TrackedOrder>> {
    Ok(Json(find_order(&state, id).await?.into()))
}

/// `PATCH /api/orders/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<TrackedOrder>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, body.status)
        .await?;

    tracing::info!(
        order_number = %order.order_number,
        status = %order.status,
        admin = %admin.email,
        "Order status updated"
    );
    Ok(Json(order.into()))
}
