//! Admin dashboard and catalog management.
//!
//! Every handler takes [`RequireAdmin`], which re-checks the role against the
//! database on each request.

use std::collections::HashMap;
use std::path::Path as FsPath;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use pawfect_core::orders::revenue;
use pawfect_core::{OrderStatus, ProductId, UserId};

use crate::db::products::ProductInput;
use crate::db::users::Customer;
use crate::db::{OrderRepository, ProductRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Order, User};
use crate::services::product_form::parse_product_form;
use crate::services::uploads::{remove_images, save_image};
use crate::state::AppState;

use super::products::ProductView;

const RECENT_ORDERS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub status: OrderStatus,
    pub count: i64,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: usize,
    /// Excludes cancelled and refunded orders.
    pub total_revenue: Decimal,
    pub orders_by_status: Vec<StatusBreakdown>,
    pub recent_orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct CustomerOrders {
    pub customer: Customer,
    pub orders: Vec<Order>,
}

/// Count and sum orders per status, listing every status even when empty.
fn status_breakdown(orders: &[(OrderStatus, Decimal)]) -> Vec<StatusBreakdown> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| {
            let (count, total) = orders
                .iter()
                .filter(|(s, _)| *s == status)
                .fold((0, Decimal::ZERO), |(count, sum), (_, total)| {
                    (count + 1, sum + total)
                });
            StatusBreakdown {
                status,
                count,
                total,
            }
        })
        .collect()
}

/// `GET /api/admin/dashboard`
#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Dashboard>> {
    let users = UserRepository::new(state.pool());
    let products = ProductRepository::new(state.pool());
    let orders = OrderRepository::new(state.pool());

    let (total_users, total_products, status_totals, recent_orders) = tokio::try_join!(
        users.count(),
        products.count(),
        orders.status_totals(),
        orders.recent(RECENT_ORDERS),
    )?;

    Ok(Json(Dashboard {
        total_users,
        total_products,
        total_orders: status_totals.len(),
        total_revenue: revenue(status_totals.iter().copied()),
        orders_by_status: status_breakdown(&status_totals),
        recent_orders,
    }))
}

/// `GET /api/admin/users`
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<User>>> {
    Ok(Json(UserRepository::new(state.pool()).list().await?))
}

/// `GET /api/admin/customers`
pub async fn customers(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Customer>>> {
    Ok(Json(UserRepository::new(state.pool()).list_customers().await?))
}

async fn find_customer(state: &AppState, id: UserId) -> Result<Customer> {
    UserRepository::new(state.pool())
        .get_customer(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {id} not found")))
}

/// `GET /api/admin/customers/{id}`
pub async fn customer(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Customer>> {
    Ok(Json(find_customer(&state, id).await?))
}

/// `GET /api/admin/customers/{id}/orders`
pub async fn customer_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<CustomerOrders>> {
    let customer = find_customer(&state, id).await?;
    let orders = OrderRepository::new(state.pool()).list_for_user(id).await?;
    Ok(Json(CustomerOrders { customer, orders }))
}

/// `GET /api/admin/products`
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// Text fields and image files from a product form.
struct ProductUpload {
    fields: HashMap<String, String>,
    files: Vec<(String, Vec<u8>)>,
}

async fn read_product_form(mut multipart: Multipart) -> Result<ProductUpload> {
    let mut upload = ProductUpload {
        fields: HashMap::new(),
        files: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        let file_name = field.file_name().map(str::to_owned);

        match file_name {
            Some(file_name) => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?;
                // Browsers send an empty part for an untouched file input.
                if !data.is_empty() {
                    upload.files.push((file_name, data.to_vec()));
                }
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?;
                upload.fields.insert(name, text);
            }
        }
    }
    Ok(upload)
}

/// Validate the text fields, then store the images. Nothing is written to
/// disk for a form that fails validation.
///
/// Returns the input and the URLs of the images stored for it.
async fn product_input(
    upload_dir: &FsPath,
    multipart: Multipart,
) -> Result<(ProductInput, Vec<String>)> {
    let upload = read_product_form(multipart).await?;
    let mut input = parse_product_form(&upload.fields, Vec::new()).map_err(AppError::validation)?;

    let mut saved = Vec::with_capacity(upload.files.len());
    for (file_name, data) in &upload.files {
        match save_image(upload_dir, file_name, data).await {
            Ok(url) => saved.push(url),
            Err(e) => {
                remove_images(upload_dir, &saved).await;
                return Err(e.into());
            }
        }
    }
    input.images.extend(saved.iter().cloned());
    Ok((input, saved))
}

/// Remove the images stored for a catalog write that failed.
async fn discard_on_error<T>(
    upload_dir: &FsPath,
    saved: &[String],
    result: std::result::Result<T, RepositoryError>,
) -> Result<T> {
    if result.is_err() {
        remove_images(upload_dir, saved).await;
    }
    Ok(result?)
}

/// `POST /api/admin/products`
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductView>)> {
    let upload_dir = &state.config().upload_dir;
    let (input, saved) = product_input(upload_dir, multipart).await?;
    let created = ProductRepository::new(state.pool()).create(&input).await;
    let product = discard_on_error(upload_dir, &saved, created).await?;
    state.invalidate_categories().await;

    tracing::info!(product = %product.slug, admin = %admin.email, "Product created");
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// `PUT /api/admin/products/{id}`
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<ProductView>> {
    let upload_dir = &state.config().upload_dir;
    let (input, saved) = product_input(upload_dir, multipart).await?;
    let updated = ProductRepository::new(state.pool()).update(id, &input).await;
    let product = discard_on_error(upload_dir, &saved, updated).await?;
    state.invalidate_categories().await;

    tracing::info!(product = %product.slug, admin = %admin.email, "Product updated");
    Ok(Json(product.into()))
}

/// `DELETE /api/admin/products/{id}`
///
/// Products that appear in orders can't be deleted.
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    state.invalidate_categories().await;

    tracing::info!(product_id = %id, admin = %admin.email, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[tokio::test]
    async fn test_failed_write_removes_new_images() {
        let dir = std::env::temp_dir().join(format!("pawfect-admin-{}", uuid::Uuid::new_v4()));
        let kept = save_image(&dir, "bowl.png", PNG).await.unwrap();
        let dropped = save_image(&dir, "leash.png", PNG).await.unwrap();
        let on_disk = |url: &str| dir.join(url.trim_start_matches("/uploads/"));

        let ok: std::result::Result<(), RepositoryError> = Ok(());
        discard_on_error(&dir, std::slice::from_ref(&kept), ok)
            .await
            .unwrap();
        assert!(on_disk(&kept).exists());

        let conflict: std::result::Result<(), RepositoryError> =
            Err(RepositoryError::Conflict("slug already exists".into()));
        let err = discard_on_error(&dir, std::slice::from_ref(&dropped), conflict)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(RepositoryError::Conflict(_))));
        assert!(!on_disk(&dropped).exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_status_breakdown_lists_every_status() {
        let orders = [
            (OrderStatus::Delivered, Decimal::from(40)),
            (OrderStatus::Pending, Decimal::from(15)),
            (OrderStatus::Delivered, Decimal::from(10)),
            (OrderStatus::Refunded, Decimal::from(99)),
        ];

        let breakdown = status_breakdown(&orders);

        assert_eq!(breakdown.len(), OrderStatus::ALL.len());
        let delivered = breakdown
            .iter()
            .find(|b| b.status == OrderStatus::Delivered);
        assert_eq!(
            delivered,
            Some(&StatusBreakdown {
                status: OrderStatus::Delivered,
                count: 2,
                total: Decimal::from(50),
            })
        );
        let shipped = breakdown.iter().find(|b| b.status == OrderStatus::Shipped);
        assert_eq!(shipped.map(|b| b.count), Some(0));
        assert_eq!(revenue(orders.iter().copied()), Decimal::from(65));
    }
}
