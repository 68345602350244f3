//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /api/products                       - Filtered product listing
//! GET    /api/products/search?q=             - Search, then filter
//! GET    /api/products/price-ranges          - Price presets
//! GET    /api/products/{slug}                - Product detail with reviews
//! GET    /api/products/{slug}/reviews        - Reviews and rating summary
//! POST   /api/products/{slug}/reviews        - Post a review (signed in, rate limited)
//! POST   /api/reviews/{id}/helpful           - Mark a review helpful, once per session
//! GET    /api/categories                     - Categories with product counts
//! GET    /api/categories/{slug}/products     - Filtered category listing
//!
//! # Auth (rate limited)
//! POST   /api/auth/signup                    - Start signup, email a code
//! POST   /api/auth/resend-otp                - Replace the code
//! POST   /api/auth/verify-otp                - Create the account
//! POST   /api/auth/login
//! POST   /api/auth/logout
//! GET    /api/auth/me
//! POST   /api/auth/forgot-password
//! POST   /api/auth/reset-password
//!
//! # Orders
//! POST   /api/orders                         - Place an order (guest or signed in)
//! POST   /api/orders/{id}/checkout           - Hosted checkout session
//! GET    /api/orders                         - All orders (admin)
//! GET    /api/orders/{id}                    - One order (admin)
//! PATCH  /api/orders/{id}/status             - Set status (admin)
//!
//! # Shopper (signed in)
//! GET    /api/user/orders
//! GET    /api/user/orders/{id}
//! GET    /api/user/wishlist
//! POST   /api/user/wishlist
//! DELETE /api/user/wishlist/{productId}
//!
//! # Admin
//! GET    /api/admin/dashboard
//! GET    /api/admin/users
//! GET    /api/admin/customers
//! GET    /api/admin/customers/{id}
//! GET    /api/admin/customers/{id}/orders
//! GET    /api/admin/products
//! POST   /api/admin/products                 - Multipart
//! PUT    /api/admin/products/{id}            - Multipart
//! DELETE /api/admin/products/{id}
//! ```

pub mod admin;
pub mod auth;
pub mod categories;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod user;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::services::uploads::MAX_IMAGE_SIZE;
use crate::state::AppState;

/// Room for a product form with several full-size images.
const PRODUCT_FORM_LIMIT: usize = 8 * MAX_IMAGE_SIZE;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/search", get(products::search))
        .route("/price-ranges", get(products::price_ranges))
        .route("/{slug}", get(products::show))
        .route(
            "/{slug}/reviews",
            get(reviews::index).merge(post(reviews::create).layer(api_rate_limiter())),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{slug}/products", get(categories::products))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    let shopper = Router::new()
        .route("/", post(orders::place))
        .route("/{id}/checkout", post(orders::checkout))
        .layer(api_rate_limiter());

    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", patch(orders::update_status))
        .merge(shopper)
}

/// Create the signed-in shopper routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(user::orders))
        .route("/orders/{id}", get(user::order))
        .route(
            "/wishlist",
            get(user::wishlist).post(user::add_to_wishlist),
        )
        .route(
            "/wishlist/{product_id}",
            axum::routing::delete(user::remove_from_wishlist),
        )
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    let product_forms = Router::new()
        .route("/products", post(admin::create_product))
        .route("/products/{id}", put(admin::update_product))
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT));

    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::users))
        .route("/customers", get(admin::customers))
        .route("/customers/{id}", get(admin::customer))
        .route("/customers/{id}/orders", get(admin::customer_orders))
        .route("/products", get(admin::products))
        .route("/products/{id}", axum::routing::delete(admin::delete_product))
        .merge(product_forms)
}

/// Create all routes for the storefront API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        .route(
            "/api/reviews/{id}/helpful",
            post(reviews::helpful).layer(api_rate_limiter()),
        )
        .nest("/api/categories", category_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/user", user_routes())
        .nest("/api/admin", admin_routes())
}
