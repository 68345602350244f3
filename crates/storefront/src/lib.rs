//! Pawfect Supply storefront library.
//!
//! The JSON API behind the shop and the admin dashboard, provided as a
//! library so the binary, the CLI and tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::services::ServeDir;

use crate::services::uploads::PUBLIC_PREFIX;
use crate::state::AppState;

/// The API routes, uploaded images and the shared middleware that does not
/// depend on process setup (sessions, tracing and Sentry are added by the
/// binary).
pub fn app(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(routes::routes())
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&state.config().upload_dir))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
}
