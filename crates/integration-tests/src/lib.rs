//! Integration tests for Pawfect Supply.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and seed a database, then start the storefront
//! cargo run -p pawfect-cli -- migrate
//! cargo run -p pawfect-cli -- seed
//! cargo run -p pawfect-storefront
//!
//! # Run the ignored tests against it
//! cargo test -p pawfect-integration-tests -- --ignored
//! ```
//!
//! Admin tests also need an admin account, created with
//! `pawfect admin create`, whose credentials are passed in
//! `PAWFECT_TEST_ADMIN_EMAIL` and `PAWFECT_TEST_ADMIN_PASSWORD`.

#![allow(clippy::missing_panics_doc)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Base URL of the running storefront (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Absolute URL for an API path.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// A client with its own cookie jar, i.e. its own session.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// An email address no other test run uses.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}+{}@example.com", uuid::Uuid::new_v4().simple())
}

/// A client signed in as the admin named by the test environment.
pub async fn admin_client() -> Client {
    let email = std::env::var("PAWFECT_TEST_ADMIN_EMAIL").expect("PAWFECT_TEST_ADMIN_EMAIL not set");
    let password =
        std::env::var("PAWFECT_TEST_ADMIN_PASSWORD").expect("PAWFECT_TEST_ADMIN_PASSWORD not set");

    let client = client();
    let resp = client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK, "admin login failed");
    client
}

/// GET a path and decode the JSON body, asserting the expected status.
pub async fn get_json(client: &Client, path: &str, expected: StatusCode) -> Value {
    let resp = client
        .get(url(path))
        .send()
        .await
        .unwrap_or_else(|e| panic!("GET {path} failed: {e}"));
    assert_eq!(resp.status(), expected, "GET {path}");
    resp.json().await.expect("Failed to decode JSON")
}

/// The first in-stock product of the seeded catalog.
pub async fn in_stock_product(client: &Client) -> Value {
    let listing = get_json(client, "/api/products?inStock=true", StatusCode::OK).await;
    listing["products"]
        .as_array()
        .and_then(|products| products.first())
        .cloned()
        .expect("seeded catalog has an in-stock product")
}

/// A complete shipping address.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "fullName": "Sam Rivera",
        "line1": "12 Bark St",
        "city": "Portland",
        "state": "OR",
        "postalCode": "97201",
        "country": "US"
    })
}
