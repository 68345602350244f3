//! Integration tests for the admin dashboard and catalog management.
//!
//! These tests require the storefront running against a seeded database and
//! `PAWFECT_TEST_ADMIN_EMAIL` / `PAWFECT_TEST_ADMIN_PASSWORD`.

use pawfect_integration_tests::{admin_client, client, get_json, unique_email, url};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

#[tokio::test]
#[ignore = "Requires running storefront and admin credentials"]
async fn test_dashboard_totals() {
    let admin = admin_client().await;
    let body = get_json(&admin, "/api/admin/dashboard", StatusCode::OK).await;

    assert!(body["totalUsers"].as_i64().expect("users") >= 1);
    assert!(body["totalProducts"].is_i64());
    assert!(body["totalRevenue"].is_string());
    assert_eq!(body["ordersByStatus"].as_array().expect("breakdown").len(), 6);
    assert!(body["recentOrders"].as_array().expect("recent").len() <= 5);
}

#[tokio::test]
#[ignore = "Requires running storefront and admin credentials"]
async fn test_customers_list() {
    let admin = admin_client().await;
    let customers = get_json(&admin, "/api/admin/customers", StatusCode::OK).await;

    for customer in customers.as_array().expect("customers") {
        assert_eq!(customer["role"], "USER");
        assert!(customer["orderCount"].is_i64());
        assert!(customer["totalSpent"].is_string());
    }
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_admin_routes_require_session() {
    let resp = client()
        .get(url("/api/admin/customers"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront and admin credentials"]
async fn test_product_lifecycle_with_upload() {
    let admin = admin_client().await;
    let slug = format!("it-{}", unique_email("p").replace(['@', '.', '+'], "-"));

    let form = Form::new()
        .text("name", "Integration Test Harness")
        .text("slug", slug.clone())
        .text("price", "19.99")
        .text("originalPrice", "24.99")
        .text("stock", "3")
        .text("tags", json!(["harness", "dog"]).to_string())
        .text("specs", json!({ "size": "M" }).to_string())
        .part(
            "images",
            Part::bytes(PNG.to_vec())
                .file_name("harness.png")
                .mime_str("image/png")
                .expect("mime"),
        );

    let resp = admin
        .post(url("/api/admin/products"))
        .multipart(form)
        .send()
        .await
        .expect("create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = resp.json().await.expect("json");
    assert_eq!(product["discountPercentage"], 20);
    let image = product["images"][0].as_str().expect("image url");
    assert!(image.starts_with("/uploads/"));

    let resp = admin.get(url(image)).send().await.expect("uploaded image");
    assert_eq!(resp.status(), StatusCode::OK);

    let update = Form::new()
        .text("name", "Integration Test Harness")
        .text("slug", slug.clone())
        .text("price", "17.50")
        .text("existingImages", json!([image]).to_string());
    let resp = admin
        .put(url(&format!("/api/admin/products/{}", product["id"])))
        .multipart(update)
        .send()
        .await
        .expect("update product");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("json");
    assert_eq!(updated["price"], "17.50");
    assert_eq!(updated["images"].as_array().expect("images").len(), 1);

    let resp = admin
        .delete(url(&format!("/api/admin/products/{}", product["id"])))
        .send()
        .await
        .expect("delete product");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running storefront and admin credentials"]
async fn test_invalid_product_form_reports_fields() {
    let admin = admin_client().await;
    let form = Form::new().text("price", "free").text("tags", "a,b");

    let resp = admin
        .post(url("/api/admin/products"))
        .multipart(form)
        .send()
        .await
        .expect("create product");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("json");
    assert!(body["fields"]["name"].is_string());
    assert!(body["fields"]["price"].is_string());
    assert!(body["fields"]["tags"].is_string());
}
