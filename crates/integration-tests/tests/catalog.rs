//! Integration tests for the public catalog.
//!
//! These tests require:
//! - A migrated and seeded database (`pawfect migrate`, `pawfect seed`)
//! - The storefront running (cargo run -p pawfect-storefront)

use pawfect_integration_tests::{client, get_json, url};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_health_endpoints() {
    let client = client();

    let resp = client.get(url("/health")).send().await.expect("health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = client.get(url("/health/ready")).send().await.expect("ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded catalog"]
async fn test_listing_reports_counts_and_discounts() {
    let body = get_json(&client(), "/api/products", StatusCode::OK).await;

    let products = body["products"].as_array().expect("products array");
    assert!(!products.is_empty());
    assert_eq!(body["total"].as_u64(), Some(products.len() as u64));
    assert_eq!(body["activeFilters"], 0);

    for product in products {
        if product["originalPrice"].is_null() {
            assert!(product["discountPercentage"].is_null());
        } else {
            assert_eq!(product["isOnSale"], true);
        }
    }
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded catalog"]
async fn test_filters_narrow_and_sort() {
    let body = get_json(
        &client(),
        "/api/products?minPrice=50&maxPrice=250&sortBy=priceAsc",
        StatusCode::OK,
    )
    .await;

    assert_eq!(body["activeFilters"], 1);
    let prices: Vec<f64> = body["products"]
        .as_array()
        .expect("products array")
        .iter()
        .map(|p| p["price"].as_str().expect("price string").parse().expect("decimal"))
        .collect();
    assert!(prices.iter().all(|p| (50.0..=250.0).contains(p)));
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_blank_search_matches_nothing() {
    let body = get_json(&client(), "/api/products/search?q=%20", StatusCode::OK).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["query"], "");
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_price_presets() {
    let body = get_json(&client(), "/api/products/price-ranges", StatusCode::OK).await;
    let presets = body.as_array().expect("presets array");
    assert_eq!(presets.len(), 5);
    assert_eq!(presets[0]["label"], "Under $50");
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded catalog"]
async fn test_category_listing_uses_same_filters() {
    let client = client();
    let categories = get_json(&client, "/api/categories", StatusCode::OK).await;
    let first = &categories.as_array().expect("categories array")[0];
    let slug = first["slug"].as_str().expect("slug");

    let body = get_json(
        &client,
        &format!("/api/categories/{slug}/products?freeShipping=true"),
        StatusCode::OK,
    )
    .await;

    assert_eq!(body["category"]["slug"], slug);
    assert!(
        body["products"]
            .as_array()
            .expect("products array")
            .iter()
            .all(|p| p["freeShipping"] == true)
    );
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_unknown_product_is_json_404() {
    let body = get_json(
        &client(),
        "/api/products/no-such-product",
        StatusCode::NOT_FOUND,
    )
    .await;
    assert!(body["error"].is_string());
}
