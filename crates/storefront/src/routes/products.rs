//! Catalog routes: product listing, search, detail and price presets.
//!
//! Every listing runs the same filter engine over the rows it loaded, so
//! `/api/products`, `/api/products/search` and the category listing accept the
//! same query parameters.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use pawfect_core::catalog::{
    Category, PRICE_PRESETS, PricePreset, Product, ProductFilters, apply_filters,
};

use crate::db::{ProductRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::models::Review;
use crate::state::AppState;

/// A product as sent to clients, with its derived discount.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub discount_percentage: Option<i64>,
    pub is_on_sale: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            discount_percentage: product.discount_percentage(),
            is_on_sale: product.is_on_sale(),
            product,
        }
    }
}

/// A filtered listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub products: Vec<ProductView>,
    pub total: usize,
    /// Number of rows before filtering.
    pub unfiltered_total: usize,
    pub active_filters: usize,
    pub filters: ProductFilters,
}

impl ProductListing {
    /// Run the filter engine over `products`.
    #[must_use]
    pub fn build(products: &[Product], filters: ProductFilters) -> Self {
        let matched = apply_filters(products, &filters);
        Self {
            total: matched.len(),
            unfiltered_total: products.len(),
            active_filters: filters.active_count(),
            products: matched.into_iter().map(ProductView::from).collect(),
            filters,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListing {
    pub query: String,
    #[serde(flatten)]
    pub listing: ProductListing,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductView,
    pub category: Option<Category>,
    pub reviews: Vec<Review>,
}

/// `GET /api/products`
pub async fn index(
    State(state): State<AppState>,
    Query(filters): Query<ProductFilters>,
) -> Result<Json<ProductListing>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(ProductListing::build(&products, filters)))
}

/// `GET /api/products/search?q=`
///
/// A blank query matches nothing rather than the whole catalog.
pub async fn search(
    State(state): State<AppState>,
    Query(search): Query<SearchQuery>,
    Query(filters): Query<ProductFilters>,
) -> Result<Json<SearchListing>> {
    let query = search.q.trim().to_owned();
    let products = if query.is_empty() {
        Vec::new()
    } else {
        ProductRepository::new(state.pool()).search(&query).await?
    };

    Ok(Json(SearchListing {
        query,
        listing: ProductListing::build(&products, filters),
    }))
}

/// `GET /api/products/price-ranges`
pub async fn price_ranges() -> Json<&'static [PricePreset]> {
    Json(&PRICE_PRESETS)
}

/// `GET /api/products/{slug}`
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No product named `{slug}`")))?;

    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(product.id)
        .await?;
    let category = match product.category_id {
        Some(id) => state.categories().await?.iter().find(|c| c.id == id).cloned(),
        None => None,
    };

    Ok(Json(ProductDetail {
        product: product.into(),
        category,
        reviews,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use pawfect_core::ProductId;

    use super::*;

    fn product(id: i64, price: i64, original: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            slug: format!("p-{id}"),
            name: format!("Product {id}"),
            description: String::new(),
            images: Vec::new(),
            price: Decimal::from(price),
            original_price: original.map(Decimal::from),
            rating: Decimal::ZERO,
            review_count: 0,
            category_id: None,
            in_stock: true,
            on_sale: false,
            free_shipping: false,
            is_bestseller: false,
            featured: false,
            features: Vec::new(),
            colors: Vec::new(),
            tags: Vec::new(),
            specs: serde_json::Map::new(),
            stock: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_view_adds_discount() {
        let json = serde_json::to_value(ProductView::from(product(1, 75, Some(100)))).unwrap();
        assert_eq!(json["discountPercentage"], 25);
        assert_eq!(json["isOnSale"], true);
        assert_eq!(json["slug"], "p-1");
    }

    #[test]
    fn test_listing_counts() {
        let products = vec![product(1, 20, None), product(2, 300, None)];
        let filters = ProductFilters {
            max_price: Decimal::from(100),
            ..ProductFilters::default()
        };

        let listing = ProductListing::build(&products, filters);

        assert_eq!(listing.total, 1);
        assert_eq!(listing.unfiltered_total, 2);
        assert_eq!(listing.active_filters, 1);
    }

    #[test]
    fn test_filters_parse_from_query_string() {
        let uri: axum::http::Uri = "/api/products?minPrice=50&maxPrice=100&onSale=true&sortBy=priceDesc&q=collar"
            .parse()
            .unwrap();
        let Query(filters) = Query::<ProductFilters>::try_from_uri(&uri).unwrap();

        assert_eq!(filters.min_price, Decimal::from(50));
        assert!(filters.on_sale);
        assert_eq!(filters.sort_by, pawfect_core::catalog::SortBy::PriceDesc);
        assert_eq!(filters.rating, None);
    }
}
