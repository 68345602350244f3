//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use pawfect_core::catalog::Product;
use pawfect_core::{CategoryId, ProductId};

use super::RepositoryError;

pub(super) const PRODUCT_COLUMNS: &str = "id, slug, name, description, images, price, original_price, \
     rating, review_count, category_id, in_stock, on_sale, free_shipping, is_bestseller, \
     featured, features, colors, tags, specs, stock, created_at, updated_at";

/// Listing order shared by every catalog query: newest first.
pub(super) const LISTING_ORDER: &str = "ORDER BY created_at DESC, id DESC";

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    description: String,
    images: Vec<String>,
    price: Decimal,
    original_price: Option<Decimal>,
    rating: Decimal,
    review_count: i32,
    category_id: Option<CategoryId>,
    in_stock: bool,
    on_sale: bool,
    free_shipping: bool,
    is_bestseller: bool,
    featured: bool,
    features: Vec<String>,
    colors: Vec<String>,
    tags: Vec<String>,
    specs: Json<serde_json::Value>,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let specs = match row.specs.0 {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(RepositoryError::DataCorruption(format!(
                    "product {} specs is not an object: {other}",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            images: row.images,
            price: row.price,
            original_price: row.original_price,
            rating: row.rating,
            review_count: row.review_count,
            category_id: row.category_id,
            in_stock: row.in_stock,
            on_sale: row.on_sale,
            free_shipping: row.free_shipping,
            is_bestseller: row.is_bestseller,
            featured: row.featured,
            features: row.features,
            colors: row.colors,
            tags: row.tags,
            specs,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Writable product fields, as submitted by the admin product form.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub in_stock: bool,
    pub on_sale: bool,
    pub free_shipping: bool,
    pub is_bestseller: bool,
    pub featured: bool,
    pub features: Vec<String>,
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    pub specs: serde_json::Map<String, serde_json::Value>,
    pub stock: i32,
}

/// Escape `LIKE` wildcards so user input matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Repository for catalog product operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product, in listing order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products {LISTING_ORDER}"))
                .fetch_all(self.pool)
                .await?;
        into_products(rows)
    }

    /// Products in a category, in listing order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category_id = $1 {LISTING_ORDER}"
        ))
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    /// Case-insensitive substring search over name, description and tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE name ILIKE $1
               OR description ILIKE $1
               OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $1)
            {LISTING_ORDER}
            "
        ))
        .bind(like_pattern(query))
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"))
                .bind(slug)
                .fetch_optional(self.pool)
                .await?;
        row.map(Product::try_from).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        row.map(Product::try_from).transpose()
    }

    /// Fetch several products by ID. Missing IDs are silently skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category does not exist.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO products (slug, name, description, images, price, original_price,
                                  category_id, in_stock, on_sale, free_shipping, is_bestseller,
                                  featured, features, colors, tags, specs, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.images)
        .bind(input.price)
        .bind(input.original_price)
        .bind(input.category_id)
        .bind(input.in_stock)
        .bind(input.on_sale)
        .bind(input.free_shipping)
        .bind(input.is_bestseller)
        .bind(input.featured)
        .bind(&input.features)
        .bind(&input.colors)
        .bind(&input.tags)
        .bind(Json(&input.specs))
        .bind(input.stock)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "slug already exists or unknown category"))?;

        row.try_into()
    }

    /// Replace every writable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE products SET
                slug = $2, name = $3, description = $4, images = $5, price = $6,
                original_price = $7, category_id = $8, in_stock = $9, on_sale = $10,
                free_shipping = $11, is_bestseller = $12, featured = $13, features = $14,
                colors = $15, tags = $16, specs = $17, stock = $18, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.images)
        .bind(input.price)
        .bind(input.original_price)
        .bind(input.category_id)
        .bind(input.in_stock)
        .bind(input.on_sale)
        .bind(input.free_shipping)
        .bind(input.is_bestseller)
        .bind(input.featured)
        .bind(&input.features)
        .bind(&input.colors)
        .bind(&input.tags)
        .bind(Json(&input.specs))
        .bind(input.stock)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "slug already exists or unknown category"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if orders reference it.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "product appears in orders"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
