//! Seed the catalog with categories and products.
//!
//! Reads a JSON catalog (the bundled `seed/catalog.json` by default). Seeding
//! is idempotent: categories are upserted by slug and products whose slug
//! already exists are skipped.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use pawfect_core::CategoryId;
use pawfect_storefront::db::products::ProductInput;
use pawfect_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use pawfect_storefront::services::product_form::slugify;

use super::{CommandError, connect};

const BUNDLED_CATALOG: &str = include_str!("../../seed/catalog.json");

#[derive(Debug, Deserialize)]
pub struct SeedCatalog {
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub specs: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub stock: i32,
}

impl SeedProduct {
    fn into_input(self, category_id: CategoryId) -> ProductInput {
        ProductInput {
            slug: self.slug.unwrap_or_else(|| slugify(&self.name)),
            in_stock: self.in_stock.unwrap_or(self.stock > 0),
            name: self.name,
            description: self.description,
            images: self.images,
            price: self.price,
            original_price: self.original_price,
            category_id: Some(category_id),
            on_sale: self.on_sale,
            free_shipping: self.free_shipping,
            is_bestseller: self.is_bestseller,
            featured: self.featured,
            features: self.features,
            colors: self.colors,
            tags: self.tags,
            specs: self.specs,
            stock: self.stock,
        }
    }
}

/// Parse a seed catalog.
///
/// # Errors
///
/// Returns `CommandError::Invalid` if the JSON doesn't match the catalog shape.
pub fn parse_catalog(json: &str) -> Result<SeedCatalog, CommandError> {
    serde_json::from_str(json).map_err(|e| CommandError::Invalid(format!("seed catalog: {e}")))
}

/// Seed categories and products.
///
/// # Arguments
///
/// * `file_path` - JSON catalog to load instead of the bundled one
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, or a database
/// operation fails.
pub async fn catalog(file_path: Option<&Path>) -> Result<(), CommandError> {
    let catalog = match file_path {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog from file");
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| CommandError::Invalid(format!("{}: {e}", path.display())))?;
            parse_catalog(&content)?
        }
        None => parse_catalog(BUNDLED_CATALOG)?,
    };

    let pool = connect().await?;
    let categories = CategoryRepository::new(&pool);
    let products = ProductRepository::new(&pool);

    let (mut inserted, mut skipped) = (0_usize, 0_usize);
    for category in catalog.categories {
        let category_id = categories
            .upsert(
                &category.name,
                &category.slug,
                category.description.as_deref(),
                category.image.as_deref(),
            )
            .await?;
        info!(category = %category.slug, "Category ready");

        for product in category.products {
            let input = product.into_input(category_id);
            match products.create(&input).await {
                Ok(_) => inserted += 1,
                Err(RepositoryError::Conflict(_)) => {
                    info!(product = %input.slug, "Product exists, skipping");
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = parse_catalog(BUNDLED_CATALOG).unwrap();
        assert!(!catalog.categories.is_empty());
        assert!(catalog.categories.iter().all(|c| !c.products.is_empty()));
    }

    #[test]
    fn test_seed_product_defaults() {
        let product: SeedProduct =
            serde_json::from_str(r#"{"name": "Chew Rope Deluxe", "price": "12.00"}"#).unwrap();
        let input = product.into_input(CategoryId::new(7));

        assert_eq!(input.slug, "chew-rope-deluxe");
        assert_eq!(input.category_id, Some(CategoryId::new(7)));
        assert!(!input.in_stock);
        assert!(input.images.is_empty());
    }

    #[test]
    fn test_out_of_stock_flag_wins() {
        let product: SeedProduct = serde_json::from_str(
            r#"{"name": "Tag", "price": "5", "stock": 3, "inStock": false}"#,
        )
        .unwrap();
        assert!(!product.into_input(CategoryId::new(1)).in_stock);
    }
}
