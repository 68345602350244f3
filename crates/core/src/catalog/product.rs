//! Product and category records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CategoryId, ProductId};

/// A catalog product as returned by the JSON API.
///
/// The discount is never stored; [`Product::discount_percentage`] derives it
/// from `price` and `originalPrice` whenever it is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default)]
    pub review_count: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub in_stock: bool,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Percent off the original price, rounded half-up to a whole number.
    ///
    /// Returns `None` when there is no original price or it is not positive.
    /// A price above the original yields a negative percentage.
    #[must_use]
    pub fn discount_percentage(&self) -> Option<i64> {
        let original = self.original_price?;
        if original <= Decimal::ZERO {
            return None;
        }
        let percent = (original - self.price) / original * Decimal::ONE_HUNDRED;
        let rounded = (percent + Decimal::new(5, 1)).floor();
        i64::try_from(rounded).ok()
    }

    /// A product is on sale when flagged as such or when it carries an
    /// original price.
    #[must_use]
    pub const fn is_on_sale(&self) -> bool {
        self.on_sale || self.original_price.is_some()
    }
}

/// A product category with its derived product count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub product_count: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal product for tests; callers tweak fields as needed.
    pub fn product(id: i64, price: i64) -> Product {
        let now = DateTime::<Utc>::UNIX_EPOCH;
        Product {
            id: ProductId::new(id),
            slug: format!("product-{id}"),
            name: format!("Product {id}"),
            description: String::new(),
            images: Vec::new(),
            price: Decimal::from(price),
            original_price: None,
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
            stock: 10,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_discount_from_original_price() {
        let mut p = product(1, 75);
        p.original_price = Some(Decimal::from(100));
        assert_eq!(p.discount_percentage(), Some(25));
    }

    #[test]
    fn test_discount_rounds_half_up() {
        // 12.5% off
        let mut p = product(1, 35);
        p.original_price = Some(Decimal::from(40));
        assert_eq!(p.discount_percentage(), Some(13));

        // 2.5% off; banker's rounding would give 2
        p.price = Decimal::new(39, 0);
        assert_eq!(p.discount_percentage(), Some(3));
    }

    #[test]
    fn test_no_discount_without_positive_original() {
        let mut p = product(1, 10);
        assert_eq!(p.discount_percentage(), None);
        p.original_price = Some(Decimal::ZERO);
        assert_eq!(p.discount_percentage(), None);
    }

    #[test]
    fn test_on_sale_signal() {
        let mut p = product(1, 10);
        assert!(!p.is_on_sale());
        p.original_price = Some(Decimal::from(20));
        assert!(p.is_on_sale());
        p.original_price = None;
        p.on_sale = true;
        assert!(p.is_on_sale());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(product(3, 20)).unwrap();
        assert!(json.get("reviewCount").is_some());
        assert!(json.get("isBestseller").is_some());
        assert!(json.get("originalPrice").is_some());
    }
}
