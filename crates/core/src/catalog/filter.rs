//! The product filter engine.
//!
//! One filter state and one function serve the product list, category pages
//! and search results. [`ProductFilters`] deserializes straight from the query
//! string, so every listing endpoint accepts the same parameters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::price_range::{PRICE_CEILING, PRICE_FLOOR, PriceRange};
use super::product::Product;

/// Sort order for a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    /// Source order.
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    /// Bestsellers first, otherwise source order.
    Popular,
    /// Highest rating first.
    Rating,
}

/// Facets narrowing a product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilters {
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// Minimum average rating.
    pub rating: Option<Decimal>,
    pub in_stock: bool,
    pub on_sale: bool,
    pub free_shipping: bool,
    pub is_bestseller: bool,
    pub featured: bool,
    /// Minimum percent off the original price.
    pub discount_percentage: Option<i64>,
    pub sort_by: SortBy,
}

impl Default for ProductFilters {
    fn default() -> Self {
        Self {
            min_price: PRICE_FLOOR,
            max_price: PRICE_CEILING,
            rating: None,
            in_stock: false,
            on_sale: false,
            free_shipping: false,
            is_bestseller: false,
            featured: false,
            discount_percentage: None,
            sort_by: SortBy::Default,
        }
    }
}

impl ProductFilters {
    /// Restore every facet to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The applied price range.
    #[must_use]
    pub const fn price_range(&self) -> PriceRange {
        PriceRange::new(self.min_price, self.max_price)
    }

    /// Replace the price bounds.
    pub const fn set_price_range(&mut self, range: PriceRange) {
        self.min_price = range.min;
        self.max_price = range.max;
    }

    /// Number of facets that differ from their defaults. The price range
    /// counts once; sort order does not count.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let defaults = Self::default();
        [
            self.price_range() != defaults.price_range(),
            self.rating.is_some(),
            self.in_stock,
            self.on_sale,
            self.free_shipping,
            self.is_bestseller,
            self.featured,
            self.discount_percentage.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// True when `product` passes every active predicate.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !self.price_range().contains(product.price) {
            return false;
        }

        if let Some(threshold) = self.discount_percentage {
            match product.discount_percentage() {
                Some(discount) if discount >= threshold => {}
                _ => return false,
            }
        }

        if let Some(min_rating) = self.rating
            && product.rating < min_rating
        {
            return false;
        }

        (!self.in_stock || product.in_stock)
            && (!self.on_sale || product.is_on_sale())
            && (!self.free_shipping || product.free_shipping)
            && (!self.is_bestseller || product.is_bestseller)
            && (!self.featured || product.featured)
    }
}

/// Narrow and order `products` according to `filters`.
///
/// The sort is stable, so ties keep their source order and the default sort
/// returns the matching products exactly as given. An empty result is not an
/// error.
#[must_use]
pub fn apply_filters(products: &[Product], filters: &ProductFilters) -> Vec<Product> {
    let mut matching: Vec<Product> = products
        .iter()
        .filter(|product| filters.matches(product))
        .cloned()
        .collect();

    match filters.sort_by {
        SortBy::Default => {}
        SortBy::PriceAsc => matching.sort_by(|a, b| a.price.cmp(&b.price)),
        SortBy::PriceDesc => matching.sort_by(|a, b| b.price.cmp(&a.price)),
        SortBy::Popular => matching.sort_by_key(|product| !product.is_bestseller),
        SortBy::Rating => matching.sort_by(|a, b| b.rating.cmp(&a.rating)),
    }

    matching
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::price_range::{PRICE_PRESETS, PriceRangeSelector};
    use crate::catalog::product::fixtures::product;

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id.as_i64()).collect()
    }

    fn catalog() -> Vec<Product> {
        let mut list = vec![
            product(1, 30),
            product(2, 75),
            product(3, 120),
            product(4, 640),
            product(5, 55),
            product(6, 2_400),
        ];
        list[1].original_price = Some(Decimal::from(100));
        list[1].rating = Decimal::new(46, 1);
        list[1].is_bestseller = true;
        list[2].in_stock = false;
        list[2].free_shipping = true;
        list[3].featured = true;
        list[3].rating = Decimal::new(38, 1);
        list[4].on_sale = true;
        list[4].is_bestseller = true;
        list
    }

    #[test]
    fn test_default_filters_are_identity() {
        let mut list = catalog();
        list.pop(); // drop the product above the default ceiling
        let result = apply_filters(&list, &ProductFilters::default());
        assert_eq!(result, list);
    }

    #[test]
    fn test_price_bounds_are_inclusive_and_exclusive_outside() {
        let filters = ProductFilters {
            min_price: Decimal::from(55),
            max_price: Decimal::from(120),
            ..ProductFilters::default()
        };
        let result = apply_filters(&catalog(), &filters);

        assert_eq!(ids(&result), vec![2, 3, 5]);
        for p in &result {
            assert!(p.price >= filters.min_price && p.price <= filters.max_price);
        }
    }

    #[test]
    fn test_discount_threshold() {
        let mut filters = ProductFilters {
            discount_percentage: Some(25),
            ..ProductFilters::default()
        };
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![2]);

        filters.discount_percentage = Some(30);
        assert!(apply_filters(&catalog(), &filters).is_empty());
    }

    #[test]
    fn test_discount_threshold_excludes_products_without_original_price() {
        let filters = ProductFilters {
            discount_percentage: Some(0),
            ..ProductFilters::default()
        };
        // product 5 is flagged on sale but has no original price
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![2]);
    }

    #[test]
    fn test_on_sale_accepts_flag_or_original_price() {
        let filters = ProductFilters {
            on_sale: true,
            ..ProductFilters::default()
        };
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![2, 5]);
    }

    #[test]
    fn test_toggles_are_conjunctive() {
        let filters = ProductFilters {
            is_bestseller: true,
            on_sale: true,
            rating: Some(Decimal::new(45, 1)),
            ..ProductFilters::default()
        };
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![2]);

        let filters = ProductFilters {
            in_stock: true,
            free_shipping: true,
            ..ProductFilters::default()
        };
        assert!(apply_filters(&catalog(), &filters).is_empty());
    }

    #[test]
    fn test_apply_filters_is_idempotent() {
        let filters = ProductFilters {
            max_price: Decimal::from(700),
            sort_by: SortBy::Popular,
            in_stock: true,
            ..ProductFilters::default()
        };
        let once = apply_filters(&catalog(), &filters);
        let twice = apply_filters(&once, &filters);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_price_sorts_are_reverses() {
        let mut filters = ProductFilters {
            sort_by: SortBy::PriceAsc,
            ..ProductFilters::default()
        };
        let asc = apply_filters(&catalog(), &filters);
        filters.sort_by = SortBy::PriceDesc;
        let mut desc = apply_filters(&catalog(), &filters);
        desc.reverse();

        assert_eq!(ids(&asc), vec![1, 5, 2, 3, 4]);
        assert_eq!(asc, desc);
    }

    #[test]
    fn test_popular_and_rating_sorts_are_stable() {
        let mut filters = ProductFilters {
            sort_by: SortBy::Popular,
            ..ProductFilters::default()
        };
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![2, 5, 1, 3, 4]);

        filters.sort_by = SortBy::Rating;
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_preset_applied_twice_matches_once() {
        let mut selector = PriceRangeSelector::new();
        let mut filters = ProductFilters::default();

        filters.set_price_range(selector.select_preset(&PRICE_PRESETS[1]));
        let once = apply_filters(&catalog(), &filters);

        filters.set_price_range(selector.select_preset(&PRICE_PRESETS[1]));
        let twice = apply_filters(&catalog(), &filters);

        assert_eq!(ids(&once), vec![2, 5]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reset_and_active_count() {
        let mut filters = ProductFilters {
            min_price: Decimal::from(50),
            featured: true,
            discount_percentage: Some(10),
            sort_by: SortBy::PriceDesc,
            ..ProductFilters::default()
        };
        assert_eq!(filters.active_count(), 3);

        filters.reset();
        assert_eq!(filters, ProductFilters::default());
        assert_eq!(filters.active_count(), 0);
    }

    #[test]
    fn test_deserializes_from_camel_case() {
        let filters: ProductFilters = serde_json::from_value(serde_json::json!({
            "minPrice": "10",
            "sortBy": "priceDesc",
            "isBestseller": true
        }))
        .unwrap();
        assert_eq!(filters.min_price, Decimal::from(10));
        assert_eq!(filters.max_price, PRICE_CEILING);
        assert_eq!(filters.sort_by, SortBy::PriceDesc);
        assert!(filters.is_bestseller);
    }
}
