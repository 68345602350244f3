//! Catalog domain logic: products, the filter engine, price range selection,
//! and rating summaries.
//!
//! Everything here is pure. Route handlers load rows from the database, hand
//! them to these functions, and serialize the result.

pub mod filter;
pub mod price_range;
pub mod product;
pub mod rating;

pub use filter::{ProductFilters, SortBy, apply_filters};
pub use price_range::{PRICE_PRESETS, PricePreset, PriceRange, PriceRangeSelector};
pub use product::{Category, Product};
pub use rating::{RatingSummary, Stars, StarsError};
