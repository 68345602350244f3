//! Domain models for the storefront.
//!
//! Catalog types (`Product`, `Category`) live in `pawfect_core::catalog`;
//! this module holds the records that only the server deals with.

pub mod order;
pub mod review;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order, TrackedOrder};
pub use review::{NewReview, Review};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
