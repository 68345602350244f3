//! Pawfect Core - Shared types and catalog logic.
//!
//! This crate provides the pieces used across all Pawfect Supply components:
//! - `storefront` - Public storefront and admin JSON API
//! - `cli` - Command-line tools for migrations, seeding and admin accounts
//!
//! # Architecture
//!
//! The core crate contains types and pure functions only - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! running server.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, addresses and status enums
//! - [`catalog`] - Product listing type, filter engine, price range selector
//!   and rating summaries
//! - [`orders`] - Order pricing and revenue/customer aggregates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod orders;
pub mod types;

pub use types::*;
