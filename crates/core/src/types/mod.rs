//! Core types for Pawfect Supply.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod status;

pub use address::{
    Address, AddressError, AddressPayload, deserialize_address, deserialize_optional_address,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
