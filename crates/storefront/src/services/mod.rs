//! Business logic services for the storefront.
//!
//! - `auth` - Password login and password reset
//! - `signup` - Email-verified signup with one-time codes
//! - `email` - Transactional email over SMTP
//! - `payment` - Hosted checkout sessions with the payment provider
//! - `uploads` - Product image storage
//! - `product_form` - Admin product form parsing

pub mod auth;
pub mod email;
pub mod payment;
pub mod product_form;
pub mod signup;
pub mod uploads;
