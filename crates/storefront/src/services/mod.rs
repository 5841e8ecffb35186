//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login
//! - `media` - Cloudinary upload signing
//! - `payments` - Payment webhook verification and event decoding

pub mod auth;
pub mod media;
pub mod payments;
