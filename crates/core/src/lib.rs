//! Shopkeep Core - Shared domain types.
//!
//! This crate provides the types used across the Shopkeep components:
//! - `storefront` - Catalog, cart, checkout and accounts web application
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and parsing rules - no I/O, no database
//! access, no HTTP. Database encoding for the id newtypes is available behind
//! the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, id lists, account fields, costs and quantities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
