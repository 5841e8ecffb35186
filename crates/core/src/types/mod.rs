//! Core types for Shopkeep.
//!
//! Validated wrappers for the values that cross the form / database boundary.

pub mod account;
pub mod id;
pub mod price;
pub mod quantity;

pub use account::{Email, EmailError, Username, UsernameError};
pub use id::*;
pub use price::{Cost, CostError, Price};
pub use quantity::{Quantity, QuantityError};
