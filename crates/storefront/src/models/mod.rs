//! Domain models for the storefront.
//!
//! Plain records returned by the repositories. Nothing here holds a
//! connection; handlers never mutate database-backed objects in place.

pub mod cart;
pub mod product;
pub mod session;
pub mod tag_delta;
pub mod taxonomy;
pub mod user;

pub use cart::{CartLine, CartSummary};
pub use product::{Product, ProductDetail, ProductInput};
pub use session::{SessionUser, keys as session_keys};
pub use tag_delta::TagDelta;
pub use taxonomy::{Brand, Category, Tag, Taxonomy, TaxonomyInput, Term};
pub use user::User;
