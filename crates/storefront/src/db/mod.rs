//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Site accounts (argon2 password hashes)
//! - `categories`, `tags`, `brands` - Catalog taxonomies
//! - `products` - Catalog items, one category, optional brand
//! - `products_tags` - Product/tag association
//! - `cart_items` - One row per (user, product) with a positive quantity
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shopkeep-cli -- migrate
//! ```

pub mod cart;
pub mod filter;
pub mod products;
pub mod taxonomy;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::CartRepository;
pub use filter::ProductFilter;
pub use products::ProductRepository;
pub use taxonomy::TaxonomyRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, category still in use).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A cart line would grow past the largest storable quantity.
    #[error("quantity would exceed {max}")]
    QuantityLimit { max: u32 },
}

impl RepositoryError {
    /// Map unique and foreign key violations to `Conflict`.
    fn from_constraint(e: sqlx::Error, unique: &str, foreign_key: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(unique.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(foreign_key.to_owned());
            }
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
