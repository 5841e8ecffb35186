//! Cart repository.
//!
//! `cart_items` holds at most one row per `(user_id, product_id)`, enforced
//! by a unique constraint. Adding a product that is already in the cart
//! increases the existing line's quantity in the same statement, so
//! concurrent adds never produce a second row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shopkeep_core::{BrandId, CartItemId, CategoryId, Cost, ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::{CartLine, CartSummary, Category, Product};

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    quantity: i32,
    product_id: ProductId,
    name: String,
    cost: i64,
    description: String,
    image_url: Option<String>,
    category_id: CategoryId,
    brand_id: Option<BrandId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: String,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = stored_quantity(row.quantity)?;
        let cost = Cost::new(row.cost).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid cost for product {}: {e}",
                row.product_id
            ))
        })?;

        Ok(Self {
            id: row.id,
            quantity,
            category: Category {
                id: row.category_id,
                name: row.category_name,
            },
            product: Product {
                id: row.product_id,
                name: row.name,
                cost,
                description: row.description,
                image_url: row.image_url,
                category_id: row.category_id,
                brand_id: row.brand_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
    }
}

/// Repository for cart line operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's cart lines with product and category, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<CartSummary, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id, ci.quantity,
                   p.id AS product_id, p.name, p.cost, p.description, p.image_url,
                   p.category_id, p.brand_id, p.created_at, p.updated_at,
                   c.name AS category_name
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            JOIN categories c ON c.id = p.category_id
            WHERE ci.user_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CartSummary::new(lines))
    }

    /// Add `quantity` of a product, creating the line or growing it.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or user does not exist.
    /// Returns `RepositoryError::QuantityLimit` if the line would grow past
    /// [`Quantity::MAX`]; the stored line is left unchanged.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError> {
        // When the guard fails no row is returned and nothing is written.
        let new_quantity: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity::bigint + EXCLUDED.quantity <= $4
            RETURNING quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .bind(i64::from(Quantity::MAX))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        let Some(new_quantity) = new_quantity else {
            tracing::debug!(%user_id, %product_id, "Cart line at quantity limit");
            return Err(RepositoryError::QuantityLimit { max: Quantity::MAX });
        };

        tracing::debug!(%user_id, %product_id, quantity = new_quantity, "Cart line upserted");
        stored_quantity(new_quantity)
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a line. Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Empty a user's cart. Returns the number of removed lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn stored_quantity(value: i32) -> Result<Quantity, RepositoryError> {
    u32::try_from(value)
        .ok()
        .and_then(|q| Quantity::new(q).ok())
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid cart quantity {value}")))
}
