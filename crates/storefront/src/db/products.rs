//! Product repository.
//!
//! Products are always returned with their category, brand and tags
//! loaded. Creating and updating a product writes the product row and
//! its `products_tags` rows in one transaction.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use shopkeep_core::{BrandId, CategoryId, Cost, ProductId, TagId};

use super::{ProductFilter, RepositoryError};
use crate::models::{Brand, Category, Product, ProductDetail, ProductInput, Tag, TagDelta};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.cost, p.description, p.image_url,
           p.category_id, p.brand_id, p.created_at, p.updated_at,
           c.name AS category_name, b.name AS brand_name
    FROM products p
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN brands b ON b.id = p.brand_id
    WHERE TRUE";

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    cost: i64,
    description: String,
    image_url: Option<String>,
    category_id: CategoryId,
    brand_id: Option<BrandId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: String,
    brand_name: Option<String>,
}

impl TryFrom<ProductRow> for ProductDetail {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let cost = Cost::new(row.cost).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid cost for product {}: {e}", row.id))
        })?;

        let brand = match (row.brand_id, row.brand_name) {
            (Some(id), Some(name)) => Some(Brand { id, name }),
            _ => None,
        };

        Ok(Self {
            category: Category {
                id: row.category_id,
                name: row.category_name,
            },
            brand,
            tags: Vec::new(),
            product: Product {
                id: row.id,
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

#[derive(Debug, sqlx::FromRow)]
struct ProductTagRow {
    product_id: ProductId,
    tag_id: TagId,
    tag_name: String,
}

/// A brand and how many products carry it.
#[derive(Debug, Clone)]
pub struct BrandListing {
    pub brand: Brand,
    pub product_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct BrandListingRow {
    id: BrandId,
    name: String,
    product_count: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<ProductDetail>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        filter.push_predicates(&mut qb);
        qb.push(" ORDER BY p.name, p.id");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        let mut products = rows
            .into_iter()
            .map(ProductDetail::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.load_tags(&mut products).await?;

        Ok(products)
    }

    /// Get a product with its relations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" AND p.id = ").push_bind(id);

        let Some(row) = qb
            .build_query_as::<ProductRow>()
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut products = vec![ProductDetail::try_from(row)?];
        self.load_tags(&mut products).await?;
        Ok(products.pop())
    }

    /// Get a product or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    pub async fn require(&self, id: ProductId) -> Result<ProductDetail, RepositoryError> {
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Insert a product and attach its tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category, brand or a tag
    /// does not exist.
    pub async fn create(&self, input: &ProductInput) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO products (name, cost, description, image_url, category_id, brand_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&input.name)
        .bind(input.cost.cents())
        .bind(&input.description)
        .bind(input.image_url.as_deref())
        .bind(input.category_id)
        .bind(input.brand_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(reference_error)?;

        let delta = TagDelta::compute(&BTreeSet::new(), &input.tag_ids);
        apply_tag_delta(&mut tx, id, &delta).await?;

        tx.commit().await?;

        tracing::info!(product_id = %id, tags = input.tag_ids.len(), "Product created");
        Ok(id)
    }

    /// Update a product's columns and replace its tag set.
    ///
    /// Either the whole update commits or nothing changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if a referenced row does not exist.
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<ProductId> = sqlx::query_scalar(
            r"
            UPDATE products
            SET name = $2, cost = $3, description = $4, image_url = $5,
                category_id = $6, brand_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.cost.cents())
        .bind(&input.description)
        .bind(input.image_url.as_deref())
        .bind(input.category_id)
        .bind(input.brand_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(reference_error)?;

        if updated.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let current: Vec<TagId> =
            sqlx::query_scalar("SELECT tag_id FROM products_tags WHERE product_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        let current: BTreeSet<TagId> = current.into_iter().collect();

        let delta = TagDelta::compute(&current, &input.tag_ids);
        apply_tag_delta(&mut tx, id, &delta).await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %id,
            detached = delta.to_detach.len(),
            attached = delta.to_attach.len(),
            "Product updated"
        );
        Ok(())
    }

    /// Delete a product. Its tag links and cart lines cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Brands ordered by name with their product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn brand_listing(&self) -> Result<Vec<BrandListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, BrandListingRow>(
            r"
            SELECT b.id, b.name, COUNT(p.id) AS product_count
            FROM brands b
            LEFT JOIN products p ON p.brand_id = b.id
            GROUP BY b.id, b.name
            ORDER BY b.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BrandListing {
                brand: Brand {
                    id: r.id,
                    name: r.name,
                },
                product_count: r.product_count,
            })
            .collect())
    }

    /// Fill in `tags` for each product with one query.
    async fn load_tags(&self, products: &mut [ProductDetail]) -> Result<(), RepositoryError> {
        if products.is_empty() {
            return Ok(());
        }

        let ids: Vec<ProductId> = products.iter().map(|p| p.product.id).collect();
        let rows = sqlx::query_as::<_, ProductTagRow>(
            r"
            SELECT pt.product_id, t.id AS tag_id, t.name AS tag_name
            FROM products_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.product_id = ANY($1)
            ORDER BY t.name
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_product: HashMap<ProductId, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_product.entry(row.product_id).or_default().push(Tag {
                id: row.tag_id,
                name: row.tag_name,
            });
        }

        for product in products {
            product.tags = by_product.remove(&product.product.id).unwrap_or_default();
        }

        Ok(())
    }
}

/// Detach then attach tags inside an open transaction.
async fn apply_tag_delta(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: ProductId,
    delta: &TagDelta,
) -> Result<(), RepositoryError> {
    if !delta.to_detach.is_empty() {
        sqlx::query("DELETE FROM products_tags WHERE product_id = $1 AND tag_id = ANY($2)")
            .bind(product_id)
            .bind(delta.detach_ids())
            .execute(&mut **tx)
            .await?;
    }

    if !delta.to_attach.is_empty() {
        sqlx::query(
            r"
            INSERT INTO products_tags (product_id, tag_id)
            SELECT $1, UNNEST($2::INTEGER[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(product_id)
        .bind(delta.attach_ids())
        .execute(&mut **tx)
        .await
        .map_err(reference_error)?;
    }

    Ok(())
}

fn reference_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::from_constraint(
        e,
        "product already exists",
        "referenced category, brand or tag does not exist",
    )
}
