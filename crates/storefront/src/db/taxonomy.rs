//! Taxonomy repository for categories, tags and brands.
//!
//! The three tables share a schema (`id SERIAL`, `name VARCHAR(100)`), so a
//! single repository serves all of them. The table name comes from
//! [`Taxonomy::table`], never from user input.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{Brand, Category, Tag, Taxonomy, Term};

#[derive(Debug, sqlx::FromRow)]
struct TermRow {
    id: i32,
    name: String,
}

impl<Id: From<i32>> From<TermRow> for Term<Id> {
    fn from(row: TermRow) -> Self {
        Self {
            id: Id::from(row.id),
            name: row.name,
        }
    }
}

/// Repository for one taxonomy table.
pub struct TaxonomyRepository<'a> {
    pool: &'a PgPool,
    taxonomy: Taxonomy,
}

impl<'a> TaxonomyRepository<'a> {
    /// Create a repository over the table for `taxonomy`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, taxonomy: Taxonomy) -> Self {
        Self { pool, taxonomy }
    }

    /// List all entries ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list<Id: From<i32>>(&self) -> Result<Vec<Term<Id>>, RepositoryError> {
        let sql = format!("SELECT id, name FROM {} ORDER BY name, id", self.taxonomy.table());
        let rows = sqlx::query_as::<_, TermRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Term::from).collect())
    }

    /// Get one entry by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get<Id: From<i32>>(
        &self,
        id: impl Into<i32>,
    ) -> Result<Option<Term<Id>>, RepositoryError> {
        let sql = format!("SELECT id, name FROM {} WHERE id = $1", self.taxonomy.table());
        let row = sqlx::query_as::<_, TermRow>(&sql)
            .bind(id.into())
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Term::from))
    }

    /// Insert a new entry and return its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is already taken.
    pub async fn create(&self, name: &str) -> Result<i32, RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (name) VALUES ($1) RETURNING id",
            self.taxonomy.table()
        );
        let id: i32 = sqlx::query_scalar(&sql)
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| self.conflict(e))?;

        tracing::info!(taxonomy = self.taxonomy.table(), id, "Taxonomy entry created");
        Ok(id)
    }

    /// Rename an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry does not exist.
    /// Returns `RepositoryError::Conflict` if the name is already taken.
    pub async fn rename(&self, id: impl Into<i32>, name: &str) -> Result<(), RepositoryError> {
        let sql = format!("UPDATE {} SET name = $2 WHERE id = $1", self.taxonomy.table());
        let result = sqlx::query(&sql)
            .bind(id.into())
            .bind(name)
            .execute(self.pool)
            .await
            .map_err(|e| self.conflict(e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an entry.
    ///
    /// Deleting a brand clears it from its products and deleting a tag
    /// removes its product links. A category still used by a product
    /// cannot be deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry does not exist.
    /// Returns `RepositoryError::Conflict` if products still reference it.
    pub async fn delete(&self, id: impl Into<i32>) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.taxonomy.table());
        let result = sqlx::query(&sql)
            .bind(id.into())
            .execute(self.pool)
            .await
            .map_err(|e| self.conflict(e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::info!(taxonomy = self.taxonomy.table(), "Taxonomy entry deleted");
        Ok(())
    }

    fn conflict(&self, e: sqlx::Error) -> RepositoryError {
        RepositoryError::from_constraint(
            e,
            &format!("a {} with this name already exists", self.taxonomy.singular().to_lowercase()),
            &format!(
                "this {} is still used by products",
                self.taxonomy.singular().to_lowercase()
            ),
        )
    }
}

/// Load the three taxonomies used to build product forms.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn load_choices(
    pool: &PgPool,
) -> Result<(Vec<Category>, Vec<Brand>, Vec<Tag>), RepositoryError> {
    let categories = TaxonomyRepository::new(pool, Taxonomy::Category).list().await?;
    let brands = TaxonomyRepository::new(pool, Taxonomy::Brand).list().await?;
    let tags = TaxonomyRepository::new(pool, Taxonomy::Tag).list().await?;
    Ok((categories, brands, tags))
}
