//! Seed the catalog from a YAML fixture.
//!
//! ```yaml
//! categories: [Tea, Teaware]
//! brands: [Kyoto Leaf]
//! tags: [green, organic]
//! products:
//!   - name: Sencha
//!     cost: 1200
//!     description: Steamed green tea.
//!     category: Tea
//!     brand: Kyoto Leaf
//!     tags: [green, organic]
//! ```
//!
//! Taxonomy entries are matched by name, so seeding twice does not
//! duplicate them. Products whose name already exists are skipped.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info};

use shopkeep_core::Cost;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFixture {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub products: Vec<ProductFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductFixture {
    pub name: String,
    pub cost: i64,
    pub description: String,
    pub category: String,
    pub brand: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default)]
pub struct SeedResult {
    pub terms: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Check a fixture before touching the database.
///
/// Returns one message per problem; empty means valid.
#[must_use]
pub fn validate(fixture: &CatalogFixture) -> Vec<String> {
    let mut errors = Vec::new();

    for (kind, names) in [
        ("category", &fixture.categories),
        ("brand", &fixture.brands),
        ("tag", &fixture.tags),
    ] {
        let mut seen = BTreeSet::new();
        for name in names {
            if name.trim().is_empty() || name.chars().count() > 100 {
                errors.push(format!("{kind} name must be 1-100 characters: {name:?}"));
            }
            if !seen.insert(name.as_str()) {
                errors.push(format!("duplicate {kind}: {name}"));
            }
        }
    }

    for product in &fixture.products {
        let name = &product.name;
        if name.trim().is_empty() {
            errors.push("product name must not be blank".to_string());
        }
        if product.description.trim().is_empty() {
            errors.push(format!("{name}: description must not be blank"));
        }
        if let Err(e) = Cost::new(product.cost) {
            errors.push(format!("{name}: {e}"));
        }
        if !fixture.categories.contains(&product.category) {
            errors.push(format!("{name}: unknown category {}", product.category));
        }
        if let Some(brand) = &product.brand
            && !fixture.brands.contains(brand)
        {
            errors.push(format!("{name}: unknown brand {brand}"));
        }
        for tag in &product.tags {
            if !fixture.tags.contains(tag) {
                errors.push(format!("{name}: unknown tag {tag}"));
            }
        }
    }

    errors
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be
/// read or fails validation, or a database operation fails.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog fixture");

    let content = tokio::fs::read_to_string(path).await?;
    let fixture: CatalogFixture = serde_yaml::from_str(&content)?;

    info!(
        categories = fixture.categories.len(),
        brands = fixture.brands.len(),
        tags = fixture.tags.len(),
        products = fixture.products.len(),
        "Parsed fixture"
    );

    let errors = validate(&fixture);
    if !errors.is_empty() {
        error!("Fixture validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    if dry_run {
        info!("Fixture is valid, nothing written (dry run)");
        return Ok(());
    }

    let database_url = super::database_url()?;
    let pool = shopkeep_storefront::db::create_pool(&database_url).await?;
    info!("Connected to database");

    let result = seed(&pool, &fixture).await?;

    info!("Seeding complete!");
    info!("  Taxonomy entries: {}", result.terms);
    info!("  Products inserted: {}", result.inserted);
    info!("  Products skipped (already exist): {}", result.skipped);

    Ok(())
}

/// Write a validated fixture in one transaction.
async fn seed(pool: &PgPool, fixture: &CatalogFixture) -> Result<SeedResult, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut result = SeedResult::default();

    let categories = upsert_names(&mut tx, "categories", &fixture.categories).await?;
    let brands = upsert_names(&mut tx, "brands", &fixture.brands).await?;
    let tags = upsert_names(&mut tx, "tags", &fixture.tags).await?;
    result.terms = categories.len() + brands.len() + tags.len();

    for product in &fixture.products {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE name = $1)")
                .bind(&product.name)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            result.skipped += 1;
            continue;
        }

        let product_id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO products (name, cost, description, image_url, category_id, brand_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(product.cost)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(categories.get(&product.category).copied())
        .bind(product.brand.as_ref().and_then(|b| brands.get(b).copied()))
        .fetch_one(&mut *tx)
        .await?;

        let tag_ids: Vec<i32> = product
            .tags
            .iter()
            .filter_map(|t| tags.get(t).copied())
            .collect();
        sqlx::query(
            r"
            INSERT INTO products_tags (product_id, tag_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(product_id)
        .bind(&tag_ids)
        .execute(&mut *tx)
        .await?;

        result.inserted += 1;
    }

    tx.commit().await?;
    Ok(result)
}

/// Insert names that are missing and return the id of every name.
///
/// `table` is one of three literals.
async fn upsert_names(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    names: &[String],
) -> Result<HashMap<String, i32>, sqlx::Error> {
    let sql = format!(
        "INSERT INTO {table} (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id"
    );

    let mut ids = HashMap::with_capacity(names.len());
    for name in names {
        let id: i32 = sqlx::query_scalar(&sql)
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;
        ids.insert(name.clone(), id);
    }
    Ok(ids)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FIXTURE: &str = r"
categories: [Tea, Teaware]
brands: [Kyoto Leaf]
tags: [green, organic]
products:
  - name: Sencha
    cost: 1200
    description: Steamed green tea.
    category: Tea
    brand: Kyoto Leaf
    tags: [green, organic]
  - name: Kyusu
    cost: 4500
    description: Side-handled teapot.
    category: Teaware
";

    #[test]
    fn test_valid_fixture() {
        let fixture: CatalogFixture = serde_yaml::from_str(FIXTURE).unwrap();
        assert_eq!(fixture.products.len(), 2);
        assert!(fixture.products[1].brand.is_none());
        assert!(validate(&fixture).is_empty());
    }

    #[test]
    fn test_unknown_references_are_reported() {
        let yaml = r"
categories: [Tea]
products:
  - name: Gyokuro
    cost: 3000
    description: Shaded green tea.
    category: Coffee
    brand: Nobody
    tags: [rare]
";
        let fixture: CatalogFixture = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&fixture);

        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("unknown category Coffee"));
        assert!(errors[1].contains("unknown brand Nobody"));
        assert!(errors[2].contains("unknown tag rare"));
    }

    #[test]
    fn test_negative_cost_and_duplicates() {
        let yaml = r"
categories: [Tea, Tea]
products:
  - name: Bancha
    cost: -5
    description: Late harvest.
    category: Tea
";
        let fixture: CatalogFixture = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&fixture);

        assert!(errors.iter().any(|e| e == "duplicate category: Tea"));
        assert!(errors.iter().any(|e| e.starts_with("Bancha:")));
    }

    #[test]
    fn test_cost_above_cap_is_reported() {
        let yaml = r"
categories: [Teaware]
products:
  - name: Gold kettle
    cost: 100000000001
    description: Too dear.
    category: Teaware
";
        let fixture: CatalogFixture = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            validate(&fixture),
            vec!["Gold kettle: cost must be at most 100000000000 cents".to_string()]
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let yaml = "categories: [Tea]\nvendors: [Acme]\n";
        assert!(serde_yaml::from_str::<CatalogFixture>(yaml).is_err());
    }
}
