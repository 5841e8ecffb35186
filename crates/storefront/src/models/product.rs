//! Product domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use shopkeep_core::{BrandId, CategoryId, Cost, Price, ProductId, TagId};

use super::{Brand, Category, Tag};

/// A catalog product as stored in the `products` table.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub cost: Cost,
    pub description: String,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn price(&self) -> Price {
        self.cost.price()
    }
}

/// A product with its category, brand and tags loaded.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub brand: Option<Brand>,
    pub tags: Vec<Tag>,
}

impl ProductDetail {
    /// Ids of the attached tags.
    #[must_use]
    pub fn tag_ids(&self) -> BTreeSet<TagId> {
        self.tags.iter().map(|t| t.id).collect()
    }

    #[must_use]
    pub fn brand_name(&self) -> &str {
        self.brand.as_ref().map_or("", |b| b.name.as_str())
    }
}

/// Validated input for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub cost: Cost,
    pub description: String,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
    /// The complete desired tag set after the write.
    pub tag_ids: BTreeSet<TagId>,
}
