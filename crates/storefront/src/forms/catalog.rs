//! Product, product search and taxonomy forms.

use shopkeep_core::{Cost, join_id_list};

use super::{CleanedData, FieldKind, FieldSpec, FormData, FormSchema, MissingField, Validator};
use crate::db::ProductFilter;
use crate::models::{Brand, Category, ProductDetail, ProductInput, Tag, TaxonomyInput};

/// Product create/update form.
#[must_use]
pub fn product_schema(categories: &[Category], brands: &[Brand], tags: &[Tag]) -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("name", "Name", FieldKind::Text).validate_with(Validator::MaxLength(255)),
        FieldSpec::new("cost", "Cost (cents)", FieldKind::Integer)
            .validate_with(Validator::Min(0))
            .validate_with(Validator::Max(Cost::MAX)),
        FieldSpec::new("description", "Description", FieldKind::TextArea),
        FieldSpec::new("category_id", "Category", FieldKind::Select)
            .choices(categories.iter().map(Into::into)),
        FieldSpec::new("brand_id", "Brand", FieldKind::Select)
            .optional()
            .choices(brands.iter().map(Into::into)),
        FieldSpec::new("tags", "Tags", FieldKind::MultiSelect)
            .optional()
            .choices(tags.iter().map(Into::into)),
        FieldSpec::new("image_url", "Image", FieldKind::Hidden).optional(),
    ])
}

impl ProductInput {
    /// Build from a validated [`product_schema`] submission.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` if the data did not come from the product form.
    pub fn from_cleaned(data: &CleanedData) -> Result<Self, MissingField> {
        let cost = Cost::new(data.integer("cost")?).map_err(|_| MissingField("cost"))?;
        Ok(Self {
            name: data.text("name")?.to_owned(),
            cost,
            description: data.text("description")?.to_owned(),
            image_url: data.opt_text("image_url").map(str::to_owned),
            category_id: data.id("category_id")?,
            brand_id: data.opt_id("brand_id"),
            tag_ids: data.ids("tags"),
        })
    }
}

/// Current values of a product, for prefilling the update form.
#[must_use]
pub fn product_initial(detail: &ProductDetail) -> FormData {
    let product = &detail.product;
    FormData::default()
        .with("name", product.name.clone())
        .with("cost", product.cost.cents().to_string())
        .with("description", product.description.clone())
        .with("category_id", product.category_id.to_string())
        .with(
            "brand_id",
            product.brand_id.map(|id| id.to_string()).unwrap_or_default(),
        )
        .with("tags", join_id_list(detail.tag_ids()))
        .with("image_url", product.image_url.clone().unwrap_or_default())
}

/// Product search form. Every field is optional.
#[must_use]
pub fn search_schema(categories: &[Category], tags: &[Tag]) -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("name", "Name", FieldKind::Text).optional(),
        FieldSpec::new("min_cost", "Min cost", FieldKind::Integer)
            .optional()
            .validate_with(Validator::Min(0))
            .validate_with(Validator::Max(Cost::MAX)),
        FieldSpec::new("max_cost", "Max cost", FieldKind::Integer)
            .optional()
            .validate_with(Validator::Min(0))
            .validate_with(Validator::Max(Cost::MAX)),
        FieldSpec::new("category_id", "Category", FieldKind::Select)
            .optional()
            .choices(categories.iter().map(Into::into)),
        FieldSpec::new("tags", "Tags", FieldKind::MultiSelect)
            .optional()
            .choices(tags.iter().map(Into::into)),
    ])
}

impl ProductFilter {
    /// Build from a validated [`search_schema`] submission.
    #[must_use]
    pub fn from_cleaned(data: &CleanedData) -> Self {
        Self {
            name: data.opt_text("name").map(str::to_owned),
            min_cost: data.opt_integer("min_cost").and_then(|c| Cost::new(c).ok()),
            max_cost: data.opt_integer("max_cost").and_then(|c| Cost::new(c).ok()),
            category_id: data.opt_id("category_id"),
            tag_ids: data.ids("tags"),
        }
    }
}

/// Create/rename form shared by categories, tags and brands.
#[must_use]
pub fn taxonomy_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("name", "Name", FieldKind::Text).validate_with(Validator::MaxLength(100)),
    ])
}

impl TaxonomyInput {
    /// # Errors
    ///
    /// Returns `MissingField` if the data did not come from the taxonomy form.
    pub fn from_cleaned(data: &CleanedData) -> Result<Self, MissingField> {
        Ok(Self {
            name: data.text("name")?.to_owned(),
        })
    }
}
