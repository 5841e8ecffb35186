//! Catalog taxonomies: categories, tags and brands.
//!
//! All three share the same shape (an id and a name) and the same CRUD
//! pages, so they are described by one [`Taxonomy`] enum and stored as
//! [`Term`]s with a typed id.

use serde::Serialize;

use shopkeep_core::{BrandId, CategoryId, TagId};

/// A named taxonomy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term<Id> {
    pub id: Id,
    pub name: String,
}

pub type Category = Term<CategoryId>;
pub type Tag = Term<TagId>;
pub type Brand = Term<BrandId>;

/// Which taxonomy a page or query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Category,
    Tag,
    Brand,
}

impl Taxonomy {
    pub const ALL: [Self; 3] = [Self::Category, Self::Tag, Self::Brand];

    /// Table holding the entries. Only ever one of three literals.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Tag => "tags",
            Self::Brand => "brands",
        }
    }

    /// URL prefix of the management pages.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Category => "/categories",
            Self::Tag => "/tags",
            Self::Brand => "/brands",
        }
    }

    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Tag => "Tag",
            Self::Brand => "Brand",
        }
    }

    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Category => "Categories",
            Self::Tag => "Tags",
            Self::Brand => "Brands",
        }
    }
}

/// Validated create/rename input for any taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyInput {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_tables_and_paths_line_up() {
        for taxonomy in Taxonomy::ALL {
            assert_eq!(taxonomy.path().trim_start_matches('/'), taxonomy.table());
            assert!(taxonomy.plural().starts_with(&taxonomy.singular()[..3]));
        }
    }
}
