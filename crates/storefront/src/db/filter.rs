//! Product search query composition.
//!
//! A [`ProductFilter`] holds the optional criteria from the search form.
//! [`ProductFilter::push_predicates`] appends one ` AND <predicate>` per
//! supplied criterion to a query whose base ends in `WHERE TRUE`, so the
//! result is a plain conjunction and an empty filter selects everything.
//! The products table must be aliased `p`.

use std::collections::BTreeSet;

use sqlx::{Postgres, QueryBuilder};

use shopkeep_core::{CategoryId, Cost, TagId};

/// Optional product search criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    /// Inclusive lower cost bound.
    pub min_cost: Option<Cost>,
    /// Inclusive upper cost bound.
    pub max_cost: Option<Cost>,
    pub category_id: Option<CategoryId>,
    /// Matches products carrying any of these tags. Empty means no tag filter.
    pub tag_ids: BTreeSet<TagId>,
}

impl ProductFilter {
    /// True when no criterion is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.min_cost.is_none()
            && self.max_cost.is_none()
            && self.category_id.is_none()
            && self.tag_ids.is_empty()
    }

    /// Append the predicates for every supplied criterion.
    pub fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(name) = &self.name {
            qb.push(" AND p.name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(min) = self.min_cost {
            qb.push(" AND p.cost >= ").push_bind(min.cents());
        }
        if let Some(max) = self.max_cost {
            qb.push(" AND p.cost <= ").push_bind(max.cents());
        }
        if let Some(category_id) = self.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id);
        }
        if !self.tag_ids.is_empty() {
            let ids: Vec<TagId> = self.tag_ids.iter().copied().collect();
            qb.push(
                " AND EXISTS (SELECT 1 FROM products_tags pt \
                 WHERE pt.product_id = p.id AND pt.tag_id = ANY(",
            )
            .push_bind(ids)
            .push("))");
        }
    }
}

/// Wrap a search term in `%...%`, escaping `LIKE` metacharacters.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
