//! Tag set reconciliation for product updates.
//!
//! Updating a product replaces its tag set with the submitted one. The
//! change is expressed as a [`TagDelta`]: ids to detach from the
//! `products_tags` join table and ids to attach. Attaching an id that is
//! already present is a no-op at the database level (`ON CONFLICT DO
//! NOTHING`), so `to_attach` is simply the whole desired set.

use std::collections::BTreeSet;

use shopkeep_core::TagId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagDelta {
    pub to_detach: BTreeSet<TagId>,
    pub to_attach: BTreeSet<TagId>,
}

impl TagDelta {
    /// Delta that turns `current` into `desired`.
    #[must_use]
    pub fn compute(current: &BTreeSet<TagId>, desired: &BTreeSet<TagId>) -> Self {
        Self {
            to_detach: current.difference(desired).copied().collect(),
            to_attach: desired.clone(),
        }
    }

    pub(crate) fn detach_ids(&self) -> Vec<TagId> {
        self.to_detach.iter().copied().collect()
    }

    pub(crate) fn attach_ids(&self) -> Vec<TagId> {
        self.to_attach.iter().copied().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopkeep_core::parse_id_list;

    use super::*;

    fn ids(s: &str) -> BTreeSet<TagId> {
        parse_id_list(s).unwrap()
    }

    /// What the join table holds after the delete and insert statements run.
    fn apply(delta: &TagDelta, tags: &mut BTreeSet<TagId>) {
        tags.retain(|id| !delta.detach_ids().contains(id));
        tags.extend(delta.attach_ids());
    }

    #[test]
    fn test_replace_tag_set() {
        let current = ids("1,2,3");
        let desired = ids("2, 4");

        let delta = TagDelta::compute(&current, &desired);
        assert_eq!(delta.to_detach, ids("1,3"));
        assert_eq!(delta.to_attach, ids("2,4"));

        let mut tags = current;
        apply(&delta, &mut tags);
        assert_eq!(tags, desired);
    }

    #[test]
    fn test_clear_all_tags() {
        let current = ids("5,6");
        let delta = TagDelta::compute(&current, &BTreeSet::new());
        assert_eq!(delta.to_detach, current);
        assert!(delta.to_attach.is_empty());

        let mut tags = current;
        apply(&delta, &mut tags);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_attach_to_untagged_product() {
        let delta = TagDelta::compute(&BTreeSet::new(), &ids("7"));
        assert!(delta.to_detach.is_empty());
        assert_eq!(delta.attach_ids(), vec![TagId::new(7)]);
    }

    #[test]
    fn test_unchanged_set_detaches_nothing() {
        let current = ids("1,2");
        let delta = TagDelta::compute(&current, &current);
        assert!(delta.to_detach.is_empty());
        assert!(delta.detach_ids().is_empty());
        assert_eq!(delta.attach_ids(), vec![TagId::new(1), TagId::new(2)]);

        let none = TagDelta::compute(&BTreeSet::new(), &BTreeSet::new());
        assert_eq!(none, TagDelta::default());
    }
}
