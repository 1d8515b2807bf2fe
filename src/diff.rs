//! Set-membership diff between two store generations.
//!
//! Drives site-data clearing: a site whose owner changed (or which left
//! every set) must have its stored data cleared. Joining a set never
//! requires clearing.

use std::collections::BTreeSet;

use crate::types::{FlattenedSets, Site};

/// Sites whose set membership changed between `old` and `current`.
///
/// Only keys of `old` are examined. A site is included when its owner in
/// `current` differs from its owner in `old`, or when it is gone from
/// `current` entirely.
///
/// When an owner leaves, every site that pointed at it is flagged even if
/// those sites stay grouped under a new owner. The result can contain
/// false positives but never false negatives.
pub fn compute_sets_diff(old: &FlattenedSets, current: &FlattenedSets) -> BTreeSet<Site> {
    if old.is_empty() {
        return BTreeSet::new();
    }

    old.iter()
        .filter(|(site, old_owner)| current.owner_of(site) != Some(*old_owner))
        .map(|(site, _)| site.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SingleSet;

    fn site(s: &str) -> Site {
        Site::parse(s).unwrap()
    }

    fn sets(entries: &[(&str, &[&str])]) -> FlattenedSets {
        let sets: Vec<SingleSet> = entries
            .iter()
            .map(|(owner, members)| {
                SingleSet::new(site(owner), members.iter().map(|m| site(m)).collect())
            })
            .collect();
        FlattenedSets::from_sets(&sets)
    }

    fn sites(list: &[&str]) -> BTreeSet<Site> {
        list.iter().map(|s| site(s)).collect()
    }

    #[test]
    fn test_sites_joined() {
        let old = sets(&[("https://example.test", &["https://member1.test", "https://member3.test"])]);
        let current = sets(&[
            ("https://example.test", &["https://member1.test", "https://member3.test"]),
            ("https://foo.test", &["https://member2.test"]),
        ]);

        assert!(compute_sets_diff(&old, &current).is_empty());
    }

    #[test]
    fn test_sites_left() {
        let old = sets(&[
            ("https://example.test", &["https://member1.test", "https://member3.test"]),
            ("https://foo.test", &["https://member2.test"]),
        ]);
        let current = sets(&[("https://example.test", &["https://member1.test"])]);

        assert_eq!(
            compute_sets_diff(&old, &current),
            sites(&["https://foo.test", "https://member2.test", "https://member3.test"])
        );
    }

    #[test]
    fn test_owner_changed() {
        let old = sets(&[
            ("https://example.test", &["https://member1.test"]),
            ("https://foo.test", &["https://member2.test", "https://member3.test"]),
        ]);
        let current = sets(&[
            ("https://example.test", &["https://member1.test", "https://member3.test"]),
            ("https://foo.test", &["https://member2.test"]),
        ]);

        assert_eq!(compute_sets_diff(&old, &current), sites(&["https://member3.test"]));
    }

    #[test]
    fn test_owner_left_flags_whole_former_set() {
        let old = sets(&[("https://example.test", &["https://foo.test", "https://bar.test"])]);
        let current = sets(&[("https://foo.test", &["https://bar.test"])]);

        // foo.test and bar.test stay together, but are still flagged.
        assert_eq!(
            compute_sets_diff(&old, &current),
            sites(&["https://example.test", "https://foo.test", "https://bar.test"])
        );
    }

    #[test]
    fn test_owner_member_rotate() {
        let old = sets(&[("https://example.test", &["https://foo.test"])]);
        let current = sets(&[("https://foo.test", &["https://example.test"])]);

        assert_eq!(
            compute_sets_diff(&old, &current),
            sites(&["https://example.test", "https://foo.test"])
        );
    }

    #[test]
    fn test_empty_old_sets() {
        let current = sets(&[("https://example.test", &["https://member1.test"])]);
        assert!(compute_sets_diff(&FlattenedSets::new(), &current).is_empty());
    }

    #[test]
    fn test_empty_current_sets() {
        let old = sets(&[("https://example.test", &["https://member1.test"])]);
        assert_eq!(
            compute_sets_diff(&old, &FlattenedSets::new()),
            sites(&["https://example.test", "https://member1.test"])
        );
    }
}
