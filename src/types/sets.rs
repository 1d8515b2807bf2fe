//! Flattened first-party sets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::policy::PolicyCustomization;
use super::site::Site;
use crate::canonical::canonical_hash_hex;

/// One first-party set: an owner and its members.
///
/// The owner is never listed among its own members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSet {
    /// The set's owner site.
    pub owner: Site,
    /// Member sites, in source order.
    pub members: Vec<Site>,
}

impl SingleSet {
    /// Create a set from an owner and its members.
    pub fn new(owner: Site, members: Vec<Site>) -> Self {
        Self { owner, members }
    }

    /// Iterate over every site in the set, owner first.
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        std::iter::once(&self.owner).chain(self.members.iter())
    }
}

/// Member -> owner mapping for every known set.
///
/// Owners map to themselves. There are no chains: every value is a key that
/// maps to itself. Once handed to readers (behind an `Arc`) a store is never
/// mutated; a new store replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlattenedSets(BTreeMap<Site, Site>);

impl FlattenedSets {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a sequence of sets.
    ///
    /// Later sets overwrite earlier entries for the same site; callers that
    /// need disjointness check it before flattening.
    pub fn from_sets<'a>(sets: impl IntoIterator<Item = &'a SingleSet>) -> Self {
        let mut map = BTreeMap::new();
        for set in sets {
            map.insert(set.owner.clone(), set.owner.clone());
            for member in &set.members {
                map.insert(member.clone(), set.owner.clone());
            }
        }
        Self(map)
    }

    /// Insert a single `site -> owner` entry.
    pub fn insert(&mut self, site: Site, owner: Site) {
        self.0.insert(site, owner);
    }

    /// Owner of `site`, if it belongs to a set.
    pub fn owner_of(&self, site: &Site) -> Option<&Site> {
        self.0.get(site)
    }

    /// Whether `site` belongs to any set.
    pub fn contains(&self, site: &Site) -> bool {
        self.0.contains_key(site)
    }

    /// Number of sites across all sets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no sets.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(site, owner)` pairs in site order.
    pub fn iter(&self) -> impl Iterator<Item = (&Site, &Site)> {
        self.0.iter()
    }

    /// Every site in the store.
    pub fn sites(&self) -> BTreeSet<Site> {
        self.0.keys().cloned().collect()
    }

    /// Invert the mapping: owner -> members (the owner itself excluded).
    ///
    /// Owners without members appear with an empty set.
    pub fn owners_to_members(&self) -> BTreeMap<Site, BTreeSet<Site>> {
        let mut result: BTreeMap<Site, BTreeSet<Site>> = BTreeMap::new();
        for (site, owner) in &self.0 {
            let members = result.entry(owner.clone()).or_default();
            if site != owner {
                members.insert(site.clone());
            }
        }
        result
    }

    /// Layer a manually specified set over this store.
    ///
    /// The manual set wins: every site it names leaves its previous set,
    /// members of any owner it names are dropped, owners left without
    /// members are deleted, and the manual set is inserted.
    pub fn apply_manual_set(&self, manual: &SingleSet) -> Self {
        let manual_sites: BTreeSet<&Site> = manual.sites().collect();

        let mut map: BTreeMap<Site, Site> = self
            .0
            .iter()
            .filter(|(site, owner)| !manual_sites.contains(site) && !manual_sites.contains(owner))
            .map(|(site, owner)| (site.clone(), owner.clone()))
            .collect();

        // Singleton cleanup.
        let mut remaining = Self(map.clone()).owners_to_members();
        remaining.retain(|_, members| members.is_empty());
        for singleton in remaining.keys() {
            map.remove(singleton);
        }

        let mut result = Self(map);
        result.insert(manual.owner.clone(), manual.owner.clone());
        for member in &manual.members {
            result.insert(member.clone(), manual.owner.clone());
        }
        result
    }

    /// Apply a policy overlay.
    ///
    /// `Some(owner)` entries replace the site's mapping, `None` entries
    /// remove the site, and sites absent from the overlay are untouched.
    pub fn apply_customizations(&self, customizations: &PolicyCustomization) -> Self {
        let mut map = self.0.clone();
        for (site, owner) in customizations {
            match owner {
                Some(owner) => {
                    map.insert(site.clone(), owner.clone());
                }
                None => {
                    map.remove(site);
                }
            }
        }
        Self(map)
    }

    /// Hex fingerprint of the canonical JSON form.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        canonical_hash_hex(&self.0)
    }
}

impl FromIterator<(Site, Site)> for FlattenedSets {
    fn from_iter<I: IntoIterator<Item = (Site, Site)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FlattenedSets {
    type Item = (&'a Site, &'a Site);
    type IntoIter = std::collections::btree_map::Iter<'a, Site, Site>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<BTreeMap<Site, Site>> for FlattenedSets {
    fn from(map: BTreeMap<Site, Site>) -> Self {
        Self(map)
    }
}
