//! Enterprise policy customization of an existing store.
//!
//! ## Ordering
//!
//! Replacements are applied first, in list order. Each addition is then
//! evaluated against the store as the replacements and earlier additions
//! left it. Later emissions for the same site overwrite earlier ones.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{FlattenedSets, ParsedPolicySetLists, PolicyCustomization, SingleSet, Site};

/// Compute the overlay that layers `policy` on top of `existing`.
///
/// Expects validated, disjoint policy lists.
pub fn compute_enterprise_customizations(
    existing: &FlattenedSets,
    policy: &ParsedPolicySetLists,
) -> PolicyCustomization {
    let mut customizations = PolicyCustomization::new();
    if policy.is_empty() {
        return customizations;
    }

    apply_replacements(existing, &policy.replacements, &mut customizations);
    apply_additions(existing, &policy.additions, &mut customizations);

    customizations
}

fn emit_set(customizations: &mut PolicyCustomization, set: &SingleSet) {
    customizations.insert(set.owner.clone(), Some(set.owner.clone()));
    for member in &set.members {
        customizations.insert(member.clone(), Some(set.owner.clone()));
    }
}

fn apply_replacements(
    existing: &FlattenedSets,
    replacements: &[SingleSet],
    customizations: &mut PolicyCustomization,
) {
    let existing_owners = existing.owners_to_members();
    let replaced_sites: BTreeSet<&Site> = replacements.iter().flat_map(SingleSet::sites).collect();

    // Existing owner -> original members not yet detached by a replacement.
    let mut remaining: BTreeMap<Site, BTreeSet<Site>> = BTreeMap::new();

    for set in replacements {
        emit_set(customizations, set);

        for site in set.sites() {
            let Some(former_owner) = existing.owner_of(site) else {
                continue;
            };

            if former_owner == site {
                // An existing owner's identity is repurposed: its former
                // members that no replacement claims are orphaned.
                let former_members = existing_owners.get(site).into_iter().flatten();
                for member in former_members {
                    if !replaced_sites.contains(member) {
                        customizations.insert(member.clone(), None);
                    }
                }
                continue;
            }

            if *former_owner != set.owner {
                remaining
                    .entry(former_owner.clone())
                    .or_insert_with(|| {
                        existing_owners.get(former_owner).cloned().unwrap_or_default()
                    })
                    .remove(site);
            }
        }
    }

    for (owner, members) in &remaining {
        if members.is_empty() && !replaced_sites.contains(owner) {
            tracing::debug!(
                target: "first_party_sets::policy",
                owner = %owner,
                "deleting singleton left behind by replacement"
            );
            customizations.insert(owner.clone(), None);
        }
    }
}

fn apply_additions(
    existing: &FlattenedSets,
    additions: &[SingleSet],
    customizations: &mut PolicyCustomization,
) {
    for set in additions {
        let current = existing.apply_customizations(customizations);
        let owners = current.owners_to_members();

        if let Some(existing_owner) = current.owner_of(&set.owner) {
            if *existing_owner != set.owner {
                // The policy owner is a member of an existing set: absorb
                // that whole set, its former owner included.
                customizations.insert(existing_owner.clone(), Some(set.owner.clone()));
            }
            absorb_members(customizations, owners.get(existing_owner), &set.owner);
        }

        // A policy member that owns an existing set brings its members along.
        for member in &set.members {
            if current.owner_of(member) == Some(member) {
                absorb_members(customizations, owners.get(member), &set.owner);
            }
        }

        emit_set(customizations, set);
    }
}

fn absorb_members(
    customizations: &mut PolicyCustomization,
    members: Option<&BTreeSet<Site>>,
    new_owner: &Site,
) {
    for member in members.into_iter().flatten() {
        if member != new_owner {
            customizations.insert(member.clone(), Some(new_owner.clone()));
        }
    }
}
