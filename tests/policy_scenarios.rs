//! Scenario tests for enterprise policy customization.
//!
//! Each scenario validates a policy document, computes the overlay against
//! an existing store, and checks the exact overlay and the combined result.

use std::collections::BTreeMap;

use first_party_sets::{
    compute_enterprise_customizations, parse_enterprise_policy, validate_enterprise_policy,
    FlattenedSets, ParseError, ParsedPolicySetLists, PolicyCustomization, PolicyParsingError,
    PolicySetType, SingleSet, Site,
};
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn site(s: &str) -> Site {
    Site::parse(s).unwrap()
}

fn existing(sets: &[(&str, &[&str])]) -> FlattenedSets {
    let sets: Vec<SingleSet> = sets
        .iter()
        .map(|(owner, members)| SingleSet::new(site(owner), members.iter().map(|m| site(m)).collect()))
        .collect();
    FlattenedSets::from_sets(&sets)
}

fn policy(document: serde_json::Value) -> ParsedPolicySetLists {
    parse_enterprise_policy(&document).unwrap()
}

fn overlay(entries: &[(&str, Option<&str>)]) -> PolicyCustomization {
    entries
        .iter()
        .map(|(s, owner)| (site(s), owner.map(site)))
        .collect::<BTreeMap<_, _>>()
}

// ─────────────────────────────────────────────────────────────────────────────
// Replacements
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn replacement_without_intersection_touches_nothing_existing() {
    let existing = existing(&[("https://owner1.test", &["https://member1.test"])]);
    let policy = policy(json!({
        "replacements": [{"owner": "https://owner2.test", "members": ["https://member2.test"]}]
    }));

    assert_eq!(
        compute_enterprise_customizations(&existing, &policy),
        overlay(&[
            ("https://owner2.test", Some("https://owner2.test")),
            ("https://member2.test", Some("https://owner2.test")),
        ])
    );
}

#[test]
fn replacement_detaching_one_member_keeps_former_owner() {
    let existing = existing(&[(
        "https://owner1.test",
        &["https://member1.test", "https://member2.test"],
    )]);
    let policy = policy(json!({
        "replacements": [{"owner": "https://owner2.test", "members": ["https://member1.test"]}]
    }));

    let customization = compute_enterprise_customizations(&existing, &policy);
    assert_eq!(
        customization,
        overlay(&[
            ("https://owner2.test", Some("https://owner2.test")),
            ("https://member1.test", Some("https://owner2.test")),
        ])
    );

    let combined = existing.apply_customizations(&customization);
    assert_eq!(
        combined.owner_of(&site("https://member2.test")),
        Some(&site("https://owner1.test"))
    );
}

#[test]
fn replacement_singleton_cleanup() {
    let existing = existing(&[("https://owner1.test", &["https://member1.test"])]);
    let policy = policy(json!({
        "replacements": [{"owner": "https://owner3.test", "members": ["https://member1.test"]}]
    }));

    let customization = compute_enterprise_customizations(&existing, &policy);
    assert_eq!(
        customization,
        overlay(&[
            ("https://member1.test", Some("https://owner3.test")),
            ("https://owner3.test", Some("https://owner3.test")),
            ("https://owner1.test", None),
        ])
    );

    let combined = existing.apply_customizations(&customization);
    assert!(!combined.contains(&site("https://owner1.test")));
    assert_eq!(combined.len(), 2);
}

#[test]
fn replacement_reusing_existing_owner_orphans_old_members() {
    let existing = existing(&[(
        "https://owner1.test",
        &["https://member1a.test", "https://member1b.test"],
    )]);
    let policy = policy(json!({
        "replacements": [{"owner": "https://owner1.test", "members": ["https://member2.test"]}]
    }));

    assert_eq!(
        compute_enterprise_customizations(&existing, &policy),
        overlay(&[
            ("https://member2.test", Some("https://owner1.test")),
            ("https://owner1.test", Some("https://owner1.test")),
            ("https://member1a.test", None),
            ("https://member1b.test", None),
        ])
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Additions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn addition_without_intersection_touches_nothing_existing() {
    let existing = existing(&[("https://owner1.test", &["https://member1.test"])]);
    let policy = policy(json!({
        "additions": [{"owner": "https://owner2.test", "members": ["https://member2.test"]}]
    }));

    assert_eq!(
        compute_enterprise_customizations(&existing, &policy),
        overlay(&[
            ("https://owner2.test", Some("https://owner2.test")),
            ("https://member2.test", Some("https://owner2.test")),
        ])
    );
}

#[test]
fn addition_owner_is_existing_member_absorbs_whole_set() {
    let existing = existing(&[(
        "https://owner1.test",
        &["https://member1.test", "https://member2.test"],
    )]);
    let policy = policy(json!({
        "additions": [{"owner": "https://member1.test", "members": ["https://new.test"]}]
    }));

    let customization = compute_enterprise_customizations(&existing, &policy);
    assert_eq!(
        customization,
        overlay(&[
            ("https://owner1.test", Some("https://member1.test")),
            ("https://member2.test", Some("https://member1.test")),
            ("https://member1.test", Some("https://member1.test")),
            ("https://new.test", Some("https://member1.test")),
        ])
    );

    let combined = existing.apply_customizations(&customization);
    let owners = combined.owners_to_members();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[&site("https://member1.test")].len(), 3);
}

#[test]
fn addition_owner_is_existing_owner_absorbs_members() {
    let existing = existing(&[(
        "https://owner1.test",
        &["https://member1.test", "https://member3.test"],
    )]);
    let policy = policy(json!({
        "additions": [{"owner": "https://owner1.test", "members": ["https://member2.test"]}]
    }));

    assert_eq!(
        compute_enterprise_customizations(&existing, &policy),
        overlay(&[
            ("https://member2.test", Some("https://owner1.test")),
            ("https://member1.test", Some("https://owner1.test")),
            ("https://member3.test", Some("https://owner1.test")),
            ("https://owner1.test", Some("https://owner1.test")),
        ])
    );
}

#[test]
fn later_addition_sees_earlier_additions() {
    let existing = existing(&[("https://owner1.test", &["https://member1.test"])]);
    let policy = policy(json!({
        "additions": [
            {"owner": "https://owner1.test", "members": ["https://member2.test"]},
            {"owner": "https://member1.test", "members": ["https://member3.test"]}
        ]
    }));

    let customization = compute_enterprise_customizations(&existing, &policy);
    assert_eq!(
        customization,
        overlay(&[
            ("https://owner1.test", Some("https://member1.test")),
            ("https://member1.test", Some("https://member1.test")),
            ("https://member2.test", Some("https://member1.test")),
            ("https://member3.test", Some("https://member1.test")),
        ])
    );

    let combined = existing.apply_customizations(&customization);
    for (_, owner) in &combined {
        assert_eq!(combined.owner_of(owner), Some(owner));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ordering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn additions_observe_post_replacement_membership() {
    let existing = existing(&[(
        "https://owner1.test",
        &["https://member1.test", "https://member2.test"],
    )]);
    let policy = policy(json!({
        "replacements": [{"owner": "https://owner0.test", "members": ["https://member1.test"]}],
        "additions": [{"owner": "https://owner1.test", "members": ["https://newmember1.test"]}]
    }));

    let customization = compute_enterprise_customizations(&existing, &policy);
    assert_eq!(
        customization,
        overlay(&[
            ("https://member1.test", Some("https://owner0.test")),
            ("https://owner0.test", Some("https://owner0.test")),
            ("https://newmember1.test", Some("https://owner1.test")),
            ("https://member2.test", Some("https://owner1.test")),
            ("https://owner1.test", Some("https://owner1.test")),
        ])
    );

    let combined = existing.apply_customizations(&customization);
    assert_eq!(
        combined.owner_of(&site("https://member1.test")),
        Some(&site("https://owner0.test"))
    );
}

#[test]
fn empty_policy_yields_empty_overlay() {
    let existing = existing(&[("https://owner1.test", &["https://member1.test"])]);
    assert!(compute_enterprise_customizations(&existing, &policy(json!({}))).is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validation_reports_list_and_index() {
    let cases = [
        (
            json!({"replacements": [{"owner": "https://a.test", "members": []}]}),
            PolicyParsingError::new(ParseError::SingletonSet, PolicySetType::Replacement, 0),
        ),
        (
            json!({"additions": [
                {"owner": "https://a.test", "members": ["https://b.test"]},
                {"owner": "not a site", "members": ["https://c.test"]}
            ]}),
            PolicyParsingError::new(ParseError::InvalidOrigin, PolicySetType::Addition, 1),
        ),
        (
            json!({"replacements": [
                {"owner": "https://a.test", "members": ["https://b.test", "https://b.test"]}
            ]}),
            PolicyParsingError::new(ParseError::RepeatedDomain, PolicySetType::Replacement, 0),
        ),
        (
            json!({
                "replacements": [{"owner": "https://a.test", "members": ["https://b.test"]}],
                "additions": [{"owner": "https://c.test", "members": ["https://b.test"]}]
            }),
            PolicyParsingError::new(ParseError::NonDisjointSets, PolicySetType::Addition, 0),
        ),
        (
            json!({"additions": {"owner": "https://a.test"}}),
            PolicyParsingError::new(ParseError::InvalidType, PolicySetType::Addition, 0),
        ),
    ];

    for (document, expected) in cases {
        assert_eq!(validate_enterprise_policy(&document), Some(expected), "{}", document);
    }
}
