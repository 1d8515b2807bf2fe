//! Parsers for the textual set formats.
//!
//! - Public sets: a whitespace-separated stream of
//!   `{"owner": "...", "members": ["..."]}` records
//! - Override flag: `owner,member1,member2`
//! - Persisted mapping: a JSON object `{site: owner}`
//!
//! Set-level validation (canonical sites, no singletons, no repeats,
//! disjointness) is shared with the enterprise policy validator.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{FlattenedSets, ParseError, SingleSet, Site, SiteError};

/// Error from parsing one of the set formats.
#[derive(Debug, thiserror::Error)]
pub enum SetsParseError {
    /// Input was not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A set failed validation.
    #[error("Invalid set at index {index}: {error}")]
    InvalidSet {
        /// Failure kind.
        error: ParseError,
        /// Position of the set in the input.
        index: usize,
    },
    /// A site string could not be canonicalized.
    #[error(transparent)]
    Site(#[from] SiteError),
    /// A persisted mapping violates the flattened-set invariants.
    #[error("Corrupt mapping: {0}")]
    Corrupt(String),
}

/// Wire form of one set record.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSet {
    pub owner: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Canonicalize and validate one set against the sites already claimed by
/// earlier sets.
///
/// On success every site of the new set is added to `seen`.
pub(crate) fn canonicalize_set(
    owner: &str,
    members: &[String],
    seen: &mut BTreeSet<Site>,
) -> Result<SingleSet, ParseError> {
    let owner = Site::parse(owner).map_err(|_| ParseError::InvalidOrigin)?;
    if members.is_empty() {
        return Err(ParseError::SingletonSet);
    }

    let mut local: BTreeSet<Site> = BTreeSet::new();
    local.insert(owner.clone());

    let mut parsed = Vec::with_capacity(members.len());
    for member in members {
        let member = Site::parse(member).map_err(|_| ParseError::InvalidOrigin)?;
        if !local.insert(member.clone()) {
            return Err(ParseError::RepeatedDomain);
        }
        parsed.push(member);
    }

    if local.iter().any(|site| seen.contains(site)) {
        return Err(ParseError::NonDisjointSets);
    }
    seen.extend(local);

    Ok(SingleSet::new(owner, parsed))
}

/// Parse a public-sets record stream.
///
/// Any invalid record rejects the whole stream.
pub fn parse_sets_from_str(contents: &str) -> Result<Vec<SingleSet>, SetsParseError> {
    let mut seen = BTreeSet::new();
    let mut sets = Vec::new();

    let stream = serde_json::Deserializer::from_str(contents).into_iter::<RawSet>();
    for (index, record) in stream.enumerate() {
        let raw = record?;
        let set = canonicalize_set(&raw.owner, &raw.members, &mut seen)
            .map_err(|error| SetsParseError::InvalidSet { error, index })?;
        sets.push(set);
    }

    Ok(sets)
}

/// Parse a public-sets record stream straight into a flattened store.
pub fn parse_flattened_sets(contents: &str) -> Result<FlattenedSets, SetsParseError> {
    let sets = parse_sets_from_str(contents)?;
    Ok(FlattenedSets::from_sets(&sets))
}

/// Parse the override flag: the first site is the owner, the rest members.
///
/// Blank entries are skipped. An empty flag yields `None`.
pub fn parse_manual_set_flag(flag_value: &str) -> Result<Option<SingleSet>, SetsParseError> {
    let entries: Vec<String> = flag_value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    let Some((owner, members)) = entries.split_first() else {
        return Ok(None);
    };

    let mut seen = BTreeSet::new();
    canonicalize_set(owner, members, &mut seen)
        .map(Some)
        .map_err(|error| SetsParseError::InvalidSet { error, index: 0 })
}

/// Serialize a store to the persisted JSON form.
pub fn serialize_persisted_sets(sets: &FlattenedSets) -> Result<String, serde_json::Error> {
    serde_json::to_string(sets)
}

/// Deserialize a persisted mapping, checking the flattened-set invariants.
pub fn deserialize_persisted_sets(contents: &str) -> Result<FlattenedSets, SetsParseError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(contents)?;

    let mut map = BTreeMap::new();
    for (site, owner) in &raw {
        map.insert(Site::parse(site)?, Site::parse(owner)?);
    }

    for owner in map.values() {
        if map.get(owner) != Some(owner) {
            return Err(SetsParseError::Corrupt(format!(
                "owner {} does not map to itself",
                owner
            )));
        }
    }

    Ok(FlattenedSets::from(map))
}
