//! Enterprise policy types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::sets::SingleSet;
use super::site::Site;

/// Overlay produced by policy customization.
///
/// `Some(owner)`: the site now belongs to `owner`'s set.
/// `None`: the site's previous membership is revoked.
/// Sites absent from the map keep whatever the base store says.
pub type PolicyCustomization = BTreeMap<Site, Option<Site>>;

/// Validated replacement and addition lists from an enterprise policy.
///
/// Sets across both lists are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPolicySetLists {
    /// Sets that replace whatever the existing store says about their sites.
    pub replacements: Vec<SingleSet>,
    /// Sets merged into the existing store.
    pub additions: Vec<SingleSet>,
}

impl ParsedPolicySetLists {
    /// Create policy lists.
    pub fn new(replacements: Vec<SingleSet>, additions: Vec<SingleSet>) -> Self {
        Self { replacements, additions }
    }

    /// Whether both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.additions.is_empty()
    }
}

/// Kind of validation failure in a policy document or set list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseError {
    /// A value had the wrong JSON type or a required field was missing.
    InvalidType,
    /// A site string could not be canonicalized.
    InvalidOrigin,
    /// A set had no members.
    SingletonSet,
    /// A site appears in more than one set.
    NonDisjointSets,
    /// A site appears twice within the same set.
    RepeatedDomain,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidType => write!(f, "invalid_type"),
            Self::InvalidOrigin => write!(f, "invalid_origin"),
            Self::SingletonSet => write!(f, "singleton_set"),
            Self::NonDisjointSets => write!(f, "non_disjoint_sets"),
            Self::RepeatedDomain => write!(f, "repeated_domain"),
        }
    }
}

/// Which policy list an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySetType {
    /// The `replacements` list.
    Replacement,
    /// The `additions` list.
    Addition,
}

impl PolicySetType {
    /// JSON key of this list in the policy document.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Replacement => "replacements",
            Self::Addition => "additions",
        }
    }
}

impl fmt::Display for PolicySetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Structured policy validation error: what went wrong, in which list, at
/// which set index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[error("{error} in {set_type}[{index}]")]
pub struct PolicyParsingError {
    /// Failure kind.
    pub error: ParseError,
    /// Offending list.
    pub set_type: PolicySetType,
    /// Index of the offending set within its list.
    pub index: usize,
}

impl PolicyParsingError {
    /// Create a policy parsing error.
    pub fn new(error: ParseError, set_type: PolicySetType, index: usize) -> Self {
        Self { error, set_type, index }
    }
}
