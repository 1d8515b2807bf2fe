//! Site identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Origin shape accepted by [`Site::parse`]: scheme, host, optional port,
/// optional path/query/fragment tail.
const SITE_PATTERN: &str =
    r"(?i)^(https?)://([a-z0-9](?:[a-z0-9.-]*[a-z0-9])?)(?::[0-9]{1,5})?(?:[/?#].*)?$";

/// Error produced when a string cannot be turned into a [`Site`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SiteError {
    /// Input was empty after trimming.
    #[error("Empty site")]
    Empty,
    /// Input is not an http(s) origin.
    #[error("Invalid site: {0}")]
    InvalidOrigin(String),
}

fn site_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SITE_PATTERN).expect("site pattern is a valid regex"))
}

/// Canonical identifier of a registrable web origin.
///
/// Equality and ordering follow the canonical string form
/// (`scheme://host`). Serializes as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Site(String);

impl Site {
    /// Parse and canonicalize an http(s) origin.
    ///
    /// Scheme and host are lowercased; port, path, query, fragment and any
    /// trailing slash are dropped. Registrable-domain reduction is left to
    /// the caller.
    pub fn parse(input: &str) -> Result<Self, SiteError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SiteError::Empty);
        }

        let captures = site_pattern()
            .captures(trimmed)
            .ok_or_else(|| SiteError::InvalidOrigin(trimmed.to_string()))?;

        let scheme = captures
            .get(1)
            .ok_or_else(|| SiteError::InvalidOrigin(trimmed.to_string()))?
            .as_str()
            .to_ascii_lowercase();
        let host = captures
            .get(2)
            .ok_or_else(|| SiteError::InvalidOrigin(trimmed.to_string()))?
            .as_str()
            .to_ascii_lowercase();

        if host.contains("..") {
            return Err(SiteError::InvalidOrigin(trimmed.to_string()));
        }

        Ok(Self(format!("{}://{}", scheme, host)))
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Site {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Site {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
