//! # first-party-sets
//!
//! Merging, customization, diffing and readiness for first-party sets.
//!
//! A first-party set is an owner site plus member sites. The crate answers
//! three questions:
//!
//! > Which set does each site belong to right now?
//! > Which sites changed sets since the last run?
//! > When is the answer available?
//!
//! ## Architecture
//!
//! ```text
//! public list ─┐
//! flag value ──┼─→ FlattenedSets ─→ policy overlay ─→ FirstPartySetsHandler ─→ readers
//! policy ──────┘                                            │
//!                                   SetsStore (previous) ─→ compute_sets_diff ─→ SiteDataClearer
//! ```
//!
//! ## Guarantees
//!
//! - Published stores are immutable; a new store replaces the old `Arc`
//! - Readers queued before readiness are released once, in order
//! - The diff may over-report changed sites, never under-report

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod diff;
pub mod policy;
pub mod parser;
pub mod store;
pub mod clearing;
pub mod handler;

// Re-exports
pub use types::{
    Site, SiteError, FlattenedSets, SingleSet,
    ParsedPolicySetLists, PolicyCustomization, ParseError, PolicySetType, PolicyParsingError,
};
pub use diff::compute_sets_diff;
pub use policy::{compute_enterprise_customizations, parse_enterprise_policy, validate_enterprise_policy};
pub use parser::{
    parse_sets_from_str, parse_flattened_sets, parse_manual_set_flag,
    serialize_persisted_sets, deserialize_persisted_sets, SetsParseError,
};
pub use store::{SetsStore, StoreError, FileSetsStore, InMemorySetsStore};
pub use clearing::{SiteDataClearer, NoOpClearer, RecordingClearer};
pub use handler::{FirstPartySetsHandler, HandlerConfig, HandlerError, ReadinessState, SetsCallback};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};

/// File name of the persisted mapping inside the storage directory.
pub const PERSISTED_SETS_FILE_NAME: &str = "persisted_first_party_sets.json";
