//! Core types for first-party sets.

pub mod site;
pub mod sets;
pub mod policy;

pub use site::{Site, SiteError};
pub use sets::{FlattenedSets, SingleSet};
pub use policy::{
    ParsedPolicySetLists, PolicyCustomization, ParseError, PolicySetType, PolicyParsingError,
};
