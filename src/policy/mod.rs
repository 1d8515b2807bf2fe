//! Enterprise policy validation and customization.

pub mod merge;
pub mod validate;

pub use merge::compute_enterprise_customizations;
pub use validate::{parse_enterprise_policy, validate_enterprise_policy};
