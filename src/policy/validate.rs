//! Enterprise policy document validation.
//!
//! The document is `{"replacements": [...], "additions": [...]}` where each
//! entry is `{"owner": site, "members": [site, ...]}`. Both keys are
//! optional. Replacements are checked before additions, and disjointness is
//! checked across both lists.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::parser::canonicalize_set;
use crate::types::{
    ParseError, ParsedPolicySetLists, PolicyParsingError, PolicySetType, SingleSet, Site,
};

/// Validate a policy document, returning the first error found.
pub fn validate_enterprise_policy(policy: &Value) -> Option<PolicyParsingError> {
    parse_enterprise_policy(policy).err()
}

/// Parse and validate a policy document.
pub fn parse_enterprise_policy(policy: &Value) -> Result<ParsedPolicySetLists, PolicyParsingError> {
    let dict = policy.as_object().ok_or_else(|| {
        PolicyParsingError::new(ParseError::InvalidType, PolicySetType::Replacement, 0)
    })?;

    let mut seen = BTreeSet::new();
    let replacements = parse_list(dict, PolicySetType::Replacement, &mut seen)?;
    let additions = parse_list(dict, PolicySetType::Addition, &mut seen)?;

    Ok(ParsedPolicySetLists::new(replacements, additions))
}

fn parse_list(
    dict: &serde_json::Map<String, Value>,
    set_type: PolicySetType,
    seen: &mut BTreeSet<Site>,
) -> Result<Vec<SingleSet>, PolicyParsingError> {
    let Some(list) = dict.get(set_type.key()) else {
        return Ok(Vec::new());
    };
    let entries = list
        .as_array()
        .ok_or_else(|| PolicyParsingError::new(ParseError::InvalidType, set_type, 0))?;

    let mut sets = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let fail = |error| PolicyParsingError::new(error, set_type, index);

        let owner = entry
            .get("owner")
            .and_then(Value::as_str)
            .ok_or_else(|| fail(ParseError::InvalidType))?;
        let members = entry
            .get("members")
            .and_then(Value::as_array)
            .ok_or_else(|| fail(ParseError::InvalidType))?
            .iter()
            .map(|m| m.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| fail(ParseError::InvalidType))?;

        let set = canonicalize_set(owner, &members, seen).map_err(fail)?;
        sets.push(set);
    }

    Ok(sets)
}
