//! Handler configuration.

use crate::types::ParsedPolicySetLists;

/// Configuration for [`FirstPartySetsHandler`](super::FirstPartySetsHandler).
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// When false, the published store is always empty and every previously
    /// persisted site is cleared.
    pub enabled: bool,
    /// When true, readiness waits for the embedder to deliver the public
    /// list via `set_public_sets`. When false, the public list is empty.
    pub embedder_provides_public_sets: bool,
    /// Validated enterprise policy layered over the public and manual sets.
    pub policy: Option<ParsedPolicySetLists>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            embedder_provides_public_sets: false,
            policy: None,
        }
    }
}

impl HandlerConfig {
    /// Set whether the feature is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set whether the embedder delivers the public list.
    pub fn with_embedder_provided_public_sets(mut self, provides: bool) -> Self {
        self.embedder_provides_public_sets = provides;
        self
    }

    /// Attach an enterprise policy.
    pub fn with_policy(mut self, policy: ParsedPolicySetLists) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `FPS_ENABLED` (default true) and
    /// `FPS_EMBEDDER_PROVIDES_PUBLIC_SETS` (default false). Unrecognized
    /// values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("FPS_ENABLED", defaults.enabled),
            embedder_provides_public_sets: env_flag(
                "FPS_EMBEDDER_PROVIDES_PUBLIC_SETS",
                defaults.embedder_provides_public_sets,
            ),
            policy: None,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_flag(&value).unwrap_or_else(|| {
            tracing::warn!(
                variable = name,
                value = %value,
                default = default,
                "unrecognized boolean, using default"
            );
            default
        }),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert!(config.enabled);
        assert!(!config.embedder_provides_public_sets);
        assert!(config.policy.is_none());
    }

    #[test]
    fn test_builders() {
        let config = HandlerConfig::default()
            .with_enabled(false)
            .with_embedder_provided_public_sets(true)
            .with_policy(ParsedPolicySetLists::default());
        assert!(!config.enabled);
        assert!(config.embedder_provides_public_sets);
        assert!(config.policy.is_some());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
