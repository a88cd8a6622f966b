//! Patcher configuration and builder pattern.

use crate::{CatalogError, Result};
use std::fmt;

/// Environment variable overriding [`PatcherConfig::max_depth`].
pub const ENV_MAX_DEPTH: &str = "SCHEMATA_MAX_DEPTH";
/// Environment variable overriding [`PatcherConfig::duplicate_policy`].
pub const ENV_DUPLICATE_POLICY: &str = "SCHEMATA_DUPLICATE_POLICY";
/// Environment variable overriding [`PatcherConfig::require_fqn`].
pub const ENV_REQUIRE_FQN: &str = "SCHEMATA_REQUIRE_FQN";
/// Environment variable overriding [`PatcherConfig::validate_tags`].
pub const ENV_VALIDATE_TAGS: &str = "SCHEMATA_VALIDATE_TAGS";

/// What to do when two columns in one tree share a fully-qualified name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Patch the first column in depth-first order and ignore the rest
    #[default]
    FirstMatchWins,
    /// Scan the tree before patching and fail on any duplicate
    Reject,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::FirstMatchWins => write!(f, "first_match_wins"),
            DuplicatePolicy::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first_match_wins" | "first" => Ok(DuplicatePolicy::FirstMatchWins),
            "reject" => Ok(DuplicatePolicy::Reject),
            _ => Err(CatalogError::Config(format!(
                "Unknown duplicate policy: {}",
                s
            ))),
        }
    }
}

/// Configuration for [`ColumnTreePatcher`](crate::ColumnTreePatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatcherConfig {
    /// Maximum number of column levels a search may descend (default: 64)
    pub max_depth: usize,
    /// Handling of duplicated fully-qualified names (default: first match wins)
    pub duplicate_policy: DuplicatePolicy,
    /// Fail on columns with an empty fully-qualified name (default: false)
    pub require_fqn: bool,
    /// Validate tag FQNs in patch payloads (default: false)
    pub validate_tags: bool,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            duplicate_policy: DuplicatePolicy::default(),
            require_fqn: false,
            validate_tags: false,
        }
    }
}

impl PatcherConfig {
    /// Default depth limit. Real container schemas rarely nest past a dozen levels.
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    /// Largest accepted depth limit.
    pub const MAX_DEPTH_LIMIT: usize = 1024;

    /// Create a new configuration builder.
    pub fn builder() -> PatcherConfigBuilder {
        PatcherConfigBuilder::new()
    }

    /// Build a configuration from defaults plus `SCHEMATA_*` environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from defaults plus overrides read through `lookup`.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            config.max_depth = value.trim().parse().map_err(|e| {
                CatalogError::Config(format!("Invalid {}='{}': {}", ENV_MAX_DEPTH, value, e))
            })?;
        }

        if let Some(value) = lookup(ENV_DUPLICATE_POLICY) {
            config.duplicate_policy = value.trim().parse()?;
        }

        if let Some(value) = lookup(ENV_REQUIRE_FQN) {
            config.require_fqn = parse_flag(ENV_REQUIRE_FQN, &value)?;
        }

        if let Some(value) = lookup(ENV_VALIDATE_TAGS) {
            config.validate_tags = parse_flag(ENV_VALIDATE_TAGS, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(CatalogError::Config("max_depth must be > 0".to_string()));
        }

        if self.max_depth > Self::MAX_DEPTH_LIMIT {
            return Err(CatalogError::Config(format!(
                "max_depth ({}) must be <= {}",
                self.max_depth,
                Self::MAX_DEPTH_LIMIT
            )));
        }

        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(CatalogError::Config(format!(
            "Invalid {}='{}': expected true or false",
            key, value
        ))),
    }
}

/// Builder for patcher configuration.
#[derive(Debug, Default)]
pub struct PatcherConfigBuilder {
    config: PatcherConfig,
}

impl PatcherConfigBuilder {
    /// Create a new builder starting from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum search depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the duplicate-FQN policy.
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    /// Require every column to carry a fully-qualified name.
    pub fn require_fqn(mut self, require: bool) -> Self {
        self.config.require_fqn = require;
        self
    }

    /// Validate tag FQNs before patching.
    pub fn validate_tags(mut self, validate: bool) -> Self {
        self.config.validate_tags = validate;
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<PatcherConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PatcherConfig::default();
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstMatchWins);
        assert!(!config.require_fqn);
        assert!(!config.validate_tags);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PatcherConfig::builder()
            .max_depth(8)
            .duplicate_policy(DuplicatePolicy::Reject)
            .require_fqn(true)
            .validate_tags(true)
            .build()
            .unwrap();

        assert_eq!(config.max_depth, 8);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.require_fqn);
        assert!(config.validate_tags);
    }

    #[test]
    fn test_builder_rejects_bad_depth() {
        assert!(PatcherConfig::builder().max_depth(0).build().is_err());
        assert!(PatcherConfig::builder().max_depth(1025).build().is_err());
        assert!(PatcherConfig::builder().max_depth(1024).build().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = PatcherConfig::from_lookup(lookup_from(&[
            (ENV_MAX_DEPTH, "12"),
            (ENV_DUPLICATE_POLICY, "REJECT"),
            (ENV_REQUIRE_FQN, "1"),
            (ENV_VALIDATE_TAGS, "false"),
        ]))
        .unwrap();

        assert_eq!(config.max_depth, 12);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.require_fqn);
        assert!(!config.validate_tags);
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = PatcherConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, PatcherConfig::default());
    }

    #[test]
    fn test_from_lookup_invalid_values() {
        let err = PatcherConfig::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, "deep")])).unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));

        assert!(PatcherConfig::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, "0")])).is_err());
        assert!(
            PatcherConfig::from_lookup(lookup_from(&[(ENV_DUPLICATE_POLICY, "last")])).is_err()
        );
        assert!(PatcherConfig::from_lookup(lookup_from(&[(ENV_REQUIRE_FQN, "maybe")])).is_err());
    }

    #[test]
    fn test_duplicate_policy_display_round_trip() {
        for policy in [DuplicatePolicy::FirstMatchWins, DuplicatePolicy::Reject] {
            assert_eq!(policy.to_string().parse::<DuplicatePolicy>().unwrap(), policy);
        }
    }
}
