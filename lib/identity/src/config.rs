//! Cache sizing configuration.

use serde::Deserialize;

/// Sizing for a single loading cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of resident entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl CacheConfig {
    /// Creates a config holding at most `max_entries` entries.
    #[must_use]
    pub const fn with_max_entries(max_entries: usize) -> Self {
        Self { max_entries }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::with_max_entries(default_max_entries())
    }
}

fn default_max_entries() -> usize {
    1024
}

/// Sizing for every identity cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityCacheConfig {
    /// Account states and the username index.
    #[serde(default = "default_accounts")]
    pub accounts: CacheConfig,

    /// Groups, per lookup key.
    #[serde(default = "default_groups")]
    pub groups: CacheConfig,

    /// Inclusion edges and membership lists.
    #[serde(default = "default_includes")]
    pub includes: CacheConfig,
}

impl Default for IdentityCacheConfig {
    fn default() -> Self {
        Self {
            accounts: default_accounts(),
            groups: default_groups(),
            includes: default_includes(),
        }
    }
}

fn default_accounts() -> CacheConfig {
    CacheConfig::with_max_entries(4096)
}

fn default_groups() -> CacheConfig {
    CacheConfig::with_max_entries(1024)
}

fn default_includes() -> CacheConfig {
    CacheConfig::with_max_entries(4096)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_cache() {
        let config = IdentityCacheConfig::default();
        assert_eq!(config.accounts.max_entries, 4096);
        assert_eq!(config.groups.max_entries, 1024);
        assert_eq!(config.includes.max_entries, 4096);
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let config: IdentityCacheConfig =
            serde_json::from_str(r#"{"groups": {"max_entries": 10}}"#).expect("deserialize");
        assert_eq!(config.groups.max_entries, 10);
        assert_eq!(config.accounts.max_entries, 4096);
    }
}
