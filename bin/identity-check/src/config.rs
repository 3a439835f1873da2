//! Configuration of the identity check tool.
//!
//! Loaded via the `config` crate from an optional file, then from
//! `REVU__`-prefixed environment variables (`__` separates nested keys,
//! e.g. `REVU__CACHES__ACCOUNTS__MAX_ENTRIES=128`).

use revu_access::CapabilityConfig;
use revu_identity::IdentityCacheConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Tool configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct CheckConfig {
    /// JSON store snapshot to load.
    #[serde(default)]
    pub fixture: Option<PathBuf>,

    /// Cache sizes.
    #[serde(default)]
    pub caches: IdentityCacheConfig,

    /// Groups granted each global capability.
    #[serde(default)]
    pub capabilities: CapabilityConfig,
}

impl CheckConfig {
    /// Loads configuration from `file`, if given, and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with(file, environment())
    }

    fn load_with(
        file: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file));
        }
        builder
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("REVU")
        .separator("__")
        .try_parsing(true)
}
