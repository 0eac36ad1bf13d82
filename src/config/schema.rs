//! Configuration schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PackError, Result};
use crate::pack::DEFAULT_WORKERS;
use crate::registry::RegistryConfig;

/// Default timeout for a single remote git operation.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// packwright configuration.
///
/// ```yaml
/// registries:
///   default:
///     url: https://github.com/example/packs.git
///   internal:
///     url: git@git.example.com:ops/packs.git
///     packs_dir: catalog
/// cache_dir: /var/cache/packwright
/// fetch_timeout_secs: 30
/// workers: 8
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Named registries.
    pub registries: BTreeMap<String, RegistryConfig>,

    /// Cache root. Falls back to the platform cache directory.
    pub cache_dir: Option<PathBuf>,

    /// Timeout for one remote operation, in seconds.
    pub fetch_timeout_secs: u64,

    /// Sibling packs loaded concurrently.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registries: BTreeMap::new(),
            cache_dir: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Reject values that would make every command fail later.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PackError::ConfigError {
                message: "workers must be at least 1".to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(PackError::ConfigError {
                message: "fetch_timeout_secs must be at least 1".to_string(),
            });
        }
        if let Some((name, _)) = self
            .registries
            .iter()
            .find(|(_, r)| r.url.trim().is_empty())
        {
            return Err(PackError::ConfigError {
                message: format!("registry '{}' has an empty url", name),
            });
        }
        Ok(())
    }
}
