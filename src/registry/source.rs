//! Remote registry access.
//!
//! A registry is a named remote holding many packs under one directory
//! (`packs/` by default). [`RegistrySource`] is the seam between the cache
//! and whatever actually talks to the remote; [`super::GitRegistry`] is the
//! production implementation and tests substitute their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Configuration for one named registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Remote URL (anything `git` can fetch from).
    pub url: String,
    /// Directory inside the remote that holds one sub-directory per pack.
    #[serde(default = "default_packs_dir")]
    pub packs_dir: String,
}

fn default_packs_dir() -> String {
    "packs".to_string()
}

/// A configured registry together with its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLocation {
    pub name: String,
    pub url: String,
    pub packs_dir: String,
}

/// All configured registries, by name.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    by_name: BTreeMap<String, RegistryLocation>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `registries` section of the configuration.
    pub fn from_config(configs: &BTreeMap<String, RegistryConfig>) -> Self {
        let mut registries = Self::new();
        for (name, config) in configs {
            registries.insert(name, config.clone());
        }
        registries
    }

    pub fn insert(&mut self, name: impl Into<String>, config: RegistryConfig) {
        let name = name.into();
        self.by_name.insert(
            name.clone(),
            RegistryLocation {
                name,
                url: config.url,
                packs_dir: config.packs_dir,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&RegistryLocation> {
        self.by_name.get(name)
    }

    /// Registry names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Failure talking to a remote registry.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The registry answered, but the pack or ref does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The registry could not be reached, or the operation timed out.
    #[error("{0}")]
    Unavailable(String),
}

/// Access to remote registries.
///
/// Implementations must be safe to call from several threads at once; the
/// cache guarantees that `fetch` is never called twice concurrently for the
/// same pack and ref.
pub trait RegistrySource: Send + Sync {
    /// Resolve `git_ref` for `pack` to a concrete ref.
    ///
    /// `"latest"` resolves to the most recent version. Any other ref must
    /// exist on the remote and comes back in a form `fetch` accepts, which
    /// may differ from the input (an abbreviated SHA is expanded).
    ///
    /// Only the registry and the ref are checked here. Whether `pack` exists
    /// at that ref is known only once its files are fetched, so a missing
    /// pack surfaces as [`RemoteError::NotFound`] from `fetch`.
    /// Must not have side effects.
    fn resolve_ref(
        &self,
        registry: &RegistryLocation,
        pack: &str,
        git_ref: &str,
    ) -> Result<String, RemoteError>;

    /// Write the files of `pack` at `resolved_ref` into `dest`.
    ///
    /// `dest` does not exist yet; the implementation creates it.
    fn fetch(
        &self,
        registry: &RegistryLocation,
        pack: &str,
        resolved_ref: &str,
        dest: &Path,
    ) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registry_config() {
        let yaml = "url: https://example.com/packs.git\n";
        let config: RegistryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.url, "https://example.com/packs.git");
        assert_eq!(config.packs_dir, "packs");
    }

    #[test]
    fn parses_custom_packs_dir() {
        let yaml = "url: git@example.com:org/packs.git\npacks_dir: catalog\n";
        let config: RegistryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.packs_dir, "catalog");
    }

    #[test]
    fn registries_lookup_by_name() {
        let mut configs = BTreeMap::new();
        configs.insert(
            "default".to_string(),
            RegistryConfig {
                url: "https://example.com/a.git".into(),
                packs_dir: "packs".into(),
            },
        );
        configs.insert(
            "internal".to_string(),
            RegistryConfig {
                url: "https://example.com/b.git".into(),
                packs_dir: "packs".into(),
            },
        );

        let registries = Registries::from_config(&configs);
        assert_eq!(
            registries.get("internal").map(|r| r.url.as_str()),
            Some("https://example.com/b.git")
        );
        assert!(registries.get("missing").is_none());
        assert_eq!(
            registries.names().collect::<Vec<_>>(),
            vec!["default", "internal"]
        );
    }
}
