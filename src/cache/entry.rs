//! Cache keys and entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a pinned pack version: `(registry, pack, resolved ref)`.
///
/// The ref is always concrete, never `latest`, so two resolutions of
/// `latest` to different versions never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub registry: String,
    pub pack: String,
    pub resolved_ref: String,
}

impl CacheKey {
    pub fn new(
        registry: impl Into<String>,
        pack: impl Into<String>,
        resolved_ref: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            pack: pack.into(),
            resolved_ref: resolved_ref.into(),
        }
    }

    /// Directory for this key: `<root>/<registry>/<pack>/<ref>`.
    ///
    /// Refs may contain `/` (branch names); it is percent-encoded.
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.registry)
            .join(&self.pack)
            .join(encode_ref(&self.resolved_ref))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.registry, self.pack, self.resolved_ref)
    }
}

fn encode_ref(git_ref: &str) -> String {
    git_ref.replace('%', "%25").replace('/', "%2F")
}

/// A fetched pack pinned to a concrete ref. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub registry: String,
    pub pack_name: String,
    pub resolved_ref: String,
    pub local_path: PathBuf,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: &CacheKey, local_path: impl Into<PathBuf>) -> Self {
        Self {
            registry: key.registry.clone(),
            pack_name: key.pack.clone(),
            resolved_ref: key.resolved_ref.clone(),
            local_path: local_path.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.registry, &self.pack_name, &self.resolved_ref)
    }
}
