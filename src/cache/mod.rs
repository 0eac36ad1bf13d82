//! Registry cache.
//!
//! Packs fetched from a registry are stored on disk, pinned to the concrete
//! ref they resolved to, and reused by every later invocation.

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, CacheKey};
pub use store::{PackSource, RegistryCache, ENTRY_FILE};

use std::path::PathBuf;

/// Get the default cache directory.
///
/// `$XDG_CACHE_HOME/packwright`, else `~/.cache/packwright`, else a
/// `.packwright-cache` directory under the working directory.
pub fn default_cache_dir() -> PathBuf {
    cache_dir_from(
        std::env::var_os("XDG_CACHE_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn cache_dir_from(xdg_cache: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    match (xdg_cache.filter(|p| p.is_absolute()), home) {
        (Some(xdg), _) => xdg.join("packwright"),
        (None, Some(home)) => home.join(".cache").join("packwright"),
        (None, None) => PathBuf::from(".packwright-cache"),
    }
}
