//! Configuration loading.
//!
//! - [`schema`] - the [`Config`] structure
//! - [`loader`] - file discovery and layer merging

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_layers, resolve_cache_dir, ConfigPaths};
pub use schema::{Config, DEFAULT_FETCH_TIMEOUT_SECS};
