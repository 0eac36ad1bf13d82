//! Configuration discovery and layering.
//!
//! Layers, later overriding earlier:
//! 1. Built-in defaults
//! 2. User config (`$XDG_CONFIG_HOME/packwright/config.yml`, or
//!    `~/.config/packwright/config.yml`)
//! 3. A file given with `--config`
//!
//! Layers are deep-merged as YAML before parsing, so a later file only
//! needs the keys it changes. A `null` in a later layer removes the key.

use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::schema::Config;
use crate::cache::default_cache_dir;
use crate::error::{PackError, Result};

/// Config files to merge, in order.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// User config, when it exists.
    pub user: Option<PathBuf>,
    /// Explicit `--config` file. Must exist.
    pub explicit: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn discover(explicit: Option<&Path>) -> Self {
        Self {
            user: user_config_path().filter(|p| p.is_file()),
            explicit: explicit.map(Path::to_path_buf),
        }
    }

    /// Existing layers in merge order.
    pub fn layers(&self) -> Vec<&PathBuf> {
        self.user.iter().chain(self.explicit.iter()).collect()
    }
}

fn user_config_path() -> Option<PathBuf> {
    config_home(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .map(|dir| dir.join("packwright").join("config.yml"))
}

fn config_home(xdg: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    xdg.filter(|p| p.is_absolute())
        .or_else(|| home.map(|h| h.join(".config")))
}

/// Discover and load configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let paths = ConfigPaths::discover(explicit);
    load_layers(&paths.layers())
}

/// Merge the given files over the defaults and parse the result.
pub fn load_layers<P: AsRef<Path>>(layers: &[P]) -> Result<Config> {
    let mut merged = Value::Mapping(Default::default());
    for path in layers {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading config layer");
        deep_merge(&mut merged, load_value(path)?);
    }

    let config: Config = serde_yaml::from_value(merged).map_err(|e| PackError::ConfigError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

fn load_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| PackError::ConfigError {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    if content.trim().is_empty() {
        return Ok(Value::Mapping(Default::default()));
    }
    serde_yaml::from_str(&content).map_err(|e| PackError::ConfigError {
        message: format!("{}: {}", path.display(), e),
    })
}

/// Merge `overlay` into `base`. Mappings merge recursively; anything else
/// replaces. A null overlay value removes the key.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    base_map.remove(&key);
                } else if let Some(existing) = base_map.get_mut(&key) {
                    deep_merge(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Cache root: the explicit flag, then config, then the platform default.
pub fn resolve_cache_dir(flag: Option<&Path>, config: &Config) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.cache_dir.clone())
        .unwrap_or_else(default_cache_dir)
}
