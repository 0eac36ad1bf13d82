//! Pack metadata (`metadata.yaml`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PackError, Result};
use crate::registry::PackReference;

/// Parsed `metadata.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackMetadata {
    #[serde(default)]
    pub app: AppInfo,
    #[serde(default)]
    pub pack: PackInfo,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

/// The application a pack deploys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppInfo {
    #[serde(default)]
    pub url: Option<String>,
}

/// Descriptive information about the pack itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A child pack declared by its parent.
///
/// ```yaml
/// dependencies:
///   - name: redis
///     alias: cache
///     registry: internal
///     ref: v1.2.0
///   - name: sidecar
///     path: ../sidecar
///   - name: bundled        # loaded from deps/bundled
///     enabled: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Directory relative to the parent pack.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DependencySpec {
    /// Alias the child is attached under; defaults to its name.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Reference for this dependency, relative to the parent's directory.
    ///
    /// Without a path, registry or ref the child is vendored under
    /// `deps/<name>` in the parent.
    pub fn reference(&self, parent_dir: &Path) -> Result<PackReference> {
        let path = match (&self.path, &self.registry, &self.git_ref) {
            (Some(path), _, _) => Some(parent_dir.join(path)),
            (None, None, None) => Some(parent_dir.join(super::DEPS_DIR).join(&self.name)),
            _ => None,
        };
        PackReference::from_parts(
            self.name.clone(),
            self.registry.as_deref(),
            self.git_ref.as_deref(),
            path.as_deref(),
        )
    }
}

impl PackMetadata {
    /// Read and parse a metadata file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|message| PackError::LoadParseError {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }
}
