//! Pack references and their resolution to concrete sources.
//!
//! A [`PackReference`] names *where* a pack comes from: either a registry
//! (with a symbolic or literal ref) or a local directory. The
//! [`ReferenceResolver`] pins a registry reference to a concrete ref by
//! asking the remote, and validates local directories. Neither step touches
//! the cache.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::source::{Registries, RegistrySource, RemoteError};
use crate::cache::CacheKey;
use crate::error::{PackError, Result};
use crate::pack::METADATA_FILE;

/// Registry used when a reference names none.
pub const DEFAULT_REGISTRY: &str = "default";

/// Symbolic ref meaning "the most recent version".
pub const LATEST_REF: &str = "latest";

/// Identifies where a pack comes from. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackReference {
    name: String,
    location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Location {
    Registry { registry: String, git_ref: String },
    Path(PathBuf),
}

impl PackReference {
    /// A pack in the default registry at the latest version.
    pub fn registry(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Location::Registry {
                registry: DEFAULT_REGISTRY.to_string(),
                git_ref: LATEST_REF.to_string(),
            },
        }
    }

    /// A pack in a local directory. The name is the directory name.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            location: Location::Path(path),
        }
    }

    /// Build a reference from optional parts, as given on a command line or
    /// in a dependency declaration.
    ///
    /// `path` is mutually exclusive with an explicit `registry` or `git_ref`.
    pub fn from_parts(
        name: impl Into<String>,
        registry: Option<&str>,
        git_ref: Option<&str>,
        path: Option<&Path>,
    ) -> Result<Self> {
        let name = name.into();
        match path {
            Some(path) => {
                if registry.is_some() || git_ref.is_some() {
                    return Err(PackError::InvalidReference {
                        message: format!(
                            "pack '{}' sets a path together with a registry or ref",
                            name
                        ),
                    });
                }
                Ok(Self {
                    name,
                    location: Location::Path(path.to_path_buf()),
                })
            }
            None => Ok(Self {
                name,
                location: Location::Registry {
                    registry: registry
                        .filter(|r| !r.is_empty())
                        .unwrap_or(DEFAULT_REGISTRY)
                        .to_string(),
                    git_ref: git_ref
                        .filter(|r| !r.is_empty())
                        .unwrap_or(LATEST_REF)
                        .to_string(),
                },
            }),
        }
    }

    /// Same pack from another registry.
    pub fn with_registry(self, registry: impl Into<String>) -> Self {
        match self.location {
            Location::Registry { git_ref, .. } => Self {
                name: self.name,
                location: Location::Registry {
                    registry: registry.into(),
                    git_ref,
                },
            },
            Location::Path(_) => self,
        }
    }

    /// Same pack at another ref.
    pub fn with_ref(self, git_ref: impl Into<String>) -> Self {
        match self.location {
            Location::Registry { registry, .. } => Self {
                name: self.name,
                location: Location::Registry {
                    registry,
                    git_ref: git_ref.into(),
                },
            },
            Location::Path(_) => self,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry name, or `None` for local packs.
    pub fn registry_name(&self) -> Option<&str> {
        match &self.location {
            Location::Registry { registry, .. } => Some(registry),
            Location::Path(_) => None,
        }
    }

    /// Requested ref, or `None` for local packs.
    pub fn git_ref(&self) -> Option<&str> {
        match &self.location {
            Location::Registry { git_ref, .. } => Some(git_ref),
            Location::Path(_) => None,
        }
    }

    /// Local directory, or `None` for registry packs.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::Path(path) => Some(path),
            Location::Registry { .. } => None,
        }
    }

    pub fn is_latest(&self) -> bool {
        self.git_ref() == Some(LATEST_REF)
    }
}

impl fmt::Display for PackReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Location::Registry { registry, git_ref } => {
                write!(f, "{}@{} (registry {})", self.name, git_ref, registry)
            }
            Location::Path(path) => write!(f, "{} ({})", self.name, path.display()),
        }
    }
}

/// Result of pinning a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pinned {
    /// Ephemeral local directory, never cached.
    Local(PathBuf),
    /// Registry pack pinned to a concrete ref.
    Remote(CacheKey),
}

/// Turns references into concrete, non-symbolic locations.
#[derive(Clone)]
pub struct ReferenceResolver {
    registries: Registries,
    remote: Arc<dyn RegistrySource>,
}

impl ReferenceResolver {
    pub fn new(registries: Registries, remote: Arc<dyn RegistrySource>) -> Self {
        Self { registries, remote }
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn remote(&self) -> &dyn RegistrySource {
        self.remote.as_ref()
    }

    /// Pin a reference without side effects.
    ///
    /// Local paths are validated. Registry references are resolved through
    /// the remote; `latest` becomes the most recent version there.
    pub fn pin(&self, reference: &PackReference) -> Result<Pinned> {
        match &reference.location {
            Location::Path(path) => verify_local_pack(path).map(Pinned::Local),
            Location::Registry { registry, git_ref } => {
                let location =
                    self.registries
                        .get(registry)
                        .ok_or_else(|| PackError::NotFound {
                            what: format!(
                                "registry '{}' is not configured (needed for pack '{}')",
                                registry, reference.name
                            ),
                        })?;

                let resolved = self
                    .remote
                    .resolve_ref(location, &reference.name, git_ref)
                    .map_err(|e| remote_error(registry, &reference.name, git_ref, e))?;

                debug!(
                    pack = %reference.name,
                    registry = %registry,
                    requested = %git_ref,
                    resolved = %resolved,
                    "Pinned pack reference"
                );

                Ok(Pinned::Remote(CacheKey::new(
                    registry.clone(),
                    reference.name.clone(),
                    resolved,
                )))
            }
        }
    }
}

/// Map a remote failure to the pack error taxonomy.
pub(crate) fn remote_error(registry: &str, pack: &str, git_ref: &str, err: RemoteError) -> PackError {
    match err {
        RemoteError::NotFound(message) => PackError::NotFound {
            what: format!(
                "{}@{} in registry '{}': {}",
                pack, git_ref, registry, message
            ),
        },
        RemoteError::Unavailable(message) => PackError::FetchFailed {
            registry: registry.to_string(),
            pack: pack.to_string(),
            message,
            retryable: true,
        },
    }
}

/// Check that a directory exists and holds a pack.
pub fn verify_local_pack(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(PackError::NotFound {
            what: format!("{} is not a directory", path.display()),
        });
    }
    if !path.join(METADATA_FILE).is_file() {
        return Err(PackError::NotFound {
            what: format!("{} has no {}", path.display(), METADATA_FILE),
        });
    }
    Ok(path.to_path_buf())
}
