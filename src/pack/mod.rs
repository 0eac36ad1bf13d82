//! Packs and pack trees.
//!
//! A pack directory looks like this:
//!
//! ```text
//! web/
//!   metadata.yaml      # app, pack and dependencies
//!   variables.yaml     # optional variable declarations
//!   templates/         # optional, handed to the renderer untouched
//!   deps/redis/        # vendored child pack
//! ```
//!
//! [`load_pack`] reads a directory (or a cached registry pack) into a
//! [`Pack`], recursively loading every declared dependency under its alias.

pub mod declarations;
pub mod loader;
pub mod metadata;

pub use declarations::{is_valid_variable_name, VariableSpec};
pub use loader::{load_pack, PackLoader, DEFAULT_WORKERS};
pub use metadata::{AppInfo, DependencySpec, PackInfo, PackMetadata};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::cache::PackSource;

/// Pack metadata file name.
pub const METADATA_FILE: &str = "metadata.yaml";

/// Variable declaration file name.
pub const VARIABLES_FILE: &str = "variables.yaml";

/// Template directory name.
pub const TEMPLATES_DIR: &str = "templates";

/// Directory holding vendored dependencies.
pub const DEPS_DIR: &str = "deps";

/// A loaded pack and its children.
///
/// Packs form a strict tree: every child is owned by exactly one parent and
/// is addressed by its alias path, e.g. `web.cache`.
#[derive(Debug, Clone)]
pub struct Pack {
    /// Dotted alias path from the root, e.g. `web.cache`.
    pub path: String,
    pub alias: String,
    pub source: PackSource,
    pub metadata: PackMetadata,
    pub variable_specs: Vec<VariableSpec>,
    pub template_files: BTreeSet<PathBuf>,
    pub children: BTreeMap<String, Pack>,
}

impl Pack {
    /// Directory the pack was read from.
    pub fn dir(&self) -> &Path {
        self.source.path()
    }

    /// Display name: the metadata name, or the alias when unnamed.
    pub fn name(&self) -> &str {
        if self.metadata.pack.name.is_empty() {
            &self.alias
        } else {
            &self.metadata.pack.name
        }
    }

    /// This pack followed by all descendants, depth first, children in alias order.
    pub fn walk(&self) -> Vec<&Pack> {
        let mut packs = vec![self];
        for child in self.children.values() {
            packs.extend(child.walk());
        }
        packs
    }

    /// Find a pack by alias path.
    pub fn find(&self, path: &str) -> Option<&Pack> {
        self.walk().into_iter().find(|p| p.path == path)
    }

    /// Declaration file of every pack that has one, keyed by alias path.
    pub fn root_variable_files(&self) -> BTreeMap<String, PathBuf> {
        self.walk()
            .into_iter()
            .filter_map(|p| {
                let file = p.dir().join(VARIABLES_FILE);
                file.is_file().then(|| (p.path.clone(), file))
            })
            .collect()
    }
}
