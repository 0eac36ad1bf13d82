//! Recursive pack loading.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::anyhow;
use tracing::{debug, info};

use super::declarations::load_declarations;
use super::metadata::PackMetadata;
use super::{Pack, METADATA_FILE, TEMPLATES_DIR, VARIABLES_FILE};
use crate::cache::{PackSource, RegistryCache};
use crate::error::{PackError, Result};
use crate::registry::{PackReference, Pinned};

/// Children loaded concurrently per parent when not configured.
pub const DEFAULT_WORKERS: usize = 4;

static ALIAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Load a pack and all of its dependencies.
pub fn load_pack(reference: &PackReference, cache: &RegistryCache) -> Result<Pack> {
    PackLoader::new(cache).load(reference)
}

/// A pack on the chain currently being loaded.
#[derive(Debug, Clone)]
struct Ancestor {
    identity: String,
    name: String,
}

/// Loads pack trees, fetching registry packs through the cache.
pub struct PackLoader<'a> {
    cache: &'a RegistryCache,
    workers: usize,
}

impl<'a> PackLoader<'a> {
    pub fn new(cache: &'a RegistryCache) -> Self {
        Self {
            cache,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Maximum number of sibling packs loaded at once.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Load the root pack. Its alias is the reference name.
    pub fn load(&self, reference: &PackReference) -> Result<Pack> {
        let alias = reference.name().to_string();
        let pack = self.load_node(reference, &alias, alias.clone(), &[])?;
        info!(
            pack = %pack.path,
            packs = pack.walk().len(),
            "Loaded pack tree"
        );
        Ok(pack)
    }

    fn load_node(
        &self,
        reference: &PackReference,
        alias: &str,
        path: String,
        ancestors: &[Ancestor],
    ) -> Result<Pack> {
        // Pinning has no side effects, so a cycle is caught before anything
        // is written to the cache.
        let pinned = self.cache.resolver().pin(reference)?;
        let identity = match &pinned {
            Pinned::Local(dir) => {
                let canonical = fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
                format!("path:{}", canonical.display())
            }
            Pinned::Remote(key) => format!("registry:{}", key),
        };

        if let Some(start) = ancestors.iter().position(|a| a.identity == identity) {
            let mut names: Vec<&str> = ancestors[start..].iter().map(|a| a.name.as_str()).collect();
            names.push(reference.name());
            return Err(PackError::CyclicDependency {
                cycle: names.join(" -> "),
            });
        }

        let source = match pinned {
            Pinned::Local(dir) => PackSource::Local(dir),
            Pinned::Remote(key) => PackSource::Cached(self.cache.ensure_pinned(&key)?),
        };
        let dir = source.path().to_path_buf();
        debug!(pack = %path, dir = %dir.display(), "Loading pack");

        let metadata = PackMetadata::load(&dir.join(METADATA_FILE))?;
        let variables_file = dir.join(VARIABLES_FILE);
        let variable_specs = if variables_file.is_file() {
            load_declarations(&variables_file, &path)?
        } else {
            Vec::new()
        };
        let template_files = collect_templates(&dir.join(TEMPLATES_DIR))?;

        let mut jobs: BTreeMap<String, PackReference> = BTreeMap::new();
        for dep in metadata.dependencies.iter().filter(|d| d.enabled) {
            let child_alias = dep.alias();
            if !ALIAS.is_match(child_alias) {
                return Err(PackError::LoadParseError {
                    path: dir.join(METADATA_FILE),
                    message: format!("invalid dependency alias '{}'", child_alias),
                });
            }
            if jobs.contains_key(child_alias) {
                return Err(PackError::LoadParseError {
                    path: dir.join(METADATA_FILE),
                    message: format!("dependency alias '{}' is used twice", child_alias),
                });
            }
            jobs.insert(child_alias.to_string(), dep.reference(&dir)?);
        }

        let mut chain = ancestors.to_vec();
        chain.push(Ancestor {
            identity,
            name: reference.name().to_string(),
        });
        let children = self.load_children(&path, &jobs, &chain)?;

        Ok(Pack {
            path,
            alias: alias.to_string(),
            source,
            metadata,
            variable_specs,
            template_files,
            children,
        })
    }

    /// Load siblings in batches of `workers`, keeping alias order.
    fn load_children(
        &self,
        parent_path: &str,
        jobs: &BTreeMap<String, PackReference>,
        chain: &[Ancestor],
    ) -> Result<BTreeMap<String, Pack>> {
        let jobs: Vec<(&String, &PackReference)> = jobs.iter().collect();
        let mut children = BTreeMap::new();

        for batch in jobs.chunks(self.workers) {
            let results: Vec<Result<Pack>> = if batch.len() == 1 {
                let (alias, reference) = batch[0];
                vec![self.load_node(reference, alias, child_path(parent_path, alias), chain)]
            } else {
                std::thread::scope(|s| {
                    let handles: Vec<_> = batch
                        .iter()
                        .map(|&(alias, reference)| {
                            let path = child_path(parent_path, alias);
                            s.spawn(move || self.load_node(reference, alias, path, chain))
                        })
                        .collect();
                    handles
                        .into_iter()
                        .map(|h| {
                            h.join()
                                .unwrap_or_else(|_| Err(anyhow!("pack loader thread panicked").into()))
                        })
                        .collect()
                })
            };

            for (&(alias, _), result) in batch.iter().zip(results) {
                children.insert(alias.clone(), result?);
            }
        }
        Ok(children)
    }
}

fn child_path(parent: &str, alias: &str) -> String {
    format!("{}.{}", parent, alias)
}

fn collect_templates(dir: &Path) -> Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.insert(entry.path());
            }
        }
    }
    Ok(files)
}
