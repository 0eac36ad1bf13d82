//! On-disk registry cache.

use anyhow::anyhow;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::entry::{CacheEntry, CacheKey};
use crate::error::{PackError, Result};
use crate::registry::reference::remote_error;
use crate::registry::{PackReference, Pinned, ReferenceResolver};

/// Sidecar written next to the pack files of every entry.
pub const ENTRY_FILE: &str = ".packwright-entry.json";

/// Scratch area for in-flight fetches, skipped when listing.
const STAGING_DIR: &str = ".staging";

/// Where a resolved pack lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackSource {
    /// Local directory, used in place and never cached.
    Local(PathBuf),
    /// Pinned registry entry.
    Cached(CacheEntry),
}

impl PackSource {
    pub fn path(&self) -> &Path {
        match self {
            PackSource::Local(path) => path,
            PackSource::Cached(entry) => &entry.local_path,
        }
    }
}

/// Local store of pack trees fetched from registries.
///
/// Entries are keyed by [`CacheKey`] and laid out as
/// `<root>/<registry>/<pack>/<resolved-ref>/`. Nothing is evicted
/// automatically.
pub struct RegistryCache {
    root: PathBuf,
    resolver: ReferenceResolver,
    /// One lock per key so a cold key is fetched once.
    locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl RegistryCache {
    pub fn new(root: impl Into<PathBuf>, resolver: ReferenceResolver) -> Self {
        Self {
            root: root.into(),
            resolver,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Make sure a registry pack is present, fetching it on a miss.
    ///
    /// Idempotent: a second call for the same resolved ref returns the
    /// existing entry without touching the remote's fetch path. A failed
    /// fetch leaves nothing behind, so the same call can simply be retried.
    pub fn ensure(&self, reference: &PackReference) -> Result<CacheEntry> {
        match self.resolver.pin(reference)? {
            Pinned::Remote(key) => self.ensure_pinned(&key),
            Pinned::Local(path) => Err(PackError::InvalidReference {
                message: format!("{} is a local pack and is never cached", path.display()),
            }),
        }
    }

    /// Whether the reference resolves: a local directory, or a configured
    /// registry with an existing ref. Never writes to the cache.
    ///
    /// A pack missing from an existing ref passes here and is reported as
    /// not found by [`ensure`](Self::ensure).
    pub fn verify(&self, reference: &PackReference) -> bool {
        match self.check(reference) {
            Ok(()) => true,
            Err(e) => {
                debug!(%reference, error = %e, "Pack verification failed");
                false
            }
        }
    }

    /// Like [`verify`](Self::verify), but reports why a pack is unavailable.
    pub fn check(&self, reference: &PackReference) -> Result<()> {
        match self.resolver.pin(reference)? {
            Pinned::Local(_) => Ok(()),
            Pinned::Remote(key) => {
                if self.lookup(&key)?.is_some() {
                    debug!(%key, "Pack already cached");
                }
                Ok(())
            }
        }
    }

    /// Existing entry for a key, if present and intact.
    pub fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let sidecar = key.dir(&self.root).join(ENTRY_FILE);
        if !sidecar.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(&sidecar)?;
        match serde_json::from_str::<CacheEntry>(&json) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(%key, error = %e, "Ignoring unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// `(registry, pack)` pairs present in the cache, sorted and de-duplicated.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let mut packs = BTreeSet::new();
        for registry in visible_dirs(&self.root)? {
            for pack in visible_dirs(&registry)? {
                packs.insert((file_name(&registry), file_name(&pack)));
            }
        }
        Ok(packs.into_iter().collect())
    }

    /// Every intact entry, sorted by key.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for registry in visible_dirs(&self.root)? {
            for pack in visible_dirs(&registry)? {
                for version in visible_dirs(&pack)? {
                    let sidecar = version.join(ENTRY_FILE);
                    if let Ok(json) = fs::read_to_string(&sidecar) {
                        if let Ok(entry) = serde_json::from_str::<CacheEntry>(&json) {
                            entries.push(entry);
                        }
                    }
                }
            }
        }
        entries.sort_by_key(CacheEntry::key);
        Ok(entries)
    }

    /// Remove one pinned entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        let lock = self.key_lock(key)?;
        let _guard = lock.lock().map_err(|_| anyhow!("cache lock poisoned"))?;

        let dir = key.dir(&self.root);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!(%key, "Invalidated cache entry");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn key_lock(&self, key: &CacheKey) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| anyhow!("cache lock table poisoned"))?;
        Ok(locks.entry(key.clone()).or_default().clone())
    }

    /// Ensure an already pinned key is present, fetching it on a miss.
    pub fn ensure_pinned(&self, key: &CacheKey) -> Result<CacheEntry> {
        let lock = self.key_lock(key)?;
        let _guard = lock.lock().map_err(|_| anyhow!("cache lock poisoned"))?;

        if let Some(entry) = self.lookup(key)? {
            debug!(%key, "Cache hit");
            return Ok(entry);
        }

        let location = self
            .resolver
            .registries()
            .get(&key.registry)
            .ok_or_else(|| PackError::NotFound {
                what: format!("registry '{}' is not configured", key.registry),
            })?;

        let staging = self.staging_dir(key);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        if let Some(parent) = staging.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Err(e) = self
            .resolver
            .remote()
            .fetch(location, &key.pack, &key.resolved_ref, &staging)
        {
            let _ = fs::remove_dir_all(&staging);
            return Err(remote_error(&key.registry, &key.pack, &key.resolved_ref, e));
        }

        match self.commit(key, &staging) {
            Ok(entry) => {
                info!(%key, path = %entry.local_path.display(), "Cached pack");
                Ok(entry)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                Err(e)
            }
        }
    }

    /// Move a completed fetch into place and write its sidecar.
    fn commit(&self, key: &CacheKey, staging: &Path) -> Result<CacheEntry> {
        let dir = key.dir(&self.root);
        let entry = CacheEntry::new(key, &dir);
        let json = serde_json::to_string_pretty(&entry).map_err(anyhow::Error::from)?;
        fs::write(staging.join(ENTRY_FILE), json)?;

        if dir.exists() {
            // Left over from an interrupted run; it has no sidecar.
            fs::remove_dir_all(&dir)?;
        }
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(staging, &dir)?;
        Ok(entry)
    }

    fn staging_dir(&self, key: &CacheKey) -> PathBuf {
        let hash = Sha256::digest(key.to_string().as_bytes());
        self.root.join(STAGING_DIR).join(format!(
            "{}-{}",
            hex::encode(&hash[..8]),
            std::process::id()
        ))
    }
}

fn visible_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && !entry.file_name().to_string_lossy().starts_with('.') {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RegistryConfig, RegistryLocation, Registries, RegistrySource, RemoteError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Remote with a fixed `latest` that counts fetches.
    struct FakeRemote {
        latest: Mutex<String>,
        fetches: AtomicUsize,
        fail_fetch: bool,
        delay: Duration,
    }

    impl FakeRemote {
        fn new(latest: &str) -> Self {
            Self {
                latest: Mutex::new(latest.to_string()),
                fetches: AtomicUsize::new(0),
                fail_fetch: false,
                delay: Duration::ZERO,
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl RegistrySource for FakeRemote {
        fn resolve_ref(
            &self,
            _registry: &RegistryLocation,
            pack: &str,
            git_ref: &str,
        ) -> std::result::Result<String, RemoteError> {
            if pack == "missing" {
                return Err(RemoteError::NotFound(format!("no pack {}", pack)));
            }
            if git_ref == "latest" {
                Ok(self.latest.lock().unwrap().clone())
            } else {
                Ok(git_ref.to_string())
            }
        }

        fn fetch(
            &self,
            _registry: &RegistryLocation,
            pack: &str,
            resolved_ref: &str,
            dest: &Path,
        ) -> std::result::Result<(), RemoteError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if pack == "absent" {
                return Err(RemoteError::NotFound(format!("pack {} not in registry", pack)));
            }
            std::thread::sleep(self.delay);
            fs::create_dir_all(dest).unwrap();
            if self.fail_fetch {
                fs::write(dest.join("partial"), "x").unwrap();
                return Err(RemoteError::Unavailable("connection reset".into()));
            }
            fs::write(
                dest.join("metadata.yaml"),
                format!("pack:\n  name: {}\n  version: {}\n", pack, resolved_ref),
            )
            .unwrap();
            Ok(())
        }
    }

    fn cache_with(root: &Path, remote: Arc<FakeRemote>) -> RegistryCache {
        let mut registries = Registries::new();
        registries.insert(
            "default",
            RegistryConfig {
                url: "https://example.com/packs.git".into(),
                packs_dir: "packs".into(),
            },
        );
        RegistryCache::new(root, ReferenceResolver::new(registries, remote))
    }

    #[test]
    fn ensure_fetches_once() {
        let temp = TempDir::new().unwrap();
        let remote = Arc::new(FakeRemote::new("v1.0.0"));
        let cache = cache_with(temp.path(), remote.clone());
        let reference = PackReference::registry("redis");

        let first = cache.ensure(&reference).unwrap();
        let second = cache.ensure(&reference).unwrap();

        assert_eq!(remote.fetches(), 1);
        assert_eq!(first, second);
        assert_eq!(first.resolved_ref, "v1.0.0");
        assert_eq!(
            first.local_path,
            temp.path().join("default").join("redis").join("v1.0.0")
        );
        assert!(first.local_path.join("metadata.yaml").is_file());
    }

    #[test]
    fn new_latest_creates_independent_entry() {
        let temp = TempDir::new().unwrap();
        let remote = Arc::new(FakeRemote::new("v1.0.0"));
        let cache = cache_with(temp.path(), remote.clone());
        let reference = PackReference::registry("redis");

        let old = cache.ensure(&reference).unwrap();
        *remote.latest.lock().unwrap() = "v1.1.0".to_string();
        let new = cache.ensure(&reference).unwrap();

        assert_eq!(remote.fetches(), 2);
        assert_ne!(old.local_path, new.local_path);
        assert!(old.local_path.exists());
        assert_eq!(cache.entries().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_ensure_for_same_key_fetches_once() {
        let temp = TempDir::new().unwrap();
        let mut fake = FakeRemote::new("v1.0.0");
        fake.delay = Duration::from_millis(50);
        let remote = Arc::new(fake);
        let cache = cache_with(temp.path(), remote.clone());
        let reference = PackReference::registry("redis");

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| cache.ensure(&reference))).collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        assert_eq!(remote.fetches(), 1);
    }

    #[test]
    fn failed_fetch_leaves_no_entry_and_is_retryable() {
        let temp = TempDir::new().unwrap();
        let mut fake = FakeRemote::new("v1.0.0");
        fake.fail_fetch = true;
        let cache = cache_with(temp.path(), Arc::new(fake));
        let reference = PackReference::registry("redis");

        let err = cache.ensure(&reference).unwrap_err();
        assert!(err.is_retryable());
        assert!(cache.entries().unwrap().is_empty());
        assert!(cache.list().unwrap().is_empty());
        assert!(!temp.path().join("default").join("redis").join("v1.0.0").exists());
    }

    #[test]
    fn verify_does_not_touch_disk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("cache");
        let remote = Arc::new(FakeRemote::new("v1.0.0"));
        let cache = cache_with(&root, remote.clone());

        assert!(cache.verify(&PackReference::registry("redis")));
        assert!(!cache.verify(&PackReference::registry("missing")));
        assert!(!cache.verify(&PackReference::registry("redis").with_registry("nowhere")));
        assert!(!root.exists());
        assert_eq!(remote.fetches(), 0);
    }

    #[test]
    fn pack_missing_at_ref_fails_on_ensure() {
        let temp = TempDir::new().unwrap();
        let cache = cache_with(temp.path(), Arc::new(FakeRemote::new("v1.0.0")));
        let reference = PackReference::registry("absent");

        // The ref resolves; the pack itself is only looked for when fetched.
        assert!(cache.verify(&reference));
        let err = cache.ensure(&reference).unwrap_err();
        assert!(matches!(err, PackError::NotFound { .. }));
        assert!(!err.is_retryable());
        assert!(cache.entries().unwrap().is_empty());
    }

    #[test]
    fn check_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let cache = cache_with(temp.path(), Arc::new(FakeRemote::new("v1.0.0")));
        let err = cache.check(&PackReference::registry("missing")).unwrap_err();
        assert!(matches!(err, PackError::NotFound { .. }));
    }

    #[test]
    fn list_returns_registry_pack_pairs() {
        let temp = TempDir::new().unwrap();
        let cache = cache_with(temp.path(), Arc::new(FakeRemote::new("v1.0.0")));
        cache.ensure(&PackReference::registry("redis")).unwrap();
        cache
            .ensure(&PackReference::registry("redis").with_ref("v0.9.0"))
            .unwrap();
        cache.ensure(&PackReference::registry("nginx")).unwrap();

        assert_eq!(
            cache.list().unwrap(),
            vec![
                ("default".to_string(), "nginx".to_string()),
                ("default".to_string(), "redis".to_string()),
            ]
        );
    }

    #[test]
    fn invalidate_removes_entry_and_next_ensure_refetches() {
        let temp = TempDir::new().unwrap();
        let remote = Arc::new(FakeRemote::new("v1.0.0"));
        let cache = cache_with(temp.path(), remote.clone());
        let reference = PackReference::registry("redis");

        let entry = cache.ensure(&reference).unwrap();
        assert!(cache.invalidate(&entry.key()).unwrap());
        assert!(!cache.invalidate(&entry.key()).unwrap());

        cache.ensure(&reference).unwrap();
        assert_eq!(remote.fetches(), 2);
    }

    #[test]
    fn ensure_rejects_local_references() {
        let temp = TempDir::new().unwrap();
        let pack = temp.path().join("web");
        fs::create_dir_all(&pack).unwrap();
        fs::write(pack.join("metadata.yaml"), "pack:\n  name: web\n").unwrap();
        let cache = cache_with(&temp.path().join("cache"), Arc::new(FakeRemote::new("v1")));

        let reference = PackReference::local(&pack);
        assert!(matches!(
            cache.ensure(&reference),
            Err(PackError::InvalidReference { .. })
        ));
        assert!(cache.verify(&reference));
    }
}
