//! Git-backed registries.
//!
//! Refs are resolved with `git ls-remote`, so resolution never writes to
//! disk; they say nothing about whether a pack exists at the ref, which is
//! only checked when fetching. Fetching does a shallow fetch of exactly one ref into a scratch
//! repository, then copies the pack's directory out of the checkout.

use anyhow::{bail, Context};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::reference::LATEST_REF;
use super::source::{RegistryLocation, RegistrySource, RemoteError};

/// Fetches packs from git repositories with the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitRegistry {
    /// Upper bound for every git invocation.
    timeout: Duration,
}

impl GitRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Highest semver tag, or the `HEAD` commit when no tag is a version.
    fn latest(&self, url: &str) -> Result<String, RemoteError> {
        let tags = self.git(None, &["ls-remote", "--tags", "--refs", url])?;
        if let Some(tag) = latest_version_tag(&tags) {
            return Ok(tag);
        }

        let head = self.git(None, &["ls-remote", url, "HEAD"])?;
        first_sha(&head)
            .ok_or_else(|| RemoteError::NotFound(format!("{} has no tags and no HEAD", url)))
    }

    /// Resolve a literal ref to something `git fetch` accepts.
    ///
    /// A full commit SHA is taken as given. Branch and tag names must exist
    /// on the remote. An abbreviated SHA is expanded against the advertised
    /// refs and must match exactly one commit.
    fn resolve_literal(&self, url: &str, git_ref: &str) -> Result<String, RemoteError> {
        if is_full_sha(git_ref) {
            return Ok(git_ref.to_string());
        }

        let candidates = [
            git_ref.to_string(),
            format!("refs/heads/{git_ref}"),
            format!("refs/tags/{git_ref}"),
        ];
        for candidate in &candidates {
            let output = self.git(None, &["ls-remote", url, candidate])?;
            if first_sha(&output).is_some() {
                return Ok(git_ref.to_string());
            }
        }

        if is_short_sha(git_ref) {
            let advertised = self.git(None, &["ls-remote", url])?;
            let matches = shas_with_prefix(&advertised, git_ref);
            match matches.as_slice() {
                [sha] => return Ok(sha.clone()),
                [] => {}
                _ => {
                    return Err(RemoteError::NotFound(format!(
                        "ref '{}' is ambiguous in {}",
                        git_ref, url
                    )))
                }
            }
        }

        Err(RemoteError::NotFound(format!(
            "ref '{}' does not exist in {}",
            git_ref, url
        )))
    }

    /// Scratch repository directory next to `dest`.
    fn work_dir(dest: &Path, url: &str, git_ref: &str) -> PathBuf {
        let hash = Sha256::digest(format!("{}@{}", url, git_ref).as_bytes());
        let name = format!(".git-work-{}", hex::encode(&hash[..8]));
        dest.parent().unwrap_or(dest).join(name)
    }

    fn checkout(&self, work: &Path, url: &str, git_ref: &str) -> Result<(), RemoteError> {
        std::fs::create_dir_all(work)
            .map_err(|e| RemoteError::Unavailable(format!("cannot create {}: {}", work.display(), e)))?;
        self.git(Some(work), &["init", "--quiet"])?;
        self.git(Some(work), &["fetch", "--quiet", "--depth", "1", url, git_ref])?;
        self.git(
            Some(work),
            &["-c", "advice.detachedHead=false", "checkout", "--quiet", "FETCH_HEAD"],
        )?;
        Ok(())
    }

    fn git(&self, dir: Option<&Path>, args: &[&str]) -> Result<String, RemoteError> {
        debug!(?args, "Running git");
        run_with_timeout(dir, args, self.timeout).map_err(|e| RemoteError::Unavailable(format!("{:#}", e)))
    }
}

impl RegistrySource for GitRegistry {
    fn resolve_ref(
        &self,
        registry: &RegistryLocation,
        pack: &str,
        git_ref: &str,
    ) -> Result<String, RemoteError> {
        debug!(registry = %registry.name, pack, git_ref, "Resolving ref");
        if git_ref == LATEST_REF {
            self.latest(&registry.url)
        } else {
            self.resolve_literal(&registry.url, git_ref)
        }
    }

    fn fetch(
        &self,
        registry: &RegistryLocation,
        pack: &str,
        resolved_ref: &str,
        dest: &Path,
    ) -> Result<(), RemoteError> {
        info!(registry = %registry.name, pack, git_ref = resolved_ref, "Fetching pack");

        let work = Self::work_dir(dest, &registry.url, resolved_ref);
        let _ = std::fs::remove_dir_all(&work);

        let result = self.checkout(&work, &registry.url, resolved_ref).and_then(|()| {
            let pack_dir = work.join(&registry.packs_dir).join(pack);
            if !pack_dir.is_dir() {
                return Err(RemoteError::NotFound(format!(
                    "pack '{}' not found under '{}' at {}",
                    pack, registry.packs_dir, resolved_ref
                )));
            }
            copy_dir(&pack_dir, dest)
                .map_err(|e| RemoteError::Unavailable(format!("copying pack files: {:#}", e)))
        });

        let _ = std::fs::remove_dir_all(&work);
        result
    }
}

/// Run git, killing it if it outlives `timeout`.
fn run_with_timeout(dir: Option<&Path>, args: &[&str], timeout: Duration) -> anyhow::Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().context("Failed to run git")?;

    // Drain pipes on threads so a chatty git cannot block on a full buffer.
    let mut stdout = child.stdout.take().context("git stdout not captured")?;
    let mut stderr = child.stderr.take().context("git stderr not captured")?;
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stdout.read_to_string(&mut buf);
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            bail!("git {} timed out after {}s", args.join(" "), timeout.as_secs());
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    let out = stdout_handle.join().unwrap_or_default();
    let err = stderr_handle.join().unwrap_or_default();

    if !status.success() {
        bail!("git {} failed: {}", args.join(" "), err.trim());
    }
    Ok(out)
}

fn copy_dir(from: &Path, to: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(to).with_context(|| format!("Failed to create {}", to.display()))?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            copy_dir(&entry.path(), &target)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn first_sha(ls_remote: &str) -> Option<String> {
    ls_remote
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string)
}

/// Pick the highest semver tag from `git ls-remote --tags` output.
fn latest_version_tag(ls_remote: &str) -> Option<String> {
    ls_remote
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|refname| refname.strip_prefix("refs/tags/"))
        .filter_map(|tag| {
            let version = tag.strip_prefix('v').unwrap_or(tag);
            semver::Version::parse(version)
                .ok()
                .map(|v| (v, tag.to_string()))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, tag)| tag)
}

/// Distinct commits among the advertised refs whose SHA starts with `prefix`.
fn shas_with_prefix(ls_remote: &str, prefix: &str) -> Vec<String> {
    let prefix = prefix.to_ascii_lowercase();
    let mut shas: Vec<String> = ls_remote
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|sha| sha.starts_with(&prefix))
        .map(str::to_string)
        .collect();
    shas.sort();
    shas.dedup();
    shas
}

fn is_hex(git_ref: &str) -> bool {
    git_ref.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_full_sha(git_ref: &str) -> bool {
    git_ref.len() == 40 && is_hex(git_ref)
}

fn is_short_sha(git_ref: &str) -> bool {
    (7..40).contains(&git_ref.len()) && is_hex(git_ref)
}
