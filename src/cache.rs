//! Content-addressed snapshots of the staging tree, keyed by the
//! accumulated fingerprint. Backed by a bare `git2` repository: branch tip
//! and parent chain play the role the original's OSTree commit graph did,
//! with each commit's subject line holding the cumulative digest hex.

use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::digest::Fingerprint;
use crate::error::{Error, Result};

const TREE_MODE: i32 = 0o040000;
const SYMLINK_MODE: i32 = 0o120000;
const EXEC_MODE: i32 = 0o100755;
const FILE_MODE: i32 = 0o100644;

/// Advisory lock file at `<base>/.buildcache/lock`, removed on drop. The
/// core assumes single-process access; this is not a distributed lock.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(path: PathBuf) -> Result<Self> {
        File::options().write(true).create_new(true).open(&path).map_err(|e| Error::io(e, &path))?;
        Ok(Self { path })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// `FRESH -> (HIT)* -> MISS -> (MISS)*`. Once `lookup` misses, `disabled`
/// latches and every later `lookup` call misses too, without touching the
/// repository again.
pub struct Cache {
    repo: git2::Repository,
    branch: String,
    fingerprint: RefCell<Fingerprint>,
    last_parent: RefCell<Option<git2::Oid>>,
    staging_dir: RefCell<Option<PathBuf>>,
    disabled: Cell<bool>,
    _lock: LockFile,
}

impl Cache {
    /// Creates the bare repository at `cache_dir` if absent, then opens it.
    pub fn open(cache_dir: &Path, branch: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(cache_dir).map_err(|e| Error::io(e, cache_dir))?;
        let lock = LockFile::acquire(cache_dir.join("lock"))?;

        let repo = if cache_dir.join("HEAD").exists() {
            git2::Repository::open_bare(cache_dir)?
        } else {
            git2::Repository::init_bare(cache_dir)?
        };

        Ok(Self {
            repo,
            branch: branch.into(),
            fingerprint: RefCell::new(Fingerprint::new()),
            last_parent: RefCell::new(None),
            staging_dir: RefCell::new(None),
            disabled: Cell::new(false),
            _lock: lock,
        })
    }

    fn refname(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    /// Yields the running digest accumulator for callers to extend with
    /// manifest- and module-level contributions.
    pub fn checksum(&self) -> std::cell::RefMut<'_, Fingerprint> {
        self.fingerprint.borrow_mut()
    }

    fn current_hex(&self) -> String {
        self.fingerprint.borrow().clone().finish_hex()
    }

    /// Searches the branch's commit chain for a commit whose subject equals
    /// the current accumulator hex. On miss, checks out the last known
    /// matching ancestor (if any) into `staging_dir` and permanently
    /// disables further lookups.
    pub fn lookup(&self, staging_dir: &Path) -> Result<bool> {
        if self.disabled.get() {
            return Ok(false);
        }

        *self.staging_dir.borrow_mut() = Some(staging_dir.to_path_buf());
        let current = self.current_hex();

        let mut walk =
            self.repo.find_reference(&self.refname()).and_then(|r| r.peel_to_commit()).ok();

        while let Some(commit) = walk {
            if commit.summary() == Some(current.as_str()) {
                *self.last_parent.borrow_mut() = Some(commit.id());
                debug!(commit = %commit.id(), "cache hit");
                return Ok(true);
            }
            walk = commit.parent(0).ok();
        }

        if let Some(parent) = *self.last_parent.borrow() {
            info!("cache miss, checking out last cache hit");
            self.checkout(parent, staging_dir)?;
        }

        self.disabled.set(true);
        Ok(false)
    }

    fn checkout(&self, commit_oid: git2::Oid, staging_dir: &Path) -> Result<()> {
        let commit = self.repo.find_commit(commit_oid)?;
        let tree = commit.tree()?;
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.target_dir(staging_dir).remove_untracked(true).force();
        self.repo.checkout_tree(tree.as_object(), Some(&mut checkout))?;
        Ok(())
    }

    /// Snapshots `staging_dir` and creates a new commit parented on the last
    /// matching ancestor (or rootless), subject = current accumulator hex,
    /// body = `body`. Advances the branch and updates "last parent".
    pub fn commit(&self, staging_dir: &Path, body: &str) -> Result<()> {
        let current = self.current_hex();
        let tree_oid = write_tree(&self.repo, staging_dir)?;
        let tree = self.repo.find_tree(tree_oid)?;

        let parent_oid = *self.last_parent.borrow();
        let parent_commit = parent_oid.map(|oid| self.repo.find_commit(oid)).transpose()?;
        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

        let sig = git2::Signature::now("bundle-builder", "bundle-builder@localhost")?;
        let message = format!("{current}\n\n{body}");

        let commit_oid = self.repo.commit(None, &sig, &sig, &message, &tree, &parents)?;
        self.repo.reference(&self.refname(), commit_oid, true, "cache commit")?;

        *self.last_parent.borrow_mut() = Some(commit_oid);
        debug!(commit = %commit_oid, "cache commit");
        Ok(())
    }

    /// Forces every subsequent `lookup` to return miss without checking
    /// anything out, used to force a rebuild without discarding the
    /// already-accumulated digest and parent chain.
    pub fn disable_lookups(&self) {
        self.disabled.set(true);
    }
}

/// Recursively builds a tree object mirroring `dir`, symlinks and the
/// executable bit preserved, extended attributes never read.
fn write_tree(repo: &git2::Repository, dir: &Path) -> Result<git2::Oid> {
    let mut builder = repo.treebuilder(None)?;

    let mut entries: Vec<_> =
        fs::read_dir(dir).map_err(|e| Error::io(e, dir))?.collect::<std::io::Result<_>>().map_err(|e| Error::io(e, dir))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        let file_type = entry.file_type().map_err(|e| Error::io(e, &path))?;

        if file_type.is_symlink() {
            let target = fs::read_link(&path).map_err(|e| Error::io(e, &path))?;
            let oid = repo.blob(target.to_string_lossy().as_bytes())?;
            builder.insert(&name, oid, SYMLINK_MODE)?;
        } else if file_type.is_dir() {
            let sub_oid = write_tree(repo, &path)?;
            builder.insert(&name, sub_oid, TREE_MODE)?;
        } else {
            let meta = entry.metadata().map_err(|e| Error::io(e, &path))?;
            let mode = if meta.permissions().mode() & 0o111 != 0 { EXEC_MODE } else { FILE_MODE };
            let oid = repo.blob_path(&path)?;
            builder.insert(&name, oid, mode)?;
        }
    }

    Ok(builder.write()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_cache_misses_and_first_commit_then_hits() {
        let base = tempdir().unwrap();
        let staging = tempdir().unwrap();
        fs::write(staging.path().join("file.txt"), b"hello").unwrap();

        let cache = Cache::open(&base.path().join(".buildcache"), "manifest").unwrap();
        cache.checksum().string(Some("v1"));
        assert!(!cache.lookup(staging.path()).unwrap());
        cache.commit(staging.path(), "Initialized").unwrap();

        let cache2 = Cache::open(&base.path().join(".buildcache"), "manifest").unwrap();
        cache2.checksum().string(Some("v1"));
        assert!(cache2.lookup(staging.path()).unwrap());
    }

    #[test]
    fn disable_lookups_forces_miss() {
        let base = tempdir().unwrap();
        let staging = tempdir().unwrap();
        fs::write(staging.path().join("file.txt"), b"hello").unwrap();

        let cache = Cache::open(&base.path().join(".buildcache"), "manifest").unwrap();
        cache.checksum().string(Some("v1"));
        cache.commit(staging.path(), "Initialized").unwrap();

        let cache2 = Cache::open(&base.path().join(".buildcache"), "manifest").unwrap();
        cache2.checksum().string(Some("v1"));
        cache2.disable_lookups();
        assert!(!cache2.lookup(staging.path()).unwrap());
    }
}
