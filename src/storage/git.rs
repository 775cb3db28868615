//! Git-backed shelf storage
//!
//! Shelves live in `<git-dir>/shelves/`:
//! - `<name>.patch` holds a unified diff of the shelved edits against `HEAD`
//! - `<name>.log` holds the shelf message (absent when empty)
//! - `.lock` is locked exclusively while a shelf is written or removed
//!
//! Only tracked changes are shelved: modified, deleted and staged-added files.
//! All writes are atomic (temp file + rename).

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use git2::{
    ApplyLocation, ApplyOptions, Delta, Diff, DiffFormat, DiffOptions, ErrorCode, Index,
    Repository, Tree,
};
use thiserror::Error;

use super::config::WorkingCopyConfig;
use super::engine::{Notification, Notify, NotifyAction, ShelfStore, ShelveRequest};
use crate::domain::{normalize, ShelfInfo, ShelfName, PATCH_SUFFIX};

#[derive(Debug, Error)]
pub enum GitStoreError {
    #[error("Shelved change '{0}' not found")]
    NotFound(ShelfName),

    #[error("No local modifications found in the given targets")]
    NoChanges,

    #[error("'{0}' is not inside the working copy")]
    OutsideWorkingCopy(PathBuf),

    #[error("Repository at {0} has no working tree")]
    Bare(PathBuf),
}

/// A locally modified path selected for shelving
#[derive(Debug, Clone, PartialEq, Eq)]
struct Change {
    path: PathBuf,
    status: Delta,
}

/// Shelf storage inside a git repository
pub struct GitShelfStore {
    repo: Repository,
    root: PathBuf,
    dir: PathBuf,
    config: WorkingCopyConfig,
}

impl GitShelfStore {
    /// Opens the store for the working tree rooted at `root`
    pub fn open(root: &Path, config: WorkingCopyConfig) -> Result<Self> {
        let repo = Repository::open(root)
            .with_context(|| format!("Failed to open repository: {}", root.display()))?;

        if repo.workdir().is_none() {
            return Err(GitStoreError::Bare(root.to_path_buf()).into());
        }

        let dir = repo.path().join("shelves");

        Ok(Self {
            repo,
            root: root.to_path_buf(),
            dir,
            config,
        })
    }

    /// Returns the directory holding shelf artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn patch_path(&self, name: &ShelfName) -> PathBuf {
        self.dir.join(name.patch_file_name())
    }

    fn log_path(&self, name: &ShelfName) -> PathBuf {
        self.dir.join(name.log_file_name())
    }

    /// Acquires the store lock; it is released when the file is dropped
    fn lock(&self, exclusive: bool) -> Result<File> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let lock_path = self.dir.join(".lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            file.lock_shared()
        };
        locked.context("Failed to acquire lock on shelf store")?;

        Ok(file)
    }

    /// Converts an absolute target into a path relative to the root
    fn relative(&self, target: &Path) -> Result<PathBuf> {
        let target = normalize(target);
        target
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| GitStoreError::OutsideWorkingCopy(target.clone()).into())
    }

    /// Returns the `HEAD` tree, or `None` on an unborn branch
    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree().context("Failed to read HEAD tree")?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e).context("Failed to resolve HEAD"),
        }
    }

    /// Diffs `HEAD` against the working tree (through the index).
    ///
    /// With `exact`, pathspecs are literal paths instead of patterns and
    /// binary files carry their full content.
    fn diff_against_head(&self, pathspecs: &[PathBuf], exact: bool) -> Result<Diff<'_>> {
        let head_tree = self.head_tree()?;

        let mut opts = DiffOptions::new();
        opts.disable_pathspec_match(exact).show_binary(exact);
        for spec in pathspecs {
            opts.pathspec(spec.as_path());
        }

        self.repo
            .diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))
            .context("Failed to compute local modifications")
    }

    /// Collects tracked changes under the request's targets
    fn select_changes(&self, request: &ShelveRequest<'_>) -> Result<Vec<Change>> {
        let targets = request
            .targets
            .iter()
            .map(|t| self.relative(t))
            .collect::<Result<Vec<_>>>()?;

        // An empty relative target is the root; pathspecs would only narrow it
        let pathspecs: Vec<PathBuf> = if targets.iter().any(|t| t.as_os_str().is_empty()) {
            Vec::new()
        } else {
            targets.clone()
        };

        let diff = self.diff_against_head(&pathspecs, false)?;
        let mut changes = Vec::new();

        for delta in diff.deltas() {
            let status = delta.status();
            if !matches!(
                status,
                Delta::Modified | Delta::Added | Delta::Deleted | Delta::Typechange
            ) {
                continue;
            }

            let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) else {
                continue;
            };

            if !targets.iter().any(|t| request.depth.covers(t, path)) {
                continue;
            }

            if !request.changelists.is_empty()
                && !self.config.in_changelists(request.changelists, path)
            {
                continue;
            }

            changes.push(Change {
                path: path.to_path_buf(),
                status,
            });
        }

        Ok(changes)
    }

    /// Renders the selected changes as a unified diff
    fn render_patch(&self, changes: &[Change]) -> Result<Vec<u8>> {
        let paths: Vec<PathBuf> = changes.iter().map(|c| c.path.clone()).collect();
        let diff = self.diff_against_head(&paths, true)?;

        let mut patch = Vec::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin() as u8);
            }
            patch.extend_from_slice(line.content());
            true
        })
        .context("Failed to render patch")?;

        Ok(patch)
    }

    /// Restores shelved paths to their `HEAD` state.
    ///
    /// Paths are handled one by one as literal paths, never as patterns.
    fn revert(&self, changes: &[Change], notify: &dyn Notify) -> Result<()> {
        let mut index = self.repo.index().context("Failed to open index")?;
        let head_tree = self.head_tree()?;

        for change in changes {
            if change.status == Delta::Added {
                index
                    .remove_path(&change.path)
                    .with_context(|| format!("Failed to unstage {}", change.path.display()))?;

                let abs = self.root.join(&change.path);
                if abs.symlink_metadata().is_ok() {
                    fs::remove_file(&abs)
                        .with_context(|| format!("Failed to remove {}", abs.display()))?;
                }
            } else {
                let tree = head_tree
                    .as_ref()
                    .context("HEAD has no tree to restore shelved paths from")?;
                self.restore_from_head(&mut index, tree, &change.path)?;
            }
        }

        index.write().context("Failed to write index")?;

        for change in changes {
            notify.notify(&Notification::new(NotifyAction::Reverted, &change.path));
        }

        Ok(())
    }

    /// Rewrites one path in the working tree and index from its `HEAD` blob
    fn restore_from_head(&self, index: &mut Index, tree: &Tree<'_>, path: &Path) -> Result<()> {
        let entry = tree
            .get_path(path)
            .with_context(|| format!("{} is not in HEAD", path.display()))?;
        let blob = self
            .repo
            .find_blob(entry.id())
            .with_context(|| format!("Failed to read HEAD content of {}", path.display()))?;

        let abs = self.root.join(path);
        if abs.symlink_metadata().is_ok() {
            fs::remove_file(&abs).with_context(|| format!("Failed to remove {}", abs.display()))?;
        }
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        write_blob(&abs, blob.content(), entry.filemode())
            .with_context(|| format!("Failed to restore {}", abs.display()))?;

        index
            .add_path(path)
            .with_context(|| format!("Failed to stage {}", path.display()))
    }

    fn remove_artifacts(&self, name: &ShelfName) -> Result<()> {
        let patch_path = self.patch_path(name);
        fs::remove_file(&patch_path)
            .with_context(|| format!("Failed to remove {}", patch_path.display()))?;

        let log_path = self.log_path(name);
        if log_path.exists() {
            fs::remove_file(&log_path)
                .with_context(|| format!("Failed to remove {}", log_path.display()))?;
        }

        Ok(())
    }
}

const MODE_EXECUTABLE: i32 = 0o100755;
const MODE_SYMLINK: i32 = 0o120000;

#[cfg(unix)]
fn write_blob(path: &Path, content: &[u8], mode: i32) -> std::io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::PermissionsExt;

    if mode == MODE_SYMLINK {
        return std::os::unix::fs::symlink(std::ffi::OsStr::from_bytes(content), path);
    }

    fs::write(path, content)?;
    if mode == MODE_EXECUTABLE {
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn write_blob(path: &Path, content: &[u8], _mode: i32) -> std::io::Result<()> {
    fs::write(path, content)
}

/// Writes a file atomically (temp file + rename)
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })
}

impl ShelfStore for GitShelfStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn enumerate(&self) -> Result<HashMap<String, ShelfInfo>> {
        let mut shelves = HashMap::new();

        if !self.dir.is_dir() {
            return Ok(shelves);
        }

        let _lock = self.lock(false)?;

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?
        {
            let entry = entry.context("Failed to read directory entry")?;
            let artifact = entry.file_name().to_string_lossy().into_owned();

            if !artifact.ends_with(PATCH_SUFFIX) {
                continue;
            }

            let patch_path = entry.path();
            let meta = entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", patch_path.display()))?;
            let modified = meta
                .modified()
                .with_context(|| format!("Failed to read mtime of {}", patch_path.display()))?;

            let message = fs::read_to_string(patch_path.with_extension("log")).unwrap_or_default();

            shelves.insert(
                artifact,
                ShelfInfo {
                    patch_path,
                    modified: DateTime::<Utc>::from(modified),
                    message,
                    size_bytes: meta.len(),
                },
            );
        }

        Ok(shelves)
    }

    fn create_or_update(&self, request: &ShelveRequest<'_>, notify: &dyn Notify) -> Result<()> {
        let changes = self.select_changes(request)?;
        if changes.is_empty() {
            return Err(GitStoreError::NoChanges.into());
        }

        if request.dry_run {
            for change in &changes {
                notify.notify(&Notification::new(NotifyAction::WouldShelve, &change.path));
            }
            return Ok(());
        }

        let patch = self.render_patch(&changes)?;
        let _lock = self.lock(true)?;

        write_atomic(&self.patch_path(request.name), &patch)?;

        let log_path = self.log_path(request.name);
        match request.message.filter(|m| !m.is_empty()) {
            Some(message) => write_atomic(&log_path, message.as_bytes())?,
            None if log_path.exists() => fs::remove_file(&log_path)
                .with_context(|| format!("Failed to remove {}", log_path.display()))?,
            None => {}
        }

        for change in &changes {
            notify.notify(&Notification::new(NotifyAction::Shelved, &change.path));
        }

        if !request.keep_local {
            self.revert(&changes, notify)?;
        }

        Ok(())
    }

    fn apply(
        &self,
        name: &ShelfName,
        keep_local: bool,
        dry_run: bool,
        notify: &dyn Notify,
    ) -> Result<()> {
        let patch_path = self.patch_path(name);
        if !patch_path.is_file() {
            return Err(GitStoreError::NotFound(name.clone()).into());
        }

        let _lock = self.lock(true)?;

        let patch = fs::read(&patch_path)
            .with_context(|| format!("Failed to read {}", patch_path.display()))?;
        let diff = Diff::from_buffer(&patch)
            .with_context(|| format!("Failed to parse {}", patch_path.display()))?;

        let mut opts = ApplyOptions::new();
        opts.check(dry_run);
        self.repo
            .apply(&diff, ApplyLocation::Both, Some(&mut opts))
            .with_context(|| format!("Failed to apply shelved change '{}'", name))?;

        let action = if dry_run {
            NotifyAction::WouldApply
        } else {
            NotifyAction::Applied
        };
        for delta in diff.deltas() {
            if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                notify.notify(&Notification::new(action, path));
            }
        }

        if !keep_local && !dry_run {
            self.remove_artifacts(name)?;
        }

        Ok(())
    }

    fn delete(&self, name: &ShelfName, dry_run: bool) -> Result<()> {
        if !self.patch_path(name).is_file() {
            return Err(GitStoreError::NotFound(name.clone()).into());
        }

        if dry_run {
            return Ok(());
        }

        let _lock = self.lock(true)?;
        self.remove_artifacts(name)
    }
}
