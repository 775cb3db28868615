//! Working copy discovery
//!
//! Locates the working tree that contains a directory and gives access to its
//! configuration and shelf store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::Repository;
use thiserror::Error;

use super::{Config, GitShelfStore};

#[derive(Debug, Error)]
pub enum WorkingCopyError {
    #[error("'{0}' is not inside a working copy")]
    NotInWorkingCopy(PathBuf),

    #[error("Repository at {0} has no working tree")]
    Bare(PathBuf),
}

/// A working tree with shelving support
pub struct WorkingCopy {
    root: PathBuf,
    config: Config,
}

impl WorkingCopy {
    /// Opens the working copy containing `start` (or `start` itself)
    pub fn discover(start: &Path) -> Result<Self> {
        let repo = Repository::discover(start)
            .map_err(|_| WorkingCopyError::NotInWorkingCopy(start.to_path_buf()))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| WorkingCopyError::Bare(repo.path().to_path_buf()))?;

        let root = fs::canonicalize(workdir)
            .with_context(|| format!("Failed to resolve working copy root: {}", workdir.display()))?;

        let config = Config::for_working_copy(&root)?;

        Ok(Self { root, config })
    }

    /// Returns the working copy root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens the shelf store for this working copy
    pub fn store(&self) -> Result<GitShelfStore> {
        GitShelfStore::open(&self.root, self.config.working_copy.clone())
    }
}
