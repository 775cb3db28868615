//! The storage engine seam
//!
//! Commands talk to shelf storage only through [`ShelfStore`]. Progress is
//! reported through an explicit [`Notify`] argument on every call; quiet
//! runs pass [`NoopNotifier`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::{Depth, ShelfInfo, ShelfName};

/// What happened to a path during a storage operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Shelved,
    Reverted,
    Applied,
    WouldShelve,
    WouldApply,
}

impl NotifyAction {
    pub fn label(&self) -> &'static str {
        match self {
            NotifyAction::Shelved => "shelved",
            NotifyAction::Reverted => "reverted",
            NotifyAction::Applied => "applied",
            NotifyAction::WouldShelve => "would shelve",
            NotifyAction::WouldApply => "would apply",
        }
    }
}

impl fmt::Display for NotifyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub action: NotifyAction,
    /// Path relative to the working copy root
    pub path: PathBuf,
}

impl Notification {
    pub fn new(action: NotifyAction, path: impl Into<PathBuf>) -> Self {
        Self {
            action,
            path: path.into(),
        }
    }
}

/// Receiver for storage progress events
pub trait Notify {
    fn notify(&self, event: &Notification);
}

/// Discards every event
pub struct NoopNotifier;

impl Notify for NoopNotifier {
    fn notify(&self, _event: &Notification) {}
}

/// Parameters of a create-or-update call
#[derive(Debug, Clone)]
pub struct ShelveRequest<'a> {
    pub name: &'a ShelfName,
    /// Absolute, peg-free target paths
    pub targets: &'a [PathBuf],
    pub depth: Depth,
    /// Restrict to paths in these changelists (empty = no restriction)
    pub changelists: &'a [String],
    pub message: Option<&'a str>,
    /// Leave the shelved edits in the working copy
    pub keep_local: bool,
    pub dry_run: bool,
}

/// Persistence of shelved patches for one working copy
pub trait ShelfStore {
    /// Working copy root this store belongs to
    fn root(&self) -> &Path;

    /// All stored shelves keyed by artifact name (`<name>.patch`)
    fn enumerate(&self) -> Result<HashMap<String, ShelfInfo>>;

    /// Captures local edits under `request.name`, replacing any shelf of the
    /// same name
    fn create_or_update(&self, request: &ShelveRequest<'_>, notify: &dyn Notify) -> Result<()>;

    /// Applies a shelf back to the working copy
    fn apply(
        &self,
        name: &ShelfName,
        keep_local: bool,
        dry_run: bool,
        notify: &dyn Notify,
    ) -> Result<()>;

    /// Removes a shelf
    fn delete(&self, name: &ShelfName, dry_run: bool) -> Result<()>;
}
