//! Shelf domain model

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::name::ShelfName;

/// Metadata the storage engine reports for one stored patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfInfo {
    /// Location of the stored patch content
    pub patch_path: PathBuf,

    /// Last modification of the stored patch
    pub modified: DateTime<Utc>,

    /// Free-text description (may be empty)
    pub message: String,

    /// Size of the stored patch in bytes
    pub size_bytes: u64,
}

/// A named, persisted set of local edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shelf {
    pub name: ShelfName,
    pub patch_path: PathBuf,
    pub modified: DateTime<Utc>,
    pub message: String,
    pub size_bytes: u64,
}

impl Shelf {
    pub fn new(name: ShelfName, info: ShelfInfo) -> Self {
        Self {
            name,
            patch_path: info.patch_path,
            modified: info.modified,
            message: info.message,
            size_bytes: info.size_bytes,
        }
    }

    /// Whole minutes elapsed between the last update and `now`.
    ///
    /// A modification time in the future counts as zero minutes old.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.modified).num_minutes().max(0)
    }
}
