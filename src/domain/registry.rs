//! Time-ordered view over the shelves of one working copy
//!
//! The registry is rebuilt from a fresh storage enumeration on every command.
//! Storage artifact names (`wip.patch`) are turned into logical names (`wip`)
//! here and nowhere else.

use thiserror::Error;

use super::name::ShelfName;
use super::shelf::{Shelf, ShelfInfo};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("No shelved changes found")]
    NoShelves,
}

/// Snapshot of all shelves in a working copy
#[derive(Debug, Clone, Default)]
pub struct Registry {
    shelves: Vec<Shelf>,
}

impl Registry {
    /// Builds a registry from a storage enumeration keyed by artifact name.
    ///
    /// Artifacts whose name does not map back to a valid [`ShelfName`] are
    /// skipped.
    pub fn from_artifacts<I>(artifacts: I) -> Self
    where
        I: IntoIterator<Item = (String, ShelfInfo)>,
    {
        let shelves = artifacts
            .into_iter()
            .filter_map(|(artifact, info)| {
                ShelfName::from_artifact(&artifact).map(|name| Shelf::new(name, info))
            })
            .collect();

        Self { shelves }
    }

    /// Number of shelves
    pub fn len(&self) -> usize {
        self.shelves.len()
    }

    /// Returns true if there are no shelves
    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }

    /// Looks up a shelf by name
    pub fn get(&self, name: &ShelfName) -> Option<&Shelf> {
        self.shelves.iter().find(|s| &s.name == name)
    }

    /// All shelves, oldest first.
    ///
    /// Equal modification times are ordered by name.
    pub fn ordered_by_age(&self) -> Vec<&Shelf> {
        let mut ordered: Vec<&Shelf> = self.shelves.iter().collect();
        ordered.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        ordered
    }

    /// The most recently modified shelf
    pub fn youngest(&self) -> Result<&Shelf, RegistryError> {
        self.ordered_by_age()
            .pop()
            .ok_or(RegistryError::NoShelves)
    }
}
