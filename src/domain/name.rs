//! Logical shelf names
//!
//! A shelf name is what the user types (`wip`, `fix-login`). The storage
//! engine persists each shelf as `<name>.patch`; that suffix never appears in
//! a [`ShelfName`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Suffix the storage engine appends to a shelf name to form its patch file
pub const PATCH_SUFFIX: &str = ".patch";

#[derive(Debug, Error, PartialEq)]
pub enum NameError {
    #[error("Shelf name must not be empty")]
    Empty,

    #[error("Invalid shelf name '{0}': must not contain path separators or NUL")]
    InvalidCharacter(String),

    #[error("Invalid shelf name '{0}': must not start with '.'")]
    Hidden(String),

    #[error("Invalid shelf name '{0}': must not end with '.patch'")]
    StorageSuffix(String),
}

/// Validated name of a shelved change
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShelfName(String);

impl ShelfName {
    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the patch artifact for this shelf
    pub fn patch_file_name(&self) -> String {
        format!("{}{}", self.0, PATCH_SUFFIX)
    }

    /// File name of the message artifact for this shelf
    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.0)
    }

    /// Recovers the logical name from a patch artifact name.
    ///
    /// Exactly one trailing [`PATCH_SUFFIX`] is removed. Returns `None` when
    /// the artifact does not carry the suffix or the remainder is not a valid
    /// name.
    pub fn from_artifact(artifact: &str) -> Option<Self> {
        artifact.strip_suffix(PATCH_SUFFIX)?.parse().ok()
    }
}

impl fmt::Display for ShelfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShelfName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NameError::Empty);
        }

        if s.contains(['/', '\\', '\0']) {
            return Err(NameError::InvalidCharacter(s.to_string()));
        }

        if s.starts_with('.') {
            return Err(NameError::Hidden(s.to_string()));
        }

        if s.ends_with(PATCH_SUFFIX) {
            return Err(NameError::StorageSuffix(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ShelfName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShelfName> for String {
    fn from(name: ShelfName) -> Self {
        name.0
    }
}
