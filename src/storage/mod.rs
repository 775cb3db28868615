//! # Storage Layer
//!
//! Persistence of shelved changes and configuration.
//!
//! ## Storage Layout
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Shelved edits | Unified diff | `<git-dir>/shelves/{name}.patch` |
//! | Shelf message | Plain text | `<git-dir>/shelves/{name}.log` |
//! | Working copy config | TOML | `.shelf.toml` |
//! | Global config | TOML | `~/.config/shelf-cli/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`GitShelfStore`] holds an `fs2` lock on `shelves/.lock` while reading or
//!   writing artifacts
//! - All writes are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`ShelfStore`] - The seam commands use to reach shelf storage
//! - [`GitShelfStore`] - Shelf storage inside a git working tree
//! - [`WorkingCopy`] - Entry point for locating a working copy
//! - [`Config`] - Working copy and global configuration

mod engine;
mod git;
mod config;
mod working_copy;

pub use engine::{NoopNotifier, Notification, Notify, NotifyAction, ShelfStore, ShelveRequest};
pub use git::{GitShelfStore, GitStoreError};
pub use config::{Config, ConfigError, GlobalConfig, WorkingCopyConfig, WORKING_COPY_CONFIG};
pub use working_copy::{WorkingCopy, WorkingCopyError};
