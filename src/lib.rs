//! Shelf CLI - set aside in-progress edits as named patches
//!
//! A shelf is a patch of local modifications stored next to the working copy
//! under a user-chosen name. Shelves can be listed oldest-first, reapplied
//! (by name or the most recent one) and deleted.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Depth, Registry, Shelf, ShelfInfo, ShelfName};
