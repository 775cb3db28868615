//! Domain models for Shelf CLI
//!
//! Contains the shelf naming, ordering and target rules without any I/O.

mod name;
mod shelf;
mod registry;
mod target;

pub use name::{NameError, ShelfName, PATCH_SUFFIX};
pub use shelf::{Shelf, ShelfInfo};
pub use registry::{Registry, RegistryError};
pub use target::{is_url, normalize, strip_peg_revision, Depth};
