//! # Command-Line Interface
//!
//! User-facing shelf commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `shelve NAME PATH...` | Save local edits under NAME and revert them |
//! | `shelve --list` | List shelves oldest first |
//! | `shelve --remove NAME` | Delete a shelf |
//! | `unshelve [NAME]` | Reapply a shelf (the youngest if NAME is omitted) |
//! | `shelves` | List shelves with a diffstat |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! shelf --verbose shelves
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod list;
mod log_message;
mod shelve;

pub use app::{Cli, Commands, run};
pub use output::{Captured, Output, OutputFormat, OutputNotifier};
pub use list::{DiffstatRenderer, ExternalDiffstat, MESSAGE_WIDTH};
pub use log_message::{LogMessage, MessageSource};
pub use shelve::{ShelfCommands, ShelveOptions, UnshelveOptions, UsageError};
