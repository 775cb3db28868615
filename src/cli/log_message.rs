//! Shelf message collection
//!
//! A message comes from `--message`, `--file` or an editor run on a scratch
//! file. The facility is scoped around the storage call by [`scoped`]: the
//! scratch file is removed when the call succeeds and kept (and pointed to in
//! the error) when it fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

/// Where the shelf message comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSource {
    Inline(String),
    File(PathBuf),
    Editor { command: String, scratch: PathBuf },
}

/// An acquired message plus whatever must be cleaned up afterwards
#[derive(Debug)]
pub struct LogMessage {
    message: String,
    scratch: Option<PathBuf>,
}

impl LogMessage {
    /// Collects the message from its source
    pub fn acquire(source: &MessageSource) -> Result<Self> {
        match source {
            MessageSource::Inline(text) => Ok(Self {
                message: text.clone(),
                scratch: None,
            }),
            MessageSource::File(path) => {
                let message = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read message file: {}", path.display()))?;
                Ok(Self {
                    message,
                    scratch: None,
                })
            }
            MessageSource::Editor { command, scratch } => {
                if let Some(parent) = scratch.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create directory: {}", parent.display())
                    })?;
                }
                if !scratch.exists() {
                    fs::write(scratch, "").with_context(|| {
                        format!("Failed to create message file: {}", scratch.display())
                    })?;
                }

                run_editor(command, scratch)?;

                let message = fs::read_to_string(scratch)
                    .with_context(|| format!("Failed to read message file: {}", scratch.display()))?;
                Ok(Self {
                    message: message.trim_end().to_string(),
                    scratch: Some(scratch.clone()),
                })
            }
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Releases the facility after the guarded operation finished.
    ///
    /// The operation's error always wins over a cleanup error.
    pub fn cleanup<T>(self, outcome: Result<T>) -> Result<T> {
        let Some(scratch) = self.scratch else {
            return outcome;
        };

        match outcome {
            Ok(value) => {
                fs::remove_file(&scratch).with_context(|| {
                    format!("Failed to remove message file: {}", scratch.display())
                })?;
                Ok(value)
            }
            Err(err) => match fs::metadata(&scratch) {
                Ok(_) => Err(err.context(format!(
                    "Your message was left in '{}'",
                    scratch.display()
                ))),
                Err(_) => Err(err),
            },
        }
    }
}

/// Runs `op` with the collected message, releasing the facility on every
/// exit path of `op`.
pub fn scoped<T>(
    source: Option<&MessageSource>,
    op: impl FnOnce(Option<&str>) -> Result<T>,
) -> Result<T> {
    let Some(source) = source else {
        return op(None);
    };

    let log_message = LogMessage::acquire(source)?;
    let outcome = op(Some(log_message.message()));
    log_message.cleanup(outcome)
}

fn run_editor(command: &str, file: &Path) -> Result<()> {
    #[cfg(windows)]
    let status = Command::new("cmd")
        .arg("/C")
        .arg(format!("{} \"{}\"", command, file.display()))
        .status();

    #[cfg(not(windows))]
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{} \"$1\"", command))
        .arg("sh")
        .arg(file)
        .status();

    let status = status.with_context(|| format!("Failed to run editor '{}'", command))?;
    if !status.success() {
        anyhow::bail!("Editor '{}' exited with {}", command, status);
    }

    Ok(())
}
