//! Configuration handling for Shelf CLI
//!
//! Configuration is stored in `.shelf.toml` at the working copy root and in
//! `~/.config/shelf-cli/config.toml` (global).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::OutputFormat;

/// Working copy configuration file name
pub const WORKING_COPY_CONFIG: &str = ".shelf.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Editor command for writing shelf messages
    pub editor: Option<String>,

    /// Command used to summarize patches in listings; split on whitespace,
    /// with the patch path appended (e.g. `"diffstat -p1"`)
    pub diffstat_command: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Text,
            editor: None,
            diffstat_command: "diffstat".to_string(),
        }
    }
}

/// Per-working-copy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkingCopyConfig {
    /// Changelist name to member paths (relative to the working copy root)
    pub changelists: BTreeMap<String, Vec<PathBuf>>,
}

impl WorkingCopyConfig {
    /// Returns true if `path` belongs to any of the named changelists
    pub fn in_changelists(&self, names: &[String], path: &Path) -> bool {
        names
            .iter()
            .filter_map(|name| self.changelists.get(name))
            .any(|members| members.iter().any(|m| m == path))
    }
}

/// Combined configuration (global + working copy)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub working_copy: WorkingCopyConfig,
}

impl Config {
    /// Loads configuration for a working copy
    pub fn for_working_copy(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let working_copy = Self::load_working_copy(root)?;

        Ok(Self {
            global,
            working_copy,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "shelf", "shelf-cli").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads working copy configuration from a specific root
    fn load_working_copy(root: &Path) -> Result<WorkingCopyConfig> {
        let config_path = root.join(WORKING_COPY_CONFIG);

        if !config_path.exists() {
            return Ok(WorkingCopyConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read working copy config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse working copy config")
    }
}
