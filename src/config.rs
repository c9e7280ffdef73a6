//! Tracker configuration.

use crate::error::{Result, TrackerError};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Tracker configuration.
///
/// Every field has a default, so a TOML file only needs the keys it
/// overrides.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Directory holding persisted state, the global log and team data.
    pub data_dir: PathBuf,

    /// Current status snapshot. Relative paths resolve against `data_dir`.
    pub status_file: PathBuf,

    /// Networks kept by the normalizer (matched on each network's `network` key).
    pub tracked_networks: Vec<String>,

    /// Field names never reported, at any depth.
    pub ignored_fields: BTreeSet<String>,

    /// First component of readable paths.
    pub root_label: String,

    /// Substrings excluding columns from time-series CSV export.
    pub csv_excluded_columns: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            status_file: PathBuf::from("interface-status.json"),
            tracked_networks: vec!["namada".to_string()],
            ignored_fields: [
                "latest_block_height",
                "script_start_time",
                "script_end_time",
                "reference_latest_block_height",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            root_label: "namada".to_string(),
            csv_excluded_columns: [
                ".url",
                ".discord",
                ".namada_version",
                ".latest_block_height",
                ".service",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.root_label.is_empty() {
            return Err(TrackerError::Config("root_label must not be empty".into()));
        }
        Ok(())
    }

    /// Resolved path of the status snapshot.
    pub fn status_path(&self) -> PathBuf {
        if self.status_file.is_absolute() {
            self.status_file.clone()
        } else {
            self.data_dir.join(&self.status_file)
        }
    }
}
