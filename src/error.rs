//! Error types for the interface tracker.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing input {path}: {reason}")]
    MissingInput { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Workspace is locked by another run")]
    Locked,

    #[error("Sink write failed for partition {partition}: {reason}")]
    Sink { partition: String, reason: String },
}

impl TrackerError {
    /// Build a `MissingInput` error for a path.
    pub fn missing(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TrackerError::MissingInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for TrackerError {
    fn from(e: csv::Error) -> Self {
        TrackerError::Csv(e.to_string())
    }
}

impl From<toml::de::Error> for TrackerError {
    fn from(e: toml::de::Error) -> Self {
        TrackerError::Config(e.to_string())
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
