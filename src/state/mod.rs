//! Persisted single-record state.
//!
//! Three documents live here: the current status snapshot (read only), the
//! previous snapshot kept between runs, and the merge cursor. Each is a
//! whole-file JSON document replaced wholesale on write.

mod document;

pub use document::{read_array, read_array_lenient, read_document, write_document};

use crate::error::{Result, TrackerError};
use crate::types::MergeState;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Read the current status snapshot.
///
/// An absent or unparsable file is `MissingInput`: the run must stop before
/// writing anything.
pub fn load_current_snapshot(path: &Path) -> Result<Value> {
    match read_document(path) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(TrackerError::missing(path, "file not found")),
        Err(e) => Err(TrackerError::missing(path, e.to_string())),
    }
}

/// Previous snapshot, kept between runs.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot.
    ///
    /// Returns `None` (initial run) when absent, unreadable, not a map or an
    /// empty map.
    pub fn load(&self) -> Option<Value> {
        match read_document(&self.path) {
            Ok(Some(value)) => match value.as_object() {
                Some(map) if !map.is_empty() => Some(value),
                Some(_) => None,
                None => {
                    warn!(path = %self.path.display(), "previous snapshot is not a map, starting over");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "previous snapshot unreadable, starting over");
                None
            }
        }
    }

    /// Overwrite the stored snapshot.
    pub fn save(&self, snapshot: &Value) -> Result<()> {
        write_document(&self.path, snapshot)
    }
}

/// Merge cursor store.
pub struct MergeStateStore {
    path: PathBuf,
}

impl MergeStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cursor, falling back to the default (gated) state when the
    /// document is absent or malformed.
    pub fn load(&self) -> MergeState {
        let value = match read_document(&self.path) {
            Ok(Some(value)) => value,
            Ok(None) => return MergeState::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "merge state unreadable, using default");
                return MergeState::default();
            }
        };

        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "merge state malformed, using default");
            MergeState::default()
        })
    }

    pub fn save(&self, state: &MergeState) -> Result<()> {
        write_document(&self.path, state)
    }
}
