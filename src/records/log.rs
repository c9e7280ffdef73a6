//! Append-only global change log.

use crate::error::Result;
use crate::state::{read_array, read_array_lenient, write_document};
use crate::types::LogEntry;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Global change log, stored as one JSON array document.
///
/// The log is the superset source replayed by the merge controller. It is
/// only ever appended to; existing elements, including ones this crate
/// cannot read, are rewritten untouched.
pub struct ChangeLog {
    path: PathBuf,
}

impl ChangeLog {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every readable entry in log order.
    ///
    /// A missing or malformed document reads as an empty log.
    pub fn entries(&self) -> Vec<LogEntry> {
        let raw = read_array_lenient(&self.path);
        let total = raw.len();

        let entries: Vec<LogEntry> = raw.iter().filter_map(LogEntry::from_value).collect();
        if entries.len() != total {
            warn!(
                path = %self.path.display(),
                skipped = total - entries.len(),
                "skipped malformed log entries"
            );
        }
        entries
    }

    /// Append one entry.
    ///
    /// Fails without writing when the existing document cannot be read as
    /// an array; the log is never rebuilt from a partial read.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut raw = read_array(&self.path)?;
        raw.push(serde_json::to_value(entry)?);
        write_document(&self.path, &raw)?;

        debug!(path = %self.path.display(), timestamp = %entry.timestamp(), len = raw.len(), "appended log entry");
        Ok(())
    }
}
