//! Per-team JSON documents.

use super::PartitionSink;
use crate::error::{Result, TrackerError};
use crate::partition::PartitionKey;
use crate::state::{read_array_lenient, write_document};
use crate::types::ChangeBatch;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Appends batches to `<dir>/<partition>.json`, a JSON array per partition.
pub struct JsonSink {
    dir: PathBuf,
}

impl JsonSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &PartitionKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }

    /// Read back a partition document. Unreadable elements are skipped.
    pub fn read(&self, key: &PartitionKey) -> Vec<ChangeBatch> {
        read_batches(&self.path_for(key))
    }

    /// Every partition document in the directory, as `(file stem, batches)`,
    /// sorted by stem. A missing directory holds no partitions.
    pub fn stored(&self) -> Result<Vec<(String, Vec<ChangeBatch>)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut stored = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stored.push((stem.to_string(), read_batches(&path)));
            }
        }
        stored.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(stored)
    }
}

fn read_batches(path: &Path) -> Vec<ChangeBatch> {
    read_array_lenient(path)
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(batch) => Some(batch),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable partition entry");
                None
            }
        })
        .collect()
}

impl PartitionSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn append(&self, key: &PartitionKey, batches: &[ChangeBatch]) -> Result<()> {
        let path = self.path_for(key);
        let mut doc = read_array_lenient(&path);
        for batch in batches {
            doc.push(serde_json::to_value(batch)?);
        }

        write_document(&path, &doc).map_err(|e| TrackerError::Sink {
            partition: key.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_appends_accumulate() {
        let dir = TempDir::new().unwrap();
        let sink = JsonSink::new(dir.path());
        let key = PartitionKey::Team("Team Alpha".into());
        let batch = |ts: &str| ChangeBatch::Change {
            timestamp: Timestamp::from(ts),
            changes: vec![],
        };

        sink.append(&key, &[batch("t1")]).unwrap();
        sink.append(&key, &[batch("t2")]).unwrap();

        assert!(dir.path().join("Team_Alpha.json").exists());
        let stored = sink.read(&key);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].timestamp().as_str(), "t2");
    }

    #[test]
    fn test_initial_entry_shape() {
        let dir = TempDir::new().unwrap();
        let sink = JsonSink::new(dir.path());
        let key = PartitionKey::Team("alpha".into());
        sink.append(
            &key,
            &[ChangeBatch::Initial {
                timestamp: Timestamp::from("t1"),
                team: Some("alpha".into()),
                interface_data: json!({"team": "alpha"}),
            }],
        )
        .unwrap();

        let raw = read_array_lenient(&sink.path_for(&key));
        assert_eq!(raw[0]["type"], "initial");
        assert_eq!(raw[0]["team"], "alpha");
        assert_eq!(raw[0]["interface_data"]["team"], "alpha");
    }

    #[test]
    fn test_stored_lists_partitions() {
        let dir = TempDir::new().unwrap();
        let sink = JsonSink::new(dir.path().join("json"));
        assert!(sink.stored().unwrap().is_empty());

        let batch = ChangeBatch::Change {
            timestamp: Timestamp::from("t1"),
            changes: vec![],
        };
        sink.append(&PartitionKey::Team("beta".into()), &[batch.clone()])
            .unwrap();
        sink.append(&PartitionKey::Fallback, &[batch.clone(), batch])
            .unwrap();
        fs::write(dir.path().join("json").join("notes.txt"), "x").unwrap();

        let stored = sink.stored().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].0, "beta");
        assert_eq!(stored[1].0, "required_versions");
        assert_eq!(stored[1].1.len(), 2);
    }
}
