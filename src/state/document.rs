//! Whole-file JSON documents.

use crate::error::{Result, TrackerError};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

/// Read a JSON document. Returns `Ok(None)` when the file does not exist.
pub fn read_document(path: &Path) -> Result<Option<Value>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| TrackerError::Deserialization(format!("{}: {}", path.display(), e)))
}

/// Read a JSON array document leniently.
///
/// Missing, unparsable or non-array documents read as empty.
pub fn read_array_lenient(path: &Path) -> Vec<Value> {
    match read_document(path) {
        Ok(Some(Value::Array(items))) => items,
        Ok(Some(_)) => {
            tracing::warn!(path = %path.display(), "expected a JSON array, treating as empty");
            Vec::new()
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable document, treating as empty");
            Vec::new()
        }
    }
}

/// Read a JSON array document strictly.
///
/// A missing document is empty. A document that exists but is not a JSON
/// array is an error, so callers never overwrite data they could not read.
pub fn read_array(path: &Path) -> Result<Vec<Value>> {
    match read_document(path)? {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(TrackerError::Deserialization(format!(
            "{}: expected a JSON array",
            path.display()
        ))),
        None => Ok(Vec::new()),
    }
}

/// Replace a JSON document wholesale, creating parent directories.
///
/// The document is written to a sibling temp file and renamed into place,
/// so a crash never leaves a truncated document behind.
pub fn write_document(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    let file: File = writer
        .into_inner()
        .map_err(|e| TrackerError::Io(e.into_error()))?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_document_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_document(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/doc.json");
        write_document(&path, &json!({"a": [1, 2]})).unwrap();
        assert_eq!(read_document(&path).unwrap(), Some(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_lenient_array_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");

        fs::write(&path, "{\"not\": \"a list\"}").unwrap();
        assert!(read_array_lenient(&path).is_empty());

        fs::write(&path, "garbage").unwrap();
        assert!(read_array_lenient(&path).is_empty());

        fs::write(&path, "[1, 2]").unwrap();
        assert_eq!(read_array_lenient(&path).len(), 2);
    }

    #[test]
    fn test_strict_array_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        assert!(read_array(&path).unwrap().is_empty());

        fs::write(&path, "[{\"a\": 1}, {\"b\": 2}").unwrap();
        assert!(matches!(
            read_array(&path),
            Err(TrackerError::Deserialization(_))
        ));

        fs::write(&path, "{\"a\": 1}").unwrap();
        assert!(matches!(
            read_array(&path),
            Err(TrackerError::Deserialization(_))
        ));

        fs::write(&path, "[1]").unwrap();
        assert_eq!(read_array(&path).unwrap(), vec![json!(1)]);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &json!([1])).unwrap();
        write_document(&path, &json!([1, 2])).unwrap();

        assert_eq!(read_array(&path).unwrap().len(), 2);
        assert!(!dir.path().join("doc.json.tmp").exists());
    }
}
