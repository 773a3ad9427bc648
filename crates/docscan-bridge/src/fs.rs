// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filesystem-backed stores used by the command-line tool.
//
// Blobs live as plain files under a root directory and are addressed by
// `file://` URLs. Records live in a single pretty-printed JSON document
// shaped `{ table: { key: { field: value } } }`.

use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use docscan_core::error::{Result, ScanError};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::traits::{BlobStore, RecordStore};

const FILE_SCHEME: &str = "file://";

/// Blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let root = std::fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative object path, refusing anything that escapes the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(ScanError::Storage(format!("invalid object path: {path:?}")));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    fn upload(&self, path: &str, bytes: &[u8], mime_type: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if target.exists() {
            return Err(ScanError::Storage(format!("object already exists: {path}")));
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        debug!(path = %target.display(), "Blob written");
        Ok(format!("{FILE_SCHEME}{}", target.display()))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = url
            .strip_prefix(FILE_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| ScanError::Storage(format!("not a file URL: {url}")))?;
        let escapes = path.components().any(|c| matches!(c, Component::ParentDir));
        if escapes || !path.starts_with(&self.root) {
            return Err(ScanError::Storage(format!(
                "{url} is outside store root {}",
                self.root.display()
            )));
        }
        Ok(std::fs::read(path)?)
    }
}

/// Record store persisted as one JSON document.
///
/// Every update rewrites the whole file; the document is small (one entry per
/// job) and the CLI touches it once per invocation.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonRecordStore {
    /// Use the document at `path`. A missing file reads as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or replace a record.
    pub fn insert(&self, table: &str, key: &str, record: Map<String, Value>) -> Result<()> {
        let _guard = self.guard()?;
        let mut doc = self.load()?;
        table_mut(&mut doc, table)?.insert(key.to_owned(), Value::Object(record));
        self.store(&doc)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| ScanError::Storage(format!("record store lock poisoned: {e}")))
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&data)? {
            Value::Object(doc) => Ok(doc),
            _ => Err(ScanError::Storage(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
        }
    }

    fn store(&self, doc: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

fn table_mut<'a>(
    doc: &'a mut Map<String, Value>,
    table: &str,
) -> Result<&'a mut Map<String, Value>> {
    doc.entry(table.to_owned())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| ScanError::Storage(format!("table {table} is not a JSON object")))
}

impl RecordStore for JsonRecordStore {
    fn read(&self, table: &str, key: &str) -> Result<Option<Value>> {
        let _guard = self.guard()?;
        let doc = self.load()?;
        Ok(doc.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    #[instrument(skip(self, fields), fields(path = %self.path.display()))]
    fn update(&self, table: &str, key: &str, fields: Map<String, Value>) -> Result<()> {
        let _guard = self.guard()?;
        let mut doc = self.load()?;
        let record = doc
            .get_mut(table)
            .and_then(|rows| rows.get_mut(key))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ScanError::RecordNotFound {
                table: table.to_owned(),
                key: key.to_owned(),
            })?;
        record.extend(fields);
        self.store(&doc)?;
        debug!("Record updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blob_round_trips_through_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();
        let url = store.upload("123/scan_1.jpg", b"data", "image/jpeg").unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("123/scan_1.jpg"));
        assert_eq!(store.fetch(&url).unwrap(), b"data");
    }

    #[test]
    fn blob_paths_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        for bad in ["../x.jpg", "/etc/passwd", "", "a/../../b"] {
            let err = store.upload(bad, b"x", "image/jpeg").unwrap_err();
            assert!(matches!(err, ScanError::Storage(_)), "{bad}");
        }
        assert!(store.fetch("file:///etc/hostname").is_err());
    }

    #[test]
    fn blob_upload_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        store.upload("a.png", b"1", "image/png").unwrap();
        assert!(store.upload("a.png", b"2", "image/png").is_err());
    }

    #[test]
    fn json_records_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        let store = JsonRecordStore::open(&path);
        let mut record = Map::new();
        record.insert("status".into(), json!("assigned"));
        store.insert("jobs", "44556677", record).unwrap();

        let mut fields = Map::new();
        fields.insert("photo_cabinet".into(), json!("file:///tmp/x.jpg"));
        store.update("jobs", "44556677", fields).unwrap();

        let reopened = JsonRecordStore::open(&path);
        let row = reopened.read("jobs", "44556677").unwrap().unwrap();
        assert_eq!(row["status"], "assigned");
        assert_eq!(row["photo_cabinet"], "file:///tmp/x.jpg");
    }

    #[test]
    fn json_update_of_missing_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::open(dir.path().join("records.json"));
        assert!(store.read("jobs", "1").unwrap().is_none());
        let err = store.update("jobs", "1", Map::new()).unwrap_err();
        assert!(matches!(err, ScanError::RecordNotFound { .. }));
    }
}
