// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory stores for tests and dry runs where no backend is available.

use std::collections::HashMap;
use std::sync::Mutex;

use docscan_core::error::{Result, ScanError};
use serde_json::{Map, Value};

use crate::traits::{BlobStore, RecordStore};

const MEMORY_SCHEME: &str = "memory://";

/// Blob store backed by a map. URLs look like `memory://<path>`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, path: &str, bytes: &[u8], mime_type: &str) -> Result<String> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| ScanError::Storage(format!("blob store lock poisoned: {e}")))?;
        if blobs.contains_key(path) {
            return Err(ScanError::Storage(format!("object already exists: {path}")));
        }
        blobs.insert(path.to_owned(), bytes.to_vec());
        tracing::debug!(path, mime_type, bytes = bytes.len(), "Blob stored in memory");
        Ok(format!("{MEMORY_SCHEME}{path}"))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = url
            .strip_prefix(MEMORY_SCHEME)
            .ok_or_else(|| ScanError::Storage(format!("not a memory URL: {url}")))?;
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| ScanError::Storage(format!("blob store lock poisoned: {e}")))?;
        blobs
            .get(path)
            .cloned()
            .ok_or_else(|| ScanError::Storage(format!("no object at {url}")))
    }
}

/// Record store backed by nested maps: table -> key -> record.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, HashMap<String, Map<String, Value>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a record.
    pub fn insert(&self, table: &str, key: &str, record: Map<String, Value>) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| ScanError::Storage(format!("record store lock poisoned: {e}")))?;
        tables
            .entry(table.to_owned())
            .or_default()
            .insert(key.to_owned(), record);
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self, table: &str, key: &str) -> Result<Option<Value>> {
        let tables = self
            .tables
            .lock()
            .map_err(|e| ScanError::Storage(format!("record store lock poisoned: {e}")))?;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(key))
            .map(|record| Value::Object(record.clone())))
    }

    fn update(&self, table: &str, key: &str, fields: Map<String, Value>) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| ScanError::Storage(format!("record store lock poisoned: {e}")))?;
        let record = tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(key))
            .ok_or_else(|| ScanError::RecordNotFound {
                table: table.to_owned(),
                key: key.to_owned(),
            })?;
        record.extend(fields);
        Ok(())
    }
}
