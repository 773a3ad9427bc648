// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage collaborators a confirmed scan is handed to.
//
// The scanner itself never talks to a backend. Callers plug in a blob store
// for the image bytes and a record store for the row the image belongs to.

use docscan_core::error::Result;
use serde_json::{Map, Value};

/// Object storage for scanned images.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `path` and return a URL that resolves to them.
    ///
    /// Paths are relative and `/`-separated (e.g. `12345678/scan_1700000000000.jpg`).
    /// Uploading to an existing path is a `Storage` error.
    fn upload(&self, path: &str, bytes: &[u8], mime_type: &str) -> Result<String>;

    /// Read back the bytes behind a URL previously returned by `upload`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Keyed records (one JSON object per key) grouped into tables.
pub trait RecordStore: Send + Sync {
    /// Return the record stored under `key`, or None if there is none.
    fn read(&self, table: &str, key: &str) -> Result<Option<Value>>;

    /// Merge `fields` into an existing record.
    ///
    /// Returns `RecordNotFound` if no record is stored under `key`.
    fn update(&self, table: &str, key: &str, fields: Map<String, Value>) -> Result<()>;
}
