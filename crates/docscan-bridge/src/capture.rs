// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evidence upload: store confirmed scans and link them from their record.
//
// Objects are named `{record_key}/{prefix}_{unix_millis}.{ext}` so several
// photos of the same job sit side by side and never overwrite each other.
// The record must already exist; it is checked before anything is uploaded.

use docscan_core::ScannedFile;
use docscan_core::error::{Result, ScanError};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::traits::{BlobStore, RecordStore};

/// One scan to attach and the record field that should point at it.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceItem<'a> {
    pub field: &'a str,
    pub prefix: &'a str,
    pub file: &'a ScannedFile,
}

/// Object path for an upload.
pub fn object_path(record_key: &str, prefix: &str, unix_millis: i64, extension: &str) -> String {
    format!("{record_key}/{prefix}_{unix_millis}.{extension}")
}

/// Uploads scans to a blob store and writes their URLs into a record table.
#[derive(Debug)]
pub struct EvidenceUploader<B, R> {
    blobs: B,
    records: R,
    table: String,
}

impl<B: BlobStore, R: RecordStore> EvidenceUploader<B, R> {
    pub fn new(blobs: B, records: R, table: impl Into<String>) -> Self {
        Self {
            blobs,
            records,
            table: table.into(),
        }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Upload one scan and set `field` on the record to its URL.
    pub fn attach(
        &self,
        record_key: &str,
        field: &str,
        prefix: &str,
        file: &ScannedFile,
    ) -> Result<String> {
        let mut urls = self.attach_all(record_key, &[EvidenceItem { field, prefix, file }])?;
        urls.pop()
            .ok_or_else(|| ScanError::Storage("upload produced no URL".into()))
    }

    /// Upload several scans and link them all with a single record update.
    ///
    /// URLs are returned in the order of `items`. Every item is checked
    /// before the first upload, and prefixes must be distinct. If an upload
    /// fails the record is left untouched.
    #[instrument(skip(self, items), fields(table = %self.table, items = items.len()))]
    pub fn attach_all(&self, record_key: &str, items: &[EvidenceItem<'_>]) -> Result<Vec<String>> {
        validate_segment("record key", record_key)?;
        if self.records.read(&self.table, record_key)?.is_none() {
            return Err(ScanError::RecordNotFound {
                table: self.table.clone(),
                key: record_key.to_owned(),
            });
        }

        for (i, item) in items.iter().enumerate() {
            validate_item(item)?;
            if items[..i].iter().any(|earlier| earlier.prefix == item.prefix) {
                return Err(ScanError::Storage(format!(
                    "prefix {:?} is used twice in one upload",
                    item.prefix
                )));
            }
        }

        let stamp = chrono::Utc::now().timestamp_millis();
        let mut fields = Map::new();
        let mut urls = Vec::with_capacity(items.len());
        for item in items {
            let path = object_path(
                record_key,
                item.prefix,
                stamp,
                item.file.document_type.extension(),
            );
            let url = self
                .blobs
                .upload(&path, &item.file.bytes, item.file.mime_type())?;
            fields.insert(item.field.to_owned(), Value::String(url.clone()));
            urls.push(url);
        }

        self.records.update(&self.table, record_key, fields)?;
        info!(record_key, count = urls.len(), "Evidence attached");
        Ok(urls)
    }
}

fn validate_item(item: &EvidenceItem<'_>) -> Result<()> {
    validate_segment("prefix", item.prefix)?;
    if item.field.is_empty() {
        return Err(ScanError::Storage("record field name is empty".into()));
    }
    if item.file.is_empty() {
        return Err(ScanError::Storage(format!(
            "{} has no encoded bytes",
            item.file.name
        )));
    }
    Ok(())
}

fn validate_segment(what: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ScanError::Storage(format!("invalid {what}: {value:?}")));
    }
    Ok(())
}
