// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docscan storage bridge.
//
// Defines the blob and record store traits a confirmed scan is handed to,
// in-memory and filesystem implementations, and the uploader that links a
// stored scan from its record.

pub mod capture;
pub mod fs;
pub mod memory;
pub mod traits;

pub use capture::{EvidenceItem, EvidenceUploader, object_path};
pub use fs::{FsBlobStore, JsonRecordStore};
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use traits::{BlobStore, RecordStore};
