// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations.

use std::path::{Path, PathBuf};

use docscan_bridge::{EvidenceUploader, FsBlobStore, JsonRecordStore, RecordStore};
use docscan_core::error::{Result, ScanError};
use docscan_core::{DocumentType, Point, Quad, ScannedFile, ScannerConfig, Viewport};
use docscan_document::{
    ImageProcessor, RectificationSession, RectifiedImage, Rectifier, render_overlay,
};
use tracing::{info, instrument};

/// Rectify `input` and write the scan. Returns the path written.
///
/// An explicit `output` path decides the encoding by its extension; `format`
/// may restate it but not contradict it.
#[instrument(skip(config, corners))]
pub async fn rectify(
    mut config: ScannerConfig,
    input: &Path,
    corners: Option<Vec<Point>>,
    output: Option<PathBuf>,
    rotate: u32,
    format: Option<DocumentType>,
) -> Result<PathBuf> {
    config.output_format = output_format(config.output_format, format, output.as_deref())?;
    let data = std::fs::read(input)?;
    let mut session = RectificationSession::from_bytes(&data, config)?;
    if let Some(corners) = corners {
        session.set_quad(quad_from(&corners)?);
    }

    let outcome = session.spawn_rectify().join().await;
    session.accept(outcome)?;
    for _ in 0..rotate % 4 {
        session.rotate_result();
    }

    let file = session
        .confirm()?
        .ok_or_else(|| ScanError::Worker("rectification produced no image".into()))?;
    let path = output.unwrap_or_else(|| sibling(input, &file.name));
    write_scan(&file, &path)?;
    Ok(path)
}

/// Rotate an encoded scan by `times` quarter turns clockwise.
///
/// Whole turns are refused rather than re-encoding an unchanged image.
#[instrument(skip(config))]
pub fn rotate(
    config: &ScannerConfig,
    input: &Path,
    times: u32,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    if times % 4 == 0 {
        return Err(ScanError::Config(format!(
            "rotating by {times} quarter turns leaves the scan unchanged"
        )));
    }
    let format = output_format(format_of(input)?, None, output.as_deref())?;
    let pixels = ImageProcessor::open(input)?
        .rotate_quarter_turns(times)
        .into_rgba8();
    let file = Rectifier::new(config)
        .with_format(format)
        .encode_rotated(&RectifiedImage::new(pixels))?;
    let path = output.unwrap_or_else(|| sibling(input, &file.name));
    write_scan(&file, &path)?;
    Ok(path)
}

/// Render the selection overlay to a PNG.
#[instrument(skip(config, corners))]
pub fn preview(
    config: &ScannerConfig,
    input: &Path,
    viewport: Viewport,
    corners: Option<Vec<Point>>,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let source = ImageProcessor::open(input)?;
    let size = source.size();
    let quad = match corners {
        Some(corners) => quad_from(&corners)?.clamped(size),
        None => Quad::inset(size, config.default_inset),
    };
    let canvas = render_overlay(&source.into_rgba8(), &quad, viewport)?;
    let path = output.unwrap_or_else(|| sibling(input, "preview.png"));
    ImageProcessor::from_rgba(canvas).save(&path)?;
    info!(path = %path.display(), "Preview written");
    Ok(path)
}

/// Upload `scanned` into the store at `store` and link it from the record.
/// Returns the stored URL and the updated record.
#[instrument]
pub fn attach(
    scanned: &Path,
    store: &Path,
    table: &str,
    record: &str,
    field: &str,
    prefix: &str,
) -> Result<(String, serde_json::Value)> {
    let document_type = format_of(scanned)?;
    let bytes = std::fs::read(scanned)?;
    let size = ImageProcessor::from_bytes(&bytes)?.size();
    let name = scanned
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("scan.{}", document_type.extension()));
    let file = ScannedFile {
        name,
        document_type,
        size,
        bytes,
    };

    let uploader = EvidenceUploader::new(
        FsBlobStore::open(store.join("blobs"))?,
        JsonRecordStore::open(store.join("records.json")),
        table,
    );
    let url = uploader.attach(record, field, prefix, &file)?;
    let row = uploader
        .records()
        .read(table, record)?
        .ok_or_else(|| ScanError::RecordNotFound {
            table: table.to_owned(),
            key: record.to_owned(),
        })?;
    Ok((url, row))
}

fn quad_from(corners: &[Point]) -> Result<Quad> {
    let corners: [Point; 4] = corners.try_into().map_err(|_| {
        ScanError::DegenerateGeometry(format!("expected 4 corners, got {}", corners.len()))
    })?;
    Ok(Quad::from_corners(corners))
}

fn format_of(path: &Path) -> Result<DocumentType> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentType::from_extension)
        .ok_or_else(|| {
            ScanError::ImageDecode(format!(
                "{} is not a .jpg, .jpeg or .png file",
                path.display()
            ))
        })
}

/// Encoding for a write to `output`: its extension wins, then `requested`,
/// then `fallback`.
fn output_format(
    fallback: DocumentType,
    requested: Option<DocumentType>,
    output: Option<&Path>,
) -> Result<DocumentType> {
    let Some(path) = output else {
        return Ok(requested.unwrap_or(fallback));
    };
    let from_path = format_of(path)?;
    match requested {
        Some(requested) if requested != from_path => Err(ScanError::Config(format!(
            "--format {} does not match output {}",
            requested.extension(),
            path.display()
        ))),
        _ => Ok(from_path),
    }
}

fn sibling(input: &Path, name: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn write_scan(file: &ScannedFile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &file.bytes)?;
    info!(
        path = %path.display(),
        size = %file.size,
        bytes = file.len(),
        mime = file.mime_type(),
        "Scan written"
    );
    Ok(())
}
