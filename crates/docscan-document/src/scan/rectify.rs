// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectifier: flattens the user-selected document quadrilateral into an
// upright rectangle by backward mapping every output pixel through the
// inverse homography (nearest neighbour), and rotates the result in quarter
// turns.

use docscan_core::error::{Result, ScanError};
use docscan_core::{DocumentType, ImageSize, Point, Quad, ScannedFile, ScannerConfig};
use image::{Rgba, RgbaImage};
use tracing::{debug, info, instrument};

use crate::homography::solver::solve_homography_with_epsilon;
use crate::image::processor::ImageProcessor;

/// Added before flooring a mapped source coordinate so that round-off just
/// below an integer does not shift the sample by a whole pixel.
const SNAP_EPSILON: f64 = 1e-6;

/// Written where the mapped source pixel falls outside the photo.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// File name of a freshly rectified document.
const RECTIFIED_STEM: &str = "scanned_doc";

/// File name of a document that was rotated after rectification.
const ROTATED_STEM: &str = "scanned_doc_rotated";

/// A rectified document held as RGBA pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RectifiedImage {
    pixels: RgbaImage,
}

impl RectifiedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.pixels.width(), self.pixels.height())
    }

    /// Rotate 90 degrees clockwise; width and height swap.
    ///
    /// Calls compound: four rotations give back the original pixels.
    pub fn rotate90(&self) -> Self {
        Self {
            pixels: image::imageops::rotate90(&self.pixels),
        }
    }

    /// Encode into a named in-memory file.
    pub fn encode(&self, format: DocumentType, quality: u8, stem: &str) -> Result<ScannedFile> {
        let bytes = ImageProcessor::from_rgba(self.pixels.clone()).encode(format, quality)?;
        Ok(ScannedFile {
            name: format!("{stem}.{}", format.extension()),
            document_type: format,
            size: self.size(),
            bytes,
        })
    }
}

/// Size of the flattened document for `quad`, capped at `max_dimension`.
///
/// Width is the longer of the top and bottom edges, height the longer of the
/// left and right edges. When either exceeds the cap both shrink by the same
/// factor. Fractional sizes truncate.
pub fn output_size(quad: &Quad, max_dimension: u32) -> Result<ImageSize> {
    let (mut width, mut height) = quad.measured_size();
    if !(width.is_finite() && height.is_finite()) {
        return Err(ScanError::DegenerateGeometry("corner coordinates are not finite".into()));
    }

    let cap = max_dimension as f64;
    if width > cap || height > cap {
        // Pin the longer side to the cap exactly; scaling it by the ratio
        // could land a hair under and truncate to cap - 1.
        if width >= height {
            height *= cap / width;
            width = cap;
        } else {
            width *= cap / height;
            height = cap;
        }
    }

    let size = ImageSize::new(
        (width.floor() as u32).min(max_dimension),
        (height.floor() as u32).min(max_dimension),
    );
    if size.is_empty() {
        return Err(ScanError::DegenerateGeometry(format!(
            "selected area flattens to {size}, which has no pixels"
        )));
    }
    Ok(size)
}

/// Rectification and rotation with fixed output settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectifier {
    max_dimension: u32,
    singular_epsilon: f64,
    format: DocumentType,
    rectify_quality: u8,
    rotate_quality: u8,
}

impl Default for Rectifier {
    fn default() -> Self {
        Self::new(&ScannerConfig::default())
    }
}

impl Rectifier {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            max_dimension: config.max_output_dimension,
            singular_epsilon: config.singular_epsilon,
            format: config.output_format,
            rectify_quality: config.rectify_quality,
            rotate_quality: config.rotate_quality,
        }
    }

    /// Override the output dimension cap.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    /// Override the encoded output format.
    pub fn with_format(mut self, format: DocumentType) -> Self {
        self.format = format;
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn format(&self) -> DocumentType {
        self.format
    }

    /// Output size this rectifier would produce for `quad`.
    pub fn output_size(&self, quad: &Quad) -> Result<ImageSize> {
        output_size(quad, self.max_dimension)
    }

    /// Resample the region of `source` bounded by `quad` (image space) into
    /// an upright rectangle.
    ///
    /// Each output pixel is mapped back into the photo and takes the colour
    /// of the pixel it lands in, fully opaque. Output pixels that land outside
    /// the photo are transparent. Colours are copied unchanged.
    #[instrument(skip(self, source), fields(src_w = source.width(), src_h = source.height()))]
    pub fn rectify(&self, source: &RgbaImage, quad: &Quad) -> Result<RectifiedImage> {
        let (src_w, src_h) = source.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(ScanError::EmptyImage);
        }

        let out = self.output_size(quad)?;
        let (measured_w, measured_h) = quad.measured_size();
        debug!(
            measured_w,
            measured_h,
            out_w = out.width,
            out_h = out.height,
            "Output size computed"
        );

        // Output rectangle corners play "source" so the solved transform maps
        // destination pixels back into the photo.
        let target = Quad::rectangle(out.width as f64, out.height as f64);
        let inverse = solve_homography_with_epsilon(
            &target.corners(),
            &quad.corners(),
            self.singular_epsilon,
        )?;

        let mut output = RgbaImage::new(out.width, out.height);
        let (src_w, src_h) = (src_w as f64, src_h as f64);
        let mut transparent = 0u64;

        for (x, y, pixel) in output.enumerate_pixels_mut() {
            let mapped = inverse.apply(Point::new(x as f64, y as f64));
            let sx = (mapped.x + SNAP_EPSILON).floor();
            let sy = (mapped.y + SNAP_EPSILON).floor();

            // NaN fails every comparison and lands in the transparent arm.
            if sx >= 0.0 && sx < src_w && sy >= 0.0 && sy < src_h {
                let Rgba([r, g, b, _]) = *source.get_pixel(sx as u32, sy as u32);
                *pixel = Rgba([r, g, b, 255]);
            } else {
                *pixel = TRANSPARENT;
                transparent += 1;
            }
        }

        info!(
            out_w = out.width,
            out_h = out.height,
            transparent,
            "Rectification complete"
        );
        Ok(RectifiedImage::new(output))
    }

    /// Decode `data`, rectify it, and encode at the rectification quality.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn rectify_bytes(&self, data: &[u8], quad: &Quad) -> Result<ScannedFile> {
        let source = ImageProcessor::from_bytes(data)?.into_rgba8();
        let rectified = self.rectify(&source, quad)?;
        self.encode(&rectified)
    }

    /// Encode a fresh rectification as `scanned_doc.<ext>`.
    pub fn encode(&self, image: &RectifiedImage) -> Result<ScannedFile> {
        image.encode(self.format, self.rectify_quality, RECTIFIED_STEM)
    }

    /// Encode a rotated rectification as `scanned_doc_rotated.<ext>`.
    pub fn encode_rotated(&self, image: &RectifiedImage) -> Result<ScannedFile> {
        image.encode(self.format, self.rotate_quality, ROTATED_STEM)
    }

    /// Decode an already-encoded scan, rotate it 90 degrees clockwise, and
    /// re-encode it at the rotation quality.
    #[instrument(skip(self, file), fields(name = %file.name, len = file.len()))]
    pub fn rotate_encoded(&self, file: &ScannedFile) -> Result<ScannedFile> {
        let rotated = ImageProcessor::from_bytes(&file.bytes)?.rotate90().into_rgba8();
        let rotated = RectifiedImage::new(rotated);
        info!(width = rotated.size().width, height = rotated.size().height, "Scan rotated");
        rotated.encode(file.document_type, self.rotate_quality, ROTATED_STEM)
    }
}

/// Rectify with default settings apart from the output cap.
pub fn rectify(source: &RgbaImage, quad: &Quad, max_dimension: u32) -> Result<RectifiedImage> {
    Rectifier::default()
        .with_max_dimension(max_dimension)
        .rectify(source, quad)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic, position-dependent test pattern.
    fn pattern(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 251) as u8, (y % 241) as u8, ((x * 7 + y * 13) % 256) as u8, 255])
        })
    }

    #[test]
    fn exact_corners_reproduce_source() {
        let source = pattern(1000, 1000);
        let quad = Quad::rectangle(1000.0, 1000.0);
        let out = rectify(&source, &quad, 2000).unwrap();
        assert_eq!(out.size(), ImageSize::new(1000, 1000));
        assert!(out.pixels().pixels().all(|p| p.0[3] == 255));
        assert_eq!(out.pixels(), &source);
    }

    #[test]
    fn output_size_uses_longest_edges() {
        let quad = Quad::from_corners([
            Point::new(10.0, 20.0),
            Point::new(310.0, 20.0),
            Point::new(330.5, 420.0),
            Point::new(0.0, 400.0),
        ]);
        let size = output_size(&quad, 2000).unwrap();
        assert_eq!(size.width, quad.bottom_edge().floor() as u32);
        assert_eq!(size.height, quad.left_edge().max(quad.right_edge()).floor() as u32);
    }

    #[test]
    fn oversize_selection_is_capped_with_aspect_preserved() {
        let wide = Quad::rectangle(6000.0, 1500.0);
        assert_eq!(output_size(&wide, 2000).unwrap(), ImageSize::new(2000, 500));

        let tall = Quad::rectangle(2400.0, 4000.0);
        assert_eq!(output_size(&tall, 2000).unwrap(), ImageSize::new(1200, 2000));

        let odd = Quad::from_corners([
            Point::new(0.0, 0.0),
            Point::new(4031.0, 90.0),
            Point::new(3900.0, 3023.0),
            Point::new(120.0, 2950.0),
        ]);
        let (mw, mh) = odd.measured_size();
        let size = output_size(&odd, 2000).unwrap();
        assert!(size.width <= 2000 && size.height <= 2000);
        let ratio = size.width as f64 / size.height as f64;
        assert!((ratio - mw / mh).abs() < 2.0 / size.height as f64, "{ratio} vs {}", mw / mh);
    }

    #[test]
    fn small_selection_is_not_upscaled() {
        assert_eq!(
            output_size(&Quad::rectangle(640.5, 480.9), 2000).unwrap(),
            ImageSize::new(640, 480)
        );
    }

    #[test]
    fn cap_applies_to_pixels_too() {
        let source = pattern(400, 200);
        let rectifier = Rectifier::default().with_max_dimension(100);
        let out = rectifier.rectify(&source, &Quad::rectangle(400.0, 200.0)).unwrap();
        assert_eq!(out.size(), ImageSize::new(100, 50));
        // Downsampled by 4: output (x, y) samples source (4x, 4y).
        assert_eq!(out.pixels().get_pixel(10, 5), source.get_pixel(40, 20));
    }

    #[test]
    fn pixels_outside_photo_are_transparent() {
        let source = pattern(100, 100);
        let quad = Quad::from_corners([
            Point::new(-50.0, -50.0),
            Point::new(150.0, -50.0),
            Point::new(150.0, 150.0),
            Point::new(-50.0, 150.0),
        ]);
        let out = rectify(&source, &quad, 2000).unwrap();
        assert_eq!(out.size(), ImageSize::new(200, 200));
        assert_eq!(out.pixels().get_pixel(10, 10).0[3], 0);
        assert_eq!(out.pixels().get_pixel(199, 120).0[3], 0);
        let inside = out.pixels().get_pixel(100, 100);
        assert_eq!(inside, source.get_pixel(50, 50));
    }

    #[test]
    fn skewed_selection_samples_inside_quad() {
        // Solid image with a red marker block around (300, 200).
        let mut source = RgbaImage::from_pixel(600, 400, Rgba([255, 255, 255, 255]));
        for y in 190..210 {
            for x in 290..310 {
                source.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let quad = Quad::from_corners([
            Point::new(100.0, 50.0),
            Point::new(520.0, 80.0),
            Point::new(480.0, 360.0),
            Point::new(120.0, 330.0),
        ]);
        let out = rectify(&source, &quad, 2000).unwrap();
        assert!(out.pixels().pixels().all(|p| p.0[3] == 255));
        assert!(out.pixels().pixels().any(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn collinear_selection_is_rejected() {
        let source = pattern(100, 100);
        let quad = Quad::from_corners([
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]);
        assert!(matches!(
            rectify(&source, &quad, 2000),
            Err(ScanError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn collapsed_selection_is_rejected() {
        let source = pattern(100, 100);
        let point = Point::new(40.0, 40.0);
        let quad = Quad::from_corners([point; 4]);
        assert!(matches!(
            rectify(&source, &quad, 2000),
            Err(ScanError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn rotating_once_swaps_dimensions_and_four_times_restores() {
        let original = RectifiedImage::new(pattern(800, 600));
        let once = original.rotate90();
        assert_eq!(once.size(), ImageSize::new(600, 800));
        let four = once.rotate90().rotate90().rotate90();
        assert_eq!(four.size(), ImageSize::new(800, 600));
        assert_eq!(four, original);
    }

    #[test]
    fn rotate_encoded_swaps_dimensions_and_renames() {
        let rectifier = Rectifier::default().with_format(DocumentType::Png);
        let file = rectifier.encode(&RectifiedImage::new(pattern(80, 60))).unwrap();
        assert_eq!(file.name, "scanned_doc.png");
        let rotated = rectifier.rotate_encoded(&file).unwrap();
        assert_eq!(rotated.name, "scanned_doc_rotated.png");
        assert_eq!(rotated.size, ImageSize::new(60, 80));
        assert_eq!(rotated.mime_type(), "image/png");
    }

    #[test]
    fn rectify_bytes_rejects_undecodable_input() {
        let err = Rectifier::default()
            .rectify_bytes(b"\x00\x01\x02", &Quad::rectangle(10.0, 10.0))
            .unwrap_err();
        assert!(matches!(err, ScanError::ImageDecode(_)));
    }

    #[test]
    fn rectify_bytes_encodes_jpeg_at_output_size() {
        let png = ImageProcessor::from_rgba(pattern(120, 90)).to_png_bytes().unwrap();
        let quad = Quad::inset(ImageSize::new(120, 90), 0.1);
        let file = Rectifier::default().rectify_bytes(&png, &quad).unwrap();
        assert_eq!(file.document_type, DocumentType::Jpeg);
        assert_eq!(file.name, "scanned_doc.jpg");
        assert_eq!(file.size, ImageSize::new(96, 72));
    }
}
