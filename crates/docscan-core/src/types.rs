// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docscan rectification engine.
//
// Two coordinate spaces exist and are never mixed: image space (pixels of the
// original photo, origin top-left) and display space (pixels of the on-screen
// viewport the photo is letterboxed into). `Point` carries no tag; the type
// that owns a point documents which space it lives in.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScanError};

/// Unique identifier for a rectification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Clamp into `[0, width] x [0, height]`.
    pub fn clamp_to(self, size: ImageSize) -> Self {
        Self {
            x: self.x.clamp(0.0, size.width as f64),
            y: self.y.clamp(0.0, size.height as f64),
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Pixel dimensions of a raster image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Largest width or height, in pixels, of any image the scanner allocates.
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

/// On-screen area the source photo is drawn into, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A viewport is usable only once layout has given it a positive area.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// True if a canvas of this size stays within [`MAX_IMAGE_DIMENSION`].
    pub fn fits_canvas(&self) -> bool {
        let max = f64::from(MAX_IMAGE_DIMENSION);
        self.has_area() && self.width <= max && self.height <= max
    }
}

/// One of the four document corners, in selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// All corners in index order (TL, TR, BR, BL).
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Position of this corner in the selection order.
    pub fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BottomRight => 2,
            Self::BottomLeft => 3,
        }
    }

    /// Resolve an index coming from a pointer event.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ScanError::InvalidCorner(index))
    }
}

/// The user's document selection: four corners in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quad {
    /// Build from corners ordered TL, TR, BR, BL.
    pub fn from_corners(corners: [Point; 4]) -> Self {
        let [top_left, top_right, bottom_right, bottom_left] = corners;
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// The axis-aligned rectangle `(0,0)-(width,height)`.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self::from_corners([
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(width, height),
            Point::new(0.0, height),
        ])
    }

    /// Rectangle inset from each image edge by `fraction` of that dimension.
    ///
    /// This is the starting selection when a new photo is loaded.
    pub fn inset(size: ImageSize, fraction: f64) -> Self {
        let w = size.width as f64;
        let h = size.height as f64;
        let (x0, x1) = (w * fraction, w * (1.0 - fraction));
        let (y0, y1) = (h * fraction, h * (1.0 - fraction));
        Self::from_corners([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    /// Corners in TL, TR, BR, BL order.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::TopLeft => self.top_left,
            Corner::TopRight => self.top_right,
            Corner::BottomRight => self.bottom_right,
            Corner::BottomLeft => self.bottom_left,
        }
    }

    fn corner_mut(&mut self, corner: Corner) -> &mut Point {
        match corner {
            Corner::TopLeft => &mut self.top_left,
            Corner::TopRight => &mut self.top_right,
            Corner::BottomRight => &mut self.bottom_right,
            Corner::BottomLeft => &mut self.bottom_left,
        }
    }

    /// Move one corner, clamping it into the image bounds.
    pub fn set_corner(&mut self, corner: Corner, point: Point, bounds: ImageSize) {
        *self.corner_mut(corner) = point.clamp_to(bounds);
    }

    /// Copy of this selection with every corner clamped into the image bounds.
    pub fn clamped(&self, bounds: ImageSize) -> Self {
        Self::from_corners(self.corners().map(|p| p.clamp_to(bounds)))
    }

    pub fn top_edge(&self) -> f64 {
        self.top_left.distance(self.top_right)
    }

    pub fn bottom_edge(&self) -> f64 {
        self.bottom_left.distance(self.bottom_right)
    }

    pub fn left_edge(&self) -> f64 {
        self.top_left.distance(self.bottom_left)
    }

    pub fn right_edge(&self) -> f64 {
        self.top_right.distance(self.bottom_right)
    }

    /// Width and height of the flattened document: the longer of each pair
    /// of opposite edges.
    pub fn measured_size(&self) -> (f64, f64) {
        (
            self.top_edge().max(self.bottom_edge()),
            self.left_edge().max(self.right_edge()),
        )
    }
}

/// Supported encoded output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Jpeg,
    Png,
}

impl DocumentType {
    /// MIME type string for uploads.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s)
            .ok_or_else(|| ScanError::Config(format!("unsupported output format: {s}")))
    }
}

/// An encoded image held in memory, ready to hand back to the capture flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Suggested file name, e.g. `scanned_doc.jpg`.
    pub name: String,
    pub document_type: DocumentType,
    /// Pixel dimensions of the encoded image.
    pub size: ImageSize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ScannedFile {
    pub fn mime_type(&self) -> &'static str {
        self.document_type.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inset_quad_is_ten_percent_in() {
        let quad = Quad::inset(ImageSize::new(1000, 500), 0.1);
        assert_eq!(quad.top_left, Point::new(100.0, 50.0));
        assert_eq!(quad.top_right, Point::new(900.0, 50.0));
        assert_eq!(quad.bottom_right, Point::new(900.0, 450.0));
        assert_eq!(quad.bottom_left, Point::new(100.0, 450.0));
    }

    #[test]
    fn set_corner_clamps_into_bounds() {
        let bounds = ImageSize::new(200, 100);
        let mut quad = Quad::inset(bounds, 0.1);
        quad.set_corner(Corner::BottomRight, Point::new(250.0, -3.0), bounds);
        assert_eq!(quad.bottom_right, Point::new(200.0, 0.0));
        // Other corners untouched.
        assert_eq!(quad.top_left, Point::new(20.0, 10.0));
    }

    #[test]
    fn measured_size_takes_longer_edges() {
        let quad = Quad::from_corners([
            Point::new(10.0, 10.0),
            Point::new(110.0, 10.0),
            Point::new(130.0, 60.0),
            Point::new(0.0, 60.0),
        ]);
        let (w, h) = quad.measured_size();
        assert!((w - 130.0).abs() < 1e-9);
        assert!((h - quad.right_edge()).abs() < 1e-9);
        assert!(quad.right_edge() > quad.left_edge());
    }

    #[test]
    fn corner_index_round_trips_and_rejects_out_of_range() {
        for (i, corner) in Corner::ALL.iter().enumerate() {
            assert_eq!(corner.index(), i);
            assert_eq!(Corner::from_index(i).unwrap(), *corner);
        }
        assert!(matches!(Corner::from_index(4), Err(ScanError::InvalidCorner(4))));
    }

    #[test]
    fn document_type_from_extension() {
        assert_eq!(DocumentType::from_extension("JPG"), Some(DocumentType::Jpeg));
        assert_eq!(DocumentType::from_extension("png"), Some(DocumentType::Png));
        assert_eq!(DocumentType::from_extension("tiff"), None);
        assert_eq!(DocumentType::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn zero_viewport_has_no_area() {
        assert!(!Viewport::new(0.0, 300.0).has_area());
        assert!(!Viewport::new(300.0, -1.0).has_area());
        assert!(Viewport::new(1.0, 1.0).has_area());
    }

    #[test]
    fn canvas_viewports_are_bounded() {
        assert!(Viewport::new(390.0, 640.0).fits_canvas());
        assert!(Viewport::new(16_384.0, 1.0).fits_canvas());
        assert!(!Viewport::new(16_385.0, 1.0).fits_canvas());
        assert!(!Viewport::new(1.0, 1e12).fits_canvas());
        assert!(!Viewport::new(0.0, 10.0).fits_canvas());
    }
}
