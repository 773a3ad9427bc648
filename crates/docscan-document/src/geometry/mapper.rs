// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate mapper: converts between natural image pixels and on-screen
// display pixels when the image is drawn "contain"-fitted (scaled to fit the
// viewport, centred, letterboxed or pillarboxed).

use docscan_core::error::{Result, ScanError};
use docscan_core::{Corner, ImageSize, Point, Quad, Viewport};

/// Placement of the image inside the viewport, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFit {
    pub draw_width: f64,
    pub draw_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Compute the aspect-preserving fit of `image` inside `viewport`.
///
/// An image wider (relative to its height) than the viewport spans the full
/// viewport width and is centred vertically; otherwise it spans the full
/// height and is centred horizontally.
pub fn compute_fit(image: ImageSize, viewport: Viewport) -> Result<DisplayFit> {
    if !viewport.has_area() {
        return Err(ScanError::ViewportUnavailable {
            width: viewport.width,
            height: viewport.height,
        });
    }
    if image.is_empty() {
        return Err(ScanError::EmptyImage);
    }

    let image_aspect = image.aspect();
    let view_aspect = viewport.width / viewport.height;

    let fit = if image_aspect > view_aspect {
        let draw_height = viewport.width / image_aspect;
        DisplayFit {
            draw_width: viewport.width,
            draw_height,
            offset_x: 0.0,
            offset_y: (viewport.height - draw_height) / 2.0,
        }
    } else {
        let draw_width = viewport.height * image_aspect;
        DisplayFit {
            draw_width,
            draw_height: viewport.height,
            offset_x: (viewport.width - draw_width) / 2.0,
            offset_y: 0.0,
        }
    };
    Ok(fit)
}

/// Bidirectional image/display mapping for one image in one viewport.
///
/// Rebuild it whenever either size changes; it holds no other state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    image: ImageSize,
    viewport: Viewport,
    fit: DisplayFit,
}

impl CoordinateMapper {
    pub fn new(image: ImageSize, viewport: Viewport) -> Result<Self> {
        let fit = compute_fit(image, viewport)?;
        Ok(Self {
            image,
            viewport,
            fit,
        })
    }

    pub fn fit(&self) -> DisplayFit {
        self.fit
    }

    pub fn image_size(&self) -> ImageSize {
        self.image
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Map a display coordinate back into image space, clamped to the image.
    pub fn to_image_space(&self, pos: Point) -> Point {
        let w = self.image.width as f64;
        let h = self.image.height as f64;
        Point::new(
            (pos.x - self.fit.offset_x) * w / self.fit.draw_width,
            (pos.y - self.fit.offset_y) * h / self.fit.draw_height,
        )
        .clamp_to(self.image)
    }

    /// Map an image coordinate to where it is drawn on screen.
    pub fn to_display_space(&self, image: Point) -> Point {
        let w = self.image.width as f64;
        let h = self.image.height as f64;
        Point::new(
            self.fit.offset_x + image.x / w * self.fit.draw_width,
            self.fit.offset_y + image.y / h * self.fit.draw_height,
        )
    }

    /// Display-space positions of all four handles, TL, TR, BR, BL.
    pub fn handles(&self, quad: &Quad) -> [Point; 4] {
        quad.corners().map(|p| self.to_display_space(p))
    }

    /// Find the corner handle closest to a pointer-down position.
    ///
    /// Only handles strictly closer than `radius` count. On equal distance
    /// the earlier corner in TL, TR, BR, BL order wins.
    pub fn hit_test(&self, pos: Point, quad: &Quad, radius: f64) -> Option<Corner> {
        let mut best: Option<Corner> = None;
        let mut best_distance = radius;
        for (corner, handle) in Corner::ALL.into_iter().zip(self.handles(quad)) {
            let distance = handle.distance(pos);
            if distance < best_distance {
                best_distance = distance;
                best = Some(corner);
            }
        }
        best
    }
}
