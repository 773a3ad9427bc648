// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-document: Document rectification engine.
//
// Maps pointer input between screen and photo coordinates, solves the
// four-point homography for the selected document corners, resamples the
// photo into an upright rectangle, and rotates the result in quarter turns.

pub mod geometry;
pub mod homography;
pub mod image;
pub mod scan;

// Re-export the primary types so callers can use `docscan_document::Rectifier` etc.
pub use geometry::mapper::{CoordinateMapper, DisplayFit, compute_fit};
pub use homography::solver::{Homography, solve_homography};
pub use crate::image::processor::ImageProcessor;
pub use scan::overlay::render_overlay;
pub use scan::rectify::{RectifiedImage, Rectifier};
pub use scan::session::{DragEvent, RectificationSession};
pub use scan::worker::{RectifyJob, RectifyOutcome, RectifyRequest};
