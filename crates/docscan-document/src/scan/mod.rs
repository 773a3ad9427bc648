// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: interactive corner selection, perspective rectification
// (in the foreground or on a background task), rotation, and preview
// rendering.

pub mod overlay;
pub mod rectify;
pub mod session;
pub mod worker;

pub use overlay::render_overlay;
pub use rectify::{RectifiedImage, Rectifier, output_size, rectify};
pub use session::{DragEvent, RectificationSession};
pub use worker::{RectifyJob, RectifyOutcome, RectifyRequest};
