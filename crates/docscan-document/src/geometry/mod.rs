// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry module: mapping between image space and display space under an
// aspect-preserving "contain" layout, plus corner hit-testing.

pub mod mapper;

pub use mapper::{CoordinateMapper, DisplayFit, compute_fit};
