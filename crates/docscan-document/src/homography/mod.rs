// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Homography module: four-point projective transform estimation.

pub mod solver;

pub use solver::{Homography, solve_homography, solve_homography_with_epsilon};
