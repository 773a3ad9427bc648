// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography solver.
//
// Builds the 8x8 linear system of the direct linear transform with the
// bottom-right matrix element fixed at 1 and solves it by Gaussian elimination
// with partial pivoting. Near-zero pivots and point sets that are not in
// general position are reported as `DegenerateGeometry`.

use docscan_core::error::{Result, ScanError};
use docscan_core::Point;
use tracing::{debug, instrument, trace};

/// Default relative pivot threshold.
pub const DEFAULT_SINGULAR_EPSILON: f64 = 1e-10;

/// Sine of the smallest angle a corner triple may span before it is treated
/// as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Names used in degeneracy messages.
const CORNER_NAMES: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];

/// A 3x3 projective transform with `h8 = 1`, stored as `h0..h7`.
///
/// Maps `(x, y)` to
/// `((h0 x + h1 y + h2) / w, (h3 x + h4 y + h5) / w)` with `w = h6 x + h7 y + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    h: [f64; 8],
}

impl Homography {
    pub const fn identity() -> Self {
        Self {
            h: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        }
    }

    pub const fn from_coefficients(h: [f64; 8]) -> Self {
        Self { h }
    }

    pub fn coefficients(&self) -> [f64; 8] {
        self.h
    }

    /// Row-major 3x3 matrix with the implicit `h8 = 1` filled in.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        let h = &self.h;
        [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]]
    }

    /// Homogeneous weight `h6 x + h7 y + 1` at `(x, y)`.
    #[inline]
    pub fn weight(&self, x: f64, y: f64) -> f64 {
        self.h[6] * x + self.h[7] * y + 1.0
    }

    /// Apply the transform. The result is non-finite when `(x, y)` lies on
    /// the line at infinity of this transform; see [`Homography::project`].
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        let h = &self.h;
        let w = self.weight(p.x, p.y);
        Point::new(
            (h[0] * p.x + h[1] * p.y + h[2]) / w,
            (h[3] * p.x + h[4] * p.y + h[5]) / w,
        )
    }

    /// Apply the transform, returning `None` where the weight vanishes.
    pub fn project(&self, p: Point) -> Option<Point> {
        let w = self.weight(p.x, p.y);
        if w.abs() < f64::EPSILON {
            return None;
        }
        let mapped = self.apply(p);
        (mapped.x.is_finite() && mapped.y.is_finite()).then_some(mapped)
    }
}

/// Solve for the transform taking each `src[i]` onto `dst[i]`.
pub fn solve_homography(src: &[Point; 4], dst: &[Point; 4]) -> Result<Homography> {
    solve_homography_with_epsilon(src, dst, DEFAULT_SINGULAR_EPSILON)
}

/// [`solve_homography`] with an explicit relative pivot threshold.
///
/// A pivot is singular when its magnitude is below `epsilon` times the largest
/// coefficient of the assembled system.
#[instrument(level = "debug", skip(src, dst))]
pub fn solve_homography_with_epsilon(
    src: &[Point; 4],
    dst: &[Point; 4],
    epsilon: f64,
) -> Result<Homography> {
    ensure_general_position(src, "source")?;
    ensure_general_position(dst, "destination")?;

    // Augmented 8x9 system: columns 0..8 are the unknowns, column 8 the
    // right-hand side.
    let mut a = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let (x, y) = (src[i].x, src[i].y);
        let (u, v) = (dst[i].x, dst[i].y);
        a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, u];
        a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, v];
    }

    let scale = a
        .iter()
        .flat_map(|row| row[..8].iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let threshold = epsilon * scale.max(1.0);

    for col in 0..8 {
        // Partial pivoting: largest magnitude in this column among the
        // remaining rows.
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for (row, values) in a.iter().enumerate().skip(col + 1) {
            let v = values[col].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }
        if max_val < threshold {
            debug!(col, max_val, threshold, "Singular homography system");
            return Err(ScanError::DegenerateGeometry(format!(
                "homography system is singular (pivot {max_val:e} in column {col})"
            )));
        }
        if max_row != col {
            a.swap(col, max_row);
        }

        let pivot_row = a[col];
        for row in a.iter_mut().skip(col + 1) {
            let factor = row[col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            row[col] = 0.0;
            for c in (col + 1)..9 {
                row[c] -= factor * pivot_row[c];
            }
        }
    }

    let mut h = [0.0f64; 8];
    for row in (0..8).rev() {
        let mut sum = a[row][8];
        for c in (row + 1)..8 {
            sum -= a[row][c] * h[c];
        }
        h[row] = sum / a[row][row];
    }

    if h.iter().any(|v| !v.is_finite()) {
        return Err(ScanError::DegenerateGeometry(
            "homography coefficients are not finite".into(),
        ));
    }

    trace!(?h, "Homography solved");
    Ok(Homography { h })
}

/// Reject point sets with a coincident pair or a collinear triple.
///
/// Such sets admit no invertible projective map; the 8x8 system may still be
/// solvable, but only by a rank-deficient matrix that collapses the image.
fn ensure_general_position(points: &[Point; 4], role: &str) -> Result<()> {
    if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(ScanError::DegenerateGeometry(format!(
            "{role} point ({}, {}) is not finite",
            p.x, p.y
        )));
    }

    for i in 0..4 {
        for j in (i + 1)..4 {
            for k in (j + 1)..4 {
                let (a, b, c) = (points[i], points[j], points[k]);
                let (abx, aby) = (b.x - a.x, b.y - a.y);
                let (acx, acy) = (c.x - a.x, c.y - a.y);
                let cross = abx * acy - aby * acx;
                let norms = abx.hypot(aby) * acx.hypot(acy);
                if cross.abs() <= COLLINEAR_TOLERANCE * norms {
                    return Err(ScanError::DegenerateGeometry(format!(
                        "{role} corners {}, {} and {} are collinear or coincident",
                        CORNER_NAMES[i], CORNER_NAMES[j], CORNER_NAMES[k]
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: [(f64, f64); 4]) -> [Point; 4] {
        raw.map(Point::from)
    }

    fn assert_maps(h: &Homography, src: &[Point; 4], dst: &[Point; 4]) {
        for (s, d) in src.iter().zip(dst) {
            let m = h.apply(*s);
            let tol = 1e-6 * d.x.abs().max(d.y.abs()).max(1.0);
            assert!(
                (m.x - d.x).abs() < tol && (m.y - d.y).abs() < tol,
                "{s:?} mapped to {m:?}, expected {d:?}"
            );
        }
    }

    #[test]
    fn identical_point_sets_give_identity() {
        let square = pts([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let h = solve_homography(&square, &square).unwrap();
        for (got, want) in h.coefficients().iter().zip(Homography::identity().coefficients()) {
            assert!((got - want).abs() < 1e-9, "{:?}", h.coefficients());
        }
    }

    #[test]
    fn axis_scaling_is_recovered() {
        let unit = pts([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let rect = pts([(0.0, 0.0), (200.0, 0.0), (200.0, 100.0), (0.0, 100.0)]);
        let h = solve_homography(&unit, &rect).unwrap();
        let c = h.coefficients();
        assert!((c[0] - 200.0).abs() < 1e-9);
        assert!((c[4] - 100.0).abs() < 1e-9);
        assert!(c[6].abs() < 1e-12 && c[7].abs() < 1e-12);
    }

    #[test]
    fn perspective_quad_maps_exactly() {
        let photo = pts([(412.0, 318.5), (3610.0, 522.0), (3390.25, 2950.0), (601.0, 2711.0)]);
        let page = pts([(0.0, 0.0), (2480.0, 0.0), (2480.0, 3508.0), (0.0, 3508.0)]);

        let forward = solve_homography(&photo, &page).unwrap();
        assert_maps(&forward, &photo, &page);

        let backward = solve_homography(&page, &photo).unwrap();
        assert_maps(&backward, &page, &photo);

        // Composition is the identity on an interior point.
        let p = Point::new(1500.0, 1600.0);
        let round = backward.apply(forward.apply(p));
        assert!((round.x - p.x).abs() < 1e-5 && (round.y - p.y).abs() < 1e-5);
    }

    #[test]
    fn self_intersecting_quad_still_solves() {
        // Bow-tie: BR and BL swapped. No three points are collinear.
        let src = pts([(0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (100.0, 100.0)]);
        let dst = pts([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let h = solve_homography(&src, &dst).unwrap();
        assert_maps(&h, &src, &dst);
    }

    #[test]
    fn collinear_source_triple_is_degenerate() {
        let src = pts([(0.0, 0.0), (50.0, 50.0), (100.0, 100.0), (0.0, 100.0)]);
        let dst = pts([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let err = solve_homography(&src, &dst).unwrap_err();
        assert!(matches!(err, ScanError::DegenerateGeometry(_)), "{err}");
    }

    #[test]
    fn coincident_destination_points_are_degenerate() {
        let src = pts([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let dst = pts([(5.0, 5.0), (5.0, 5.0), (5.0, 5.0), (5.0, 5.0)]);
        assert!(matches!(
            solve_homography(&src, &dst),
            Err(ScanError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn non_finite_input_is_degenerate() {
        let src = pts([(0.0, 0.0), (f64::NAN, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let dst = pts([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        assert!(solve_homography(&src, &dst).is_err());
    }

    #[test]
    fn project_rejects_points_at_infinity() {
        // w = 1 - x / 100 vanishes at x = 100.
        let h = Homography::from_coefficients([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, -0.01, 0.0]);
        assert!(h.project(Point::new(100.0, 3.0)).is_none());
        assert!(h.project(Point::new(50.0, 3.0)).is_some());
    }

    #[test]
    fn matrix_has_unit_corner() {
        let m = Homography::identity().to_matrix();
        assert_eq!(m, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    }
}
