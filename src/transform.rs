//! Perspective transformation for the capture preview
//!
//! The pre-recorded main video shows a frame (a picture, a mirror, a sign)
//! at an angle. This module computes the projective mapping that takes a
//! `width`x`height` rectangle onto that quadrilateral so the live camera
//! feed or an overlay can be displayed skewed to match the footage.

use serde::Serialize;

use crate::quad::{Quad, Rect};
use crate::solver::{solve, SolveError};

/// Below this determinant the mapping collapses the plane onto a line
const DEGENERATE_DETERMINANT: f64 = 1e-10;

/// Projective mapping `x' = (ax+by+c)/(gx+hy+1)`, `y' = (dx+ey+f)/(gx+hy+1)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    /// Coefficients a, b, c, d, e, f, g, h
    coeffs: [f64; 8],
}

impl Homography {
    /// 3x3 matrix in row-major order
    pub fn matrix3(&self) -> [f64; 9] {
        let [a, b, c, d, e, f, g, h] = self.coeffs;
        [a, b, c, d, e, f, g, h, 1.0]
    }

    /// 4x4 matrix in column-major order, ready for a CSS `matrix3d()`
    pub fn matrix3d(&self) -> [f64; 16] {
        let [a, b, c, d, e, f, g, h] = self.coeffs;
        [
            a, d, 0.0, g, //
            b, e, 0.0, h, //
            0.0, 0.0, 1.0, 0.0, //
            c, f, 0.0, 1.0,
        ]
    }

    /// Transform a point from rectangle space into quad space
    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f, g, h] = self.coeffs;
        let w = g * x + h * y + 1.0;
        if w.abs() < 1e-10 {
            return (x, y); // Avoid division by zero
        }
        ((a * x + b * y + c) / w, (d * x + e * y + f) / w)
    }

    fn determinant(&self) -> f64 {
        let [a, b, c, d, e, f, g, h] = self.coeffs;
        a * (e - f * h) - b * (d - f * g) + c * (d * h - e * g)
    }
}

/// Compute the mapping from the `width`x`height` rectangle onto `quad`
/// (pixel coordinates, clockwise from top-left).
///
/// Returns `None` when the system is singular or the quad is degenerate
/// (three collinear corners); callers fall back to an untransformed placement.
pub fn compute_transform(quad: [(f64, f64); 4], width: f64, height: f64) -> Option<Homography> {
    match solve_homography(quad, width, height) {
        Ok(h) => Some(h),
        Err(e) => {
            tracing::debug!("Perspective transform unavailable: {}", e);
            None
        }
    }
}

fn solve_homography(
    quad: [(f64, f64); 4],
    width: f64,
    height: f64,
) -> Result<Homography, SolveError> {
    let src = [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)];

    // For each correspondence (x,y) -> (x',y') we get two equations:
    //   a*x + b*y + c - g*x*x' - h*y*x' = x'
    //   d*x + e*y + f - g*x*y' - h*y*y' = y'
    let mut a = [[0.0f64; 8]; 8];
    let mut b = [0.0f64; 8];

    for i in 0..4 {
        let (x, y) = src[i];
        let (xp, yp) = quad[i];

        a[i * 2] = [x, y, 1.0, 0.0, 0.0, 0.0, -xp * x, -xp * y];
        b[i * 2] = xp;

        a[i * 2 + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -yp * x, -yp * y];
        b[i * 2 + 1] = yp;
    }

    let coeffs = solve(a, b)?;
    let homography = Homography { coeffs };

    let det = homography.determinant();
    if !(det.abs() > DEGENERATE_DETERMINANT) {
        return Err(SolveError::Singular { column: 8 });
    }

    Ok(homography)
}

/// How the dependent element (camera preview, overlay) is placed on stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PreviewPlacement {
    /// Axis-aligned origin + size in stage pixels
    Rect {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    /// Full-stage element skewed by a `matrix3d` (column-major)
    Matrix { matrix: [f64; 16] },
    /// Degenerate quad: full-stage element without a transform
    Identity,
}

impl PreviewPlacement {
    /// Place an element for `quad` on a `stage_width`x`stage_height` stage.
    ///
    /// `rectangle` selects the exact bounding-box placement, which cannot shear
    /// but gives up independent corners.
    pub fn for_quad(quad: &Quad, rectangle: bool, stage_width: f64, stage_height: f64) -> Self {
        if rectangle {
            let Rect {
                x,
                y,
                width,
                height,
            } = quad.bounding_rect();
            return PreviewPlacement::Rect {
                left: x * stage_width,
                top: y * stage_height,
                width: width * stage_width,
                height: height * stage_height,
            };
        }

        let quad_px = quad.to_pixels(stage_width, stage_height);
        match compute_transform(quad_px, stage_width, stage_height) {
            Some(h) => PreviewPlacement::Matrix {
                matrix: h.matrix3d(),
            },
            None => {
                tracing::warn!("Preview quad is degenerate, using identity placement");
                PreviewPlacement::Identity
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::Point;

    const IDENTITY_4X4: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ];

    #[test]
    fn test_canonical_rectangle_is_identity() {
        let (w, h) = (1080.0, 1920.0);
        let quad = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let transform = compute_transform(quad, w, h).expect("rectangle must solve");
        for (got, want) in transform.matrix3d().iter().zip(IDENTITY_4X4.iter()) {
            assert!((got - want).abs() < 1e-9, "{:?}", transform.matrix3d());
        }
    }

    #[test]
    fn test_corners_map_onto_quad() {
        let quad = [(10.0, 12.0), (90.0, 5.0), (95.0, 80.0), (3.0, 99.0)];
        let transform = compute_transform(quad, 100.0, 100.0).unwrap();
        let src = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)];
        for (s, d) in src.iter().zip(quad.iter()) {
            let (x, y) = transform.transform_point(s.0, s.1);
            assert!((x - d.0).abs() < 1e-6);
            assert!((y - d.1).abs() < 1e-6);
        }
    }

    #[test]
    fn test_inset_scale() {
        let quad = [(10.0, 10.0), (90.0, 10.0), (90.0, 90.0), (10.0, 90.0)];
        let transform = compute_transform(quad, 100.0, 100.0).unwrap();
        let (x, y) = transform.transform_point(50.0, 50.0);
        assert!((x - 50.0).abs() < 1e-9);
        assert!((y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_collinear_points_is_none() {
        let quad = [(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (0.0, 100.0)];
        assert!(compute_transform(quad, 100.0, 100.0).is_none());

        let quad = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (100.0, 200.0)];
        assert!(compute_transform(quad, 100.0, 100.0).is_none());
    }

    #[test]
    fn test_collapsed_quad_is_none() {
        let quad = [(20.0, 20.0); 4];
        assert!(compute_transform(quad, 100.0, 100.0).is_none());
    }

    #[test]
    fn test_rectangle_placement_bypasses_matrix() {
        let quad = Quad([
            Point::new(0.1, 0.2),
            Point::new(0.9, 0.25),
            Point::new(0.85, 0.8),
            Point::new(0.15, 0.75),
        ]);
        let placement = PreviewPlacement::for_quad(&quad, true, 1000.0, 2000.0);
        match placement {
            PreviewPlacement::Rect {
                left,
                top,
                width,
                height,
            } => {
                assert!((left - 100.0).abs() < 1e-9);
                assert!((top - 400.0).abs() < 1e-9);
                assert!((width - 800.0).abs() < 1e-9);
                assert!((height - 1200.0).abs() < 1e-9);
            }
            other => panic!("unexpected placement {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_free_quad_falls_back_to_identity() {
        let quad = Quad([
            Point::new(0.1, 0.1),
            Point::new(0.5, 0.1),
            Point::new(0.9, 0.1),
            Point::new(0.1, 0.9),
        ]);
        let placement = PreviewPlacement::for_quad(&quad, false, 1080.0, 1920.0);
        assert_eq!(placement, PreviewPlacement::Identity);
    }
}
