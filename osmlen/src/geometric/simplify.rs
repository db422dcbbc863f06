use tracing::debug;

use crate::error::{Error, Result};
use crate::geo_core::Shape;

/// Tolerance of the first pass, and the amount added after every pass.
pub const TOLERANCE_STEP: f64 = 0.005;
pub const DEFAULT_TEXT_LIMIT: usize = 1000;
pub const DEFAULT_MAX_PASSES: usize = 200;

/// Reduces vertex count until the well-known text of a shape is shorter than `limit`.
#[derive(Debug, Clone, Copy)]
pub struct Simplifier {
    /// Exclusive upper bound on the WKT character count.
    pub limit: usize,
    /// Tolerance increment, in the shape's coordinate units.
    pub step: f64,
    /// Passes attempted before giving up.
    pub max_passes: usize,
}

impl Default for Simplifier {
    fn default() -> Self {
        Simplifier {
            limit: DEFAULT_TEXT_LIMIT,
            step: TOLERANCE_STEP,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Simplifier {
    pub fn new(limit: usize, max_passes: usize) -> Self {
        Simplifier {
            limit,
            max_passes,
            ..Default::default()
        }
    }

    #[inline]
    pub fn fits(&self, shape: &Shape) -> bool {
        shape.to_wkt_string().len() < self.limit
    }

    /// Simplify with tolerances step, 2*step, 3*step, ... until the text fits.
    /// Each pass works on the output of the previous one.
    /// A shape that already fits is returned unchanged.
    pub fn simplify(&self, shape: &Shape) -> Result<Shape> {
        let mut current = shape.clone();
        let mut tolerance = self.step;
        let mut passes = 0;

        loop {
            let length = current.to_wkt_string().len();
            if length < self.limit {
                if passes > 0 {
                    debug!(
                        passes,
                        length,
                        vertices_before = shape.vertex_count(),
                        vertices_after = current.vertex_count(),
                        "simplified piece"
                    );
                }
                return Ok(current);
            }
            if passes == self.max_passes {
                return Err(Error::SimplificationNonConvergence {
                    limit: self.limit,
                    passes,
                    length,
                });
            }
            current = current.simplify(tolerance);
            tolerance += self.step;
            passes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, Polygon};

    /// Circle-like ring with `n` vertices of radius `r` around (cx, cy).
    fn ring(n: usize, r: f64, cx: f64, cy: f64) -> Shape {
        let coords: Vec<Coord<f64>> = (0..n)
            .map(|i| {
                let angle = i as f64 / n as f64 * std::f64::consts::TAU;
                Coord {
                    x: cx + r * angle.cos(),
                    y: cy + r * angle.sin(),
                }
            })
            .collect();
        Shape::Polygon(Polygon::new(LineString(coords), vec![]))
    }

    #[test]
    fn test_shape_under_budget_is_unchanged() {
        let shape = ring(8, 1.0, 0.0, 0.0);
        let simplifier = Simplifier::default();
        assert!(simplifier.fits(&shape));

        let once = simplifier.simplify(&shape).unwrap();
        assert_eq!(once, shape);
        let twice = simplifier.simplify(&once).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_detailed_ring_is_reduced_below_budget() {
        let shape = ring(500, 0.5, 4.35, 50.85);
        let simplifier = Simplifier::default();
        assert!(!simplifier.fits(&shape));

        let simplified = simplifier.simplify(&shape).unwrap();
        assert!(simplified.to_wkt_string().len() < simplifier.limit);
        assert!(simplified.vertex_count() < shape.vertex_count());
    }

    #[test]
    fn test_unreachable_budget_is_reported() {
        let shape = ring(100, 1.0, 0.0, 0.0);
        let simplifier = Simplifier::new(5, 10);
        let err = simplifier.simplify(&shape).unwrap_err();
        match err {
            Error::SimplificationNonConvergence { limit, passes, .. } => {
                assert_eq!(limit, 5);
                assert_eq!(passes, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
