use geo::Polygon;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::geo_core::Shape;

/// Default recursion depth at which an oversized piece is accepted as-is.
pub const MAX_DEPTH: usize = 250;

/// Adaptive splitter: halves a shape across its longer side until every piece
/// satisfies a stopping predicate.
#[derive(Debug, Clone, Copy)]
pub struct Decomposer {
    /// Depth at which pieces are accepted without testing further.
    pub max_depth: usize,
}

impl Default for Decomposer {
    fn default() -> Self {
        Decomposer { max_depth: MAX_DEPTH }
    }
}

impl Decomposer {
    pub fn new(max_depth: usize) -> Self {
        Decomposer { max_depth }
    }

    /// Split `shape` into single polygons that each satisfy `fits(piece, limit)`,
    /// or that were reached at `max_depth`.
    ///
    /// Pieces come out in depth-first order, lower/left half before upper/right half.
    /// Multi-part pieces are flattened into their polygons only at the end.
    /// Errors raised by `fits` are propagated unchanged.
    pub fn decompose<F>(&self, shape: Shape, limit: f64, mut fits: F) -> Result<Vec<Polygon<f64>>>
    where
        F: FnMut(&Shape, f64) -> Result<bool>,
    {
        let mut leaves: Vec<Shape> = Vec::new();
        let mut at_cap = 0usize;
        // LIFO: the second half is pushed first so the first half is explored first
        let mut stack: Vec<(Shape, usize)> = vec![(shape, 0)];

        while let Some((piece, depth)) = stack.pop() {
            if fits(&piece, limit)? {
                leaves.push(piece);
                continue;
            }
            if depth >= self.max_depth {
                at_cap += 1;
                leaves.push(piece);
                continue;
            }

            let bounds = piece.bounds().ok_or(Error::EmptyGeometry)?;
            let [first, second] = bounds.halves();
            trace!(depth, ?bounds, "splitting piece");

            for half in [second, first] {
                if let Some(part) = piece.intersection(&half.to_rect()) {
                    stack.push((part, depth + 1));
                }
            }
        }

        if at_cap > 0 {
            debug!(at_cap, max_depth = self.max_depth, "pieces accepted at depth cap");
        }

        let polygons: Vec<Polygon<f64>> = leaves.into_iter().flat_map(Shape::into_polygons).collect();
        debug!(pieces = polygons.len(), limit, "decomposition finished");
        Ok(polygons)
    }
}
