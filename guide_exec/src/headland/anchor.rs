//! # Boundary anchors
//!
//! An anchor records where an operator selected point lies on a ring as an edge index and a
//! parameter along that edge, rather than as raw coordinates. The anchor remembers the revision of
//! the ring it was made against so that it can tell when the ring has since been replaced.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use super::{BoundaryRing, HeadlandError};
use crate::geom;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on a ring.
#[derive(Debug, Copy, Clone, Serialize, PartialEq)]
pub struct BoundaryAnchor {
    /// Revision of the ring the anchor was made against
    pub ring_revision: u64,

    /// Index of the edge, which runs from vertex `segment_index` to the next vertex
    pub segment_index: usize,

    /// Parameter along the edge in `[0, 1]`
    pub t: f64,

    /// World position of the anchor when it was made
    pub position_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Snap a query point onto the nearest point of the ring.
pub fn nearest_anchor(ring: &BoundaryRing, query_m: &Vector2<f64>) -> BoundaryAnchor {
    let mut best: Option<(usize, geom::Projection)> = None;

    for (i, (a, b)) in ring.edges().enumerate() {
        let proj = geom::project_to_segment(query_m, &a, &b);

        match best {
            Some((_, ref p)) if p.distance_m <= proj.distance_m => (),
            _ => best = Some((i, proj)),
        }
    }

    // Rings always have at least 3 edges
    let (segment_index, proj) = best.unwrap_or((
        0,
        geom::Projection {
            point_m: ring.points()[0],
            t: 0.0,
            distance_m: (query_m - ring.points()[0]).norm(),
        },
    ));

    BoundaryAnchor {
        ring_revision: ring.revision(),
        segment_index,
        t: proj.t,
        position_m: proj.point_m,
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BoundaryAnchor {
    /// True if the anchor was made against a different revision of the ring.
    pub fn is_stale(&self, ring: &BoundaryRing) -> bool {
        self.ring_revision != ring.revision()
    }

    /// Find the anchor's position on the given ring from its edge index and parameter.
    ///
    /// Resolving against a stale ring is an error.
    pub fn resolve(&self, ring: &BoundaryRing) -> Result<Vector2<f64>, HeadlandError> {
        if self.is_stale(ring) {
            return Err(HeadlandError::StaleAnchor {
                anchor: self.ring_revision,
                ring: ring.revision(),
            });
        }

        let (a, b) = ring.edge(self.segment_index);
        Ok(a + (b - a) * self.t)
    }
}
