//! # Ring clipping
//!
//! Cuts a ring along the infinite line through two anchors. The first two crossings of the line
//! (in ring order) split the ring into two arcs, one running forwards around the ring and one
//! backwards. Both arcs start at the first crossing and end at the second.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use ordered_float::OrderedFloat;

use super::{BoundaryAnchor, BoundaryRing, ClipMode, HeadlandError};
use crate::geom;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A crossing of the clip line with a ring edge.
#[derive(Debug, Copy, Clone)]
struct Cut {
    segment_index: usize,
    t: f64,
    point_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Clip the ring along the line through the two anchors, returning an open polyline.
///
/// In `Curve` mode the longer of the two arcs is kept, in `Line` mode the shorter. The ring itself
/// is not modified.
pub fn clip_at_line(
    ring: &BoundaryRing,
    anchor_1: &BoundaryAnchor,
    anchor_2: &BoundaryAnchor,
    mode: ClipMode,
) -> Result<Vec<Vector2<f64>>, HeadlandError> {
    let (forward, backward) = split_at_line(ring, anchor_1, anchor_2)?;

    let forward_len = geom::polyline_length(&forward, false);
    let backward_len = geom::polyline_length(&backward, false);

    debug!(
        "Clip of ring rev {}: forward arc {:.1} m, backward arc {:.1} m, keeping {:?}",
        ring.revision(),
        forward_len,
        backward_len,
        mode
    );

    let forward_is_longer = forward_len >= backward_len;

    Ok(match (mode, forward_is_longer) {
        (ClipMode::Curve, true) | (ClipMode::Line, false) => forward,
        _ => backward,
    })
}

/// Split the ring into its forward and backward arcs between the first two crossings of the line
/// through the anchors.
pub(crate) fn split_at_line(
    ring: &BoundaryRing,
    anchor_1: &BoundaryAnchor,
    anchor_2: &BoundaryAnchor,
) -> Result<(Vec<Vector2<f64>>, Vec<Vector2<f64>>), HeadlandError> {
    let p1 = anchor_1.resolve(ring)?;
    let p2 = anchor_2.resolve(ring)?;

    if (p2 - p1).norm() < geom::EPSILON {
        return Err(HeadlandError::DegenerateClipLine);
    }

    // A crossing exactly at a vertex is reported by the edge starting there only
    let mut cuts: Vec<Cut> = ring
        .edges()
        .enumerate()
        .filter_map(|(i, (a, b))| {
            geom::line_segment_intersect(&p1, &p2, &a, &b)
                .filter(|&(_, t)| t < 1.0)
                .map(|(point_m, t)| Cut {
                    segment_index: i,
                    t,
                    point_m,
                })
        })
        .collect();

    if cuts.len() < 2 {
        return Err(HeadlandError::TooFewIntersections(cuts.len()));
    }

    cuts.sort_by_key(|c| (c.segment_index, OrderedFloat(c.t)));

    let (c1, c2) = (cuts[0], cuts[1]);
    let pts = ring.points();
    let n = pts.len();

    // Forward: vertices after the first cut up to the start of the second cut's edge
    let mut forward = vec![c1.point_m];
    forward.extend_from_slice(&pts[(c1.segment_index + 1)..=c2.segment_index]);
    forward.push(c2.point_m);

    // Backward: from the first cut's edge start back round to the end of the second cut's edge
    let mut backward = vec![c1.point_m];
    let stop = (c2.segment_index + 1) % n;
    let mut idx = c1.segment_index;
    loop {
        backward.push(pts[idx]);
        if idx == stop {
            break;
        }
        idx = (idx + n - 1) % n;
    }
    backward.push(c2.point_m);

    Ok((
        geom::dedup_points(&forward, geom::EPSILON, false),
        geom::dedup_points(&backward, geom::EPSILON, false),
    ))
}
