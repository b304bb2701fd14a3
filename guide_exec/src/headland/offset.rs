//! # Inward ring offset
//!
//! Every edge of the ring is moved inwards by the offset distance. Where two offset edges cross
//! (a convex corner) they are trimmed at their intersection, where they separate (a reflex
//! corner) the gap is filled according to the [`JoinType`]:
//!
//! - `Round`: an arc of radius equal to the offset distance around the original corner.
//! - `Miter`: the offset edges are extended to their intersection, unless that point lies further
//!   than [`MITER_LIMIT`] offset distances from the corner, in which case the edge ends are joined
//!   directly (a bevel).
//!
//! Edges which shrink to nothing as the offset grows are removed and their neighbours joined
//! directly. Parts of the field narrower than twice the offset produce loops which wind the wrong
//! way, these are cut off at the crossing so that they disappear from the headland. If the result
//! still crosses itself, or has grown rather than shrunk, the offset is rejected.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use std::f64::consts::PI;

use super::{BoundaryRing, HeadlandError, HeadlandLine, JoinType};
use crate::geom::{self, cross};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum distance of a miter point from its corner, as a multiple of the offset distance.
pub const MITER_LIMIT: f64 = 4.0;

/// Maximum angle subtended by one segment of a round join.
pub const ROUND_JOIN_STEP_RAD: f64 = PI / 36.0;

/// Offset edges shorter than this are considered to have collapsed.
const COLLAPSE_TOL_M: f64 = 1e-6;

/// Points closer than this in the output are merged.
const MERGE_TOL_M: f64 = 1e-6;

/// Minimum turn between two edges for their shared vertex to be kept.
const COLLINEAR_TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An edge of the ring after being moved inwards.
#[derive(Debug, Clone, Copy)]
struct OffsetEdge {
    /// Offset position of the edge's start vertex
    origin_m: Vector2<f64>,

    /// Unit direction of the edge
    dir: Vector2<f64>,

    /// Length of the original edge
    length_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a closed headland line by offsetting the ring inwards by `distance_m`.
pub fn build_headland(
    ring: &BoundaryRing,
    distance_m: f64,
    join: JoinType,
) -> Result<HeadlandLine, HeadlandError> {
    let points = offset_ring(ring.points(), distance_m, join)?;

    let line = HeadlandLine::new_closed(&points, distance_m)?;

    debug!(
        "Built headland at {:.2} m ({:?}) from ring rev {}: {} points, {:.1} m long",
        distance_m,
        join,
        ring.revision(),
        line.len(),
        line.length_m()
    );

    Ok(line)
}

/// Offset a closed ring inwards by `distance_m`, returning the new ring's points.
///
/// The output ring has the same winding as the input.
pub fn offset_ring(
    ring: &[Vector2<f64>],
    distance_m: f64,
    join: JoinType,
) -> Result<Vec<Vector2<f64>>, HeadlandError> {
    if !distance_m.is_finite() || distance_m <= 0.0 {
        return Err(HeadlandError::InvalidDistance(distance_m));
    }

    let points = remove_collinear(&geom::dedup_points(ring, MERGE_TOL_M, true));
    let n = points.len();

    if n < 3 {
        return Err(HeadlandError::TooFewRingPoints(n));
    }

    let area = geom::signed_area(&points);
    if area.abs() < geom::EPSILON {
        return Err(HeadlandError::TooFewRingPoints(n));
    }
    let winding = area.signum();

    // Move every edge inwards, the interior is on the left of an anticlockwise ring
    let edges: Vec<OffsetEdge> = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            let length_m = (b - a).norm();
            let dir = (b - a) / length_m;
            let inward = Vector2::new(-dir.y, dir.x) * winding;

            OffsetEdge {
                origin_m: a + inward * distance_m,
                dir,
                length_m,
            }
        })
        .collect();

    // Remove collapsed edges, most collapsed first, until every remaining edge has length
    let mut active: Vec<usize> = (0..n).collect();

    loop {
        let m = active.len();
        if m < 3 {
            return Err(HeadlandError::Collapsed(distance_m));
        }

        let mut shortest: Option<(usize, f64)> = None;

        for k in 0..m {
            let prev = &edges[active[(k + m - 1) % m]];
            let curr = &edges[active[k]];
            let next = &edges[active[(k + 1) % m]];

            let span = end_param(curr, next, winding) - start_param(prev, curr, winding);

            match shortest {
                Some((_, s)) if s <= span => (),
                _ => shortest = Some((k, span)),
            }
        }

        match shortest {
            Some((k, span)) if span <= COLLAPSE_TOL_M => {
                active.remove(k);
            }
            _ => break,
        }
    }

    // Emit the join at the start of each remaining edge
    let m = active.len();
    let mut out: Vec<Vector2<f64>> = Vec::with_capacity(m * 2);

    for k in 0..m {
        let j_idx = active[(k + m - 1) % m];
        let k_idx = active[k];
        let prev = &edges[j_idx];
        let curr = &edges[k_idx];

        if is_convex(prev, curr, winding) {
            out.push(curr.origin_m + curr.dir * start_param(prev, curr, winding));
            continue;
        }

        let prev_end = prev.origin_m + prev.dir * prev.length_m;
        let curr_start = curr.origin_m;
        let adjacent = (j_idx + 1) % n == k_idx;

        match join {
            JoinType::Round if adjacent => {
                push_arc(&mut out, &points[k_idx], &prev_end, &curr_start, distance_m)
            }
            _ => {
                let corner = match adjacent {
                    true => points[k_idx],
                    false => (prev_end + curr_start) * 0.5,
                };

                match geom::line_line_intersect(&prev.origin_m, &prev.dir, &curr_start, &curr.dir)
                {
                    Some(x) if (x - corner).norm() <= MITER_LIMIT * distance_m => out.push(x),
                    _ => {
                        out.push(prev_end);
                        out.push(curr_start);
                    }
                }
            }
        }
    }

    // Features narrower than twice the offset turn inside out, cut them away
    let out = trim_loops(&out, winding);

    // Validate the result
    if out.len() < 3 {
        return Err(HeadlandError::Collapsed(distance_m));
    }

    let out_area = geom::signed_area(&out);
    if out_area.signum() != winding || out_area.abs() >= area.abs() {
        return Err(HeadlandError::Collapsed(distance_m));
    }

    if !geom::ring_is_simple(&out) {
        return Err(HeadlandError::SelfIntersecting);
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// True if the corner from `a` into `b` turns towards the interior.
fn is_convex(a: &OffsetEdge, b: &OffsetEdge, winding: f64) -> bool {
    cross(&a.dir, &b.dir) * winding > COLLINEAR_TOL
}

/// Distance along `curr` from its origin at which it starts, given the edge before it.
fn start_param(prev: &OffsetEdge, curr: &OffsetEdge, winding: f64) -> f64 {
    if is_convex(prev, curr, winding) {
        let x = geom::line_line_intersect(&prev.origin_m, &prev.dir, &curr.origin_m, &curr.dir);
        if let Some(x) = x {
            return (x - curr.origin_m).dot(&curr.dir);
        }
    }

    0.0
}

/// Distance along `curr` from its origin at which it ends, given the edge after it.
fn end_param(curr: &OffsetEdge, next: &OffsetEdge, winding: f64) -> f64 {
    if is_convex(curr, next, winding) {
        let x = geom::line_line_intersect(&curr.origin_m, &curr.dir, &next.origin_m, &next.dir);
        if let Some(x) = x {
            return (x - curr.origin_m).dot(&curr.dir);
        }
    }

    curr.length_m
}

/// Push the points of the shorter arc around `centre` from `from` to `to`.
fn push_arc(
    out: &mut Vec<Vector2<f64>>,
    centre: &Vector2<f64>,
    from: &Vector2<f64>,
    to: &Vector2<f64>,
    radius_m: f64,
) {
    let a0 = (from - centre).y.atan2((from - centre).x);
    let a1 = (to - centre).y.atan2((to - centre).x);
    let sweep = wrap_pi(a1 - a0);

    let steps = ((sweep.abs() / ROUND_JOIN_STEP_RAD).ceil() as usize).max(1);

    for i in 0..=steps {
        let a = a0 + sweep * (i as f64) / (steps as f64);
        out.push(centre + Vector2::new(a.cos(), a.sin()) * radius_m);
    }
}

/// Split the ring at its self crossings, keeping the loop which winds the same way as the
/// original, or the larger one if both or neither do.
fn trim_loops(points: &[Vector2<f64>], winding: f64) -> Vec<Vector2<f64>> {
    let pts = remove_collinear(&geom::dedup_points(points, MERGE_TOL_M, true));

    let (i, j, x) = match geom::first_self_crossing(&pts) {
        Some(c) => c,
        None => return pts,
    };

    let mut a = vec![x];
    a.extend_from_slice(&pts[(i + 1)..=j]);

    let mut b = vec![x];
    b.extend_from_slice(&pts[(j + 1)..]);
    b.extend_from_slice(&pts[..=i]);

    let a = trim_loops(&a, winding);
    let b = trim_loops(&b, winding);

    let area_a = geom::signed_area(&a);
    let area_b = geom::signed_area(&b);

    match (area_a * winding > 0.0, area_b * winding > 0.0) {
        (true, false) => a,
        (false, true) => b,
        _ if area_a.abs() >= area_b.abs() => a,
        _ => b,
    }
}

/// Remove vertices whose neighbouring edges are collinear, including spikes which double back.
fn remove_collinear(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut pts = points.to_vec();

    loop {
        let n = pts.len();
        if n < 3 {
            return pts;
        }

        let idx = (0..n).find(|&i| {
            let prev = pts[(i + n - 1) % n];
            let next = pts[(i + 1) % n];
            let d0 = (pts[i] - prev).normalize();
            let d1 = (next - pts[i]).normalize();
            cross(&d0, &d1).abs() <= COLLINEAR_TOL
        });

        match idx {
            Some(i) => {
                pts.remove(i);
            }
            None => return pts,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn rect(w: f64, h: f64) -> Vec<Vector2<f64>> {
        vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(w, 0.0),
            Vector2::new(w, h),
            Vector2::new(0.0, h),
        ]
    }

    /// An L shaped field with one reflex corner at (50, 50)
    fn l_shape() -> Vec<Vector2<f64>> {
        vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(100.0, 0.0),
            Vector2::new(100.0, 50.0),
            Vector2::new(50.0, 50.0),
            Vector2::new(50.0, 100.0),
            Vector2::new(0.0, 100.0),
        ]
    }

    #[test]
    fn test_square_miter_perimeter() {
        let ring = BoundaryRing::new(rect(100.0, 100.0)).unwrap();
        let line = build_headland(&ring, 10.0, JoinType::Miter).unwrap();

        assert!(line.is_closed());
        assert_eq!(line.len(), 4);
        assert_relative_eq!(line.length_m(), 320.0, epsilon = 1e-6);
        assert_eq!(line.move_distance_m(), 10.0);

        for p in line.points() {
            assert_relative_eq!(p.position_m.x.min(100.0 - p.position_m.x), 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_square_round_perimeter() {
        // All corners are convex so rounding makes no difference
        let ring = BoundaryRing::new(rect(100.0, 100.0)).unwrap();
        let line = build_headland(&ring, 10.0, JoinType::Round).unwrap();
        assert_relative_eq!(line.length_m(), 320.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clockwise_ring() {
        let mut pts = rect(100.0, 50.0);
        pts.reverse();

        let out = offset_ring(&pts, 5.0, JoinType::Miter).unwrap();
        assert!(geom::signed_area(&out) < 0.0);
        assert_relative_eq!(geom::signed_area(&out).abs(), 90.0 * 40.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reflex_joins() {
        let miter = offset_ring(&l_shape(), 10.0, JoinType::Miter).unwrap();
        let round = offset_ring(&l_shape(), 10.0, JoinType::Round).unwrap();

        // The miter reaches the extended edges' intersection
        assert!(miter
            .iter()
            .any(|p| (p - Vector2::new(40.0, 40.0)).norm() < 1e-9));
        assert_eq!(miter.len(), 6);

        // The round join stays exactly one offset from the reflex corner
        let corner = Vector2::new(50.0, 50.0);
        let arc: Vec<_> = round
            .iter()
            .filter(|p| p.x > 40.0 + 1e-9 && p.y > 40.0 + 1e-9)
            .collect();
        assert!(arc.len() > 2);
        for p in arc {
            assert_relative_eq!((p - corner).norm(), 10.0, epsilon = 1e-9);
        }

        assert!(geom::polyline_length(&round, true) < geom::polyline_length(&miter, true));
    }

    #[test]
    fn test_miter_limit_bevels() {
        // A narrow notch, the miter at its tip would be far from the corner
        let pts = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(100.0, 0.0),
            Vector2::new(100.0, 100.0),
            Vector2::new(52.0, 100.0),
            Vector2::new(50.0, 20.0),
            Vector2::new(48.0, 100.0),
            Vector2::new(0.0, 100.0),
        ];

        let out = offset_ring(&pts, 5.0, JoinType::Miter).unwrap();
        let corner = Vector2::new(50.0, 20.0);

        // Bevelled, so the notch tip is cut by two points exactly one offset from the corner
        let bevel = out
            .iter()
            .filter(|p| ((*p - corner).norm() - 5.0).abs() < 1e-9)
            .count();
        assert_eq!(bevel, 2);
        assert!(out.iter().all(|p| p.y >= 5.0 - 1e-9));
    }

    #[test]
    fn test_collapse_errors() {
        assert_eq!(
            offset_ring(&rect(100.0, 100.0), 50.0, JoinType::Miter).unwrap_err(),
            HeadlandError::Collapsed(50.0)
        );
        assert_eq!(
            offset_ring(&rect(100.0, 100.0), 80.0, JoinType::Round).unwrap_err(),
            HeadlandError::Collapsed(80.0)
        );
        assert_eq!(
            offset_ring(&rect(100.0, 100.0), 0.0, JoinType::Round).unwrap_err(),
            HeadlandError::InvalidDistance(0.0)
        );
        assert!(matches!(
            offset_ring(&rect(100.0, 100.0), std::f64::NAN, JoinType::Round),
            Err(HeadlandError::InvalidDistance(_))
        ));
    }

    #[test]
    fn test_narrow_part_removed() {
        // A rectangle with a thin arm, the arm disappears at a large offset
        let pts = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(100.0, 0.0),
            Vector2::new(100.0, 100.0),
            Vector2::new(60.0, 100.0),
            Vector2::new(60.0, 130.0),
            Vector2::new(55.0, 130.0),
            Vector2::new(55.0, 100.0),
            Vector2::new(0.0, 100.0),
        ];

        let out = offset_ring(&pts, 10.0, JoinType::Miter).unwrap();
        assert!(out.iter().all(|p| p.y <= 90.0 + 1e-9));
        assert_relative_eq!(geom::signed_area(&out), 80.0 * 80.0, epsilon = 1e-6);
    }

    #[test]
    fn test_collinear_points_ignored() {
        let mut pts = rect(100.0, 100.0);
        pts.insert(1, Vector2::new(50.0, 0.0));

        let out = offset_ring(&pts, 10.0, JoinType::Miter).unwrap();
        assert_eq!(out.len(), 4);
    }

    proptest! {
        #[test]
        fn prop_rectangle_offset_area(
            w in 20.0f64..500.0,
            h in 20.0f64..500.0,
            frac in 0.01f64..0.45,
        ) {
            let d = frac * w.min(h);
            let out = offset_ring(&rect(w, h), d, JoinType::Miter).unwrap();
            let expected = (w - 2.0 * d) * (h - 2.0 * d);
            prop_assert!((geom::signed_area(&out) - expected).abs() < 1e-6 * expected.max(1.0));
        }
    }
}
