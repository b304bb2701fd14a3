//! # Geometry utilities
//!
//! Planar geometry on the local field frame. Positions are `Vector2<f64>` with `x` the easting and
//! `y` the northing, both in meters. Headings are compass headings: radians clockwise from north,
//! so a heading of `pi/2` points east.
//!
//! Nothing in this module fails loudly, functions which may have no answer (parallel lines,
//! degenerate segments) return `Option`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::wrap_2pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used for parallel and zero-length tests.
pub const EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point with an associated tangent heading.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidePoint {
    pub position_m: Vector2<f64>,
    pub heading_rad: f64,
}

/// The result of projecting a point onto a segment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    /// The projected point
    pub point_m: Vector2<f64>,

    /// Parameter along the segment, `0` at the start and `1` at the end
    pub t: f64,

    /// Distance from the query point to the projected point
    pub distance_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compass heading of the direction from `from` to `to`, in `[0, 2pi)`.
pub fn heading_between(from: &Vector2<f64>, to: &Vector2<f64>) -> f64 {
    let d = to - from;
    wrap_2pi(d.x.atan2(d.y))
}

/// Unit vector pointing along the given compass heading.
pub fn heading_to_dir(heading_rad: f64) -> Vector2<f64> {
    Vector2::new(heading_rad.sin(), heading_rad.cos())
}

/// Rotate a direction a quarter turn clockwise, i.e. to the right of travel.
pub fn right_normal(dir: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(dir.y, -dir.x)
}

/// Z component of the cross product of two planar vectors.
///
/// Positive when `b` is anticlockwise (to the left) of `a`.
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Project `p` onto the segment `a -> b`, clamping to the segment.
///
/// A zero-length segment projects every point onto `a`.
pub fn project_to_segment(p: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> Projection {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    let t = if len_sq < EPSILON * EPSILON {
        0.0
    } else {
        ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    };

    let point_m = a + ab * t;

    Projection {
        point_m,
        t,
        distance_m: (p - point_m).norm(),
    }
}

/// Unclamped parameter of the projection of `p` onto the infinite line through `a` and `b`.
pub fn project_to_line(p: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> Option<f64> {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    if len_sq < EPSILON * EPSILON {
        None
    } else {
        Some((p - a).dot(&ab) / len_sq)
    }
}

/// Intersect a ray with a segment.
///
/// Returns `(distance along the ray, parameter along the segment)`. `dir` must be a unit vector
/// for the distance to be in meters.
pub fn ray_segment_intersect(
    origin: &Vector2<f64>,
    dir: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>,
) -> Option<(f64, f64)> {
    let (s, t) = line_params(origin, dir, a, &(b - a))?;

    if s >= 0.0 && (-EPSILON..=1.0 + EPSILON).contains(&t) {
        Some((s, t.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Distance along a ray to the nearest crossing of a polyline, if there is one.
///
/// The closing segment is included when `closed`.
pub fn ray_polyline_distance(
    origin: &Vector2<f64>,
    dir: &Vector2<f64>,
    points: &[Vector2<f64>],
    closed: bool,
) -> Option<f64> {
    let n = points.len();
    let num_segs = match closed {
        true if n > 2 => n,
        _ => n.saturating_sub(1),
    };

    (0..num_segs)
        .filter_map(|i| ray_segment_intersect(origin, dir, &points[i], &points[(i + 1) % n]))
        .map(|(s, _)| s)
        .fold(None, |min: Option<f64>, s| match min {
            Some(m) if m <= s => Some(m),
            _ => Some(s),
        })
}

/// Intersect the infinite line through `p1` and `p2` with the segment `a -> b`.
///
/// Returns the intersection point and the parameter along the segment, which is in `[0, 1]`.
pub fn line_segment_intersect(
    p1: &Vector2<f64>,
    p2: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>,
) -> Option<(Vector2<f64>, f64)> {
    let ab = b - a;
    let (_, t) = line_params(p1, &(p2 - p1), a, &ab)?;

    if (0.0..=1.0).contains(&t) {
        Some((a + ab * t, t))
    } else {
        None
    }
}

/// Intersect the two infinite lines `p + s*dp` and `q + t*dq`, returning the intersection point.
pub fn line_line_intersect(
    p: &Vector2<f64>,
    dp: &Vector2<f64>,
    q: &Vector2<f64>,
    dq: &Vector2<f64>,
) -> Option<Vector2<f64>> {
    let (s, _) = line_params(p, dp, q, dq)?;
    Some(p + dp * s)
}

/// Intersect the two segments `a1 -> a2` and `b1 -> b2`.
///
/// Returns the intersection point and the parameters along both segments. Collinear segments
/// are not reported.
pub fn segment_intersection(
    a1: &Vector2<f64>,
    a2: &Vector2<f64>,
    b1: &Vector2<f64>,
    b2: &Vector2<f64>,
) -> Option<(Vector2<f64>, f64, f64)> {
    let da = a2 - a1;
    let (s, t) = line_params(a1, &da, b1, &(b2 - b1))?;

    if (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t) {
        Some((a1 + da * s, s, t))
    } else {
        None
    }
}

/// Even-odd test of whether `p` lies inside the closed ring.
pub fn point_in_polygon(p: &Vector2<f64>, ring: &[Vector2<f64>]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (pi, pj) = (ring[i], ring[j]);

        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

/// Shoelace area of a closed ring, positive when the ring is anticlockwise.
pub fn signed_area(ring: &[Vector2<f64>]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    for i in 0..n {
        sum += cross(&ring[i], &ring[(i + 1) % n]);
    }

    0.5 * sum
}

/// Total length of a polyline, including the closing segment if `closed`.
pub fn polyline_length(points: &[Vector2<f64>], closed: bool) -> f64 {
    let open: f64 = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();

    match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => open + (first - last).norm(),
        _ => open,
    }
}

/// Find the first crossing between two non-adjacent edges of a closed ring.
///
/// Returns the indices of the two edges (`i < j`) and the crossing point. Edges which only touch
/// end to end are not counted.
pub fn first_self_crossing(ring: &[Vector2<f64>]) -> Option<(usize, usize, Vector2<f64>)> {
    let n = ring.len();
    if n < 4 {
        return None;
    }

    let at_end = |p: f64| p < 1e-7 || p > 1.0 - 1e-7;

    for i in 0..n {
        for j in (i + 2)..n {
            // First and last edges share a vertex
            if i == 0 && j == n - 1 {
                continue;
            }

            if let Some((x, s, t)) =
                segment_intersection(&ring[i], &ring[(i + 1) % n], &ring[j], &ring[(j + 1) % n])
            {
                if !(at_end(s) && at_end(t)) {
                    return Some((i, j, x));
                }
            }
        }
    }

    None
}

/// Returns true if no two non-adjacent edges of the closed ring cross.
pub fn ring_is_simple(ring: &[Vector2<f64>]) -> bool {
    ring.len() >= 3 && first_self_crossing(ring).is_none()
}

/// Remove consecutive points closer than `tol_m` to each other.
///
/// For a closed ring a final point coincident with the first is also removed.
pub fn dedup_points(points: &[Vector2<f64>], tol_m: f64, closed: bool) -> Vec<Vector2<f64>> {
    let mut out: Vec<Vector2<f64>> = Vec::with_capacity(points.len());

    for p in points {
        match out.last() {
            Some(last) if (p - last).norm() <= tol_m => (),
            _ => out.push(*p),
        }
    }

    if closed {
        while out.len() > 1 && (out[out.len() - 1] - out[0]).norm() <= tol_m {
            out.pop();
        }
    }

    out
}

/// Compute the tangent heading at each point.
///
/// Interior points (and all points of a closed ring) take the heading from their previous to their
/// next neighbour, the ends of an open polyline take the heading of their only segment.
pub fn tangent_headings(points: &[Vector2<f64>], closed: bool) -> Vec<GuidePoint> {
    let n = points.len();

    (0..n)
        .map(|i| {
            let (prev, next) = if closed {
                ((i + n - 1) % n, (i + 1) % n)
            } else {
                (i.saturating_sub(1), (i + 1).min(n - 1))
            };

            let heading_rad = if (points[next] - points[prev]).norm() > EPSILON {
                heading_between(&points[prev], &points[next])
            } else if next != i {
                heading_between(&points[i], &points[next])
            } else {
                0.0
            };

            GuidePoint {
                position_m: points[i],
                heading_rad,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve `p + s*dp = q + t*dq` for `(s, t)`.
fn line_params(
    p: &Vector2<f64>,
    dp: &Vector2<f64>,
    q: &Vector2<f64>,
    dq: &Vector2<f64>,
) -> Option<(f64, f64)> {
    let denom = cross(dp, dq);

    if denom.abs() < EPSILON {
        return None;
    }

    let w = q - p;

    Some((cross(&w, dq) / denom, cross(&w, dp) / denom))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn square() -> Vec<Vector2<f64>> {
        vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(100.0, 0.0),
            Vector2::new(100.0, 100.0),
            Vector2::new(0.0, 100.0),
        ]
    }

    #[test]
    fn test_headings() {
        let o = Vector2::new(0.0, 0.0);
        assert_relative_eq!(heading_between(&o, &Vector2::new(0.0, 1.0)), 0.0);
        assert_relative_eq!(heading_between(&o, &Vector2::new(1.0, 0.0)), FRAC_PI_2);
        assert_relative_eq!(heading_between(&o, &Vector2::new(0.0, -1.0)), PI);
        assert_relative_eq!(
            heading_between(&o, &Vector2::new(-1.0, 0.0)),
            1.5 * PI
        );

        let d = heading_to_dir(FRAC_PI_2);
        assert_relative_eq!(d, Vector2::new(1.0, 0.0), epsilon = 1e-12);

        // Right of north is east
        assert_relative_eq!(
            right_normal(&heading_to_dir(0.0)),
            Vector2::new(1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_project_to_segment() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(10.0, 0.0);

        let p = project_to_segment(&Vector2::new(4.0, 3.0), &a, &b);
        assert_relative_eq!(p.t, 0.4);
        assert_relative_eq!(p.distance_m, 3.0);

        let p = project_to_segment(&Vector2::new(-4.0, 3.0), &a, &b);
        assert_eq!(p.t, 0.0);
        assert_relative_eq!(p.distance_m, 5.0);

        let p = project_to_segment(&Vector2::new(1.0, 1.0), &a, &a);
        assert_eq!(p.point_m, a);
    }

    #[test]
    fn test_ray_segment_intersect() {
        let origin = Vector2::new(0.0, 50.0);
        let north = heading_to_dir(0.0);

        let (s, t) = ray_segment_intersect(
            &origin,
            &north,
            &Vector2::new(-10.0, 95.0),
            &Vector2::new(10.0, 95.0),
        )
        .unwrap();
        assert_relative_eq!(s, 45.0, epsilon = 1e-9);
        assert_relative_eq!(t, 0.5, epsilon = 1e-9);

        // Behind the ray
        assert!(ray_segment_intersect(
            &origin,
            &north,
            &Vector2::new(-10.0, 5.0),
            &Vector2::new(10.0, 5.0),
        )
        .is_none());

        // Parallel
        assert!(ray_segment_intersect(
            &origin,
            &north,
            &Vector2::new(1.0, 0.0),
            &Vector2::new(1.0, 100.0),
        )
        .is_none());
    }

    #[test]
    fn test_ray_polyline_distance() {
        let square = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ];
        let west = heading_to_dir(1.5 * std::f64::consts::PI);

        // Only the closing edge lies to the west
        assert_relative_eq!(
            ray_polyline_distance(&Vector2::new(4.0, 5.0), &west, &square, true).unwrap(),
            4.0,
            epsilon = 1e-9
        );
        assert!(ray_polyline_distance(&Vector2::new(4.0, 5.0), &west, &square, false).is_none());

        // Nearest of several crossings
        let north = heading_to_dir(0.0);
        assert_relative_eq!(
            ray_polyline_distance(&Vector2::new(5.0, -5.0), &north, &square, true).unwrap(),
            5.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_line_segment_intersect() {
        // The line extends past the segment it is defined by
        let (p, t) = line_segment_intersect(
            &Vector2::new(0.0, 0.0),
            &Vector2::new(1.0, 1.0),
            &Vector2::new(10.0, 0.0),
            &Vector2::new(10.0, 20.0),
        )
        .unwrap();
        assert_relative_eq!(p, Vector2::new(10.0, 10.0), epsilon = 1e-9);
        assert_relative_eq!(t, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_polygon_measures() {
        let sq = square();
        assert_relative_eq!(signed_area(&sq), 10000.0);

        let rev: Vec<_> = sq.iter().rev().cloned().collect();
        assert_relative_eq!(signed_area(&rev), -10000.0);

        assert_relative_eq!(polyline_length(&sq, true), 400.0);
        assert_relative_eq!(polyline_length(&sq, false), 300.0);

        assert!(point_in_polygon(&Vector2::new(50.0, 50.0), &sq));
        assert!(!point_in_polygon(&Vector2::new(150.0, 50.0), &sq));
        assert!(!point_in_polygon(&Vector2::new(50.0, -0.1), &sq));
    }

    #[test]
    fn test_ring_is_simple() {
        assert!(ring_is_simple(&square()));

        let bowtie = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(0.0, 10.0),
        ];
        assert!(!ring_is_simple(&bowtie));
    }

    #[test]
    fn test_dedup_and_tangents() {
        let pts = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(0.0, 10.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 0.0),
        ];

        let ring = dedup_points(&pts, 1e-6, true);
        assert_eq!(ring.len(), 3);

        let open = tangent_headings(&ring, false);
        assert_relative_eq!(open[0].heading_rad, 0.0);
        assert_relative_eq!(open[1].heading_rad, FRAC_PI_4);
        assert_relative_eq!(open[2].heading_rad, FRAC_PI_2);

        let closed = tangent_headings(&ring, true);
        // From (10, 10) to (0, 10) is due west
        assert_relative_eq!(closed[0].heading_rad, 1.5 * PI);
    }
}
