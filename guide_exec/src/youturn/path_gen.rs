//! # Turn path generation
//!
//! Builds U-turn paths in a frame attached to the current line: `s` runs along the direction of
//! travel and `l` sideways towards the next line. A U-turn is a straight entry leg, a half circle
//! and a straight exit leg back down the next line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::params::YouTurnParams;
use crate::geom;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Frame attached to the current line.
#[derive(Debug, Copy, Clone)]
pub struct TurnFrame {
    /// The point on the current line where `s = 0`
    pub origin_m: Vector2<f64>,

    /// Unit vector along the direction of travel
    pub along: Vector2<f64>,

    /// Unit vector towards the next line
    pub side: Vector2<f64>,
}

/// Where a U-turn sits in a [`TurnFrame`].
#[derive(Debug, Copy, Clone)]
pub struct UTurnShape {
    /// Along track position of the start of the path
    pub entry_start_s_m: f64,

    /// Along track position of the start of the arc
    pub arc_start_s_m: f64,

    pub radius_m: f64,

    /// Sideways distance to the next line
    pub offset_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Produces a direct path between the two points, including both, with consecutive points at most
/// `point_sep_m` apart.
pub fn direct(from: Vector2<f64>, to: Vector2<f64>, point_sep_m: f64) -> Vec<Vector2<f64>> {
    let diff_vec = to - from;
    let dist = diff_vec.norm();

    if dist <= point_sep_m || point_sep_m <= 0.0 {
        return vec![from, to];
    }

    // Round up so that no gap is larger than the separation
    let num_steps = (dist / point_sep_m).ceil() as usize;
    let delta = diff_vec / num_steps as f64;

    (0..=num_steps).map(|i| from + delta * i as f64).collect()
}

/// Build the U-turn path for the given shape.
///
/// The arc is split into at least `min_arc_segments` segments, and more if needed to keep the
/// point spacing.
pub fn u_turn(
    frame: &TurnFrame,
    shape: &UTurnShape,
    point_sep_m: f64,
    min_arc_segments: usize,
) -> Vec<Vector2<f64>> {
    let r = shape.radius_m;

    // Entry
    let mut points = direct(
        frame.point(shape.entry_start_s_m, 0.0),
        frame.point(shape.arc_start_s_m, 0.0),
        point_sep_m,
    );

    // Arc, centred `r` to the side of its start
    let num_segs = min_arc_segments
        .max((std::f64::consts::PI * r / point_sep_m).ceil() as usize)
        .max(1);
    for k in 1..=num_segs {
        let theta = std::f64::consts::PI * k as f64 / num_segs as f64;
        points.push(frame.point(
            shape.arc_start_s_m + r * theta.sin(),
            r - r * theta.cos(),
        ));
    }

    // Exit, back to the point on the next line level with the entry start
    let exit = direct(
        frame.point(shape.arc_start_s_m, 2.0 * r),
        frame.point(shape.entry_start_s_m, shape.offset_m),
        point_sep_m,
    );
    points.extend(exit.into_iter().skip(1));

    geom::dedup_points(&points, geom::EPSILON, false)
}

/// The direct fallback turn for a headland `headland_distance_m` ahead of the frame origin.
///
/// The entry leg starts `entry_lead_m` before the headland and runs `headland_leg_length_m` into
/// it, where the arc begins.
pub fn fallback_turn(
    frame: &TurnFrame,
    headland_distance_m: f64,
    offset_m: f64,
    radius_m: f64,
    params: &YouTurnParams,
) -> Vec<Vector2<f64>> {
    let shape = UTurnShape {
        entry_start_s_m: (headland_distance_m - params.entry_lead_m).max(0.0),
        arc_start_s_m: headland_distance_m + params.headland_leg_length_m,
        radius_m,
        offset_m,
    };

    u_turn(frame, &shape, params.point_spacing_m, params.min_arc_segments)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TurnFrame {
    /// Create a frame at `origin_m` for travel along `heading_rad`, turning left or right.
    pub fn new(origin_m: Vector2<f64>, heading_rad: f64, is_turn_left: bool) -> Self {
        let along = geom::heading_to_dir(heading_rad);
        let right = geom::right_normal(&along);

        Self {
            origin_m,
            along,
            side: if is_turn_left { -right } else { right },
        }
    }

    /// World position of the frame coordinates.
    pub fn point(&self, s_m: f64, l_m: f64) -> Vector2<f64> {
        self.origin_m + self.along * s_m + self.side * l_m
    }

    /// Along track coordinate of a world position.
    pub fn s_of(&self, point_m: &Vector2<f64>) -> f64 {
        (point_m - self.origin_m).dot(&self.along)
    }
}
