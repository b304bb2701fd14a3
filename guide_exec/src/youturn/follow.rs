//! # Turn following
//!
//! Pure pursuit along the turn polyline. The segment being followed only ever moves forwards, and
//! the turn is complete once the pivot passes the end of the last segment.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::{
    geom::{self, GuidePoint},
    loc::Pose,
    track_guid::{controllers, look_ahead_distance_m, VehicleParams},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of segments ahead of the current one searched for the closest segment.
pub const FOLLOW_SEARCH_WINDOW: usize = 40;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of one tick of turn following.
#[derive(Debug, Copy, Clone, Serialize, PartialEq)]
pub struct TurnFollow {
    pub steer_angle_deg: f64,

    /// Distance of the pivot to the right of the followed segment
    pub xte_m: f64,

    pub goal_point_m: Vector2<f64>,

    /// Index of the segment being followed
    pub follow_index: usize,

    /// True once the pivot has passed the end of the path
    pub is_complete: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Follow the turn path from the given segment index.
///
/// Returns `None` if the path has fewer than 2 points.
pub fn follow_turn(
    path: &[GuidePoint],
    follow_index: usize,
    pose: &Pose,
    params: &VehicleParams,
) -> Option<TurnFollow> {
    let n = path.len();
    if n < 2 {
        return None;
    }

    let pivot = pose.position_m;
    let first = follow_index.min(n - 2);
    let last = (first + FOLLOW_SEARCH_WINDOW).min(n - 2);

    let (seg, proj) = (first..=last)
        .map(|i| {
            (
                i,
                geom::project_to_segment(&pivot, &path[i].position_m, &path[i + 1].position_m),
            )
        })
        .min_by_key(|(_, p)| OrderedFloat(p.distance_m))?;

    let seg_start = path[seg].position_m;
    let seg_end = path[seg + 1].position_m;

    let xte_m = match (seg_end - seg_start).try_normalize(geom::EPSILON) {
        Some(dir) => (pivot - seg_start).dot(&geom::right_normal(&dir)),
        None => proj.distance_m,
    };

    let goal_point_m = walk_along(
        path,
        seg,
        proj.point_m,
        look_ahead_distance_m(pose.speed_kph(), params),
    );

    let max_steer_rad = params.max_steer_angle_deg.to_radians();
    let steer_rad = controllers::pure_pursuit_steer_rad(
        &pivot,
        pose.heading_rad,
        &goal_point_m,
        params.wheelbase_m,
    )
    .clamp(-max_steer_rad, max_steer_rad);

    let is_complete = seg == n - 2
        && geom::project_to_line(&pivot, &seg_start, &seg_end)
            .map(|t| t >= 1.0)
            .unwrap_or(true);

    Some(TurnFollow {
        steer_angle_deg: steer_rad.to_degrees(),
        xte_m,
        goal_point_m,
        follow_index: seg,
        is_complete,
    })
}

/// Walk `distance_m` along the path from `start_m`, which lies on segment `seg`.
///
/// Walking off the end continues straight along the last point's heading.
fn walk_along(
    path: &[GuidePoint],
    seg: usize,
    start_m: Vector2<f64>,
    distance_m: f64,
) -> Vector2<f64> {
    let mut remaining_m = distance_m;
    let mut current = start_m;

    for p in &path[(seg + 1)..] {
        let step = p.position_m - current;
        let step_len = step.norm();

        if step_len >= remaining_m && step_len > 0.0 {
            return current + step * (remaining_m / step_len);
        }

        remaining_m -= step_len;
        current = p.position_m;
    }

    let end = path[path.len() - 1];
    end.position_m + geom::heading_to_dir(end.heading_rad) * remaining_m
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    /// North 10 m, then east 10 m
    fn corner() -> Vec<GuidePoint> {
        let pts: Vec<Vector2<f64>> = (0..=10)
            .map(|i| Vector2::new(0.0, i as f64))
            .chain((1..=10).map(|i| Vector2::new(i as f64, 10.0)))
            .collect();
        geom::tangent_headings(&pts, false)
    }

    #[test]
    fn test_follow_straight_part() {
        let path = corner();
        let params = VehicleParams::default();

        let f = follow_turn(&path, 0, &Pose::new(0.0, 2.5, 0.0, 0.0), &params).unwrap();
        assert_eq!(f.follow_index, 2);
        assert_relative_eq!(f.xte_m, 0.0, epsilon = 1e-9);
        assert_relative_eq!(f.goal_point_m, Vector2::new(0.0, 6.5), epsilon = 1e-9);
        assert_relative_eq!(f.steer_angle_deg, 0.0, epsilon = 1e-9);
        assert!(!f.is_complete);
    }

    #[test]
    fn test_follow_round_corner() {
        let path = corner();
        let params = VehicleParams::default();

        // Look-ahead wraps round the corner, steer right
        let f = follow_turn(&path, 0, &Pose::new(0.0, 8.0, 0.0, 0.0), &params).unwrap();
        assert_relative_eq!(f.goal_point_m, Vector2::new(2.0, 10.0), epsilon = 1e-9);
        assert!(f.steer_angle_deg > 0.0);

        // Left of the path is a negative error
        let f = follow_turn(&path, 0, &Pose::new(-1.0, 5.0, 0.0, 0.0), &params).unwrap();
        assert_relative_eq!(f.xte_m, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_follow_index_is_monotone() {
        let path = corner();
        let params = VehicleParams::default();

        // Close to the first leg but already following the second
        let f = follow_turn(&path, 12, &Pose::new(0.5, 9.0, 0.0, 0.0), &params).unwrap();
        assert!(f.follow_index >= 12);
    }

    #[test]
    fn test_completion() {
        let path = corner();
        let params = VehicleParams::default();

        let f = follow_turn(&path, 0, &Pose::new(9.5, 10.0, 1.57, 0.0), &params).unwrap();
        assert!(!f.is_complete);

        let f = follow_turn(&path, 19, &Pose::new(10.2, 10.0, 1.57, 0.0), &params).unwrap();
        assert!(f.is_complete);
        assert_relative_eq!(f.goal_point_m, Vector2::new(14.0, 10.0), epsilon = 1e-9);

        assert!(follow_turn(&path[..1], 0, &Pose::default(), &params).is_none());
    }
}
