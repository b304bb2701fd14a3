//! # Track guidance module
//!
//! Computes the steer angle needed to follow a [`Track`] offset sideways by some number of paths.
//! The computation is pure: the controller memory comes in as a [`GuidanceFilterState`] and the
//! updated state is returned alongside the demand.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod track;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector2;
use serde::Serialize;
use thiserror::Error;

use crate::{geom, loc::Pose};
use comms_if::eqpt::steer::SteerDems;
use util::maths::ang_dist;

pub use controllers::{look_ahead_distance_m, GuidanceFilterState};
pub use params::{SteerAlgorithm, VehicleParams};
pub use track::{GuideLine, Track};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of one guidance computation.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct SteerReport {
    /// Steer angle demand, positive to the right
    pub steer_angle_deg: f64,

    /// Pivot distance from the guide line, positive to the right of `A -> B`
    pub xte_m: f64,

    pub look_ahead_m: f64,

    /// The point the controller is steering towards
    pub goal_point_m: Vector2<f64>,

    pub steer_axle_m: Vector2<f64>,

    /// The offset line being followed
    pub guide_line: GuideLine,

    pub is_heading_same_way: bool,

    /// Integral contribution included in the demand
    pub integral_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GuidanceError {
    #[error("The track's A and B points are the same")]
    DegenerateTrack,

    #[error("The track contains a non-finite coordinate")]
    NonFiniteTrack,

    #[error("The pose contains a non-finite value")]
    NonFinitePose,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the steer demand to follow the track offset by `paths_away` track widths.
pub fn compute_steering(
    pose: &Pose,
    track: &Track,
    paths_away: i32,
    filter: &GuidanceFilterState,
    params: &VehicleParams,
) -> Result<(SteerReport, GuidanceFilterState), GuidanceError> {
    if !pose.is_finite() {
        return Err(GuidanceError::NonFinitePose);
    }

    let line = track.guide_line(paths_away, params.track_width_m);

    let is_heading_same_way = track.is_heading_same_way(pose.heading_rad);
    let travel_heading_rad = track.travel_heading(pose.heading_rad);
    let travel_sign = if is_heading_same_way { 1.0 } else { -1.0 };

    let speed_kph = pose.speed_kph();
    let look_ahead_m = look_ahead_distance_m(speed_kph, params);
    let steer_axle_m = pose.position_m + pose.forward2() * params.wheelbase_m;

    let xte_m = line.xte_m(&pose.position_m);

    let filter = filter.update(xte_m * travel_sign, speed_kph, params);

    let (raw_steer_rad, goal_point_m) = match params.steer_algorithm {
        SteerAlgorithm::PurePursuit => {
            let goal = line.project(&pose.position_m)
                + geom::heading_to_dir(travel_heading_rad) * look_ahead_m;

            (
                controllers::pure_pursuit_steer_rad(
                    &pose.position_m,
                    pose.heading_rad,
                    &goal,
                    params.wheelbase_m,
                ),
                goal,
            )
        }
        SteerAlgorithm::Stanley => (
            controllers::stanley_steer_rad(
                ang_dist(pose.heading_rad, travel_heading_rad),
                line.xte_m(&steer_axle_m) * travel_sign,
                pose.speed_ms,
                params,
            ),
            line.project(&steer_axle_m),
        ),
    };

    let max_steer_rad = params.max_steer_angle_deg.to_radians();
    let steer_rad = (raw_steer_rad - filter.integral).clamp(-max_steer_rad, max_steer_rad);

    trace!(
        "Guidance on path {}: xte {:.3} m, steer {:.2} deg, look-ahead {:.2} m",
        paths_away,
        xte_m,
        steer_rad.to_degrees(),
        look_ahead_m
    );

    Ok((
        SteerReport {
            steer_angle_deg: steer_rad.to_degrees(),
            xte_m,
            look_ahead_m,
            goal_point_m,
            steer_axle_m,
            guide_line: line,
            is_heading_same_way,
            integral_rad: filter.integral,
        },
        filter,
    ))
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerReport {
    pub fn dems(&self) -> SteerDems {
        SteerDems {
            steer_angle_deg: self.steer_angle_deg,
            xte_m: self.xte_m,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn north_track() -> Track {
        Track::new("north", Vector2::new(0.0, 0.0), Vector2::new(0.0, 100.0)).unwrap()
    }

    fn steer(pose: Pose, paths_away: i32, params: &VehicleParams) -> SteerReport {
        compute_steering(
            &pose,
            &north_track(),
            paths_away,
            &GuidanceFilterState::default(),
            params,
        )
        .unwrap()
        .0
    }

    #[test]
    fn test_on_line() {
        let params = VehicleParams::default();
        let r = steer(Pose::new(0.0, 50.0, 0.0, 2.0), 0, &params);

        assert_relative_eq!(r.steer_angle_deg, 0.0, epsilon = 1e-9);
        assert_relative_eq!(r.xte_m, 0.0, epsilon = 1e-9);
        assert!(r.is_heading_same_way);
        assert_relative_eq!(r.steer_axle_m, Vector2::new(0.0, 52.5), epsilon = 1e-9);

        // On the next path over
        let r = steer(Pose::new(6.0, 50.0, 0.0, 2.0), 1, &params);
        assert_relative_eq!(r.xte_m, 0.0, epsilon = 1e-9);
        assert_relative_eq!(r.steer_angle_deg, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_off_line() {
        let params = VehicleParams::default();

        // Right of the line heading north, steer left
        let r = steer(Pose::new(1.0, 50.0, 0.0, 0.0), 0, &params);
        assert_relative_eq!(r.xte_m, 1.0, epsilon = 1e-9);
        assert_relative_eq!(
            r.steer_angle_deg,
            (-5.0f64 / 17.0).atan().to_degrees(),
            epsilon = 1e-9
        );
        assert_relative_eq!(r.goal_point_m, Vector2::new(0.0, 54.0), epsilon = 1e-9);

        // Same place heading south, the error keeps its sign but the steer flips
        let r = steer(Pose::new(1.0, 50.0, PI, 0.0), 0, &params);
        assert!(!r.is_heading_same_way);
        assert_relative_eq!(r.xte_m, 1.0, epsilon = 1e-9);
        assert!(r.steer_angle_deg > 0.0);
        assert_relative_eq!(r.goal_point_m, Vector2::new(0.0, 46.0), epsilon = 1e-9);
    }

    #[test]
    fn test_steer_limit() {
        let params = VehicleParams {
            max_steer_angle_deg: 5.0,
            ..Default::default()
        };
        let r = steer(Pose::new(-5.0, 50.0, 0.0, 3.0), 0, &params);
        assert_relative_eq!(r.steer_angle_deg, 5.0, epsilon = 1e-9);

        let r = steer(Pose::new(5.0, 50.0, 0.0, 3.0), 0, &params);
        assert_relative_eq!(r.steer_angle_deg, -5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stanley() {
        let params = VehicleParams {
            steer_algorithm: SteerAlgorithm::Stanley,
            ..Default::default()
        };

        // Pointing right of the line, steer back left
        let r = steer(Pose::new(0.0, 50.0, 0.1, 2.0), 0, &params);
        assert!(r.steer_angle_deg < 0.0);

        // Left of the line heading south means right of travel, steer left
        let r = steer(Pose::new(-1.0, 50.0, PI, 2.0), 0, &params);
        assert!(r.steer_angle_deg < 0.0);
    }

    #[test]
    fn test_integral_in_demand() {
        let params = VehicleParams {
            integral_gain: 1.0,
            ..Default::default()
        };
        let track = north_track();
        let pose = Pose::new(0.2, 50.0, 0.0, 3.0);

        let mut filter = GuidanceFilterState::default();
        let (first, f) = compute_steering(&pose, &track, 0, &filter, &params).unwrap();
        filter = f;
        for _ in 0..100 {
            filter = compute_steering(&pose, &track, 0, &filter, &params).unwrap().1;
        }
        let (later, _) = compute_steering(&pose, &track, 0, &filter, &params).unwrap();

        // Integral pushes further left
        assert!(later.integral_rad > 0.0);
        assert!(later.steer_angle_deg < first.steer_angle_deg);
    }

    #[test]
    fn test_bad_pose() {
        assert_eq!(
            compute_steering(
                &Pose::new(std::f64::NAN, 0.0, 0.0, 0.0),
                &north_track(),
                0,
                &GuidanceFilterState::default(),
                &VehicleParams::default()
            )
            .unwrap_err(),
            GuidanceError::NonFinitePose
        );
    }
}
