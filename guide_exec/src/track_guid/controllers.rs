//! # Steering controllers
//!
//! The pure pursuit and Stanley steering laws, the speed dependent look-ahead and the cross track
//! error integral which gives the controllers memory between ticks.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::params::*;
use crate::geom;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller memory carried between ticks.
///
/// Owned by whoever calls the guidance, which must reset it to the default whenever the active
/// line changes.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuidanceFilterState {
    /// Integral of the cross track error, in radians of steer
    pub integral: f64,

    /// Low pass filtered cross track error
    pub previous_error: f64,

    /// Filtered error at the last rate sample
    pub previous_error_last: f64,

    /// Ticks since the last rate sample
    pub counter: u32,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Distance ahead of the vehicle to place the pure pursuit goal point.
pub fn look_ahead_distance_m(speed_kph: f64, params: &VehicleParams) -> f64 {
    if speed_kph.abs() <= LOOK_AHEAD_HOLD_SPEED_KPH {
        params.look_ahead_hold_m
    } else {
        params
            .min_look_ahead_m
            .max(params.look_ahead_hold_m + speed_kph.abs() * params.look_ahead_mult * 0.1)
    }
}

/// Pure pursuit steer angle to drive the pivot through the goal point.
///
/// Positive angles turn right. A goal on top of the pivot gives no steer.
pub fn pure_pursuit_steer_rad(
    pivot_m: &Vector2<f64>,
    heading_rad: f64,
    goal_m: &Vector2<f64>,
    wheelbase_m: f64,
) -> f64 {
    let to_goal = goal_m - pivot_m;
    let dist_sq = to_goal.norm_squared();

    if dist_sq < geom::EPSILON {
        return 0.0;
    }

    // Offset of the goal to the right of the vehicle
    let lateral_m = to_goal.dot(&geom::right_normal(&geom::heading_to_dir(heading_rad)));

    (2.0 * lateral_m * wheelbase_m / dist_sq).atan()
}

/// Stanley steer angle.
///
/// `heading_error_rad` is the line heading minus the vehicle heading, `xte_axle_m` the steer
/// axle's distance to the right of the line in the direction of travel.
pub fn stanley_steer_rad(
    heading_error_rad: f64,
    xte_axle_m: f64,
    speed_ms: f64,
    params: &VehicleParams,
) -> f64 {
    params.stanley_heading_gain * heading_error_rad
        - (params.stanley_distance_gain * xte_axle_m / (speed_ms.abs() + params.stanley_soft_ms))
            .atan()
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GuidanceFilterState {
    /// Advance the filter by one tick.
    ///
    /// `xte_m` is the pivot's error to the right of the direction of travel. The integral only
    /// accumulates while moving faster than `integral_min_speed_kph` with a small, slowly changing
    /// error, and decays otherwise.
    pub fn update(&self, xte_m: f64, speed_kph: f64, params: &VehicleParams) -> Self {
        if params.integral_gain == 0.0 {
            return Self::default();
        }

        let mut next = *self;

        next.previous_error = 0.2 * xte_m + 0.8 * self.previous_error;
        let rate_m = next.previous_error - self.previous_error_last;

        next.counter += 1;
        if next.counter >= INTEGRAL_RATE_TICKS {
            next.previous_error_last = next.previous_error;
            next.counter = 0;
        }

        let accumulate = speed_kph > params.integral_min_speed_kph
            && next.previous_error.abs() < params.integral_max_error_m
            && rate_m.abs() < params.integral_max_rate_m;

        if accumulate {
            next.integral += next.previous_error * params.integral_gain * INTEGRAL_STEP;
        } else {
            next.integral *= INTEGRAL_DECAY;
        }

        next.integral = next
            .integral
            .clamp(-params.integral_limit_rad, params.integral_limit_rad);

        next
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_ahead() {
        let params = VehicleParams::default();

        assert_relative_eq!(look_ahead_distance_m(0.0, &params), 4.0);
        assert_relative_eq!(look_ahead_distance_m(LOOK_AHEAD_HOLD_SPEED_KPH, &params), 4.0);
        assert_relative_eq!(look_ahead_distance_m(10.0, &params), 5.4);

        // Minimum applies once moving
        let params = VehicleParams {
            look_ahead_hold_m: 1.0,
            ..Default::default()
        };
        assert_relative_eq!(look_ahead_distance_m(0.5, &params), 1.0);
        assert_relative_eq!(look_ahead_distance_m(2.0, &params), 2.0);
    }

    #[test]
    fn test_pure_pursuit() {
        let pivot = Vector2::new(1.0, 50.0);

        // Goal 1 m left, 4 m ahead
        let steer = pure_pursuit_steer_rad(&pivot, 0.0, &Vector2::new(0.0, 54.0), 2.5);
        assert_relative_eq!(steer, (-5.0f64 / 17.0).atan(), epsilon = 1e-12);

        // Straight ahead
        let steer = pure_pursuit_steer_rad(&pivot, 0.0, &Vector2::new(1.0, 60.0), 2.5);
        assert_relative_eq!(steer, 0.0, epsilon = 1e-12);

        // Goal on the pivot
        assert_eq!(pure_pursuit_steer_rad(&pivot, 0.0, &pivot, 2.5), 0.0);
    }

    #[test]
    fn test_stanley() {
        let params = VehicleParams::default();

        assert_relative_eq!(stanley_steer_rad(0.1, 0.0, 2.0, &params), 0.1);
        assert!(stanley_steer_rad(0.0, 0.5, 2.0, &params) < 0.0);
        assert!(stanley_steer_rad(0.0, -0.5, 0.0, &params) > 0.0);
    }

    #[test]
    fn test_integral() {
        let params = VehicleParams {
            integral_gain: 1.0,
            ..Default::default()
        };

        // Disabled gain keeps the filter empty
        let off = GuidanceFilterState::default().update(0.2, 10.0, &VehicleParams::default());
        assert_eq!(off, GuidanceFilterState::default());

        // Small steady error accumulates up to the limit
        let mut state = GuidanceFilterState::default();
        for _ in 0..200 {
            state = state.update(0.2, 10.0, &params);
        }
        assert_relative_eq!(state.integral, params.integral_limit_rad);
        assert!(state.counter < INTEGRAL_RATE_TICKS);

        // Too slow, decays
        let slow = state.update(0.2, 1.0, &params);
        assert_relative_eq!(slow.integral, params.integral_limit_rad * INTEGRAL_DECAY);

        // Large error never accumulates
        let mut state = GuidanceFilterState::default();
        for _ in 0..200 {
            state = state.update(2.0, 10.0, &params);
        }
        assert_eq!(state.integral, 0.0);
    }
}
