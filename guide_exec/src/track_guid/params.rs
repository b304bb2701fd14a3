//! Track guidance parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this speed the look-ahead distance is held at `look_ahead_hold_m`.
pub const LOOK_AHEAD_HOLD_SPEED_KPH: f64 = 1.0;

/// Number of ticks between samples of the cross track error rate.
pub const INTEGRAL_RATE_TICKS: u32 = 4;

/// Integral accumulation per tick per meter of error, before the integral gain.
pub const INTEGRAL_STEP: f64 = 0.04;

/// Factor the integral decays by on each tick it is not accumulating.
pub const INTEGRAL_DECAY: f64 = 0.95;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle geometry and steering controller parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VehicleParams {
    /// Distance from the pivot (rear axle) to the steer axle.
    pub wheelbase_m: f64,

    /// Distance between neighbouring parallel lines.
    pub track_width_m: f64,

    /// Maximum steer angle demand magnitude.
    pub max_steer_angle_deg: f64,

    /// Look-ahead distance when stationary or crawling.
    pub look_ahead_hold_m: f64,

    /// Minimum look-ahead distance.
    pub min_look_ahead_m: f64,

    /// Look-ahead growth with speed.
    ///
    /// The look-ahead is `look_ahead_hold_m + speed_kph * look_ahead_mult * 0.1`.
    pub look_ahead_mult: f64,

    /// Which steering controller to use on straight lines.
    pub steer_algorithm: SteerAlgorithm,

    /// Gain of the cross track error integral. Zero disables the integral.
    pub integral_gain: f64,

    /// The integral only accumulates above this speed.
    pub integral_min_speed_kph: f64,

    /// The integral only accumulates while the filtered error is below this.
    pub integral_max_error_m: f64,

    /// The integral only accumulates while the error changes by less than this per rate sample.
    pub integral_max_rate_m: f64,

    /// Limit on the magnitude of the integral term.
    pub integral_limit_rad: f64,

    /// Stanley heading error gain.
    pub stanley_heading_gain: f64,

    /// Stanley cross track error gain.
    pub stanley_distance_gain: f64,

    /// Stanley softening speed, keeps the cross track term finite at low speed.
    pub stanley_soft_ms: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SteerAlgorithm {
    PurePursuit,
    Stanley,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            wheelbase_m: 2.5,
            track_width_m: 6.0,
            max_steer_angle_deg: 35.0,
            look_ahead_hold_m: 4.0,
            min_look_ahead_m: 2.0,
            look_ahead_mult: 1.4,
            steer_algorithm: SteerAlgorithm::PurePursuit,
            integral_gain: 0.0,
            integral_min_speed_kph: 2.5,
            integral_max_error_m: 0.5,
            integral_max_rate_m: 0.1,
            integral_limit_rad: 0.1,
            stanley_heading_gain: 1.0,
            stanley_distance_gain: 0.8,
            stanley_soft_ms: 1.0,
        }
    }
}

impl Default for SteerAlgorithm {
    fn default() -> Self {
        SteerAlgorithm::PurePursuit
    }
}
