//! # Localisation module
//!
//! Provides the vehicle's pose in the local field frame. The pose is measured externally (a GNSS
//! receiver with heading) and passed in once per cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use comms_if::eqpt::gnss::GnssFix;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose of the vehicle's pivot point (the centre of the rear axle).
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pose {
    /// Position as `(easting, northing)` in meters
    pub position_m: Vector2<f64>,

    /// Compass heading in radians, clockwise from north
    pub heading_rad: f64,

    /// Ground speed in meters/second
    pub speed_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(easting_m: f64, northing_m: f64, heading_rad: f64, speed_ms: f64) -> Self {
        Self {
            position_m: Vector2::new(easting_m, northing_m),
            heading_rad,
            speed_ms,
        }
    }

    /// Ground speed in kilometers/hour.
    pub fn speed_kph(&self) -> f64 {
        self.speed_ms * 3.6
    }

    /// Unit vector in the direction the vehicle is pointing.
    pub fn forward2(&self) -> Vector2<f64> {
        crate::geom::heading_to_dir(self.heading_rad)
    }

    /// True if every field of the pose is a finite number.
    pub fn is_finite(&self) -> bool {
        self.position_m.x.is_finite()
            && self.position_m.y.is_finite()
            && self.heading_rad.is_finite()
            && self.speed_ms.is_finite()
    }
}

impl From<GnssFix> for Pose {
    fn from(fix: GnssFix) -> Self {
        Self::new(fix.easting_m, fix.northing_m, fix.heading_rad, fix.speed_ms)
    }
}
