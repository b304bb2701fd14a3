//! # GNSS Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position fix from the GNSS receiver, already projected onto the local field plane.
///
/// The heading is a compass heading, i.e. clockwise from north, so that a vehicle driving due
/// east has a heading of `pi/2`.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GnssFix {
    /// Easting of the vehicle's pivot point in meters.
    pub easting_m: f64,

    /// Northing of the vehicle's pivot point in meters.
    pub northing_m: f64,

    /// Heading of the vehicle in radians, clockwise from north.
    pub heading_rad: f64,

    /// Ground speed in meters/second.
    pub speed_ms: f64,
}
