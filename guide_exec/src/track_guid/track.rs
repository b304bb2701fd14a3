//! # Reference lines
//!
//! A [`Track`] is the operator's AB line. The line actually steered to each tick is a
//! [`GuideLine`], the track shifted sideways by a whole number of track widths.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use super::GuidanceError;
use crate::{geom, revision::next_revision};
use comms_if::files::TrackRecord;
use util::maths::{ang_dist, wrap_2pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An AB reference line. Immutable once created.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Track {
    name: String,
    point_a_m: Vector2<f64>,
    point_b_m: Vector2<f64>,
    heading_rad: f64,
    revision: u64,
}

/// A reference line offset by some number of paths.
#[derive(Debug, Copy, Clone, Serialize, PartialEq)]
pub struct GuideLine {
    pub point_a_m: Vector2<f64>,
    pub point_b_m: Vector2<f64>,

    /// Heading of `A -> B`, the same as the track's
    pub heading_rad: f64,

    pub paths_away: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Track {
    /// Create a new track through the two points.
    ///
    /// The points must be distinct and finite.
    pub fn new(
        name: &str,
        point_a_m: Vector2<f64>,
        point_b_m: Vector2<f64>,
    ) -> Result<Self, GuidanceError> {
        if !(point_a_m.iter().all(|v| v.is_finite()) && point_b_m.iter().all(|v| v.is_finite())) {
            return Err(GuidanceError::NonFiniteTrack);
        }

        if (point_b_m - point_a_m).norm() < geom::EPSILON {
            return Err(GuidanceError::DegenerateTrack);
        }

        Ok(Self {
            name: name.to_string(),
            point_a_m,
            point_b_m,
            heading_rad: geom::heading_between(&point_a_m, &point_b_m),
            revision: next_revision(),
        })
    }

    pub fn from_record(record: &TrackRecord) -> Result<Self, GuidanceError> {
        Self::new(
            &record.name,
            Vector2::new(record.a_e, record.a_n),
            Vector2::new(record.b_e, record.b_n),
        )
    }

    pub fn to_record(&self) -> TrackRecord {
        TrackRecord {
            name: self.name.clone(),
            heading_deg: self.heading_rad.to_degrees(),
            a_e: self.point_a_m.x,
            a_n: self.point_a_m.y,
            b_e: self.point_b_m.x,
            b_n: self.point_b_m.y,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn point_a(&self) -> Vector2<f64> {
        self.point_a_m
    }

    pub fn point_b(&self) -> Vector2<f64> {
        self.point_b_m
    }

    /// Compass heading of `A -> B` in `[0, 2pi)`.
    pub fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Unit vector from A towards B.
    pub fn dir(&self) -> Vector2<f64> {
        geom::heading_to_dir(self.heading_rad)
    }

    /// Unit vector perpendicular to the track, pointing to the right of `A -> B`.
    pub fn perp(&self) -> Vector2<f64> {
        geom::heading_to_dir(self.heading_rad + std::f64::consts::FRAC_PI_2)
    }

    /// True if the given heading is within a quarter turn of `A -> B`.
    pub fn is_heading_same_way(&self, heading_rad: f64) -> bool {
        ang_dist(self.heading_rad, heading_rad).abs() < std::f64::consts::FRAC_PI_2
    }

    /// The heading of travel along the track for a vehicle with the given heading.
    pub fn travel_heading(&self, heading_rad: f64) -> f64 {
        match self.is_heading_same_way(heading_rad) {
            true => self.heading_rad,
            false => wrap_2pi(self.heading_rad + std::f64::consts::PI),
        }
    }

    /// The line `paths_away` track widths to the right of this one (left if negative).
    pub fn guide_line(&self, paths_away: i32, track_width_m: f64) -> GuideLine {
        let shift = self.perp() * (track_width_m * paths_away as f64);

        GuideLine {
            point_a_m: self.point_a_m + shift,
            point_b_m: self.point_b_m + shift,
            heading_rad: self.heading_rad,
            paths_away,
        }
    }
}

impl GuideLine {
    pub fn dir(&self) -> Vector2<f64> {
        geom::heading_to_dir(self.heading_rad)
    }

    /// Signed distance of the point from the line, positive to the right of `A -> B`.
    pub fn xte_m(&self, point_m: &Vector2<f64>) -> f64 {
        (point_m - self.point_a_m).dot(&geom::right_normal(&self.dir()))
    }

    /// The foot of the perpendicular from the point onto the infinite line.
    pub fn project(&self, point_m: &Vector2<f64>) -> Vector2<f64> {
        let dir = self.dir();
        self.point_a_m + dir * (point_m - self.point_a_m).dot(&dir)
    }
}
