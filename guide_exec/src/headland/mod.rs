//! # Headland module
//!
//! The headland is the strip around the edge of a field used for turning. Its inner edge, the
//! headland line, is built by offsetting the field boundary inwards and may then be cut by the
//! operator into an open polyline so that only part of the field has a headland.
//!
//! - [`offset::build_headland`] builds a closed headland line from a [`BoundaryRing`].
//! - [`anchor::nearest_anchor`] snaps an operator selected point onto a ring.
//! - [`clip::clip_at_line`] cuts a ring along the line through two anchors.
//!
//! A [`HeadlandLine`] is never edited once built, every change produces a new line with a new
//! revision.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod anchor;
pub mod clip;
pub mod offset;
pub mod ring;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;
use thiserror::Error;

use crate::{
    geom::{self, GuidePoint},
    revision::next_revision,
};
use comms_if::files::{HeadlandFile, HeadlandFilePoint};

pub use anchor::{nearest_anchor, BoundaryAnchor};
pub use clip::clip_at_line;
pub use comms_if::tc::{ClipMode, JoinType};
pub use offset::build_headland;
pub use ring::BoundaryRing;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The headland line, either a closed ring or an open polyline after clipping.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlandLine {
    points: Vec<GuidePoint>,
    closed: bool,
    move_distance_m: f64,
    revision: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeadlandError {
    #[error("A ring needs at least 3 distinct points, got {0}")]
    TooFewRingPoints(usize),

    #[error("The ring encloses no area")]
    ZeroArea,

    #[error("A headland line needs at least 2 points, got {0}")]
    TooFewLinePoints(usize),

    #[error("The ring contains a non-finite coordinate")]
    NonFinitePoint,

    #[error("The offset distance must be positive and finite, got {0}")]
    InvalidDistance(f64),

    #[error("The boundary collapses when offset by {0} m")]
    Collapsed(f64),

    #[error("The offset ring intersects itself")]
    SelfIntersecting,

    #[error("The clip points are too close together to define a line")]
    DegenerateClipLine,

    #[error("The clip line crosses the ring {0} time(s), at least 2 are needed")]
    TooFewIntersections(usize),

    #[error("The anchor was made against ring revision {anchor}, the ring is now revision {ring}")]
    StaleAnchor { anchor: u64, ring: u64 },

    #[error("Only a closed headland can be clipped")]
    NotClosed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadlandLine {
    /// Create a closed headland line from the given ring points.
    pub fn new_closed(
        positions: &[Vector2<f64>],
        move_distance_m: f64,
    ) -> Result<Self, HeadlandError> {
        let points = geom::dedup_points(positions, geom::EPSILON, true);

        if points.len() < 3 {
            return Err(HeadlandError::TooFewRingPoints(points.len()));
        }

        Ok(Self::from_parts(points, true, move_distance_m))
    }

    /// Create an open headland line from the given polyline points.
    pub fn new_open(
        positions: &[Vector2<f64>],
        move_distance_m: f64,
    ) -> Result<Self, HeadlandError> {
        let points = geom::dedup_points(positions, geom::EPSILON, false);

        if points.len() < 2 {
            return Err(HeadlandError::TooFewLinePoints(points.len()));
        }

        Ok(Self::from_parts(points, false, move_distance_m))
    }

    /// Restore a headland line from its persisted file.
    pub fn from_file(file: &HeadlandFile) -> Result<Self, HeadlandError> {
        let positions: Vec<Vector2<f64>> = file
            .points
            .iter()
            .map(|p| Vector2::new(p.easting_m, p.northing_m))
            .collect();

        if positions.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(HeadlandError::NonFinitePoint);
        }

        // Headings are always recomputed from the points
        match file.closed {
            true => Self::new_closed(&positions, file.move_distance_m),
            false => Self::new_open(&positions, file.move_distance_m),
        }
    }

    /// Convert into the persisted file format.
    pub fn to_file(&self) -> HeadlandFile {
        HeadlandFile {
            move_distance_m: self.move_distance_m,
            closed: self.closed,
            points: self
                .points
                .iter()
                .map(|p| HeadlandFilePoint {
                    easting_m: p.position_m.x,
                    northing_m: p.position_m.y,
                    heading_rad: p.heading_rad,
                })
                .collect(),
        }
    }

    pub fn points(&self) -> &[GuidePoint] {
        &self.points
    }

    pub fn positions(&self) -> Vec<Vector2<f64>> {
        self.points.iter().map(|p| p.position_m).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn move_distance_m(&self) -> f64 {
        self.move_distance_m
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total length of the line, including the closing segment of a ring.
    pub fn length_m(&self) -> f64 {
        geom::polyline_length(&self.positions(), self.closed)
    }

    /// View a closed headland as a ring, so that it can be snapped to and clipped.
    ///
    /// The ring shares this line's revision, so anchors made against it go stale when the
    /// headland is replaced.
    pub fn as_ring(&self) -> Result<BoundaryRing, HeadlandError> {
        if !self.closed {
            return Err(HeadlandError::NotClosed);
        }

        BoundaryRing::with_revision(self.positions(), self.revision)
    }

    /// Distance along a ray to the nearest crossing of the line, if there is one.
    pub fn ray_distance(&self, origin_m: &Vector2<f64>, heading_rad: f64) -> Option<f64> {
        geom::ray_polyline_distance(
            origin_m,
            &geom::heading_to_dir(heading_rad),
            &self.positions(),
            self.closed,
        )
    }

    /// Iterate over the segments of the line, including the closing segment of a ring.
    pub fn segments(&self) -> impl Iterator<Item = (Vector2<f64>, Vector2<f64>)> + '_ {
        let n = self.points.len();
        let num_segs = match self.closed {
            true => n,
            false => n.saturating_sub(1),
        };

        (0..num_segs).map(move |i| {
            (
                self.points[i].position_m,
                self.points[(i + 1) % n].position_m,
            )
        })
    }

    fn from_parts(positions: Vec<Vector2<f64>>, closed: bool, move_distance_m: f64) -> Self {
        Self {
            points: geom::tangent_headings(&positions, closed),
            closed,
            move_distance_m,
            revision: next_revision(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn square_line() -> HeadlandLine {
        HeadlandLine::new_closed(
            &[
                Vector2::new(10.0, 10.0),
                Vector2::new(90.0, 10.0),
                Vector2::new(90.0, 90.0),
                Vector2::new(10.0, 90.0),
            ],
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_ray_distance() {
        let line = square_line();

        // North from the middle of the field
        assert_relative_eq!(
            line.ray_distance(&Vector2::new(50.0, 50.0), 0.0).unwrap(),
            40.0,
            epsilon = 1e-9
        );

        // Outside the line looking away
        assert!(line
            .ray_distance(&Vector2::new(50.0, 95.0), 0.0)
            .is_none());

        // Open lines have no closing segment
        let open = HeadlandLine::new_open(
            &[Vector2::new(10.0, 90.0), Vector2::new(90.0, 90.0)],
            10.0,
        )
        .unwrap();
        assert!(open.ray_distance(&Vector2::new(50.0, 50.0), 0.0).is_some());
        assert!(open
            .ray_distance(&Vector2::new(50.0, 50.0), std::f64::consts::PI)
            .is_none());
    }

    #[test]
    fn test_file_round_trip_recomputes_headings() {
        let line = square_line();
        let mut file = line.to_file();
        for p in file.points.iter_mut() {
            p.heading_rad = 0.0;
        }

        let restored = HeadlandLine::from_file(&file).unwrap();
        assert!(restored.is_closed());
        assert_eq!(restored.move_distance_m(), 10.0);
        assert_ne!(restored.revision(), line.revision());
        for (a, b) in restored.points().iter().zip(line.points()) {
            assert_relative_eq!(a.heading_rad, b.heading_rad);
        }
    }

    #[test]
    fn test_too_few_points() {
        assert_eq!(
            HeadlandLine::new_closed(&[Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)], 1.0)
                .unwrap_err(),
            HeadlandError::TooFewRingPoints(2)
        );
        assert_eq!(
            HeadlandLine::new_open(&[Vector2::new(0.0, 0.0), Vector2::new(0.0, 0.0)], 1.0)
                .unwrap_err(),
            HeadlandError::TooFewLinePoints(1)
        );
    }
}
