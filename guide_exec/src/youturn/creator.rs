//! # Turn creators
//!
//! A [`TurnCreator`] is a service which synthesises a turn path given the field's geometry. The
//! planner asks the creator first and falls back to the direct construction in
//! [`super::path_gen`] if the creator fails.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use serde::Serialize;
use thiserror::Error;

use super::{
    params::YouTurnParams,
    path_gen::{self, TurnFrame, UTurnShape},
};
use crate::{geom, headland::HeadlandError};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Service which creates turn paths.
pub trait TurnCreator {
    /// Create a turn path for the request.
    fn create(&self, request: &TurnRequest) -> Result<Vec<Vector2<f64>>, TurnCreateError>;
}

/// Tells which part of the field a point is in.
pub trait PointClassifier {
    fn classify(&self, point_m: &Vector2<f64>) -> FieldZone;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything a creator is given to build a turn.
pub struct TurnRequest<'a> {
    /// The boundary offset inwards by one tool width, which the turn should touch
    pub tangent_ring_m: &'a [Vector2<f64>],

    /// The boundary offset inwards by the headland width, the edge of the worked field
    pub safe_ring_m: &'a [Vector2<f64>],

    pub classifier: &'a dyn PointClassifier,

    /// A point on the current line
    pub reference_point_m: Vector2<f64>,

    pub pivot_m: Vector2<f64>,

    /// Heading of travel along the current line
    pub travel_heading_rad: f64,

    pub is_turn_left: bool,

    /// Sideways distance to the next line
    pub turn_offset_m: f64,

    pub radius_m: f64,

    pub params: &'a YouTurnParams,
}

/// Classifies points against the outer boundary and the safe ring.
pub struct FieldClassifier<'a> {
    boundary_m: &'a [Vector2<f64>],
    safe_ring_m: &'a [Vector2<f64>],
}

/// Creates a U-turn whose apex touches the tangent ring.
///
/// The entry leg starts a lead distance before the safe ring. The path is rejected if any point
/// leaves the field.
#[derive(Debug, Default, Copy, Clone)]
pub struct TangentArcTurn;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Serialize, PartialEq, Eq)]
pub enum FieldZone {
    OutsideField,
    InsideField,
    InTurnZone,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TurnCreateError {
    #[error("The turn does not reach the tangent ring")]
    NoTangentCrossing,

    #[error("The current line does not cross the safe ring ahead")]
    NoSafeCrossing,

    #[error(
        "No room for the turn: the arc would start at {arc_start_m:.1} m, the entry at \
        {entry_start_m:.1} m"
    )]
    NoRoom {
        arc_start_m: f64,
        entry_start_m: f64,
    },

    #[error("Turn path point {0} lies outside the field")]
    LeavesField(usize),

    #[error("Could not offset the boundary: {0}")]
    Offset(#[from] HeadlandError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> FieldClassifier<'a> {
    pub fn new(boundary_m: &'a [Vector2<f64>], safe_ring_m: &'a [Vector2<f64>]) -> Self {
        Self {
            boundary_m,
            safe_ring_m,
        }
    }
}

impl<'a> PointClassifier for FieldClassifier<'a> {
    fn classify(&self, point_m: &Vector2<f64>) -> FieldZone {
        if !geom::point_in_polygon(point_m, self.boundary_m) {
            FieldZone::OutsideField
        } else if geom::point_in_polygon(point_m, self.safe_ring_m) {
            FieldZone::InsideField
        } else {
            FieldZone::InTurnZone
        }
    }
}

impl<'a> TurnRequest<'a> {
    /// Frame on the current line, level with the pivot.
    pub fn frame(&self) -> TurnFrame {
        let unanchored = TurnFrame::new(
            self.reference_point_m,
            self.travel_heading_rad,
            self.is_turn_left,
        );
        let s_pivot = unanchored.s_of(&self.pivot_m);

        TurnFrame {
            origin_m: unanchored.point(s_pivot, 0.0),
            ..unanchored
        }
    }
}

impl TurnCreator for TangentArcTurn {
    fn create(&self, request: &TurnRequest) -> Result<Vec<Vector2<f64>>, TurnCreateError> {
        let frame = request.frame();
        let r = request.radius_m;
        let params = request.params;

        // Sample across the width of the turn, the apex may not pass the ring anywhere
        const NUM_SAMPLES: usize = 8;
        let mut apex_s_m = f64::INFINITY;
        for k in 0..=NUM_SAMPLES {
            let l = 2.0 * r * k as f64 / NUM_SAMPLES as f64;
            let s = geom::ray_polyline_distance(
                &frame.point(0.0, l),
                &frame.along,
                request.tangent_ring_m,
                true,
            )
            .ok_or(TurnCreateError::NoTangentCrossing)?;
            apex_s_m = apex_s_m.min(s);
        }

        let safe_s_m =
            geom::ray_polyline_distance(&frame.origin_m, &frame.along, request.safe_ring_m, true)
                .ok_or(TurnCreateError::NoSafeCrossing)?;

        let shape = UTurnShape {
            entry_start_s_m: safe_s_m - params.entry_lead_m,
            arc_start_s_m: apex_s_m - r,
            radius_m: r,
            offset_m: request.turn_offset_m,
        };

        if shape.entry_start_s_m < 0.0
            || shape.arc_start_s_m < shape.entry_start_s_m + params.point_spacing_m
        {
            return Err(TurnCreateError::NoRoom {
                arc_start_m: shape.arc_start_s_m,
                entry_start_m: shape.entry_start_s_m,
            });
        }

        let points = path_gen::u_turn(
            &frame,
            &shape,
            params.point_spacing_m,
            params.min_arc_segments,
        );

        if let Some(i) = points
            .iter()
            .position(|p| request.classifier.classify(p) == FieldZone::OutsideField)
        {
            return Err(TurnCreateError::LeavesField(i));
        }

        debug!(
            "Tangent arc turn: entry at {:.1} m, arc at {:.1} m, {} points",
            shape.entry_start_s_m,
            shape.arc_start_s_m,
            points.len()
        );

        Ok(points)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::headland::{offset::offset_ring, JoinType};
    use approx::assert_relative_eq;

    fn field() -> Vec<Vector2<f64>> {
        vec![
            Vector2::new(-100.0, -100.0),
            Vector2::new(100.0, -100.0),
            Vector2::new(100.0, 100.0),
            Vector2::new(-100.0, 100.0),
        ]
    }

    #[test]
    fn test_classifier() {
        let boundary = field();
        let safe = offset_ring(&boundary, 12.0, JoinType::Miter).unwrap();
        let c = FieldClassifier::new(&boundary, &safe);

        assert_eq!(c.classify(&Vector2::new(0.0, 0.0)), FieldZone::InsideField);
        assert_eq!(c.classify(&Vector2::new(0.0, 95.0)), FieldZone::InTurnZone);
        assert_eq!(c.classify(&Vector2::new(0.0, 105.0)), FieldZone::OutsideField);
    }

    #[test]
    fn test_tangent_arc_turn() {
        let boundary = field();
        let params = YouTurnParams::default();
        let tangent = offset_ring(&boundary, params.tool_width_m, JoinType::Round).unwrap();
        let safe = offset_ring(&boundary, params.headland_total_width_m, JoinType::Round).unwrap();
        let classifier = FieldClassifier::new(&boundary, &safe);

        let request = TurnRequest {
            tangent_ring_m: &tangent,
            safe_ring_m: &safe,
            classifier: &classifier,
            reference_point_m: Vector2::new(0.0, -20.0),
            pivot_m: Vector2::new(0.5, 50.0),
            travel_heading_rad: 0.0,
            is_turn_left: true,
            turn_offset_m: 6.0,
            radius_m: 4.0,
            params: &params,
        };

        let pts = TangentArcTurn.create(&request).unwrap();

        // Apex touches the tangent ring at northing 94
        let max_n = pts.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        assert_relative_eq!(max_n, 94.0, epsilon = 1e-9);

        // Starts on the current line before the safe ring, ends on the line to the left
        assert_relative_eq!(pts[0], Vector2::new(0.0, 82.0), epsilon = 1e-9);
        assert_relative_eq!(pts[pts.len() - 1], Vector2::new(-6.0, 82.0), epsilon = 1e-9);
        assert!(pts.iter().all(|p| p.x <= 1e-9));

        // Same request, same path
        assert_eq!(TangentArcTurn.create(&request).unwrap(), pts);
    }

    #[test]
    fn test_tangent_arc_no_room() {
        let boundary = field();
        let params = YouTurnParams {
            headland_total_width_m: 2.0,
            ..Default::default()
        };
        let tangent = offset_ring(&boundary, params.tool_width_m, JoinType::Round).unwrap();
        let safe = offset_ring(&boundary, params.headland_total_width_m, JoinType::Round).unwrap();
        let classifier = FieldClassifier::new(&boundary, &safe);

        // The safe ring lies outside the tangent ring, the arc would start before the entry
        let request = TurnRequest {
            tangent_ring_m: &tangent,
            safe_ring_m: &safe,
            classifier: &classifier,
            reference_point_m: Vector2::new(0.0, 0.0),
            pivot_m: Vector2::new(0.0, 50.0),
            travel_heading_rad: 0.0,
            is_turn_left: false,
            turn_offset_m: 6.0,
            radius_m: 4.0,
            params: &params,
        };

        assert!(matches!(
            TangentArcTurn.create(&request),
            Err(TurnCreateError::NoRoom { .. })
        ));
    }
}
