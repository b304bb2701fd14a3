//! # YouTurn module
//!
//! Automatic U-turns at the headland. The planner is a state machine stepped once per tick:
//!
//! - `Idle` - Watching the distance to the headland. When it is far enough away, and the next line
//!   over is still in the field, a turn path is created.
//! - `Approaching` - Waiting for the vehicle to reach the start of the turn path. Reaching it
//!   triggers the turn and moves the active path index onto the next line.
//! - `Triggered` - Steering along the turn path until it is complete, then back to `Idle`.
//!
//! [`step`] is pure, it takes the previous [`TurnState`] and returns the next one alongside the
//! tick's [`TurnOutput`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod creator;
pub mod follow;
pub mod params;
pub mod path_gen;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use nalgebra::Vector2;

use crate::{
    geom,
    headland::{offset::offset_ring, BoundaryRing, HeadlandLine, JoinType},
    loc::Pose,
    track_guid::{Track, VehicleParams},
};
use util::maths::ang_dist;

pub use creator::{
    FieldClassifier, FieldZone, PointClassifier, TangentArcTurn, TurnCreateError, TurnCreator,
    TurnRequest,
};
pub use params::YouTurnParams;
pub use state::{PathSource, TurnEvent, TurnOutput, TurnPhase, TurnState};

use path_gen::TurnFrame;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the planner reads each tick.
#[derive(Clone, Copy)]
pub struct TurnInputs<'a> {
    pub pose: &'a Pose,
    pub track: &'a Track,
    pub boundary: &'a BoundaryRing,
    pub headland: &'a HeadlandLine,
    pub vehicle: &'a VehicleParams,
    pub params: &'a YouTurnParams,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The path index after a turn from `base`.
///
/// The index moves by `row_skip_width` in the positive direction (to the right of `A -> B`) when
/// exactly one of `is_turn_left` and `is_heading_same_way` holds, and in the negative direction
/// otherwise.
pub fn next_paths_away(
    base: i32,
    is_turn_left: bool,
    is_heading_same_way: bool,
    row_skip_width: i32,
) -> i32 {
    if is_turn_left ^ is_heading_same_way {
        base + row_skip_width
    } else {
        base - row_skip_width
    }
}

/// True if the heading is within the alignment tolerance of either direction of the track.
pub fn is_aligned(track_heading_rad: f64, heading_rad: f64, params: &YouTurnParams) -> bool {
    let diff = ang_dist(track_heading_rad, heading_rad).abs();
    let tol = params.alignment_tolerance_deg.to_radians();

    diff <= tol || std::f64::consts::PI - diff <= tol
}

/// True if a turn path may be created.
pub fn can_create(
    distance_m: Option<f64>,
    since_last_turn_ticks: u32,
    aligned: bool,
    params: &YouTurnParams,
) -> bool {
    match distance_m {
        Some(d) => {
            aligned
                && since_last_turn_ticks >= params.min_ticks_between_turns
                && d.is_finite()
                && d > params.min_distance_to_create_m
        }
        None => false,
    }
}

/// True if the pivot is close enough to the path start to trigger the turn.
pub fn should_trigger(distance_to_start_m: f64, params: &YouTurnParams) -> bool {
    distance_to_start_m <= params.trigger_radius_m
}

/// Position based completion check, used alongside the turn following's own.
pub fn position_complete(
    distance_to_end_m: f64,
    distance_to_start_m: f64,
    distance_travelled_m: f64,
    params: &YouTurnParams,
) -> bool {
    distance_to_end_m <= params.completion_radius_m
        && distance_to_end_m < distance_to_start_m
        && distance_travelled_m > params.min_turn_travel_m
}

/// Distance from the pivot to the headland along the direction of travel.
///
/// `None` if the vehicle is not aligned with the track or the headland is not ahead.
pub fn headland_distance_m(inputs: &TurnInputs) -> Option<f64> {
    let heading = inputs.pose.heading_rad;

    if !is_aligned(inputs.track.heading_rad(), heading, inputs.params) {
        return None;
    }

    inputs
        .headland
        .ray_distance(&inputs.pose.position_m, inputs.track.travel_heading(heading))
}

/// Advance the planner by one tick.
pub fn step(
    state: &TurnState,
    inputs: &TurnInputs,
    creator: &dyn TurnCreator,
) -> (TurnState, TurnOutput) {
    let mut next = state.clone();
    let mut output = TurnOutput::default();

    match state.phase {
        TurnPhase::Idle => step_idle(&mut next, &mut output, inputs, creator),
        TurnPhase::Approaching => step_approaching(&mut next, &mut output, inputs),
        TurnPhase::Triggered => step_triggered(&mut next, &mut output, inputs),
    }

    (next, output)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn step_idle(
    next: &mut TurnState,
    output: &mut TurnOutput,
    inputs: &TurnInputs,
    creator: &dyn TurnCreator,
) {
    let pose = inputs.pose;
    let params = inputs.params;

    next.since_last_turn_ticks = next.since_last_turn_ticks.saturating_add(1);

    let is_heading_same_way = inputs.track.is_heading_same_way(pose.heading_rad);
    let is_turn_left = is_heading_same_way;

    let next_line = inputs.track.guide_line(
        next_paths_away(
            next.paths_away,
            is_turn_left,
            is_heading_same_way,
            params.row_skip_width(),
        ),
        inputs.vehicle.track_width_m,
    );
    output.next_line_preview = Some(next_line);

    let aligned = is_aligned(inputs.track.heading_rad(), pose.heading_rad, params);
    let distance = headland_distance_m(inputs);
    output.distance_to_headland_m = distance;

    let distance_m = match distance {
        Some(d) if can_create(distance, next.since_last_turn_ticks, aligned, params) => d,
        _ => return,
    };

    // End-of-field check. The point tested is the midpoint of the stretch of the next line
    // between the points abeam the pivot and abeam the headland crossing, not the midpoint
    // of the shifted A-B segment. A and B are only two clicks on the line and can sit far
    // from the part of the field being worked, so only the stretch about to be driven is
    // tested.
    let travel_dir = geom::heading_to_dir(inputs.track.travel_heading(pose.heading_rad));
    let crossing_m = pose.position_m + travel_dir * distance_m;
    let midpoint_m =
        (next_line.project(&pose.position_m) + next_line.project(&crossing_m)) * 0.5;

    if !inputs.boundary.contains(&midpoint_m) {
        info!("End of field reached, the next line is outside the boundary");
        output.event = Some(TurnEvent::EndOfField);
        next.since_last_turn_ticks = 0;
        return;
    }

    match create_path(inputs, creator, next.paths_away, is_turn_left, distance_m) {
        Some((points, source)) => {
            info!(
                "Turn path created ({}) with {} points, turning {}",
                source,
                points.len(),
                if is_turn_left { "left" } else { "right" }
            );

            output.event = Some(TurnEvent::PathCreated {
                num_points: points.len(),
                source,
            });

            next.phase = TurnPhase::Approaching;
            next.turn_path = geom::tangent_headings(&points, false);
            next.is_turn_left = is_turn_left;
            next.was_heading_same_way_at_start = is_heading_same_way;
            next.paths_away_at_start = next.paths_away;
        }
        None => {
            warn!("No usable turn path could be created, will retry");
            output.event = Some(TurnEvent::CreateFailed);
            next.since_last_turn_ticks = 0;
        }
    }
}

fn step_approaching(next: &mut TurnState, output: &mut TurnOutput, inputs: &TurnInputs) {
    let pose = inputs.pose;
    let params = inputs.params;

    output.next_line_preview = Some(inputs.track.guide_line(
        next_paths_away(
            next.paths_away_at_start,
            next.is_turn_left,
            next.was_heading_same_way_at_start,
            params.row_skip_width(),
        ),
        inputs.vehicle.track_width_m,
    ));

    let is_heading_same_way = inputs.track.is_heading_same_way(pose.heading_rad);

    let start_m = match next.turn_path.first() {
        Some(p) if is_heading_same_way == next.was_heading_same_way_at_start => p.position_m,
        _ => {
            info!("Vehicle turned away before reaching the turn, discarding the path");
            *next = next.abort();
            output.event = Some(TurnEvent::Discarded);
            return;
        }
    };

    let distance_to_start_m = (pose.position_m - start_m).norm();
    if !should_trigger(distance_to_start_m, params) {
        return;
    }

    next.phase = TurnPhase::Triggered;
    next.paths_away = next_paths_away(
        next.paths_away_at_start,
        next.is_turn_left,
        is_heading_same_way,
        params.row_skip_width(),
    );
    next.distance_travelled_m = 0.0;
    next.last_pivot_m = Some(pose.position_m);
    next.follow_index = 0;

    info!("YouTurn triggered, following path {}", next.paths_away);
    output.event = Some(TurnEvent::Triggered {
        paths_away: next.paths_away,
    });

    output.steer = follow::follow_turn(&next.turn_path, 0, pose, inputs.vehicle);
    if let Some(f) = output.steer {
        next.follow_index = f.follow_index;
    }
}

fn step_triggered(next: &mut TurnState, output: &mut TurnOutput, inputs: &TurnInputs) {
    let pose = inputs.pose;
    let params = inputs.params;

    output.next_line_preview = Some(
        inputs
            .track
            .guide_line(next.paths_away, inputs.vehicle.track_width_m),
    );

    next.distance_travelled_m += next
        .last_pivot_m
        .map(|p| (pose.position_m - p).norm())
        .unwrap_or(0.0);
    next.last_pivot_m = Some(pose.position_m);

    let follow = follow::follow_turn(&next.turn_path, next.follow_index, pose, inputs.vehicle);
    let follow_complete = follow.map(|f| f.is_complete).unwrap_or(true);

    let by_position = match (next.turn_path.first(), next.turn_path.last()) {
        (Some(first), Some(last)) => position_complete(
            (pose.position_m - last.position_m).norm(),
            (pose.position_m - first.position_m).norm(),
            next.distance_travelled_m,
            params,
        ),
        _ => true,
    };

    if follow_complete != by_position {
        debug!(
            "Turn completion checks disagree: following {}, position {}",
            follow_complete, by_position
        );
    }

    if follow_complete || by_position {
        complete(next, pose.position_m, params);
        info!("YouTurn complete, now on path {}", next.paths_away);
        output.event = Some(TurnEvent::Completed {
            paths_away: next.paths_away,
        });
        return;
    }

    if let Some(f) = follow {
        next.follow_index = f.follow_index;
    }
    output.steer = follow;
}

fn complete(next: &mut TurnState, pivot_m: Vector2<f64>, params: &YouTurnParams) {
    // The heading has flipped by now, so the direction captured at creation is used
    let paths_away = next_paths_away(
        next.paths_away_at_start,
        next.is_turn_left,
        next.was_heading_same_way_at_start,
        params.row_skip_width(),
    );

    *next = TurnState {
        since_last_turn_ticks: params.min_ticks_between_turns,
        last_completion_position_m: Some(pivot_m),
        ..TurnState::new(paths_away)
    };
}

/// Ask the creator for a path, falling back to the direct construction.
fn create_path(
    inputs: &TurnInputs,
    creator: &dyn TurnCreator,
    paths_away: i32,
    is_turn_left: bool,
    headland_distance_m: f64,
) -> Option<(Vec<Vector2<f64>>, PathSource)> {
    let params = inputs.params;
    let track = inputs.track;
    let pose = inputs.pose;

    let track_width_m = inputs.vehicle.track_width_m;
    let offset_m = track_width_m * params.row_skip_width() as f64;
    let radius_m = params.turn_radius_m(track_width_m);
    let travel_heading_rad = track.travel_heading(pose.heading_rad);

    match request_turn(inputs, creator, paths_away, is_turn_left, offset_m, radius_m) {
        Ok(points) if points.len() >= params.min_path_points => {
            return Some((points, PathSource::Creator))
        }
        Ok(points) => warn!(
            "Turn creator returned only {} points, using the direct turn",
            points.len()
        ),
        Err(e) => warn!("Turn creator failed ({}), using the direct turn", e),
    }

    let current_line = track.guide_line(paths_away, track_width_m);
    let frame = TurnFrame::new(
        current_line.project(&pose.position_m),
        travel_heading_rad,
        is_turn_left,
    );

    let points = path_gen::fallback_turn(&frame, headland_distance_m, offset_m, radius_m, params);

    if points.len() >= params.min_path_points {
        Some((points, PathSource::Direct))
    } else {
        None
    }
}

/// Build the creator's request and pass it on.
fn request_turn(
    inputs: &TurnInputs,
    creator: &dyn TurnCreator,
    paths_away: i32,
    is_turn_left: bool,
    offset_m: f64,
    radius_m: f64,
) -> Result<Vec<Vector2<f64>>, TurnCreateError> {
    let params = inputs.params;
    let track = inputs.track;
    let boundary = inputs.boundary.points();

    let tangent_ring_m = offset_ring(boundary, params.tool_width_m, JoinType::Round)?;
    let safe_ring_m = offset_ring(boundary, params.headland_total_width_m, JoinType::Round)?;
    let classifier = FieldClassifier::new(boundary, &safe_ring_m);

    let request = TurnRequest {
        tangent_ring_m: &tangent_ring_m,
        safe_ring_m: &safe_ring_m,
        classifier: &classifier,
        // Lines are spaced by the track width, the tool width only sizes the tangent ring
        reference_point_m: track.point_a()
            + track.perp() * (paths_away as f64 * inputs.vehicle.track_width_m),
        pivot_m: inputs.pose.position_m,
        travel_heading_rad: track.travel_heading(inputs.pose.heading_rad),
        is_turn_left,
        turn_offset_m: offset_m,
        radius_m,
        params,
    };

    creator.create(&request)
}
