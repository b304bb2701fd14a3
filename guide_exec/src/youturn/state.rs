//! YouTurn state and outputs

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt::{self, Display};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::follow::TurnFollow;
use crate::{geom::GuidePoint, track_guid::GuideLine};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The state of the YouTurn planner, carried between ticks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnState {
    pub phase: TurnPhase,

    /// The turn path, empty while idle
    pub turn_path: Vec<GuidePoint>,

    pub is_turn_left: bool,

    /// Whether the vehicle was heading along `A -> B` when the path was created
    pub was_heading_same_way_at_start: bool,

    /// The active path index
    pub paths_away: i32,

    /// The active path index when the turn path was created
    pub paths_away_at_start: i32,

    /// Idle ticks since the last turn completed or path creation was last attempted
    pub since_last_turn_ticks: u32,

    pub last_completion_position_m: Option<Vector2<f64>>,

    /// Distance travelled by the pivot since the turn was triggered
    pub distance_travelled_m: f64,

    pub last_pivot_m: Option<Vector2<f64>>,

    /// Index of the turn path segment currently being followed
    pub follow_index: usize,
}

/// What the planner produced this tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnOutput {
    /// Steer demand from turn following, present while a turn is being driven
    pub steer: Option<TurnFollow>,

    /// Something noteworthy which happened this tick
    pub event: Option<TurnEvent>,

    /// Distance to the headland along the direction of travel, `None` if not measured or infinite
    pub distance_to_headland_m: Option<f64>,

    /// The line the vehicle will be on after the next (or current) turn
    pub next_line_preview: Option<GuideLine>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnPhase {
    /// Watching for the headland
    Idle,

    /// A turn path exists, waiting for the vehicle to reach its start
    Approaching,

    /// Driving the turn path
    Triggered,
}

/// How a turn path was made.
#[derive(Debug, Copy, Clone, Serialize, PartialEq, Eq)]
pub enum PathSource {
    Creator,
    Direct,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum TurnEvent {
    PathCreated {
        num_points: usize,
        source: PathSource,
    },
    CreateFailed,
    EndOfField,
    Triggered {
        paths_away: i32,
    },
    Completed {
        paths_away: i32,
    },
    Discarded,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TurnState {
    pub fn new(paths_away: i32) -> Self {
        Self {
            phase: TurnPhase::Idle,
            turn_path: Vec::new(),
            is_turn_left: false,
            was_heading_same_way_at_start: false,
            paths_away,
            paths_away_at_start: paths_away,
            since_last_turn_ticks: 0,
            last_completion_position_m: None,
            distance_travelled_m: 0.0,
            last_pivot_m: None,
            follow_index: 0,
        }
    }

    pub fn has_path(&self) -> bool {
        !self.turn_path.is_empty()
    }

    /// Drop any turn path and return to idle.
    ///
    /// The active path index is kept, so a turn aborted after it was triggered leaves the vehicle
    /// on the new path.
    pub fn abort(&self) -> Self {
        Self {
            last_completion_position_m: self.last_completion_position_m,
            ..Self::new(self.paths_away)
        }
    }

    /// Abort any turn and move to the given path.
    pub fn with_paths_away(&self, paths_away: i32) -> Self {
        Self {
            paths_away,
            paths_away_at_start: paths_away,
            ..self.abort()
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSource::Creator => write!(f, "tangent arc"),
            PathSource::Direct => write!(f, "direct"),
        }
    }
}

impl Display for TurnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnEvent::PathCreated { num_points, source } => write!(
                f,
                "Turn path created with {} points ({})",
                num_points, source
            ),
            TurnEvent::CreateFailed => write!(f, "Could not create a turn path"),
            TurnEvent::EndOfField => write!(f, "End of field reached"),
            TurnEvent::Triggered { paths_away } => write!(f, "Following path {}", paths_away),
            TurnEvent::Completed { paths_away } => {
                write!(f, "YouTurn complete, now on path {}", paths_away)
            }
            TurnEvent::Discarded => write!(f, "Turn path discarded"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_abort_keeps_path_index() {
        let mut state = TurnState::new(3);
        state.phase = TurnPhase::Triggered;
        state.paths_away = 4;
        state.turn_path = vec![GuidePoint {
            position_m: Vector2::new(0.0, 0.0),
            heading_rad: 0.0,
        }];

        let aborted = state.abort();
        assert_eq!(aborted.phase, TurnPhase::Idle);
        assert_eq!(aborted.paths_away, 4);
        assert_eq!(aborted.paths_away_at_start, 4);
        assert!(!aborted.has_path());

        let moved = state.with_paths_away(-2);
        assert_eq!(moved.paths_away, -2);
        assert_eq!(moved.phase, TurnPhase::Idle);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TurnEvent::EndOfField.to_string(), "End of field reached");
        assert_eq!(
            TurnEvent::Triggered { paths_away: -3 }.to_string(),
            "Following path -3"
        );
    }
}
