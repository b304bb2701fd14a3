//! YouTurn parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance from the path start within which the turn is triggered.
pub const DEFAULT_TRIGGER_RADIUS_M: f64 = 2.0;

/// Distance from the path end within which the turn may be considered complete.
pub const DEFAULT_COMPLETION_RADIUS_M: f64 = 2.0;

/// Distance that must be travelled after the trigger before the turn may complete.
pub const DEFAULT_MIN_TURN_TRAVEL_M: f64 = 5.0;

/// Distance to the headland must exceed this for a path to be created.
pub const DEFAULT_MIN_DISTANCE_TO_CREATE_M: f64 = 30.0;

/// Maximum angle between the vehicle and the line (either way) for the headland to be measured.
pub const DEFAULT_ALIGNMENT_TOLERANCE_DEG: f64 = 20.0;

/// Idle ticks required between turns.
pub const DEFAULT_MIN_TICKS_BETWEEN_TURNS: u32 = 4;

/// Spacing of points along the straight parts of a turn path.
pub const DEFAULT_POINT_SPACING_M: f64 = 0.5;

/// Smallest radius a turn arc may have.
pub const DEFAULT_MIN_TURN_RADIUS_M: f64 = 4.0;

/// Smallest number of segments in a turn arc.
pub const DEFAULT_MIN_ARC_SEGMENTS: usize = 20;

/// Paths with fewer points than this are rejected.
pub const DEFAULT_MIN_PATH_POINTS: usize = 10;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the YouTurn planner.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct YouTurnParams {
    /// Number of paths skipped on each turn.
    pub row_skip_rows: u32,

    /// Width of the implement.
    pub tool_width_m: f64,

    /// Total width of the headland strip, measured in from the boundary.
    pub headland_total_width_m: f64,

    /// Length of the straight entry into the headland before the arc starts.
    pub headland_leg_length_m: f64,

    /// Length of the straight lead-in before the headland crossing.
    pub entry_lead_m: f64,

    pub trigger_radius_m: f64,
    pub completion_radius_m: f64,
    pub min_turn_travel_m: f64,
    pub min_distance_to_create_m: f64,
    pub alignment_tolerance_deg: f64,
    pub min_ticks_between_turns: u32,
    pub point_spacing_m: f64,
    pub min_turn_radius_m: f64,
    pub min_arc_segments: usize,
    pub min_path_points: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl YouTurnParams {
    /// Number of paths moved across on each turn.
    pub fn row_skip_width(&self) -> i32 {
        self.row_skip_rows as i32 + 1
    }

    /// Radius of the turn arc for the given track width.
    pub fn turn_radius_m(&self, track_width_m: f64) -> f64 {
        self.min_turn_radius_m
            .max(track_width_m * self.row_skip_width() as f64 / 2.0)
    }
}

impl Default for YouTurnParams {
    fn default() -> Self {
        Self {
            row_skip_rows: 0,
            tool_width_m: 6.0,
            headland_total_width_m: 12.0,
            headland_leg_length_m: 3.0,
            entry_lead_m: 6.0,
            trigger_radius_m: DEFAULT_TRIGGER_RADIUS_M,
            completion_radius_m: DEFAULT_COMPLETION_RADIUS_M,
            min_turn_travel_m: DEFAULT_MIN_TURN_TRAVEL_M,
            min_distance_to_create_m: DEFAULT_MIN_DISTANCE_TO_CREATE_M,
            alignment_tolerance_deg: DEFAULT_ALIGNMENT_TOLERANCE_DEG,
            min_ticks_between_turns: DEFAULT_MIN_TICKS_BETWEEN_TURNS,
            point_spacing_m: DEFAULT_POINT_SPACING_M,
            min_turn_radius_m: DEFAULT_MIN_TURN_RADIUS_M,
            min_arc_segments: DEFAULT_MIN_ARC_SEGMENTS,
            min_path_points: DEFAULT_MIN_PATH_POINTS,
        }
    }
}
