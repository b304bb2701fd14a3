//! # Guidance manager
//!
//! The guidance manager owns everything that persists between ticks: the active track and path
//! index, the guidance filter memory and the YouTurn state. Each tick it takes the latest pose and
//! a snapshot of the field and decides who steers:
//!
//! - While a turn is being driven the YouTurn planner's turn following steers.
//! - Otherwise the track guidance steers to the active parallel line.
//!
//! The filter memory is cleared whenever the line being followed changes, which covers selecting a
//! new track, moving to another path and completing a turn.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    field::FieldGeometry,
    geom::GuidePoint,
    loc::Pose,
    track_guid::{self, GuidanceError, GuidanceFilterState, GuideLine, Track},
    youturn::{self, TangentArcTurn, TurnCreator, TurnEvent, TurnInputs, TurnPhase, TurnState},
};
use comms_if::eqpt::steer::SteerDems;
use util::module::State;

pub use params::{GuideParams, HeadlandParams, ParamsError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Guidance manager state.
pub struct GuideMgr {
    params: GuideParams,

    track: Option<Track>,

    filter: GuidanceFilterState,

    /// Track revision and path index the filter memory belongs to
    filter_line: Option<(u64, i32)>,

    turn: TurnState,

    youturn_enabled: bool,

    /// Headland revision the current turn path was planned against
    turn_headland_rev: Option<u64>,

    creator: Box<dyn TurnCreator + Send>,
}

/// Input to one tick of guidance.
#[derive(Debug, Clone, Default)]
pub struct GuideInput {
    /// Latest pose, `None` if no fix arrived this tick
    pub pose: Option<Pose>,

    pub field: Arc<FieldGeometry>,
}

/// Output of one tick of guidance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GuideOutput {
    /// Steer demand, `None` when not guiding
    pub steer: Option<SteerDems>,

    pub mode: GuideMode,

    /// The turn path being approached or driven, empty otherwise
    pub turn_path: Vec<GuidePoint>,

    pub next_line_preview: Option<GuideLine>,

    pub has_headland: bool,

    pub distance_to_headland_m: Option<f64>,

    pub paths_away: i32,
}

/// Status of one tick of guidance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GuideStatus {
    pub turn_phase: Option<TurnPhase>,

    pub turn_event: Option<TurnEvent>,

    /// Operator facing messages raised this tick
    pub messages: Vec<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Who produced the steer demand.
#[derive(Debug, Copy, Clone, Serialize, PartialEq, Eq)]
pub enum GuideMode {
    /// Nothing to guide to
    Off,

    /// Following the active parallel line
    Line,

    /// Following a turn path
    Turn,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GuideMgr {
    fn default() -> Self {
        Self {
            params: GuideParams::default(),
            track: None,
            filter: GuidanceFilterState::default(),
            filter_line: None,
            turn: TurnState::default(),
            youturn_enabled: true,
            turn_headland_rev: None,
            creator: Box::new(TangentArcTurn),
        }
    }
}

impl Default for GuideMode {
    fn default() -> Self {
        GuideMode::Off
    }
}

impl State for GuideMgr {
    type InitData = GuideParams;
    type InitError = ParamsError;

    type InputData = GuideInput;
    type OutputData = GuideOutput;
    type StatusReport = GuideStatus;
    type ProcError = GuidanceError;

    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;
        self.params = init_data;

        Ok(())
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let field = &input_data.field;

        let mut output = GuideOutput {
            has_headland: field.has_headland(),
            paths_away: self.turn.paths_away,
            ..Default::default()
        };
        let mut status = GuideStatus::default();

        let (pose, track) = match (input_data.pose, self.track.clone()) {
            (Some(p), Some(t)) => (p, t),
            _ => return Ok((output, status)),
        };

        if !pose.is_finite() {
            return Err(GuidanceError::NonFinitePose);
        }

        // A turn planned against a headland that has since changed is unsafe to drive
        let headland_rev = field.headland.as_ref().map(|h| h.revision());
        if self.turn.has_path() && (!self.youturn_enabled || headland_rev != self.turn_headland_rev)
        {
            warn!("Headland changed or YouTurn disabled, discarding the turn path");
            self.turn = self.turn.abort();
            status.messages.push(TurnEvent::Discarded.to_string());
        }

        let mut turn_steer = None;

        if let (true, Some(boundary), Some(headland)) =
            (self.youturn_enabled, &field.boundary, &field.headland)
        {
            let inputs = TurnInputs {
                pose: &pose,
                track: &track,
                boundary,
                headland,
                vehicle: &self.params.vehicle,
                params: &self.params.youturn,
            };

            let (next, turn_out) = youturn::step(&self.turn, &inputs, &*self.creator);
            self.turn = next;

            if let Some(ref event) = turn_out.event {
                match event {
                    TurnEvent::PathCreated { .. } => self.turn_headland_rev = headland_rev,
                    TurnEvent::Completed { .. } => self.reset_filter(),
                    _ => (),
                }
                status.messages.push(event.to_string());
            }

            turn_steer = turn_out.steer;
            output.next_line_preview = turn_out.next_line_preview;
            output.distance_to_headland_m = turn_out.distance_to_headland_m;
            status.turn_event = turn_out.event;
            status.turn_phase = Some(self.turn.phase);
        }

        output.turn_path = self.turn.turn_path.clone();
        output.paths_away = self.turn.paths_away;

        if let Some(f) = turn_steer {
            output.mode = GuideMode::Turn;
            output.steer = Some(SteerDems {
                steer_angle_deg: f.steer_angle_deg,
                xte_m: f.xte_m,
            });

            return Ok((output, status));
        }

        let line_key = (track.revision(), self.turn.paths_away);
        if self.filter_line != Some(line_key) {
            debug!(
                "Guide line changed to track rev {} path {}, filter reset",
                line_key.0, line_key.1
            );
            self.reset_filter();
            self.filter_line = Some(line_key);
        }

        let (report, filter) = track_guid::compute_steering(
            &pose,
            &track,
            self.turn.paths_away,
            &self.filter,
            &self.params.vehicle,
        )?;
        self.filter = filter;

        output.mode = GuideMode::Line;
        output.steer = Some(report.dems());

        Ok((output, status))
    }
}

impl GuideMgr {
    /// Make the given track active, starting on the track itself.
    pub fn set_track(&mut self, track: Track) {
        info!(
            "Track {:?} selected, heading {:.1} deg",
            track.name(),
            track.heading_rad().to_degrees()
        );

        self.turn = self.turn.with_paths_away(0);
        self.track = Some(track);
        self.reset_filter();
    }

    /// Move onto another path of the active track, abandoning any turn.
    pub fn set_paths_away(&mut self, paths_away: i32) {
        if self.turn.has_path() {
            info!("Turn path discarded by path change");
        }

        self.turn = self.turn.with_paths_away(paths_away);
        self.reset_filter();
        info!("Now on path {}", paths_away);
    }

    pub fn set_youturn(&mut self, enabled: bool) {
        if !enabled && self.turn.has_path() {
            self.turn = self.turn.abort();
        }

        self.youturn_enabled = enabled;
        info!("YouTurn {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Abandon any turn path. Returns true if there was one.
    pub fn abort_turn(&mut self) -> bool {
        let had_path = self.turn.has_path();
        self.turn = self.turn.abort();

        if had_path {
            info!("Turn aborted, staying on path {}", self.turn.paths_away);
        }

        had_path
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn paths_away(&self) -> i32 {
        self.turn.paths_away
    }

    pub fn turn_state(&self) -> &TurnState {
        &self.turn
    }

    pub fn filter(&self) -> &GuidanceFilterState {
        &self.filter
    }

    pub fn params(&self) -> &GuideParams {
        &self.params
    }

    pub fn youturn_enabled(&self) -> bool {
        self.youturn_enabled
    }

    fn reset_filter(&mut self) {
        self.filter = GuidanceFilterState::default();
        self.filter_line = None;
    }
}
