//! # Data Store

use log::{info, warn};

use crate::{
    guide_mgr::{GuideMgr, GuideOutput, GuideStatus},
    loc::Pose,
};
use comms_if::eqpt::steer::SteerDemsResponse;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason steering has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    /// The steering equipment rejected the demands or reported itself invalid
    SteerEqptInvalid,

    /// Guidance failed for too many consecutive cycles
    GuidanceErrors,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Safe mode variables
    /// While safe no steer demands are sent.
    pub safe: bool,

    pub safe_cause: Option<SafeModeCause>,

    // Localisation
    pub pose: Option<Pose>,

    // Guidance
    pub guide_mgr: GuideMgr,
    pub guide_output: GuideOutput,
    pub guide_status: GuideStatus,

    // Steering
    pub steer_response: Option<SteerDemsResponse>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive guidance processing errors
    pub num_consec_guide_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Stop steering with the given cause. Any turn in progress is abandoned.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            self.guide_mgr.abort_turn();
        }
    }

    /// Attempts to leave safe mode by clearing the given cause.
    ///
    /// Returns true if safe mode is no longer active. The cause must match the one safe mode was
    /// entered with.
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> bool {
        if !self.safe {
            return true;
        }

        match self.safe_cause {
            Some(root_cause) if root_cause != cause => false,
            _ => {
                self.safe = false;
                self.safe_cause = None;
                info!("Make unsafe requested, root cause match, safe mode disabled");
                true
            }
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128) == 0;

        self.pose = None;
        self.guide_output = GuideOutput::default();
        self.guide_status = GuideStatus::default();
        self.steer_response = None;

        self.sim_time_s = self.num_cycles as f64 / cycle_frequency_hz;
    }
}
