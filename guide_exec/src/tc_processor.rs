//! # Telecommand processor module
//!
//! The telecommand processor applies operator commands, whether typed or read from a script.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;

// Internal
use crate::{
    data_store::DataStore,
    field::{FieldError, FieldStore},
    headland::BoundaryRing,
    track_guid::Track,
};
use comms_if::{
    files::BoundaryFile,
    tc::{GuideCmd, HeadlandCmd},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute an operator command.
///
/// Guidance commands act on the datastore's guidance manager, headland commands on the field
/// store. On success a status message for the operator is returned. A failed command changes
/// nothing.
pub fn exec(ds: &mut DataStore, field: &FieldStore, cmd: &GuideCmd) -> Result<String, FieldError> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        GuideCmd::SetPathsAway { paths_away } => {
            ds.guide_mgr.set_paths_away(*paths_away);
            Ok(format!("Now on path {}", paths_away))
        }
        GuideCmd::SelectTrack { name } => {
            let track = field
                .snapshot()
                .track(name)
                .cloned()
                .ok_or_else(|| FieldError::UnknownTrack(name.clone()))?;

            ds.guide_mgr.set_track(track);
            Ok(format!("Track {:?} active", name))
        }
        GuideCmd::AddTrack {
            name,
            a_e,
            a_n,
            b_e,
            b_n,
        } => {
            let track = Track::new(name, Vector2::new(*a_e, *a_n), Vector2::new(*b_e, *b_n))?;
            let heading_deg = track.heading_rad().to_degrees();
            let num_tracks = field.add_track(track)?;

            Ok(format!(
                "Track {:?} added, heading {:.1} deg, {} track(s) in the field",
                name, heading_deg, num_tracks
            ))
        }
        GuideCmd::LoadBoundary { path } => {
            let boundary = BoundaryRing::from_file(&BoundaryFile::load(path)?)?;
            let num_points = boundary.len();
            field.set_boundary(boundary);

            Ok(format!("Boundary loaded with {} points", num_points))
        }
        GuideCmd::Headland(HeadlandCmd::Build { distance_m, join }) => {
            let line = field.build_headland(*distance_m, *join)?;
            Ok(format!(
                "Headland built at {} m with {} points",
                distance_m,
                line.len()
            ))
        }
        GuideCmd::Headland(HeadlandCmd::Clip {
            x1,
            y1,
            x2,
            y2,
            mode,
        }) => {
            let anchor_1 = field.snap_to_headland(&Vector2::new(*x1, *y1))?;
            let anchor_2 = field.snap_to_headland(&Vector2::new(*x2, *y2))?;
            let line = field.clip_headland(&anchor_1, &anchor_2, *mode)?;

            Ok(format!(
                "Headland clipped, {:.1} m kept",
                line.length_m()
            ))
        }
        GuideCmd::Headland(HeadlandCmd::Clear) => {
            field.clear_headland();
            Ok("Headland cleared".to_string())
        }
        GuideCmd::YouTurn { state } => {
            ds.guide_mgr.set_youturn(state.is_on());
            Ok(format!(
                "YouTurn {}",
                if state.is_on() { "on" } else { "off" }
            ))
        }
        GuideCmd::AbortTurn => match ds.guide_mgr.abort_turn() {
            true => Ok(format!(
                "Turn aborted, on path {}",
                ds.guide_mgr.paths_away()
            )),
            false => Ok("No turn to abort".to_string()),
        },
    }
}
