//! Main guidance executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Pose acquisition
//!         - Operator command processing
//!         - Guidance processing (line following or YouTurn)
//!         - Steer demand output
//!
//! Without hardware attached the pose comes from, and the steer demands go to, a simulated
//! vehicle. Operator commands are read from a timed script which is run against the simulation
//! clock, so the loop can optionally run faster than real time.
//!
//! # Modules
//!
//! All cyclic modules (e.g. `guide_mgr`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use nalgebra::Vector2;
use std::{
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use comms_if::eqpt::steer::{SteerDems, SteerDemsResponse};
use guide_lib::{
    data_store::{DataStore, SafeModeCause},
    field::{FieldGeometry, FieldStore, FIELD_SAVE_DIR},
    guide_mgr::{GuideInput, GuideParams},
    headland::BoundaryRing,
    loc::Pose,
    sim::VehicleSim,
    tc_processor,
    track_guid::Track,
    youturn::TurnEvent,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

/// Number of consecutive guidance errors after which steering is made safe.
const MAX_GUIDE_ERROR_LIMIT: u64 = 5;

/// Half the side length of the demo field.
const DEMO_FIELD_HALF_SIZE_M: f64 = 100.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(
    name = "guide_exec",
    about = "Runs the guidance core against a simulated vehicle"
)]
struct Opts {
    /// Timed command script, one `<time_s>: <command>;` per line
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Field directory holding `boundary.json` and optionally `headland.json` and `tracks.csv`.
    ///
    /// The field is saved in the same layout to `<session>/field` at exit.
    ///
    /// A square demo field with a single north-south track is used when not given.
    #[structopt(long, parse(from_os_str))]
    field: Option<PathBuf>,

    /// Track to activate at start, defaults to the first track of the field
    #[structopt(long)]
    track: Option<String>,

    /// Starting easting of the simulated vehicle
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    start_e: f64,

    /// Starting northing of the simulated vehicle
    #[structopt(long, default_value = "-60", allow_hyphen_values = true)]
    start_n: f64,

    /// Starting heading of the simulated vehicle in degrees, clockwise from north
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    start_heading_deg: f64,

    /// Speed of the simulated vehicle
    #[structopt(long, default_value = "3")]
    speed_ms: f64,

    /// Run as fast as possible rather than in real time
    #[structopt(long)]
    fast: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("guide_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("FieldNav Guidance Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let params: GuideParams =
        util::params::load("guide.toml").wrap_err("Could not load guidance params")?;

    info!("Guidance parameters loaded");

    // ---- LOAD SCRIPT ----

    info!("Loading script from {:?}", opts.script);

    let mut si = ScriptInterpreter::new(&opts.script).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} commands\n",
        si.get_duration(),
        si.get_num_cmds()
    );

    // ---- LOAD FIELD ----

    let geometry = match opts.field {
        Some(ref dir) => FieldGeometry::load(dir).wrap_err("Failed to load the field")?,
        None => {
            info!("No field given, using the demo field");
            demo_field().wrap_err("Failed to create the demo field")?
        }
    };

    let field = FieldStore::new(geometry);

    if params.headland.build_on_start && !field.snapshot().has_headland() {
        match field.build_headland(params.headland.distance_m, params.headland.join) {
            Ok(_) => info!("Headland built at {} m", params.headland.distance_m),
            Err(e) => warn!("Could not build the initial headland: {}", e),
        }
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.guide_mgr
        .init(params.clone())
        .wrap_err("Failed to initialise GuideMgr")?;
    info!("GuideMgr init complete");

    let initial_track = {
        let geom = field.snapshot();
        match opts.track {
            Some(ref name) => Some(
                geom.track(name)
                    .cloned()
                    .ok_or_else(|| eyre!("The field has no track named {:?}", name))?,
            ),
            None => geom.tracks.first().cloned(),
        }
    };
    match initial_track {
        Some(t) => ds.guide_mgr.set_track(t),
        None => warn!("The field has no tracks, guidance is off until one is selected"),
    }

    let mut sim = VehicleSim::new(
        Pose::new(
            opts.start_e,
            opts.start_n,
            opts.start_heading_deg.to_radians(),
            opts.speed_ms,
        ),
        &params.vehicle,
    );

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- DATA INPUT ----

        ds.pose = Some(Pose::from(sim.fix()));

        // ---- COMMAND PROCESSING ----

        match si.get_pending_cmds(ds.sim_time_s) {
            PendingCmds::None => (),
            PendingCmds::Some(cmds) => {
                for cmd in cmds.iter() {
                    match tc_processor::exec(&mut ds, &field, cmd) {
                        Ok(msg) => info!("{}", msg),
                        Err(e) => warn!("Command {:?} failed: {}", cmd, e),
                    }
                }
            }
            // Exit if end of script reached
            PendingCmds::EndOfScript => {
                info!("End of command script reached, stopping");
                break;
            }
        }

        // ---- GUIDANCE PROCESSING ----

        let input = GuideInput {
            pose: ds.pose,
            field: field.snapshot(),
        };

        match ds.guide_mgr.proc(&input) {
            Ok((output, status)) => {
                ds.num_consec_guide_errors = 0;
                ds.make_unsafe(SafeModeCause::GuidanceErrors);

                for msg in status.messages.iter() {
                    info!("{}", msg);
                }

                if let Some(TurnEvent::PathCreated { .. }) = status.turn_event {
                    session::save_with_timestamp(
                        "youturn/turn_path.json",
                        output.turn_path.clone(),
                    );
                }

                ds.guide_output = output;
                ds.guide_status = status;
            }
            Err(e) => {
                ds.num_consec_guide_errors += 1;
                warn!("Error during guidance processing: {}", e);

                if ds.num_consec_guide_errors > MAX_GUIDE_ERROR_LIMIT {
                    if !ds.safe {
                        error!(
                            "Maximum number of consecutive guidance errors ({}) exceeded",
                            MAX_GUIDE_ERROR_LIMIT
                        );
                    }
                    ds.make_safe(SafeModeCause::GuidanceErrors);
                }
            }
        }

        // ---- STEER OUTPUT ----

        let dems = match (ds.safe, ds.guide_output.steer) {
            (false, Some(d)) => d,
            _ => SteerDems::default(),
        };

        let response = sim.send_demands(&dems);
        match response {
            SteerDemsResponse::DemsOk => {
                ds.make_unsafe(SafeModeCause::SteerEqptInvalid);
            }
            r => {
                warn!("Received non-nominal response from steering: {:?}", r);
                ds.make_safe(SafeModeCause::SteerEqptInvalid);
            }
        }
        ds.steer_response = Some(response);

        sim.step(CYCLE_PERIOD_S);

        // ---- TELEMETRY ----

        if ds.is_1_hz_cycle {
            let pose = sim.pose();
            info!(
                "t = {:.1} s, pos ({:.1}, {:.1}), heading {:.1} deg, {:?} on path {}, xte {:.2} m, \
                steer {:.1} deg",
                ds.sim_time_s,
                pose.position_m.x,
                pose.position_m.y,
                pose.heading_rad.to_degrees(),
                ds.guide_output.mode,
                ds.guide_output.paths_away,
                dems.xte_m,
                dems.steer_angle_deg
            );
        }

        // ---- CYCLE MANAGEMENT ----

        if !opts.fast {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
                Some(d) => {
                    ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                    );
                    ds.num_consec_cycle_overruns += 1;
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    if let Some(ref headland) = field.snapshot().headland {
        info!(
            "Final headland: {} points, {:.1} m",
            headland.len(),
            headland.length_m()
        );
    }

    // Drain the save queue before writing the final field over the queued copies
    let field_dir = session.session_root.join(FIELD_SAVE_DIR);
    session.exit();

    if let Err(e) = field.snapshot().save(&field_dir) {
        warn!("Could not save the final field: {}", e);
    }

    info!("End of execution");

    Ok(())
}

/// A square field centred on the origin with a single north-south track through it.
fn demo_field() -> Result<FieldGeometry, Report> {
    let h = DEMO_FIELD_HALF_SIZE_M;

    let boundary = BoundaryRing::new(vec![
        Vector2::new(-h, -h),
        Vector2::new(h, -h),
        Vector2::new(h, h),
        Vector2::new(-h, h),
    ])?;

    let track = Track::new("demo", Vector2::new(0.0, 0.0), Vector2::new(0.0, h))?;

    Ok(FieldGeometry {
        boundary: Some(Arc::new(boundary)),
        headland: None,
        tracks: Arc::new(vec![track]),
    })
}
