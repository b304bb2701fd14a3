//! # Guidance library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the guidance crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - everything the executable carries from one cycle to the next
pub mod data_store;

/// Field store - shared boundary, headland and tracks of the current field
pub mod field;

/// Geometry utilities shared by the guidance modules
pub mod geom;

/// Guidance manager - owns the per-tick guidance state and decides who steers
pub mod guide_mgr;

/// Headland module - builds and clips the headland line
pub mod headland;

/// Localisation module - the vehicle's pose in the field
pub mod loc;

/// Revision numbers for geometry that gets replaced rather than edited
pub mod revision;

/// Simple vehicle simulation used in place of the steering hardware
pub mod sim;

/// Telecommand processor - applies operator commands
pub mod tc_processor;

/// Track guidance module - steers the vehicle along a parallel of the active track
pub mod track_guid;

/// YouTurn module - automatic turns at the headland
pub mod youturn;
