//! # Communications interface crate.
//!
//! Provides all common interfaces between the guidance software and the things around it: the
//! position/steering equipment, the operator, and the field files.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Demand and sensor data definitions for equipment (GNSS receiver, steering controller)
pub mod eqpt;

/// Persisted field file formats
pub mod files;
