//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the vehicle's equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod gnss;
pub mod steer;
