//! Guidance manager parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{headland::JoinType, track_guid::VehicleParams, youturn::YouTurnParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Contents of `guide.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GuideParams {
    pub vehicle: VehicleParams,
    pub youturn: YouTurnParams,
    pub headland: HeadlandParams,
}

/// Headland built when a field is loaded without one.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HeadlandParams {
    pub build_on_start: bool,
    pub distance_m: f64,
    pub join: JoinType,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamsError {
    #[error("{0} must be positive and finite, got {1}")]
    NotPositive(&'static str, f64),

    #[error("{0} must not be negative, got {1}")]
    Negative(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GuideParams {
    /// Check the values the guidance divides by or offsets with.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let v = &self.vehicle;
        let y = &self.youturn;

        for &(name, value) in [
            ("vehicle.wheelbase_m", v.wheelbase_m),
            ("vehicle.track_width_m", v.track_width_m),
            ("vehicle.max_steer_angle_deg", v.max_steer_angle_deg),
            ("vehicle.min_look_ahead_m", v.min_look_ahead_m),
            ("youturn.tool_width_m", y.tool_width_m),
            ("youturn.headland_total_width_m", y.headland_total_width_m),
            ("youturn.point_spacing_m", y.point_spacing_m),
            ("youturn.min_turn_radius_m", y.min_turn_radius_m),
            ("headland.distance_m", self.headland.distance_m),
        ]
        .iter()
        {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamsError::NotPositive(name, value));
            }
        }

        for &(name, value) in [
            ("vehicle.integral_gain", v.integral_gain),
            ("youturn.headland_leg_length_m", y.headland_leg_length_m),
            ("youturn.entry_lead_m", y.entry_lead_m),
        ]
        .iter()
        {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParamsError::Negative(name, value));
            }
        }

        Ok(())
    }
}

impl Default for HeadlandParams {
    fn default() -> Self {
        Self {
            build_on_start: true,
            distance_m: 12.0,
            join: JoinType::Round,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file() {
        let params: GuideParams = util::params::from_str(
            r#"
            [vehicle]
            wheelbase_m = 3.1

            [headland]
            join = "Miter"
            "#,
        )
        .unwrap();

        assert_eq!(params.vehicle.wheelbase_m, 3.1);
        assert_eq!(params.vehicle.track_width_m, 6.0);
        assert_eq!(params.headland.join, JoinType::Miter);
        assert_eq!(params.youturn, YouTurnParams::default());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut params = GuideParams::default();
        params.vehicle.track_width_m = 0.0;
        assert_eq!(
            params.validate(),
            Err(ParamsError::NotPositive("vehicle.track_width_m", 0.0))
        );

        let mut params = GuideParams::default();
        params.youturn.entry_lead_m = -1.0;
        assert_eq!(
            params.validate(),
            Err(ParamsError::Negative("youturn.entry_lead_m", -1.0))
        );
    }
}
