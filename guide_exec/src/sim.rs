//! # Vehicle simulation
//!
//! Stands in for the GNSS receiver and the steering controller when no hardware is attached. The
//! vehicle is a kinematic bicycle: the pivot (rear axle centre) moves along the heading and the
//! heading changes at `v * tan(steer) / wheelbase`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use crate::{geom, loc::Pose, track_guid::VehicleParams};
use comms_if::eqpt::{
    gnss::GnssFix,
    steer::{SteerDems, SteerDemsResponse},
};
use util::maths::wrap_2pi;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated vehicle.
#[derive(Debug, Clone)]
pub struct VehicleSim {
    pose: Pose,
    steer_angle_rad: f64,
    wheelbase_m: f64,
    max_steer_angle_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleSim {
    pub fn new(pose: Pose, params: &VehicleParams) -> Self {
        Self {
            pose,
            steer_angle_rad: 0.0,
            wheelbase_m: params.wheelbase_m,
            max_steer_angle_rad: params.max_steer_angle_deg.to_radians(),
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// The current position as the receiver would report it.
    pub fn fix(&self) -> GnssFix {
        GnssFix {
            easting_m: self.pose.position_m.x,
            northing_m: self.pose.position_m.y,
            heading_rad: self.pose.heading_rad,
            speed_ms: self.pose.speed_ms,
        }
    }

    /// Accept a steer demand, which takes effect from the next step.
    ///
    /// Demands beyond the steering lock are rejected and the previous angle is held.
    pub fn send_demands(&mut self, dems: &SteerDems) -> SteerDemsResponse {
        let demand_rad = dems.steer_angle_deg.to_radians();

        if !demand_rad.is_finite() || demand_rad.abs() > self.max_steer_angle_rad + 1e-9 {
            return SteerDemsResponse::DemsInvalid;
        }

        self.steer_angle_rad = demand_rad;
        SteerDemsResponse::DemsOk
    }

    /// Advance the simulation by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        let v = self.pose.speed_ms;
        let dir = geom::heading_to_dir(self.pose.heading_rad);

        let yaw_rate_rads = v * self.steer_angle_rad.tan() / self.wheelbase_m;

        self.pose.position_m += dir * v * dt_s;
        self.pose.heading_rad = wrap_2pi(self.pose.heading_rad + yaw_rate_rads * dt_s);

        trace!(
            "Sim pose: ({:.2}, {:.2}) heading {:.1} deg",
            self.pose.position_m.x,
            self.pose.position_m.y,
            self.pose.heading_rad.to_degrees()
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        field::FieldGeometry,
        guide_mgr::{GuideInput, GuideMgr, GuideParams},
        track_guid::Track,
    };
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use std::sync::Arc;
    use util::module::State;

    #[test]
    fn test_straight_and_turning() {
        let params = VehicleParams::default();
        let mut sim = VehicleSim::new(Pose::new(0.0, 0.0, 0.0, 2.0), &params);

        for _ in 0..10 {
            sim.step(0.1);
        }
        assert_relative_eq!(sim.pose().position_m, Vector2::new(0.0, 2.0), epsilon = 1e-9);

        // Steering right turns clockwise
        assert_eq!(
            sim.send_demands(&SteerDems {
                steer_angle_deg: 10.0,
                xte_m: 0.0
            }),
            SteerDemsResponse::DemsOk
        );
        sim.step(0.1);
        sim.step(0.1);
        assert!(sim.pose().heading_rad > 0.0);
        assert!(sim.pose().position_m.x > 0.0);

        assert_eq!(
            sim.send_demands(&SteerDems {
                steer_angle_deg: 90.0,
                xte_m: 0.0
            }),
            SteerDemsResponse::DemsInvalid
        );
    }

    #[test]
    fn test_guidance_converges_onto_line() {
        let mut mgr = GuideMgr::default();
        mgr.init(GuideParams::default()).unwrap();
        mgr.set_track(Track::new("ab", Vector2::new(0.0, 0.0), Vector2::new(0.0, 100.0)).unwrap());

        let mut sim = VehicleSim::new(Pose::new(2.0, 0.0, 0.0, 3.0), &mgr.params().vehicle);
        let field = Arc::new(FieldGeometry::default());

        let mut xte = 2.0;
        for _ in 0..300 {
            let (out, _) = mgr
                .proc(&GuideInput {
                    pose: Some(Pose::from(sim.fix())),
                    field: field.clone(),
                })
                .unwrap();

            let dems = out.steer.unwrap();
            xte = dems.xte_m;
            assert_eq!(sim.send_demands(&dems), SteerDemsResponse::DemsOk);
            sim.step(0.1);
        }

        assert!(xte.abs() < 0.1);
        assert!(util::maths::ang_dist(sim.pose().heading_rad, 0.0).abs() < 2.0f64.to_radians());
    }
}
