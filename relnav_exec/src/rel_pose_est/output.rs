//! Output transform of the relative pose EKF
//!
//! Re-expresses the filter's estimate in the inertial frame anchored at the
//! vehicle, using the most recent motion source heading.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use nalgebra::{UnitQuaternion, Vector3, Vector4};
use serde::Serialize;

use comms_if::nav::RelPoseMsg;

use super::{motion_rotation, RelPoseEkf, PSI_IDX};
use crate::frame_math::{euler_to_quaternion, quaternion_to_euler};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The published relative pose of the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelPose {
    /// Position of the target relative to the vehicle.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Relative heading of the target, a pure yaw rotation.
    pub attitude_q: UnitQuaternion<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RelPose {
    /// The relative heading encoded in the attitude, in [-pi, pi].
    pub fn heading_rad(&self) -> f64 {
        let q = self.attitude_q.quaternion();
        quaternion_to_euler(q.w, q.i, q.j, q.k).2
    }

    /// Convert into the message published to consumers.
    pub fn to_msg(&self, timestamp: DateTime<Utc>) -> RelPoseMsg {
        let q = self.attitude_q.quaternion();

        RelPoseMsg {
            timestamp,
            position_m: [self.position_m[0], self.position_m[1], self.position_m[2]],
            attitude_q: [q.w, q.i, q.j, q.k],
        }
    }
}

impl RelPoseEkf {
    /// The current estimate expressed in the vehicle's inertial frame, for
    /// the latest known heading of the motion source.
    ///
    /// Does not modify the filter.
    pub fn current_pose(&self, now_heading_rad: f64) -> RelPose {
        let psi = self.x[PSI_IDX];
        let rot = motion_rotation(psi, now_heading_rad, &self.rot_bc);

        RelPose {
            position_m: rot.transpose() * -self.position_m(),
            attitude_q: UnitQuaternion::from_quaternion(
                euler_to_quaternion(0.0, 0.0, now_heading_rad - psi)
            ),
        }
    }

    /// The state which, at the given heading, would produce the given pose.
    ///
    /// Inverse of [`RelPoseEkf::current_pose`]. The heading offset is only
    /// recovered modulo 2 pi.
    pub fn state_from_pose(&self, pose: &RelPose, now_heading_rad: f64) -> Vector4<f64> {
        let psi = now_heading_rad - pose.heading_rad();
        let pos = -(motion_rotation(psi, now_heading_rad, &self.rot_bc) * pose.position_m);

        Vector4::new(pos[0], pos[1], pos[2], psi)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
