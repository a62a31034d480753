//! Conversion of vision target reports into filter observations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use comms_if::sens::TargetReport;

use super::Observation;
use crate::frame_math::quaternion_to_euler;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Observation {
    /// Build an observation from a vision report.
    ///
    /// The vision solver reports in a frame with Y and Z flipped relative to
    /// the filter frame. The heading offset is the roll of the reported
    /// attitude, which is the rotation about the camera's optical axis.
    ///
    /// Non-finite values are passed through, they are rejected by
    /// [`RelPoseEkf::update`](super::RelPoseEkf::update).
    pub fn from_target_report(report: &TargetReport) -> Self {
        let p = &report.position_m;
        let q = &report.attitude_q;
        let (roll, _, _) = quaternion_to_euler(q[0], q[1], q[2], q[3]);

        Self::new(Vector3::new(p[0], -p[1], -p[2]), roll)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
