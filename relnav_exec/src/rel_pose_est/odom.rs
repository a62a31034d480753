//! Conversion of absolute motion source reports into motion increments

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use comms_if::sens::OdomReport;

use super::{MotionIncrement, RelPoseEstError};
use crate::frame_math::quaternion_to_euler;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Differences successive odometry reports into motion increments, and
/// tracks the latest known heading.
#[derive(Debug, Clone, Default)]
pub struct OdomDiffer {
    prev_position_m: Option<Vector3<f64>>,
    heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OdomDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The heading of the most recent accepted report, zero before any.
    pub fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    /// True once a report has been accepted.
    pub fn is_primed(&self) -> bool {
        self.prev_position_m.is_some()
    }

    /// Process a new report.
    ///
    /// The first report only primes the differ and yields `None`. Reports
    /// containing non-finite values are rejected without changing the differ.
    pub fn proc(&mut self, report: &OdomReport) -> Result<Option<MotionIncrement>, RelPoseEstError> {
        let position_m = Vector3::from(report.position_m);
        let q = &report.attitude_q;
        let heading_rad = quaternion_to_euler(q[0], q[1], q[2], q[3]).2;

        let increment = MotionIncrement::new(
            position_m - self.prev_position_m.unwrap_or(position_m),
            heading_rad
        );

        let finite = increment.is_finite()
            && position_m.iter().chain(q.iter()).all(|v| v.is_finite());

        if !finite {
            return Err(RelPoseEstError::NonFiniteMotion(increment));
        }

        let primed = self.is_primed();

        self.prev_position_m = Some(position_m);
        self.heading_rad = heading_rad;

        match primed {
            true => Ok(Some(increment)),
            false => Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame_math::euler_to_quaternion;
    use approx::assert_relative_eq;

    fn report(pos: [f64; 3], yaw: f64) -> OdomReport {
        let q = euler_to_quaternion(0.0, 0.0, yaw);
        OdomReport {
            position_m: pos,
            attitude_q: [q.w, q.i, q.j, q.k],
        }
    }

    #[test]
    fn test_odom_differ() {
        let mut differ = OdomDiffer::new();
        assert!(!differ.is_primed());
        assert_eq!(differ.heading_rad(), 0.0);

        assert_eq!(differ.proc(&report([1.0, 2.0, 0.0], 0.5)).unwrap(), None);
        assert!(differ.is_primed());
        assert_relative_eq!(differ.heading_rad(), 0.5, epsilon = 1e-12);

        let inc = differ.proc(&report([1.5, 1.0, 0.25], -0.2)).unwrap().unwrap();
        assert_relative_eq!(inc.delta_m, Vector3::new(0.5, -1.0, 0.25), epsilon = 1e-12);
        assert_relative_eq!(inc.heading_rad, -0.2, epsilon = 1e-12);
        assert_relative_eq!(differ.heading_rad(), -0.2, epsilon = 1e-12);

        let inc = differ.proc(&report([1.5, 1.0, 0.25], -0.2)).unwrap().unwrap();
        assert_eq!(inc.delta_m, Vector3::zeros());
    }

    #[test]
    fn test_odom_differ_rejects_non_finite() {
        let mut differ = OdomDiffer::new();

        // Rejected before priming
        assert!(differ.proc(&report([std::f64::NAN, 0.0, 0.0], 0.0)).is_err());
        assert!(!differ.is_primed());

        differ.proc(&report([1.0, 0.0, 0.0], 0.3)).unwrap();

        let mut bad = report([2.0, 0.0, 0.0], 0.0);
        bad.attitude_q[0] = std::f64::INFINITY;
        match differ.proc(&bad) {
            Err(RelPoseEstError::NonFiniteMotion(_)) => (),
            r => panic!("Expected non-finite motion error, got {:?}", r)
        }

        // Still differences from the last good report
        assert_relative_eq!(differ.heading_rad(), 0.3, epsilon = 1e-12);
        let inc = differ.proc(&report([2.0, 0.0, 0.0], 0.3)).unwrap().unwrap();
        assert_relative_eq!(inc.delta_m, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }
}
