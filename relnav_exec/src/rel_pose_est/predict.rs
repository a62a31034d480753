//! Prediction step of the relative pose EKF

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use serde::Serialize;

use super::{RelPoseEkf, RelPoseEstError, PSI_IDX};
use crate::frame_math::{
    d_rotation_world_to_camera, rotation_inertial_to_motion, rotation_world_to_camera
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single step of motion reported by the motion source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionIncrement {
    /// Displacement since the previous increment, as reported by the motion
    /// source.
    ///
    /// Units: meters
    pub delta_m: Vector3<f64>,

    /// Heading of the vehicle in the motion source's inertial frame at the
    /// time of the increment.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionIncrement {
    pub fn new(delta_m: Vector3<f64>, heading_rad: f64) -> Self {
        Self { delta_m, heading_rad }
    }

    pub fn is_finite(&self) -> bool {
        self.heading_rad.is_finite() && self.delta_m.iter().all(|v| v.is_finite())
    }
}

impl RelPoseEkf {
    /// Propagate the estimate through one motion increment.
    ///
    /// The displacement is rotated into the filter frame through the current
    /// heading offset, the extrinsic rotation and the increment's heading,
    /// and accumulated onto the position. The heading offset is not changed.
    ///
    /// Rejects non-finite increments, leaving the filter untouched. A finite
    /// increment large enough to overflow the state or covariance is
    /// rejected with `NonFinitePrediction`, also leaving the filter untouched.
    pub fn predict(&mut self, motion: &MotionIncrement) -> Result<(), RelPoseEstError> {
        if !motion.is_finite() {
            return Err(RelPoseEstError::NonFiniteMotion(*motion));
        }

        let psi = self.x[PSI_IDX];

        let delta_w = motion_rotation(psi, motion.heading_rad, &self.rot_bc) * motion.delta_m;
        let x = self.x + Vector4::new(delta_w[0], delta_w[1], delta_w[2], 0.0);

        let f = transition_jacobian(psi, motion.heading_rad, &self.rot_bc, &motion.delta_m);
        let p = f * self.p * f.transpose() + self.q;

        if !self.commit(x, p) {
            return Err(RelPoseEstError::NonFinitePrediction);
        }

        trace!("Predicted with {:?}, state now {:?}", motion, self.x.as_slice());

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotation taking a motion source displacement into the filter frame.
pub fn motion_rotation(psi_rad: f64, heading_rad: f64, rot_bc: &Matrix3<f64>) -> Matrix3<f64> {
    rotation_world_to_camera(psi_rad) * rot_bc * rotation_inertial_to_motion(heading_rad)
}

/// Jacobian of the prediction with respect to the state.
///
/// The identity, with the sensitivity of the position to the heading offset
/// in the last column. The motion source heading is treated as a known input
/// so is not differentiated.
pub fn transition_jacobian(
    psi_rad: f64,
    heading_rad: f64,
    rot_bc: &Matrix3<f64>,
    delta_m: &Vector3<f64>
) -> Matrix4<f64> {
    let d_pos = d_rotation_world_to_camera(psi_rad)
        * rot_bc
        * rotation_inertial_to_motion(heading_rad)
        * delta_m;

    let mut f = Matrix4::identity();
    f.fixed_slice_mut::<nalgebra::U3, nalgebra::U1>(0, PSI_IDX).copy_from(&d_pos);

    f
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rel_pose_est::Params;
    use approx::assert_relative_eq;

    fn identity_extrinsics() -> Params {
        let mut params = Params::default();
        params.rot_bc = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        params
    }

    #[test]
    fn test_predict_single_step() {
        let params = identity_extrinsics();
        let mut ekf = RelPoseEkf::new(&params).unwrap();
        let p0 = *ekf.covariance();

        ekf.predict(&MotionIncrement::new(Vector3::new(1.0, 0.0, 0.0), 0.0)).unwrap();

        assert_relative_eq!(*ekf.state(), Vector4::new(1.0, 0.0, 0.0, 0.0), epsilon = 1e-12);

        // Uncoupled entries grow by exactly Q
        let q = params.process_noise();
        for i in &[0, 2, 3] {
            assert_relative_eq!(
                ekf.covariance()[(*i, *i)], p0[(*i, *i)] + q[(*i, *i)],
                epsilon = 1e-12
            );
        }

        // Heading offset uncertainty leaks into the cross-track position
        let jac = transition_jacobian(0.0, 0.0, &Matrix3::identity(), &Vector3::x());
        assert_relative_eq!(jac[(1, 3)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ekf.covariance()[(1, 1)], 0.2 + q[(1, 1)], epsilon = 1e-12);
        assert_relative_eq!(ekf.covariance()[(1, 3)], 0.1, epsilon = 1e-12);
        assert_eq!(ekf.covariance(), &ekf.covariance().transpose());
    }

    #[test]
    fn test_predict_follows_heading() {
        let mut ekf = RelPoseEkf::new(&identity_extrinsics()).unwrap();

        // Moving forward while facing +90 degrees in the inertial frame maps
        // through the inertial to motion rotation
        let heading = std::f64::consts::FRAC_PI_2;
        ekf.predict(&MotionIncrement::new(Vector3::new(0.0, 2.0, 0.0), heading)).unwrap();

        let expected = rotation_inertial_to_motion(heading) * Vector3::new(0.0, 2.0, 0.0);
        assert_relative_eq!(ekf.position_m(), expected, epsilon = 1e-12);
        assert_relative_eq!(expected, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(ekf.heading_offset_rad(), 0.0);
    }

    #[test]
    fn test_zero_motion() {
        let params = Params::default();
        let mut ekf = RelPoseEkf::new(&params).unwrap();

        let mut prev = *ekf.covariance();
        for i in 0..50 {
            ekf.predict(&MotionIncrement::new(Vector3::zeros(), 0.1 * i as f64)).unwrap();

            assert_eq!(ekf.position_m(), Vector3::zeros());
            assert_relative_eq!(*ekf.covariance(), prev + params.process_noise(), epsilon = 1e-12);

            for j in 0..3 {
                assert!(ekf.covariance()[(j, j)] >= prev[(j, j)]);
            }

            prev = *ekf.covariance();
        }
    }

    #[test]
    fn test_jacobian_matches_finite_difference() {
        let rot_bc = Params::default().rot_bc_matrix();
        let delta = Vector3::new(0.3, -0.2, 0.05);
        let heading = 0.7;
        let eps = 1e-6;

        for psi in &[-2.5, -0.4, 0.0, 0.9, 3.0] {
            let f = transition_jacobian(*psi, heading, &rot_bc, &delta);

            let plus = motion_rotation(psi + eps, heading, &rot_bc) * delta;
            let minus = motion_rotation(psi - eps, heading, &rot_bc) * delta;
            let numeric = (plus - minus) / (2.0 * eps);

            for i in 0..3 {
                assert_relative_eq!(f[(i, PSI_IDX)], numeric[i], epsilon = 1e-8);
            }

            // Position block is the identity
            assert_eq!(
                f.fixed_slice::<nalgebra::U3, nalgebra::U3>(0, 0).into_owned(),
                Matrix3::identity()
            );
            assert_eq!(f[(PSI_IDX, PSI_IDX)], 1.0);
        }
    }

    #[test]
    fn test_predict_rejects_non_finite() {
        let mut ekf = RelPoseEkf::new(&Params::default()).unwrap();
        ekf.predict(&MotionIncrement::new(Vector3::new(0.1, 0.0, 0.0), 0.0)).unwrap();

        let x = *ekf.state();
        let p = *ekf.covariance();

        let bad = [
            MotionIncrement::new(Vector3::new(std::f64::NAN, 0.0, 0.0), 0.0),
            MotionIncrement::new(Vector3::new(0.0, std::f64::INFINITY, 0.0), 0.0),
            MotionIncrement::new(Vector3::zeros(), std::f64::NAN),
        ];

        for m in bad.iter() {
            match ekf.predict(m) {
                Err(RelPoseEstError::NonFiniteMotion(_)) => (),
                r => panic!("Expected non-finite motion error, got {:?}", r)
            }

            assert_eq!(*ekf.state(), x);
            assert_eq!(*ekf.covariance(), p);
        }
    }

    #[test]
    fn test_predict_overflow() {
        let mut ekf = RelPoseEkf::new(&identity_extrinsics()).unwrap();
        let p = *ekf.covariance();

        // Finite motion, but the heading offset coupling overflows P
        let huge = MotionIncrement::new(Vector3::new(1e200, 0.0, 0.0), 0.0);
        assert!(huge.is_finite());

        match ekf.predict(&huge) {
            Err(RelPoseEstError::NonFinitePrediction) => (),
            r => panic!("Expected non-finite prediction error, got {:?}", r)
        }

        assert_eq!(*ekf.state(), Vector4::zeros());
        assert_eq!(*ekf.covariance(), p);
    }

    #[test]
    fn test_growth_scales_with_motion() {
        let params = identity_extrinsics();
        let q = params.process_noise();

        let mut small = RelPoseEkf::new(&params).unwrap();
        let mut large = RelPoseEkf::new(&params).unwrap();
        let p0 = *small.covariance();
        assert!(p0[(PSI_IDX, PSI_IDX)] > 0.0);

        small.predict(&MotionIncrement::new(Vector3::new(0.1, 0.0, 0.0), 0.0)).unwrap();
        large.predict(&MotionIncrement::new(Vector3::new(2.0, 0.0, 0.0), 0.0)).unwrap();

        let mut larger_somewhere = false;
        for i in 0..3 {
            let g_small = small.covariance()[(i, i)] - p0[(i, i)] - q[(i, i)];
            let g_large = large.covariance()[(i, i)] - p0[(i, i)] - q[(i, i)];

            // Axes the motion doesn't couple into only see round-off
            assert!(g_large >= g_small - 1e-12);
            if g_small > 1e-9 {
                assert!(g_large > g_small);
                // (2.0 / 0.1)^2
                assert_relative_eq!(g_large / g_small, 400.0, max_relative = 1e-9);
                larger_somewhere = true;
            }
        }

        assert!(larger_somewhere);
        assert!(large.covariance().trace() > small.covariance().trace());
    }
}
