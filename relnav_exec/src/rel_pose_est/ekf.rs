//! Relative pose EKF state and construction
//!
//! The predict, update and output steps are implemented on [`RelPoseEkf`] in
//! their own modules.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use serde::Serialize;

// Internal
use super::{Params, ParamsError, PSI_IDX, STATE_DIM};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The relative pose Extended Kalman Filter.
///
/// Owns the state vector and its error covariance. The only ways to mutate
/// them are [`RelPoseEkf::predict`] and [`RelPoseEkf::update`].
#[derive(Debug, Clone)]
pub struct RelPoseEkf {
    /// State vector `[x, y, z, psi]`.
    pub(crate) x: Vector4<f64>,

    /// Error covariance of the state.
    pub(crate) p: Matrix4<f64>,

    /// Process noise covariance.
    pub(crate) q: Matrix4<f64>,

    /// Measurement noise covariance.
    pub(crate) r: Matrix4<f64>,

    /// Fixed extrinsic rotation, body into camera.
    pub(crate) rot_bc: Matrix3<f64>,

    /// Updates with an innovation covariance conditioned worse than this are
    /// rejected.
    pub(crate) min_innov_cov_rcond: f64,
}

/// A serialisable copy of the filter's estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EkfSnapshot {
    /// State vector `[x, y, z, psi]`.
    ///
    /// Units: meters, radians
    pub state: [f64; STATE_DIM],

    /// Error covariance, row-major.
    pub covariance: [[f64; STATE_DIM]; STATE_DIM],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RelPoseEkf {
    /// Create a new filter with a zeroed state and the initial covariance
    /// given by the parameters.
    pub fn new(params: &Params) -> Result<Self, ParamsError> {
        params.validate()?;

        Ok(Self {
            x: Vector4::zeros(),
            p: params.init_cov(),
            q: params.process_noise(),
            r: params.meas_noise(),
            rot_bc: params.rot_bc_matrix(),
            min_innov_cov_rcond: params.min_innov_cov_rcond,
        })
    }

    /// The full state vector `[x, y, z, psi]`.
    pub fn state(&self) -> &Vector4<f64> {
        &self.x
    }

    /// The estimated relative position, in the filter frame.
    pub fn position_m(&self) -> Vector3<f64> {
        Vector3::new(self.x[0], self.x[1], self.x[2])
    }

    /// The estimated heading offset between the motion source frame and the
    /// filter frame.
    pub fn heading_offset_rad(&self) -> f64 {
        self.x[PSI_IDX]
    }

    /// The state error covariance.
    pub fn covariance(&self) -> &Matrix4<f64> {
        &self.p
    }

    /// Take a serialisable copy of the current estimate.
    pub fn snapshot(&self) -> EkfSnapshot {
        let mut covariance = [[0f64; STATE_DIM]; STATE_DIM];

        for (i, row) in covariance.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.p[(i, j)];
            }
        }

        EkfSnapshot {
            state: [self.x[0], self.x[1], self.x[2], self.x[3]],
            covariance,
        }
    }

    /// Commit a new state and covariance, removing any asymmetry introduced
    /// by round-off in the covariance.
    ///
    /// Returns `false`, without committing anything, if either contains
    /// non-finite values.
    pub(crate) fn commit(&mut self, x: Vector4<f64>, p: Matrix4<f64>) -> bool {
        if x.iter().chain(p.iter()).any(|v| !v.is_finite()) {
            return false;
        }

        self.x = x;
        self.p = (p + p.transpose()) * 0.5;

        true
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rel_pose_est::{MotionIncrement, Observation};

    #[test]
    fn test_new_ekf() {
        let ekf = RelPoseEkf::new(&Params::default()).unwrap();

        assert_eq!(*ekf.state(), Vector4::zeros());
        assert_eq!(*ekf.covariance(), Matrix4::identity() * 0.1);
        assert_eq!(ekf.heading_offset_rad(), 0.0);

        let mut bad = Params::default();
        bad.init_cov_diag[0] = -1.0;
        assert!(RelPoseEkf::new(&bad).is_err());
    }

    #[test]
    fn test_commit_rejects_non_finite() {
        let mut ekf = RelPoseEkf::new(&Params::default()).unwrap();

        let mut x = Vector4::new(1.0, 2.0, 3.0, 0.1);
        assert!(!ekf.commit(x, Matrix4::identity() * std::f64::INFINITY));
        assert_eq!(*ekf.state(), Vector4::zeros());

        x[2] = std::f64::NAN;
        assert!(!ekf.commit(x, Matrix4::identity()));
        assert_eq!(*ekf.state(), Vector4::zeros());
        assert_eq!(*ekf.covariance(), Matrix4::identity() * 0.1);
    }

    #[test]
    fn test_commit_symmetrises() {
        let mut ekf = RelPoseEkf::new(&Params::default()).unwrap();

        let mut p = Matrix4::identity();
        p[(0, 1)] = 0.3;
        p[(1, 0)] = 0.1;

        assert!(ekf.commit(Vector4::new(1.0, 2.0, 3.0, 0.1), p));
        assert_eq!(ekf.covariance()[(0, 1)], ekf.covariance()[(1, 0)]);
        assert!((ekf.covariance()[(0, 1)] - 0.2).abs() < 1e-15);

        let snap = ekf.snapshot();
        assert_eq!(snap.state, [1.0, 2.0, 3.0, 0.1]);
        assert_eq!(snap.covariance[1][1], 1.0);
    }

    #[test]
    fn test_covariance_stays_symmetric() {
        let mut ekf = RelPoseEkf::new(&Params::default()).unwrap();

        // Deterministic mixed sequence of motion and observations
        for i in 0..500 {
            let t = i as f64 * 0.01;
            let motion = MotionIncrement::new(
                Vector3::new(0.05 * t.cos(), 0.05 * t.sin(), 0.01),
                (0.3 * t).sin() * 3.0
            );
            ekf.predict(&motion).unwrap();

            if i % 7 == 0 {
                let obs = Observation::new(
                    Vector3::new(t.sin(), -t.cos(), 0.5 * t),
                    0.1 * (2.0 * t).cos()
                );
                ekf.update(&obs).unwrap();
            }

            let p = ekf.covariance();
            assert_eq!(*p, p.transpose());
            for j in 0..STATE_DIM {
                assert!(p[(j, j)] >= 0.0);
            }
        }
    }
}
