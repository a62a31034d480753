//! Update step of the relative pose EKF

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use nalgebra::{Matrix4, Vector3, Vector4};
use serde::Serialize;

use super::{RelPoseEkf, RelPoseEstError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A direct observation of the full state, already expressed in the filter
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    /// Observed relative position.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Observed heading offset.
    ///
    /// Units: radians
    pub psi_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Observation {
    pub fn new(position_m: Vector3<f64>, psi_rad: f64) -> Self {
        Self { position_m, psi_rad }
    }

    /// The observation as a measurement vector `[x, y, z, psi]`.
    pub fn as_vector(&self) -> Vector4<f64> {
        Vector4::new(self.position_m[0], self.position_m[1], self.position_m[2], self.psi_rad)
    }

    pub fn is_finite(&self) -> bool {
        self.psi_rad.is_finite() && self.position_m.iter().all(|v| v.is_finite())
    }
}

impl RelPoseEkf {
    /// Correct the estimate with a direct observation of the state.
    ///
    /// The measurement model is the identity. The update is rejected, with
    /// the filter untouched, if the observation is non-finite, if the
    /// innovation covariance is singular or worse conditioned than the
    /// configured limit, or if the corrected estimate would be non-finite.
    pub fn update(&mut self, obs: &Observation) -> Result<(), RelPoseEstError> {
        if !obs.is_finite() {
            return Err(RelPoseEstError::NonFiniteObservation(*obs));
        }

        let innov = obs.as_vector() - self.x;
        let innov_cov = self.p + self.r;

        let rcond = reciprocal_condition(&innov_cov);
        if !(rcond > self.min_innov_cov_rcond) {
            debug!("Rejecting update, innovation covariance rcond is {:e}", rcond);
            return Err(RelPoseEstError::DegenerateUpdate(rcond));
        }

        let innov_cov_inv = match innov_cov.try_inverse() {
            Some(i) => i,
            None => return Err(RelPoseEstError::DegenerateUpdate(rcond))
        };

        let gain = self.p * innov_cov_inv;
        let x = self.x + gain * innov;
        let p = (Matrix4::identity() - gain) * self.p;

        if !self.commit(x, p) {
            return Err(RelPoseEstError::DegenerateUpdate(rcond));
        }

        trace!("Updated with {:?}, state now {:?}", obs, self.x.as_slice());

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Reciprocal condition number of a symmetric matrix, the ratio of its
/// smallest to largest eigenvalue.
///
/// Zero if the matrix is singular, negative if it is indefinite, and zero if
/// the eigenvalues cannot be found.
pub fn reciprocal_condition(m: &Matrix4<f64>) -> f64 {
    let eig = m.symmetric_eigenvalues();

    if eig.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }

    let max = eig.max();
    if max <= 0.0 {
        return 0.0;
    }

    eig.min() / max
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
