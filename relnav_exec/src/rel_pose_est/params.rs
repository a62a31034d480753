//! Parameters structure for the relative pose estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix3, Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use super::{ParamsError, STATE_DIM};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used when checking the extrinsic rotation is a proper rotation.
const ROT_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the relative pose estimator.
///
/// All diagonals are ordered `[x, y, z, psi]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {

    // ---- NOISE MODELS ----

    /// Diagonal of the initial error covariance.
    ///
    /// Units: meters^2 for position, radians^2 for heading offset
    pub init_cov_diag: [f64; STATE_DIM],

    /// Diagonal of the process noise covariance (Q), added on every predict.
    ///
    /// Units: meters^2 for position, radians^2 for heading offset
    pub process_noise_diag: [f64; STATE_DIM],

    /// Diagonal of the measurement noise covariance (R) of vision
    /// observations.
    ///
    /// Units: meters^2 for position, radians^2 for heading offset
    pub meas_noise_diag: [f64; STATE_DIM],

    // ---- GEOMETRY ----

    /// Fixed extrinsic rotation from the body (motion) frame into the camera
    /// frame, row-major.
    pub rot_bc: [[f64; 3]; 3],

    // ---- NUMERICS ----

    /// Minimum reciprocal condition number of the innovation covariance. Any
    /// update with a worse conditioned innovation covariance is rejected as
    /// degenerate.
    pub min_innov_cov_rcond: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            init_cov_diag: [1e-1; STATE_DIM],
            process_noise_diag: [1e-4; STATE_DIM],
            meas_noise_diag: [1e-3; STATE_DIM],
            rot_bc: [
                [0.0, -1.0,  0.0],
                [0.0,  0.0, -1.0],
                [1.0,  0.0,  0.0]
            ],
            min_innov_cov_rcond: 1e-12,
        }
    }
}

impl Params {
    /// Check the parameters describe a usable filter.
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_diag("init_cov_diag", &self.init_cov_diag)?;
        check_diag("process_noise_diag", &self.process_noise_diag)?;
        check_diag("meas_noise_diag", &self.meas_noise_diag)?;

        if self.rot_bc.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ParamsError::NonFinite("rot_bc"));
        }

        let r = self.rot_bc_matrix();
        let ortho_err = (r.transpose() * r - Matrix3::identity()).amax();
        let det = r.determinant();
        if ortho_err > ROT_TOLERANCE || (det - 1.0).abs() > ROT_TOLERANCE {
            return Err(ParamsError::NotARotation(det, ortho_err));
        }

        if !(self.min_innov_cov_rcond >= 0.0 && self.min_innov_cov_rcond < 1.0) {
            return Err(ParamsError::InvalidRcond(self.min_innov_cov_rcond));
        }

        Ok(())
    }

    /// The extrinsic rotation as a matrix.
    pub fn rot_bc_matrix(&self) -> Matrix3<f64> {
        let r = &self.rot_bc;

        Matrix3::new(
            r[0][0], r[0][1], r[0][2],
            r[1][0], r[1][1], r[1][2],
            r[2][0], r[2][1], r[2][2]
        )
    }

    pub fn init_cov(&self) -> Matrix4<f64> {
        Matrix4::from_diagonal(&Vector4::from(self.init_cov_diag))
    }

    pub fn process_noise(&self) -> Matrix4<f64> {
        Matrix4::from_diagonal(&Vector4::from(self.process_noise_diag))
    }

    pub fn meas_noise(&self) -> Matrix4<f64> {
        Matrix4::from_diagonal(&Vector4::from(self.meas_noise_diag))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_diag(name: &'static str, diag: &[f64; STATE_DIM]) -> Result<(), ParamsError> {
    if diag.iter().any(|v| !v.is_finite()) {
        return Err(ParamsError::NonFinite(name));
    }

    if diag.iter().any(|v| *v < 0.0) {
        return Err(ParamsError::NegativeVariance(name));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let p = Params::default();
        p.validate().unwrap();

        assert_eq!(p.init_cov()[(2, 2)], 0.1);
        assert_eq!(p.process_noise()[(3, 3)], 1e-4);
        assert_eq!(p.meas_noise()[(0, 0)], 1e-3);
        assert_eq!(p.meas_noise()[(0, 1)], 0.0);

        // Body X maps onto camera Z, the camera looks forwards
        assert_eq!(p.rot_bc_matrix() * nalgebra::Vector3::x(), nalgebra::Vector3::z());
    }

    #[test]
    fn test_params_from_toml() {
        let p: Params = toml::from_str(r#"
            init_cov_diag = [0.1, 0.1, 0.1, 0.05]
            process_noise_diag = [1e-4, 1e-4, 1e-4, 1e-5]
            meas_noise_diag = [1e-3, 1e-3, 1e-3, 1e-2]
            rot_bc = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
            min_innov_cov_rcond = 1e-10
        "#).unwrap();

        p.validate().unwrap();
        assert_eq!(p.init_cov_diag[3], 0.05);
        assert_eq!(p.rot_bc_matrix(), Matrix3::identity());
    }

    #[test]
    fn test_invalid_params() {
        let mut p = Params::default();
        p.meas_noise_diag[1] = -1e-3;
        match p.validate() {
            Err(ParamsError::NegativeVariance("meas_noise_diag")) => (),
            r => panic!("Expected negative variance error, got {:?}", r)
        }

        let mut p = Params::default();
        p.process_noise_diag[0] = std::f64::NAN;
        match p.validate() {
            Err(ParamsError::NonFinite("process_noise_diag")) => (),
            r => panic!("Expected non-finite error, got {:?}", r)
        }

        // A reflection is orthogonal but not a rotation
        let mut p = Params::default();
        p.rot_bc = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];
        match p.validate() {
            Err(ParamsError::NotARotation(..)) => (),
            r => panic!("Expected not a rotation error, got {:?}", r)
        }

        let mut p = Params::default();
        p.rot_bc = [[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.5]];
        match p.validate() {
            Err(ParamsError::NotARotation(..)) => (),
            r => panic!("Expected not a rotation error, got {:?}", r)
        }

        let mut p = Params::default();
        p.min_innov_cov_rcond = 1.5;
        match p.validate() {
            Err(ParamsError::InvalidRcond(_)) => (),
            r => panic!("Expected invalid rcond error, got {:?}", r)
        }

        // Zero measurement noise is allowed, it is only rejected at update time
        let mut p = Params::default();
        p.meas_noise_diag = [0.0; STATE_DIM];
        p.validate().unwrap();
    }
}
