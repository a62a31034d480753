//! # Relative pose estimator module
//!
//! Estimates the pose of a visually detected target relative to the vehicle
//! by fusing two asynchronous sources with an Extended Kalman Filter:
//!
//! - Motion increments (body-frame displacement plus the instantaneous
//!   heading) arriving at a steady rate, used to **predict**.
//! - Occasional observations of the target's relative pose, already expressed
//!   in the filter frame, used to **update**.
//!
//! The state is `[x, y, z, psi]`: the relative position in the filter's world
//! frame and the heading offset between the motion source's frame and the
//! filter frame. The heading offset doubles as an online extrinsic
//! calibration term, and is only ever moved by updates.
//!
//! On each publish tick the estimate is re-expressed in the caller's inertial
//! frame by [`RelPoseEkf::current_pose`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod ekf;
mod odom;
mod output;
mod params;
mod predict;
mod state;
mod target;
mod update;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use ekf::*;
pub use odom::*;
pub use output::*;
pub use params::*;
pub use predict::*;
pub use state::*;
pub use update::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Dimension of the state vector.
pub const STATE_DIM: usize = 4;

/// Index of the heading offset in the state vector.
pub const PSI_IDX: usize = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during estimator operation.
///
/// None of these are fatal, the estimator is left at its last valid value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RelPoseEstError {
    #[error("Motion increment contains non-finite values: {0:?}")]
    NonFiniteMotion(MotionIncrement),

    #[error("Observation contains non-finite values: {0:?}")]
    NonFiniteObservation(Observation),

    #[error("Prediction produced a non-finite state or covariance")]
    NonFinitePrediction,

    #[error(
        "Degenerate update, innovation covariance is singular or ill-conditioned \
        (reciprocal condition {0:e})"
    )]
    DegenerateUpdate(f64),

    #[error("The estimator has not been initialised")]
    NotInitialised,
}

/// Errors in the estimator's parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("Parameter `{0}` contains non-finite values")]
    NonFinite(&'static str),

    #[error("Parameter `{0}` contains negative variances")]
    NegativeVariance(&'static str),

    #[error(
        "The extrinsic rotation is not a proper rotation (determinant {0}, \
        orthogonality error {1})"
    )]
    NotARotation(f64, f64),

    #[error("The minimum reciprocal condition must be in [0, 1), found {0}")]
    InvalidRcond(f64),
}

/// Errors that can occur while initialising the estimator module.
#[derive(Debug, thiserror::Error)]
pub enum RelPoseEstInitError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(ParamsError),

    #[error("Could not create the archives: {0}")]
    ArchiveError(util::archive::ArchiveError),
}
