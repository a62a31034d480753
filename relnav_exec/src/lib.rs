//! # Relative navigation library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the relative navigation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Frame maths - heading rotations and quaternion/Euler conversions
pub mod frame_math;

/// Executable parameters
pub mod params;

/// Relative pose estimator - fuses odometry and vision into a relative pose of the target
pub mod rel_pose_est;
