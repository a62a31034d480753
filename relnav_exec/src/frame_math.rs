//! # Frame maths
//!
//! Pure functions building the heading rotations used by the relative pose
//! estimator, and conversions between quaternions and ZYX Euler angles.
//!
//! Frame naming follows the estimator: the inertial (I) frame of the motion
//! source, the motion/body (Q) frame of the vehicle, the camera (C) frame of
//! the sensor and the world (W) frame the filter accumulates in.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix3, Quaternion};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotation from the inertial frame into the motion (body) frame for the
/// given heading.
///
/// Units: radians
pub fn rotation_inertial_to_motion(heading_rad: f64) -> Matrix3<f64> {
    let (s, c) = heading_rad.sin_cos();

    Matrix3::new(
         c,   s,   0.0,
        -s,   c,   0.0,
         0.0, 0.0, 1.0
    )
}

/// Rotation from the camera frame into the world frame for the given heading
/// offset.
///
/// This is the transpose-family of [`rotation_inertial_to_motion`], but is
/// built independently since its derivative is needed for linearisation.
pub fn rotation_world_to_camera(heading_rad: f64) -> Matrix3<f64> {
    let (s, c) = heading_rad.sin_cos();

    Matrix3::new(
        c,   -s,   0.0,
        s,    c,   0.0,
        0.0,  0.0, 1.0
    )
}

/// Element-wise derivative of [`rotation_world_to_camera`] with respect to
/// the heading.
pub fn d_rotation_world_to_camera(heading_rad: f64) -> Matrix3<f64> {
    let (s, c) = heading_rad.sin_cos();

    Matrix3::new(
        -s,  -c,   0.0,
         c,  -s,   0.0,
         0.0, 0.0, 0.0
    )
}

/// Convert ZYX Euler angles into a quaternion.
///
/// Units: radians
pub fn euler_to_quaternion(roll_rad: f64, pitch_rad: f64, yaw_rad: f64) -> Quaternion<f64> {
    let (sr, cr) = (roll_rad * 0.5).sin_cos();
    let (sp, cp) = (pitch_rad * 0.5).sin_cos();
    let (sy, cy) = (yaw_rad * 0.5).sin_cos();

    Quaternion::new(
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy
    )
}

/// Convert a quaternion into ZYX Euler angles, returned as
/// `(roll, pitch, yaw)`.
///
/// The pitch sine is clamped to [-1, 1] so that round-off on a unit
/// quaternion can't push `asin` out of its domain.
pub fn quaternion_to_euler(w: f64, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));

    let sin_pitch = clamp(&(2.0 * (w * y - z * x)), &-1.0, &1.0);
    let pitch = sin_pitch.asin();

    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

    (roll, pitch, yaw)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
