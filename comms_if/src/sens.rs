//! # Sensor report module
//!
//! Reports arriving from the two asynchronous information sources of the
//! estimator. Both are serialised as JSON, for example:
//!
//! ```json
//! {"Odom": {"position_m": [1.0, 0.0, 0.5], "attitude_q": [1.0, 0.0, 0.0, 0.0]}}
//! {"Target": {"position_m": [0.1, 0.2, 2.5], "attitude_q": [1.0, 0.0, 0.0, 0.0]}}
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An absolute pose report from the motion source.
///
/// Successive reports are differenced by the estimator into body-frame
/// displacement increments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OdomReport {
    /// Position of the vehicle in the odometry frame.
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Attitude of the vehicle in the odometry frame as a quaternion in
    /// `[w, x, y, z]` order.
    pub attitude_q: [f64; 4],
}

/// A relative pose of the visually detected target, as solved by the vision
/// source in the camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Position of the target relative to the camera.
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Attitude of the target relative to the camera as a quaternion in
    /// `[w, x, y, z]` order.
    pub attitude_q: [f64; 4],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Any report the estimator can consume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorReport {
    /// Motion source report
    Odom(OdomReport),

    /// Vision source report
    Target(TargetReport),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum SensorReportParseError {
    #[error("Report contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SensorReport {
    /// Parse a report from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, SensorReportParseError> {
        serde_json::from_str(json_str).map_err(SensorReportParseError::InvalidJson)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_reports() {
        let odom = SensorReport::from_json(
            r#"{"Odom": {"position_m": [1.0, 0.0, 0.5], "attitude_q": [1.0, 0.0, 0.0, 0.0]}}"#
        ).unwrap();
        assert_eq!(odom, SensorReport::Odom(OdomReport {
            position_m: [1.0, 0.0, 0.5],
            attitude_q: [1.0, 0.0, 0.0, 0.0]
        }));

        let target = SensorReport::from_json(
            r#"{"Target": {"position_m": [0.1, 0.2, 2.5], "attitude_q": [1.0, 0.0, 0.0, 0.0]}}"#
        ).unwrap();
        match target {
            SensorReport::Target(t) => assert_eq!(t.position_m, [0.1, 0.2, 2.5]),
            r => panic!("Expected a target report, got {:?}", r)
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(SensorReport::from_json("{not json").is_err());
        assert!(SensorReport::from_json(
            r#"{"Imu": {"position_m": [0.0, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}}"#
        ).is_err());
        assert!(SensorReport::from_json(
            r#"{"Odom": {"position_m": [0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}}"#
        ).is_err());
    }
}
