//! # Navigation output module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The filtered relative pose published on every publish tick.
///
/// Receivers should treat this as last-value-wins, there is no acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelPoseMsg {
    /// UTC timestamp at which the pose was computed
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Position of the target relative to the vehicle, in the inertial frame
    /// anchored at the vehicle.
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Relative heading as a quaternion in `[w, x, y, z]` order.
    pub attitude_q: [f64; 4],
}
