//! # Relative Navigation Executable Parameters
//!
//! This module provides parameters for the relative navigation executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecParams {

    /// Target period of one cycle, which is also the publish period of the
    /// relative pose.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Path to the relative pose estimator's parameter file, relative to the
    /// parameters directory
    pub rel_pose_est_params: String,

    /// Minimum log level of the whole executable, at least `info`
    pub log_level: String,

    /// Log levels for individual module paths (for example
    /// `relnav_lib::rel_pose_est`), each at least `warn`
    #[serde(default)]
    pub module_log_levels: BTreeMap<String, String>,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
