//! # Communications interface crate.
//!
//! Provides the messages exchanged between the relative navigation software
//! and its collaborators: the motion source, the vision source and whatever
//! consumes the published pose.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Reports produced by the motion (odometry) and vision (target detection) sources
pub mod sens;

/// Navigation outputs published to mission logic
pub mod nav;
