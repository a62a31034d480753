//! # Sensor replay script interpreter module
//!
//! This module provides an interpreter for sensor replay scripts, allowing
//! recorded motion and vision reports to be fed to the estimator at the times
//! they were originally received.
//!
//! A script is a text file of entries of the form `<time_s>: <json>;`, where
//! the JSON payload is a [`SensorReport`]. Anything not matching that form
//! (for example comment lines) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::sens::{SensorReport, SensorReportParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A report which is scripted to arrive at a specific time.
struct ScriptedReport {
    /// The time the report is supposed to arrive at
    arrival_time_s: f64,

    /// The report to deliver
    report: SensorReport
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_reports` to acquire the reports which have arrived.
pub struct ScriptInterpreter {
    reports: VecDeque<ScriptedReport>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid report at {0} s: {1}")]
    InvalidReport(f64, SensorReportParseError),

    #[error("Could not build the script pattern: {0}")]
    PatternError(regex::Error),

    #[error("Script entries must be in time order, found {1} s after {0} s")]
    OutOfOrder(f64, f64)
}

#[derive(Debug)]
pub enum PendingReports {
    None,
    Some(Vec<SensorReport>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());
        
        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let reports = Self::parse(&script)?;

        Ok(ScriptInterpreter { reports })
    }

    /// Create a new interpreter directly from the script's contents.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {
        Ok(ScriptInterpreter {
            reports: Self::parse(script)?
        })
    }

    /// Return the reports which have arrived by now (in session time).
    pub fn get_pending_reports(&mut self) -> PendingReports {
        self.get_pending_reports_at(get_elapsed_seconds())
    }

    /// Return the reports with an arrival time before `current_time_s`, in
    /// arrival order.
    ///
    /// A NaN time (no session running) releases nothing.
    pub fn get_pending_reports_at(&mut self, current_time_s: f64) -> PendingReports {

        // If the queue is empty the script is over
        if self.reports.is_empty() {
            return PendingReports::EndOfScript
        }

        let mut report_vec: Vec<SensorReport> = vec![];

        // Pop reports from the head of the queue while their arrival time has
        // passed
        while let Some(head) = self.reports.front() {
            if !(head.arrival_time_s < current_time_s) {
                break;
            }

            if let Some(s) = self.reports.pop_front() {
                report_vec.push(s.report);
            }
        }

        if report_vec.is_empty() {
            PendingReports::None
        }
        else {
            PendingReports::Some(report_vec)
        }
    }

    /// Get the number of reports remaining in the script
    pub fn get_num_reports(&self) -> usize {
        self.reports.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.reports.back() {
            Some(r) => r.arrival_time_s,
            None => 0f64
        }
    }

    fn parse(script: &str) -> Result<VecDeque<ScriptedReport>, ScriptError> {
        let mut queue: VecDeque<ScriptedReport> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::PatternError)?;

        for cap in re.captures_iter(script) {
            // Both groups are mandatory in the pattern so always present
            let (time_str, payload) = match (cap.get(1), cap.get(3)) {
                (Some(t), Some(p)) => (t.as_str(), p.as_str()),
                _ => continue
            };

            let arrival_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let report = SensorReport::from_json(payload)
                .map_err(|e| ScriptError::InvalidReport(arrival_time_s, e))?;

            if let Some(prev) = queue.back() {
                if arrival_time_s < prev.arrival_time_s {
                    return Err(ScriptError::OutOfOrder(prev.arrival_time_s, arrival_time_s));
                }
            }

            queue.push_back(ScriptedReport {
                arrival_time_s,
                report
            });
        }

        if queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(queue)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
# Takeoff hover then one detection of the target
0.0: {"Odom": {"position_m": [0.0, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
0.2: {"Odom": {"position_m": [0.1, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
0.25: {"Target": {"position_m": [0.0, 0.1, 2.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
0.4: {"Odom": {"position_m": [0.2, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
"#;

    #[test]
    fn test_pending_reports() {
        let mut si = ScriptInterpreter::from_script_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_reports(), 4);
        assert_eq!(si.get_duration(), 0.4);

        // Nothing arrives until after its time
        match si.get_pending_reports_at(0.0) {
            PendingReports::None => (),
            p => panic!("Expected no reports, got {:?}", p)
        }

        match si.get_pending_reports_at(0.3) {
            PendingReports::Some(r) => {
                assert_eq!(r.len(), 3);
                match r[2] {
                    SensorReport::Target(_) => (),
                    ref o => panic!("Expected the target report last, got {:?}", o)
                }
            },
            p => panic!("Expected three reports, got {:?}", p)
        }

        match si.get_pending_reports_at(1.0) {
            PendingReports::Some(r) => assert_eq!(r.len(), 1),
            p => panic!("Expected one report, got {:?}", p)
        }

        match si.get_pending_reports_at(2.0) {
            PendingReports::EndOfScript => (),
            p => panic!("Expected end of script, got {:?}", p)
        }
    }

    #[test]
    fn test_nan_time_releases_nothing() {
        let mut si = ScriptInterpreter::from_script_str(r#"
5.0: {"Odom": {"position_m": [0.0, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
100.0: {"Odom": {"position_m": [1.0, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
"#).unwrap();

        match si.get_pending_reports_at(std::f64::NAN) {
            PendingReports::None => (),
            p => panic!("Expected no reports, got {:?}", p)
        }
        assert_eq!(si.get_num_reports(), 2);

        match si.get_pending_reports_at(10.0) {
            PendingReports::Some(r) => assert_eq!(r.len(), 1),
            p => panic!("Expected one report, got {:?}", p)
        }
    }

    #[test]
    fn test_invalid_scripts() {
        match ScriptInterpreter::from_script_str("# nothing here\n") {
            Err(ScriptError::ScriptEmpty) => (),
            r => panic!("Expected ScriptEmpty, got {:?}", r.err())
        }

        match ScriptInterpreter::from_script_str("1.0: {\"Odom\": 3};") {
            Err(ScriptError::InvalidReport(t, _)) => assert_eq!(t, 1.0),
            r => panic!("Expected InvalidReport, got {:?}", r.err())
        }

        let out_of_order = r#"
1.0: {"Odom": {"position_m": [0.0, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
0.5: {"Odom": {"position_m": [0.0, 0.0, 0.0], "attitude_q": [1.0, 0.0, 0.0, 0.0]}};
"#;
        match ScriptInterpreter::from_script_str(out_of_order) {
            Err(ScriptError::OutOfOrder(a, b)) => assert_eq!((a, b), (1.0, 0.5)),
            r => panic!("Expected OutOfOrder, got {:?}", r.err())
        }

        match ScriptInterpreter::new("/definitely/not/a/script.txt") {
            Err(ScriptError::ScriptNotFound(_)) => (),
            r => panic!("Expected ScriptNotFound, got {:?}", r.err())
        }
    }
}
