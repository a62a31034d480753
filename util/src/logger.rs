//! Logger setup for an execution
//!
//! Everything goes to stdout and the session's log file, stamped with the
//! session elapsed time. Per-module levels let high rate modules (such as the
//! estimator, which traces every predict) be quietened without losing the
//! rest of the detail.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt::Arguments;
use std::str::FromStr;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Prefix stripped from targets when displayed.
const TARGET_PREFIX: &str = "relnav_lib::";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `{0}` for `{1}`, found `{2}`")]
    LevelTooQuiet(LevelFilter, String, LevelFilter),

    #[error("`{0}` is not a log level")]
    InvalidLevelName(String),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must be at least `Info`, and each entry of `module_levels`
/// (a target prefix and its level) at least `Warn`, so that lifecycle
/// messages and rejected inputs always reach the log file.
///
/// Must only be called once per execution.
pub fn logger_init(
    min_level: LevelFilter,
    module_levels: &[(String, LevelFilter)],
    session: &Session
) -> Result<(), LoggerInitError> {

    check_level(min_level, LevelFilter::Info, "all")?;
    for (target, level) in module_levels {
        check_level(*level, LevelFilter::Warn, target)?;
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let dispatch = module_levels
        .iter()
        .fold(
            fern::Dispatch::new().format(format_record).level(min_level),
            |d, (target, level)| d.level_for(target.clone(), *level)
        );

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    for (target, level) in module_levels {
        info!("    Log level for {}: {:?}", target, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Parse a level name such as `"debug"` or `"WARN"`.
pub fn parse_level(name: &str) -> Result<LevelFilter, LoggerInitError> {
    LevelFilter::from_str(name.trim())
        .map_err(|_| LoggerInitError::InvalidLevelName(name.to_string()))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_level(level: LevelFilter, quietest: LevelFilter, target: &str)
    -> Result<(), LoggerInitError>
{
    match level < quietest {
        true => Err(LoggerInitError::LevelTooQuiet(quietest, target.to_string(), level)),
        false => Ok(())
    }
}

fn format_record(out: fern::FormatCallback, message: &Arguments, record: &Record) {
    // Only debug and trace include the target
    if record.level() > Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            level_to_str(record.level()),
            display_target(record.target()),
            message
        ))
    }
    else {
        out.finish(format_args!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            level_to_str(record.level()),
            message
        ))
    }
}

fn display_target(target: &str) -> &str {
    target.trim_start_matches(TARGET_PREFIX)
}

/// Get the string representation of a log level
fn level_to_str(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN ").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::Off);

        match parse_level("loud") {
            Err(LoggerInitError::InvalidLevelName(n)) => assert_eq!(n, "loud"),
            r => panic!("Expected invalid level name, got {:?}", r)
        }
    }

    #[test]
    fn test_check_level() {
        assert!(check_level(LevelFilter::Trace, LevelFilter::Info, "all").is_ok());
        assert!(check_level(LevelFilter::Info, LevelFilter::Info, "all").is_ok());
        assert!(check_level(LevelFilter::Warn, LevelFilter::Warn, "est").is_ok());

        match check_level(LevelFilter::Error, LevelFilter::Warn, "est") {
            Err(LoggerInitError::LevelTooQuiet(LevelFilter::Warn, t, LevelFilter::Error)) =>
                assert_eq!(t, "est"),
            r => panic!("Expected level too quiet, got {:?}", r)
        }
    }

    #[test]
    fn test_display_target() {
        assert_eq!(
            display_target("relnav_lib::rel_pose_est::predict"),
            "rel_pose_est::predict"
        );
        assert_eq!(display_target("relnav_exec"), "relnav_exec");
    }
}
