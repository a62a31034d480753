//! Main relative navigation executable entry point.
//! 
//! # Architecture
//! 
//! The general execution methodology consists of:
//! 
//!     - Initialise the session, logger and estimator
//!     - Main loop, once per publish period:
//!         - Sensor report acquisition (from the replay script)
//!         - Relative pose estimator processing, predicting through each
//!           odometry increment and updating with each target report in
//!           arrival order
//!         - Publication of the relative pose
//!         - Archiving
//! 
//! All estimator state is owned by the main loop, so predicts, updates and
//! publishes are serialised by construction.
//! 
//! # Usage
//! 
//! `relnav_exec <script_path>`

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
use relnav_lib::{
    params::ExecParams,
    rel_pose_est::{InputData, RelPoseEst}
};
use util::{
    archive::Archived,
    logger::{logger_init, parse_level, LoggerInitError},
    module::State,
    session::Session,
    script_interpreter::{ScriptInterpreter, PendingReports},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "relnav_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load(
        "relnav_exec.toml"
    ).wrap_err("Could not load exec params")?;

    if !(exec_params.cycle_period_s.is_finite() && exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be positive, found {}", exec_params.cycle_period_s
        ));
    }

    // ---- LOGGING ----

    let log_level = parse_level(&exec_params.log_level)
        .wrap_err("Invalid log level")?;

    let module_log_levels = exec_params.module_log_levels
        .iter()
        .map(|(target, name)| Ok((target.clone(), parse_level(name)?)))
        .collect::<Result<Vec<_>, LoggerInitError>>()
        .wrap_err("Invalid module log level")?;

    logger_init(log_level, &module_log_levels, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Relative Navigation Executable\n");
    info!("Session directory: {:?}", session.session_root);
    info!("Exec parameters loaded\n");

    // ---- LOAD SCRIPT ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let script_path = script_path_from_args(&args)?;

    info!("Loading script from \"{}\"", script_path);

    let mut si = ScriptInterpreter::new(script_path)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} reports\n",
        si.get_duration(),
        si.get_num_reports()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut rel_pose_est = RelPoseEst::default();
    rel_pose_est.init(exec_params.rel_pose_est_params.clone(), &session)
        .wrap_err("Failed to initialise RelPoseEst")?;
    info!("RelPoseEst init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut num_cycles: u64 = 0;

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        let input = match si.get_pending_reports() {
            PendingReports::None => InputData::default(),
            PendingReports::Some(reports) => InputData { reports },
            // Exit if end of script reached
            PendingReports::EndOfScript => {
                info!("End of script reached, stopping");
                break
            }
        };

        // ---- ESTIMATION AND PUBLICATION ----

        if let Some((pose, report)) = rel_pose_est.proc_logged(&input) {
            let msg = pose.to_msg(chrono::Utc::now());

            info!(
                "RelPose: pos {:?} m, att {:?}",
                msg.position_m,
                msg.attitude_q
            );
            debug!("RelPoseEst status: {:?}", report);
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = rel_pose_est.write() {
            warn!("Could not write RelPoseEst archives: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s", 
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            )
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("Executed {} cycles", num_cycles);

    match rel_pose_est.ekf() {
        Some(ekf) => session.save("rel_pose_est_final.json", ekf.snapshot()),
        None => warn!("No estimate to save")
    }

    session.exit();

    info!("End of execution");

    Ok(())
}

/// Get the script path, the only expected argument.
fn script_path_from_args(args: &[String]) -> Result<&str, Report> {
    match args {
        [_, path] => Ok(path.as_str()),
        _ => Err(eyre!(
            "Expected one argument (the script path), found {}",
            args.len().saturating_sub(1)
        ))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_script_path_from_args() {
        let args = vec!["relnav_exec".to_string(), "scripts/approach.txt".to_string()];
        assert_eq!(script_path_from_args(&args).unwrap(), "scripts/approach.txt");

        assert!(script_path_from_args(&args[..1]).is_err());
        assert!(script_path_from_args(&[]).is_err());

        let extra = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(script_path_from_args(&extra).is_err());
    }
}
