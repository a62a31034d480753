//! Implementations for the RelPoseEst state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;

// Internal
use super::{
    Observation, OdomDiffer, Params, ParamsError, RelPose, RelPoseEkf, RelPoseEstError,
    RelPoseEstInitError,
};
use comms_if::sens::SensorReport;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::{get_elapsed_seconds, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Relative pose estimation module state
#[derive(Default)]
pub struct RelPoseEst {
    pub(crate) ekf: Option<RelPoseEkf>,

    pub(crate) odom: OdomDiffer,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    arch_state: Archiver,

    pub(crate) output: Option<RelPose>,
    arch_output: Archiver,
}

/// Input data to the relative pose estimator.
#[derive(Debug, Default, Clone)]
pub struct InputData {
    /// All sensor reports which arrived since the last cycle, in arrival
    /// order.
    pub reports: Vec<SensorReport>,
}

/// Status report for relative pose estimator processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// Number of motion increments predicted through.
    pub num_predicts: u32,

    /// Number of observations fused.
    pub num_updates: u32,

    /// Number of reports rejected for containing non-finite values.
    pub num_rejected: u32,

    /// Number of observations rejected as degenerate.
    pub num_degenerate: u32,

    /// Trace of the covariance at the end of the cycle.
    pub cov_trace: f64,
}

#[derive(Serialize)]
struct StateRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    z_m: f64,
    psi_rad: f64,
    var_x_m2: f64,
    var_y_m2: f64,
    var_z_m2: f64,
    var_psi_rad2: f64,
}

#[derive(Serialize)]
struct OutputRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    z_m: f64,
    q_w: f64,
    q_x: f64,
    q_y: f64,
    q_z: f64,
}

#[derive(Serialize)]
struct ReportRecord {
    time_s: f64,
    num_predicts: u32,
    num_updates: u32,
    num_rejected: u32,
    num_degenerate: u32,
    cov_trace: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for RelPoseEst {
    const NAME: &'static str = "RelPoseEst";

    type InitData = String;
    type InitError = RelPoseEstInitError;

    type InputData = InputData;
    type OutputData = RelPose;
    type StatusReport = StatusReport;
    type ProcError = RelPoseEstError;

    /// Initialise the RelPoseEst module.
    ///
    /// Expected init data is the path to the parameter file, relative to
    /// the parameters directory
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(&init_data)
            .map_err(RelPoseEstInitError::ParamLoadError)?;

        *self = Self::with_params(params)
            .map_err(RelPoseEstInitError::InvalidParams)?;

        self.arch_report = Archiver::from_path(session, "rel_pose_est/status_report.csv")
            .map_err(RelPoseEstInitError::ArchiveError)?;
        self.arch_state = Archiver::from_path(session, "rel_pose_est/state.csv")
            .map_err(RelPoseEstInitError::ArchiveError)?;
        self.arch_output = Archiver::from_path(session, "rel_pose_est/output.csv")
            .map_err(RelPoseEstInitError::ArchiveError)?;

        Ok(())
    }

    /// Process all sensor reports received this cycle, then produce the
    /// current relative pose.
    ///
    /// Individual bad reports are not errors, they are logged, counted in
    /// the status report and skipped.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let ekf = self.ekf.as_mut().ok_or(RelPoseEstError::NotInitialised)?;

        self.report = StatusReport::default();

        for sens_report in input_data.reports.iter() {
            match sens_report {
                SensorReport::Odom(odom) => match self.odom.proc(odom) {
                    Ok(Some(inc)) => match ekf.predict(&inc) {
                        Ok(()) => self.report.num_predicts += 1,
                        Err(e) => {
                            warn!("Motion increment rejected: {}", e);
                            self.report.num_rejected += 1;
                        }
                    },
                    Ok(None) => debug!("First odometry report received"),
                    Err(e) => {
                        warn!("Odometry report rejected: {}", e);
                        self.report.num_rejected += 1;
                    }
                },
                SensorReport::Target(target) => {
                    let obs = Observation::from_target_report(target);

                    match ekf.update(&obs) {
                        Ok(()) => self.report.num_updates += 1,
                        Err(RelPoseEstError::DegenerateUpdate(rcond)) => {
                            warn!(
                                "Target report rejected, degenerate update (rcond {:e})",
                                rcond
                            );
                            self.report.num_degenerate += 1;
                        }
                        Err(e) => {
                            warn!("Target report rejected: {}", e);
                            self.report.num_rejected += 1;
                        }
                    }
                }
            }
        }

        let pose = ekf.current_pose(self.odom.heading_rad());
        self.report.cov_trace = ekf.covariance().trace();

        trace!("RelPoseEst output: {:?}", pose);

        self.output = Some(pose);

        Ok((pose, self.report))
    }
}

impl Archived for RelPoseEst {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let time_s = get_elapsed_seconds();

        self.arch_report.serialise(ReportRecord {
            time_s,
            num_predicts: self.report.num_predicts,
            num_updates: self.report.num_updates,
            num_rejected: self.report.num_rejected,
            num_degenerate: self.report.num_degenerate,
            cov_trace: self.report.cov_trace,
        })?;

        if let Some(ref ekf) = self.ekf {
            let x = ekf.state();
            let p = ekf.covariance();

            self.arch_state.serialise(StateRecord {
                time_s,
                x_m: x[0],
                y_m: x[1],
                z_m: x[2],
                psi_rad: x[3],
                var_x_m2: p[(0, 0)],
                var_y_m2: p[(1, 1)],
                var_z_m2: p[(2, 2)],
                var_psi_rad2: p[(3, 3)],
            })?;
        }

        if let Some(ref pose) = self.output {
            let q = pose.attitude_q.quaternion();

            self.arch_output.serialise(OutputRecord {
                time_s,
                x_m: pose.position_m[0],
                y_m: pose.position_m[1],
                z_m: pose.position_m[2],
                q_w: q.w,
                q_x: q.i,
                q_y: q.j,
                q_z: q.k,
            })?;
        }

        Ok(())
    }
}

impl RelPoseEst {
    /// Build a ready to use module from the given parameters, without any
    /// archiving.
    pub fn with_params(params: Params) -> Result<Self, ParamsError> {
        let ekf = RelPoseEkf::new(&params)?;

        Ok(Self {
            ekf: Some(ekf),
            ..Default::default()
        })
    }

    /// The filter, if the module has been initialised.
    pub fn ekf(&self) -> Option<&RelPoseEkf> {
        self.ekf.as_ref()
    }

    /// The most recent output, if any cycle has been processed.
    pub fn output(&self) -> Option<RelPose> {
        self.output
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
