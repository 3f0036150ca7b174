//! The boot loop: spawn the worker, wait for it, react to its exit code.
//!
//! Each iteration checks the crash-loop breaker, launches the worker once and
//! maps its exit code to an action. The loop is strictly sequential; the only
//! blocking points are the worker wait and the artifact download.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use crate::core::breaker::{BreakerCheck, CrashLoopBreaker};
use crate::core::exit::{Action, WorkerExit, action_for};
use crate::core::launch::LaunchSpec;
use crate::exit_codes;
use crate::io::artifact::ArtifactPaths;
use crate::io::clock::Clock;
use crate::io::process::WorkerLauncher;
use crate::io::updater::ArtifactUpdater;
use crate::update::{Preparation, prepare_artifact, run_update_transaction};

/// Why the boot loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The worker exited normally or asked for a shutdown.
    Requested(WorkerExit),
    /// The worker kept failing inside the tracking window and no backup was left.
    CrashLoop { recent_boots: u32, window: Duration },
}

impl Termination {
    /// Process exit status for the supervisor.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Requested(_) => exit_codes::OK,
            Self::CrashLoop { .. } => exit_codes::FAILURE,
        }
    }
}

/// Mutable supervisor state, owned by the loop for the supervisor's lifetime.
#[derive(Debug, Clone)]
pub struct SupervisorState {
    pub breaker: CrashLoopBreaker,
    /// A backup of the previous artifact exists and has not been consumed.
    pub has_backup: bool,
    /// Total worker launches so far.
    pub launches: u64,
}

/// Owns the launch spec, artifact paths and state; borrows its collaborators.
pub struct Supervisor<'a, L, U, C> {
    spec: LaunchSpec,
    paths: ArtifactPaths,
    launcher: &'a L,
    updater: &'a U,
    clock: &'a C,
    state: SupervisorState,
}

impl<'a, L, U, C> Supervisor<'a, L, U, C>
where
    L: WorkerLauncher,
    U: ArtifactUpdater,
    C: Clock,
{
    pub fn new(
        spec: LaunchSpec,
        breaker: CrashLoopBreaker,
        launcher: &'a L,
        updater: &'a U,
        clock: &'a C,
    ) -> Result<Self> {
        let paths = ArtifactPaths::new(spec.artifact.clone())?;
        Ok(Self {
            spec,
            paths,
            launcher,
            updater,
            clock,
            state: SupervisorState {
                breaker,
                has_backup: false,
                launches: 0,
            },
        })
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Fetch the artifact if it is missing, or drop a stale backup if it is not.
    pub fn prepare(&mut self) -> Result<Preparation> {
        prepare_artifact(&self.paths, self.updater)
    }

    /// Run the boot loop until the worker asks to stop or the breaker trips.
    ///
    /// Returns an error on spawn failure, update failure, or a failed rollback.
    pub fn run(&mut self) -> Result<Termination> {
        info!("Starting worker process...");
        loop {
            if let Some(termination) = self.iterate()? {
                return Ok(termination);
            }
            info!("Restarting worker process...");
        }
    }

    /// One spawn-wait-react cycle. `Some` ends the loop.
    fn iterate(&mut self) -> Result<Option<Termination>> {
        let now = self.clock.now();
        match self.state.breaker.check(now) {
            BreakerCheck::Proceed { window_reset } => {
                if window_reset {
                    debug!("boot window expired, reset boot count");
                }
            }
            BreakerCheck::Tripped { recent_boots } => return self.on_crash_loop(recent_boots),
        }

        if !self.paths.artifact_exists() {
            bail!(
                "artifact {} does not exist, refusing to launch",
                self.paths.artifact().display()
            );
        }

        self.state.breaker.record_attempt(now);
        self.state.launches += 1;
        debug!(
            launch = self.state.launches,
            recent_boots = self.state.breaker.recent_boots(),
            "launching worker"
        );
        let code = self.launcher.launch(&self.spec).context("launch worker")?;
        let exit = WorkerExit::from_code(code);
        debug!(exit_code = code, ?exit, "worker process exited");
        log_exit(exit);

        match action_for(exit) {
            Action::Terminate => Ok(Some(Termination::Requested(exit))),
            Action::Relaunch => Ok(None),
            Action::UpdateThenRelaunch => {
                // Never retried: a failed update may leave the artifact path empty.
                run_update_transaction(&self.paths, self.updater, &mut self.state.has_backup)
                    .context("update artifact")?;
                Ok(None)
            }
        }
    }

    fn on_crash_loop(&mut self, recent_boots: u32) -> Result<Option<Termination>> {
        let window = self.state.breaker.window();
        if !self.state.has_backup {
            error!(
                recent_boots,
                window_secs = window.as_secs(),
                "Worker failed to start {recent_boots} times within {}s of each boot. \
                 This is probably due to an error. Exiting.",
                window.as_secs()
            );
            return Ok(Some(Termination::CrashLoop {
                recent_boots,
                window,
            }));
        }

        warn!(
            recent_boots,
            max_boots = self.state.breaker.max_boots(),
            window_secs = window.as_secs(),
            "Worker keeps failing after an update; restoring the previous artifact. \
             This is a temporary mitigation, the new artifact still needs a fix."
        );
        self.paths
            .restore_backup()
            .context("restore previous artifact after crash loop")?;
        self.state.has_backup = false;
        self.state.breaker.reset();
        Ok(None)
    }
}

fn log_exit(exit: WorkerExit) {
    match exit {
        WorkerExit::Normal => info!("Worker exited successfully."),
        WorkerExit::Shutdown => {
            info!("Worker exited successfully, requesting a shutdown. Shutting down.");
        }
        WorkerExit::Error => error!("Worker exited with an error."),
        WorkerExit::Restart => info!("Worker exited successfully, requesting a restart."),
        WorkerExit::Update => {
            info!("Worker exited successfully, requesting an update. Updating artifact.");
        }
        WorkerExit::Unknown(code) => warn!(exit_code = code, "Worker exited with an unknown exit code."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{
        WORKER_ERROR, WORKER_NORMAL, WORKER_RESTART, WORKER_SHUTDOWN, WORKER_UPDATE,
    };
    use crate::test_support::{ManualClock, ScriptedLauncher, ScriptedRun, ScriptedUpdater};
    use std::fs;
    use std::path::Path;

    fn spec_in(dir: &Path) -> LaunchSpec {
        LaunchSpec {
            program: "java".into(),
            heap: None,
            initial_heap: None,
            runtime_args: Vec::new(),
            artifact: dir.join("bot.jar"),
            worker_args: Vec::new(),
        }
    }

    #[test]
    fn normal_exit_terminates_successfully_after_one_launch() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = spec_in(temp.path());
        fs::write(&spec.artifact, b"A").expect("write");
        let clock = ManualClock::new();
        let launcher = ScriptedLauncher::new(&clock, vec![ScriptedRun::quick(WORKER_NORMAL)]);
        let updater = ScriptedUpdater::succeeding(Vec::new());
        let mut supervisor =
            Supervisor::new(spec, CrashLoopBreaker::default(), &launcher, &updater, &clock)
                .expect("supervisor");

        let termination = supervisor.run().expect("run");

        assert_eq!(termination, Termination::Requested(WorkerExit::Normal));
        assert_eq!(termination.exit_code(), exit_codes::OK);
        assert_eq!(launcher.launch_count(), 1);
    }

    #[test]
    fn restart_and_unknown_codes_relaunch_until_shutdown() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = spec_in(temp.path());
        fs::write(&spec.artifact, b"A").expect("write");
        let clock = ManualClock::new();
        let launcher = ScriptedLauncher::new(
            &clock,
            vec![
                ScriptedRun::lasting(WORKER_RESTART, Duration::from_secs(60)),
                ScriptedRun::lasting(77, Duration::from_secs(60)),
                ScriptedRun::quick(WORKER_SHUTDOWN),
            ],
        );
        let updater = ScriptedUpdater::succeeding(Vec::new());
        let mut supervisor =
            Supervisor::new(spec, CrashLoopBreaker::default(), &launcher, &updater, &clock)
                .expect("supervisor");

        let termination = supervisor.run().expect("run");

        assert_eq!(termination, Termination::Requested(WorkerExit::Shutdown));
        assert_eq!(launcher.launch_count(), 3);
        assert_eq!(updater.calls(), 0);
    }

    #[test]
    fn three_quick_errors_without_backup_trip_the_breaker() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = spec_in(temp.path());
        fs::write(&spec.artifact, b"A").expect("write");
        let clock = ManualClock::new();
        let launcher = ScriptedLauncher::new(
            &clock,
            vec![
                ScriptedRun::lasting(WORKER_ERROR, Duration::from_secs(5)),
                ScriptedRun::lasting(WORKER_ERROR, Duration::from_secs(5)),
                ScriptedRun::lasting(WORKER_ERROR, Duration::from_secs(5)),
                // Must never be reached.
                ScriptedRun::quick(WORKER_NORMAL),
            ],
        );
        let updater = ScriptedUpdater::succeeding(Vec::new());
        let mut supervisor =
            Supervisor::new(spec, CrashLoopBreaker::default(), &launcher, &updater, &clock)
                .expect("supervisor");

        let termination = supervisor.run().expect("run");

        assert!(matches!(
            termination,
            Termination::CrashLoop {
                recent_boots: 3,
                ..
            }
        ));
        assert_eq!(termination.exit_code(), exit_codes::FAILURE);
        assert_eq!(launcher.launch_count(), 3);
    }

    #[test]
    fn update_request_swaps_artifact_and_keeps_backup() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = spec_in(temp.path());
        fs::write(&spec.artifact, b"A").expect("write");
        let clock = ManualClock::new();
        let launcher = ScriptedLauncher::new(
            &clock,
            vec![
                ScriptedRun::lasting(WORKER_UPDATE, Duration::from_secs(3600)),
                ScriptedRun::quick(WORKER_NORMAL),
            ],
        );
        let updater = ScriptedUpdater::succeeding(vec![b"B".to_vec()]);
        let mut supervisor =
            Supervisor::new(spec, CrashLoopBreaker::default(), &launcher, &updater, &clock)
                .expect("supervisor");

        supervisor.run().expect("run");

        assert!(supervisor.state().has_backup);
        assert_eq!(
            launcher.artifact_contents(),
            vec![Some(b"A".to_vec()), Some(b"B".to_vec())]
        );
        assert_eq!(fs::read(supervisor.paths().backup()).expect("backup"), b"A");
    }

    #[test]
    fn update_failure_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = spec_in(temp.path());
        fs::write(&spec.artifact, b"A").expect("write");
        let clock = ManualClock::new();
        let launcher = ScriptedLauncher::new(
            &clock,
            vec![
                ScriptedRun::quick(WORKER_UPDATE),
                ScriptedRun::quick(WORKER_NORMAL),
            ],
        );
        let updater = ScriptedUpdater::failing("no artifact ending in -all.jar");
        let mut supervisor =
            Supervisor::new(spec, CrashLoopBreaker::default(), &launcher, &updater, &clock)
                .expect("supervisor");

        let err = supervisor.run().unwrap_err();

        assert!(format!("{err:#}").contains("update artifact"));
        assert_eq!(launcher.launch_count(), 1);
        assert!(!supervisor.paths().artifact_exists());
        assert!(supervisor.paths().backup_exists());
    }

    #[test]
    fn missing_artifact_is_never_launched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = spec_in(temp.path());
        let clock = ManualClock::new();
        let launcher = ScriptedLauncher::new(&clock, vec![ScriptedRun::quick(WORKER_NORMAL)]);
        let updater = ScriptedUpdater::succeeding(Vec::new());
        let mut supervisor =
            Supervisor::new(spec, CrashLoopBreaker::default(), &launcher, &updater, &clock)
                .expect("supervisor");

        let err = supervisor.run().unwrap_err();

        assert!(err.to_string().contains("does not exist"));
        assert_eq!(launcher.launch_count(), 0);
    }
}
