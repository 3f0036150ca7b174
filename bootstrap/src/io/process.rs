//! Worker process launching.
//!
//! The [`WorkerLauncher`] trait decouples the boot loop from real process
//! spawning. Tests use scripted launchers that return predetermined exit codes
//! without starting a JVM.

use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, error, instrument};

use crate::core::launch::LaunchSpec;

/// Exit code reported when the platform gives neither a code nor a signal.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Abstraction over worker process backends.
pub trait WorkerLauncher {
    /// Start the worker, block until it exits, and return its exit code.
    ///
    /// Errors only when the worker could not be started or waited on.
    fn launch(&self, spec: &LaunchSpec) -> Result<i32>;
}

/// Launcher that spawns the worker with the supervisor's own stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl WorkerLauncher for ProcessLauncher {
    #[instrument(skip_all, fields(artifact = %spec.artifact.display()))]
    fn launch(&self, spec: &LaunchSpec) -> Result<i32> {
        debug!(command = %spec.display_command(), "launching worker");

        let mut cmd = Command::new(&spec.program);
        cmd.args(spec.args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(err = %e, program = %spec.program.display(), "failed to spawn worker");
                return Err(e)
                    .with_context(|| format!("spawn worker {}", spec.program.display()));
            }
        };
        debug!(pid = child.id(), "worker started");

        let status = child.wait().context("wait for worker")?;
        let code = exit_code(status);
        debug!(exit_code = code, "worker exited");
        Ok(code)
    }
}

/// Numeric exit code of a finished process.
///
/// On Unix a process killed by a signal has no exit code; it is reported as
/// `128 + signal` like a shell would.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_exit_code(status).unwrap_or(UNKNOWN_EXIT_CODE)
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> Option<i32> {
    None
}
