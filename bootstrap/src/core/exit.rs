//! Mapping from worker exit codes to supervisor actions.

use crate::exit_codes;

/// Classified worker exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Normal,
    Shutdown,
    Error,
    Restart,
    Update,
    /// Any code outside the worker protocol.
    Unknown(i32),
}

impl WorkerExit {
    pub fn from_code(code: i32) -> Self {
        match code {
            exit_codes::WORKER_NORMAL => Self::Normal,
            exit_codes::WORKER_SHUTDOWN => Self::Shutdown,
            exit_codes::WORKER_ERROR => Self::Error,
            exit_codes::WORKER_RESTART => Self::Restart,
            exit_codes::WORKER_UPDATE => Self::Update,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Normal => exit_codes::WORKER_NORMAL,
            Self::Shutdown => exit_codes::WORKER_SHUTDOWN,
            Self::Error => exit_codes::WORKER_ERROR,
            Self::Restart => exit_codes::WORKER_RESTART,
            Self::Update => exit_codes::WORKER_UPDATE,
            Self::Unknown(code) => code,
        }
    }
}

/// What the boot loop does after a worker exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop supervising and exit successfully.
    Terminate,
    /// Go back to the top of the boot loop.
    Relaunch,
    /// Run the artifact update transaction, then go back to the top of the loop.
    UpdateThenRelaunch,
}

/// Decide the next action for a worker exit. Total over all exit codes.
pub fn action_for(exit: WorkerExit) -> Action {
    match exit {
        WorkerExit::Normal | WorkerExit::Shutdown => Action::Terminate,
        WorkerExit::Update => Action::UpdateThenRelaunch,
        WorkerExit::Error | WorkerExit::Restart | WorkerExit::Unknown(_) => Action::Relaunch,
    }
}
