//! Stable exit codes shared between the supervisor and the worker.
//!
//! The worker reports what it wants next through its process exit code. Any
//! value outside this set is treated as an unknown exit and the worker is
//! relaunched.

/// Worker finished normally; the supervisor exits too.
pub const WORKER_NORMAL: i32 = 0;
/// Worker failed; relaunch subject to the crash-loop breaker.
pub const WORKER_ERROR: i32 = 1;
/// Worker asks the supervisor to shut down.
pub const WORKER_SHUTDOWN: i32 = 2;
/// Worker asks to be restarted.
pub const WORKER_RESTART: i32 = 3;
/// Worker asks for its artifact to be updated before the next launch.
pub const WORKER_UPDATE: i32 = 4;

/// Supervisor terminated because the worker asked it to.
pub const OK: i32 = 0;
/// Supervisor terminated on a crash loop, spawn failure, update failure or bad config.
pub const FAILURE: i32 = 1;
