//! Supervisor for a self-updating worker process.
//!
//! The supervisor launches a worker (a JVM service started from a jar),
//! waits for it to exit and treats the exit code as a request: stop, restart,
//! or update the jar first. A crash-loop breaker stops the supervisor when the
//! worker keeps failing, rolling back to the previous jar first if an update
//! produced one. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (exit-code mapping, breaker,
//!   launch command line, progress formatting). No I/O.
//! - **[`io`]**: Side-effecting adapters (process spawning, artifact files,
//!   Jenkins downloads, config, clock) behind traits so tests can script them.
//!
//! [`update`] and [`supervisor`] coordinate the two.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod supervisor;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod update;
