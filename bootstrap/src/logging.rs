//! Tracing setup for the supervisor.
//!
//! The supervisor's log is its product output: every state transition is
//! logged at `info`, mitigations at `warn` and fatal conditions at `error`.
//! The worker shares the same terminal through inherited stdio, so the
//! supervisor writes to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=bootstrap=debug bootstrap -- --token abc
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
