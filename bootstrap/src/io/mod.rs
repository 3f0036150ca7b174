//! I/O adapters for the supervisor.

pub mod artifact;
pub mod clock;
pub mod config;
pub mod jenkins;
pub mod process;
pub mod updater;
