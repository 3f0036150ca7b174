//! Deterministic, pure logic shared by the supervisor.
//!
//! Core modules must be free of I/O side effects. Time is passed in as an
//! `Instant` rather than read from the system so window behavior is testable.

pub mod breaker;
pub mod exit;
pub mod launch;
pub mod progress;
