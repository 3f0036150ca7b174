//! Test-only fakes for the supervisor's collaborators.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

use crate::core::launch::LaunchSpec;
use crate::io::clock::Clock;
use crate::io::process::WorkerLauncher;
use crate::io::updater::ArtifactUpdater;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// One scripted worker run: how long it "runs" and what it exits with.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedRun {
    pub exit_code: i32,
    pub runtime: Duration,
}

impl ScriptedRun {
    /// A run that exits after one second.
    pub fn quick(exit_code: i32) -> Self {
        Self::lasting(exit_code, Duration::from_secs(1))
    }

    pub fn lasting(exit_code: i32, runtime: Duration) -> Self {
        Self { exit_code, runtime }
    }
}

/// Launcher that replays queued runs, advancing the shared clock by each run's
/// runtime and recording the artifact content it was launched with.
pub struct ScriptedLauncher<'a> {
    clock: &'a ManualClock,
    runs: RefCell<VecDeque<ScriptedRun>>,
    launched_with: RefCell<Vec<Option<Vec<u8>>>>,
}

impl<'a> ScriptedLauncher<'a> {
    pub fn new(clock: &'a ManualClock, runs: Vec<ScriptedRun>) -> Self {
        Self {
            clock,
            runs: RefCell::new(runs.into()),
            launched_with: RefCell::new(Vec::new()),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launched_with.borrow().len()
    }

    /// Artifact bytes seen at each launch, in order.
    pub fn artifact_contents(&self) -> Vec<Option<Vec<u8>>> {
        self.launched_with.borrow().clone()
    }
}

impl WorkerLauncher for ScriptedLauncher<'_> {
    fn launch(&self, spec: &LaunchSpec) -> Result<i32> {
        let run = self
            .runs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted launcher has no runs left"))?;
        self.launched_with
            .borrow_mut()
            .push(fs::read(&spec.artifact).ok());
        self.clock.advance(run.runtime);
        Ok(run.exit_code)
    }
}

/// One scripted updater call.
#[derive(Debug, Clone)]
pub enum ScriptedUpdate {
    /// Write these bytes to the destination.
    Write(Vec<u8>),
    /// Fail without touching the destination.
    Fail(String),
}

/// Updater that replays queued outcomes and counts calls.
pub struct ScriptedUpdater {
    updates: RefCell<VecDeque<ScriptedUpdate>>,
    repeat_failure: Option<String>,
    calls: Cell<usize>,
}

impl ScriptedUpdater {
    pub fn new(updates: Vec<ScriptedUpdate>) -> Self {
        Self {
            updates: RefCell::new(updates.into()),
            repeat_failure: None,
            calls: Cell::new(0),
        }
    }

    /// Each call writes the next payload; calls past the end fail.
    pub fn succeeding(payloads: Vec<Vec<u8>>) -> Self {
        Self::new(payloads.into_iter().map(ScriptedUpdate::Write).collect())
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            repeat_failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ArtifactUpdater for ScriptedUpdater {
    fn update(&self, destination: &Path) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if let Some(message) = &self.repeat_failure {
            return Err(anyhow!("{message}"));
        }
        match self.updates.borrow_mut().pop_front() {
            Some(ScriptedUpdate::Write(bytes)) => {
                fs::write(destination, bytes)?;
                Ok(())
            }
            Some(ScriptedUpdate::Fail(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("scripted updater has no updates left")),
        }
    }
}
