//! Supervisor configuration stored in `bootstrap.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::breaker::{DEFAULT_MAX_BOOTS, DEFAULT_WINDOW};
use crate::core::launch::LaunchSpec;
use crate::core::progress::DEFAULT_PROGRESS_INTERVAL;
use crate::io::jenkins::JenkinsSettings;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "bootstrap.toml";

/// Supervisor configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults the
/// launcher has always used. Command-line flags override file values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Runtime binary used to start the worker.
    pub java: PathBuf,

    /// Worker artifact location.
    pub jar: PathBuf,

    /// Extra runtime arguments placed before `-jar`.
    pub jvm_args: Vec<String>,

    pub heap: Option<String>,
    pub initial_heap: Option<String>,

    pub breaker: BreakerConfig,
    pub jenkins: JenkinsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Attempts further apart than this are unrelated.
    pub window_secs: u64,
    /// Attempts allowed inside one window.
    pub max_boots: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JenkinsConfig {
    pub url: String,
    pub project: String,
    pub artifact_suffix: String,
    pub progress_interval_ms: u64,
    pub metadata_timeout_secs: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            java: PathBuf::from("java"),
            jar: PathBuf::from("PolyBot.jar"),
            jvm_args: Vec::new(),
            heap: None,
            initial_heap: None,
            breaker: BreakerConfig::default(),
            jenkins: JenkinsConfig::default(),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW.as_secs(),
            max_boots: DEFAULT_MAX_BOOTS,
        }
    }
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: "https://ci.solo-studios.ca".to_string(),
            project: "job/solo-studios/job/PolyBot".to_string(),
            artifact_suffix: "-all.jar".to_string(),
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL.as_millis() as u64,
            metadata_timeout_secs: 30,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub java: Option<PathBuf>,
    pub jar: Option<PathBuf>,
    /// Appended after the file's `jvm_args`.
    pub jvm_args: Vec<String>,
    pub heap: Option<String>,
    pub initial_heap: Option<String>,
    pub jenkins_url: Option<String>,
    pub jenkins_project: Option<String>,
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.java.as_os_str().is_empty() {
            return Err(anyhow!("java must be a non-empty path"));
        }
        if self.jar.file_name().is_none() {
            return Err(anyhow!("jar must name a file"));
        }
        if self.breaker.window_secs == 0 {
            return Err(anyhow!("breaker.window_secs must be > 0"));
        }
        if self.breaker.max_boots == 0 {
            return Err(anyhow!("breaker.max_boots must be > 0"));
        }
        if self.jenkins.url.trim().is_empty() {
            return Err(anyhow!("jenkins.url must be non-empty"));
        }
        if self.jenkins.artifact_suffix.is_empty() {
            return Err(anyhow!("jenkins.artifact_suffix must be non-empty"));
        }
        if self.jenkins.progress_interval_ms == 0 {
            return Err(anyhow!("jenkins.progress_interval_ms must be > 0"));
        }
        if self.jenkins.metadata_timeout_secs == 0 {
            return Err(anyhow!("jenkins.metadata_timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.breaker.window_secs)
    }

    /// Launch spec for the worker, forwarding `worker_args` verbatim.
    pub fn launch_spec(&self, worker_args: Vec<String>) -> LaunchSpec {
        LaunchSpec {
            program: self.java.clone(),
            heap: self.heap.clone(),
            initial_heap: self.initial_heap.clone(),
            runtime_args: self.jvm_args.clone(),
            artifact: self.jar.clone(),
            worker_args,
        }
    }

    pub fn jenkins_settings(&self) -> JenkinsSettings {
        JenkinsSettings {
            url: self.jenkins.url.clone(),
            project: self.jenkins.project.clone(),
            artifact_suffix: self.jenkins.artifact_suffix.clone(),
            progress_interval: Duration::from_millis(self.jenkins.progress_interval_ms),
            metadata_timeout: Duration::from_secs(self.jenkins.metadata_timeout_secs),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BootstrapConfig::default()`.
pub fn load_config(path: &Path) -> Result<BootstrapConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = BootstrapConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BootstrapConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    debug!(path = %path.display(), "config loaded");
    Ok(cfg)
}

/// Apply command-line overrides to a loaded config.
pub fn apply_overrides(mut base: BootstrapConfig, overrides: &Overrides) -> Result<BootstrapConfig> {
    if let Some(java) = &overrides.java {
        base.java = java.clone();
    }
    if let Some(jar) = &overrides.jar {
        base.jar = jar.clone();
    }
    base.jvm_args.extend(overrides.jvm_args.iter().cloned());
    if let Some(heap) = &overrides.heap {
        base.heap = Some(heap.clone());
    }
    if let Some(initial_heap) = &overrides.initial_heap {
        base.initial_heap = Some(initial_heap.clone());
    }
    if let Some(url) = &overrides.jenkins_url {
        base.jenkins.url = url.clone();
    }
    if let Some(project) = &overrides.jenkins_project {
        base.jenkins.project = project.clone();
    }
    base.validate()?;
    Ok(base)
}
