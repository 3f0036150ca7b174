//! Jenkins build server updater.
//!
//! Looks up the last successful build of a Jenkins job, picks the artifact
//! whose file name ends with the configured suffix, and streams it to disk.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::core::progress::{ProgressThrottle, format_progress};
use crate::io::updater::{ArtifactUpdater, write_atomically};

const LAST_SUCCESSFUL_BUILD: &str = "lastSuccessfulBuild";
const JSON_API: &str = "api/json";
const ARTIFACT: &str = "artifact";

/// Settings for [`JenkinsUpdater`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JenkinsSettings {
    /// Jenkins root URL, e.g. `https://ci.example.com`.
    pub url: String,
    /// Job path relative to the root, e.g. `job/team/job/bot`.
    pub project: String,
    /// Suffix identifying the artifact to download.
    pub artifact_suffix: String,
    pub progress_interval: Duration,
    pub metadata_timeout: Duration,
}

/// Build metadata returned by `<job>/lastSuccessfulBuild/api/json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsBuild {
    pub id: String,
    pub full_display_name: String,
    /// Build start time in epoch milliseconds.
    pub timestamp: i64,
    pub url: String,
    #[serde(default)]
    pub artifacts: Vec<JenkinsArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsArtifact {
    pub display_path: Option<String>,
    pub file_name: String,
    pub relative_path: String,
}

impl JenkinsBuild {
    /// First artifact whose file name ends with `suffix`.
    pub fn find_artifact(&self, suffix: &str) -> Option<&JenkinsArtifact> {
        self.artifacts.iter().find(|a| a.file_name.ends_with(suffix))
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Updater backed by a Jenkins job's last successful build.
pub struct JenkinsUpdater {
    settings: JenkinsSettings,
    client: Client,
}

impl JenkinsUpdater {
    pub fn new(settings: JenkinsSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("bootstrap/", env!("CARGO_PKG_VERSION")))
            // Artifact downloads may be large; only the metadata request is bounded.
            .timeout(None::<Duration>)
            .build()
            .context("build http client")?;
        Ok(Self { settings, client })
    }

    /// `<url>/<project>` with redundant slashes removed.
    pub fn job_url(&self) -> String {
        job_url(&self.settings.url, &self.settings.project)
    }

    #[instrument(skip_all)]
    fn fetch_last_successful_build(&self) -> Result<JenkinsBuild> {
        let url = build_api_url(&self.job_url());
        debug!(%url, "querying Jenkins for the latest successful build");
        let response = self
            .client
            .get(&url)
            .timeout(self.settings.metadata_timeout)
            .send()
            .with_context(|| format!("request {url}"))?;
        if !response.status().is_success() {
            bail!("Jenkins returned {} for {url}", response.status());
        }
        response
            .json::<JenkinsBuild>()
            .with_context(|| format!("parse build metadata from {url}"))
    }
}

impl ArtifactUpdater for JenkinsUpdater {
    #[instrument(skip_all, fields(destination = %destination.display()))]
    fn update(&self, destination: &Path) -> Result<()> {
        info!("Downloading the latest artifact from Jenkins");
        let build = self.fetch_last_successful_build()?;
        let suffix = &self.settings.artifact_suffix;
        let artifact = build.find_artifact(suffix).ok_or_else(|| {
            anyhow!(
                "could not find an artifact ending in {suffix} in build {}",
                build.full_display_name
            )
        })?;
        info!(
            build = %build.full_display_name,
            started_at = ?build.started_at(),
            file = %artifact.file_name,
            "found latest successful build artifact"
        );

        let url = artifact_url(&self.job_url(), &artifact.relative_path);
        debug!(%url, "downloading artifact");
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request {url}"))?;
        if !response.status().is_success() {
            bail!("Jenkins returned {} for {url}", response.status());
        }

        let total = response.content_length();
        let mut throttle = ProgressThrottle::new(self.settings.progress_interval);
        let bytes = write_atomically(response, destination, total, &mut throttle, |read, total| {
            info!("{}", format_progress(read, total));
        })
        .with_context(|| format!("download {}", artifact.file_name))?;

        info!(bytes, "downloaded the latest artifact");
        Ok(())
    }
}

fn job_url(base: &str, project: &str) -> String {
    let base = base.trim_end_matches('/');
    let project = project.trim_matches('/');
    if project.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{project}")
    }
}

fn build_api_url(job_url: &str) -> String {
    format!("{job_url}/{LAST_SUCCESSFUL_BUILD}/{JSON_API}")
}

fn artifact_url(job_url: &str, relative_path: &str) -> String {
    format!(
        "{job_url}/{LAST_SUCCESSFUL_BUILD}/{ARTIFACT}/{}",
        relative_path.trim_start_matches('/')
    )
}
