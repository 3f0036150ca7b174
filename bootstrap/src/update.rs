//! Artifact update transaction and startup preparation.
//!
//! The transaction keeps the previous artifact as a backup so the crash-loop
//! breaker can roll back if the new artifact cannot stay up. A successful
//! update says nothing about the new artifact's health; the backup stays on
//! disk until the next update, a rollback, or the next clean startup.

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::io::artifact::ArtifactPaths;
use crate::io::updater::ArtifactUpdater;

/// What startup had to do before the first spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preparation {
    /// The artifact was already present.
    Present { removed_stale_backup: bool },
    /// No artifact existed, so one was fetched.
    Fetched,
}

/// Make sure an artifact exists before the boot loop starts.
///
/// A backup left behind by a previous supervisor run is deleted when the
/// artifact is present. When the artifact is missing, the update transaction
/// runs once (which also clears any stale backup).
#[instrument(skip_all, fields(artifact = %paths.artifact().display()))]
pub fn prepare_artifact<U: ArtifactUpdater>(
    paths: &ArtifactPaths,
    updater: &U,
) -> Result<Preparation> {
    if paths.artifact_exists() {
        let removed_stale_backup = paths.remove_backup()?;
        if removed_stale_backup {
            info!(backup = %paths.backup().display(), "removed stale backup from a previous run");
        }
        return Ok(Preparation::Present {
            removed_stale_backup,
        });
    }

    info!("no artifact found, downloading before first launch");
    let mut has_backup = false;
    run_update_transaction(paths, updater, &mut has_backup)
        .context("fetch initial artifact")?;
    Ok(Preparation::Fetched)
}

/// Swap the current artifact for the latest one.
///
/// 1. Delete a stale backup (clearing `has_backup`).
/// 2. Move the current artifact to the backup path (setting `has_backup`),
///    unless there is no current artifact.
/// 3. Fetch the latest artifact into the vacant artifact path.
///
/// On error the backup, if created, stays on disk and `has_backup` stays set.
#[instrument(skip_all, fields(artifact = %paths.artifact().display()))]
pub fn run_update_transaction<U: ArtifactUpdater>(
    paths: &ArtifactPaths,
    updater: &U,
    has_backup: &mut bool,
) -> Result<()> {
    if paths.remove_backup()? {
        info!(backup = %paths.backup().display(), "deleted stale backup");
    }
    *has_backup = false;

    if paths.artifact_exists() {
        paths.stash_artifact()?;
        *has_backup = true;
        info!(backup = %paths.backup().display(), "previous artifact kept as backup");
    } else {
        warn!("no current artifact to back up");
    }

    updater
        .update(paths.artifact())
        .with_context(|| format!("update {}", paths.artifact().display()))?;
    info!("artifact updated");
    Ok(())
}
