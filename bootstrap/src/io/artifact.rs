//! Artifact and backup files on disk.
//!
//! All moves between the live artifact and its backup are renames within one
//! directory, so each path always holds either a complete file or nothing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Prefix added to the artifact file name to form the backup name.
pub const BACKUP_PREFIX: &str = "old.";

/// The live artifact path and its derived backup path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    artifact: PathBuf,
    backup: PathBuf,
}

impl ArtifactPaths {
    /// Derive the backup path as `old.<file name>` next to the artifact.
    pub fn new(artifact: impl Into<PathBuf>) -> Result<Self> {
        let artifact = artifact.into();
        let file_name = artifact
            .file_name()
            .ok_or_else(|| anyhow!("artifact path has no file name: {}", artifact.display()))?;
        let mut backup_name = std::ffi::OsString::from(BACKUP_PREFIX);
        backup_name.push(file_name);
        let backup = artifact.with_file_name(backup_name);
        Ok(Self { artifact, backup })
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    pub fn artifact_exists(&self) -> bool {
        self.artifact.is_file()
    }

    pub fn backup_exists(&self) -> bool {
        self.backup.is_file()
    }

    /// Delete a leftover backup. Returns whether a file was removed.
    #[instrument(skip_all, fields(backup = %self.backup.display()))]
    pub fn remove_backup(&self) -> Result<bool> {
        remove_if_exists(&self.backup)
    }

    /// Move the live artifact to the backup path.
    #[instrument(skip_all, fields(artifact = %self.artifact.display()))]
    pub fn stash_artifact(&self) -> Result<()> {
        fs::rename(&self.artifact, &self.backup).with_context(|| {
            format!(
                "move {} to {}",
                self.artifact.display(),
                self.backup.display()
            )
        })?;
        debug!(backup = %self.backup.display(), "artifact moved to backup");
        Ok(())
    }

    /// Replace the live artifact with the backup, consuming the backup.
    #[instrument(skip_all, fields(artifact = %self.artifact.display()))]
    pub fn restore_backup(&self) -> Result<()> {
        if !self.backup_exists() {
            return Err(anyhow!("missing backup {}", self.backup.display()));
        }
        remove_if_exists(&self.artifact)?;
        fs::rename(&self.backup, &self.artifact).with_context(|| {
            format!(
                "restore {} to {}",
                self.backup.display(),
                self.artifact.display()
            )
        })?;
        debug!("backup restored");
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed file");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_is_prefixed_file_name_in_same_directory() {
        let paths = ArtifactPaths::new("PolyBot.jar").expect("paths");
        assert_eq!(paths.backup(), Path::new("old.PolyBot.jar"));

        let paths = ArtifactPaths::new("/srv/bot/PolyBot.jar").expect("paths");
        assert_eq!(paths.backup(), Path::new("/srv/bot/old.PolyBot.jar"));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let err = ArtifactPaths::new("/").unwrap_err();
        assert!(err.to_string().contains("no file name"));
    }

    #[test]
    fn stash_then_restore_round_trips_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = ArtifactPaths::new(temp.path().join("bot.jar")).expect("paths");
        fs::write(paths.artifact(), b"v1").expect("write v1");

        paths.stash_artifact().expect("stash");
        assert!(!paths.artifact_exists());
        assert_eq!(fs::read(paths.backup()).expect("read backup"), b"v1");

        fs::write(paths.artifact(), b"v2").expect("write v2");
        paths.restore_backup().expect("restore");
        assert_eq!(fs::read(paths.artifact()).expect("read artifact"), b"v1");
        assert!(!paths.backup_exists());
    }

    #[test]
    fn restore_without_backup_fails_and_keeps_artifact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = ArtifactPaths::new(temp.path().join("bot.jar")).expect("paths");
        fs::write(paths.artifact(), b"live").expect("write");

        let err = paths.restore_backup().unwrap_err();
        assert!(err.to_string().contains("missing backup"));
        assert_eq!(fs::read(paths.artifact()).expect("read"), b"live");
    }

    #[test]
    fn remove_backup_reports_whether_anything_was_deleted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = ArtifactPaths::new(temp.path().join("bot.jar")).expect("paths");
        assert!(!paths.remove_backup().expect("remove missing"));

        fs::write(paths.backup(), b"stale").expect("write");
        assert!(paths.remove_backup().expect("remove stale"));
        assert!(!paths.backup_exists());
    }
}
