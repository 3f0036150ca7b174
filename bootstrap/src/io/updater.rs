//! Artifact updater abstraction and shared download plumbing.

use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::progress::ProgressThrottle;

const COPY_CHUNK_BYTES: usize = 64 * 1024;

/// Fetches the latest worker artifact.
pub trait ArtifactUpdater {
    /// Write the latest artifact to `destination`.
    ///
    /// On error `destination` must not contain a partially written file.
    fn update(&self, destination: &Path) -> Result<()>;
}

/// Copy `reader` to `writer`, calling `on_progress(bytes_read, total)` whenever
/// the throttle allows and once more after the last byte. Returns bytes copied.
pub fn copy_with_progress<R, W, F>(
    mut reader: R,
    mut writer: W,
    total: Option<u64>,
    throttle: &mut ProgressThrottle,
    mut on_progress: F,
) -> Result<u64>
where
    R: Read,
    W: Write,
    F: FnMut(u64, Option<u64>),
{
    let mut chunk = vec![0u8; COPY_CHUNK_BYTES];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("read download body"),
        };
        writer
            .write_all(&chunk[..n])
            .context("write download chunk")?;
        copied += n as u64;
        if throttle.ready(Instant::now()) {
            on_progress(copied, total);
        }
    }
    writer.flush().context("flush download")?;
    on_progress(copied, total);
    Ok(copied)
}

/// Stream `reader` into a temp file next to `destination`, then rename it over
/// `destination`. The temp file is removed if anything fails.
pub fn write_atomically<R, F>(
    reader: R,
    destination: &Path,
    total: Option<u64>,
    throttle: &mut ProgressThrottle,
    on_progress: F,
) -> Result<u64>
where
    R: Read,
    F: FnMut(u64, Option<u64>),
{
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create directory {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    let copied = copy_with_progress(reader, tmp.as_file_mut(), total, throttle, on_progress)?;

    if let Some(expected) = total
        && copied != expected
    {
        return Err(anyhow!(
            "download truncated: got {copied} of {expected} bytes"
        ));
    }

    tmp.as_file()
        .sync_all()
        .context("sync downloaded artifact")?;
    tmp.persist(destination)
        .map_err(|e| e.error)
        .with_context(|| format!("move download to {}", destination.display()))?;
    debug!(path = %destination.display(), bytes = copied, "artifact written");
    Ok(copied)
}
