//! File lifecycle for archives: write to `<name>.part`, fsync, stamp times,
//! then atomically rename into place. A canonical path therefore only ever
//! holds a complete file.

use anyhow::{Context, Result};
use std::fs::{File, FileTimes};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `0-99.zst` → `0-99.zst.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Convert unix seconds into a `SystemTime`.
pub fn unix_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// A file being written under its temp name. Dropped without `finalize`, the
/// temp file is removed.
pub struct AtomicFile {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl AtomicFile {
    /// Create (or truncate a stale) temp file for `final_path`.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(Self {
            file: Some(file),
            temp_path,
            final_path: final_path.to_path_buf(),
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "atomic file already closed"))
    }

    /// Set access and modification time (unix seconds) on the temp file; the
    /// rename in `finalize` carries them over.
    pub fn set_times(&mut self, secs: u64) -> Result<()> {
        let t = unix_time(secs);
        let times = FileTimes::new().set_accessed(t).set_modified(t);
        self.file()?
            .set_times(times)
            .with_context(|| format!("failed to set times on {}", self.temp_path.display()))
    }

    /// Sync, close and rename to the final path. Fails if the final path is
    /// on a different filesystem.
    pub fn finalize(mut self) -> Result<PathBuf> {
        let file = self
            .file
            .take()
            .ok_or_else(|| anyhow::anyhow!("atomic file already closed"))?;
        file.sync_all().context("storage sync failed")?;
        drop(file);
        std::fs::rename(&self.temp_path, &self.final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                self.temp_path.display(),
                self.final_path.display()
            )
        })?;
        // Renamed: nothing left for Drop to clean up.
        self.temp_path.clear();
        Ok(std::mem::take(&mut self.final_path))
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.temp_path.as_os_str().is_empty() {
            return;
        }
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.temp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.temp_path.display(), "could not remove temp file: {}", e);
            }
        }
    }
}
