//! Re-apply content timestamps to archives that already exist, e.g. after a
//! copy that reset their mtimes.

use anyhow::{Context, Result};
use std::fs::{File, FileTimes};
use std::path::{Path, PathBuf};

use crate::layout::LAYOUT_FILE;
use crate::partition::KeyKind;
use crate::storage::{unix_time, TEMP_SUFFIX};

use super::reader::read_archive;
use super::timestamp::record_timestamp;
use super::{ArchiveError, BUNDLE_EXT, SINGLE_EXT};

/// Outcome of a retime pass.
#[derive(Debug, Default)]
pub struct RetimeReport {
    pub updated: usize,
    /// Archives that could not be read or carry no timestamp.
    pub failed: Vec<(PathBuf, String)>,
}

/// Archive files in `dir` (bundles and single records; no temp files, no
/// layout marker), ordered by first numeric key, then by name.
pub fn list_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == LAYOUT_FILE || name.ends_with(TEMP_SUFFIX) {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str());
        if ext == Some(BUNDLE_EXT) || ext == Some(SINGLE_EXT) {
            out.push(path);
        }
    }
    out.sort_by_cached_key(|p| {
        let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        let first: Option<u64> = name
            .split(|c: char| c == '-' || c == '.')
            .next()
            .and_then(|s| s.parse().ok());
        (first.is_none(), first, name)
    });
    Ok(out)
}

/// Newest content timestamp of an archive on disk.
fn archive_timestamp(path: &Path, kind: KeyKind) -> Result<u64> {
    let records = read_archive(path)?;
    records
        .iter()
        .filter_map(|r| record_timestamp(r, kind))
        .max()
        .ok_or_else(|| {
            ArchiveError::NoTimestamp {
                archive: path.display().to_string(),
                field: kind.timestamp_field(),
            }
            .into()
        })
}

/// Set every archive's mtime and atime in `dir` to its content timestamp.
/// Archive bytes are never rewritten.
pub fn retime_dir(dir: &Path, kind: KeyKind) -> Result<RetimeReport> {
    let mut report = RetimeReport::default();
    for path in list_archives(dir)? {
        let res = archive_timestamp(&path, kind).and_then(|ts| {
            let t = unix_time(ts);
            File::options()
                .write(true)
                .open(&path)?
                .set_times(FileTimes::new().set_accessed(t).set_modified(t))?;
            Ok(())
        });
        match res {
            Ok(()) => report.updated += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), "retime failed: {:#}", e);
                report.failed.push((path, format!("{:#}", e)));
            }
        }
    }
    Ok(report)
}
