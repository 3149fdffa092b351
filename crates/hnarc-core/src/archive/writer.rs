//! Archive writer: compress, stamp content time, atomically rename into place.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::assemble::{AssembledBundle, Record};
use crate::partition::KeyKind;
use crate::storage::AtomicFile;

use super::timestamp::content_timestamp;
use super::{archive_name, ArchiveMode, SINGLE_EXT};

/// Write `unit` according to `mode`. Returns the paths created, in key order.
pub fn write_unit(
    dir: &Path,
    unit: &AssembledBundle,
    kind: KeyKind,
    mode: ArchiveMode,
    level: i32,
) -> Result<Vec<PathBuf>> {
    match mode {
        ArchiveMode::Bundled => Ok(vec![write_bundle(dir, unit, kind, level)?]),
        ArchiveMode::Single => unit
            .records
            .iter()
            .map(|r| write_single(dir, r, kind))
            .collect(),
    }
}

/// Compress `unit` into `{first}-{last}.zst` under `dir`.
///
/// The content timestamp is derived before anything touches the disk, so a
/// bundle with no usable timestamp leaves no file behind.
pub fn write_bundle(dir: &Path, unit: &AssembledBundle, kind: KeyKind, level: i32) -> Result<PathBuf> {
    let name = archive_name(&unit.bundle, ArchiveMode::Bundled);
    let ts = content_timestamp(unit.records.iter().map(|r| r.raw.as_slice()), kind, &name)?;

    let file = AtomicFile::create(&dir.join(&name))?;
    let mut encoder = zstd::Encoder::new(file, level)
        .with_context(|| format!("{}: zstd encoder", name))?;
    for record in &unit.records {
        encoder
            .write_all(&record.raw)
            .with_context(|| format!("{}: write record {}", name, record.key))?;
    }
    let mut file = encoder
        .finish()
        .with_context(|| format!("{}: finish zstd frame", name))?;
    file.set_times(ts)?;
    let path = file.finalize()?;
    tracing::debug!(archive = %name, records = unit.records.len(), ts, "archive written");
    Ok(path)
}

/// Write one record verbatim to `{key}.json` under `dir`.
pub fn write_single(dir: &Path, record: &Record, kind: KeyKind) -> Result<PathBuf> {
    let name = format!("{}.{}", record.key, SINGLE_EXT);
    let ts = content_timestamp([record.raw.as_slice()], kind, &name)?;

    let mut file = AtomicFile::create(&dir.join(&name))?;
    file.write_all(&record.raw)
        .with_context(|| format!("{}: write record", name))?;
    file.set_times(ts)?;
    file.finalize()
}
