//! One attempt at one bundle group: gate, fetch, assemble, write.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::archive::{archive_name, write_unit, ArchiveError};
use crate::assemble::assemble_group;
use crate::fetch::RecordSource;
use crate::gate::pending_bundles;
use crate::partition::{BundleGroup, FetchKey};
use crate::retry::FetchError;

use super::{ChunkError, ChunkOptions};

/// What one successful attempt did.
#[derive(Debug, Default)]
pub(super) struct GroupOutcome {
    pub skipped: usize,
    pub empty: usize,
    pub written: Vec<PathBuf>,
    pub records: usize,
}

/// Why an attempt failed. Only `Fetch` is worth retrying.
#[derive(Debug)]
pub(super) enum AttemptError {
    Fetch(FetchError),
    Fatal(ChunkError),
}

pub(super) fn run_group_once<S: RecordSource + ?Sized>(
    source: &mut S,
    group: &BundleGroup,
    dir: &Path,
    opts: &ChunkOptions,
) -> Result<GroupOutcome, AttemptError> {
    let start = Instant::now();
    let pending: Vec<_> = pending_bundles(dir, &group.bundles, opts.mode)
        .into_iter()
        .cloned()
        .collect();
    let mut outcome = GroupOutcome {
        skipped: group.bundles.len() - pending.len(),
        ..Default::default()
    };
    if pending.is_empty() {
        tracing::debug!(group = %group.range_label(), "group already archived");
        return Ok(outcome);
    }

    let todo = BundleGroup {
        seq: group.seq,
        bundles: pending,
    };
    let keys: Vec<FetchKey> = todo.keys().cloned().collect();
    let results = source.fetch_group(&keys).map_err(AttemptError::Fetch)?;
    let assembled = assemble_group(&todo, results)
        .map_err(|e| AttemptError::Fatal(ChunkError::Fatal(e)))?;

    outcome.empty = assembled.empty.len();
    for unit in &assembled.units {
        let paths = write_unit(dir, unit, opts.kind, opts.mode, opts.compression_level).map_err(|e| {
            AttemptError::Fatal(match e.downcast::<ArchiveError>() {
                Ok(archive) => ChunkError::Malformed(archive),
                Err(cause) => ChunkError::Write {
                    archive: archive_name(&unit.bundle, opts.mode),
                    cause,
                },
            })
        })?;
        outcome.records += unit.record_count();
        outcome.written.extend(paths);
    }
    tracing::debug!(
        group = %todo.range_label(),
        keys = keys.len(),
        archives = outcome.written.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "group done"
    );
    Ok(outcome)
}
