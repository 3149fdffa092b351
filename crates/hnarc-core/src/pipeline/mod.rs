//! Per-chunk pipeline: split a worker's keys into bundles and groups, then
//! process groups strictly in key order. A group whose fetch fails is
//! discarded whole and re-driven from the gate under the group retry policy.

mod error;
mod group;

pub use error::ChunkError;

use std::path::Path;
use std::time::Instant;

use crate::archive::{archive_name, ArchiveMode};
use crate::config::HnarcConfig;
use crate::fetch::{FetchStats, RecordSource};
use crate::partition::{group_bundles, split_bundles, FetchKey, KeyKind};
use crate::retry::{run_with_retry, ErrorKind, RetryPolicy};

use group::{run_group_once, AttemptError};

/// Settings for one chunk run.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    pub kind: KeyKind,
    pub mode: ArchiveMode,
    pub bundle_size: usize,
    pub bundles_per_group: usize,
    pub compression_level: i32,
    pub group_retry: RetryPolicy,
}

impl ChunkOptions {
    pub fn from_config(cfg: &HnarcConfig, kind: KeyKind, mode: ArchiveMode) -> Self {
        Self {
            kind,
            mode,
            bundle_size: cfg.bundle_size,
            bundles_per_group: cfg.bundles_per_group,
            compression_level: cfg.compression_level,
            group_retry: cfg.group_policy(),
        }
    }

    /// Keys per bundle and bundles per group actually used. In single mode
    /// every key is its own bundle and a group keeps the same key count.
    fn shape(&self) -> (usize, usize) {
        let bundle_size = self.bundle_size.max(1);
        let per_group = self.bundles_per_group.max(1);
        match self.mode {
            ArchiveMode::Bundled => (bundle_size, per_group),
            ArchiveMode::Single => (1, bundle_size.saturating_mul(per_group)),
        }
    }
}

/// Counters for one chunk.
#[derive(Debug, Default, Clone)]
pub struct ChunkReport {
    /// Bundles skipped because their archive already existed.
    pub skipped: usize,
    /// Archive files written.
    pub written: usize,
    /// Bundles with no content at all (nothing written).
    pub empty: usize,
    pub records: usize,
    /// Group attempts beyond the first.
    pub group_retries: u32,
    pub fetch: FetchStats,
}

/// Fetch and archive `keys` into `dir`.
pub fn run_chunk<S: RecordSource + ?Sized>(
    source: &mut S,
    keys: Vec<FetchKey>,
    dir: &Path,
    opts: &ChunkOptions,
) -> Result<ChunkReport, ChunkError> {
    let start = Instant::now();
    let (bundle_size, per_group) = opts.shape();
    let groups = group_bundles(split_bundles(keys, bundle_size), per_group);
    let mut report = ChunkReport::default();

    for group in &groups {
        let mut attempts = 0u32;
        let res = run_with_retry(
            &opts.group_retry,
            |attempt| {
                attempts = attempt;
                let res = run_group_once(&mut *source, group, dir, opts);
                if let Err(AttemptError::Fetch(e)) = &res {
                    tracing::warn!(
                        group = %group.range_label(),
                        attempt,
                        "group cancelled, results discarded: {}",
                        e
                    );
                }
                res
            },
            |e| match e {
                AttemptError::Fetch(_) => ErrorKind::Batch,
                AttemptError::Fatal(_) => ErrorKind::Other,
            },
        );
        report.group_retries += attempts.saturating_sub(1);
        match res {
            Ok(done) => {
                report.skipped += done.skipped;
                report.empty += done.empty;
                report.written += done.written.len();
                report.records += done.records;
            }
            Err(AttemptError::Fetch(source_err)) => {
                return Err(ChunkError::GroupExhausted {
                    range: group.range_label(),
                    attempts,
                    archives: group
                        .bundles
                        .iter()
                        .map(|b| archive_name(b, opts.mode))
                        .collect(),
                    source: source_err,
                });
            }
            Err(AttemptError::Fatal(e)) => return Err(e),
        }
    }

    report.fetch = source.stats();
    tracing::info!(
        kind = %opts.kind,
        groups = groups.len(),
        written = report.written,
        skipped = report.skipped,
        empty = report.empty,
        records = report.records,
        requests = report.fetch.requests,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "chunk done"
    );
    Ok(report)
}
