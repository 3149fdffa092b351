//! What a worker process is told to do, and how it does it.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

use crate::archive::ArchiveMode;
use crate::config::HnarcConfig;
use crate::fetch::{Endpoints, HttpSource};
use crate::partition::{
    load_usernames, partition_chunks, ChunkKeys, FetchKey, KeyKind, KeySpace, WorkerChunk,
};
use crate::pipeline::{run_chunk, ChunkOptions, ChunkReport};

/// Environment variable carrying a JSON [`WorkerTask`] to a child process.
pub const WORKER_TASK_ENV: &str = "HNARC_WORKER_TASK";

/// One chunk of work, self-contained so a child process needs nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerTask {
    pub kind: KeyKind,
    pub mode: ArchiveMode,
    pub chunk: WorkerChunk,
    /// Username list the chunk's slice indexes into (users runs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    /// Working directory (`<out>/items` or `<out>/users`).
    pub dir: PathBuf,
    pub config: HnarcConfig,
}

impl WorkerTask {
    pub fn to_env(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Read the task handed to this process.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(WORKER_TASK_ENV)
            .with_context(|| format!("{} not set; `worker` is started by the pool", WORKER_TASK_ENV))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", WORKER_TASK_ENV))
    }

    /// The keys this task covers, in order.
    pub fn keys(&self) -> Result<Vec<FetchKey>> {
        let space = match (&self.chunk.keys, &self.key_file) {
            (ChunkKeys::Range { first, last }, _) => KeySpace::Range {
                first: *first,
                last: *last,
            },
            (ChunkKeys::ListSlice { .. }, Some(path)) => KeySpace::List(load_usernames(path)?),
            (ChunkKeys::ListSlice { .. }, None) => {
                anyhow::bail!("chunk {} has no key file", self.chunk.keys)
            }
        };
        space.keys_for(&self.chunk.keys)
    }
}

/// Split a run into one task per chunk.
pub fn plan_tasks(
    space: &KeySpace,
    kind: KeyKind,
    mode: ArchiveMode,
    key_file: Option<PathBuf>,
    dir: PathBuf,
    config: &HnarcConfig,
) -> Result<Vec<WorkerTask>> {
    if mode == ArchiveMode::Bundled {
        check_bundle_alignment(space, config)?;
    }
    Ok(partition_chunks(space, config.chunk_size)?
        .into_iter()
        .map(|chunk| WorkerTask {
            kind,
            mode,
            chunk,
            key_file: key_file.clone(),
            dir: dir.clone(),
            config: config.clone(),
        })
        .collect())
}

/// Archive names are the key ranges of bundles, and bundles start at chunk
/// starts. Every chunk must therefore begin on a multiple of `bundle_size`,
/// or a run with another `--first` or `chunk_size` would name the same keys
/// differently and fetch them again.
fn check_bundle_alignment(space: &KeySpace, config: &HnarcConfig) -> Result<()> {
    let bundle_size = config.bundle_size.max(1);
    ensure!(
        config.chunk_size % bundle_size == 0,
        "chunk_size ({}) must be a multiple of bundle_size ({})",
        config.chunk_size,
        bundle_size
    );
    if let KeySpace::Range { first, .. } = space {
        ensure!(
            first % bundle_size as u64 == 0,
            "first id {} is not a multiple of bundle_size ({}); try {}",
            first,
            bundle_size,
            first - first % bundle_size as u64
        );
    }
    Ok(())
}

/// Run one task to completion in this process. Blocking.
pub fn run_worker_task(task: &WorkerTask) -> Result<ChunkReport> {
    let start = Instant::now();
    let keys = task.keys()?;
    tracing::info!(chunk = task.chunk.index, keys = %task.chunk.keys, "worker started");

    let endpoints = Endpoints::new(&task.config.api_base)?;
    let mut source = HttpSource::new(endpoints, task.kind, task.config.http_options());
    let opts = ChunkOptions::from_config(&task.config, task.kind, task.mode);
    let report = run_chunk(&mut source, keys, &task.dir, &opts)
        .with_context(|| format!("chunk {} ({})", task.chunk.index, task.chunk.keys))?;

    tracing::info!(
        chunk = task.chunk.index,
        written = report.written,
        skipped = report.skipped,
        requests = report.fetch.requests,
        peak_in_flight = report.fetch.peak_in_flight,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "worker finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_survives_env_encoding() {
        let cfg = HnarcConfig::default();
        let tasks = plan_tasks(
            &KeySpace::Range { first: 0, last: 44_999 },
            KeyKind::Items,
            ArchiveMode::Bundled,
            None,
            PathBuf::from("/out/items"),
            &cfg,
        )
        .unwrap();
        assert_eq!(tasks.len(), 3);
        let json = tasks[2].to_env().unwrap();
        let back: WorkerTask = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk, tasks[2].chunk);
        assert_eq!(back.chunk.keys, ChunkKeys::Range { first: 40_000, last: 44_999 });
        assert_eq!(back.keys().unwrap().len(), 5_000);
    }

    #[test]
    fn unaligned_first_id_is_rejected() {
        let cfg = HnarcConfig::default();
        let plan = |first| {
            plan_tasks(
                &KeySpace::Range { first, last: 999 },
                KeyKind::Items,
                ArchiveMode::Bundled,
                None,
                PathBuf::from("/out/items"),
                &cfg,
            )
        };
        let err = plan(50).unwrap_err().to_string();
        assert!(err.contains("try 0"), "{}", err);
        assert_eq!(plan(100).unwrap().len(), 1);
    }

    #[test]
    fn unaligned_chunk_size_is_rejected() {
        let mut cfg = HnarcConfig::default();
        cfg.chunk_size = 150;
        let res = plan_tasks(
            &KeySpace::Range { first: 0, last: 299 },
            KeyKind::Items,
            ArchiveMode::Bundled,
            None,
            PathBuf::from("/out/items"),
            &cfg,
        );
        assert!(res.is_err());
    }

    #[test]
    fn list_task_reads_its_slice() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("users.txt");
        std::fs::write(&list, "a\nb\nc\nd\ne\n").unwrap();
        let mut cfg = HnarcConfig::default();
        cfg.chunk_size = 2;
        let names = load_usernames(&list).unwrap();
        let tasks = plan_tasks(
            &KeySpace::List(names),
            KeyKind::Users,
            ArchiveMode::Single,
            Some(list),
            dir.path().join("users"),
            &cfg,
        )
        .unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(
            tasks[1].keys().unwrap(),
            vec![FetchKey::Name("c".into()), FetchKey::Name("d".into())]
        );
        assert_eq!(tasks[2].keys().unwrap(), vec![FetchKey::Name("e".into())]);
    }

    #[test]
    fn repeated_names_land_in_one_chunk_only() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("users.txt");
        std::fs::write(&list, "a\nb\na\nc\nb\nd\n").unwrap();
        let mut cfg = HnarcConfig::default();
        cfg.chunk_size = 2;
        let names = load_usernames(&list).unwrap();
        let tasks = plan_tasks(
            &KeySpace::List(names),
            KeyKind::Users,
            ArchiveMode::Single,
            Some(list),
            dir.path().join("users"),
            &cfg,
        )
        .unwrap();
        assert_eq!(tasks.len(), 2);
        // Each task re-reads the file, as a worker process would.
        let all: Vec<FetchKey> = tasks
            .iter()
            .flat_map(|t| {
                let sent: WorkerTask = serde_json::from_str(&t.to_env().unwrap()).unwrap();
                sent.keys().unwrap()
            })
            .collect();
        let expected: Vec<FetchKey> =
            ["a", "b", "c", "d"].iter().map(|n| FetchKey::Name(n.to_string())).collect();
        assert_eq!(all, expected);
    }
}
