//! Process pool: one child process per chunk, a bounded number at a time.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use crate::partition::WorkerChunk;

use super::task::{WorkerTask, WORKER_TASK_ENV};

/// How to launch workers.
#[derive(Debug, Clone)]
pub struct PoolPlan {
    /// Executable that understands the `worker` subcommand.
    pub program: PathBuf,
    /// Arguments placed before the task (normally just `worker`).
    pub args: Vec<String>,
    pub tasks: Vec<WorkerTask>,
    /// Children running at once.
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChunk {
    pub chunk: WorkerChunk,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct PoolReport {
    pub completed: usize,
    pub failed: Vec<FailedChunk>,
}

impl PoolReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Start one child per task, at most `plan.workers` at a time, and wait for
/// all of them. A failing child only fails its own chunk.
pub async fn run_pool(plan: PoolPlan) -> Result<PoolReport> {
    let start = Instant::now();
    let max_concurrent = plan.workers.max(1);
    let total = plan.tasks.len();
    let mut queue = plan.tasks.into_iter();
    let mut join_set = tokio::task::JoinSet::new();
    let mut report = PoolReport::default();

    loop {
        while join_set.len() < max_concurrent {
            let Some(task) = queue.next() else {
                break;
            };
            let env = task.to_env()?;
            let mut cmd = tokio::process::Command::new(&plan.program);
            cmd.args(&plan.args)
                .env(WORKER_TASK_ENV, env)
                .stdin(Stdio::null())
                .kill_on_drop(true);
            tracing::debug!(chunk = task.chunk.index, keys = %task.chunk.keys, "spawning worker");
            let chunk = task.chunk;
            join_set.spawn(async move {
                let res = match cmd.status().await {
                    Ok(status) if status.success() => Ok(()),
                    Ok(status) => Err(format!("worker exited with {}", status)),
                    Err(e) => Err(format!("spawn failed: {}", e)),
                };
                (chunk, res)
            });
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (chunk, res) = joined.context("worker task join")?;
        match res {
            Ok(()) => {
                report.completed += 1;
                tracing::info!(
                    chunk = chunk.index,
                    keys = %chunk.keys,
                    done = report.completed + report.failed.len(),
                    total,
                    "chunk complete"
                );
            }
            Err(reason) => {
                tracing::error!(chunk = chunk.index, keys = %chunk.keys, "chunk failed: {}", reason);
                report.failed.push(FailedChunk { chunk, reason });
            }
        }
    }

    report.failed.sort_by_key(|f| f.chunk.index);
    tracing::info!(
        completed = report.completed,
        failed = report.failed.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "pool finished"
    );
    Ok(report)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::archive::ArchiveMode;
    use crate::config::HnarcConfig;
    use crate::partition::{KeyKind, KeySpace};
    use crate::pool::plan_tasks;

    fn plan(script: &str, workers: usize) -> PoolPlan {
        let mut cfg = HnarcConfig::default();
        cfg.bundle_size = 10;
        cfg.chunk_size = 10;
        let tasks = plan_tasks(
            &KeySpace::Range { first: 0, last: 39 },
            KeyKind::Items,
            ArchiveMode::Bundled,
            None,
            PathBuf::from("/nonexistent"),
            &cfg,
        )
        .unwrap();
        PoolPlan {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), script.into()],
            tasks,
            workers,
        }
    }

    #[tokio::test]
    async fn all_chunks_complete() {
        let report = run_pool(plan("test -n \"$HNARC_WORKER_TASK\"", 2)).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.completed, 4);
    }

    #[tokio::test]
    async fn failed_chunk_does_not_stop_the_rest() {
        let script = r#"case "$HNARC_WORKER_TASK" in *'"index":2'*) exit 3;; esac"#;
        let report = run_pool(plan(script, 3)).await.unwrap();
        assert_eq!(report.completed, 3);
        assert_eq!(report.failed.len(), 1);
        let failed = &report.failed[0];
        assert_eq!(failed.chunk.index, 2);
        assert_eq!(failed.chunk.keys.to_string(), "ids 20-29");
        assert!(failed.reason.contains("exit"), "{}", failed.reason);
    }
}
