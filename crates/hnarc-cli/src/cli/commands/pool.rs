//! Shared tail of `items` and `users`: run the tasks in child processes and
//! summarize.

use anyhow::{bail, Context, Result};
use hnarc_core::config::HnarcConfig;
use hnarc_core::pool::{run_pool, PoolPlan, WorkerTask};

pub async fn drive_pool(cfg: &HnarcConfig, tasks: Vec<WorkerTask>, concurrency: Option<usize>) -> Result<()> {
    let workers = concurrency.unwrap_or_else(|| cfg.worker_count()).max(1);
    let program = std::env::current_exe().context("locate the hnarc executable")?;
    let total = tasks.len();
    println!("{} chunk(s), {} worker(s)", total, workers.min(total.max(1)));

    let report = run_pool(PoolPlan {
        program,
        args: vec!["worker".to_string()],
        tasks,
        workers,
    })
    .await?;

    println!("{} of {} chunk(s) complete", report.completed, total);
    if !report.is_success() {
        for failed in &report.failed {
            eprintln!(
                "  chunk {} ({}): {}",
                failed.chunk.index, failed.chunk.keys, failed.reason
            );
        }
        bail!(
            "{} chunk(s) failed; re-run the same command to fetch what is missing",
            report.failed.len()
        );
    }
    Ok(())
}
