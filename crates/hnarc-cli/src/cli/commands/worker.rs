//! Hidden `hnarc worker` – child-process side of the pool.

use anyhow::{Context, Result};
use hnarc_core::pool::{run_worker_task, WorkerTask};

pub async fn run_worker() -> Result<()> {
    let task = WorkerTask::from_env()?;
    // curl and the group backoff both block.
    tokio::task::spawn_blocking(move || run_worker_task(&task))
        .await
        .context("worker thread")??;
    Ok(())
}
