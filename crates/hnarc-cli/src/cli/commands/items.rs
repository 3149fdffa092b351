//! `hnarc items` – archive an item id range.

use anyhow::{ensure, Context, Result};
use hnarc_core::archive::ArchiveMode;
use hnarc_core::config::HnarcConfig;
use hnarc_core::fetch::{fetch_max_item, Endpoints};
use hnarc_core::layout::{ensure_layout, Layout};
use hnarc_core::partition::{KeyKind, KeySpace};
use hnarc_core::pool::plan_tasks;
use std::path::Path;

use super::pool::drive_pool;

pub async fn run_items(
    cfg: &HnarcConfig,
    first: u64,
    last: Option<u64>,
    concurrency: Option<usize>,
    out: &Path,
) -> Result<()> {
    let last = match last {
        Some(last) => last,
        None => {
            let endpoints = Endpoints::new(&cfg.api_base)?;
            let timeout = cfg.request_timeout();
            let policy = cfg.request_policy();
            let max = tokio::task::spawn_blocking(move || fetch_max_item(&endpoints, timeout, &policy))
                .await
                .context("max item lookup")??;
            tracing::info!(max_item = max, "highest item id");
            max
        }
    };
    ensure!(first <= last, "--first {} is above --last {}", first, last);

    let dir = out.join(KeyKind::Items.dir_name());
    ensure_layout(&dir, &Layout::new(cfg.bundle_size, ArchiveMode::Bundled))?;
    let dir = dir
        .canonicalize()
        .with_context(|| format!("resolve {}", dir.display()))?;

    println!("items {}-{} -> {}", first, last, dir.display());
    let tasks = plan_tasks(
        &KeySpace::Range { first, last },
        KeyKind::Items,
        ArchiveMode::Bundled,
        None,
        dir,
        cfg,
    )?;
    drive_pool(cfg, tasks, concurrency).await
}
