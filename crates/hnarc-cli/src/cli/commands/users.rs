//! `hnarc users` – archive the profiles named in a username list.

use anyhow::{bail, Context, Result};
use hnarc_core::archive::ArchiveMode;
use hnarc_core::config::HnarcConfig;
use hnarc_core::layout::{ensure_layout, Layout};
use hnarc_core::partition::{load_usernames, KeyKind, KeySpace};
use hnarc_core::pool::plan_tasks;
use std::path::Path;

use super::pool::drive_pool;

pub async fn run_users(
    cfg: &HnarcConfig,
    file: &Path,
    concurrency: Option<usize>,
    out: &Path,
    bundle: bool,
) -> Result<()> {
    let names = load_usernames(file)?;
    if names.is_empty() {
        bail!("{} lists no usernames", file.display());
    }
    // Workers re-read the list from this path.
    let file = file
        .canonicalize()
        .with_context(|| format!("resolve {}", file.display()))?;

    let mode = if bundle || cfg.bundle_users {
        ArchiveMode::Bundled
    } else {
        ArchiveMode::Single
    };
    let dir = out.join(KeyKind::Users.dir_name());
    ensure_layout(&dir, &Layout::new(cfg.bundle_size, mode))?;
    let dir = dir
        .canonicalize()
        .with_context(|| format!("resolve {}", dir.display()))?;

    println!("{} user(s) -> {}", names.len(), dir.display());
    let tasks = plan_tasks(
        &KeySpace::List(names),
        KeyKind::Users,
        mode,
        Some(file),
        dir,
        cfg,
    )?;
    drive_pool(cfg, tasks, concurrency).await
}
