//! `hnarc retime` and `hnarc verify` – maintenance of an existing directory.

use anyhow::{bail, Context, Result};
use hnarc_core::archive::{retime_dir, verify_dir};
use hnarc_core::partition::KeyKind;
use std::path::PathBuf;

pub async fn run_retime(dir: PathBuf, kind: KeyKind) -> Result<()> {
    let report = tokio::task::spawn_blocking(move || retime_dir(&dir, kind))
        .await
        .context("retime thread")??;
    println!("{} archive(s) retimed", report.updated);
    if !report.failed.is_empty() {
        for (path, reason) in &report.failed {
            eprintln!("  {}: {}", path.display(), reason);
        }
        bail!("{} archive(s) could not be retimed", report.failed.len());
    }
    Ok(())
}

pub async fn run_verify(dir: PathBuf, kind: KeyKind) -> Result<()> {
    let report = tokio::task::spawn_blocking(move || verify_dir(&dir, kind))
        .await
        .context("verify thread")??;
    println!(
        "{} archive(s), {} record(s) checked",
        report.checked, report.records
    );
    if !report.is_clean() {
        for issue in &report.issues {
            eprintln!("  {}: {}", issue.path.display(), issue.problem);
        }
        bail!(
            "{} problem(s) found; delete damaged archives and re-run to fetch them again",
            report.issues.len()
        );
    }
    Ok(())
}
