//! CLI for the hnarc API archiver.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hnarc_core::config::{self, HnarcConfig};
use hnarc_core::partition::KeyKind;
use std::path::PathBuf;

use commands::{run_items, run_retime, run_users, run_verify, run_worker};

/// Top-level CLI for hnarc.
#[derive(Debug, Parser)]
#[command(name = "hnarc")]
#[command(about = "hnarc: bulk archiver for a read-only JSON record API", long_about = None)]
pub struct Cli {
    /// API root URL (overrides `api_base` in config.toml).
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Archive items by id range into <OUT>/items.
    Items {
        /// First item id (inclusive).
        #[arg(long, default_value_t = 0, value_name = "N")]
        first: u64,
        /// Last item id (inclusive). Defaults to the API's current max item.
        #[arg(long, value_name = "N")]
        last: Option<u64>,
        /// Worker processes at once (default: config `workers`, else core count).
        #[arg(short = 'c', long, value_name = "W")]
        concurrency: Option<usize>,
        /// Output root; archives go to <OUT>/items.
        #[arg(long, default_value = ".", value_name = "DIR")]
        out: PathBuf,
    },

    /// Archive user profiles listed in a file (one username per line) into <OUT>/users.
    Users {
        /// Username list.
        file: PathBuf,
        /// Worker processes at once.
        #[arg(short = 'c', long, value_name = "W")]
        concurrency: Option<usize>,
        /// Output root; archives go to <OUT>/users.
        #[arg(long, default_value = ".", value_name = "DIR")]
        out: PathBuf,
        /// Bundle profiles into compressed archives instead of one .json per user.
        #[arg(long)]
        bundle: bool,
    },

    /// Re-apply content timestamps to every archive in a directory.
    Retime {
        dir: PathBuf,
        /// Record kind stored in the directory (items or users).
        #[arg(long)]
        kind: KeyKind,
    },

    /// Decode every archive in a directory and report damaged ones.
    Verify {
        dir: PathBuf,
        /// Record kind stored in the directory (items or users).
        #[arg(long)]
        kind: KeyKind,
    },

    /// Run one chunk (started by the pool; task comes from the environment).
    #[command(hide = true)]
    Worker,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let api_base = cli.api_base.as_deref();

        match cli.command {
            CliCommand::Items {
                first,
                last,
                concurrency,
                out,
            } => {
                let cfg = load_config(api_base)?;
                run_items(&cfg, first, last, concurrency, &out).await?;
            }
            CliCommand::Users {
                file,
                concurrency,
                out,
                bundle,
            } => {
                let cfg = load_config(api_base)?;
                run_users(&cfg, &file, concurrency, &out, bundle).await?;
            }
            CliCommand::Retime { dir, kind } => run_retime(dir, kind).await?,
            CliCommand::Verify { dir, kind } => run_verify(dir, kind).await?,
            // Workers get their configuration inside the task.
            CliCommand::Worker => run_worker().await?,
        }

        Ok(())
    }
}

/// Config file plus command-line overrides, validated.
fn load_config(api_base: Option<&str>) -> Result<HnarcConfig> {
    let mut cfg = config::load_or_init()?;
    if let Some(base) = api_base {
        cfg.api_base = with_trailing_slash(base);
    }
    cfg.validate()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

#[cfg(test)]
mod tests;
