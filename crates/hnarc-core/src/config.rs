use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch::HttpOptions;
use crate::retry::RetryPolicy;

/// Default public API root; item and user URLs are joined onto it.
pub const DEFAULT_API_BASE: &str = "https://hacker-news.firebaseio.com/v0/";

/// Retry policy parameters (optional `[retry]` / `[group_retry]` sections in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

/// Global configuration loaded from `~/.config/hnarc/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HnarcConfig {
    /// Root URL of the JSON API (must end with `/`).
    pub api_base: String,
    /// Maximum requests in flight per worker process.
    pub max_in_flight: usize,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Records per bundle archive. Changing it renames every archive; see `layout`.
    pub bundle_size: usize,
    /// Bundles fetched and flushed together.
    pub bundles_per_group: usize,
    /// Keys handed to one worker process.
    pub chunk_size: usize,
    /// zstd compression level for bundle archives.
    pub compression_level: i32,
    /// Worker processes running at once (None = detected core count).
    pub workers: Option<usize>,
    /// Bundle user profiles like items instead of one `.json` per user.
    pub bundle_users: bool,
    /// Per-request retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
    /// Bundle-group retry policy; if missing, built-in defaults are used.
    pub group_retry: Option<RetryConfig>,
}

impl Default for HnarcConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            max_in_flight: 25,
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
            bundle_size: 100,
            bundles_per_group: 10,
            chunk_size: 20_000,
            compression_level: 19,
            workers: None,
            bundle_users: false,
            retry: None,
            group_retry: None,
        }
    }
}

impl HnarcConfig {
    pub fn request_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from_config)
            .unwrap_or_default()
    }

    pub fn group_policy(&self) -> RetryPolicy {
        self.group_retry
            .as_ref()
            .map(RetryPolicy::from_config)
            .unwrap_or_else(RetryPolicy::group_default)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Transfer settings for [`crate::fetch::HttpSource`].
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            max_in_flight: self.max_in_flight,
            request_timeout: self.request_timeout(),
            connect_timeout: self.connect_timeout(),
            retry: self.request_policy(),
        }
    }

    /// Worker process count: configured value, else detected cores (at least 1).
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    /// Reject values that would make partitioning or fetching meaningless.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.bundle_size > 0, "bundle_size must be > 0");
        ensure!(self.bundles_per_group > 0, "bundles_per_group must be > 0");
        ensure!(self.chunk_size > 0, "chunk_size must be > 0");
        // Chunk edges must fall on bundle edges or archive names shift.
        ensure!(
            self.chunk_size % self.bundle_size == 0,
            "chunk_size ({}) must be a multiple of bundle_size ({})",
            self.chunk_size,
            self.bundle_size
        );
        ensure!(self.max_in_flight > 0, "max_in_flight must be > 0");
        ensure!(
            self.api_base.ends_with('/'),
            "api_base must end with '/': {}",
            self.api_base
        );
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hnarc")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HnarcConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HnarcConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load and validate configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<HnarcConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: HnarcConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}
