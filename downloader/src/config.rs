/// Downloader configuration, read from the environment (and `.env`).
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use modelfetch_shared::models::DEFAULT_HUB_URL;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Body read size.
pub const CHUNK_SIZE: usize = 64 * 1024;
/// Checksum read size.
pub const HASH_BUFFER_SIZE: usize = 8 * 1024;
/// Minimum gap between throttled progress reports.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Suffix marking an in-progress download next to its final path.
pub const PARTIAL_SUFFIX: &str = ".download";

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Base URL serving `<repo>/resolve/main/<file>`.
    pub hub_url: String,
    pub user_agent: String,
    /// Bound on HEAD requests (size and range probes).
    pub metadata_timeout: Duration,
    /// Bound on establishing the GET connection. The transfer itself is unbounded.
    pub connect_timeout: Duration,
    pub progress_interval: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            metadata_timeout: Duration::from_secs(DEFAULT_METADATA_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl DownloaderConfig {
    /// Read `MODELFETCH_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hub_url: std::env::var("MODELFETCH_HUB_URL").unwrap_or(defaults.hub_url),
            user_agent: std::env::var("MODELFETCH_USER_AGENT").unwrap_or(defaults.user_agent),
            metadata_timeout: Duration::from_secs(env_secs(
                "MODELFETCH_METADATA_TIMEOUT_SECS",
                DEFAULT_METADATA_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(env_secs(
                "MODELFETCH_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            progress_interval: defaults.progress_interval,
        }
    }

    pub fn with_hub_url(mut self, hub_url: impl Into<String>) -> Self {
        self.hub_url = hub_url.into();
        self
    }
}

fn env_secs(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}s", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Output directory: `MODELFETCH_OUTPUT_DIR`, else `~/Models`, else `./Models`.
pub fn default_output_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MODELFETCH_OUTPUT_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join("Models"))
        .unwrap_or_else(|| PathBuf::from("Models"))
}
