use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{MonitorError, MonitorResult};
use crate::history::RetentionPolicy;
use crate::region::{GlobalAnchor, TILE_SIZE, validate_tile_size};
use crate::threshold::{ThresholdTable, default_levels};

/// Lower bound for the poll interval to bound load on the tile backend
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound for the poll interval; longer values are lowered to it
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const TILE_URL_ENV: &str = "TILE_WATCH_TILE_URL";

const API_ADDR_ENV: &str = "TILE_WATCH_API_ADDR";

/// Process-level configuration, fixed for the lifetime of the process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the tile backend; tiles live at `<tile_url>/<x>/<y>.png`
    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum tile requests in flight per tick
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Initial monitor configuration (hot-reloadable at runtime)
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// History retention (defaults to the last 60 seconds)
    #[serde(default)]
    pub history: RetentionPolicy,

    /// Optional notification target for severity changes
    pub alert: Option<Alert>,

    #[serde(default)]
    pub api: ApiSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_url: default_tile_url(),
            tile_size: default_tile_size(),
            request_timeout_secs: default_request_timeout(),
            fetch_concurrency: default_fetch_concurrency(),
            monitor: MonitorConfig::default(),
            history: RetentionPolicy::default(),
            alert: None,
            api: ApiSettings::default(),
        }
    }
}

impl Config {
    /// Reject process-level settings the pipeline cannot work with
    pub fn validate(&self) -> MonitorResult<()> {
        validate_tile_size(self.tile_size)?;
        self.history.validate()?;

        if self.fetch_concurrency == 0 {
            return Err(MonitorError::InvalidSettings(
                "fetch concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Apply `TILE_WATCH_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(TILE_URL_ENV) {
            debug!("tile URL overridden by {TILE_URL_ENV}");
            self.tile_url = url;
        }

        if let Ok(addr) = std::env::var(API_ADDR_ENV) {
            match addr.parse() {
                Ok(addr) => self.api.bind_addr = addr,
                Err(e) => warn!("ignoring {API_ADDR_ENV}={addr}: {e}"),
            }
        }
    }
}

/// Everything that describes what is monitored and how often
///
/// Applied as a whole: a reload replaces the active configuration atomically
/// at the next tick boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Reference image; relative paths resolve next to the executable
    #[serde(default = "default_reference_image_path")]
    pub reference_image_path: PathBuf,

    /// Optional `[x1, y1, x2, y2]` crop applied to the reference image
    #[serde(default)]
    pub template_crop: Option<[u32; 4]>,

    /// `[tile_x, tile_y, offset_x, offset_y]` of the region's top-left pixel
    #[serde(default = "default_anchor")]
    pub anchor: GlobalAnchor,

    /// `[width, height]` of the region; defaults to the template's size
    #[serde(default)]
    pub size: Option<[i64; 2]>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_levels")]
    pub thresholds: ThresholdTable,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reference_image_path: default_reference_image_path(),
            template_crop: None,
            anchor: default_anchor(),
            size: None,
            poll_interval_secs: default_poll_interval(),
            thresholds: default_levels(),
        }
    }
}

impl MonitorConfig {
    /// Poll interval clamped to `MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL`
    pub fn poll_interval(&self) -> MonitorResult<Duration> {
        if self.poll_interval_secs == 0 {
            return Err(MonitorError::InvalidInterval);
        }
        Ok(clamp_interval(Duration::from_secs(self.poll_interval_secs)))
    }
}

/// Clamp an interval to [`MIN_POLL_INTERVAL`]..=[`MAX_POLL_INTERVAL`]
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Only directory absolute reference image paths posted to the API may point into
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_cors: default_enable_cors(),
            template_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Discord(Discord),
    Webhook(Webhook),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

fn default_tile_url() -> String {
    "https://backend.wplace.live/files/s0/tiles".to_string()
}

fn default_tile_size() -> u32 {
    TILE_SIZE
}

fn default_request_timeout() -> u64 {
    5
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_reference_image_path() -> PathBuf {
    PathBuf::from("kiku.png")
}

fn default_anchor() -> GlobalAnchor {
    GlobalAnchor::new(1818, 806, 989, 359)
}

fn default_poll_interval() -> u64 {
    1
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_enable_cors() -> bool {
    true
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
