//! Error types for the monitoring pipeline

use std::fmt;
use std::path::PathBuf;

use crate::region::{GlobalAnchor, MAX_REGION_SIDE, TileCoordinate};

/// Result type alias for pipeline operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur while configuring the monitor or running a tick
///
/// Configuration-time variants (`InvalidRegion`, `RegionOutOfRange`, `TemplateLoad`,
/// `InvalidThresholds`, `InvalidInterval`) are returned synchronously to whoever applied
/// the configuration. `InvalidSettings` is raised once at startup.
/// Tick-time variants are recorded as status and never stop the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Monitored rectangle has a side outside `1..=MAX_REGION_SIDE`
    InvalidRegion { width: i64, height: i64 },

    /// Region's global pixel coordinates cannot be represented
    RegionOutOfRange { anchor: GlobalAnchor },

    /// Reference template is missing or cannot be decoded
    TemplateLoad { path: PathBuf, reason: String },

    /// A single tile could not be retrieved or decoded
    TileFetch { tile: TileCoordinate, reason: String },

    /// Every tile required for the tick was absent
    NoTileData { tiles: usize },

    /// Threshold table failed validation
    InvalidThresholds(String),

    /// Poll interval of zero seconds
    InvalidInterval,

    /// Operation requires an applied configuration
    NotConfigured,

    /// Process-level setting (tile size, history retention) is unusable
    InvalidSettings(String),
}

impl MonitorError {
    /// Whether the error belongs to a single tick rather than to a configuration
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MonitorError::TileFetch { .. } | MonitorError::NoTileData { .. }
        )
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::InvalidRegion { width, height } => {
                write!(
                    f,
                    "invalid monitor region: size {width}x{height} must be within 1..={MAX_REGION_SIDE} per side"
                )
            }
            MonitorError::RegionOutOfRange { anchor } => {
                write!(f, "monitor region at [{anchor}] lies outside the addressable canvas")
            }
            MonitorError::TemplateLoad { path, reason } => {
                write!(f, "failed to load reference template {}: {reason}", path.display())
            }
            MonitorError::TileFetch { tile, reason } => {
                write!(f, "failed to fetch tile {tile}: {reason}")
            }
            MonitorError::NoTileData { tiles } => {
                write!(f, "no tile data: all {tiles} required tiles were unavailable")
            }
            MonitorError::InvalidThresholds(msg) => write!(f, "invalid threshold table: {msg}"),
            MonitorError::InvalidInterval => write!(f, "poll interval must be greater than zero"),
            MonitorError::NotConfigured => write!(f, "monitor has no valid configuration"),
            MonitorError::InvalidSettings(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for MonitorError {}
