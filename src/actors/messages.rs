//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to the monitor via mpsc
//! 2. **Events**: One `TickEvent` per completed tick, broadcast to any subscriber
//! 3. **Snapshots**: Published state is an immutable `Arc<MonitorSnapshot>` behind a
//!    watch channel; readers never see a half-updated state

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use image::{RgbImage, RgbaImage};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::MonitorConfig;
use crate::diff::DiffStats;
use crate::error::MonitorError;
use crate::history::HistoryPoint;
use crate::region::MonitorRegion;
use crate::threshold::{Severity, ThresholdTable};

/// Commands that can be sent to the MonitorActor
///
/// Commands are only handled between ticks. A tick already in progress always
/// completes with the configuration it started with.
#[derive(Debug)]
pub enum MonitorCommand {
    /// Validate and apply a complete configuration
    ///
    /// On failure the previous configuration (if any) stays active.
    Configure {
        config: MonitorConfig,
        respond_to: oneshot::Sender<Result<(), MonitorError>>,
    },

    /// Replace the threshold table without reloading the template
    UpdateThresholds {
        thresholds: ThresholdTable,
        respond_to: oneshot::Sender<Result<(), MonitorError>>,
    },

    /// Change the poll interval
    ///
    /// The already scheduled tick keeps its deadline; the new interval applies
    /// from the tick after it.
    UpdateInterval { interval: Duration },

    /// Run one tick immediately without touching the schedule
    TickNow {
        respond_to: oneshot::Sender<Result<TickOutcome, MonitorError>>,
    },

    /// Resume scheduling with the active configuration
    Start {
        respond_to: oneshot::Sender<Result<(), MonitorError>>,
    },

    /// Halt scheduling; the configuration is kept
    Stop,

    /// Drop all history entries
    ResetHistory,

    /// Gracefully shut down the monitor
    Shutdown,
}

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    /// No valid configuration, no ticks
    Idle,

    /// A configuration is being validated
    Configuring,

    /// Ticks fire at the configured interval
    Running,

    /// The last reconfiguration failed; the previous configuration keeps running
    Faulted,

    /// Scheduling halted by request
    Stopped,
}

/// Status of the most recent tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStatus {
    /// No tick has completed yet
    Pending,

    Ok,

    /// Every required tile was unavailable
    NoTileData,
}

/// Summary returned by a manual tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub percentage: f64,
    pub severity: Severity,
    pub stats: DiffStats,
    pub tiles_fetched: usize,
    pub tiles_required: usize,
}

/// Event published after every tick
#[derive(Debug, Clone)]
pub struct TickEvent {
    pub timestamp: DateTime<Utc>,

    /// Monotonic tick number, starting at 1
    pub tick: u64,

    /// `Ok` for a successful comparison, the tick error otherwise
    pub result: Result<TickOutcome, MonitorError>,

    /// Severity of the previous successful tick, `None` before the first one
    pub previous_severity: Option<Severity>,
}

/// Images and figures produced by the last successful tick
#[derive(Debug, Clone)]
pub struct LatestTick {
    pub timestamp: DateTime<Utc>,
    pub percentage: f64,
    pub severity: Severity,
    pub stats: DiffStats,

    /// Live crop with the template's transparent area blanked out
    pub live: RgbaImage,

    /// Per-pixel difference, black outside the monitored footprint
    pub diff: RgbImage,
}

/// Immutable view of the monitor published after every state change
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub phase: MonitorPhase,
    pub status: TickStatus,

    /// Error of the last failed configuration attempt, cleared on success
    pub config_error: Option<String>,

    pub config: Option<MonitorConfig>,
    pub region: Option<MonitorRegion>,
    pub thresholds: ThresholdTable,
    pub poll_interval: Duration,

    pub latest: Option<Arc<LatestTick>>,
    pub history: Arc<[HistoryPoint]>,

    /// Ticks attempted since start, successful or not
    pub tick_count: u64,

    /// Successful ticks that reached a severity level
    pub detections: u64,

    pub last_detection: Option<DateTime<Utc>>,
    pub last_tick: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

impl MonitorSnapshot {
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Commands that can be sent to the AlertActor
#[derive(Debug)]
pub enum AlertCommand {
    /// Stop sending notifications until unmuted
    Mute,

    Unmute,

    /// Gracefully shut down the actor
    Shutdown,
}
