//! API request and response types

use serde::{Deserialize, Serialize};

use crate::actors::messages::{MonitorPhase, MonitorSnapshot, TickOutcome, TickStatus};
use crate::config::MonitorConfig;
use crate::diff::DiffStats;
use crate::history::{HistoryPoint, RetentionPolicy};
use crate::region::MonitorRegion;
use crate::threshold::{Severity, ThresholdTable};

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub phase: MonitorPhase,
    pub alerts_enabled: bool,
    pub timestamp: String,
}

/// Figures of the last successful tick
#[derive(Debug, Clone, Serialize)]
pub struct LatestResult {
    pub timestamp: String,
    pub percentage: f64,
    pub severity: Severity,
    pub stats: DiffStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub phase: MonitorPhase,
    pub status: TickStatus,
    pub config_error: Option<String>,
    pub config: Option<MonitorConfig>,
    pub region: Option<MonitorRegion>,
    pub thresholds: ThresholdTable,
    pub poll_interval_ms: u128,
    pub latest: Option<LatestResult>,
    pub tick_count: u64,
    pub detections: u64,
    pub last_detection: Option<String>,
    pub last_tick: Option<String>,
    pub started_at: String,
    pub uptime_secs: i64,
}

impl From<&MonitorSnapshot> for StatusResponse {
    fn from(snapshot: &MonitorSnapshot) -> Self {
        Self {
            phase: snapshot.phase,
            status: snapshot.status,
            config_error: snapshot.config_error.clone(),
            config: snapshot.config.clone(),
            region: snapshot.region,
            thresholds: snapshot.thresholds.clone(),
            poll_interval_ms: snapshot.poll_interval.as_millis(),
            latest: snapshot.latest.as_ref().map(|latest| LatestResult {
                timestamp: latest.timestamp.to_rfc3339(),
                percentage: latest.percentage,
                severity: latest.severity.clone(),
                stats: latest.stats,
            }),
            tick_count: snapshot.tick_count,
            detections: snapshot.detections,
            last_detection: snapshot.last_detection.map(|t| t.to_rfc3339()),
            last_tick: snapshot.last_tick.map(|t| t.to_rfc3339()),
            started_at: snapshot.started_at.to_rfc3339(),
            uptime_secs: snapshot.uptime().num_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub policy: RetentionPolicy,
    pub count: usize,
    pub points: Vec<HistoryPoint>,
}

/// Body of `PUT /api/v1/interval`
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalRequest {
    pub seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickResponse {
    pub percentage: f64,
    pub severity: Severity,
    pub stats: DiffStats,
    pub tiles_fetched: usize,
    pub tiles_required: usize,
}

impl From<TickOutcome> for TickResponse {
    fn from(outcome: TickOutcome) -> Self {
        Self {
            percentage: outcome.percentage,
            severity: outcome.severity,
            stats: outcome.stats,
            tiles_fetched: outcome.tiles_fetched,
            tiles_required: outcome.tiles_required,
        }
    }
}
