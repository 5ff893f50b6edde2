//! MonitorActor - Drives the periodic tick pipeline
//!
//! The actor owns all cross-tick mutable state: the active configuration, the
//! threshold table, the poll interval and the history window. Everything else
//! receives plain parameters and returns values.
//!
//! ## Message Flow
//!
//! ```text
//! Deadline → map region → fetch tiles (concurrent) → stitch → crop → diff → classify
//!     ↑                                                                      │
//!     │                               record history ← publish snapshot ←────┘
//!     │                                     │
//!     │                                     └─→ TickEvent → [AlertActor, ...]
//!     └─── Commands (Configure, UpdateThresholds, UpdateInterval, TickNow, Start, Stop, ...)
//! ```
//!
//! ## Scheduling
//!
//! The first tick fires as soon as a configuration is applied. Every following tick
//! is due one interval after the previous one completed. Commands are handled only
//! between ticks, so a reconfiguration or shutdown never interrupts tile fetches in
//! flight and a canvas is never stitched from two configurations. Failed ticks are
//! retried by the next tick; there is no backoff.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::{Config, MonitorConfig, clamp_interval};
use crate::diff;
use crate::error::{MonitorError, MonitorResult};
use crate::history::{HistoryWindow, RetentionPolicy};
use crate::region::{MonitorRegion, RegionMapping, TILE_SIZE};
use crate::template::ReferenceTemplate;
use crate::threshold::ThresholdTable;
use crate::tiles::{TileSource, crop, fetch_tiles, stitch};

use super::messages::{
    LatestTick, MonitorCommand, MonitorPhase, MonitorSnapshot, TickEvent, TickOutcome, TickStatus,
};

/// Process-level settings that do not change with reconfiguration
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub tile_size: u32,
    pub fetch_concurrency: usize,
    pub retention: RetentionPolicy,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            fetch_concurrency: 4,
            retention: RetentionPolicy::default(),
        }
    }
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        Self {
            tile_size: config.tile_size,
            fetch_concurrency: config.fetch_concurrency,
            retention: config.history,
        }
    }
}

/// Validated configuration in effect
struct ActiveMonitor {
    config: MonitorConfig,
    region: MonitorRegion,
    mapping: RegionMapping,
    template: ReferenceTemplate,
}

/// Actor that runs the monitoring pipeline on a schedule
pub struct MonitorActor {
    settings: MonitorSettings,

    /// Tile backend shared with nobody else
    source: Arc<dyn TileSource>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Broadcast sender for tick events
    event_tx: broadcast::Sender<TickEvent>,

    /// Latest published snapshot
    state_tx: watch::Sender<Arc<MonitorSnapshot>>,

    active: Option<ActiveMonitor>,
    thresholds: ThresholdTable,
    interval: Duration,

    phase: MonitorPhase,
    status: TickStatus,
    config_error: Option<String>,

    history: HistoryWindow,
    latest: Option<Arc<LatestTick>>,

    /// Deadline of the next scheduled tick; `None` while not scheduling
    next_tick: Option<Instant>,

    started: Instant,
    started_at: DateTime<Utc>,
    tick_count: u64,
    detections: u64,
    last_detection: Option<DateTime<Utc>>,
    last_tick: Option<DateTime<Utc>>,
}

impl MonitorActor {
    /// Create a new monitor actor in the `Idle` phase
    pub fn new(
        settings: MonitorSettings,
        source: Arc<dyn TileSource>,
        command_rx: mpsc::Receiver<MonitorCommand>,
        event_tx: broadcast::Sender<TickEvent>,
    ) -> Self {
        let defaults = MonitorConfig::default();
        let history = HistoryWindow::new(settings.retention);
        let (state_tx, _) = watch::channel(Arc::new(MonitorSnapshot {
            phase: MonitorPhase::Idle,
            status: TickStatus::Pending,
            config_error: None,
            config: None,
            region: None,
            thresholds: defaults.thresholds.clone(),
            poll_interval: clamp_interval(Duration::from_secs(defaults.poll_interval_secs)),
            latest: None,
            history: history.snapshot(),
            tick_count: 0,
            detections: 0,
            last_detection: None,
            last_tick: None,
            started_at: Utc::now(),
        }));

        let initial = state_tx.borrow().clone();

        Self {
            settings,
            source,
            command_rx,
            event_tx,
            state_tx,
            active: None,
            thresholds: initial.thresholds.clone(),
            interval: initial.poll_interval,
            phase: MonitorPhase::Idle,
            status: TickStatus::Pending,
            config_error: None,
            history,
            latest: None,
            next_tick: None,
            started: Instant::now(),
            started_at: initial.started_at,
            tick_count: 0,
            detections: 0,
            last_detection: None,
            last_tick: None,
        }
    }

    /// Receiver for published snapshots
    pub fn state(&self) -> watch::Receiver<Arc<MonitorSnapshot>> {
        self.state_tx.subscribe()
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or the command channel is closed.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");

        loop {
            tokio::select! {
                // Scheduled tick
                _ = sleep_until(self.next_tick) => {
                    self.scheduled_tick().await;
                }

                // Handle commands
                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        warn!("command channel closed, shutting down");
                        break;
                    };

                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
            }
        }

        debug!("monitor actor stopped");
    }

    /// Returns `false` when the actor should stop
    async fn handle_command(&mut self, cmd: MonitorCommand) -> bool {
        match cmd {
            MonitorCommand::Configure { config, respond_to } => {
                debug!("received Configure command");
                let result = self.configure(config).await;
                let _ = respond_to.send(result);
            }

            MonitorCommand::UpdateThresholds {
                thresholds,
                respond_to,
            } => {
                debug!("updating thresholds ({} levels)", thresholds.levels().len());
                let result = thresholds.validate().map(|()| {
                    self.thresholds = thresholds;
                });
                self.publish();
                let _ = respond_to.send(result);
            }

            MonitorCommand::UpdateInterval { interval } => {
                self.interval = clamp_interval(interval);
                debug!("updating interval to {:?}", self.interval);
                self.publish();
            }

            MonitorCommand::TickNow { respond_to } => {
                debug!("received TickNow command");
                let result = self.tick().await;
                let _ = respond_to.send(result);
            }

            MonitorCommand::Start { respond_to } => {
                let result = self.start();
                let _ = respond_to.send(result);
            }

            MonitorCommand::Stop => {
                debug!("received Stop command");
                self.next_tick = None;
                if self.active.is_some() {
                    self.phase = MonitorPhase::Stopped;
                }
                self.publish();
            }

            MonitorCommand::ResetHistory => {
                debug!("clearing {} history entries", self.history.len());
                self.history.clear();
                self.publish();
            }

            MonitorCommand::Shutdown => {
                debug!("received shutdown command");
                self.next_tick = None;
                self.phase = MonitorPhase::Stopped;
                self.publish();
                return false;
            }
        }

        true
    }

    #[instrument(skip_all)]
    async fn configure(&mut self, config: MonitorConfig) -> MonitorResult<()> {
        let previous = self.phase;
        self.phase = MonitorPhase::Configuring;
        self.publish();

        match validate_config(&config, self.settings.tile_size).await {
            Ok(active) => {
                info!(
                    "monitoring {}x{} region at [{}] every {:?}",
                    active.region.width(),
                    active.region.height(),
                    active.region.anchor,
                    config.poll_interval().unwrap_or(self.interval)
                );

                self.thresholds = config.thresholds.clone();
                self.interval = config.poll_interval()?;
                self.active = Some(active);
                self.config_error = None;
                self.phase = MonitorPhase::Running;

                // an already running schedule keeps its deadline
                if !matches!(previous, MonitorPhase::Running | MonitorPhase::Faulted) {
                    self.next_tick = Some(Instant::now());
                }

                self.publish();
                Ok(())
            }
            Err(e) => {
                error!("configuration rejected: {e}");
                self.config_error = Some(e.to_string());
                self.phase = match previous {
                    MonitorPhase::Running | MonitorPhase::Faulted => MonitorPhase::Faulted,
                    MonitorPhase::Stopped => MonitorPhase::Stopped,
                    _ => MonitorPhase::Idle,
                };
                self.publish();
                Err(e)
            }
        }
    }

    fn start(&mut self) -> MonitorResult<()> {
        if self.active.is_none() {
            return Err(MonitorError::NotConfigured);
        }

        if self.phase == MonitorPhase::Stopped {
            debug!("resuming scheduling");
            self.phase = MonitorPhase::Running;
            self.next_tick = Some(Instant::now());
            self.publish();
        }

        Ok(())
    }

    async fn scheduled_tick(&mut self) {
        if let Err(e) = self.tick().await {
            trace!("scheduled tick failed: {e}");
        }

        if matches!(self.phase, MonitorPhase::Running | MonitorPhase::Faulted) {
            self.next_tick = Some(Instant::now() + self.interval);
        }
    }

    /// Run the pipeline once and record the result
    #[instrument(skip(self))]
    async fn tick(&mut self) -> MonitorResult<TickOutcome> {
        let Some(active) = &self.active else {
            return Err(MonitorError::NotConfigured);
        };

        let tile_size = self.settings.tile_size;
        let mapping = active.mapping;

        trace!("fetching {} tiles from {}", mapping.tiles.tile_count(), mapping.tiles.start);
        let tiles = fetch_tiles(
            self.source.as_ref(),
            &mapping.tiles,
            self.settings.fetch_concurrency,
        )
        .await;
        let tiles_fetched = tiles.values().filter(|tile| tile.is_some()).count();

        let compared = stitch(&mapping.tiles, &tiles, tile_size).map(|canvas| {
            let live = crop(&canvas, &mapping.crop);
            let result = diff::compare(active.template.image(), &live);
            let masked = diff::mask_live(active.template.image(), &live);
            (result, masked)
        });

        let now = Utc::now();
        self.tick_count += 1;
        self.last_tick = Some(now);

        let previous_severity = self.latest.as_ref().map(|latest| latest.severity.clone());

        let result = match compared {
            Ok((result, live)) => {
                let severity = self.thresholds.classify(result.percentage);
                let elapsed = self.started.elapsed().as_secs_f64();
                self.history.record(elapsed, result.percentage);

                if !severity.is_normal() {
                    self.detections += 1;
                    self.last_detection = Some(now);
                }

                if previous_severity.as_ref() != Some(&severity) {
                    info!("severity is now {severity} ({:.2}%)", result.percentage);
                } else {
                    debug!("{severity} ({:.2}%)", result.percentage);
                }

                let outcome = TickOutcome {
                    percentage: result.percentage,
                    severity: severity.clone(),
                    stats: result.stats,
                    tiles_fetched,
                    tiles_required: mapping.tiles.tile_count(),
                };

                self.latest = Some(Arc::new(LatestTick {
                    timestamp: now,
                    percentage: result.percentage,
                    severity,
                    stats: result.stats,
                    live,
                    diff: result.visualization,
                }));
                self.status = TickStatus::Ok;

                Ok(outcome)
            }
            Err(e) => {
                warn!("{e}");
                self.status = TickStatus::NoTileData;
                Err(e)
            }
        };

        self.publish();

        let event = TickEvent {
            timestamp: now,
            tick: self.tick_count,
            result: result.clone(),
            previous_severity,
        };

        // No subscribers is fine
        if let Ok(receivers) = self.event_tx.send(event) {
            trace!("published tick event to {receivers} receivers");
        }

        result
    }

    fn publish(&self) {
        let snapshot = MonitorSnapshot {
            phase: self.phase,
            status: self.status,
            config_error: self.config_error.clone(),
            config: self.active.as_ref().map(|active| active.config.clone()),
            region: self.active.as_ref().map(|active| active.region),
            thresholds: self.thresholds.clone(),
            poll_interval: self.interval,
            latest: self.latest.clone(),
            history: self.history.snapshot(),
            tick_count: self.tick_count,
            detections: self.detections,
            last_detection: self.last_detection,
            last_tick: self.last_tick,
            started_at: self.started_at,
        };

        self.state_tx.send_replace(Arc::new(snapshot));
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Check everything a configuration needs before it may replace the active one
async fn validate_config(config: &MonitorConfig, tile_size: u32) -> MonitorResult<ActiveMonitor> {
    config.thresholds.validate()?;
    config.poll_interval()?;

    if let Some([width, height]) = config.size {
        MonitorRegion::new(config.anchor, width, height)?.map(tile_size)?;
    }

    let template =
        ReferenceTemplate::load(&config.reference_image_path, config.template_crop).await?;

    let [width, height] = config
        .size
        .unwrap_or([i64::from(template.width()), i64::from(template.height())]);
    let region = MonitorRegion::new(config.anchor, width, height)?;
    let mapping = region.map(tile_size)?;

    if (region.width(), region.height()) != (template.width(), template.height()) {
        warn!(
            "region {}x{} differs from template {}x{}, comparing the common area",
            region.width(),
            region.height(),
            template.width(),
            template.height()
        );
    }

    Ok(ActiveMonitor {
        config: config.clone(),
        region,
        mapping,
        template,
    })
}

/// Handle for controlling a MonitorActor
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    state_rx: watch::Receiver<Arc<MonitorSnapshot>>,
    event_tx: broadcast::Sender<TickEvent>,
}

impl MonitorHandle {
    /// Spawn a new monitor actor in the `Idle` phase
    pub fn spawn(settings: MonitorSettings, source: Arc<dyn TileSource>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(64);

        let actor = MonitorActor::new(settings, source, cmd_rx, event_tx.clone());
        let state_rx = actor.state();

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            state_rx,
            event_tx,
        }
    }

    /// Apply a configuration; returns the validation error if it is rejected
    pub async fn configure(&self, config: MonitorConfig) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::Configure {
                config,
                respond_to: tx,
            })
            .await
            .context("failed to send Configure command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    pub async fn update_thresholds(&self, thresholds: ThresholdTable) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::UpdateThresholds {
                thresholds,
                respond_to: tx,
            })
            .await
            .context("failed to send UpdateThresholds command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    pub async fn update_interval(&self, interval: Duration) -> Result<()> {
        self.sender
            .send(MonitorCommand::UpdateInterval { interval })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Run one tick immediately, bypassing the schedule
    pub async fn tick_now(&self) -> Result<TickOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        Ok(rx.await.context("failed to receive response")??)
    }

    pub async fn start(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::Start { respond_to: tx })
            .await
            .context("failed to send Start command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::Stop)
            .await
            .context("failed to send Stop command")?;
        Ok(())
    }

    pub async fn reset_history(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::ResetHistory)
            .await
            .context("failed to send ResetHistory command")?;
        Ok(())
    }

    /// Gracefully shut down the monitor after any tick in progress
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }

    /// Most recently published state
    pub fn snapshot(&self) -> Arc<MonitorSnapshot> {
        self.state_rx.borrow().clone()
    }

    /// Receiver that is notified on every published state
    pub fn watch(&self) -> watch::Receiver<Arc<MonitorSnapshot>> {
        self.state_rx.clone()
    }

    /// Subscribe to tick events
    pub fn subscribe(&self) -> broadcast::Receiver<TickEvent> {
        self.event_tx.subscribe()
    }
}
