//! AlertActor - Notifies about severity changes
//!
//! Subscribes to tick events and sends a notification whenever the classified
//! severity differs from the one the monitor reports for the previous successful tick.
//!
//! ```text
//! first tick, normal        → remember, no alert
//! first tick, detection     → alert
//! label changed             → alert (detection or recovery)
//! label unchanged           → nothing
//! tick failed               → nothing, last severity kept
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, instrument, trace, warn};

use crate::notify::{Notifier, SeverityChange};

use super::messages::{AlertCommand, MonitorSnapshot, TickEvent};

/// Actor that turns severity changes into notifications
pub struct AlertActor {
    notifier: Notifier,

    /// Command receiver
    command_rx: mpsc::Receiver<AlertCommand>,

    /// Tick event receiver (broadcast subscription)
    event_rx: broadcast::Receiver<TickEvent>,

    /// Monitor state, used to describe the region in messages
    state_rx: watch::Receiver<Arc<MonitorSnapshot>>,

    /// Whether alerts are muted
    muted: bool,
}

impl AlertActor {
    pub fn new(
        notifier: Notifier,
        command_rx: mpsc::Receiver<AlertCommand>,
        event_rx: broadcast::Receiver<TickEvent>,
        state_rx: watch::Receiver<Arc<MonitorSnapshot>>,
    ) -> Self {
        Self {
            notifier,
            command_rx,
            event_rx,
            state_rx,
            muted: false,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting alert actor");

        loop {
            tokio::select! {
                result = self.event_rx.recv() => {
                    match result {
                        Ok(event) => self.handle_tick_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("alert actor lagged, skipped {skipped} ticks");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("tick channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AlertCommand::Mute => {
                            debug!("muting alerts");
                            self.muted = true;
                        }

                        AlertCommand::Unmute => {
                            debug!("unmuting alerts");
                            self.muted = false;
                        }

                        AlertCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("alert actor stopped");
    }

    #[instrument(skip_all, fields(tick = event.tick))]
    async fn handle_tick_event(&mut self, event: TickEvent) {
        let Ok(outcome) = event.result else {
            trace!("tick failed, nothing to report");
            return;
        };

        let previous = event.previous_severity;

        let changed = match &previous {
            None => !outcome.severity.is_normal(),
            Some(previous) => previous.label() != outcome.severity.label(),
        };

        if !changed {
            return;
        }

        if self.muted {
            debug!("severity changed to {} while muted", outcome.severity);
            return;
        }

        let region = self.state_rx.borrow().region;
        let change = SeverityChange {
            previous,
            current: outcome.severity,
            percentage: outcome.percentage,
            region,
            timestamp: event.timestamp,
        };

        self.notifier.notify(&change).await;
    }
}

/// Handle for controlling the AlertActor
#[derive(Clone)]
pub struct AlertHandle {
    sender: mpsc::Sender<AlertCommand>,
}

impl AlertHandle {
    /// Spawn a new alert actor
    pub fn spawn(
        notifier: Notifier,
        event_rx: broadcast::Receiver<TickEvent>,
        state_rx: watch::Receiver<Arc<MonitorSnapshot>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = AlertActor::new(notifier, cmd_rx, event_rx, state_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn mute(&self) {
        let _ = self.sender.send(AlertCommand::Mute).await;
    }

    pub async fn unmute(&self) {
        let _ = self.sender.send(AlertCommand::Unmute).await;
    }

    /// Shutdown the alert actor
    pub async fn shutdown(&self) {
        let _ = self.sender.send(AlertCommand::Shutdown).await;
    }
}
