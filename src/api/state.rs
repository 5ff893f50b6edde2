//! API shared state containing actor handles

use std::path::PathBuf;

use crate::actors::alert::AlertHandle;
use crate::actors::monitor::MonitorHandle;
use crate::history::RetentionPolicy;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Handle to the monitor actor for state queries and commands
    pub monitor: MonitorHandle,

    /// Handle to the alert actor, if alerting is configured
    pub alerts: Option<AlertHandle>,

    /// History retention in effect, reported alongside the points
    pub retention: RetentionPolicy,

    /// Directory that absolute reference image paths posted to the API must lie in
    pub template_dir: Option<PathBuf>,
}

impl ApiState {
    pub fn new(monitor: MonitorHandle, retention: RetentionPolicy) -> Self {
        Self {
            monitor,
            alerts: None,
            retention,
            template_dir: None,
        }
    }

    pub fn with_alerts(mut self, alerts: AlertHandle) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }
}
