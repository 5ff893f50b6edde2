//! Bounded time series of difference percentages
//!
//! Entries are appended at tick completion and evicted from the oldest end only.
//! Readers get an immutable copy via [`HistoryWindow::snapshot`], so later
//! appends never disturb a snapshot already handed out.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// One recorded tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// Seconds since the monitor started
    pub elapsed_secs: f64,
    pub percentage: f64,
}

/// How the window is bounded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Keep entries no older than `seconds` before the latest one
    Span { seconds: f64 },

    /// Keep at most `max_points` entries
    Count { max_points: usize },
}

impl RetentionPolicy {
    /// A span must be finite and non-negative, a count at least one
    pub fn validate(&self) -> MonitorResult<()> {
        match *self {
            RetentionPolicy::Span { seconds } if !seconds.is_finite() || seconds < 0.0 => Err(
                MonitorError::InvalidSettings(format!("history span {seconds} is not a valid duration")),
            ),
            RetentionPolicy::Count { max_points: 0 } => Err(MonitorError::InvalidSettings(
                "history must keep at least one point".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::Span { seconds: 60.0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    entries: VecDeque<HistoryPoint>,
    policy: RetentionPolicy,
}

impl HistoryWindow {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            policy,
        }
    }

    /// Append an entry and evict according to the configured policy
    pub fn record(&mut self, elapsed_secs: f64, percentage: f64) {
        self.append(elapsed_secs, percentage);

        match self.policy {
            RetentionPolicy::Span { seconds } => self.evict_older_than(elapsed_secs - seconds),
            RetentionPolicy::Count { max_points } => self.evict_beyond_count(max_points),
        }
    }

    pub fn append(&mut self, elapsed_secs: f64, percentage: f64) {
        self.entries.push_back(HistoryPoint {
            elapsed_secs,
            percentage,
        });
    }

    /// Drop entries from the oldest end whose timestamp is before `cutoff`
    pub fn evict_older_than(&mut self, cutoff: f64) {
        while self
            .entries
            .front()
            .is_some_and(|point| point.elapsed_secs < cutoff)
        {
            self.entries.pop_front();
        }
    }

    /// Drop entries from the oldest end until at most `max` remain
    pub fn evict_beyond_count(&mut self, max: usize) {
        while self.entries.len() > max {
            self.entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Arc<[HistoryPoint]> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
