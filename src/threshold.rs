//! Severity classification of a difference percentage
//!
//! Levels are user-editable and arrive in arbitrary order, so the table is
//! re-validated and re-sorted on every classification instead of being cached.
//! The highest threshold that the percentage reaches wins.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MonitorError, MonitorResult};

/// Label returned when no level is reached
pub const NORMAL_LABEL: &str = "normal";

/// One named severity bucket with its minimum percentage (inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityLevel {
    pub label: String,
    pub percentage: f64,
}

impl SeverityLevel {
    pub fn new(label: impl Into<String>, percentage: f64) -> Self {
        Self {
            label: label.into(),
            percentage,
        }
    }
}

/// Ordered collection of severity levels as supplied by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable {
    levels: Vec<SeverityLevel>,
}

impl ThresholdTable {
    pub fn new(levels: Vec<SeverityLevel>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[SeverityLevel] {
        &self.levels
    }

    /// Check labels are unique and non-empty and percentages lie in `[0, 100]`
    pub fn validate(&self) -> MonitorResult<()> {
        let mut seen = HashSet::new();

        for level in &self.levels {
            if level.label.trim().is_empty() {
                return Err(MonitorError::InvalidThresholds("empty label".to_string()));
            }
            if level.label == NORMAL_LABEL {
                return Err(MonitorError::InvalidThresholds(format!(
                    "label '{NORMAL_LABEL}' is reserved"
                )));
            }
            if !seen.insert(level.label.as_str()) {
                return Err(MonitorError::InvalidThresholds(format!(
                    "duplicate label '{}'",
                    level.label
                )));
            }
            if !(0.0..=100.0).contains(&level.percentage) {
                return Err(MonitorError::InvalidThresholds(format!(
                    "'{}' threshold {} outside 0-100",
                    level.label, level.percentage
                )));
            }
        }

        Ok(())
    }

    /// Usable levels sorted by threshold, highest first
    ///
    /// The sort is stable, so levels sharing a threshold keep their insertion order.
    /// Levels with a non-finite threshold are skipped.
    pub fn descending(&self) -> Vec<&SeverityLevel> {
        let mut levels: Vec<_> = self
            .levels
            .iter()
            .filter(|level| {
                let usable = level.percentage.is_finite();
                if !usable {
                    warn!("ignoring level '{}' with unusable threshold", level.label);
                }
                usable
            })
            .collect();

        levels.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
        levels
    }

    /// Map a percentage to its severity
    pub fn classify(&self, percentage: f64) -> Severity {
        self.descending()
            .into_iter()
            .find(|level| level.percentage <= percentage)
            .map(|level| Severity::Level(level.clone()))
            .unwrap_or(Severity::Normal)
    }
}

impl From<Vec<SeverityLevel>> for ThresholdTable {
    fn from(levels: Vec<SeverityLevel>) -> Self {
        Self::new(levels)
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq)]
pub enum Severity {
    /// No level reached
    Normal,

    /// Highest level reached
    Level(SeverityLevel),
}

impl Severity {
    pub fn label(&self) -> &str {
        match self {
            Severity::Normal => NORMAL_LABEL,
            Severity::Level(level) => &level.label,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Severity::Normal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Levels used when no configuration provides any
pub fn default_levels() -> ThresholdTable {
    ThresholdTable::new(vec![
        SeverityLevel::new("massive vandalism", 36.0),
        SeverityLevel::new("large vandalism", 27.0),
        SeverityLevel::new("medium vandalism", 15.0),
        SeverityLevel::new("small vandalism", 6.1),
    ])
}
