//! Watch a rectangular region of a tiled pixel canvas for deviations from a
//! reference template.

pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod notify;
pub mod region;
pub mod template;
pub mod threshold;
pub mod tiles;

pub use actors::messages::{MonitorPhase, MonitorSnapshot, TickEvent, TickOutcome, TickStatus};
pub use actors::monitor::{MonitorHandle, MonitorSettings};
pub use config::{Config, MonitorConfig};
pub use error::{MonitorError, MonitorResult};
pub use region::{GlobalAnchor, MonitorRegion, TileCoordinate};
pub use threshold::{Severity, SeverityLevel, ThresholdTable};
