//! Actor-based monitoring runtime
//!
//! Each actor runs as an independent async task communicating via Tokio channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │ tile-watch (main)│
//!                 └────────┬─────────┘
//!                          │ spawns
//!                 ┌────────▼─────────┐   commands (mpsc)   ┌─────────────┐
//!                 │  MonitorActor    │◄────────────────────┤  HTTP API   │
//!                 │  (tick pipeline) ├────────────────────►│  handlers   │
//!                 └───┬──────────┬───┘  snapshots (watch)  └─────────────┘
//!                     │          │
//!       TickEvent     │          │ fetch
//!      (broadcast)    │          ▼
//!                     │    ┌─────────────┐
//!                     │    │ TileSource  │
//!                     │    └─────────────┘
//!              ┌──────▼───────┐
//!              │  AlertActor  │
//!              └──────────────┘
//! ```
//!
//! ## Actor Types
//!
//! - **MonitorActor**: Runs the fetch/stitch/diff/classify pipeline on a schedule
//! - **AlertActor**: Sends notifications when the severity changes
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Events**: Tick results are broadcast for fan-out
//! 3. **State**: The monitor publishes immutable snapshots on a watch channel
//! 4. **Request/Response**: oneshot channels for commands that can fail

pub mod alert;
pub mod messages;
pub mod monitor;
