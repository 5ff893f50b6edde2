//! Tile acquisition and stitching
//!
//! ## Design
//!
//! - **Trait-based**: `TileSource` allows swapping the HTTP backend for a fixture in tests
//! - **Never fails a tick on its own**: a tile that cannot be fetched is simply absent
//! - **Concurrent**: all tiles of one tick are requested in parallel, bounded by
//!   the configured concurrency, and joined before stitching

pub mod fetcher;
pub mod stitch;

pub use fetcher::{HttpTileFetcher, TileMap, TileSource, fetch_tiles};
pub use stitch::{crop, stitch};
