//! Tile coordinate arithmetic
//!
//! The remote canvas is an unbounded grid of square tiles. A monitored rectangle is
//! addressed by a tile plus an intra-tile offset and may straddle several tiles.
//! [`map_region`] works out which tiles have to be fetched and where the rectangle
//! lands once those tiles are stitched together.
//!
//! ```text
//!  global = tile * T + offset
//!
//!  start tile ─┐
//!              ▼
//!        ┌─────────┬─────────┐
//!        │  (5,5)  │  (6,5)  │
//!        │      ┌──┼──┐      │
//!        ├──────┼──┼──┼──────┤     crop rectangle is relative to the
//!        │  (5,6)└──┼──┘     │     top-left corner of the start tile
//!        │         │  (6,6)  │
//!        └─────────┴─────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Side length of one tile served by the canvas backend
pub const TILE_SIZE: u32 = 1000;

/// Largest accepted tile side length
pub const MAX_TILE_SIZE: u32 = 4096;

/// Largest accepted region width or height
pub const MAX_REGION_SIDE: u32 = 4096;

/// Address of one tile in the remote tiling scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub x: i64,
    pub y: i64,
}

impl TileCoordinate {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A tile coordinate plus a pixel offset inside that tile
///
/// Serialized as `[tile_x, tile_y, offset_x, offset_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct GlobalAnchor {
    pub tile_x: i64,
    pub tile_y: i64,
    pub offset_x: i64,
    pub offset_y: i64,
}

impl GlobalAnchor {
    pub const fn new(tile_x: i64, tile_y: i64, offset_x: i64, offset_y: i64) -> Self {
        Self {
            tile_x,
            tile_y,
            offset_x,
            offset_y,
        }
    }

    /// Global pixel coordinate of the anchor, `None` if it does not fit an `i64`
    pub fn global(&self, tile_size: u32) -> Option<(i64, i64)> {
        let t = i64::from(tile_size);
        let x = self.tile_x.checked_mul(t)?.checked_add(self.offset_x)?;
        let y = self.tile_y.checked_mul(t)?.checked_add(self.offset_y)?;
        Some((x, y))
    }
}

impl From<[i64; 4]> for GlobalAnchor {
    fn from([tile_x, tile_y, offset_x, offset_y]: [i64; 4]) -> Self {
        Self::new(tile_x, tile_y, offset_x, offset_y)
    }
}

impl From<GlobalAnchor> for [i64; 4] {
    fn from(anchor: GlobalAnchor) -> Self {
        [anchor.tile_x, anchor.tile_y, anchor.offset_x, anchor.offset_y]
    }
}

impl fmt::Display for GlobalAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.tile_x, self.tile_y, self.offset_x, self.offset_y
        )
    }
}

/// The rectangle extracted and compared on every tick
///
/// Only constructible through [`MonitorRegion::new`], so width and height are
/// always within `1..=MAX_REGION_SIDE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorRegion {
    pub anchor: GlobalAnchor,
    width: u32,
    height: u32,
}

impl MonitorRegion {
    pub fn new(anchor: GlobalAnchor, width: i64, height: i64) -> MonitorResult<Self> {
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(MonitorError::InvalidRegion { width, height });
        };
        if !(1..=MAX_REGION_SIDE).contains(&w) || !(1..=MAX_REGION_SIDE).contains(&h) {
            return Err(MonitorError::InvalidRegion { width, height });
        }

        Ok(Self {
            anchor,
            width: w,
            height: h,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tiles and crop rectangle for this region
    pub fn map(&self, tile_size: u32) -> MonitorResult<RegionMapping> {
        mapping_for(self.anchor, self.width, self.height, tile_size)
    }
}

/// Inclusive rectangle of tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileRange {
    pub start: TileCoordinate,
    pub end: TileCoordinate,
}

impl TileRange {
    pub fn columns(&self) -> u32 {
        (self.end.x - self.start.x + 1) as u32
    }

    pub fn rows(&self) -> u32 {
        (self.end.y - self.start.y + 1) as u32
    }

    pub fn tile_count(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Every tile in the range, column by column
    pub fn tiles(&self) -> impl Iterator<Item = TileCoordinate> + use<> {
        let TileRange { start, end } = *self;
        (start.x..=end.x).flat_map(move |x| (start.y..=end.y).map(move |y| TileCoordinate::new(x, y)))
    }

    /// Pixel size of the canvas the range stitches into
    pub fn canvas_size(&self, tile_size: u32) -> (u32, u32) {
        (self.columns() * tile_size, self.rows() * tile_size)
    }

    /// Pixel position of a tile's top-left corner inside the stitched canvas
    pub fn paste_offset(&self, tile: TileCoordinate, tile_size: u32) -> (i64, i64) {
        let t = i64::from(tile_size);
        ((tile.x - self.start.x) * t, (tile.y - self.start.y) * t)
    }
}

/// Crop rectangle `[x1, x2) x [y1, y2)` inside the stitched canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Result of mapping a region onto the tile grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionMapping {
    pub tiles: TileRange,
    pub crop: CropRect,
}

/// Compute the tiles covering `[global, global + size)` and the crop rectangle
/// relative to the first tile's origin
pub fn map_region(
    anchor: GlobalAnchor,
    width: i64,
    height: i64,
    tile_size: u32,
) -> MonitorResult<RegionMapping> {
    let region = MonitorRegion::new(anchor, width, height)?;
    region.map(tile_size)
}

/// Check a tile size before any coordinate is divided by it
pub fn validate_tile_size(tile_size: u32) -> MonitorResult<()> {
    if !(1..=MAX_TILE_SIZE).contains(&tile_size) {
        return Err(MonitorError::InvalidSettings(format!(
            "tile size {tile_size} must be within 1..={MAX_TILE_SIZE}"
        )));
    }
    Ok(())
}

fn mapping_for(
    anchor: GlobalAnchor,
    width: u32,
    height: u32,
    tile_size: u32,
) -> MonitorResult<RegionMapping> {
    validate_tile_size(tile_size)?;

    let out_of_range = || MonitorError::RegionOutOfRange { anchor };
    let t = i64::from(tile_size);
    let (gx, gy) = anchor.global(tile_size).ok_or_else(out_of_range)?;
    let last_x = gx.checked_add(i64::from(width) - 1).ok_or_else(out_of_range)?;
    let last_y = gy.checked_add(i64::from(height) - 1).ok_or_else(out_of_range)?;

    // div_euclid floors, so anchors left of or above the origin still land in the right tile
    let start = TileCoordinate::new(gx.div_euclid(t), gy.div_euclid(t));
    let end = TileCoordinate::new(last_x.div_euclid(t), last_y.div_euclid(t));

    // both below tile_size, and tile_size and the region sides are bounded
    let x1 = gx.rem_euclid(t) as u32;
    let y1 = gy.rem_euclid(t) as u32;

    Ok(RegionMapping {
        tiles: TileRange { start, end },
        crop: CropRect {
            x1,
            y1,
            x2: x1 + width,
            y2: y1 + height,
        },
    })
}
