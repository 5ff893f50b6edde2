//! Composes fetched tiles into a single canvas

use image::{RgbaImage, imageops};
use tracing::{debug, trace};

use crate::error::{MonitorError, MonitorResult};
use crate::region::{CropRect, TileRange};

use super::fetcher::TileMap;

/// Paste every present tile of `range` onto a transparent canvas
///
/// Absent tiles stay fully transparent. Fails with `NoTileData` only when
/// no tile of the range is present at all.
pub fn stitch(range: &TileRange, tiles: &TileMap, tile_size: u32) -> MonitorResult<RgbaImage> {
    let present = range
        .tiles()
        .filter(|tile| matches!(tiles.get(tile), Some(Some(_))))
        .count();

    if present == 0 {
        return Err(MonitorError::NoTileData { tiles: range.tile_count() });
    }

    let (width, height) = range.canvas_size(tile_size);
    let mut canvas = RgbaImage::new(width, height);

    for tile in range.tiles() {
        let Some(Some(image)) = tiles.get(&tile) else {
            trace!("tile {tile} absent, leaving transparent");
            continue;
        };

        let (x, y) = range.paste_offset(tile, tile_size);
        imageops::replace(&mut canvas, image, x, y);
    }

    if present < range.tile_count() {
        debug!("stitched {present}/{} tiles", range.tile_count());
    }

    Ok(canvas)
}

/// Cut the monitored rectangle out of a stitched canvas
pub fn crop(canvas: &RgbaImage, rect: &CropRect) -> RgbaImage {
    imageops::crop_imm(canvas, rect.x1, rect.y1, rect.width(), rect.height()).to_image()
}
