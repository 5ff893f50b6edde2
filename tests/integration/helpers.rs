//! Test helpers: an in-memory canvas and template files on disk

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tempfile::TempDir;
use tile_watch::{
    GlobalAnchor, MonitorConfig, MonitorHandle, MonitorSettings, SeverityLevel, ThresholdTable,
    TileCoordinate, history::RetentionPolicy, tiles::TileSource,
};

/// Tile edge length used throughout the integration tests
pub const TILE: u32 = 10;

pub const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);
pub const BLUE: Rgba<u8> = Rgba([20, 20, 220, 255]);

/// In-memory canvas served tile by tile
///
/// Pixels are addressed globally; tiles that were never painted are absent.
#[derive(Default)]
pub struct FakeCanvas {
    tiles: std::sync::Mutex<HashMap<TileCoordinate, RgbaImage>>,
    requests: AtomicUsize,
}

impl FakeCanvas {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Paint a global rectangle, creating tiles as needed
    pub fn fill(&self, x: i64, y: i64, width: u32, height: u32, color: Rgba<u8>) {
        let mut tiles = self.tiles.lock().unwrap();
        for gy in y..y + i64::from(height) {
            for gx in x..x + i64::from(width) {
                let tile = TileCoordinate::new(gx.div_euclid(TILE as i64), gy.div_euclid(TILE as i64));
                let image = tiles
                    .entry(tile)
                    .or_insert_with(|| RgbaImage::new(TILE, TILE));
                image.put_pixel(
                    gx.rem_euclid(TILE as i64) as u32,
                    gy.rem_euclid(TILE as i64) as u32,
                    color,
                );
            }
        }
    }

    pub fn put(&self, x: i64, y: i64, color: Rgba<u8>) {
        self.fill(x, y, 1, 1, color);
    }

    pub fn remove_tile(&self, tile: TileCoordinate) {
        self.tiles.lock().unwrap().remove(&tile);
    }

    pub fn clear(&self) {
        self.tiles.lock().unwrap().clear();
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileSource for FakeCanvas {
    async fn fetch(&self, tile: TileCoordinate) -> Option<RgbaImage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.tiles.lock().unwrap().get(&tile).cloned()
    }
}

/// Template files live as long as this guard
pub struct TemplateDir {
    pub dir: TempDir,
}

impl TemplateDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write(&self, name: &str, image: &RgbaImage) -> PathBuf {
        let path = self.dir.path().join(name);
        image.save(&path).unwrap();
        path
    }
}

/// 4x4 fully opaque red template
pub fn solid_template() -> RgbaImage {
    RgbaImage::from_pixel(4, 4, RED)
}

/// Levels used by the integration tests
pub fn low_high() -> ThresholdTable {
    ThresholdTable::new(vec![
        SeverityLevel::new("low", 5.0),
        SeverityLevel::new("high", 50.0),
    ])
}

/// Region anchored at global (8, 8), so a 4x4 region straddles four tiles
pub fn straddling_config(template: PathBuf) -> MonitorConfig {
    MonitorConfig {
        reference_image_path: template,
        template_crop: None,
        anchor: GlobalAnchor::new(0, 0, 8, 8),
        size: None,
        poll_interval_secs: 1,
        thresholds: low_high(),
    }
}

pub fn settings() -> MonitorSettings {
    MonitorSettings {
        tile_size: TILE,
        fetch_concurrency: 2,
        retention: RetentionPolicy::Count { max_points: 50 },
    }
}

pub fn spawn_monitor(canvas: &Arc<FakeCanvas>) -> MonitorHandle {
    MonitorHandle::spawn(settings(), canvas.clone())
}
