//! Tile retrieval from the remote canvas backend

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use image::RgbaImage;
use tracing::{instrument, trace, warn};

use crate::error::MonitorError;
use crate::region::{TileCoordinate, TileRange};

/// Fetched tiles of one tick; `None` marks a tile that could not be retrieved
pub type TileMap = HashMap<TileCoordinate, Option<RgbaImage>>;

/// Anything that can produce the raster for a tile coordinate
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Retrieve one tile
    ///
    /// Implementations never fail past this boundary: any transport or decode
    /// problem is logged and reported as an absent tile.
    async fn fetch(&self, tile: TileCoordinate) -> Option<RgbaImage>;
}

/// Fetches tiles as `<base>/<x>/<y>.png`
pub struct HttpTileFetcher {
    /// HTTP client (reused across requests)
    client: reqwest::Client,

    /// Base URL without trailing slash
    base_url: String,
}

impl HttpTileFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tile_url(&self, tile: TileCoordinate) -> String {
        format!("{}/{}/{}.png", self.base_url, tile.x, tile.y)
    }

    async fn fetch_tile(&self, tile: TileCoordinate) -> Result<RgbaImage, MonitorError> {
        let url = self.tile_url(tile);
        let fail = |reason: String| MonitorError::TileFetch { tile, reason };

        trace!("requesting tile from {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(fail(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fail(format!("failed to read body: {e}")))?;

        let image = image::load_from_memory(&body)
            .map_err(|e| fail(format!("failed to decode image: {e}")))?;

        Ok(image.to_rgba8())
    }
}

#[async_trait]
impl TileSource for HttpTileFetcher {
    #[instrument(skip(self), fields(tile = %tile))]
    async fn fetch(&self, tile: TileCoordinate) -> Option<RgbaImage> {
        match self.fetch_tile(tile).await {
            Ok(image) => {
                trace!("decoded {}x{} tile", image.width(), image.height());
                Some(image)
            }
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }
}

/// Fetch every tile of `range` with at most `concurrency` requests in flight
///
/// Returns once all requests have completed; completion order does not matter
/// because the result is keyed by coordinate.
pub async fn fetch_tiles(source: &dyn TileSource, range: &TileRange, concurrency: usize) -> TileMap {
    stream::iter(range.tiles())
        .map(|tile| async move { (tile, source.fetch(tile).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
