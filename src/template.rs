//! Reference template loading
//!
//! The template is an RGBA image whose alpha channel marks the monitored footprint:
//! only pixels with alpha > 0 take part in the comparison, so an irregular watermark
//! can be watched without its bounding box.

use std::path::{Path, PathBuf};

use image::{RgbaImage, imageops};
use tracing::{debug, warn};

use crate::error::{MonitorError, MonitorResult};

/// Decoded reference template plus cached footprint statistics
#[derive(Debug, Clone)]
pub struct ReferenceTemplate {
    image: RgbaImage,
    path: PathBuf,
    opaque_pixels: usize,
}

impl ReferenceTemplate {
    /// Wrap an already decoded image
    pub fn from_image(image: RgbaImage, path: impl Into<PathBuf>) -> Self {
        let opaque_pixels = count_opaque(&image);
        Self {
            image,
            path: path.into(),
            opaque_pixels,
        }
    }

    /// Load a template from disk, optionally cropping it to `[x1, y1, x2, y2]`
    ///
    /// Relative paths are resolved against the directory of the running executable.
    pub async fn load(path: &Path, crop_box: Option<[u32; 4]>) -> MonitorResult<Self> {
        let resolved = resolve_path(path);
        let fail = |reason: String| MonitorError::TemplateLoad {
            path: resolved.clone(),
            reason,
        };

        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let mut image = image::load_from_memory(&bytes)
            .map_err(|e| fail(e.to_string()))?
            .to_rgba8();

        if let Some([x1, y1, x2, y2]) = crop_box {
            if x2 <= x1 || y2 <= y1 || x2 > image.width() || y2 > image.height() {
                return Err(fail(format!(
                    "crop box [{x1}, {y1}, {x2}, {y2}] outside {}x{} image",
                    image.width(),
                    image.height()
                )));
            }
            image = imageops::crop_imm(&image, x1, y1, x2 - x1, y2 - y1).to_image();
        }

        let template = Self::from_image(image, resolved);

        debug!(
            "loaded reference template {}: {} pixels total, {} monitored",
            template.path.display(),
            template.total_pixels(),
            template.opaque_pixels
        );
        if template.is_degenerate() {
            warn!("reference template has no opaque pixels, every comparison will report 0%");
        }

        Ok(template)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn total_pixels(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize
    }

    /// Number of pixels in the monitored footprint
    pub fn opaque_pixels(&self) -> usize {
        self.opaque_pixels
    }

    pub fn is_degenerate(&self) -> bool {
        self.opaque_pixels == 0
    }
}

pub(crate) fn count_opaque(image: &RgbaImage) -> usize {
    image.pixels().filter(|p| p.0[3] > 0).count()
}

fn resolve_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let base = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok());

    match base {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
