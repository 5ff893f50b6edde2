//! Alpha-masked comparison between the reference template and the live crop
//!
//! ```text
//! template (RGBA) ─┐
//!                  ├─ |rgb(t) - rgb(l)| ── masked by alpha(t) > 0 ── visualization (RGB)
//! live (RGBA) ─────┘                                                     │
//!                                          non-black pixels / opaque pixels × 100
//! ```
//!
//! Pixels where the template is fully transparent are never counted and always
//! render black in the visualization.

use std::borrow::Cow;

use image::{Rgb, RgbImage, RgbaImage, imageops};
use serde::Serialize;

use crate::template::count_opaque;

/// Outcome of one comparison
#[derive(Debug, Clone)]
pub struct DiffResult {
    /// Share of monitored pixels that differ, in `[0, 100]`
    pub percentage: f64,

    /// Per-pixel RGB difference, black outside the monitored footprint
    pub visualization: RgbImage,

    pub stats: DiffStats,
}

/// Pixel counts behind a percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    /// Pixels with template alpha > 0 inside the compared area
    pub opaque_pixels: usize,

    /// Monitored pixels whose RGB differs
    pub differing_pixels: usize,
}

/// Compare `template` against `live`
///
/// When the sizes differ both images are cropped to their common top-left area.
/// A template without opaque pixels yields 0% and an all-black visualization.
pub fn compare(template: &RgbaImage, live: &RgbaImage) -> DiffResult {
    let width = template.width().min(live.width());
    let height = template.height().min(live.height());

    let template = common_area(template, width, height);
    let live = common_area(live, width, height);

    let opaque_pixels = count_opaque(&template);
    if opaque_pixels == 0 {
        return DiffResult {
            percentage: 0.0,
            visualization: RgbImage::new(width, height),
            stats: DiffStats {
                opaque_pixels: 0,
                differing_pixels: 0,
            },
        };
    }

    let mut visualization = RgbImage::new(width, height);
    let mut differing_pixels = 0;

    for (x, y, out) in visualization.enumerate_pixels_mut() {
        let t = template.get_pixel(x, y).0;
        if t[3] == 0 {
            continue;
        }

        let l = live.get_pixel(x, y).0;
        let delta = Rgb([t[0].abs_diff(l[0]), t[1].abs_diff(l[1]), t[2].abs_diff(l[2])]);
        if delta.0 != [0, 0, 0] {
            differing_pixels += 1;
        }
        *out = delta;
    }

    DiffResult {
        percentage: differing_pixels as f64 / opaque_pixels as f64 * 100.0,
        visualization,
        stats: DiffStats {
            opaque_pixels,
            differing_pixels,
        },
    }
}

/// Live crop with the template's transparent area blanked out, for display
pub fn mask_live(template: &RgbaImage, live: &RgbaImage) -> RgbaImage {
    let mut masked = RgbaImage::new(live.width(), live.height());
    for (x, y, out) in masked.enumerate_pixels_mut() {
        let inside = x < template.width() && y < template.height();
        if inside && template.get_pixel(x, y).0[3] > 0 {
            *out = *live.get_pixel(x, y);
        }
    }
    masked
}

fn common_area(image: &RgbaImage, width: u32, height: u32) -> Cow<'_, RgbaImage> {
    if image.dimensions() == (width, height) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::crop_imm(image, 0, 0, width, height).to_image())
    }
}
