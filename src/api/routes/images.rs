//! PNG renditions of the last successful tick

use std::io::Cursor;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use image::{EncodableLayout, ImageBuffer, ImageFormat, Pixel, PixelWithColorType};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};

/// GET /api/v1/images/diff.png
pub async fn get_diff_image(State(state): State<ApiState>) -> ApiResult<Response> {
    let snapshot = state.monitor.snapshot();
    let latest = snapshot
        .latest
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("no tick has completed yet".to_string()))?;

    png_response(&latest.diff)
}

/// GET /api/v1/images/live.png
///
/// The live crop with everything outside the template's footprint blanked out
pub async fn get_live_image(State(state): State<ApiState>) -> ApiResult<Response> {
    let snapshot = state.monitor.snapshot();
    let latest = snapshot
        .latest
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("no tick has completed yet".to_string()))?;

    png_response(&latest.live)
}

fn png_response<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>) -> ApiResult<Response>
where
    P: Pixel + PixelWithColorType,
    [P::Subpixel]: EncodableLayout,
{
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ApiError::Internal(format!("failed to encode PNG: {e}")))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
