//! Alert muting endpoints

use axum::{extract::State, http::StatusCode};
use tracing::info;

use crate::actors::alert::AlertHandle;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};

fn alerts(state: &ApiState) -> ApiResult<&AlertHandle> {
    state
        .alerts
        .as_ref()
        .ok_or_else(|| ApiError::Conflict("alerting is not configured".to_string()))
}

/// POST /api/v1/alerts/mute
pub async fn mute(State(state): State<ApiState>) -> ApiResult<StatusCode> {
    info!("muting alerts from API");
    alerts(&state)?.mute().await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/alerts/unmute
pub async fn unmute(State(state): State<ApiState>) -> ApiResult<StatusCode> {
    info!("unmuting alerts from API");
    alerts(&state)?.unmute().await;
    Ok(StatusCode::NO_CONTENT)
}
