//! Reconfiguration and lifecycle endpoints

use std::path::{Component, Path};
use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use tracing::{info, warn};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{IntervalRequest, StatusResponse, TickResponse},
};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::threshold::ThresholdTable;

/// POST /api/v1/config
///
/// Validates and applies a complete monitor configuration. A rejected
/// configuration leaves the previous one running and answers 400.
pub async fn apply_config(
    State(state): State<ApiState>,
    Json(config): Json<MonitorConfig>,
) -> ApiResult<Json<StatusResponse>> {
    info!("reconfiguring from API");
    check_reference_path(&config.reference_image_path, state.template_dir.as_deref())?;

    state.monitor.configure(config).await.map_err(|e| {
        match e.downcast_ref::<MonitorError>() {
            // the resolved path and IO reason stay in the server log
            Some(MonitorError::TemplateLoad { .. }) => {
                warn!("{e:#}");
                ApiError::InvalidRequest("failed to load reference template".to_string())
            }
            _ => ApiError::from(e),
        }
    })?;

    let snapshot = state.monitor.snapshot();
    Ok(Json(StatusResponse::from(snapshot.as_ref())))
}

/// Relative paths resolve next to the executable; absolute ones must lie in the
/// template directory, and neither may climb out with `..`
fn check_reference_path(path: &Path, template_dir: Option<&Path>) -> ApiResult<()> {
    let climbs = path.components().any(|c| matches!(c, Component::ParentDir));
    let outside = path.is_absolute() && !template_dir.is_some_and(|dir| path.starts_with(dir));

    if climbs || outside {
        warn!("rejecting reference template path {}", path.display());
        return Err(ApiError::InvalidRequest(
            "reference template path must be relative or inside the template directory"
                .to_string(),
        ));
    }

    Ok(())
}

/// PUT /api/v1/thresholds
pub async fn put_thresholds(
    State(state): State<ApiState>,
    Json(thresholds): Json<ThresholdTable>,
) -> ApiResult<StatusCode> {
    state.monitor.update_thresholds(thresholds).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/interval
///
/// Intervals below the 500 ms floor are raised to it
pub async fn put_interval(
    State(state): State<ApiState>,
    Json(request): Json<IntervalRequest>,
) -> ApiResult<StatusCode> {
    if !request.seconds.is_finite() || request.seconds <= 0.0 {
        return Err(ApiError::InvalidRequest(
            "interval must be a positive number of seconds".to_string(),
        ));
    }

    let interval = Duration::try_from_secs_f64(request.seconds)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    state.monitor.update_interval(interval).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/control/start
pub async fn start(State(state): State<ApiState>) -> ApiResult<StatusCode> {
    state.monitor.start().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/control/stop
pub async fn stop(State(state): State<ApiState>) -> ApiResult<StatusCode> {
    state.monitor.stop().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/control/reset-history
pub async fn reset_history(State(state): State<ApiState>) -> ApiResult<StatusCode> {
    state.monitor.reset_history().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/control/tick
///
/// Runs one tick outside the schedule and returns its result
pub async fn tick(State(state): State<ApiState>) -> ApiResult<Json<TickResponse>> {
    let outcome = state.monitor.tick_now().await?;
    Ok(Json(outcome.into()))
}
