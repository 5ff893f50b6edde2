//! Monitor status endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::StatusResponse};

/// GET /api/v1/status
///
/// Returns the latest published snapshot: phase, last result, counters
pub async fn get_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let snapshot = state.monitor.snapshot();
    Json(StatusResponse::from(snapshot.as_ref()))
}
