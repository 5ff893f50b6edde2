//! Difference history endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::HistoryResponse};

/// GET /api/v1/history
///
/// Returns the retained `(elapsed_secs, percentage)` points, oldest first
pub async fn get_history(State(state): State<ApiState>) -> Json<HistoryResponse> {
    let snapshot = state.monitor.snapshot();

    Json(HistoryResponse {
        policy: state.retention,
        count: snapshot.history.len(),
        points: snapshot.history.to_vec(),
    })
}
