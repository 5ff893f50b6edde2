//! Health check endpoint

use axum::{Json, extract::State};

use crate::actors::messages::MonitorPhase;
use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// The process is healthy as long as the monitor actor publishes state.
/// `degraded` means the last reconfiguration was rejected.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let snapshot = state.monitor.snapshot();

    let status = match snapshot.phase {
        MonitorPhase::Faulted => "degraded",
        _ => "ok",
    };

    Json(HealthResponse {
        status: status.to_string(),
        phase: snapshot.phase,
        alerts_enabled: state.alerts.is_some(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
