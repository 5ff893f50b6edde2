//! REST API over the monitor's published state
//!
//! Handlers only read the latest snapshot or forward a command to the monitor
//! actor; no handler touches pipeline state directly.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Actor handle** for snapshots and commands
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/status` - Phase, latest result and counters
//! - `GET /api/v1/history` - Retained difference history
//! - `GET /api/v1/images/diff.png` - Difference visualization of the last tick
//! - `GET /api/v1/images/live.png` - Masked live crop of the last tick
//! - `POST /api/v1/config` - Replace the monitor configuration
//! - `PUT /api/v1/thresholds` - Replace the severity levels
//! - `PUT /api/v1/interval` - Change the poll interval
//! - `POST /api/v1/control/{start,stop,reset-history,tick}` - Lifecycle control
//! - `POST /api/v1/alerts/{mute,unmute}` - Silence or resume notifications

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{HealthResponse, HistoryResponse, StatusResponse, TickResponse};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiSettings;

/// Build the router with all routes
pub fn router(state: ApiState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/history", get(routes::history::get_history))
        .route("/api/v1/images/diff.png", get(routes::images::get_diff_image))
        .route("/api/v1/images/live.png", get(routes::images::get_live_image))
        .route("/api/v1/config", post(routes::control::apply_config))
        .route("/api/v1/thresholds", put(routes::control::put_thresholds))
        .route("/api/v1/interval", put(routes::control::put_interval))
        .route("/api/v1/control/start", post(routes::control::start))
        .route("/api/v1/control/stop", post(routes::control::stop))
        .route(
            "/api/v1/control/reset-history",
            post(routes::control::reset_history),
        )
        .route("/api/v1/control/tick", post(routes::control::tick))
        .route("/api/v1/alerts/mute", post(routes::alerts::mute))
        .route("/api/v1/alerts/unmute", post(routes::alerts::unmute))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(settings: &ApiSettings, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", settings.bind_addr);

    let app = router(state, settings.enable_cors);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {addr}");

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {e}");
        }
    });

    Ok(addr)
}
