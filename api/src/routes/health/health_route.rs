//! GET /health: backend reachability and memory stats.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{app::app_state::AppState, routes::health::health_response::HealthResponse};

/// Handler: GET /health
///
/// Always 200; unreachable backends are reported in the body.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends = match &state.profiles {
        Some(profiles) => profiles.health_all().await,
        None => Vec::new(),
    };
    let status = if backends.iter().all(|b| b.ok) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        memory_enabled: state.memory_enabled,
        conversations: state.context.memory().len().await,
        backends,
    })
}
