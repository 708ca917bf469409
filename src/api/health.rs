//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Service status with the active wake phrases
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// First configured phrase
    pub model: String,
    pub models: Vec<String>,
}

/// Minimal liveness response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .with_state(state)
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let models = state.phrases().to_vec();
    Json(StatusResponse {
        status: "running",
        service: "wake-word-detection",
        model: models.first().cloned().unwrap_or_default(),
        models,
    })
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
