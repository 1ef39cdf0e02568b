//! Liveness endpoint

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether an AI backend is available for insights
    pub ai_configured: bool,
}

/// GET /api/health - Liveness check, reachable without authentication
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ai_configured: state.ai.is_some(),
    })
}
