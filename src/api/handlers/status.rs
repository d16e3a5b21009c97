//! Banner and health endpoints

use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ServiceState;
use crate::api::envelope::ApiResponse;

/// GET / - Plain-text banner
pub async fn root() -> &'static str {
    "Food Spoilage Detection"
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// Readiness and the feature list the active model expects
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// True once a model has been committed
    pub ready: bool,
    /// Active schema in order, empty when not ready
    pub features: Vec<String>,
    pub classes: Vec<String>,
    pub model_generation: u64,
    pub trained_at: Option<DateTime<Utc>>,
    pub uptime_seconds: u64,
}

pub fn build_health(state: &ServiceState) -> HealthResponse {
    let uptime_seconds = state.started_at.elapsed().as_secs();
    match state.registry.active() {
        Ok(model) => HealthResponse {
            status: "ok",
            ready: true,
            features: model.schema.features.clone(),
            classes: model.classes.clone(),
            model_generation: model.generation,
            trained_at: Some(model.trained_at),
            uptime_seconds,
        },
        Err(_) => HealthResponse {
            status: "ok",
            ready: false,
            features: Vec::new(),
            classes: Vec::new(),
            model_generation: 0,
            trained_at: None,
            uptime_seconds,
        },
    }
}

/// GET /health, GET /api/v1/health
pub async fn get_health(State(state): State<ServiceState>) -> Response {
    ApiResponse::ok(build_health(&state))
}
