//! API route definitions
//!
//! - /api/v1/health - Readiness and active feature list
//! - /api/v1/classify - Single-sample classification
//! - /api/v1/retrain - Rerun the training pipeline
//! - /api/v1/model - Active model summary and evaluation report

use axum::{routing::{get, post}, Router};

use super::handlers::{self, ServiceState};

/// Create all versioned API routes
pub fn api_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/classify", post(handlers::classify))
        .route("/retrain", post(handlers::retrain))
        .route("/model", get(handlers::get_model))
        .with_state(state)
}

/// Banner and unversioned health endpoint at root level
pub fn root_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::get_health))
        .with_state(state)
}
