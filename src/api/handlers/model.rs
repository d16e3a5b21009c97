//! Model endpoints: classify, retrain, summary

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::ServiceState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::ml_engine::inference;
use crate::types::EvaluationReport;

// ============================================================================
// Classification
// ============================================================================

/// POST /api/v1/classify - Classify one flat key/value sample
///
/// Values may be numbers or numeric strings; anything else, and any omitted
/// feature, is filled with the training mean.
pub async fn classify(
    State(state): State<ServiceState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };

    let model = match state.registry.active() {
        Ok(m) => m,
        Err(e) => return e.into_response(),
    };

    match inference::classify_value(&model, &payload) {
        Ok(result) => ApiResponse::ok(result),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Retraining
// ============================================================================

/// Result of a successful retrain
#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub model_generation: u64,
    pub trained_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: EvaluationReport,
}

/// POST /api/v1/retrain - Rerun the training pipeline and commit the result
///
/// Training runs on the blocking pool; classify requests keep using the
/// previous model until the commit.
pub async fn retrain(State(state): State<ServiceState>) -> Response {
    info!("Retrain requested");
    let registry = state.registry.clone();
    let trainer = state.trainer.clone();

    let outcome = tokio::task::spawn_blocking(move || registry.retrain(&trainer)).await;
    match outcome {
        Ok(Ok(model)) => ApiResponse::ok(RetrainResponse {
            model_generation: model.generation,
            trained_at: model.trained_at,
            report: model.report.clone(),
        }),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!(error = %e, "Retrain task panicked");
            ApiErrorResponse::training_failed("training task aborted")
        }
    }
}

// ============================================================================
// Model Summary
// ============================================================================

/// GET /api/v1/model - Evaluation report and imputation means of the active model
pub async fn get_model(State(state): State<ServiceState>) -> Response {
    match state.registry.active() {
        Ok(model) => ApiResponse::ok(model.summary()),
        Err(e) => e.into_response(),
    }
}
