//! Consistent response envelope for all API endpoints.
//!
//! Every JSON response is wrapped in either [`ApiResponse`] (success) or
//! [`ApiErrorResponse`] (error), ensuring a uniform shape with an explicit
//! `success` flag.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use crate::ml_engine::{ServiceError, TrainError};

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: "1",
        }
    }
}

/// Successful response: `{ "success": true, "data": T, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        let body = Self {
            success: true,
            data,
            meta: ResponseMeta::default(),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Error detail inside [`ApiErrorResponse`].
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Error response: `{ "success": false, "error": { "code", "message" }, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn build(status: StatusCode, code: &str, msg: impl Into<String>) -> Response {
        let body = Self {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: msg.into(),
            },
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
    }

    pub fn not_ready(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::SERVICE_UNAVAILABLE, "NOT_READY", msg)
    }

    pub fn classification_error(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, "CLASSIFICATION_ERROR", msg)
    }

    pub fn dataset_not_found(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::SERVICE_UNAVAILABLE, "DATASET_NOT_FOUND", msg)
    }

    pub fn schema_mismatch(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_MISMATCH", msg)
    }

    pub fn retrain_in_progress(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::CONFLICT, "RETRAIN_IN_PROGRESS", msg)
    }

    pub fn training_failed(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, "TRAINING_FAILED", msg)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let msg = self.to_string();
        match &self {
            ServiceError::NotReady => ApiErrorResponse::not_ready(msg),
            ServiceError::RetrainInProgress => ApiErrorResponse::retrain_in_progress(msg),
            ServiceError::InvalidPayload => ApiErrorResponse::bad_request(msg),
            ServiceError::Classification(e) => {
                tracing::error!(error = %e, "Classification failed");
                ApiErrorResponse::classification_error("classification failed")
            }
            ServiceError::Training(e) => match e {
                TrainError::DataUnavailable(_) => ApiErrorResponse::dataset_not_found(msg),
                TrainError::Schema(_) | TrainError::Imputation(_) | TrainError::TooFewRows(_) => {
                    ApiErrorResponse::schema_mismatch(msg)
                }
                TrainError::Fit(_) | TrainError::Config(_) => {
                    tracing::error!(error = %e, "Training failed");
                    ApiErrorResponse::training_failed("training failed, see server log for details")
                }
            },
        }
    }
}
