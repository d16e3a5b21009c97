//! ML Engine for gas-sensor spoilage classification
//!
//! Owns the model lifecycle: derive a feature schema from a dataset, learn
//! imputation means, fit and evaluate the classifier, keep the active model
//! and serve single-sample inference through the exact schema and means the
//! model was trained with.
//!
//! ## Architecture
//! - `schema`: target/auxiliary exclusion and sensor allow-list ordering
//! - `imputer`: per-feature mean fill fitted on the training partition
//! - `forest`: `Classifier` trait and the random forest implementation
//! - `metrics`: accuracy, per-class precision/recall/F1, confusion matrix
//! - `trainer`: split, fit, evaluate and noise-robustness pipeline
//! - `model`: the immutable trained bundle
//! - `registry`: process-wide active model with non-blocking retrain guard
//! - `inference`: payload to schema-ordered row to classification

pub mod schema;
pub mod imputer;
pub mod forest;
pub mod metrics;
pub mod trainer;
pub mod model;
pub mod registry;
pub mod inference;

use thiserror::Error;

// Re-export public types
pub use schema::{SchemaDeriver, SchemaError};
pub use imputer::{ImputeError, MeanImputer};
pub use forest::{Classifier, FitError, RandomForest};
pub use trainer::{TrainError, Trainer};
pub use model::{ModelSummary, PredictError, Prediction, TrainedModel};
pub use registry::ModelRegistry;
pub use inference::{classify, classify_value};

/// Errors surfaced by the model lifecycle to its callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("model is not trained yet")]
    NotReady,

    #[error("a retrain is already in progress")]
    RetrainInProgress,

    #[error(transparent)]
    Training(#[from] TrainError),

    #[error("payload must be a JSON object of feature values")]
    InvalidPayload,

    #[error("classification failed: {0}")]
    Classification(#[from] PredictError),
}
