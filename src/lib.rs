//! Spoilage Sense: gas-sensor food spoilage classification
//!
//! Trains a random forest on MQ-series gas sensor readings and serves
//! single-sample classification over HTTP.
//!
//! ## Architecture
//!
//! - **Dataset Loader**: XLSX workbook first, CSV fallback
//! - **ML Engine**: schema derivation, mean imputation, random forest,
//!   evaluation and the process-wide model registry
//! - **API**: axum router for health, classify, retrain and model summary

pub mod config;
pub mod types;
pub mod dataset;
pub mod ml_engine;
pub mod api;

// Re-export service configuration
pub use config::ServiceConfig;

// Re-export commonly used types
pub use types::{
    CellValue, Classification, Dataset, EvaluationReport, FeatureSchema, RawField,
};

// Re-export the model lifecycle
pub use dataset::{DatasetError, DatasetLoader};
pub use ml_engine::{ModelRegistry, ServiceError, TrainedModel, Trainer};
