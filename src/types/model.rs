//! Model-facing types: feature schema, inference payloads and evaluation reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DatasetOrigin;

/// Ordered feature names plus the target column, fixed at training time.
///
/// Every row fed to the imputer or the classifier is laid out in
/// `features` order, for training and for inference alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub features: Vec<String>,
    pub target: String,
}

impl FeatureSchema {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// A schema-ordered row before imputation. `None` is the missing sentinel.
pub type FeatureRow = Vec<Option<f64>>;

/// One field of an external classify payload, after tagging but before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawField {
    Number(f64),
    Text(String),
    Missing,
}

impl RawField {
    /// Numeric value if the field is a finite number or numeric text.
    pub fn coerce(&self) -> Option<f64> {
        match self {
            RawField::Number(v) if v.is_finite() => Some(*v),
            RawField::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for RawField {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map_or(RawField::Missing, RawField::Number),
            serde_json::Value::String(s) => RawField::Text(s.clone()),
            _ => RawField::Missing,
        }
    }
}

/// Result of classifying a single sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Predicted class label
    pub label: String,
    /// Probability per known class, when the classifier supports it
    pub probabilities: Option<BTreeMap<String, f64>>,
    /// Active schema, in order
    pub expected_features: Vec<String>,
    /// Payload keys matched to the schema, in schema order
    pub received_features: Vec<String>,
    /// Schema features that fell back to the training mean
    pub imputed_features: Vec<String>,
    /// Payload keys not part of the schema
    pub ignored_features: Vec<String>,
    /// Generation of the model that produced this result
    pub model_generation: u64,
}

/// Precision/recall/F1 for one class on the held-out partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Macro or support-weighted average over classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Row counts for one training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    /// Rows read from the dataset
    pub total: usize,
    /// Rows in the training partition
    pub train: usize,
    /// Rows in the held-out partition
    pub test: usize,
    /// Rows dropped because the target was missing
    pub dropped: usize,
}

/// Metrics computed once per training run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub train_score: f64,
    pub test_score: f64,
    /// Held-out accuracy after Gaussian perturbation of the features
    pub noisy_score: f64,
    pub noise_std_dev: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// Rows are true classes, columns predicted classes, both in `classes` order
    pub confusion_matrix: Vec<Vec<usize>>,
    pub classes: Vec<String>,
    pub features: Vec<String>,
    pub samples: SampleCounts,
    pub dataset: Option<DatasetOrigin>,
}
