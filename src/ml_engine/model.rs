//! The immutable trained bundle served to inference.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::forest::{Classifier, FitError};
use super::imputer::{ImputeError, MeanImputer};
use crate::types::{EvaluationReport, FeatureRow, FeatureSchema};

/// Classifier, schema and imputation parameters from one training run.
///
/// Never mutated after commit; shared as `Arc<TrainedModel>`.
#[derive(Debug)]
pub struct TrainedModel {
    pub schema: FeatureSchema,
    pub imputer: MeanImputer,
    pub classifier: Box<dyn Classifier>,
    /// Class labels indexed by the classifier's dense class ids
    pub classes: Vec<String>,
    pub report: EvaluationReport,
    /// Assigned by the registry on commit, 0 before that
    pub generation: u64,
    pub trained_at: DateTime<Utc>,
}

/// Label and optional class probabilities for one imputed row.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probabilities: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Impute(#[from] ImputeError),

    #[error(transparent)]
    Classifier(#[from] FitError),

    #[error("classifier returned unknown class index {0}")]
    UnknownClass(usize),
}

impl TrainedModel {
    /// Impute a schema-ordered row and classify it.
    pub fn predict(&self, row: &FeatureRow) -> Result<Prediction, PredictError> {
        let imputed = self.imputer.apply_row(row)?;
        let class = self.classifier.predict(&imputed)?;
        let label = self
            .classes
            .get(class)
            .cloned()
            .ok_or(PredictError::UnknownClass(class))?;

        let probabilities = self.classifier.predict_proba(&imputed).map(|p| {
            self.classes
                .iter()
                .cloned()
                .zip(p)
                .collect::<BTreeMap<_, _>>()
        });

        Ok(Prediction {
            label,
            probabilities,
        })
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            generation: self.generation,
            trained_at: self.trained_at,
            classes: self.classes.clone(),
            features: self.schema.features.clone(),
            target: self.schema.target.clone(),
            imputation_means: self
                .schema
                .features
                .iter()
                .cloned()
                .zip(self.imputer.means().iter().copied())
                .collect(),
            report: self.report.clone(),
        }
    }
}

/// Serializable view of the active model. NaN means serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub generation: u64,
    pub trained_at: DateTime<Utc>,
    pub classes: Vec<String>,
    pub features: Vec<String>,
    pub target: String,
    pub imputation_means: BTreeMap<String, f64>,
    pub report: EvaluationReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::ml_engine::Trainer;
    use crate::types::{CellValue, Dataset};

    /// Always predicts the last class with fixed probabilities.
    #[derive(Debug)]
    struct Fixed(Vec<f64>);

    impl Classifier for Fixed {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[usize], _n: usize) -> Result<(), FitError> {
            Ok(())
        }

        fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, FitError> {
            Ok(vec![self.0.len() - 1; x.len()])
        }

        fn predict_proba(&self, _x: &[f64]) -> Option<Vec<f64>> {
            Some(self.0.clone())
        }
    }

    fn trained() -> TrainedModel {
        let columns = vec!["MQ2A".to_string(), "output".to_string()];
        let rows = (0..20)
            .map(|i| vec![CellValue::Number(f64::from(i)), CellValue::Number(f64::from(i % 2))])
            .collect();
        let mut config = ServiceConfig::default();
        config.forest.n_estimators = 3;
        Trainer::new(&config).train(&Dataset::new(columns, rows)).unwrap()
    }

    #[test]
    fn test_probabilities_keyed_by_class() {
        let mut model = trained();
        model.classifier = Box::new(Fixed(vec![0.25, 0.75]));
        let prediction = model.predict(&vec![None]).unwrap();
        assert_eq!(prediction.label, "1");
        let probs = prediction.probabilities.unwrap();
        assert_eq!(probs.get("0"), Some(&0.25));
        assert_eq!(probs.get("1"), Some(&0.75));
    }

    #[test]
    fn test_unknown_class_index() {
        let mut model = trained();
        model.classifier = Box::new(Fixed(vec![0.1, 0.2, 0.7]));
        assert!(matches!(
            model.predict(&vec![Some(3.0)]),
            Err(PredictError::UnknownClass(2))
        ));
    }

    #[test]
    fn test_forest_model_has_no_probabilities() {
        let prediction = trained().predict(&vec![Some(4.0)]).unwrap();
        assert!(prediction.probabilities.is_none());
    }
}
