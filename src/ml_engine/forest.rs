//! Random forest classifier.
//!
//! [`Classifier`] is the seam between the trainer and a learning algorithm.
//! [`RandomForest`] adapts smartcore's `RandomForestClassifier` to it:
//! rows arrive as `&[Vec<f64>]`, are packed into a row-major `DenseMatrix`,
//! and dense class indices travel as `i32` labels.
//!
//! Trees are grown with Gini impurity on bootstrap samples and the forest is
//! seeded from [`ForestConfig::seed`], so the same data always yields the same
//! model. smartcore reports majority votes only, so no class probabilities are
//! available from this classifier.

use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::SplitCriterion;
use thiserror::Error;

use crate::config::{ForestConfig, MaxFeatures};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("{samples} samples but {labels} labels")]
    LengthMismatch { samples: usize, labels: usize },

    #[error("sample {row} has {actual} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("label {label} out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },

    #[error("sample {row} feature {feature} is not a finite number")]
    NonFinite { row: usize, feature: usize },

    #[error("invalid forest parameter: {0}")]
    InvalidParameter(String),

    #[error("classifier backend failed: {0}")]
    Backend(String),

    #[error("classifier has not been fitted")]
    NotFitted,
}

/// Seam between the trainer and a concrete learning algorithm.
///
/// Labels are dense class indices `0..n_classes`.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError>;

    fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, FitError>;

    /// Per-class probabilities, if the algorithm produces them.
    fn predict_proba(&self, x: &[f64]) -> Option<Vec<f64>>;

    fn predict(&self, x: &[f64]) -> Result<usize, FitError> {
        self.predict_batch(&[x.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| FitError::Backend("empty prediction".to_string()))
    }

    /// Mean accuracy on `(x, y)`.
    fn score(&self, x: &[Vec<f64>], y: &[usize]) -> Result<f64, FitError> {
        if x.is_empty() {
            return Ok(0.0);
        }
        let predicted = self.predict_batch(x)?;
        let correct = predicted.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / x.len() as f64)
    }
}

/// Row width shared by every sample, rejecting ragged or non-finite input.
fn check_rows(x: &[Vec<f64>], expected: Option<usize>) -> Result<usize, FitError> {
    let width = expected.or_else(|| x.first().map(Vec::len)).unwrap_or(0);
    for (row, values) in x.iter().enumerate() {
        if values.len() != width {
            return Err(FitError::RaggedRow {
                row,
                expected: width,
                actual: values.len(),
            });
        }
        if let Some(feature) = values.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { row, feature });
        }
    }
    Ok(width)
}

fn to_matrix(x: &[Vec<f64>], width: usize) -> DenseMatrix<f64> {
    let data: Vec<f64> = x.iter().flatten().copied().collect();
    DenseMatrix::new(x.len(), width, data, false)
}

fn to_u16(name: &str, value: usize) -> Result<u16, FitError> {
    u16::try_from(value)
        .map_err(|_| FitError::InvalidParameter(format!("{name} = {value} exceeds {}", u16::MAX)))
}

type Forest = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

// ============================================================================
// Forest
// ============================================================================

/// Bagged ensemble of Gini decision trees.
pub struct RandomForest {
    config: ForestConfig,
    model: Option<Forest>,
    n_features: usize,
    n_classes: usize,
}

impl std::fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomForest")
            .field("config", &self.config)
            .field("fitted", &self.model.is_some())
            .field("n_features", &self.n_features)
            .field("n_classes", &self.n_classes)
            .finish()
    }
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            model: None,
            n_features: 0,
            n_classes: 0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Candidate features examined at each split.
    pub fn max_features(&self, n_features: usize) -> usize {
        match self.config.max_features {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
            MaxFeatures::All => n_features.max(1),
        }
    }

    /// smartcore parameters for a fit on `n_features` columns.
    pub fn parameters(&self, n_features: usize) -> Result<RandomForestClassifierParameters, FitError> {
        Ok(RandomForestClassifierParameters::default()
            .with_criterion(SplitCriterion::Gini)
            .with_n_trees(to_u16("n_estimators", self.config.n_estimators)?)
            .with_max_depth(to_u16("max_depth", self.config.max_depth)?)
            .with_min_samples_split(self.config.min_samples_split)
            .with_m(self.max_features(n_features))
            .with_seed(self.config.seed))
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        if x.is_empty() {
            return Err(FitError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                samples: x.len(),
                labels: y.len(),
            });
        }
        let width = check_rows(x, None)?;
        let labels = y
            .iter()
            .map(|&label| {
                i32::try_from(label)
                    .ok()
                    .filter(|_| label < n_classes)
                    .ok_or(FitError::LabelOutOfRange { label, n_classes })
            })
            .collect::<Result<Vec<i32>, _>>()?;

        let params = self.parameters(width)?;
        let model = Forest::fit(&to_matrix(x, width), &labels, params)
            .map_err(|e| FitError::Backend(e.to_string()))?;

        self.model = Some(model);
        self.n_features = width;
        self.n_classes = n_classes;

        tracing::debug!(
            trees = self.config.n_estimators,
            samples = x.len(),
            features = width,
            max_features = self.max_features(width),
            "Random forest fitted"
        );
        Ok(())
    }

    fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, FitError> {
        let model = self.model.as_ref().ok_or(FitError::NotFitted)?;
        if x.is_empty() {
            return Ok(Vec::new());
        }
        check_rows(x, Some(self.n_features))?;

        let predicted = model
            .predict(&to_matrix(x, self.n_features))
            .map_err(|e| FitError::Backend(e.to_string()))?;
        predicted
            .into_iter()
            .map(|label| {
                usize::try_from(label)
                    .ok()
                    .filter(|&l| l < self.n_classes)
                    .ok_or_else(|| FitError::Backend(format!("unexpected label {label}")))
            })
            .collect()
    }

    fn predict_proba(&self, _x: &[f64]) -> Option<Vec<f64>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two well separated clusters on feature 0, noise on feature 1.
    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let class = i % 2;
            let base = if class == 0 { 10.0 } else { 90.0 };
            x.push(vec![base + rng.gen_range(-5.0..5.0), rng.gen_range(0.0..100.0)]);
            y.push(class);
        }
        (x, y)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 15,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_forest_learns_separable_data() {
        let (x, y) = separable();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&x, &y, 2).unwrap();
        assert!(forest.is_fitted());
        assert_eq!(forest.score(&x, &y).unwrap(), 1.0);
        assert_eq!(forest.predict(&[5.0, 50.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[95.0, 50.0]).unwrap(), 1);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let grid: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i) * 5.0, 50.0]).collect();
        let mut a = RandomForest::new(small_config());
        let mut b = RandomForest::new(small_config());
        a.fit(&x, &y, 2).unwrap();
        b.fit(&x, &y, 2).unwrap();
        assert_eq!(a.predict_batch(&grid).unwrap(), b.predict_batch(&grid).unwrap());
    }

    #[test]
    fn test_batch_matches_single_rows() {
        let (x, y) = separable();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&x, &y, 2).unwrap();
        let batch = forest.predict_batch(&x).unwrap();
        for (row, expected) in x.iter().zip(batch) {
            assert_eq!(forest.predict(row).unwrap(), expected);
        }
    }

    #[test]
    fn test_no_probabilities() {
        let (x, y) = separable();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&x, &y, 2).unwrap();
        assert!(forest.predict_proba(&[50.0, 50.0]).is_none());
    }

    #[test]
    fn test_parameters_follow_config() {
        let forest = RandomForest::new(ForestConfig {
            n_estimators: 7,
            max_depth: 3,
            min_samples_split: 4,
            seed: 9,
            ..ForestConfig::default()
        });
        let params = forest.parameters(9).unwrap();
        assert_eq!(params.n_trees, 7);
        assert_eq!(params.max_depth, Some(3));
        assert_eq!(params.min_samples_split, 4);
        assert_eq!(params.m, Some(3));
        assert_eq!(params.seed, 9);

        let all = RandomForest::new(ForestConfig {
            max_features: MaxFeatures::All,
            ..ForestConfig::default()
        });
        assert_eq!(all.max_features(9), 9);
        assert_eq!(forest.max_features(1), 1);
    }

    #[test]
    fn test_oversized_parameters_rejected() {
        let mut forest = RandomForest::new(ForestConfig {
            n_estimators: 70_000,
            ..ForestConfig::default()
        });
        let (x, y) = separable();
        assert!(matches!(forest.fit(&x, &y, 2), Err(FitError::InvalidParameter(_))));
        assert!(!forest.is_fitted());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let (mut x, y) = separable();
        x[3][1] = f64::NAN;
        let mut forest = RandomForest::new(small_config());
        assert_eq!(forest.fit(&x, &y, 2), Err(FitError::NonFinite { row: 3, feature: 1 }));

        let (x, y) = separable();
        forest.fit(&x, &y, 2).unwrap();
        assert_eq!(
            forest.predict(&[f64::INFINITY, 1.0]),
            Err(FitError::NonFinite { row: 0, feature: 0 })
        );
    }

    #[test]
    fn test_unfitted_and_invalid_input() {
        let forest = RandomForest::new(small_config());
        assert_eq!(forest.predict(&[1.0]), Err(FitError::NotFitted));

        let mut forest = RandomForest::new(small_config());
        assert_eq!(forest.fit(&[], &[], 2), Err(FitError::EmptyTrainingSet));
        assert_eq!(
            forest.fit(&[vec![1.0]], &[0, 1], 2),
            Err(FitError::LengthMismatch { samples: 1, labels: 2 })
        );
        assert_eq!(
            forest.fit(&[vec![1.0]], &[5], 2),
            Err(FitError::LabelOutOfRange { label: 5, n_classes: 2 })
        );
        assert_eq!(
            forest.fit(&[vec![1.0, 2.0], vec![1.0]], &[0, 1], 2),
            Err(FitError::RaggedRow { row: 1, expected: 2, actual: 1 })
        );

        let (x, y) = separable();
        forest.fit(&x, &y, 2).unwrap();
        assert_eq!(
            forest.predict(&[1.0, 2.0, 3.0]),
            Err(FitError::RaggedRow { row: 0, expected: 2, actual: 3 })
        );
    }
}
