//! Classifier training pipeline
//!
//! ```text
//! dataset ─► schema ─► drop unlabelled rows ─► encode labels
//!         ─► seeded split ─► fit imputer (train only) ─► impute both
//!         ─► fit forest ─► scores + report + noise robustness
//! ```
//!
//! Every stage is seeded from [`TrainingConfig`] and [`ForestConfig`], so
//! the same dataset and config always produce the same report.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::{debug, info};

use super::forest::{Classifier, FitError, RandomForest};
use super::imputer::{ImputeError, MeanImputer};
use super::metrics;
use super::model::TrainedModel;
use super::schema::{SchemaDeriver, SchemaError};
use crate::config::{ForestConfig, ServiceConfig, TrainingConfig};
use crate::dataset::{DatasetError, DatasetLoader};
use crate::types::{Dataset, EvaluationReport, FeatureRow, SampleCounts};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("{0}")]
    DataUnavailable(#[from] DatasetError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("need at least 2 labelled rows to split, found {0}")]
    TooFewRows(usize),

    #[error(transparent)]
    Imputation(#[from] ImputeError),

    #[error("model fitting failed: {0}")]
    Fit(#[from] FitError),

    #[error("invalid training configuration: {0}")]
    Config(String),
}

/// Labelled feature rows with dense class ids.
#[derive(Debug)]
struct Prepared {
    rows: Vec<FeatureRow>,
    labels: Vec<usize>,
    classes: Vec<String>,
    dropped: usize,
}

/// Runs the full training pipeline from a [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct Trainer {
    loader: DatasetLoader,
    deriver: SchemaDeriver,
    training: TrainingConfig,
    forest: ForestConfig,
}

impl Trainer {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            loader: DatasetLoader::new(&config.dataset.path),
            deriver: SchemaDeriver::new(&config.dataset, &config.schema),
            training: config.training.clone(),
            forest: config.forest.clone(),
        }
    }

    /// Load the configured dataset and train on it.
    pub fn train_from_source(&self) -> Result<TrainedModel, TrainError> {
        let dataset = self.loader.load()?;
        self.train(&dataset)
    }

    /// Train on an in-memory dataset. The returned model has generation 0
    /// until a registry commits it.
    pub fn train(&self, dataset: &Dataset) -> Result<TrainedModel, TrainError> {
        let schema = self.deriver.derive(&dataset.columns)?;
        let prepared = prepare(dataset, &schema.features, &schema.target)?;
        let n = prepared.rows.len();
        if n < 2 {
            return Err(TrainError::TooFewRows(n));
        }

        let (train_idx, test_idx) =
            split_indices(n, self.training.test_fraction, self.training.split_seed);
        let pick = |idx: &[usize]| -> (Vec<FeatureRow>, Vec<usize>) {
            idx.iter()
                .map(|&i| (prepared.rows[i].clone(), prepared.labels[i]))
                .unzip()
        };
        let (train_rows, y_train) = pick(&train_idx);
        let (test_rows, y_test) = pick(&test_idx);

        let imputer = MeanImputer::fit(&schema, &train_rows, self.training.empty_feature_policy)?;
        let x_train = imputer.apply(&train_rows)?;
        let x_test = imputer.apply(&test_rows)?;

        let mut forest = RandomForest::new(self.forest.clone());
        forest.fit(&x_train, &y_train, prepared.classes.len())?;

        let train_score = forest.score(&x_train, &y_train)?;
        let predicted = forest.predict_batch(&x_test)?;
        let test_score = metrics::accuracy(&y_test, &predicted);
        let report = metrics::classification_report(&y_test, &predicted, &prepared.classes);

        let x_noisy = self.add_noise(&x_test)?;
        let noisy_score = forest.score(&x_noisy, &y_test)?;

        info!(
            features = schema.len(),
            classes = prepared.classes.len(),
            train = train_idx.len(),
            test = test_idx.len(),
            dropped = prepared.dropped,
            train_score,
            test_score,
            noisy_score,
            "Training complete"
        );

        let report = EvaluationReport {
            train_score,
            test_score,
            noisy_score,
            noise_std_dev: self.training.noise_std_dev,
            per_class: report.per_class,
            macro_avg: report.macro_avg,
            weighted_avg: report.weighted_avg,
            confusion_matrix: report.confusion_matrix,
            classes: prepared.classes.clone(),
            features: schema.features.clone(),
            samples: SampleCounts {
                total: dataset.len(),
                train: train_idx.len(),
                test: test_idx.len(),
                dropped: prepared.dropped,
            },
            dataset: dataset.origin.clone(),
        };

        Ok(TrainedModel {
            schema,
            imputer,
            classifier: Box::new(forest),
            classes: prepared.classes,
            report,
            generation: 0,
            trained_at: Utc::now(),
        })
    }

    /// Held-out matrix plus independent N(0, σ) noise per cell.
    fn add_noise(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, TrainError> {
        let normal = Normal::new(0.0, self.training.noise_std_dev)
            .map_err(|e| TrainError::Config(format!("noise_std_dev: {e}")))?;
        let mut rng = StdRng::seed_from_u64(self.training.noise_seed);
        Ok(x.iter()
            .map(|row| row.iter().map(|v| v + normal.sample(&mut rng)).collect())
            .collect())
    }
}

/// Extract schema-ordered feature rows and encode the target.
///
/// Rows with a missing target are dropped. Classes sort numerically when
/// every label is numeric, otherwise lexicographically.
fn prepare(dataset: &Dataset, features: &[String], target: &str) -> Result<Prepared, TrainError> {
    let target_idx = dataset
        .column_index(target)
        .ok_or_else(|| SchemaError::MissingTarget(target.to_string()))?;
    let feature_idx = features
        .iter()
        .map(|f| dataset.column_index(f).ok_or(SchemaError::NoFeatures))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(dataset.len());
    let mut raw_labels = Vec::with_capacity(dataset.len());
    let mut dropped = 0;
    for row in &dataset.rows {
        let Some(label) = row[target_idx].as_label() else {
            dropped += 1;
            continue;
        };
        rows.push(feature_idx.iter().map(|&i| row[i].as_f64()).collect());
        raw_labels.push(label);
    }
    if dropped > 0 {
        debug!(dropped, column = target, "Dropped rows without a target value");
    }

    let mut classes: Vec<String> = raw_labels.clone();
    classes.sort();
    classes.dedup();
    if classes.iter().all(|c| c.parse::<f64>().is_ok()) {
        classes.sort_by(|a, b| {
            let (a, b) = (a.parse::<f64>().unwrap_or(0.0), b.parse::<f64>().unwrap_or(0.0));
            a.total_cmp(&b)
        });
    }

    let labels = raw_labels
        .iter()
        .map(|l| classes.iter().position(|c| c == l).unwrap_or(0))
        .collect();

    Ok(Prepared {
        rows,
        labels,
        classes,
        dropped,
    })
}

/// Seeded shuffle split. The test side gets `ceil(n * fraction)` rows,
/// clamped so both sides keep at least one row. Requires `n >= 2`.
fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);
    let train = indices.split_off(n_test);
    (train, indices)
}
