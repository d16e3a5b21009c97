//! Mean imputation
//!
//! Fitted once on the training partition, then applied unchanged to the
//! held-out partition and to every inference row.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::warn;

use crate::config::EmptyFeaturePolicy;
use crate::types::{FeatureRow, FeatureSchema};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImputeError {
    #[error("feature '{0}' has no observed values in the training partition")]
    EmptyFeature(String),

    #[error("row has {actual} values, schema has {expected}")]
    RowWidth { expected: usize, actual: usize },
}

/// Per-feature fill values in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    features: Vec<String>,
    means: Vec<f64>,
}

impl MeanImputer {
    /// Learn the mean of the observed values of each feature.
    ///
    /// A feature without any observed value has an undefined (NaN) mean;
    /// `policy` decides whether that NaN is kept, replaced by zero, or
    /// rejected.
    pub fn fit(
        schema: &FeatureSchema,
        rows: &[FeatureRow],
        policy: EmptyFeaturePolicy,
    ) -> Result<Self, ImputeError> {
        let width = schema.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(ImputeError::RowWidth {
                expected: width,
                actual: bad.len(),
            });
        }

        let mut means = Vec::with_capacity(width);
        for (idx, name) in schema.features.iter().enumerate() {
            let observed: Vec<f64> = rows
                .iter()
                .filter_map(|r| r[idx])
                .filter(|v| v.is_finite())
                .collect();

            let mean = observed.iter().mean();
            if mean.is_nan() {
                match policy {
                    EmptyFeaturePolicy::Nan => {
                        warn!(feature = %name, "No observed training values, fill value is NaN");
                        means.push(f64::NAN);
                    }
                    EmptyFeaturePolicy::Zero => {
                        warn!(feature = %name, "No observed training values, filling with 0.0");
                        means.push(0.0);
                    }
                    EmptyFeaturePolicy::Reject => {
                        return Err(ImputeError::EmptyFeature(name.clone()));
                    }
                }
            } else {
                means.push(mean);
            }
        }

        Ok(Self {
            features: schema.features.clone(),
            means,
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fill value for a named feature.
    pub fn mean_of(&self, feature: &str) -> Option<f64> {
        self.features
            .iter()
            .position(|f| f == feature)
            .map(|i| self.means[i])
    }

    /// Replace missing (or non-finite) entries with the fitted means.
    pub fn apply_row(&self, row: &FeatureRow) -> Result<Vec<f64>, ImputeError> {
        if row.len() != self.means.len() {
            return Err(ImputeError::RowWidth {
                expected: self.means.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.means)
            .map(|(value, mean)| match value {
                Some(v) if v.is_finite() => *v,
                _ => *mean,
            })
            .collect())
    }

    pub fn apply(&self, rows: &[FeatureRow]) -> Result<Vec<Vec<f64>>, ImputeError> {
        rows.iter().map(|r| self.apply_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            features: vec!["MQ2A".into(), "MQ4A".into()],
            target: "output".into(),
        }
    }

    #[test]
    fn test_means_ignore_missing() {
        let rows = vec![
            vec![Some(1.0), Some(100.0)],
            vec![None, Some(140.0)],
            vec![Some(3.0), None],
        ];
        let imp = MeanImputer::fit(&schema(), &rows, EmptyFeaturePolicy::Nan).unwrap();
        assert_eq!(imp.means(), &[2.0, 120.0]);
        assert_eq!(imp.mean_of("MQ4A"), Some(120.0));
    }

    #[test]
    fn test_apply_fills_only_missing() {
        let rows = vec![vec![Some(1.0), Some(100.0)], vec![Some(3.0), Some(140.0)]];
        let imp = MeanImputer::fit(&schema(), &rows, EmptyFeaturePolicy::Nan).unwrap();
        let out = imp
            .apply(&[vec![None, Some(7.0)], vec![Some(f64::NAN), None]])
            .unwrap();
        assert_eq!(out, vec![vec![2.0, 7.0], vec![2.0, 120.0]]);
        // Applying never changes the fitted parameters
        assert_eq!(imp.means(), &[2.0, 120.0]);
    }

    #[test]
    fn test_empty_feature_policies() {
        let rows = vec![vec![Some(1.0), None], vec![Some(2.0), None]];

        let nan = MeanImputer::fit(&schema(), &rows, EmptyFeaturePolicy::Nan).unwrap();
        assert!(nan.means()[1].is_nan());

        let zero = MeanImputer::fit(&schema(), &rows, EmptyFeaturePolicy::Zero).unwrap();
        assert_eq!(zero.means()[1], 0.0);

        assert_eq!(
            MeanImputer::fit(&schema(), &rows, EmptyFeaturePolicy::Reject),
            Err(ImputeError::EmptyFeature("MQ4A".into()))
        );
    }

    #[test]
    fn test_row_width_checked() {
        let imp = MeanImputer::fit(&schema(), &[vec![Some(1.0), Some(2.0)]], EmptyFeaturePolicy::Nan)
            .unwrap();
        assert_eq!(
            imp.apply_row(&vec![Some(1.0)]),
            Err(ImputeError::RowWidth { expected: 2, actual: 1 })
        );
    }
}
