//! Feature schema derivation
//!
//! Turns raw dataset columns into the ordered feature list the model is
//! trained on. The allow-list fixes the order independently of the file's
//! column order, so training and inference agree even if the file is
//! rearranged.

use thiserror::Error;
use tracing::warn;

use crate::config::{AllowListMode, DatasetConfig, SchemaConfig};
use crate::types::FeatureSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("target column '{0}' not present in dataset")]
    MissingTarget(String),

    #[error("no usable feature columns after excluding target and auxiliary columns")]
    NoFeatures,

    #[error("sensor channels missing from dataset: {}", .0.join(", "))]
    MissingChannels(Vec<String>),
}

/// Column-role rules used to derive a [`FeatureSchema`].
#[derive(Debug, Clone)]
pub struct SchemaDeriver {
    target: String,
    excluded: Vec<String>,
    auxiliary_suffix: String,
    allow_list: Vec<String>,
    mode: AllowListMode,
}

impl SchemaDeriver {
    pub fn new(dataset: &DatasetConfig, schema: &SchemaConfig) -> Self {
        Self {
            target: dataset.target_column.clone(),
            excluded: dataset.excluded_columns.clone(),
            auxiliary_suffix: dataset.auxiliary_suffix.clone(),
            allow_list: schema.sensor_channels.clone(),
            mode: schema.allow_list_mode,
        }
    }

    fn is_auxiliary(&self, column: &str) -> bool {
        self.excluded.iter().any(|c| c == column)
            || (!self.auxiliary_suffix.is_empty() && column.ends_with(&self.auxiliary_suffix))
    }

    /// Derive the schema from raw column names. Pure function of `columns`.
    pub fn derive(&self, columns: &[String]) -> Result<FeatureSchema, SchemaError> {
        if !columns.iter().any(|c| c == &self.target) {
            return Err(SchemaError::MissingTarget(self.target.clone()));
        }

        let mut candidates: Vec<&String> = Vec::new();
        for column in columns {
            if column == &self.target || self.is_auxiliary(column) || candidates.contains(&column) {
                continue;
            }
            candidates.push(column);
        }

        let features: Vec<String> = match self.mode {
            AllowListMode::Disabled => candidates.into_iter().cloned().collect(),
            AllowListMode::Strict => {
                let missing: Vec<String> = self
                    .allow_list
                    .iter()
                    .filter(|ch| !candidates.contains(ch))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(SchemaError::MissingChannels(missing));
                }
                self.allow_list.clone()
            }
            AllowListMode::Intersect => {
                let present: Vec<String> = self
                    .allow_list
                    .iter()
                    .filter(|ch| candidates.contains(ch))
                    .cloned()
                    .collect();
                if present.is_empty() {
                    if !self.allow_list.is_empty() {
                        warn!(
                            candidates = candidates.len(),
                            "No recognized sensor channels in dataset, using all candidate columns"
                        );
                    }
                    candidates.into_iter().cloned().collect()
                } else {
                    if present.len() < self.allow_list.len() {
                        warn!(
                            present = present.len(),
                            expected = self.allow_list.len(),
                            "Only part of the sensor allow-list is present, schema restricted to it"
                        );
                    }
                    present
                }
            }
        };

        if features.is_empty() {
            return Err(SchemaError::NoFeatures);
        }

        Ok(FeatureSchema {
            features,
            target: self.target.clone(),
        })
    }
}
