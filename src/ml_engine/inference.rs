//! Inference adapter: external key/value payload to a classification.

use serde_json::{Map, Value};
use tracing::debug;

use super::model::TrainedModel;
use super::ServiceError;
use crate::types::{Classification, FeatureRow, RawField};

/// Classify one payload against `model`.
///
/// Keys are matched to the model's schema by exact name. A key that is
/// absent, or whose value is not a finite number or numeric string, is
/// imputed with the training mean. Keys outside the schema are ignored.
pub fn classify(model: &TrainedModel, payload: &Map<String, Value>) -> Result<Classification, ServiceError> {
    let features = &model.schema.features;
    let mut row: FeatureRow = Vec::with_capacity(features.len());
    let mut received = Vec::new();
    let mut imputed = Vec::new();

    for name in features {
        let value = payload.get(name).map_or(RawField::Missing, RawField::from).coerce();
        if payload.contains_key(name) {
            received.push(name.clone());
        }
        if value.is_none() {
            imputed.push(name.clone());
        }
        row.push(value);
    }

    let mut ignored: Vec<String> = payload
        .keys()
        .filter(|k| !model.schema.contains(k))
        .cloned()
        .collect();
    ignored.sort();

    let prediction = model.predict(&row)?;
    debug!(
        label = %prediction.label,
        imputed = imputed.len(),
        ignored = ignored.len(),
        generation = model.generation,
        "Sample classified"
    );

    Ok(Classification {
        label: prediction.label,
        probabilities: prediction.probabilities,
        expected_features: features.clone(),
        received_features: received,
        imputed_features: imputed,
        ignored_features: ignored,
        model_generation: model.generation,
    })
}

/// Like [`classify`], but accepts any JSON value and rejects non-objects.
pub fn classify_value(model: &TrainedModel, payload: &Value) -> Result<Classification, ServiceError> {
    match payload {
        Value::Object(map) => classify(model, map),
        _ => Err(ServiceError::InvalidPayload),
    }
}
