//! Process-wide model state.
//!
//! Readers load one `Arc<TrainedModel>` and keep using it for the whole
//! request, so a concurrent commit can never mix one model's schema with
//! another's imputer. Writers are serialized by a non-blocking training
//! guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use arc_swap::ArcSwapOption;
use tracing::{info, warn};

use super::model::TrainedModel;
use super::trainer::Trainer;
use super::ServiceError;

#[derive(Debug, Default)]
pub struct ModelRegistry {
    active: ArcSwapOption<TrainedModel>,
    training: Mutex<()>,
    generation: AtomicU64,
}

impl ModelRegistry {
    /// Empty registry; not ready until the first commit.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.active.load().is_some()
    }

    /// Snapshot of the active model.
    pub fn active(&self) -> Result<Arc<TrainedModel>, ServiceError> {
        self.active.load_full().ok_or(ServiceError::NotReady)
    }

    /// Generation of the active model, 0 when not ready.
    pub fn generation(&self) -> u64 {
        self.active.load_full().map_or(0, |m| m.generation)
    }

    /// Stamp the next generation on `model` and make it active.
    ///
    /// Waits for any running retrain, so generations are published in order.
    pub fn commit(&self, model: TrainedModel) -> Arc<TrainedModel> {
        let _guard = self.training.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish(model)
    }

    /// Caller must hold the training guard.
    fn publish(&self, mut model: TrainedModel) -> Arc<TrainedModel> {
        model.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let model = Arc::new(model);
        self.active.store(Some(Arc::clone(&model)));
        info!(
            generation = model.generation,
            features = ?model.schema.features,
            "Model committed"
        );
        model
    }

    /// Run the full training pipeline and commit the result.
    ///
    /// Returns `RetrainInProgress` at once if another retrain holds the
    /// guard. On failure the active model is left untouched.
    pub fn retrain(&self, trainer: &Trainer) -> Result<Arc<TrainedModel>, ServiceError> {
        let _guard = match self.training.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ServiceError::RetrainInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        match trainer.train_from_source() {
            Ok(model) => Ok(self.publish(model)),
            Err(e) => {
                warn!(error = %e, ready = self.is_ready(), "Retrain failed, keeping previous model");
                Err(ServiceError::Training(e))
            }
        }
    }
}
