//! API route handlers
//!
//! - Banner and health/readiness
//! - Classification, retraining and the active model summary

mod status;
mod model;

pub use status::*;
pub use model::*;

use std::sync::Arc;
use std::time::Instant;

use crate::ml_engine::{ModelRegistry, Trainer};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ServiceState {
    /// Active model register shared with the binary
    pub registry: Arc<ModelRegistry>,
    /// Pipeline used by `POST /retrain`
    pub trainer: Arc<Trainer>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl ServiceState {
    pub fn new(registry: Arc<ModelRegistry>, trainer: Arc<Trainer>) -> Self {
        Self {
            registry,
            trainer,
            started_at: Instant::now(),
        }
    }
}
