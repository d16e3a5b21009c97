//! System-wide default constants.
//!
//! Centralises the values the service falls back to when no config file is
//! present. Grouped by subsystem for easy discovery.

// ============================================================================
// Server
// ============================================================================

/// HTTP server bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:5000";

// ============================================================================
// Dataset
// ============================================================================

/// Logical dataset location. The loader appends `.xlsx` / `.csv`.
pub const DATASET_STEM: &str = "datasets/food_gas_dataset";

/// Outcome column.
pub const TARGET_COLUMN: &str = "output";

/// Digital companion channels that are never model inputs.
pub const EXCLUDED_COLUMNS: [&str; 6] = ["MQ8D", "MQ135D", "MQ9D", "MQ4D", "MQ2D", "MQ3D"];

/// Reserved suffix marking auxiliary columns.
pub const AUXILIARY_SUFFIX: &str = "D";

// ============================================================================
// Schema
// ============================================================================

/// Recognized analog gas-sensor channels, in canonical feature order.
pub const SENSOR_CHANNELS: [&str; 6] = ["MQ2A", "MQ3A", "MQ4A", "MQ8A", "MQ9A", "MQ135A"];

// ============================================================================
// Training
// ============================================================================

/// Fraction of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

/// Seed for the train/test shuffle.
pub const SPLIT_SEED: u64 = 33;

/// Standard deviation of the Gaussian noise used for the robustness score.
pub const NOISE_STD_DEV: f64 = 20.0;

/// Seed for the robustness-score noise.
pub const NOISE_SEED: u64 = 20;

// ============================================================================
// Random Forest
// ============================================================================

/// Number of trees.
pub const N_ESTIMATORS: usize = 100;

/// Maximum tree depth.
pub const MAX_DEPTH: usize = 5;

/// Minimum samples required to split an internal node.
pub const MIN_SAMPLES_SPLIT: usize = 2;

/// Seed for bootstrap sampling and per-split feature selection.
pub const FOREST_SEED: u64 = 42;
