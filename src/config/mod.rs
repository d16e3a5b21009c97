//! Service Configuration Module
//!
//! Dataset location, schema rules, training and forest settings loaded from
//! TOML, replacing hardcoded values with operator-tunable ones.
//!
//! ## Loading Order
//!
//! 1. `--config` CLI flag (handled by the binary)
//! 2. `SPOILAGE_CONFIG` environment variable (path to TOML file)
//! 3. `spoilage.toml` in the current working directory
//! 4. Built-in defaults (see [`defaults`])
//!
//! The loaded config is passed by value into the trainer and the API state;
//! there is no global instance.

mod service_config;
pub mod defaults;

pub use service_config::*;
