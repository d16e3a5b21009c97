//! Shared data structures for the spoilage classifier
//!
//! - `dataset`: raw tabular rows as read from XLSX/CSV sources
//! - `model`: feature schema, evaluation report and classification payloads

mod dataset;
mod model;

pub use dataset::*;
pub use model::*;
