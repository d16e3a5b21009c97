//! Dataset Loader
//!
//! Resolves a logical dataset location into an in-memory [`Dataset`].
//! Two interchangeable sources are tried in order:
//!
//! 1. `<stem>.xlsx`: spreadsheet, only when built with the `xlsx` feature
//! 2. `<stem>.csv`: flat text fallback at the sibling location
//!
//! Any failure of the primary source falls through to the fallback. When
//! both fail the caller gets [`DatasetError::Unavailable`] with one line per
//! attempt, suitable for returning to an API client as-is.
//!
//! # Usage
//!
//! ```ignore
//! use spoilage_sense::dataset::DatasetLoader;
//!
//! let dataset = DatasetLoader::new("datasets/food_gas_dataset").load()?;
//! println!("{} rows, columns: {:?}", dataset.len(), dataset.columns);
//! ```

mod csv;
#[cfg(feature = "xlsx")]
mod xlsx;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{CellValue, Dataset, DatasetFormat, DatasetOrigin};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed file: {0}")]
    Malformed(String),

    #[error("{0} has a header but no data rows")]
    Empty(String),

    #[error("{0} support is not compiled in")]
    Unsupported(DatasetFormat),

    /// Every source failed. The message lists each attempt.
    #[error("dataset not found: {0}")]
    Unavailable(String),
}

/// Header plus typed rows, before provenance is attached.
#[derive(Debug)]
pub(crate) struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

// ============================================================================
// Loader
// ============================================================================

/// Loads a dataset from its logical location, spreadsheet first.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    stem: PathBuf,
}

impl DatasetLoader {
    /// `stem` is the dataset path without extension. An `.xlsx`/`.csv`
    /// extension, if present, is replaced per source.
    pub fn new(stem: impl Into<PathBuf>) -> Self {
        Self { stem: stem.into() }
    }

    /// Candidate sources in priority order.
    pub fn candidates(&self) -> [(PathBuf, DatasetFormat); 2] {
        [
            (self.stem.with_extension("xlsx"), DatasetFormat::Xlsx),
            (self.stem.with_extension("csv"), DatasetFormat::Csv),
        ]
    }

    /// Load the dataset, falling back from spreadsheet to CSV.
    ///
    /// Reads files only; never writes or caches.
    pub fn load(&self) -> Result<Dataset, DatasetError> {
        let mut attempts = Vec::with_capacity(2);

        for (path, format) in self.candidates() {
            match load_file(&path, format) {
                Ok(dataset) => {
                    info!(
                        path = %path.display(),
                        format = %format,
                        rows = dataset.len(),
                        columns = dataset.columns.len(),
                        "Dataset loaded"
                    );
                    return Ok(dataset);
                }
                Err(e) => {
                    match &e {
                        DatasetError::NotFound(_) | DatasetError::Unsupported(_) => {
                            debug!(path = %path.display(), error = %e, "Dataset source skipped");
                        }
                        _ => {
                            warn!(path = %path.display(), error = %e, "Dataset source failed, trying next");
                        }
                    }
                    attempts.push(format!("{format}: {e}"));
                }
            }
        }

        Err(DatasetError::Unavailable(attempts.join("; ")))
    }
}

/// Read and parse a single file in the given format.
pub fn load_file(path: &Path, format: DatasetFormat) -> Result<Dataset, DatasetError> {
    if !format_supported(format) {
        return Err(DatasetError::Unsupported(format));
    }

    let display = path.display().to_string();
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DatasetError::NotFound(display));
        }
        Err(source) => {
            return Err(DatasetError::Io {
                path: display,
                source,
            })
        }
    };

    let table = parse_bytes(&bytes, format)?;
    if table.rows.iter().all(|row| row.iter().all(CellValue::is_missing)) {
        return Err(DatasetError::Empty(display));
    }

    let origin = DatasetOrigin {
        path: display,
        format,
        fingerprint: format!("{:x}", md5::compute(&bytes)),
    };
    Ok(Dataset::new(table.columns, table.rows).with_origin(origin))
}

const fn format_supported(format: DatasetFormat) -> bool {
    match format {
        DatasetFormat::Xlsx => cfg!(feature = "xlsx"),
        DatasetFormat::Csv => true,
    }
}

fn parse_bytes(bytes: &[u8], format: DatasetFormat) -> Result<RawTable, DatasetError> {
    match format {
        DatasetFormat::Csv => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| DatasetError::Malformed(format!("not UTF-8 text: {e}")))?;
            csv::parse_csv(text)
        }
        #[cfg(feature = "xlsx")]
        DatasetFormat::Xlsx => xlsx::parse_xlsx(bytes),
        #[cfg(not(feature = "xlsx"))]
        DatasetFormat::Xlsx => Err(DatasetError::Unsupported(DatasetFormat::Xlsx)),
    }
}

// ============================================================================
// Tests
// ============================================================================
