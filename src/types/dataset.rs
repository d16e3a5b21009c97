//! Raw tabular dataset types

use serde::{Deserialize, Serialize};

/// A single cell as read from a tabular source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Classify raw text from a CSV field or spreadsheet string cell.
    ///
    /// Empty strings and the usual null spellings (`nan`, `null`, `-`, `n/a`)
    /// are treated as missing.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if is_null_token(s) {
            return CellValue::Missing;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::Number(v),
            Ok(_) => CellValue::Missing,
            Err(_) => CellValue::Text(s.to_string()),
        }
    }

    /// Numeric view of the cell. Numeric text is accepted; everything else
    /// (including non-finite numbers) is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Label form of the cell, used for the target column.
    ///
    /// Integral numbers render without a fractional part so that `1` read
    /// from a spreadsheet and `"1"` read from a CSV give the same class.
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Number(v) => Some(format_number_label(*v)),
            CellValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else if let Ok(v) = s.parse::<f64>() {
                    Some(format_number_label(v))
                } else {
                    Some(s.to_string())
                }
            }
            CellValue::Missing => None,
        }
    }
}

fn is_null_token(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("none")
        || s.eq_ignore_ascii_case("n/a")
        || s == "-"
}

fn format_number_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Which physical source a dataset was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Xlsx,
    Csv,
}

impl std::fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetFormat::Xlsx => write!(f, "xlsx"),
            DatasetFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Where a loaded dataset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetOrigin {
    pub path: String,
    pub format: DatasetFormat,
    /// MD5 of the source file bytes
    pub fingerprint: String,
}

/// In-memory tabular dataset. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub origin: Option<DatasetOrigin>,
}

impl Dataset {
    /// Build a dataset, padding short rows with `Missing` and truncating long ones.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Missing);
                row
            })
            .collect();
        Self {
            columns,
            rows,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: DatasetOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row number and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}
