//! Narrow tabular-dataset capability consumed by the profiler and detectors.
//!
//! The engine never depends on a concrete table implementation. Anything that
//! can list its columns, iterate a column's cells and answer null/distinct
//! questions can be profiled. Two implementations ship with the crate:
//!
//! - [`InMemoryDataset`]: column-major cells, handy for callers that already
//!   hold parsed survey responses and for tests
//! - [`RecordBatchDataset`]: an adapter over Arrow record batches, produced
//!   by the [`sources`](crate::sources) loaders
//!
//! # Example
//!
//! ```rust
//! use survey_autodetect::dataset::{InMemoryDataset, TabularDataset};
//!
//! let dataset = InMemoryDataset::builder()
//!     .numeric_column("age", vec![Some(31.0), Some(45.0), None])
//!     .text_column("comment", vec![Some("great"), None, Some("too long")])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(dataset.column_names(), vec!["age", "comment"]);
//! assert_eq!(dataset.row_count(), 3);
//! ```

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{AutodetectError, Result};

mod memory;
mod record_batch;

pub use memory::{InMemoryDataset, InMemoryDatasetBuilder};
pub use record_batch::RecordBatchDataset;

/// Boxed iterator over one column's cells.
pub type CellIter<'a> = Box<dyn Iterator<Item = CellValue> + 'a>;

/// A single cell of a tabular dataset.
///
/// Malformed values are not errors: non-finite floats and blank strings are
/// treated as missing by [`CellValue::is_null`] and collapsed to
/// [`CellValue::Null`] by [`CellValue::normalized`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Whether the cell counts as missing.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => !v.is_finite(),
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the cell with malformed values replaced by `Null` and text
    /// trimmed.
    pub fn normalized(self) -> CellValue {
        if self.is_null() {
            return CellValue::Null;
        }
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.len() == s.len() {
                    CellValue::Text(s)
                } else {
                    CellValue::Text(trimmed.to_string())
                }
            }
            other => other,
        }
    }

    /// Numeric view of the cell, coercing numeric-looking text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// String view of a non-null cell.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        if self.is_null() {
            return None;
        }
        match self {
            CellValue::Text(s) => Some(Cow::Borrowed(s.trim())),
            CellValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            CellValue::Int(v) => Some(Cow::Owned(v.to_string())),
            CellValue::Float(v) => Some(Cow::Owned(v.to_string())),
            CellValue::DateTime(dt) => Some(Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string())),
            CellValue::Null => None,
        }
    }

    /// Key used for distinct counting and duplicate-row detection.
    ///
    /// Integral floats and integers share a key so that `3` and `3.0` count
    /// as one value.
    pub fn canonical_key(&self) -> String {
        if self.is_null() {
            return "\u{0}null".to_string();
        }
        match self {
            CellValue::Int(v) => format!("n:{v}"),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => {
                format!("n:{}", *v as i64)
            }
            CellValue::Float(v) => format!("n:{v}"),
            CellValue::Bool(b) => format!("b:{b}"),
            CellValue::DateTime(dt) => format!("d:{dt}"),
            CellValue::Text(s) => format!("s:{}", s.trim()),
            CellValue::Null => "\u{0}null".to_string(),
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Capability interface over a tabular dataset.
///
/// Implementors only need column listing, row count and per-column value
/// iteration; null tests and distinct counts have default implementations
/// that concrete tables may override with something cheaper.
pub trait TabularDataset: Send + Sync {
    /// Ordered column names.
    fn column_names(&self) -> Vec<String>;

    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Iterates the cells of `column` in row order.
    fn column_values(&self, column: &str) -> Result<CellIter<'_>>;

    /// Whether the dataset has a column with this name.
    fn has_column(&self, column: &str) -> bool {
        self.column_names().iter().any(|c| c == column)
    }

    /// Null test for one cell.
    fn is_null(&self, column: &str, row: usize) -> Result<bool> {
        self.column_values(column)?
            .nth(row)
            .map(|cell| cell.is_null())
            .ok_or_else(|| {
                AutodetectError::input(format!(
                    "Row {row} out of range for column '{column}' ({} rows)",
                    self.row_count()
                ))
            })
    }

    /// Number of distinct non-null values in `column`.
    fn distinct_count(&self, column: &str) -> Result<usize> {
        let distinct: HashSet<String> = self
            .column_values(column)?
            .filter(|cell| !cell.is_null())
            .map(|cell| cell.canonical_key())
            .collect();
        Ok(distinct.len())
    }

    /// Number of columns.
    fn column_count(&self) -> usize {
        self.column_names().len()
    }
}
