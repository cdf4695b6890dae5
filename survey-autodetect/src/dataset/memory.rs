//! Column-major in-memory dataset.

use std::collections::HashSet;

use super::{CellIter, CellValue, TabularDataset};
use crate::error::{AutodetectError, Result};

#[derive(Debug, Clone)]
struct Column {
    name: String,
    cells: Vec<CellValue>,
}

/// A dataset whose cells are already materialized in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl InMemoryDataset {
    /// Creates a builder for an in-memory dataset.
    pub fn builder() -> InMemoryDatasetBuilder {
        InMemoryDatasetBuilder::default()
    }

    /// A dataset with no rows and no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a dataset from a header and row-major records.
    pub fn from_rows(header: &[&str], rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(rows.len()); header.len()];
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != header.len() {
                return Err(AutodetectError::input(format!(
                    "Row {index} has {} cells but the header has {} columns",
                    row.len(),
                    header.len()
                )));
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }

        header
            .iter()
            .zip(columns)
            .fold(Self::builder(), |builder, (name, cells)| {
                builder.column(*name, cells)
            })
            .build()
    }

    fn find(&self, column: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .ok_or_else(|| AutodetectError::ColumnNotFound {
                column: column.to_string(),
            })
    }
}

impl TabularDataset for InMemoryDataset {
    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn column_values(&self, column: &str) -> Result<CellIter<'_>> {
        let column = self.find(column)?;
        Ok(Box::new(column.cells.iter().cloned()))
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    fn is_null(&self, column: &str, row: usize) -> Result<bool> {
        let found = self.find(column)?;
        found
            .cells
            .get(row)
            .map(CellValue::is_null)
            .ok_or_else(|| {
                AutodetectError::input(format!(
                    "Row {row} out of range for column '{column}' ({} rows)",
                    self.row_count
                ))
            })
    }

    fn distinct_count(&self, column: &str) -> Result<usize> {
        let found = self.find(column)?;
        let distinct: HashSet<String> = found
            .cells
            .iter()
            .filter(|cell| !cell.is_null())
            .map(CellValue::canonical_key)
            .collect();
        Ok(distinct.len())
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Builder for [`InMemoryDataset`].
#[derive(Debug, Default)]
pub struct InMemoryDatasetBuilder {
    columns: Vec<Column>,
}

impl InMemoryDatasetBuilder {
    /// Adds a column of arbitrary cells.
    pub fn column(mut self, name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        self.columns.push(Column {
            name: name.into(),
            cells,
        });
        self
    }

    /// Adds a numeric column; `None` marks a missing response.
    pub fn numeric_column<I>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let cells = values.into_iter().map(CellValue::from).collect();
        self.column(name, cells)
    }

    /// Adds a text column; `None` marks a missing response.
    pub fn text_column<'a, I>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let cells = values.into_iter().map(CellValue::from).collect();
        self.column(name, cells)
    }

    /// Adds a boolean column; `None` marks a missing response.
    pub fn bool_column<I>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<bool>>,
    {
        let cells = values.into_iter().map(CellValue::from).collect();
        self.column(name, cells)
    }

    /// Validates column lengths and names and builds the dataset.
    pub fn build(self) -> Result<InMemoryDataset> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(AutodetectError::input(format!(
                    "Duplicate column name '{}'",
                    column.name
                )));
            }
        }

        let row_count = self.columns.first().map(|c| c.cells.len()).unwrap_or(0);
        if let Some(bad) = self.columns.iter().find(|c| c.cells.len() != row_count) {
            return Err(AutodetectError::input(format!(
                "Column '{}' has {} rows, expected {row_count}",
                bad.name,
                bad.cells.len()
            )));
        }

        Ok(InMemoryDataset {
            columns: self.columns,
            row_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_access() {
        let dataset = InMemoryDataset::builder()
            .numeric_column("score", vec![Some(1.0), None, Some(3.0)])
            .text_column("region", vec![Some("north"), Some("south"), Some("north")])
            .build()
            .unwrap();

        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.column_count(), 2);
        assert!(dataset.is_null("score", 1).unwrap());
        assert!(!dataset.is_null("score", 0).unwrap());
        assert_eq!(dataset.distinct_count("region").unwrap(), 2);
        assert_eq!(dataset.column_values("score").unwrap().count(), 3);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = InMemoryDataset::builder()
            .numeric_column("a", vec![Some(1.0)])
            .numeric_column("b", vec![Some(1.0), Some(2.0)])
            .build();
        assert!(matches!(result, Err(AutodetectError::Input(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = InMemoryDataset::builder()
            .numeric_column("a", vec![Some(1.0)])
            .numeric_column("a", vec![Some(2.0)])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_column() {
        let dataset = InMemoryDataset::empty();
        assert!(matches!(
            dataset.column_values("nope"),
            Err(AutodetectError::ColumnNotFound { .. })
        ));
        assert_eq!(dataset.row_count(), 0);
        assert!(dataset.column_names().is_empty());
    }

    #[test]
    fn test_from_rows() {
        let dataset = InMemoryDataset::from_rows(
            &["id", "answer"],
            vec![
                vec![CellValue::Int(1), "yes".into()],
                vec![CellValue::Int(2), CellValue::Null],
            ],
        )
        .unwrap();
        assert_eq!(dataset.row_count(), 2);
        assert!(dataset.is_null("answer", 1).unwrap());

        let ragged = InMemoryDataset::from_rows(&["id"], vec![vec![CellValue::Int(1), CellValue::Int(2)]]);
        assert!(ragged.is_err());
    }
}
