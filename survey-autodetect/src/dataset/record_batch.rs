//! Arrow `RecordBatch` adapter.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType as ArrowDataType, Float64Type, Int64Type, SchemaRef, TimeUnit,
    TimestampMillisecondType,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;

use super::{CellIter, CellValue, TabularDataset};
use crate::error::{AutodetectError, ErrorContext, Result};

/// A dataset backed by one or more Arrow record batches sharing a schema.
///
/// Cells are converted lazily per column: integers widen to `i64`, floats
/// and decimals to `f64`, every string flavour to text and dates/timestamps
/// to naive date-times. Anything else falls back to Arrow's display
/// formatting.
#[derive(Debug, Clone)]
pub struct RecordBatchDataset {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    row_count: usize,
}

impl RecordBatchDataset {
    /// Wraps batches that share `schema`.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        if let Some(batch) = batches.iter().find(|b| b.schema() != schema) {
            return Err(AutodetectError::input(format!(
                "Record batch schema {:?} does not match dataset schema",
                batch.schema()
            )));
        }
        let row_count = batches.iter().map(RecordBatch::num_rows).sum();
        Ok(Self {
            schema,
            batches,
            row_count,
        })
    }

    /// Wraps a non-empty list of batches, taking the schema from the first.
    pub fn try_from_batches(batches: Vec<RecordBatch>) -> Result<Self> {
        let schema = batches
            .first()
            .map(RecordBatch::schema)
            .ok_or_else(|| AutodetectError::input("At least one record batch is required"))?;
        Self::new(schema, batches)
    }

    /// The Arrow schema.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The underlying batches.
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.schema
            .index_of(column)
            .map_err(|_| AutodetectError::ColumnNotFound {
                column: column.to_string(),
            })
    }
}

impl TabularDataset for RecordBatchDataset {
    fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn column_values(&self, column: &str) -> Result<CellIter<'_>> {
        let index = self.column_index(column)?;
        let mut cells = Vec::with_capacity(self.row_count);
        for batch in &self.batches {
            cells.extend(
                array_to_cells(batch.column(index))
                    .with_context(|| format!("Converting column '{column}'"))?,
            );
        }
        Ok(Box::new(cells.into_iter()))
    }

    fn has_column(&self, column: &str) -> bool {
        self.schema.index_of(column).is_ok()
    }

    fn is_null(&self, column: &str, row: usize) -> Result<bool> {
        let index = self.column_index(column)?;
        let mut offset = row;
        for batch in &self.batches {
            if offset < batch.num_rows() {
                let array = batch.column(index);
                if array.is_null(offset) {
                    return Ok(true);
                }
                let cell = array_to_cells(&array.slice(offset, 1))?;
                return Ok(cell.first().map(CellValue::is_null).unwrap_or(true));
            }
            offset -= batch.num_rows();
        }
        Err(AutodetectError::input(format!(
            "Row {row} out of range for column '{column}' ({} rows)",
            self.row_count
        )))
    }

    fn column_count(&self) -> usize {
        self.schema.fields().len()
    }
}

/// Converts one Arrow array into cells.
fn array_to_cells(array: &ArrayRef) -> Result<Vec<CellValue>> {
    let len = array.len();
    let data_type = array.data_type();

    let cells = match data_type {
        ArrowDataType::Null => vec![CellValue::Null; len],
        ArrowDataType::Boolean => {
            let arr = array.as_boolean();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Null
                    } else {
                        CellValue::Bool(arr.value(i))
                    }
                })
                .collect()
        }
        dt if dt.is_integer() => {
            let widened = cast(array, &ArrowDataType::Int64)?;
            let arr = widened.as_primitive::<Int64Type>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Null
                    } else {
                        CellValue::Int(arr.value(i))
                    }
                })
                .collect()
        }
        dt if dt.is_floating()
            || matches!(
                dt,
                ArrowDataType::Decimal128(..) | ArrowDataType::Decimal256(..)
            ) =>
        {
            let widened = cast(array, &ArrowDataType::Float64)?;
            let arr = widened.as_primitive::<Float64Type>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Null
                    } else {
                        CellValue::Float(arr.value(i)).normalized()
                    }
                })
                .collect()
        }
        ArrowDataType::Utf8 | ArrowDataType::LargeUtf8 | ArrowDataType::Utf8View => {
            let strings = cast(array, &ArrowDataType::Utf8)?;
            let arr = strings.as_string::<i32>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Null
                    } else {
                        CellValue::Text(arr.value(i).to_string()).normalized()
                    }
                })
                .collect()
        }
        ArrowDataType::Date32 | ArrowDataType::Date64 | ArrowDataType::Timestamp(..) => {
            let stamps = cast(
                array,
                &ArrowDataType::Timestamp(TimeUnit::Millisecond, None),
            )?;
            let arr = stamps.as_primitive::<TimestampMillisecondType>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Null
                    } else {
                        arr.value_as_datetime(i)
                            .map(CellValue::DateTime)
                            .unwrap_or(CellValue::Null)
                    }
                })
                .collect()
        }
        _ => {
            let mut cells = Vec::with_capacity(len);
            for i in 0..len {
                if array.is_null(i) {
                    cells.push(CellValue::Null);
                } else {
                    cells.push(CellValue::Text(array_value_to_string(array, i)?).normalized());
                }
            }
            cells
        }
    };

    Ok(cells)
}
