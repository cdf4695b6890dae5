//! Asynchronous dataset loaders.
//!
//! A [`DatasetSource`] materializes a table into a [`RecordBatchDataset`]
//! through a DataFusion [`SessionContext`]. Profiling itself is synchronous;
//! [`load_blocking`] bridges callers without a runtime.
//!
//! # Examples
//!
//! ```rust,no_run
//! use datafusion::prelude::SessionContext;
//! use survey_autodetect::sources::{CsvSource, DatasetSource};
//!
//! # async fn example() -> survey_autodetect::error::Result<()> {
//! let ctx = SessionContext::new();
//! let dataset = CsvSource::new("responses.csv").load(&ctx).await?;
//! println!("{} rows", dataset.batches().iter().map(|b| b.num_rows()).sum::<usize>());
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::SessionContext;

use crate::dataset::RecordBatchDataset;
use crate::error::{AutodetectError, Result};

mod csv;
mod table;

pub use csv::{CsvOptions, CsvSource};
pub use table::TableSource;

/// Something that can be loaded into a [`RecordBatchDataset`].
#[async_trait]
pub trait DatasetSource: Debug + Send + Sync {
    /// Loads every row through `ctx`.
    async fn load(&self, ctx: &SessionContext) -> Result<RecordBatchDataset>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Collects a DataFrame into a dataset.
///
/// The schema comes from the first batch when there is one so that the
/// dataset and its batches always agree; empty results use the plan schema.
pub(crate) async fn collect_dataset(df: DataFrame) -> Result<RecordBatchDataset> {
    let plan_schema = df.schema().inner().clone();
    let batches: Vec<RecordBatch> = df.collect().await?;
    let schema = batches
        .first()
        .map(RecordBatch::schema)
        .unwrap_or(plan_schema);
    RecordBatchDataset::new(schema, batches)
}

/// Loads a source on a private single-threaded runtime.
///
/// Must not be called from within an async context.
pub fn load_blocking(source: &dyn DatasetSource) -> Result<RecordBatchDataset> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AutodetectError::data_source("runtime", e.to_string()))?;
    let ctx = SessionContext::new();
    runtime.block_on(source.load(&ctx))
}
