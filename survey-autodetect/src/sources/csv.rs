//! CSV file source.

use std::path::Path;

use async_trait::async_trait;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use tracing::{debug, info, instrument};

use super::{collect_dataset, DatasetSource};
use crate::dataset::RecordBatchDataset;
use crate::error::{AutodetectError, Result};

/// Options for reading a CSV export.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Extension DataFusion expects on the file (default: ".csv")
    pub file_extension: String,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
    /// Register the file under this name in the caller's context.
    ///
    /// `None` reads the file without touching the context's catalog.
    pub table_name: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            file_extension: ".csv".to_string(),
            schema_infer_max_records: 1000,
            table_name: None,
        }
    }
}

/// A single CSV file, typically a survey platform export.
///
/// # Examples
///
/// ```rust,no_run
/// use survey_autodetect::sources::{CsvOptions, CsvSource};
///
/// let tab_separated = CsvSource::with_options(
///     "wave2.tsv",
///     CsvOptions {
///         delimiter: b'\t',
///         file_extension: ".tsv".to_string(),
///         ..Default::default()
///     },
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: String,
    options: CsvOptions,
}

impl CsvSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    pub fn with_options(path: impl Into<String>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }
}

#[async_trait]
impl DatasetSource for CsvSource {
    #[instrument(skip(self, ctx), fields(path = %self.path))]
    async fn load(&self, ctx: &SessionContext) -> Result<RecordBatchDataset> {
        if !Path::new(&self.path).is_file() {
            return Err(AutodetectError::data_source(
                "CSV",
                format!("File not found: {}", self.path),
            ));
        }

        let read_options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .file_extension(&self.options.file_extension)
            .schema_infer_max_records(self.options.schema_infer_max_records);

        let df = match &self.options.table_name {
            Some(table) => {
                ctx.register_csv(table.as_str(), &self.path, read_options).await?;
                debug!(table = %table, "Registered CSV file");
                ctx.table(table.as_str()).await?
            }
            None => ctx.read_csv(self.path.as_str(), read_options).await?,
        };
        let dataset = collect_dataset(df).await?;
        info!(
            columns = dataset.schema().fields().len(),
            batches = dataset.batches().len(),
            "Loaded CSV file"
        );
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("CSV file '{}'", self.path)
    }
}
