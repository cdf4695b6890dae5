//! Tables already registered with a session.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use tracing::{info, instrument};

use super::{collect_dataset, DatasetSource};
use crate::dataset::RecordBatchDataset;
use crate::error::{AutodetectError, Result};

/// A table registered under `table_name` in the caller's context.
#[derive(Debug, Clone)]
pub struct TableSource {
    table_name: String,
}

impl TableSource {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl DatasetSource for TableSource {
    #[instrument(skip(self, ctx), fields(table = %self.table_name))]
    async fn load(&self, ctx: &SessionContext) -> Result<RecordBatchDataset> {
        let df = ctx.table(self.table_name.as_str()).await.map_err(|e| {
            AutodetectError::data_source(
                "Table",
                format!("Failed to open table '{}': {e}", self.table_name),
            )
        })?;
        let dataset = collect_dataset(df).await?;
        info!(batches = dataset.batches().len(), "Loaded table");
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("table '{}'", self.table_name)
    }
}
