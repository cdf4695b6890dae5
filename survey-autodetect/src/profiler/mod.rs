//! Dataset profiling.
//!
//! The [`DataProfiler`] walks a [`TabularDataset`] column by column. Each
//! column is scanned once to classify its [`DataType`] and gather null and
//! distinct counts; numeric and text columns additionally get a summary.
//! Dataset-level quality metrics are derived from the per-column results.
//!
//! Malformed cells never fail profiling: NaN/infinite floats and blank
//! strings are treated as missing.
//!
//! # Example
//!
//! ```rust
//! use survey_autodetect::dataset::InMemoryDataset;
//! use survey_autodetect::profiler::{DataProfiler, DataType};
//!
//! let dataset = InMemoryDataset::builder()
//!     .numeric_column("rating", (0..40).map(|i| Some((i % 5) as f64)))
//!     .build()
//!     .unwrap();
//!
//! let profiler = DataProfiler::builder().row_limit(10_000).build();
//! let profile = profiler.profile(&dataset, None).unwrap();
//!
//! assert_eq!(profile.column_type("rating"), Some(DataType::NumericDiscrete));
//! assert_eq!(profile.sample_size_category.as_str(), "small");
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::dataset::{CellValue, TabularDataset};
use crate::error::Result;
use crate::logging::LogConfig;
use crate::policy::ProfilingPolicy;

mod characteristics;
pub mod inference;
pub mod stats;

pub use characteristics::{
    ColumnProfile, DataType, DatasetCharacteristics, NumericSummary, SampleSizeCategory,
    TextCorpusStats, TextSummary,
};

use inference::{classify, is_high_cardinality, ColumnScan};

/// Profiler configuration.
#[derive(Debug, Clone, Default)]
pub struct ProfilerConfig {
    /// Classification and quality thresholds
    pub policy: ProfilingPolicy,
    /// Maximum rows scanned per column
    pub row_limit: Option<usize>,
    /// Wall-clock budget, checked between columns
    pub time_budget: Option<Duration>,
    pub log: LogConfig,
}

/// Caller-supplied knowledge about a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub name: Option<String>,
    /// Column types that override inference
    #[serde(default)]
    pub type_hints: BTreeMap<String, DataType>,
}

impl DatasetMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type_hint(mut self, column: impl Into<String>, data_type: DataType) -> Self {
        self.type_hints.insert(column.into(), data_type);
        self
    }
}

/// Progress callback for profiling operations
pub type ProgressCallback = Arc<dyn Fn(ProfilerProgress) + Send + Sync>;

/// Progress information during profiling
#[derive(Debug, Clone)]
pub struct ProfilerProgress {
    pub column_index: usize,
    pub total_columns: usize,
    pub column_name: String,
    pub message: String,
}

/// Builder for [`DataProfiler`]
#[derive(Default)]
pub struct DataProfilerBuilder {
    config: ProfilerConfig,
    progress_callback: Option<ProgressCallback>,
}

impl DataProfilerBuilder {
    /// Replace the classification thresholds
    pub fn policy(mut self, policy: ProfilingPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Only scan the first `rows` rows of each column
    pub fn row_limit(mut self, rows: usize) -> Self {
        self.config.row_limit = Some(rows);
        self
    }

    /// Stop profiling new columns once `budget` has elapsed
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.config.time_budget = Some(budget);
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.config.log = log;
        self
    }

    /// Set progress callback
    pub fn progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProfilerProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> DataProfiler {
        DataProfiler {
            config: self.config,
            progress_callback: self.progress_callback,
        }
    }
}

/// Computes [`DatasetCharacteristics`] for any [`TabularDataset`].
#[derive(Clone)]
pub struct DataProfiler {
    config: ProfilerConfig,
    progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for DataProfiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProfiler")
            .field("config", &self.config)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl Default for DataProfiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Intermediate result for one profiled column.
struct ColumnOutcome {
    profile: ColumnProfile,
    constant: bool,
    high_cardinality: bool,
    numeric: Option<NumericSummary>,
    text: Option<TextSummary>,
}

impl DataProfiler {
    pub fn builder() -> DataProfilerBuilder {
        DataProfilerBuilder::default()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Profiles a dataset.
    ///
    /// Fails only when the dataset itself reports an error while iterating a
    /// column it listed. When the time budget runs out, the remaining columns
    /// are listed in `skipped_columns`, typed with the categorical fallback
    /// and left out of the missingness average; `truncated` is set.
    #[instrument(skip_all, fields(rows = dataset.row_count(), columns = dataset.column_count()))]
    pub fn profile(
        &self,
        dataset: &dyn TabularDataset,
        metadata: Option<&DatasetMetadata>,
    ) -> Result<DatasetCharacteristics> {
        let start = Instant::now();
        let deadline = self.config.time_budget.map(|budget| start + budget);

        let names = dataset.column_names();
        let n_observations = dataset.row_count();
        let scan_rows = self
            .config
            .row_limit
            .map_or(n_observations, |limit| limit.min(n_observations));
        let mut truncated = scan_rows < n_observations;

        info!(
            rows = n_observations,
            scanned_rows = scan_rows,
            columns = names.len(),
            "Starting dataset profiling"
        );

        let mut row_keys = vec![String::new(); scan_rows];
        let mut text_rows = vec![false; scan_rows];
        let mut outcomes = Vec::with_capacity(names.len());
        let mut skipped_columns = Vec::new();

        for (index, name) in names.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                truncated = true;
                skipped_columns.extend(names[index..].iter().cloned());
                info!(
                    profiled = index,
                    skipped = names.len() - index,
                    "Time budget exhausted, returning partial profile"
                );
                break;
            }

            self.report_progress(index, names.len(), name, "Classifying column");

            let cells: Vec<CellValue> = dataset
                .column_values(name)?
                .take(scan_rows)
                .map(CellValue::normalized)
                .collect();
            for (key, cell) in row_keys.iter_mut().zip(&cells) {
                key.push_str(&cell.canonical_key());
                key.push('\u{1f}');
            }

            let hint = metadata.and_then(|m| m.type_hints.get(name)).copied();
            let outcome = self.profile_column(name, &cells, hint);
            if outcome.profile.data_type == DataType::Text {
                for (answered, cell) in text_rows.iter_mut().zip(&cells) {
                    *answered |= !cell.is_null();
                }
            }

            crate::log_profiling!(
                self.config.log,
                column = %name,
                data_type = %outcome.profile.data_type,
                nulls = outcome.profile.null_count,
                distinct = outcome.profile.distinct_count,
                "Profiled column"
            );
            outcomes.push(outcome);
        }

        let duplicate_rows = if outcomes.is_empty() {
            0
        } else {
            count_duplicates(&row_keys)
        };

        let characteristics = self.assemble(
            metadata.and_then(|m| m.name.clone()),
            n_observations,
            outcomes,
            skipped_columns,
            RowCounts {
                scanned: scan_rows,
                duplicates: duplicate_rows,
                text_respondents: text_rows.iter().filter(|answered| **answered).count(),
            },
            truncated,
        );

        crate::perf_debug!(
            self.config.log,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Profiling timings"
        );
        info!(
            missing_percentage = characteristics.missing_percentage,
            completeness = characteristics.completeness_score,
            truncated = characteristics.truncated,
            "Completed dataset profiling"
        );

        Ok(characteristics)
    }

    fn profile_column(&self, name: &str, cells: &[CellValue], hint: Option<DataType>) -> ColumnOutcome {
        let policy = &self.config.policy;
        let scan = ColumnScan::from_cells(cells.iter().cloned());
        let data_type = hint.unwrap_or_else(|| classify(&scan, policy));

        let numeric = if data_type.is_numeric() {
            stats::summarize(&scan.numeric)
        } else {
            None
        };
        let text = if data_type == DataType::Text {
            summarize_text(cells)
        } else {
            None
        };

        ColumnOutcome {
            constant: scan.non_null() > 0 && scan.distinct_count() <= 1,
            high_cardinality: data_type == DataType::Categorical
                && is_high_cardinality(&scan, policy),
            numeric,
            text,
            profile: ColumnProfile {
                name: name.to_string(),
                data_type,
                null_count: scan.null_count,
                null_ratio: scan.null_ratio(),
                distinct_count: scan.distinct_count(),
                mean_length: scan.mean_length(),
                inferred: hint.is_none(),
            },
        }
    }

    fn assemble(
        &self,
        dataset_name: Option<String>,
        n_observations: usize,
        outcomes: Vec<ColumnOutcome>,
        skipped_columns: Vec<String>,
        rows: RowCounts,
        truncated: bool,
    ) -> DatasetCharacteristics {
        let policy = &self.config.policy;
        let duplicate_rows = rows.duplicates;

        let missing_percentage = if n_observations == 0 || outcomes.is_empty() {
            0.0
        } else {
            let total: f64 = outcomes.iter().map(|o| o.profile.null_ratio).sum();
            (total / outcomes.len() as f64 * 100.0).clamp(0.0, 100.0)
        };

        let mut columns = Vec::with_capacity(outcomes.len() + skipped_columns.len());
        let mut constant_columns = Vec::new();
        let mut high_cardinality_vars = Vec::new();
        let mut numeric_summaries = BTreeMap::new();
        let mut text_summaries = BTreeMap::new();

        for outcome in outcomes {
            let name = &outcome.profile.name;
            if outcome.constant {
                constant_columns.push(name.clone());
            }
            if outcome.high_cardinality {
                high_cardinality_vars.push(name.clone());
            }
            if let Some(summary) = outcome.numeric {
                numeric_summaries.insert(name.clone(), summary);
            }
            if let Some(summary) = outcome.text {
                text_summaries.insert(name.clone(), summary);
            }
            columns.push(outcome.profile);
        }
        columns.extend(skipped_columns.iter().map(|name| ColumnProfile {
            name: name.clone(),
            data_type: DataType::Categorical,
            null_count: 0,
            null_ratio: 0.0,
            distinct_count: 0,
            mean_length: None,
            inferred: false,
        }));

        let completeness_score = if n_observations == 0 {
            0.0
        } else {
            let constant_penalty = (constant_columns.len() as f64 * policy.constant_column_penalty)
                .min(policy.constant_column_penalty_cap);
            let duplicate_penalty =
                if duplicate_rows as f64 / n_observations as f64 > policy.duplicate_row_ratio {
                    policy.duplicate_row_penalty
                } else {
                    0.0
                };
            (100.0 - missing_percentage - constant_penalty - duplicate_penalty).clamp(0.0, 100.0)
        };

        let mut type_counts: BTreeMap<DataType, usize> =
            DataType::ALL.iter().map(|t| (*t, 0)).collect();
        let mut variable_types = BTreeMap::new();
        for column in &columns {
            *type_counts.entry(column.data_type).or_insert(0) += 1;
            variable_types.insert(column.name.clone(), column.data_type);
        }

        let has = |t: DataType| columns.iter().any(|c| c.data_type == t);
        let has_text = has(DataType::Text);
        let has_datetime = has(DataType::Datetime);
        let has_geographic = has(DataType::Geographic);

        DatasetCharacteristics {
            dataset_name,
            n_observations,
            scanned_rows: rows.scanned,
            n_variables: columns.len(),
            sample_size_category: self.sample_size_category(n_observations),
            variable_types,
            type_counts,
            missing_percentage,
            completeness_score,
            has_text,
            has_datetime,
            has_geographic,
            duplicate_rows,
            text_respondents: rows.text_respondents,
            constant_columns,
            high_cardinality_vars,
            numeric_summaries,
            text_summaries,
            text_corpus: None,
            truncated,
            skipped_columns,
            columns,
            detection_timestamp: Utc::now(),
        }
    }

    /// Maps an observation count onto the configured sample-size bands.
    pub fn sample_size_category(&self, n: usize) -> SampleSizeCategory {
        let policy = &self.config.policy;
        if n >= policy.large_sample_min {
            SampleSizeCategory::Large
        } else if n >= policy.medium_sample_min {
            SampleSizeCategory::Medium
        } else if n >= policy.small_sample_min {
            SampleSizeCategory::Small
        } else {
            SampleSizeCategory::Tiny
        }
    }

    /// Report progress to callback if configured
    fn report_progress(&self, column_index: usize, total_columns: usize, column: &str, message: &str) {
        if let Some(callback) = &self.progress_callback {
            callback(ProfilerProgress {
                column_index,
                total_columns,
                column_name: column.to_string(),
                message: message.to_string(),
            });
        }
    }
}

/// Row-level tallies gathered while scanning columns.
struct RowCounts {
    scanned: usize,
    duplicates: usize,
    text_respondents: usize,
}

/// Rows equal to an earlier row.
fn count_duplicates(row_keys: &[String]) -> usize {
    let mut seen = HashSet::with_capacity(row_keys.len());
    row_keys.iter().filter(|key| !seen.insert(key.as_str())).count()
}

/// Lower-cased word tokens of a response.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn summarize_text(cells: &[CellValue]) -> Option<TextSummary> {
    let mut documents = 0usize;
    let mut length = 0usize;
    let mut words = 0usize;
    let mut vocabulary = HashSet::new();

    for text in cells.iter().filter_map(CellValue::as_text) {
        documents += 1;
        length += text.chars().count();
        for token in tokenize(&text) {
            words += 1;
            vocabulary.insert(token);
        }
    }

    (documents > 0).then(|| TextSummary {
        documents,
        mean_length: length as f64 / documents as f64,
        mean_word_count: words as f64 / documents as f64,
        vocabulary_size: vocabulary.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use crate::test_fixtures::{feedback_dataset, numeric_dataset};
    use std::sync::Mutex;

    #[test]
    fn test_counts_and_invariants() {
        let dataset = feedback_dataset(40);
        let profile = DataProfiler::new().profile(&dataset, None).unwrap();

        assert_eq!(profile.n_observations, 40);
        assert_eq!(profile.n_variables, dataset.column_count());
        assert_eq!(profile.type_counts.values().sum::<usize>(), profile.n_variables);
        assert_eq!(profile.type_counts.len(), 7);
        assert!(profile.has_text);
        assert_eq!(profile.column_type("comment"), Some(DataType::Text));
        assert_eq!(profile.column_type("group"), Some(DataType::Categorical));
        assert!(profile.numeric_summaries.contains_key("score"));
        assert!(profile.text_summaries.contains_key("comment"));
        assert_eq!(profile.sample_size_category, SampleSizeCategory::Small);
    }

    #[test]
    fn test_text_respondents_count_rows_not_cells() {
        let rows = 12;
        let liked: Vec<Option<String>> = (0..rows)
            .map(|i| (i < 8).then(|| format!("Respondent {i} liked how quickly the courier arrived")))
            .collect();
        let disliked: Vec<Option<String>> = (0..rows)
            .map(|i| (i >= 4).then(|| format!("Respondent {i} disliked the packaging waste this time")))
            .collect();
        let dataset = InMemoryDataset::builder()
            .text_column("liked", liked.iter().map(|v| v.as_deref()))
            .text_column("disliked", disliked.iter().map(|v| v.as_deref()))
            .numeric_column("empty", (0..rows).map(|_| None::<f64>))
            .build()
            .unwrap();
        let profile = DataProfiler::new().profile(&dataset, None).unwrap();

        assert_eq!(profile.count(DataType::Text), 2);
        assert_eq!(profile.text_response_count(), 16);
        assert_eq!(profile.text_document_count(), 12);
        assert!(profile.structured_columns().is_empty());
    }

    #[test]
    fn test_missing_percentage_is_mean_of_column_ratios() {
        let dataset = InMemoryDataset::builder()
            .numeric_column("a", (0..10).map(|i| if i < 5 { None } else { Some(i as f64) }))
            .numeric_column("b", (0..10).map(|i| Some(i as f64 * 1.5)))
            .build()
            .unwrap();
        let profile = DataProfiler::new().profile(&dataset, None).unwrap();
        assert!((profile.missing_percentage - 25.0).abs() < 1e-9);
        assert!((profile.completeness_score - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_and_duplicate_penalties() {
        let dataset = InMemoryDataset::builder()
            .text_column("wave", vec![Some("w1"); 20])
            .numeric_column("x", (0..20).map(|i| Some((i % 2) as f64)))
            .build()
            .unwrap();
        let profile = DataProfiler::new().profile(&dataset, None).unwrap();

        assert_eq!(profile.constant_columns, vec!["wave"]);
        assert_eq!(profile.duplicate_rows, 18);
        assert!((profile.completeness_score - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_penalty_is_capped() {
        let mut builder = InMemoryDataset::builder();
        for i in 0..6 {
            builder = builder.numeric_column(format!("c{i}"), vec![Some(1.0); 10]);
        }
        let dataset = builder
            .numeric_column("id", (0..10).map(|i| Some(i as f64)))
            .build()
            .unwrap();
        let profile = DataProfiler::new().profile(&dataset, None).unwrap();
        assert_eq!(profile.constant_columns.len(), 6);
        assert!((profile.completeness_score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_dataset() {
        let profile = DataProfiler::new()
            .profile(&InMemoryDataset::empty(), None)
            .unwrap();
        assert_eq!(profile.n_observations, 0);
        assert_eq!(profile.n_variables, 0);
        assert_eq!(profile.completeness_score, 0.0);
        assert_eq!(profile.missing_percentage, 0.0);
        assert_eq!(profile.duplicate_rows, 0);
        assert_eq!(profile.sample_size_category, SampleSizeCategory::Tiny);
    }

    #[test]
    fn test_columns_without_rows() {
        let dataset = InMemoryDataset::builder()
            .numeric_column("a", Vec::<Option<f64>>::new())
            .text_column("b", Vec::<Option<&str>>::new())
            .build()
            .unwrap();
        let profile = DataProfiler::new().profile(&dataset, None).unwrap();
        assert_eq!(profile.n_variables, 2);
        assert_eq!(profile.count(DataType::Categorical), 2);
        assert_eq!(profile.completeness_score, 0.0);
        assert!(profile.constant_columns.is_empty());
    }

    #[test]
    fn test_type_hints_override_inference() {
        let dataset = numeric_dataset(50, 1, 7);
        let metadata = DatasetMetadata::new()
            .with_name("wave-1")
            .with_type_hint("x0", DataType::Categorical);
        let profile = DataProfiler::new().profile(&dataset, Some(&metadata)).unwrap();
        assert_eq!(profile.dataset_name.as_deref(), Some("wave-1"));
        assert_eq!(profile.column_type("x0"), Some(DataType::Categorical));
        assert!(!profile.columns[0].inferred);
        assert!(profile.numeric_summaries.is_empty());
    }

    #[test]
    fn test_row_limit_truncates() {
        let dataset = numeric_dataset(200, 2, 3);
        let profile = DataProfiler::builder()
            .row_limit(50)
            .build()
            .profile(&dataset, None)
            .unwrap();
        assert!(profile.truncated);
        assert_eq!(profile.n_observations, 200);
        assert_eq!(profile.scanned_rows, 50);
        assert_eq!(profile.numeric_summaries["x0"].count, 50);
        assert!(profile.skipped_columns.is_empty());
    }

    #[test]
    fn test_zero_time_budget_skips_columns() {
        let dataset = numeric_dataset(20, 3, 5);
        let profile = DataProfiler::builder()
            .time_budget(Duration::ZERO)
            .build()
            .profile(&dataset, None)
            .unwrap();
        assert!(profile.truncated);
        assert_eq!(profile.skipped_columns, vec!["x0", "x1", "x2"]);
        assert_eq!(profile.n_variables, 3);
        assert_eq!(profile.type_counts.values().sum::<usize>(), 3);
        assert!((0.0..=100.0).contains(&profile.completeness_score));
    }

    #[test]
    fn test_progress_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let profiler = DataProfiler::builder()
            .progress_callback(move |p| sink.lock().unwrap().push(p.column_name))
            .build();
        profiler.profile(&numeric_dataset(10, 2, 1), None).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["x0", "x1"]);
    }

    #[test]
    fn test_sample_size_bands() {
        let profiler = DataProfiler::new();
        assert_eq!(profiler.sample_size_category(29), SampleSizeCategory::Tiny);
        assert_eq!(profiler.sample_size_category(30), SampleSizeCategory::Small);
        assert_eq!(profiler.sample_size_category(99), SampleSizeCategory::Small);
        assert_eq!(profiler.sample_size_category(100), SampleSizeCategory::Medium);
        assert_eq!(profiler.sample_size_category(499), SampleSizeCategory::Medium);
        assert_eq!(profiler.sample_size_category(500), SampleSizeCategory::Large);
    }

    #[test]
    fn test_tokenize() {
        let tokens: Vec<String> = tokenize("It's GREAT, really great!").collect();
        assert_eq!(tokens, vec!["it's", "great", "really", "great"]);
    }
}
