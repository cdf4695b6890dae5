//! Types describing a profiled dataset.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of column classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    NumericContinuous,
    NumericDiscrete,
    Categorical,
    Text,
    Datetime,
    Geographic,
    Boolean,
}

impl DataType {
    /// Every variant, in declaration order.
    pub const ALL: [DataType; 7] = [
        DataType::NumericContinuous,
        DataType::NumericDiscrete,
        DataType::Categorical,
        DataType::Text,
        DataType::Datetime,
        DataType::Geographic,
        DataType::Boolean,
    ];

    /// Continuous or discrete numeric.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::NumericContinuous | DataType::NumericDiscrete)
    }

    /// Columns usable as grouping factors or in contingency tables.
    pub fn is_categorical(self) -> bool {
        matches!(self, DataType::Categorical | DataType::Boolean)
    }

    /// The serialized name.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::NumericContinuous => "NUMERIC_CONTINUOUS",
            DataType::NumericDiscrete => "NUMERIC_DISCRETE",
            DataType::Categorical => "CATEGORICAL",
            DataType::Text => "TEXT",
            DataType::Datetime => "DATETIME",
            DataType::Geographic => "GEOGRAPHIC",
            DataType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample-size band of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSizeCategory {
    Tiny,
    Small,
    Medium,
    Large,
}

impl SampleSizeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleSizeCategory::Tiny => "tiny",
            SampleSizeCategory::Small => "small",
            SampleSizeCategory::Medium => "medium",
            SampleSizeCategory::Large => "large",
        }
    }
}

impl fmt::Display for SampleSizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moments of a numeric column over its non-null values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    pub skew: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-column profile in dataset column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: DataType,
    pub null_count: usize,
    pub null_ratio: f64,
    pub distinct_count: usize,
    /// Mean character length of non-null values rendered as text
    pub mean_length: Option<f64>,
    /// False when the type came from a caller-supplied hint
    pub inferred: bool,
}

/// Corpus statistics for a single free-text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSummary {
    pub documents: usize,
    pub mean_length: f64,
    pub mean_word_count: f64,
    pub vocabulary_size: usize,
}

/// Aggregate corpus statistics across every free-text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCorpusStats {
    pub text_fields: Vec<String>,
    pub total_documents: usize,
    pub mean_length: f64,
    pub mean_word_count: f64,
    pub vocabulary_size: usize,
    /// Vocabulary size over total tokens
    pub type_token_ratio: f64,
}

/// Dataset-level profile shared by every detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetCharacteristics {
    pub dataset_name: Option<String>,
    pub n_observations: usize,
    /// Leading rows the profile read; below `n_observations` under a row limit
    pub scanned_rows: usize,
    pub n_variables: usize,
    pub columns: Vec<ColumnProfile>,
    pub variable_types: BTreeMap<String, DataType>,
    pub type_counts: BTreeMap<DataType, usize>,
    pub missing_percentage: f64,
    pub completeness_score: f64,
    pub sample_size_category: SampleSizeCategory,
    pub has_text: bool,
    pub has_datetime: bool,
    pub has_geographic: bool,
    pub duplicate_rows: usize,
    /// Rows with a non-null value in at least one text column
    pub text_respondents: usize,
    pub constant_columns: Vec<String>,
    pub high_cardinality_vars: Vec<String>,
    pub numeric_summaries: BTreeMap<String, NumericSummary>,
    pub text_summaries: BTreeMap<String, TextSummary>,
    pub text_corpus: Option<TextCorpusStats>,
    pub truncated: bool,
    pub skipped_columns: Vec<String>,
    pub detection_timestamp: DateTime<Utc>,
}

impl DatasetCharacteristics {
    /// Type of a column, if it was profiled.
    pub fn column_type(&self, column: &str) -> Option<DataType> {
        self.variable_types.get(column).copied()
    }

    /// Profile of a column, if present.
    pub fn column(&self, column: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == column)
    }

    /// Number of columns of the given type.
    pub fn count(&self, data_type: DataType) -> usize {
        self.type_counts.get(&data_type).copied().unwrap_or(0)
    }

    /// Columns matching a predicate on their type, in column order.
    pub fn columns_where(&self, predicate: impl Fn(DataType) -> bool) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| predicate(c.data_type))
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns_where(DataType::is_numeric)
    }

    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns_where(DataType::is_categorical)
    }

    pub fn text_columns(&self) -> Vec<&str> {
        self.columns_where(|t| t == DataType::Text)
    }

    pub fn numeric_count(&self) -> usize {
        self.count(DataType::NumericContinuous) + self.count(DataType::NumericDiscrete)
    }

    pub fn categorical_count(&self) -> usize {
        self.count(DataType::Categorical) + self.count(DataType::Boolean)
    }

    /// Respondents who answered at least one free-text question.
    ///
    /// Several text questions answered by the same people still count each
    /// respondent once, so corpus-size gates see the number of voices.
    pub fn text_document_count(&self) -> usize {
        self.text_respondents
    }

    /// Non-null responses summed over every text column.
    pub fn text_response_count(&self) -> usize {
        self.text_summaries.values().map(|s| s.documents).sum()
    }

    /// Non-text columns holding at least one value, in column order.
    ///
    /// All-null and skipped columns carry no structure to relate text to.
    pub fn structured_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.data_type != DataType::Text && c.distinct_count > 0)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Response-weighted mean length over every text column.
    pub fn mean_text_length(&self) -> f64 {
        let documents = self.text_response_count();
        if documents == 0 {
            return 0.0;
        }
        let total: f64 = self
            .text_summaries
            .values()
            .map(|s| s.mean_length * s.documents as f64)
            .sum();
        total / documents as f64
    }

    /// Largest absolute skew among numeric columns.
    pub fn max_abs_skew(&self) -> f64 {
        self.numeric_summaries
            .values()
            .map(|s| s.skew.abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&DataType::NumericContinuous).unwrap(),
            "\"NUMERIC_CONTINUOUS\""
        );
        assert_eq!(
            serde_json::to_string(&SampleSizeCategory::Small).unwrap(),
            "\"small\""
        );
        let parsed: DataType = serde_json::from_str("\"GEOGRAPHIC\"").unwrap();
        assert_eq!(parsed, DataType::Geographic);
    }

    #[test]
    fn test_type_count_map_keys_serialize_as_names() {
        let mut counts = BTreeMap::new();
        counts.insert(DataType::Boolean, 1usize);
        counts.insert(DataType::Text, 2usize);
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"TEXT":2,"BOOLEAN":1}"#);
    }

    #[test]
    fn test_type_groups() {
        assert!(DataType::NumericDiscrete.is_numeric());
        assert!(!DataType::Categorical.is_numeric());
        assert!(DataType::Boolean.is_categorical());
        assert_eq!(DataType::ALL.len(), 7);
        assert_eq!(DataType::Datetime.to_string(), "DATETIME");
    }
}
