//! Default parameter derivation for recommended methods.
//!
//! [`ConfigurationResolver::resolve`] computes a method's defaults from the
//! dataset profile and analysis context, then merges caller overrides on
//! top. Overrides always win.
//!
//! ```rust
//! use survey_autodetect::configuration::{ConfigurationResolver, ParameterValue, Parameters};
//! use survey_autodetect::context::AnalysisContext;
//! use survey_autodetect::dataset::InMemoryDataset;
//! use survey_autodetect::profiler::DataProfiler;
//!
//! let dataset = InMemoryDataset::builder()
//!     .numeric_column("wait_minutes", (0..64).map(|i| Some(i as f64 * 1.5)))
//!     .build()
//!     .unwrap();
//! let profile = DataProfiler::new().profile(&dataset, None).unwrap();
//! let resolver = ConfigurationResolver::default();
//!
//! let mut overrides = Parameters::new();
//! overrides.insert("bins".into(), ParameterValue::Integer(12));
//!
//! let params = resolver
//!     .resolve("distribution_analysis", &profile, &AnalysisContext::default(), Some(&overrides))
//!     .unwrap();
//! assert_eq!(params["bins"], ParameterValue::Integer(12));
//! assert_eq!(params["alpha"], ParameterValue::Float(0.05));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::catalogue::{AnalysisModule, MethodCatalogue};
use crate::context::AnalysisContext;
use crate::detectors::descriptive::choose_outlier_method;
use crate::error::{AutodetectError, Result};
use crate::policy::DetectionPolicy;
use crate::profiler::{DataType, DatasetCharacteristics};

/// A single parameter value; serializes as the bare primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParameterValue]> {
        match self {
            ParameterValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Boolean(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<usize> for ParameterValue {
    fn from(value: usize) -> Self {
        ParameterValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

impl<T: Into<ParameterValue>> From<Vec<T>> for ParameterValue {
    fn from(values: Vec<T>) -> Self {
        ParameterValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Named parameters in deterministic key order.
pub type Parameters = BTreeMap<String, ParameterValue>;

/// Histogram bin count by Sturges' rule.
pub fn sturges_bins(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    ((n as f64).log2() + 1.0).ceil() as usize
}

/// Derives default parameters for any catalogued method.
#[derive(Debug, Clone)]
pub struct ConfigurationResolver {
    policy: Arc<DetectionPolicy>,
    catalogues: Vec<Arc<MethodCatalogue>>,
}

impl Default for ConfigurationResolver {
    fn default() -> Self {
        Self::new(Arc::new(DetectionPolicy::default()))
    }
}

impl ConfigurationResolver {
    /// A resolver over the built-in catalogues.
    pub fn new(policy: Arc<DetectionPolicy>) -> Self {
        let catalogues = AnalysisModule::ALL
            .iter()
            .map(|m| Arc::new(MethodCatalogue::for_module(*m)))
            .collect();
        Self::with_catalogues(policy, catalogues)
    }

    pub fn with_catalogues(policy: Arc<DetectionPolicy>, catalogues: Vec<Arc<MethodCatalogue>>) -> Self {
        Self { policy, catalogues }
    }

    /// Which family a method belongs to.
    pub fn module_of(&self, method: &str) -> Option<AnalysisModule> {
        self.catalogues
            .iter()
            .find(|c| c.contains(method))
            .map(|c| c.module)
    }

    /// Computes defaults for `method` and merges `overrides` over them.
    #[instrument(skip(self, characteristics, context, overrides))]
    pub fn resolve(
        &self,
        method: &str,
        characteristics: &DatasetCharacteristics,
        context: &AnalysisContext,
        overrides: Option<&Parameters>,
    ) -> Result<Parameters> {
        if self.module_of(method).is_none() {
            return Err(AutodetectError::configuration(format!(
                "Unknown method '{method}': no catalogue defines it"
            )));
        }

        let mut params = Parameters::new();
        params.insert("alpha".into(), context.effective_alpha().into());
        params.insert("confidence_level".into(), 0.95.into());
        self.method_defaults(method, characteristics, context, &mut params);

        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                params.insert(key.clone(), value.clone());
            }
        }

        debug!(method, parameters = params.len(), "Resolved method configuration");
        Ok(params)
    }

    fn method_defaults(
        &self,
        method: &str,
        ch: &DatasetCharacteristics,
        context: &AnalysisContext,
        params: &mut Parameters,
    ) {
        let numeric = names(ch.numeric_columns());
        let categorical = names(ch.categorical_columns());
        let text = names(ch.text_columns());
        let descriptive = &self.policy.descriptive;

        match method {
            "basic_statistics" => {
                params.insert("variables".into(), numeric.into());
            }
            "distribution_analysis" => {
                params.insert("variables".into(), numeric.into());
                params.insert("bins".into(), sturges_bins(ch.n_observations).into());
            }
            "correlation_analysis" => {
                params.insert("variables".into(), numeric.into());
                params.insert("method".into(), self.correlation_method(ch).into());
            }
            "outlier_detection" => {
                let choice = choose_outlier_method(ch, descriptive);
                params.insert("variables".into(), numeric.into());
                params.insert("method".into(), choice.method.into());
                params.insert("candidate_methods".into(), choice.candidates.into());
                match choice.method {
                    "zscore" => {
                        params.insert("threshold".into(), 3.0.into());
                    }
                    "isolation_forest" => {
                        params.insert("contamination".into(), 0.05.into());
                        params.insert("n_estimators".into(), 100usize.into());
                        params.insert("random_state".into(), 42usize.into());
                    }
                    "mad" => {
                        params.insert("threshold".into(), 3.5.into());
                    }
                    _ => {
                        params.insert("threshold".into(), 1.5.into());
                    }
                }
            }
            "categorical_analysis" => {
                params.insert("variables".into(), categorical.into());
            }
            "cross_tabulation" => {
                let mut pair = categorical.into_iter();
                if let (Some(rows), Some(columns)) = (pair.next(), pair.next()) {
                    params.insert("row_variable".into(), rows.into());
                    params.insert("column_variable".into(), columns.into());
                }
                params.insert("normalize".into(), "row".into());
            }
            "temporal_analysis" => {
                params.insert(
                    "variables".into(),
                    names(ch.columns_where(|t| t == DataType::Datetime)).into(),
                );
                params.insert("frequency".into(), "auto".into());
            }
            "geospatial_analysis" => {
                params.insert(
                    "variables".into(),
                    names(ch.columns_where(|t| t == DataType::Geographic)).into(),
                );
            }
            "missing_data_analysis" => {
                let incomplete: Vec<String> = ch
                    .columns
                    .iter()
                    .filter(|c| c.null_count > 0)
                    .map(|c| c.name.clone())
                    .collect();
                params.insert("variables".into(), incomplete.into());
                params.insert("mcar_test".into(), "little".into());
            }
            "two_sample_t_test" | "welch_t_test" | "paired_t_test" | "mann_whitney_u"
            | "wilcoxon_signed_rank" => {
                self.insert_target_and_group(context, params);
                params.insert("alternative".into(), "two-sided".into());
                match method {
                    "two_sample_t_test" => {
                        params.insert("equal_var".into(), true.into());
                    }
                    "welch_t_test" => {
                        params.insert("equal_var".into(), false.into());
                    }
                    _ => {}
                }
            }
            "one_way_anova" => {
                self.insert_target_and_group(context, params);
                params.insert("post_hoc".into(), "tukey_hsd".into());
            }
            "kruskal_wallis" => {
                self.insert_target_and_group(context, params);
                params.insert("post_hoc".into(), "dunn".into());
            }
            "chi_square_independence" | "fisher_exact" => {
                let (rows, columns) = self.categorical_pair(ch, context);
                let levels = |name: &Option<String>| {
                    name.as_deref()
                        .and_then(|n| ch.column(n))
                        .map(|p| p.distinct_count)
                };
                let two_by_two = levels(&rows) == Some(2) && levels(&columns) == Some(2);
                if let Some(rows) = rows {
                    params.insert("row_variable".into(), rows.into());
                }
                if let Some(columns) = columns {
                    params.insert("column_variable".into(), columns.into());
                }
                if method == "chi_square_independence" {
                    params.insert("yates_correction".into(), two_by_two.into());
                } else {
                    params.insert("alternative".into(), "two-sided".into());
                }
            }
            "correlation_test" => {
                params.insert("method".into(), self.correlation_method(ch).into());
                let variables = match context.target_variable.as_deref() {
                    Some(target) if ch.column_type(target).is_some_and(DataType::is_numeric) => {
                        let mut vars = vec![target.to_string()];
                        vars.extend(self.numeric_predictors(ch, context));
                        vars
                    }
                    _ => numeric,
                };
                params.insert("variables".into(), variables.into());
            }
            "linear_regression" | "logistic_regression" => {
                if let Some(target) = &context.target_variable {
                    params.insert("target".into(), target.clone().into());
                }
                params.insert("predictors".into(), self.numeric_predictors(ch, context).into());
                params.insert("fit_intercept".into(), true.into());
                if method == "logistic_regression" {
                    params.insert("max_iter".into(), 100usize.into());
                }
            }
            "normality_test" => {
                let test = if ch.n_observations <= 5000 {
                    "shapiro_wilk"
                } else {
                    "kolmogorov_smirnov"
                };
                params.insert("test".into(), test.into());
                let variables = match context.target_variable.as_deref() {
                    Some(target) if ch.column_type(target).is_some_and(DataType::is_numeric) => {
                        vec![target.to_string()]
                    }
                    _ => numeric,
                };
                params.insert("variables".into(), variables.into());
            }
            "sentiment_analysis" => {
                params.insert("text_fields".into(), text.into());
                params.insert("model".into(), "lexicon".into());
            }
            "thematic_analysis" => {
                let n_themes = self
                    .policy
                    .qualitative
                    .max_themes
                    .min(ch.text_document_count() / 2);
                params.insert("text_fields".into(), text.into());
                params.insert("n_themes".into(), n_themes.into());
            }
            "content_analysis" => {
                params.insert("text_fields".into(), text.into());
                params.insert("coding_scheme".into(), "emergent".into());
            }
            "survey_analysis" => {
                let structured = names(ch.structured_columns());
                params.insert("text_fields".into(), text.into());
                params.insert("structured_fields".into(), structured.into());
            }
            "keyword_extraction" => {
                params.insert("text_fields".into(), text.into());
                params.insert("top_k".into(), 20usize.into());
            }
            _ => {}
        }
    }

    fn insert_target_and_group(&self, context: &AnalysisContext, params: &mut Parameters) {
        if let Some(target) = &context.target_variable {
            params.insert("target".into(), target.clone().into());
        }
        if let Some(group) = &context.grouping_variable {
            params.insert("group".into(), group.clone().into());
        }
    }

    /// Pearson unless any numeric column is markedly skewed.
    fn correlation_method(&self, ch: &DatasetCharacteristics) -> &'static str {
        if ch.max_abs_skew() <= self.policy.inferential.parametric_max_abs_skew {
            "pearson"
        } else {
            "spearman"
        }
    }

    /// Explicit predictors, else every numeric column other than the target.
    pub fn numeric_predictors(&self, ch: &DatasetCharacteristics, context: &AnalysisContext) -> Vec<String> {
        if !context.predictor_variables.is_empty() {
            return context.predictor_variables.clone();
        }
        let target = context.target_variable.as_deref();
        let grouping = context.grouping_variable.as_deref();
        ch.numeric_columns()
            .into_iter()
            .filter(|c| Some(*c) != target && Some(*c) != grouping)
            .map(str::to_string)
            .collect()
    }

    fn categorical_pair(
        &self,
        ch: &DatasetCharacteristics,
        context: &AnalysisContext,
    ) -> (Option<String>, Option<String>) {
        let is_categorical =
            |name: &str| ch.column_type(name).is_some_and(DataType::is_categorical);
        let grouping = context
            .grouping_variable
            .clone()
            .filter(|g| is_categorical(g));
        let target = context
            .target_variable
            .clone()
            .filter(|t| is_categorical(t));
        if grouping.is_some() && target.is_some() {
            return (grouping, target);
        }
        let exclude: Vec<String> = grouping.iter().chain(target.iter()).cloned().collect();
        let mut fallback = ch
            .categorical_columns()
            .into_iter()
            .filter(|c| !exclude.iter().any(|e| e.as_str() == *c))
            .map(str::to_string);
        let first = grouping.or(target).or_else(|| fallback.next());
        (first, fallback.next())
    }
}

fn names(columns: Vec<&str>) -> Vec<String> {
    columns.into_iter().map(str::to_string).collect()
}
