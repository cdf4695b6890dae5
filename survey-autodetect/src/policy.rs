//! Heuristic threshold tables used throughout profiling and detection.
//!
//! Every cut-off the engine applies lives here rather than inline in the
//! detectors. The defaults reproduce the documented behaviour; deployments
//! can tune them by loading a JSON document in which any omitted field keeps
//! its default.
//!
//! ```rust
//! use survey_autodetect::policy::DetectionPolicy;
//!
//! let policy = DetectionPolicy::from_json_str(r#"{"scoring": {"primary_limit": 5}}"#).unwrap();
//! assert_eq!(policy.scoring.primary_limit, 5);
//! assert_eq!(policy.scoring.high_threshold, 0.8);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{AutodetectError, Result};

/// Complete policy table, grouped by the component that consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionPolicy {
    pub profiling: ProfilingPolicy,
    pub descriptive: DescriptivePolicy,
    pub inferential: InferentialPolicy,
    pub qualitative: QualitativePolicy,
    pub scoring: ScoringPolicy,
}

impl DetectionPolicy {
    /// Parses a (possibly partial) policy document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Reads a policy document from disk.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let policy = Self::from_json_str(&contents)?;
        debug!("Loaded detection policy from file");
        Ok(policy)
    }

    /// Serializes the policy as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects tables that would make the heuristics incoherent.
    pub fn validate(&self) -> Result<()> {
        let p = &self.profiling;
        check_unit("profiling.type_match_ratio", p.type_match_ratio)?;
        check_unit("profiling.discrete_distinct_ratio", p.discrete_distinct_ratio)?;
        check_unit("profiling.text_min_distinct_ratio", p.text_min_distinct_ratio)?;
        check_unit("profiling.high_cardinality_ratio", p.high_cardinality_ratio)?;
        check_unit("profiling.duplicate_row_ratio", p.duplicate_row_ratio)?;
        if !(p.small_sample_min <= p.medium_sample_min && p.medium_sample_min <= p.large_sample_min)
        {
            return Err(AutodetectError::configuration(
                "Sample-size bands must be ordered small <= medium <= large",
            ));
        }

        let d = &self.descriptive;
        for (name, value) in [
            ("descriptive.basic_statistics_score", d.basic_statistics_score),
            ("descriptive.distribution_score_tiny", d.distribution_score_tiny),
            ("descriptive.distribution_score_small", d.distribution_score_small),
            ("descriptive.distribution_score_large", d.distribution_score_large),
            ("descriptive.correlation_base_score", d.correlation_base_score),
            ("descriptive.outlier_score", d.outlier_score),
            ("descriptive.categorical_score", d.categorical_score),
            ("descriptive.cross_tabulation_score", d.cross_tabulation_score),
            ("descriptive.temporal_score", d.temporal_score),
            ("descriptive.geospatial_score", d.geospatial_score),
        ] {
            check_unit(name, value)?;
        }
        let i = &self.inferential;
        for (name, value) in [
            ("inferential.preferred_test_score", i.preferred_test_score),
            ("inferential.robust_alternative_score", i.robust_alternative_score),
            ("inferential.unequal_variance_score", i.unequal_variance_score),
            ("inferential.rank_alternative_score", i.rank_alternative_score),
            ("inferential.violated_assumption_score", i.violated_assumption_score),
            ("inferential.violated_welch_score", i.violated_welch_score),
            ("inferential.violated_paired_score", i.violated_paired_score),
            ("inferential.chi_square_score", i.chi_square_score),
            ("inferential.exact_alternative_score", i.exact_alternative_score),
            ("inferential.sparse_chi_square_score", i.sparse_chi_square_score),
            ("inferential.correlation_test_score", i.correlation_test_score),
            ("inferential.exploratory_correlation_score", i.exploratory_correlation_score),
            ("inferential.exploratory_chi_square_score", i.exploratory_chi_square_score),
            ("inferential.normality_test_score", i.normality_test_score),
        ] {
            check_unit(name, value)?;
        }

        let q = &self.qualitative;
        for (name, value) in [
            ("qualitative.sentiment_confident_score", q.sentiment_confident_score),
            ("qualitative.sentiment_score", q.sentiment_score),
            ("qualitative.thematic_score", q.thematic_score),
            ("qualitative.content_score", q.content_score),
            ("qualitative.survey_analysis_score", q.survey_analysis_score),
            ("qualitative.keyword_score", q.keyword_score),
        ] {
            check_unit(name, value)?;
        }

        if d.missing_score_scale <= 0.0 {
            return Err(AutodetectError::configuration(
                "descriptive.missing_score_scale must be positive",
            ));
        }

        let s = &self.scoring;
        check_unit("scoring.high_threshold", s.high_threshold)?;
        check_unit("scoring.medium_threshold", s.medium_threshold)?;
        check_unit("scoring.primary_min_score", s.primary_min_score)?;
        if s.medium_threshold > s.high_threshold {
            return Err(AutodetectError::configuration(format!(
                "scoring.medium_threshold ({}) exceeds scoring.high_threshold ({})",
                s.medium_threshold, s.high_threshold
            )));
        }

        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AutodetectError::configuration(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}

/// Column classification and quality-metric thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilingPolicy {
    /// Share of non-null values that must match a type test
    pub type_match_ratio: f64,
    /// Distinct-value floor below which integral columns are discrete
    pub discrete_min_distinct: usize,
    /// Distinct-value ratio (of non-null values) below which integral columns are discrete
    pub discrete_distinct_ratio: f64,
    pub text_min_mean_length: f64,
    pub text_min_distinct_ratio: f64,
    pub high_cardinality_ratio: f64,
    pub high_cardinality_max_distinct: usize,
    pub constant_column_penalty: f64,
    pub constant_column_penalty_cap: f64,
    pub duplicate_row_ratio: f64,
    pub duplicate_row_penalty: f64,
    pub small_sample_min: usize,
    pub medium_sample_min: usize,
    pub large_sample_min: usize,
}

impl Default for ProfilingPolicy {
    fn default() -> Self {
        Self {
            type_match_ratio: 0.9,
            discrete_min_distinct: 20,
            discrete_distinct_ratio: 0.05,
            text_min_mean_length: 15.0,
            text_min_distinct_ratio: 0.5,
            high_cardinality_ratio: 0.5,
            high_cardinality_max_distinct: 50,
            constant_column_penalty: 5.0,
            constant_column_penalty_cap: 20.0,
            duplicate_row_ratio: 0.1,
            duplicate_row_penalty: 10.0,
            small_sample_min: 30,
            medium_sample_min: 100,
            large_sample_min: 500,
        }
    }
}

/// Descriptive-family scores and sub-method cut-offs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptivePolicy {
    pub basic_statistics_score: f64,
    pub distribution_score_tiny: f64,
    pub distribution_score_small: f64,
    /// Used for both the medium and large bands
    pub distribution_score_large: f64,
    pub correlation_base_score: f64,
    pub correlation_boost: f64,
    pub correlation_boost_min_n: usize,
    pub outlier_score: f64,
    pub isolation_forest_min_n: usize,
    pub isolation_forest_min_numeric: usize,
    pub zscore_max_abs_skew: f64,
    pub categorical_score: f64,
    pub cross_tabulation_score: f64,
    pub temporal_score: f64,
    pub geospatial_score: f64,
    /// `score = base + span * (1 - exp(-missing% / scale))`
    pub missing_score_base: f64,
    pub missing_score_span: f64,
    pub missing_score_scale: f64,
}

impl Default for DescriptivePolicy {
    fn default() -> Self {
        Self {
            basic_statistics_score: 1.0,
            distribution_score_tiny: 0.3,
            distribution_score_small: 0.6,
            distribution_score_large: 0.9,
            correlation_base_score: 0.7,
            correlation_boost: 0.2,
            correlation_boost_min_n: 30,
            outlier_score: 0.7,
            isolation_forest_min_n: 100,
            isolation_forest_min_numeric: 3,
            zscore_max_abs_skew: 1.0,
            categorical_score: 0.8,
            cross_tabulation_score: 0.7,
            temporal_score: 0.8,
            geospatial_score: 0.8,
            missing_score_base: 0.4,
            missing_score_span: 0.6,
            missing_score_scale: 10.0,
        }
    }
}

/// Inferential-family test selection thresholds and scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferentialPolicy {
    pub parametric_min_group_size: usize,
    pub parametric_max_abs_skew: f64,
    /// Largest group-variance ratio still treated as equal variances
    pub equal_variance_max_ratio: f64,
    pub min_expected_cell_count: f64,
    pub observations_per_predictor: usize,
    /// Test whose assumptions the data meets, and fitted regressions
    pub preferred_test_score: f64,
    /// Welch's test when pooled variances also hold
    pub robust_alternative_score: f64,
    /// Pooled t-test despite unequal variances
    pub unequal_variance_score: f64,
    /// Rank-based test offered next to a valid parametric one
    pub rank_alternative_score: f64,
    /// Pooled t-test or ANOVA on small or skewed groups
    pub violated_assumption_score: f64,
    /// Welch's test on small or skewed groups
    pub violated_welch_score: f64,
    /// Paired t-test on small or skewed differences
    pub violated_paired_score: f64,
    pub chi_square_score: f64,
    /// Fisher's exact test when the chi-square approximation holds
    pub exact_alternative_score: f64,
    /// Chi-square when expected cell counts are too small
    pub sparse_chi_square_score: f64,
    pub correlation_test_score: f64,
    pub exploratory_correlation_score: f64,
    pub exploratory_chi_square_score: f64,
    pub normality_test_score: f64,
}

impl Default for InferentialPolicy {
    fn default() -> Self {
        Self {
            parametric_min_group_size: 30,
            parametric_max_abs_skew: 1.0,
            equal_variance_max_ratio: 2.0,
            min_expected_cell_count: 5.0,
            observations_per_predictor: 10,
            preferred_test_score: 0.85,
            robust_alternative_score: 0.8,
            unequal_variance_score: 0.7,
            rank_alternative_score: 0.6,
            violated_assumption_score: 0.45,
            violated_welch_score: 0.5,
            violated_paired_score: 0.55,
            chi_square_score: 0.9,
            exact_alternative_score: 0.5,
            sparse_chi_square_score: 0.4,
            correlation_test_score: 0.8,
            exploratory_correlation_score: 0.6,
            exploratory_chi_square_score: 0.5,
            normality_test_score: 0.7,
        }
    }
}

/// Qualitative-family corpus gates and scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitativePolicy {
    pub min_mean_text_length: f64,
    /// Respondents with free text needed for theme and content methods
    pub min_documents_for_themes: usize,
    pub sentiment_confident_documents: usize,
    pub max_themes: usize,
    pub sentiment_confident_score: f64,
    pub sentiment_score: f64,
    pub thematic_score: f64,
    pub content_score: f64,
    pub survey_analysis_score: f64,
    pub keyword_score: f64,
}

impl Default for QualitativePolicy {
    fn default() -> Self {
        Self {
            min_mean_text_length: 20.0,
            min_documents_for_themes: 10,
            sentiment_confident_documents: 30,
            max_themes: 5,
            sentiment_confident_score: 0.85,
            sentiment_score: 0.7,
            thematic_score: 0.8,
            content_score: 0.75,
            survey_analysis_score: 0.8,
            keyword_score: 0.6,
        }
    }
}

/// Confidence bands and primary/secondary partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub high_threshold: f64,
    pub medium_threshold: f64,
    /// Maximum number of primary recommendations (K)
    pub primary_limit: usize,
    pub primary_min_score: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            high_threshold: 0.8,
            medium_threshold: 0.5,
            primary_limit: 3,
            primary_min_score: 0.5,
        }
    }
}
