//! Descriptive statistics detector.

use std::sync::Arc;

use crate::catalogue::{AnalysisModule, MethodCatalogue};
use crate::context::AnalysisContext;
use crate::dataset::TabularDataset;
use crate::error::Result;
use crate::policy::DescriptivePolicy;
use crate::profiler::{DataType, DatasetCharacteristics, SampleSizeCategory};
use crate::scoring::MethodAssessment;

use super::{assess_catalogue, Detector, DetectorServices};

/// Outlier sub-method selected for a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierChoice {
    pub method: &'static str,
    /// Every sub-method applicable to the profile
    pub candidates: Vec<&'static str>,
    pub rationale: String,
}

/// Picks the outlier sub-method.
///
/// `iqr` and `mad` always apply. `zscore` needs every numeric column's
/// |skew| within the policy limit and `isolation_forest` needs at least
/// `isolation_forest_min_n` observations. Isolation forest is preferred once
/// there are enough observations and numeric columns, then z-score, then IQR.
pub fn choose_outlier_method(
    characteristics: &DatasetCharacteristics,
    policy: &DescriptivePolicy,
) -> OutlierChoice {
    let n = characteristics.n_observations;
    let skew = characteristics.max_abs_skew();
    let numeric = characteristics.numeric_count();

    let symmetric = skew <= policy.zscore_max_abs_skew;
    let forest_sized = n >= policy.isolation_forest_min_n;

    let mut candidates = vec!["iqr", "mad"];
    if symmetric {
        candidates.push("zscore");
    }
    if forest_sized {
        candidates.push("isolation_forest");
    }

    let (method, rationale) = if forest_sized && numeric >= policy.isolation_forest_min_numeric {
        (
            "isolation_forest",
            format!("n={n} with {numeric} numeric variables supports multivariate isolation forest"),
        )
    } else if symmetric {
        (
            "zscore",
            format!("numeric variables are roughly symmetric (max |skew| {skew:.2}), z-scores apply"),
        )
    } else {
        (
            "iqr",
            format!("skewed numeric data (max |skew| {skew:.2}) calls for the IQR rule"),
        )
    };

    OutlierChoice {
        method,
        candidates,
        rationale,
    }
}

/// Suggests summaries, distributions, associations and data-quality checks.
#[derive(Debug, Clone)]
pub struct DescriptiveDetector {
    catalogue: Arc<MethodCatalogue>,
    services: DetectorServices,
}

impl Default for DescriptiveDetector {
    fn default() -> Self {
        Self::new(DetectorServices::default())
    }
}

impl DescriptiveDetector {
    pub fn new(services: DetectorServices) -> Self {
        Self {
            catalogue: Arc::new(MethodCatalogue::descriptive()),
            services,
        }
    }

    fn decide(&self, method: &str, ch: &DatasetCharacteristics) -> MethodAssessment {
        let policy = &self.services.policy.descriptive;
        let n = ch.n_observations;
        let numeric = ch.numeric_count();
        let categorical = ch.categorical_count();

        match method {
            "basic_statistics" => MethodAssessment::eligible(
                method,
                policy.basic_statistics_score,
                format!("{numeric} numeric variable(s) to summarize"),
            ),
            "missing_data_analysis" => {
                let missing = ch.missing_percentage;
                if missing > 0.0 {
                    let score = policy.missing_score_base
                        + policy.missing_score_span
                            * (1.0 - (-missing / policy.missing_score_scale).exp());
                    MethodAssessment::eligible(
                        method,
                        score,
                        format!("{missing:.1}% of values are missing"),
                    )
                } else {
                    MethodAssessment::ineligible(method, "no missing values")
                }
            }
            "distribution_analysis" => {
                let score = match ch.sample_size_category {
                    SampleSizeCategory::Tiny => policy.distribution_score_tiny,
                    SampleSizeCategory::Small => policy.distribution_score_small,
                    SampleSizeCategory::Medium | SampleSizeCategory::Large => {
                        policy.distribution_score_large
                    }
                };
                MethodAssessment::eligible(
                    method,
                    score,
                    format!(
                        "{} sample (n={n}) for {numeric} numeric variable(s)",
                        ch.sample_size_category
                    ),
                )
            }
            "correlation_analysis" => {
                let boosted = n >= policy.correlation_boost_min_n;
                let score = if boosted {
                    (policy.correlation_base_score + policy.correlation_boost).min(1.0)
                } else {
                    policy.correlation_base_score
                };
                let rationale = if boosted {
                    format!("{numeric} numeric variables with n={n} support stable correlations")
                } else {
                    format!("{numeric} numeric variables, but n={n} limits correlation stability")
                };
                MethodAssessment::eligible(method, score, rationale)
            }
            "outlier_detection" => {
                let choice = choose_outlier_method(ch, policy);
                MethodAssessment::eligible(method, policy.outlier_score, choice.rationale)
                    .with_parameter("method", choice.method)
            }
            "categorical_analysis" => MethodAssessment::eligible(
                method,
                policy.categorical_score,
                format!("{categorical} categorical variable(s) to tabulate"),
            ),
            "cross_tabulation" => MethodAssessment::eligible(
                method,
                policy.cross_tabulation_score,
                format!("{categorical} categorical variables can be cross-tabulated"),
            ),
            "temporal_analysis" if ch.has_datetime => MethodAssessment::eligible(
                method,
                policy.temporal_score,
                format!("{} date/time variable(s) detected", ch.count(DataType::Datetime)),
            ),
            "geospatial_analysis" if ch.has_geographic => MethodAssessment::eligible(
                method,
                policy.geospatial_score,
                format!("{} geographic variable(s) detected", ch.count(DataType::Geographic)),
            ),
            "temporal_analysis" => MethodAssessment::ineligible(method, "no date/time variables"),
            "geospatial_analysis" => MethodAssessment::ineligible(method, "no geographic variables"),
            other => MethodAssessment::ineligible(other, "not assessed by the descriptive detector"),
        }
    }
}

impl Detector for DescriptiveDetector {
    fn module(&self) -> AnalysisModule {
        AnalysisModule::Descriptive
    }

    fn get_method_requirements(&self) -> &MethodCatalogue {
        &self.catalogue
    }

    fn services(&self) -> &DetectorServices {
        &self.services
    }

    fn assess(
        &self,
        _dataset: &dyn TabularDataset,
        characteristics: &DatasetCharacteristics,
        _context: &AnalysisContext,
    ) -> Result<Vec<MethodAssessment>> {
        Ok(assess_catalogue(&self.catalogue, characteristics, |method| {
            self.decide(method, characteristics)
        }))
    }
}
