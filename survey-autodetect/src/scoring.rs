//! Score normalization, confidence banding and recommendation ranking.
//!
//! Detectors emit one [`MethodAssessment`] per catalogued method. The
//! [`ScoringEngine`] turns those into a [`SuggestionBundle`]:
//!
//! - scores are clamped into `[0, 1]`, NaN becomes 0 and values are rounded
//!   to three decimals
//! - ineligible or zero-scored methods are reported with their rationale
//! - the rest are ranked by confidence band, score, catalogue priority and
//!   finally method name
//! - the top K methods scoring at least the primary floor become primary,
//!   all other eligible methods secondary
//! - `analysis_order` lists the ranked methods after `data_characteristics`,
//!   moved only as far as their ordering constraints require

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::catalogue::{AnalysisModule, MethodCatalogue, MethodSpec};
use crate::configuration::{ParameterValue, Parameters};
use crate::error::{AutodetectError, Result};
use crate::policy::ScoringPolicy;

/// First step of every analysis order.
pub const DATA_CHARACTERISTICS_STEP: &str = "data_characteristics";

/// Confidence band of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Primary,
    Secondary,
}

/// A detector's raw verdict on one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodAssessment {
    pub method: String,
    pub eligible: bool,
    pub score: f64,
    pub rationale: String,
    /// Parameters chosen during assessment; merged over resolver defaults
    pub parameters: Parameters,
}

impl MethodAssessment {
    pub fn eligible(method: impl Into<String>, score: f64, rationale: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            eligible: true,
            score,
            rationale: rationale.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn ineligible(method: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            eligible: false,
            score: 0.0,
            rationale: rationale.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A ranked, eligible method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRecommendation {
    pub method: String,
    pub score: f64,
    pub confidence: Confidence,
    pub rationale: String,
    pub estimated_time: String,
    pub parameters: Parameters,
    pub category: RecommendationCategory,
}

/// A catalogued method whose prerequisites were not met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IneligibleMethod {
    pub method: String,
    pub score: f64,
    pub rationale: String,
}

/// One detector's ranked output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionBundle {
    pub module: AnalysisModule,
    pub primary_recommendations: Vec<MethodRecommendation>,
    pub secondary_recommendations: Vec<MethodRecommendation>,
    pub ineligible_methods: Vec<IneligibleMethod>,
    pub analysis_order: Vec<String>,
}

impl SuggestionBundle {
    /// Primary then secondary recommendations.
    pub fn recommendations(&self) -> impl Iterator<Item = &MethodRecommendation> {
        self.primary_recommendations
            .iter()
            .chain(self.secondary_recommendations.iter())
    }

    pub fn get(&self, method: &str) -> Option<&MethodRecommendation> {
        self.recommendations().find(|r| r.method == method)
    }

    /// Whether the method is recommended (primary or secondary).
    pub fn recommends(&self, method: &str) -> bool {
        self.get(method).is_some()
    }

    pub fn ineligible(&self, method: &str) -> Option<&IneligibleMethod> {
        self.ineligible_methods.iter().find(|m| m.method == method)
    }

    pub fn primary_names(&self) -> Vec<&str> {
        self.primary_recommendations
            .iter()
            .map(|r| r.method.as_str())
            .collect()
    }
}

/// Builder for [`ScoringEngine`]
#[derive(Debug, Default)]
pub struct ScoringEngineBuilder {
    policy: ScoringPolicy,
}

impl ScoringEngineBuilder {
    pub fn policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn high_threshold(mut self, threshold: f64) -> Self {
        self.policy.high_threshold = threshold;
        self
    }

    pub fn medium_threshold(mut self, threshold: f64) -> Self {
        self.policy.medium_threshold = threshold;
        self
    }

    /// Maximum number of primary recommendations (K)
    pub fn primary_limit(mut self, limit: usize) -> Self {
        self.policy.primary_limit = limit;
        self
    }

    pub fn primary_min_score(mut self, score: f64) -> Self {
        self.policy.primary_min_score = score;
        self
    }

    pub fn build(self) -> ScoringEngine {
        ScoringEngine {
            policy: self.policy,
        }
    }
}

/// Ranks assessments into bundles.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    policy: ScoringPolicy,
}

/// Ranked entry before partitioning.
struct Ranked<'a> {
    assessment: MethodAssessment,
    spec: &'a MethodSpec,
    confidence: Confidence,
}

impl ScoringEngine {
    pub fn builder() -> ScoringEngineBuilder {
        ScoringEngineBuilder::default()
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Clamps into `[0, 1]`, maps NaN to 0 and rounds to three decimals.
    pub fn normalize(score: f64) -> f64 {
        if score.is_nan() {
            return 0.0;
        }
        (score.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
    }

    /// Band for an already-normalized score.
    pub fn confidence(&self, score: f64) -> Confidence {
        if score >= self.policy.high_threshold {
            Confidence::High
        } else if score >= self.policy.medium_threshold {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Ranks one detector's assessments.
    ///
    /// Fails only if an assessment names a method missing from `catalogue`.
    #[instrument(skip(self, catalogue, assessments), fields(module = %catalogue.module, assessed = assessments.len()))]
    pub fn build_bundle(
        &self,
        catalogue: &MethodCatalogue,
        assessments: Vec<MethodAssessment>,
    ) -> Result<SuggestionBundle> {
        let mut ranked = Vec::new();
        let mut ineligible_methods = Vec::new();

        for mut assessment in assessments {
            let spec = catalogue.get(&assessment.method).ok_or_else(|| {
                AutodetectError::internal(format!(
                    "{} detector assessed '{}', which its catalogue does not define",
                    catalogue.module, assessment.method
                ))
            })?;
            assessment.score = Self::normalize(assessment.score);
            if !assessment.eligible || assessment.score == 0.0 {
                ineligible_methods.push(IneligibleMethod {
                    method: assessment.method,
                    score: 0.0,
                    rationale: assessment.rationale,
                });
                continue;
            }
            let confidence = self.confidence(assessment.score);
            ranked.push(Ranked {
                assessment,
                spec,
                confidence,
            });
        }

        ranked.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| b.assessment.score.total_cmp(&a.assessment.score))
                .then_with(|| a.spec.priority.cmp(&b.spec.priority))
                .then_with(|| a.assessment.method.cmp(&b.assessment.method))
        });
        ineligible_methods.sort_by(|a, b| a.method.cmp(&b.method));

        let ranked_names: Vec<String> = ranked
            .iter()
            .map(|r| r.assessment.method.clone())
            .collect();
        let analysis_order = order_methods(&ranked_names, &[catalogue]);

        let mut primary_recommendations = Vec::new();
        let mut secondary_recommendations = Vec::new();
        for entry in ranked {
            let is_primary = primary_recommendations.len() < self.policy.primary_limit
                && entry.assessment.score >= self.policy.primary_min_score;
            let category = if is_primary {
                RecommendationCategory::Primary
            } else {
                RecommendationCategory::Secondary
            };
            let recommendation = MethodRecommendation {
                method: entry.assessment.method,
                score: entry.assessment.score,
                confidence: entry.confidence,
                rationale: entry.assessment.rationale,
                estimated_time: entry.spec.estimated_time.clone(),
                parameters: entry.assessment.parameters,
                category,
            };
            if is_primary {
                primary_recommendations.push(recommendation);
            } else {
                secondary_recommendations.push(recommendation);
            }
        }

        debug!(
            primary = primary_recommendations.len(),
            secondary = secondary_recommendations.len(),
            ineligible = ineligible_methods.len(),
            "Built suggestion bundle"
        );

        Ok(SuggestionBundle {
            module: catalogue.module,
            primary_recommendations,
            secondary_recommendations,
            ineligible_methods,
            analysis_order,
        })
    }
}

/// Orders methods for execution.
///
/// `data_characteristics` comes first. Methods otherwise keep their ranked
/// order, except that a method waits for every present method it depends
/// on, and assumption-sensitive methods wait for `missing_data_analysis`.
pub fn order_methods(ranked: &[String], catalogues: &[&MethodCatalogue]) -> Vec<String> {
    let mut pending: Vec<&str> = Vec::with_capacity(ranked.len());
    let mut seen = HashSet::new();
    for name in ranked {
        if name != DATA_CHARACTERISTICS_STEP && seen.insert(name.as_str()) {
            pending.push(name.as_str());
        }
    }
    let present: HashSet<&str> = pending.iter().copied().collect();

    let mut order = vec![DATA_CHARACTERISTICS_STEP.to_string()];
    let mut placed: HashSet<&str> = HashSet::new();
    while !pending.is_empty() {
        let next = pending
            .iter()
            .position(|name| {
                let spec = catalogues.iter().find_map(|c| c.get(name));
                prerequisites(spec, &present)
                    .iter()
                    .all(|p| placed.contains(p))
            })
            .unwrap_or(0);
        let name = pending.remove(next);
        placed.insert(name);
        order.push(name.to_string());
    }
    order
}

/// Present methods that must precede `spec`.
fn prerequisites<'a>(spec: Option<&'a MethodSpec>, present: &HashSet<&str>) -> Vec<&'a str> {
    let Some(spec) = spec else {
        return Vec::new();
    };
    let mut before: Vec<&'a str> = spec
        .depends_on
        .iter()
        .map(String::as_str)
        .filter(|d| present.contains(d))
        .collect();
    if spec.assumption_sensitive && present.contains("missing_data_analysis") {
        before.push("missing_data_analysis");
    }
    before
}
