//! Multi-family orchestration.
//!
//! [`UnifiedCoordinator::run_unified`] profiles the dataset once, runs the
//! selected detectors against the shared profile and merges their bundles.
//! A detector that errors or panics is reported inline as
//! `{"error": "..."}` under its module and never prevents the others from
//! returning.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::catalogue::{AnalysisModule, MethodCatalogue};
use crate::context::AnalysisContext;
use crate::dataset::TabularDataset;
use crate::detectors::{default_detectors, Detector, DetectorServices};
use crate::error::{AutodetectError, Result};
use crate::profiler::{DatasetCharacteristics, SampleSizeCategory};
use crate::scoring::{order_methods, MethodRecommendation, SuggestionBundle};

/// Missingness above which inferential results need a caveat.
pub const HIGH_MISSINGNESS_PERCENT: f64 = 20.0;

/// Which families a unified run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSelection {
    /// Descriptive always; inferential with a target, grouping variable or
    /// research question; qualitative when free text is present
    Auto,
    Only(AnalysisModule),
}

impl AnalysisSelection {
    /// Parses `"auto"` or a module name.
    pub fn parse(analysis_type: &str) -> Result<Self> {
        let trimmed = analysis_type.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(AnalysisSelection::Auto);
        }
        trimmed.parse().map(AnalysisSelection::Only).map_err(|_| {
            AutodetectError::input(format!(
                "Unknown analysis type '{analysis_type}' (expected auto, descriptive, inferential or qualitative)"
            ))
        })
    }
}

/// One module's result: its bundle or the failure message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleOutcome {
    Bundle(SuggestionBundle),
    Failed { error: String },
}

impl ModuleOutcome {
    pub fn bundle(&self) -> Option<&SuggestionBundle> {
        match self {
            ModuleOutcome::Bundle(bundle) => Some(bundle),
            ModuleOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ModuleOutcome::Failed { error } => Some(error),
            ModuleOutcome::Bundle(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ModuleOutcome::Failed { .. })
    }
}

/// A primary recommendation tagged with its family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecommendation {
    pub module: AnalysisModule,
    #[serde(flatten)]
    pub recommendation: MethodRecommendation,
}

/// Primary recommendations of every family ranked together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecommendations {
    pub recommendations: Vec<UnifiedRecommendation>,
    pub analysis_order: Vec<String>,
}

/// Result of [`UnifiedCoordinator::run_unified`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResult {
    pub characteristics: DatasetCharacteristics,
    pub modules_run: Vec<AnalysisModule>,
    pub module_results: BTreeMap<AnalysisModule, ModuleOutcome>,
    pub cross_module_insights: Vec<String>,
    pub unified_recommendations: UnifiedRecommendations,
}

impl UnifiedResult {
    pub fn bundle(&self, module: AnalysisModule) -> Option<&SuggestionBundle> {
        self.module_results.get(&module).and_then(ModuleOutcome::bundle)
    }

    /// Modules whose detector failed.
    pub fn failed_modules(&self) -> Vec<AnalysisModule> {
        self.module_results
            .iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .map(|(module, _)| *module)
            .collect()
    }
}

/// Runs several detectors against one shared profile.
#[derive(Clone)]
pub struct UnifiedCoordinator {
    services: DetectorServices,
    detectors: Vec<Arc<dyn Detector>>,
}

impl std::fmt::Debug for UnifiedCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedCoordinator")
            .field("services", &self.services)
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.module()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for UnifiedCoordinator {
    fn default() -> Self {
        Self::new(DetectorServices::default())
    }
}

impl UnifiedCoordinator {
    /// A coordinator over the built-in detectors.
    pub fn new(services: DetectorServices) -> Self {
        let detectors = default_detectors(&services);
        Self {
            services,
            detectors,
        }
    }

    /// A coordinator over caller-supplied detectors.
    ///
    /// A later detector for the same module replaces an earlier one.
    pub fn with_detectors(services: DetectorServices, detectors: Vec<Arc<dyn Detector>>) -> Self {
        let mut coordinator = Self {
            services,
            detectors: Vec::new(),
        };
        for detector in detectors {
            coordinator.register(detector);
        }
        coordinator
    }

    /// Adds a detector, replacing any registered for the same module.
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        let module = detector.module();
        self.detectors.retain(|d| d.module() != module);
        self.detectors.push(detector);
        self.detectors.sort_by_key(|d| d.module());
    }

    pub fn detector(&self, module: AnalysisModule) -> Option<&Arc<dyn Detector>> {
        self.detectors.iter().find(|d| d.module() == module)
    }

    pub fn services(&self) -> &DetectorServices {
        &self.services
    }

    /// Profiles once and runs the selected detectors.
    ///
    /// `analysis_type` is `"auto"` or a module name. Errors are limited to
    /// malformed input: an unknown analysis type, an invalid context or an
    /// explicitly requested module with no registered detector.
    #[instrument(skip(self, dataset, context), fields(columns = dataset.column_count(), rows = dataset.row_count()))]
    pub fn run_unified(
        &self,
        dataset: &dyn TabularDataset,
        analysis_type: &str,
        context: &AnalysisContext,
    ) -> Result<UnifiedResult> {
        let selection = AnalysisSelection::parse(analysis_type)?;
        context.validate(dataset)?;
        if let AnalysisSelection::Only(module) = selection {
            if self.detector(module).is_none() {
                return Err(AutodetectError::input(format!(
                    "No detector registered for the {module} module"
                )));
            }
        }

        let mut characteristics = self.services.profiler.profile(dataset, None)?;
        let selected: Vec<&Arc<dyn Detector>> = self
            .detectors
            .iter()
            .filter(|d| match selection {
                AnalysisSelection::Only(module) => d.module() == module,
                AnalysisSelection::Auto => should_run(d.module(), &characteristics, context),
            })
            .collect();
        let modules_run: Vec<AnalysisModule> = selected.iter().map(|d| d.module()).collect();
        info!(modules = ?modules_run, "Running unified analysis detection");

        let mut module_results = BTreeMap::new();
        for detector in &selected {
            let outcome = isolate(detector.module(), || {
                detector.enrich(dataset, &mut characteristics)
            });
            if let Err(error) = outcome {
                module_results.insert(detector.module(), failed(detector.module(), error));
            }
        }
        for detector in &selected {
            let module = detector.module();
            if module_results.contains_key(&module) {
                continue;
            }
            let outcome = match isolate(module, || {
                detector.suggest_with_profile(dataset, &characteristics, context)
            }) {
                Ok(bundle) => ModuleOutcome::Bundle(bundle),
                Err(error) => failed(module, error),
            };
            module_results.insert(module, outcome);
        }

        let cross_module_insights = insights(&characteristics, &module_results);
        let catalogues: Vec<&MethodCatalogue> = selected
            .iter()
            .map(|d| d.get_method_requirements())
            .collect();
        let unified_recommendations = unify(&module_results, &catalogues);

        info!(
            failed = module_results.values().filter(|o| o.is_failed()).count(),
            recommendations = unified_recommendations.recommendations.len(),
            "Unified analysis detection complete"
        );

        Ok(UnifiedResult {
            characteristics,
            modules_run,
            module_results,
            cross_module_insights,
            unified_recommendations,
        })
    }
}

/// Auto-mode selection rule.
fn should_run(
    module: AnalysisModule,
    characteristics: &DatasetCharacteristics,
    context: &AnalysisContext,
) -> bool {
    match module {
        AnalysisModule::Descriptive => true,
        AnalysisModule::Inferential => context.has_inferential_intent(),
        AnalysisModule::Qualitative => characteristics.has_text,
    }
}

/// Runs one detector step, converting panics into detector failures.
fn isolate<T>(module: AnalysisModule, step: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "detector panicked".to_string());
            Err(AutodetectError::detector_failure(module.as_str(), message))
        }
    }
}

fn failed(module: AnalysisModule, error: AutodetectError) -> ModuleOutcome {
    warn!(module = %module, error = %error, "Detector failed; continuing with remaining modules");
    ModuleOutcome::Failed {
        error: error.to_string(),
    }
}

/// Fixed rule table over the run's outcomes.
fn insights(
    characteristics: &DatasetCharacteristics,
    results: &BTreeMap<AnalysisModule, ModuleOutcome>,
) -> Vec<String> {
    let succeeded: Vec<AnalysisModule> = results
        .iter()
        .filter(|(_, o)| !o.is_failed())
        .map(|(m, _)| *m)
        .collect();
    let inferential_ran = succeeded.contains(&AnalysisModule::Inferential);
    let mut insights = Vec::new();

    if succeeded.len() >= 2 {
        let names: Vec<&str> = succeeded.iter().map(|m| m.as_str()).collect();
        insights.push(format!(
            "Cross-validate findings across the {} results",
            names.join(" and ")
        ));
    }
    if succeeded.contains(&AnalysisModule::Qualitative) && succeeded.iter().any(|m| m.is_quantitative()) {
        insights.push(
            "Triangulate themes and sentiment from free text with the quantitative results".to_string(),
        );
    }
    for (module, outcome) in results {
        if let Some(error) = outcome.error() {
            insights.push(format!("The {module} detector failed ({error}); results are partial"));
        }
    }
    if inferential_ran && characteristics.missing_percentage > HIGH_MISSINGNESS_PERCENT {
        insights.push(format!(
            "{:.1}% of values are missing; review missing_data_analysis before trusting inferential tests",
            characteristics.missing_percentage
        ));
    }
    if inferential_ran && characteristics.sample_size_category == SampleSizeCategory::Tiny {
        insights.push(format!(
            "Tiny sample (n={}); inferential tests will have low statistical power",
            characteristics.n_observations
        ));
    }
    if characteristics.truncated {
        insights.push(format!(
            "Profiling was truncated ({} column(s) skipped); recommendations rest on a partial profile",
            characteristics.skipped_columns.len()
        ));
    }
    insights
}

/// Ranks every module's primary recommendations together.
fn unify(
    results: &BTreeMap<AnalysisModule, ModuleOutcome>,
    catalogues: &[&MethodCatalogue],
) -> UnifiedRecommendations {
    let priority = |method: &str| {
        catalogues
            .iter()
            .find_map(|c| c.get(method))
            .map_or(u8::MAX, |spec| spec.priority)
    };

    let mut recommendations: Vec<UnifiedRecommendation> = results
        .iter()
        .filter_map(|(module, outcome)| outcome.bundle().map(|b| (*module, b)))
        .flat_map(|(module, bundle)| {
            bundle
                .primary_recommendations
                .iter()
                .cloned()
                .map(move |recommendation| UnifiedRecommendation {
                    module,
                    recommendation,
                })
        })
        .collect();

    recommendations.sort_by(|a, b| {
        let (a, b) = (&a.recommendation, &b.recommendation);
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| priority(&a.method).cmp(&priority(&b.method)))
            .then_with(|| a.method.cmp(&b.method))
    });

    let ranked: Vec<String> = recommendations
        .iter()
        .map(|r| r.recommendation.method.clone())
        .collect();
    UnifiedRecommendations {
        analysis_order: order_methods(&ranked, catalogues),
        recommendations,
    }
}
