//! The public facade.
//!
//! [`AutoDetect`] bundles a policy, a profiler and the three built-in
//! detectors behind the five entry points of the crate: profiling,
//! single-family suggestions, unified runs, method configuration and
//! method listing.
//!
//! # Example
//!
//! ```rust
//! use survey_autodetect::prelude::*;
//!
//! # fn main() -> survey_autodetect::error::Result<()> {
//! let dataset = InMemoryDataset::builder()
//!     .numeric_column("satisfaction", (0..80).map(|i| Some(3.0 + (i % 7) as f64 * 0.4)))
//!     .text_column("cohort", (0..80).map(|i| Some(if i % 2 == 0 { "spring" } else { "autumn" })))
//!     .build()?;
//!
//! let engine = AutoDetect::builder().row_limit(50_000).build()?;
//! let context = AnalysisContext::builder()
//!     .target_variable("satisfaction")
//!     .grouping_variable("cohort")
//!     .build();
//!
//! let result = engine.run_unified(&dataset, "auto", &context)?;
//! assert!(result.modules_run.contains(&AnalysisModule::Inferential));
//!
//! let params = engine.configure("welch_t_test", &dataset, &context, None)?;
//! assert_eq!(params["equal_var"], ParameterValue::Boolean(false));
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::catalogue::{AnalysisModule, MethodCatalogue, MethodSpec};
use crate::configuration::Parameters;
use crate::context::AnalysisContext;
use crate::coordinator::{UnifiedCoordinator, UnifiedResult};
use crate::dataset::TabularDataset;
use crate::detectors::{Detector, DetectorServices};
use crate::error::{AutodetectError, Result};
use crate::logging::LogConfig;
use crate::policy::DetectionPolicy;
use crate::profiler::{DataProfiler, DatasetCharacteristics, DatasetMetadata, ProfilerProgress};
use crate::scoring::SuggestionBundle;

/// Builder for [`AutoDetect`]
#[derive(Default)]
pub struct AutoDetectBuilder {
    policy: DetectionPolicy,
    log: LogConfig,
    row_limit: Option<usize>,
    time_budget: Option<Duration>,
    progress_callback: Option<Arc<dyn Fn(ProfilerProgress) + Send + Sync>>,
    detectors: Vec<Arc<dyn Detector>>,
}

impl AutoDetectBuilder {
    /// Replaces the whole threshold table.
    pub fn policy(mut self, policy: DetectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Loads the threshold table from a JSON file.
    pub fn policy_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.policy = DetectionPolicy::from_file(path)?;
        Ok(self)
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Caps the rows scanned per column during profiling.
    pub fn row_limit(mut self, rows: usize) -> Self {
        self.row_limit = Some(rows);
        self
    }

    /// Wall-clock budget for profiling.
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProfilerProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Replaces the built-in detector for the detector's module.
    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Validates the policy and assembles the engine.
    pub fn build(self) -> Result<AutoDetect> {
        self.policy.validate()?;

        let mut profiler = DataProfiler::builder()
            .policy(self.policy.profiling.clone())
            .log_config(self.log.clone());
        if let Some(rows) = self.row_limit {
            profiler = profiler.row_limit(rows);
        }
        if let Some(budget) = self.time_budget {
            profiler = profiler.time_budget(budget);
        }
        if let Some(callback) = self.progress_callback {
            profiler = profiler.progress_callback(move |progress| callback(progress));
        }

        let services = DetectorServices::from_parts(self.policy, profiler.build(), self.log);
        let mut coordinator = UnifiedCoordinator::new(services);
        for detector in self.detectors {
            coordinator.register(detector);
        }
        Ok(AutoDetect { coordinator })
    }
}

/// Auto-detection engine.
#[derive(Debug, Clone, Default)]
pub struct AutoDetect {
    coordinator: UnifiedCoordinator,
}

impl AutoDetect {
    pub fn builder() -> AutoDetectBuilder {
        AutoDetectBuilder::default()
    }

    /// An engine with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(&self) -> &DetectionPolicy {
        &self.coordinator.services().policy
    }

    pub fn coordinator(&self) -> &UnifiedCoordinator {
        &self.coordinator
    }

    fn detector(&self, module: &str) -> Result<&Arc<dyn Detector>> {
        let module: AnalysisModule = module.parse()?;
        self.coordinator.detector(module).ok_or_else(|| {
            AutodetectError::input(format!("No detector registered for the {module} module"))
        })
    }

    /// Profiles a dataset.
    pub fn profile(
        &self,
        dataset: &dyn TabularDataset,
        metadata: Option<&DatasetMetadata>,
    ) -> Result<DatasetCharacteristics> {
        self.coordinator.services().profiler.profile(dataset, metadata)
    }

    /// Suggestions from one analysis family.
    ///
    /// `module` is `descriptive`, `inferential` or `qualitative`; anything
    /// else is an input error.
    #[instrument(skip(self, dataset, context))]
    pub fn suggest(
        &self,
        dataset: &dyn TabularDataset,
        module: &str,
        context: &AnalysisContext,
    ) -> Result<SuggestionBundle> {
        self.detector(module)?.suggest_analyses(dataset, context)
    }

    /// Suggestions across families; see [`UnifiedCoordinator::run_unified`].
    pub fn run_unified(
        &self,
        dataset: &dyn TabularDataset,
        analysis_type: &str,
        context: &AnalysisContext,
    ) -> Result<UnifiedResult> {
        self.coordinator.run_unified(dataset, analysis_type, context)
    }

    /// Parameters for any catalogued method, with `overrides` applied last.
    #[instrument(skip(self, dataset, context, overrides))]
    pub fn configure(
        &self,
        method: &str,
        dataset: &dyn TabularDataset,
        context: &AnalysisContext,
        overrides: Option<&Parameters>,
    ) -> Result<Parameters> {
        let services = self.coordinator.services();
        let module = services.resolver.module_of(method).ok_or_else(|| {
            AutodetectError::configuration(format!("Unknown method '{method}': no catalogue defines it"))
        })?;
        context.validate(dataset)?;
        match self.coordinator.detector(module) {
            Some(detector) => detector.auto_configure_analysis(method, dataset, context, overrides),
            None => {
                let characteristics = services.profiler.profile(dataset, None)?;
                services
                    .resolver
                    .resolve(method, &characteristics, context, overrides)
            }
        }
    }

    /// The catalogue of one family.
    pub fn list_methods(&self, module: &str) -> Result<&MethodCatalogue> {
        Ok(self.detector(module)?.get_method_requirements())
    }

    /// Every catalogued method across the registered families.
    pub fn all_methods(&self) -> Vec<&MethodSpec> {
        AnalysisModule::ALL
            .iter()
            .filter_map(|m| self.coordinator.detector(*m))
            .flat_map(|d| d.get_method_requirements().methods.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ParameterValue;
    use crate::test_fixtures::{feedback_dataset, numeric_dataset};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_suggest_rejects_unknown_module() {
        let engine = AutoDetect::new();
        let err = engine
            .suggest(&numeric_dataset(10, 1, 1), "predictive", &AnalysisContext::default())
            .unwrap_err();
        assert!(err.is_input_error());
        assert!(engine.list_methods("bogus").is_err());
    }

    #[test]
    fn test_list_methods() {
        let engine = AutoDetect::new();
        assert_eq!(engine.list_methods("descriptive").unwrap().len(), 9);
        assert_eq!(engine.list_methods("Inferential").unwrap().len(), 13);
        assert_eq!(engine.list_methods("qualitative").unwrap().len(), 5);
        assert_eq!(engine.all_methods().len(), 27);
    }

    #[test]
    fn test_configure_routes_to_owning_family() {
        let engine = AutoDetect::new();
        let dataset = feedback_dataset(40);
        let params = engine
            .configure("sentiment_analysis", &dataset, &AnalysisContext::default(), None)
            .unwrap();
        assert_eq!(
            params["text_fields"],
            ParameterValue::List(vec![ParameterValue::String("comment".into())])
        );

        let err = engine
            .configure("not_a_real_method", &dataset, &AnalysisContext::default(), None)
            .unwrap_err();
        assert!(matches!(err, AutodetectError::Configuration(_)));
    }

    #[test]
    fn test_builder_rejects_invalid_policy() {
        let mut policy = DetectionPolicy::default();
        policy.scoring.high_threshold = 1.5;
        assert!(AutoDetect::builder().policy(policy).build().is_err());
    }

    #[test]
    fn test_progress_callback_reaches_profiler() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let engine = AutoDetect::builder()
            .progress_callback(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();
        engine.profile(&numeric_dataset(20, 3, 4), None).unwrap();
        assert!(seen.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_row_limit_truncates_profile() {
        let engine = AutoDetect::builder().row_limit(10).build().unwrap();
        let profile = engine.profile(&numeric_dataset(50, 1, 4), None).unwrap();
        assert!(profile.truncated);
        assert_eq!(profile.n_observations, 50);
    }
}
