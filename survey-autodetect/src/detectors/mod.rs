//! Analysis-family detectors.
//!
//! A [`Detector`] owns one [`MethodCatalogue`] and decides, for a profiled
//! dataset and an [`AnalysisContext`], how well each of its methods fits.
//! Only [`Detector::assess`] is family specific; profiling, parameter
//! resolution and ranking are shared through [`DetectorServices`] and the
//! trait's provided methods.
//!
//! # Example
//!
//! ```rust
//! use survey_autodetect::context::AnalysisContext;
//! use survey_autodetect::dataset::InMemoryDataset;
//! use survey_autodetect::detectors::{DescriptiveDetector, Detector};
//!
//! let dataset = InMemoryDataset::builder()
//!     .numeric_column("age", (0..50).map(|i| Some(18.0 + (i * 7 % 40) as f64)))
//!     .build()
//!     .unwrap();
//!
//! let detector = DescriptiveDetector::default();
//! let bundle = detector
//!     .suggest_analyses(&dataset, &AnalysisContext::default())
//!     .unwrap();
//!
//! assert!(bundle.recommends("basic_statistics"));
//! assert!(!bundle.recommends("correlation_analysis"));
//! ```

use std::sync::Arc;

use tracing::instrument;

use crate::catalogue::{AnalysisModule, MethodCatalogue};
use crate::configuration::{ConfigurationResolver, Parameters};
use crate::context::AnalysisContext;
use crate::dataset::TabularDataset;
use crate::error::{AutodetectError, Result};
use crate::logging::{truncate_field, LogConfig};
use crate::policy::DetectionPolicy;
use crate::profiler::{DataProfiler, DatasetCharacteristics};
use crate::scoring::{MethodAssessment, ScoringEngine, SuggestionBundle};

pub mod descriptive;
pub mod inferential;
pub mod qualitative;

pub use descriptive::{choose_outlier_method, DescriptiveDetector, OutlierChoice};
pub use inferential::InferentialDetector;
pub use qualitative::QualitativeDetector;

/// Collaborators shared by every detector.
#[derive(Debug, Clone)]
pub struct DetectorServices {
    pub profiler: Arc<DataProfiler>,
    pub scoring: Arc<ScoringEngine>,
    pub resolver: Arc<ConfigurationResolver>,
    pub policy: Arc<DetectionPolicy>,
    pub log: LogConfig,
}

impl Default for DetectorServices {
    fn default() -> Self {
        Self::from_policy(DetectionPolicy::default())
    }
}

impl DetectorServices {
    /// Services whose profiler, scorer and resolver all read `policy`.
    pub fn from_policy(policy: DetectionPolicy) -> Self {
        let profiler = DataProfiler::builder()
            .policy(policy.profiling.clone())
            .build();
        Self::from_parts(policy, profiler, LogConfig::default())
    }

    /// Services around a preconfigured profiler.
    pub fn from_parts(policy: DetectionPolicy, profiler: DataProfiler, log: LogConfig) -> Self {
        let policy = Arc::new(policy);
        let scoring = ScoringEngine::builder()
            .policy(policy.scoring.clone())
            .build();
        Self {
            profiler: Arc::new(profiler),
            scoring: Arc::new(scoring),
            resolver: Arc::new(ConfigurationResolver::new(Arc::clone(&policy))),
            policy,
            log,
        }
    }
}

/// One analysis family.
///
/// Implementors supply the catalogue, the shared services and an
/// assessment of every catalogued method; the remaining operations are
/// provided.
pub trait Detector: Send + Sync {
    fn module(&self) -> AnalysisModule;

    /// The family's method catalogue.
    fn get_method_requirements(&self) -> &MethodCatalogue;

    fn services(&self) -> &DetectorServices;

    /// Scores every catalogued method against a profile.
    ///
    /// Must return exactly one assessment per catalogue entry. Unmet
    /// prerequisites are ineligible assessments, not errors.
    fn assess(
        &self,
        dataset: &dyn TabularDataset,
        characteristics: &DatasetCharacteristics,
        context: &AnalysisContext,
    ) -> Result<Vec<MethodAssessment>>;

    /// Adds family-specific facts to a shared profile.
    fn enrich(
        &self,
        _dataset: &dyn TabularDataset,
        _characteristics: &mut DatasetCharacteristics,
    ) -> Result<()> {
        Ok(())
    }

    /// Profiles the dataset and applies this family's enrichment.
    fn detect_data_characteristics(
        &self,
        dataset: &dyn TabularDataset,
    ) -> Result<DatasetCharacteristics> {
        let mut characteristics = self.services().profiler.profile(dataset, None)?;
        self.enrich(dataset, &mut characteristics)?;
        Ok(characteristics)
    }

    /// Ranks this family's methods against an existing profile.
    fn suggest_with_profile(
        &self,
        dataset: &dyn TabularDataset,
        characteristics: &DatasetCharacteristics,
        context: &AnalysisContext,
    ) -> Result<SuggestionBundle> {
        let services = self.services();
        let mut assessments = self.assess(dataset, characteristics, context)?;

        for assessment in assessments.iter_mut().filter(|a| a.eligible) {
            crate::log_detector!(
                services.log,
                module = %self.module(),
                method = %assessment.method,
                score = assessment.score,
                rationale = %truncate_field(&assessment.rationale, services.log.max_field_length),
                "Method eligible"
            );
            assessment.parameters = services.resolver.resolve(
                &assessment.method,
                characteristics,
                context,
                Some(&assessment.parameters),
            )?;
        }

        services
            .scoring
            .build_bundle(self.get_method_requirements(), assessments)
    }

    /// Profiles the dataset and ranks this family's methods.
    fn suggest_analyses(
        &self,
        dataset: &dyn TabularDataset,
        context: &AnalysisContext,
    ) -> Result<SuggestionBundle> {
        context.validate(dataset)?;
        let characteristics = self.detect_data_characteristics(dataset)?;
        self.suggest_with_profile(dataset, &characteristics, context)
    }

    /// Default parameters for one of this family's methods.
    fn auto_configure_analysis(
        &self,
        method: &str,
        dataset: &dyn TabularDataset,
        context: &AnalysisContext,
        overrides: Option<&Parameters>,
    ) -> Result<Parameters> {
        if !self.get_method_requirements().contains(method) {
            return Err(AutodetectError::configuration(format!(
                "Method '{method}' is not part of the {} catalogue",
                self.module()
            )));
        }
        let characteristics = self.detect_data_characteristics(dataset)?;
        self.services()
            .resolver
            .resolve(method, &characteristics, context, overrides)
    }
}

/// Builds one assessment per catalogue entry.
///
/// Entries failing their declared prerequisites become ineligible with the
/// catalogue's reason; the rest are passed to `decide`.
#[instrument(skip_all, fields(module = %catalogue.module))]
pub(crate) fn assess_catalogue<F>(
    catalogue: &MethodCatalogue,
    characteristics: &DatasetCharacteristics,
    mut decide: F,
) -> Vec<MethodAssessment>
where
    F: FnMut(&str) -> MethodAssessment,
{
    catalogue
        .methods
        .iter()
        .map(|spec| match spec.check_prerequisites(characteristics) {
            Ok(()) => decide(&spec.name),
            Err(reason) => MethodAssessment::ineligible(spec.name.as_str(), reason),
        })
        .collect()
}

/// Built-in detectors in family order.
pub fn default_detectors(services: &DetectorServices) -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(DescriptiveDetector::new(services.clone())),
        Arc::new(InferentialDetector::new(services.clone())),
        Arc::new(QualitativeDetector::new(services.clone())),
    ]
}
