//! Failure isolation in unified runs.
//!
//! Detectors that return errors or panic are swapped in for the built-in
//! ones; the remaining modules must still report their recommendations.

mod common;

use std::sync::Arc;

use common::mixed_survey;
use survey_autodetect::detectors::DetectorServices;
use survey_autodetect::prelude::*;
use survey_autodetect::scoring::MethodAssessment;

/// Inferential detector whose assessment always errors.
struct BrokenInferential {
    catalogue: MethodCatalogue,
    services: DetectorServices,
}

impl BrokenInferential {
    fn new() -> Self {
        Self {
            catalogue: MethodCatalogue::inferential(),
            services: DetectorServices::default(),
        }
    }
}

impl Detector for BrokenInferential {
    fn module(&self) -> AnalysisModule {
        AnalysisModule::Inferential
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
        _characteristics: &DatasetCharacteristics,
        _context: &AnalysisContext,
    ) -> Result<Vec<MethodAssessment>> {
        Err(AutodetectError::internal("variance of an empty group"))
    }
}

/// Qualitative detector that panics while enriching the profile.
struct PanickingQualitative {
    catalogue: MethodCatalogue,
    services: DetectorServices,
}

impl Detector for PanickingQualitative {
    fn module(&self) -> AnalysisModule {
        AnalysisModule::Qualitative
    }

    fn get_method_requirements(&self) -> &MethodCatalogue {
        &self.catalogue
    }

    fn services(&self) -> &DetectorServices {
        &self.services
    }

    fn enrich(
        &self,
        _dataset: &dyn TabularDataset,
        _characteristics: &mut DatasetCharacteristics,
    ) -> Result<()> {
        panic!("tokenizer state corrupted")
    }

    fn assess(
        &self,
        _dataset: &dyn TabularDataset,
        _characteristics: &DatasetCharacteristics,
        _context: &AnalysisContext,
    ) -> Result<Vec<MethodAssessment>> {
        Ok(Vec::new())
    }
}

fn survey_context() -> AnalysisContext {
    AnalysisContext::builder()
        .target_variable("rating")
        .grouping_variable("region")
        .build()
}

#[test]
fn test_failing_detector_keeps_other_results() {
    let engine = AutoDetect::builder()
        .detector(Arc::new(BrokenInferential::new()))
        .build()
        .unwrap();
    let result = engine
        .run_unified(&mixed_survey(90, 5), "auto", &survey_context())
        .unwrap();

    assert_eq!(result.modules_run, AnalysisModule::ALL.to_vec());
    assert_eq!(result.failed_modules(), vec![AnalysisModule::Inferential]);

    let failure = &result.module_results[&AnalysisModule::Inferential];
    assert!(failure.error().unwrap().contains("variance of an empty group"));

    let descriptive = result.bundle(AnalysisModule::Descriptive).unwrap();
    assert!(descriptive.recommends("basic_statistics"));
    assert!(result.bundle(AnalysisModule::Qualitative).unwrap().recommends("sentiment_analysis"));

    assert!(result
        .unified_recommendations
        .recommendations
        .iter()
        .all(|r| r.module != AnalysisModule::Inferential));
    assert!(result
        .cross_module_insights
        .iter()
        .any(|i| i.contains("inferential detector failed")));
}

#[test]
fn test_panicking_detector_is_isolated() {
    let engine = AutoDetect::builder()
        .detector(Arc::new(PanickingQualitative {
            catalogue: MethodCatalogue::qualitative(),
            services: DetectorServices::default(),
        }))
        .build()
        .unwrap();
    let result = engine
        .run_unified(&mixed_survey(60, 8), "auto", &survey_context())
        .unwrap();

    assert_eq!(result.failed_modules(), vec![AnalysisModule::Qualitative]);
    let error = result.module_results[&AnalysisModule::Qualitative].error().unwrap();
    assert!(error.contains("tokenizer state corrupted"));
    assert!(result.characteristics.text_corpus.is_none());
    assert!(result.bundle(AnalysisModule::Descriptive).is_some());
    assert!(result.bundle(AnalysisModule::Inferential).is_some());
}

#[test]
fn test_failed_module_serializes_as_error_entry() {
    let engine = AutoDetect::builder()
        .detector(Arc::new(BrokenInferential::new()))
        .build()
        .unwrap();
    let result = engine
        .run_unified(&mixed_survey(45, 2), "inferential", &survey_context())
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    let entry = &json["module_results"]["inferential"];
    assert!(entry["error"].as_str().unwrap().contains("variance of an empty group"));
    assert!(entry.get("primary_recommendations").is_none());
    assert!(json["unified_recommendations"]["recommendations"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn test_malformed_requests_are_hard_errors() {
    let engine = AutoDetect::new();
    let dataset = mixed_survey(30, 1);

    let err = engine
        .run_unified(&dataset, "predictive", &AnalysisContext::default())
        .unwrap_err();
    assert!(err.is_input_error());

    let context = AnalysisContext::builder().target_variable("no_such_column").build();
    let err = engine.run_unified(&dataset, "auto", &context).unwrap_err();
    assert!(err.is_input_error());
}
