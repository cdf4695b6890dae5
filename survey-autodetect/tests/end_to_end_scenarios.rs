//! End-to-end recommendation scenarios through the public [`AutoDetect`] facade.
//!
//! Each test builds a small survey-shaped dataset, runs it through the
//! engine exactly as a caller would and checks the headline recommendations.

mod common;

use common::{mixed_survey, numeric_survey, two_arm_trial};
use survey_autodetect::prelude::*;

fn engine() -> AutoDetect {
    AutoDetect::new()
}

#[test]
fn test_single_numeric_column_descriptive() {
    let dataset = numeric_survey(50, 1, 0.0, 11);
    let bundle = engine()
        .suggest(&dataset, "descriptive", &AnalysisContext::default())
        .unwrap();

    let basic = bundle.get("basic_statistics").unwrap();
    assert_eq!(basic.score, 1.0);
    assert_eq!(basic.confidence, Confidence::High);

    let distribution = bundle.get("distribution_analysis").unwrap();
    assert_eq!(distribution.score, 0.6);
    let profile = engine().profile(&dataset, None).unwrap();
    assert_eq!(profile.sample_size_category, SampleSizeCategory::Small);
    assert_eq!(profile.sample_size_category.to_string(), "small");

    assert!(!bundle.recommends("correlation_analysis"));
}

#[test]
fn test_two_groups_prefer_t_tests() {
    let dataset = two_arm_trial(40);
    let context = AnalysisContext::builder()
        .target_variable("outcome")
        .grouping_variable("arm")
        .build();
    let bundle = engine().suggest(&dataset, "inferential", &context).unwrap();

    let ranked: Vec<&str> = bundle.recommendations().map(|r| r.method.as_str()).collect();
    let position = |method: &str| ranked.iter().position(|m| *m == method).unwrap();
    assert!(position("two_sample_t_test") < position("mann_whitney_u"));
    assert!(position("welch_t_test") < position("mann_whitney_u"));
    assert!(bundle.get("two_sample_t_test").unwrap().score > bundle.get("mann_whitney_u").unwrap().score);
    assert!(!bundle.recommends("one_way_anova"));
    assert!(!bundle.recommends("paired_t_test"));
}

#[test]
fn test_heavy_missingness_promotes_missing_data_analysis() {
    let dataset = InMemoryDataset::builder()
        .numeric_column(
            "household_income",
            (0..200).map(|i| (i % 10 >= 3).then_some(30_000.0 + i as f64 * 137.5)),
        )
        .build()
        .unwrap();

    let profile = engine().profile(&dataset, None).unwrap();
    assert!((profile.missing_percentage - 30.0).abs() < 1e-9);
    assert!(profile.completeness_score <= 70.0);

    let bundle = engine()
        .suggest(&dataset, "descriptive", &AnalysisContext::default())
        .unwrap();
    assert!(bundle
        .primary_recommendations
        .iter()
        .any(|r| r.method == "missing_data_analysis"));
}

#[test]
fn test_small_text_corpus_gets_sentiment_but_not_themes() {
    let comments: Vec<String> = (0..8)
        .map(|i| {
            format!(
                "Visit {i}: the staff were friendly but the waiting room was crowded and we \
                 waited nearly forty minutes before anyone called our name at the desk"
            )
        })
        .collect();
    let dataset = InMemoryDataset::builder()
        .text_column("comment", comments.iter().map(|c| Some(c.as_str())))
        .build()
        .unwrap();

    let profile = engine().profile(&dataset, None).unwrap();
    assert_eq!(profile.column_type("comment"), Some(DataType::Text));
    assert!(profile.mean_text_length() > 100.0);

    let bundle = engine()
        .suggest(&dataset, "qualitative", &AnalysisContext::default())
        .unwrap();
    assert!(bundle.recommends("sentiment_analysis"));
    assert!(!bundle.recommends("thematic_analysis"));
}

#[test]
fn test_empty_dataset_profiles_cleanly() {
    let profile = engine().profile(&InMemoryDataset::empty(), None).unwrap();
    assert_eq!(profile.n_observations, 0);
    assert_eq!(profile.n_variables, 0);
    assert_eq!(profile.completeness_score, 0.0);
    assert!(profile.type_counts.values().all(|count| *count == 0));
}

#[test]
fn test_mixed_survey_unified_run() {
    let dataset = mixed_survey(120, 3);
    let context = AnalysisContext::builder()
        .target_variable("rating")
        .grouping_variable("region")
        .research_question("Does satisfaction differ by region?")
        .build();
    let result = engine().run_unified(&dataset, "auto", &context).unwrap();

    assert_eq!(result.modules_run, AnalysisModule::ALL.to_vec());
    assert!(result.failed_modules().is_empty());
    assert!(result.bundle(AnalysisModule::Inferential).unwrap().recommends("one_way_anova"));
    assert!(result.bundle(AnalysisModule::Qualitative).unwrap().recommends("sentiment_analysis"));

    let order = &result.unified_recommendations.analysis_order;
    assert_eq!(order.first().map(String::as_str), Some("data_characteristics"));
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["module_results"]["descriptive"]["primary_recommendations"].is_array());
}
