//! Property-based tests for profiling and recommendation invariants.
//!
//! Datasets are generated from a small column-kind alphabet (continuous,
//! discrete, categorical, free text) with a per-column missing rate, so the
//! same strategy exercises every detector family.
//!
//! ## Invariants covered
//!
//! 1. `n_variables` equals the column count and the type counts sum to it
//! 2. Completeness never rises as missingness rises, other factors fixed
//! 3. Suggestions are deterministic for identical input
//! 4. No method appears in both the primary and secondary lists
//! 5. `missing_data_analysis` is never suggested for complete data
//! 6. `correlation_analysis` needs at least two numeric columns

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use survey_autodetect::prelude::*;

#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Continuous,
    Discrete,
    Categorical,
    FreeText,
}

fn column_kind() -> impl Strategy<Value = ColumnKind> {
    prop_oneof![
        Just(ColumnKind::Continuous),
        Just(ColumnKind::Discrete),
        Just(ColumnKind::Categorical),
        Just(ColumnKind::FreeText),
    ]
}

fn build_dataset(kinds: &[ColumnKind], rows: usize, missing_rate: f64, seed: u64) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = InMemoryDataset::builder();
    for (index, kind) in kinds.iter().enumerate() {
        let name = format!("q{index}");
        let present = |rng: &mut StdRng| rng.random::<f64>() >= missing_rate;
        builder = match kind {
            ColumnKind::Continuous => {
                let values: Vec<Option<f64>> = (0..rows)
                    .map(|_| {
                        let value = rng.random_range(0.0..100.0);
                        present(&mut rng).then_some(value)
                    })
                    .collect();
                builder.numeric_column(name, values)
            }
            ColumnKind::Discrete => {
                let values: Vec<Option<f64>> = (0..rows)
                    .map(|i| present(&mut rng).then_some((i % 5) as f64 + 1.0))
                    .collect();
                builder.numeric_column(name, values)
            }
            ColumnKind::Categorical => {
                let values: Vec<Option<&str>> = (0..rows)
                    .map(|i| present(&mut rng).then_some(["agree", "neutral", "disagree"][i % 3]))
                    .collect();
                builder.text_column(name, values)
            }
            ColumnKind::FreeText => {
                let values: Vec<Option<String>> = (0..rows)
                    .map(|i| {
                        present(&mut rng).then(|| {
                            format!("Answer {i} to question {index} mentions item {}", rng.random_range(0..1000))
                        })
                    })
                    .collect();
                builder.text_column(name, values.iter().map(|v| v.as_deref()))
            }
        };
    }
    builder.build().unwrap()
}

fn bundles(dataset: &InMemoryDataset) -> Vec<SuggestionBundle> {
    let engine = AutoDetect::new();
    ["descriptive", "inferential", "qualitative"]
        .iter()
        .map(|module| {
            engine
                .suggest(dataset, module, &AnalysisContext::default())
                .unwrap()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_type_counts_cover_every_column(
        kinds in prop::collection::vec(column_kind(), 0..6),
        rows in 1usize..60,
        missing_rate in 0.0..0.5,
        seed in any::<u64>()
    ) {
        let dataset = build_dataset(&kinds, rows, missing_rate, seed);
        let profile = AutoDetect::new().profile(&dataset, None).unwrap();

        prop_assert_eq!(profile.n_variables, kinds.len());
        prop_assert_eq!(profile.type_counts.values().sum::<usize>(), profile.n_variables);
        prop_assert_eq!(profile.variable_types.len(), kinds.len());
        prop_assert!((0.0..=100.0).contains(&profile.completeness_score));
    }

    /// Two datasets identical except for how many values of one column are
    /// missing; the `id` column keeps every row distinct.
    #[test]
    fn test_completeness_non_increasing_in_missingness(
        rows in 10usize..120,
        first in 0usize..100,
        second in 0usize..100
    ) {
        let cap = rows - 2;
        let (a, b) = (first % cap, second % cap);
        let (fewer, more) = (a.min(b), a.max(b));
        let with_missing = |missing: usize| {
            InMemoryDataset::builder()
                .numeric_column("id", (0..rows).map(|i| Some(i as f64 + 0.5)))
                .numeric_column(
                    "answer",
                    (0..rows).map(|i| (i >= missing).then_some(i as f64 * 1.25)),
                )
                .build()
                .unwrap()
        };
        let engine = AutoDetect::new();
        let low = engine.profile(&with_missing(fewer), None).unwrap();
        let high = engine.profile(&with_missing(more), None).unwrap();

        prop_assert!(low.missing_percentage <= high.missing_percentage);
        prop_assert!(low.completeness_score >= high.completeness_score);
    }

    #[test]
    fn test_suggestions_are_deterministic(
        kinds in prop::collection::vec(column_kind(), 1..5),
        rows in 1usize..80,
        seed in any::<u64>()
    ) {
        let dataset = build_dataset(&kinds, rows, 0.1, seed);
        let first = serde_json::to_value(bundles(&dataset)).unwrap();
        let second = serde_json::to_value(bundles(&dataset)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_primary_and_secondary_are_disjoint(
        kinds in prop::collection::vec(column_kind(), 1..6),
        rows in 1usize..80,
        missing_rate in 0.0..0.4,
        seed in any::<u64>()
    ) {
        let dataset = build_dataset(&kinds, rows, missing_rate, seed);
        for bundle in bundles(&dataset) {
            for primary in &bundle.primary_recommendations {
                prop_assert!(
                    bundle.secondary_recommendations.iter().all(|s| s.method != primary.method),
                    "{} is both primary and secondary", primary.method
                );
            }
        }
    }

    #[test]
    fn test_complete_data_never_gets_missing_analysis(
        kinds in prop::collection::vec(column_kind(), 1..6),
        rows in 1usize..80,
        seed in any::<u64>()
    ) {
        let dataset = build_dataset(&kinds, rows, 0.0, seed);
        let engine = AutoDetect::new();
        let profile = engine.profile(&dataset, None).unwrap();
        prop_assert_eq!(profile.missing_percentage, 0.0);

        let bundle = engine.suggest(&dataset, "descriptive", &AnalysisContext::default()).unwrap();
        prop_assert!(!bundle.recommends("missing_data_analysis"));
    }

    #[test]
    fn test_correlation_needs_two_numeric_columns(
        kinds in prop::collection::vec(column_kind(), 1..6),
        rows in 1usize..80,
        missing_rate in 0.0..0.3,
        seed in any::<u64>()
    ) {
        let dataset = build_dataset(&kinds, rows, missing_rate, seed);
        let engine = AutoDetect::new();
        let profile = engine.profile(&dataset, None).unwrap();
        let bundle = engine.suggest(&dataset, "descriptive", &AnalysisContext::default()).unwrap();

        if profile.numeric_count() < 2 {
            prop_assert!(!bundle.recommends("correlation_analysis"));
        }
    }
}
