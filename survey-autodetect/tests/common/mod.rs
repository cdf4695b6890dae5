//! Seeded dataset generators shared by the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use survey_autodetect::dataset::InMemoryDataset;

const TOPICS: &[&str] = &["delivery", "pricing", "support", "the mobile app", "onboarding"];
const TONES: &[&str] = &["was excellent", "felt slow", "needs work", "exceeded expectations"];

/// Approximately normal draw (Irwin-Hall).
pub fn normal(rng: &mut StdRng, mean: f64, sd: f64) -> f64 {
    let sum: f64 = (0..12).map(|_| rng.random::<f64>()).sum();
    mean + (sum - 6.0) * sd
}

/// `columns` continuous columns `x0..`, each value missing with probability
/// `missing_rate`.
pub fn numeric_survey(rows: usize, columns: usize, missing_rate: f64, seed: u64) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = InMemoryDataset::builder();
    for c in 0..columns {
        let values: Vec<Option<f64>> = (0..rows)
            .map(|_| {
                let value = normal(&mut rng, 40.0 + c as f64 * 3.0, 6.0);
                (rng.random::<f64>() >= missing_rate).then_some(value)
            })
            .collect();
        builder = builder.numeric_column(format!("x{c}"), values);
    }
    builder.build().unwrap()
}

/// Numeric outcome over a placebo and an active arm.
///
/// Both arms share the same symmetric spread, so group shapes are
/// identical apart from the shifted mean.
pub fn two_arm_trial(per_group: usize) -> InMemoryDataset {
    let mut outcome = Vec::with_capacity(per_group * 2);
    let mut arm = Vec::with_capacity(per_group * 2);
    for (level, name) in ["placebo", "active"].into_iter().enumerate() {
        for i in 0..per_group {
            let spread = ((i * 7) % 13) as f64 - 6.0;
            outcome.push(Some(55.0 + 4.0 * level as f64 + spread * 1.3));
            arm.push(name);
        }
    }
    InMemoryDataset::builder()
        .numeric_column("outcome", outcome)
        .text_column("arm", arm.into_iter().map(Some))
        .build()
        .unwrap()
}

/// A unique feedback sentence for `row`.
pub fn feedback_comment(rng: &mut StdRng, row: usize) -> String {
    let topic = TOPICS[rng.random_range(0..TOPICS.len())];
    let tone = TONES[rng.random_range(0..TONES.len())];
    format!("Respondent {row} said that {topic} {tone} during the last visit")
}

/// Rating, region and a free-text comment per respondent.
pub fn mixed_survey(rows: usize, seed: u64) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let rating: Vec<Option<f64>> = (0..rows).map(|_| Some(normal(&mut rng, 7.0, 1.5))).collect();
    let spend: Vec<Option<f64>> = (0..rows).map(|_| Some(normal(&mut rng, 120.0, 30.0))).collect();
    let region: Vec<&str> = (0..rows)
        .map(|i| ["north", "south", "east"][i % 3])
        .collect();
    let comments: Vec<String> = (0..rows).map(|i| feedback_comment(&mut rng, i)).collect();

    InMemoryDataset::builder()
        .numeric_column("rating", rating)
        .numeric_column("spend", spend)
        .text_column("region", region.into_iter().map(Some))
        .text_column("comment", comments.iter().map(|c| Some(c.as_str())))
        .build()
        .unwrap()
}
