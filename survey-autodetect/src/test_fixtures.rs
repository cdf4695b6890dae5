//! Seeded synthetic datasets shared by unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::InMemoryDataset;

const ADJECTIVES: &[&str] = &["smooth", "confusing", "quick", "frustrating", "pleasant", "slow"];
const TOPICS: &[&str] = &["onboarding", "billing", "support", "reporting", "search"];

/// Approximately normal draw (Irwin-Hall with 12 uniforms).
pub fn normal(rng: &mut StdRng, mean: f64, sd: f64) -> f64 {
    let sum: f64 = (0..12).map(|_| rng.random::<f64>()).sum();
    mean + (sum - 6.0) * sd
}

/// `columns` continuous columns named `x0..`, no missing values.
pub fn numeric_dataset(rows: usize, columns: usize, seed: u64) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = InMemoryDataset::builder();
    for c in 0..columns {
        let values: Vec<Option<f64>> = (0..rows)
            .map(|_| Some(normal(&mut rng, 50.0 + c as f64, 10.0)))
            .collect();
        builder = builder.numeric_column(format!("x{c}"), values);
    }
    builder.build().expect("fixture columns have equal length")
}

/// A free-text comment sentence that is unique per row.
pub fn comment(rng: &mut StdRng, row: usize) -> String {
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let topic = TOPICS[rng.random_range(0..TOPICS.len())];
    format!("Response {row}: the {topic} experience felt {adjective} overall")
}

/// Score, two-level group and a free-text comment per respondent.
pub fn feedback_dataset(rows: usize) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(42);
    let scores: Vec<Option<f64>> = (0..rows).map(|_| Some(normal(&mut rng, 70.0, 8.0))).collect();
    let groups: Vec<Option<&str>> = (0..rows)
        .map(|i| Some(if i % 2 == 0 { "control" } else { "treatment" }))
        .collect();
    let comments: Vec<String> = (0..rows).map(|i| comment(&mut rng, i)).collect();

    InMemoryDataset::builder()
        .numeric_column("score", scores)
        .text_column("group", groups)
        .text_column("comment", comments.iter().map(|c| Some(c.as_str())))
        .build()
        .expect("fixture columns have equal length")
}

/// Numeric outcome split over `levels` groups of `per_group` rows each.
pub fn grouped_dataset(per_group: usize, levels: usize, seed: u64) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut outcome = Vec::with_capacity(per_group * levels);
    let mut group = Vec::with_capacity(per_group * levels);
    for level in 0..levels {
        for _ in 0..per_group {
            outcome.push(Some(normal(&mut rng, 60.0 + 5.0 * level as f64, 9.0)));
            group.push(format!("arm_{level}"));
        }
    }
    InMemoryDataset::builder()
        .numeric_column("outcome", outcome)
        .text_column("arm", group.iter().map(|g| Some(g.as_str())))
        .build()
        .expect("fixture columns have equal length")
}
