//! Inferential testing detector.
//!
//! Test choice depends on the roles the [`AnalysisContext`] assigns:
//!
//! | target      | grouping    | candidates                                     |
//! |-------------|-------------|------------------------------------------------|
//! | numeric     | categorical | t / Welch / Mann-Whitney, ANOVA / Kruskal-Wallis |
//! | categorical | categorical | chi-square or Fisher's exact                   |
//! | numeric     | any         | correlation test, linear regression            |
//! | binary      | any         | logistic regression                            |
//! | none        | any / none  | exploratory correlation and chi-square         |
//!
//! Group comparisons read the raw values to check per-group sample size,
//! skew and variance; independence tests read them to compute expected
//! contingency counts. Both read only the rows the profile scanned, so a
//! row limit applies to every gate alike.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::catalogue::{AnalysisModule, MethodCatalogue};
use crate::context::AnalysisContext;
use crate::dataset::TabularDataset;
use crate::error::Result;
use crate::profiler::{stats, DataType, DatasetCharacteristics};
use crate::scoring::MethodAssessment;

use super::{assess_catalogue, Detector, DetectorServices};

const TWO_GROUP_TESTS: &[&str] = &["two_sample_t_test", "welch_t_test", "mann_whitney_u"];
const PAIRED_TESTS: &[&str] = &["paired_t_test", "wilcoxon_signed_rank"];
const MULTI_GROUP_TESTS: &[&str] = &["one_way_anova", "kruskal_wallis"];
const PARAMETRIC_TESTS: &[&str] = &[
    "two_sample_t_test",
    "welch_t_test",
    "paired_t_test",
    "one_way_anova",
    "linear_regression",
];

/// Per-group shape of a numeric outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub level: String,
    pub n: usize,
    pub variance: f64,
    pub skew: f64,
}

/// Splits a numeric column by the levels of another column over the first
/// `rows` rows.
///
/// Rows where either value is missing are dropped.
pub fn group_summaries(
    dataset: &dyn TabularDataset,
    target: &str,
    grouping: &str,
    rows: usize,
) -> Result<Vec<GroupSummary>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let values = dataset.column_values(target)?;
    let levels = dataset.column_values(grouping)?;
    for (value, level) in values.zip(levels).take(rows) {
        let (Some(value), Some(level)) = (value.normalized().as_f64(), level.as_text().map(|l| l.into_owned()))
        else {
            continue;
        };
        groups.entry(level).or_default().push(value);
    }

    Ok(groups
        .into_iter()
        .map(|(level, values)| GroupSummary {
            level,
            n: values.len(),
            variance: stats::variance(&values),
            skew: stats::skewness(&values),
        })
        .collect())
}

/// Smallest expected cell count of the contingency table of two columns,
/// over the first `limit` rows.
///
/// `None` when no row has both values present.
pub fn min_expected_count(
    dataset: &dyn TabularDataset,
    rows: &str,
    columns: &str,
    limit: usize,
) -> Result<Option<f64>> {
    let mut row_totals: HashMap<String, usize> = HashMap::new();
    let mut column_totals: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;

    let row_values = dataset.column_values(rows)?;
    let column_values = dataset.column_values(columns)?;
    for (r, c) in row_values.zip(column_values).take(limit) {
        let (Some(r), Some(c)) = (r.as_text(), c.as_text()) else {
            continue;
        };
        *row_totals.entry(r.into_owned()).or_default() += 1;
        *column_totals.entry(c.into_owned()).or_default() += 1;
        total += 1;
    }

    if total == 0 {
        return Ok(None);
    }
    let min_row = row_totals.values().min().copied().unwrap_or(0);
    let min_column = column_totals.values().min().copied().unwrap_or(0);
    Ok(Some(min_row as f64 * min_column as f64 / total as f64))
}

/// Suggests hypothesis tests and models.
#[derive(Debug, Clone)]
pub struct InferentialDetector {
    catalogue: Arc<MethodCatalogue>,
    services: DetectorServices,
}

impl Default for InferentialDetector {
    fn default() -> Self {
        Self::new(DetectorServices::default())
    }
}

/// Decisions made so far, keyed by method.
#[derive(Default)]
struct Plan {
    decisions: HashMap<String, MethodAssessment>,
}

impl Plan {
    fn set(&mut self, assessment: MethodAssessment) {
        self.decisions.insert(assessment.method.clone(), assessment);
    }

    fn score(&mut self, method: &str, score: f64, rationale: impl Into<String>) {
        self.set(MethodAssessment::eligible(method, score, rationale));
    }

    fn reject(&mut self, methods: &[&str], rationale: &str) {
        for method in methods {
            self.set(MethodAssessment::ineligible(*method, rationale));
        }
    }

    fn is_recommended(&self, method: &str) -> bool {
        self.decisions
            .get(method)
            .is_some_and(|a| a.eligible && a.score > 0.0)
    }

    fn take(&mut self, method: &str) -> MethodAssessment {
        self.decisions
            .remove(method)
            .unwrap_or_else(|| MethodAssessment::ineligible(method, not_applicable(method)))
    }
}

/// Reason given for a method the context never put on the table.
fn not_applicable(method: &str) -> &'static str {
    match method {
        "two_sample_t_test" | "welch_t_test" | "mann_whitney_u" | "paired_t_test"
        | "wilcoxon_signed_rank" | "one_way_anova" | "kruskal_wallis" => {
            "needs a numeric target_variable and a categorical grouping_variable"
        }
        "chi_square_independence" | "fisher_exact" => {
            "needs a categorical target_variable and grouping_variable, or an exploratory research question"
        }
        "correlation_test" => "needs a numeric target with numeric predictors, or an exploratory research question",
        "linear_regression" => "needs a numeric target_variable and numeric predictors",
        "logistic_regression" => "needs a binary target_variable and numeric predictors",
        "normality_test" => "no parametric test is recommended",
        _ => "not assessed by the inferential detector",
    }
}

impl InferentialDetector {
    pub fn new(services: DetectorServices) -> Self {
        Self {
            catalogue: Arc::new(MethodCatalogue::inferential()),
            services,
        }
    }

    fn compare_groups(
        &self,
        plan: &mut Plan,
        dataset: &dyn TabularDataset,
        ch: &DatasetCharacteristics,
        context: &AnalysisContext,
        target: &str,
        grouping: &str,
    ) -> Result<()> {
        let policy = &self.services.policy.inferential;
        let groups = group_summaries(dataset, target, grouping, ch.scanned_rows)?;
        let k = groups.len();
        if k < 2 {
            let reason = format!("grouping variable '{grouping}' has {k} level(s) with data");
            plan.reject(TWO_GROUP_TESTS, &reason);
            plan.reject(PAIRED_TESTS, &reason);
            plan.reject(MULTI_GROUP_TESTS, &reason);
            return Ok(());
        }

        let min_n = groups.iter().map(|g| g.n).min().unwrap_or(0);
        let max_skew = groups.iter().map(|g| g.skew.abs()).fold(0.0, f64::max);
        let parametric = min_n >= policy.parametric_min_group_size && max_skew <= policy.parametric_max_abs_skew;
        let shape = format!(
            "{k} groups of '{grouping}', smallest n={min_n}, max |skew| {max_skew:.2}"
        );
        debug!(
            target_variable = target,
            grouping_variable = grouping,
            groups = k,
            min_n,
            max_skew,
            parametric,
            "Assessed group structure"
        );

        if context.paired && k == 2 {
            plan.reject(TWO_GROUP_TESTS, "design is paired; independent-sample tests do not apply");
            plan.reject(MULTI_GROUP_TESTS, "paired design with two conditions");
            if parametric {
                plan.score("paired_t_test", policy.preferred_test_score, format!("paired design; {shape} meets t-test assumptions"));
                plan.score("wilcoxon_signed_rank", policy.rank_alternative_score, format!("paired design; rank-based fallback ({shape})"));
            } else {
                plan.score("paired_t_test", policy.violated_paired_score, format!("paired design, but {shape} strains normality"));
                plan.score("wilcoxon_signed_rank", policy.preferred_test_score, format!("paired design; {shape} favours a rank-based test"));
            }
            return Ok(());
        }

        plan.reject(PAIRED_TESTS, if context.paired {
            "paired tests compare exactly two conditions"
        } else {
            "groups are independent (design not marked paired)"
        });

        if k == 2 {
            plan.reject(MULTI_GROUP_TESTS, "only two groups; use a two-group test");
            let variances: Vec<f64> = groups.iter().map(|g| g.variance).collect();
            let (low, high) = (variances[0].min(variances[1]), variances[0].max(variances[1]));
            let ratio = if low > 0.0 { high / low } else { f64::INFINITY };
            if parametric && ratio <= policy.equal_variance_max_ratio {
                plan.score("two_sample_t_test", policy.preferred_test_score, format!("{shape}; variance ratio {ratio:.2} supports pooled variances"));
                plan.score("welch_t_test", policy.robust_alternative_score, format!("{shape}; robust to any variance difference"));
            } else if parametric {
                plan.score("welch_t_test", policy.preferred_test_score, format!("{shape}; variance ratio {ratio:.2} calls for Welch's correction"));
                plan.score("two_sample_t_test", policy.unequal_variance_score, format!("{shape}; unequal variances (ratio {ratio:.2})"));
            }
            if parametric {
                plan.score("mann_whitney_u", policy.rank_alternative_score, format!("{shape}; non-parametric alternative"));
            } else {
                plan.score("mann_whitney_u", policy.preferred_test_score, format!("{shape}; small or skewed groups favour a rank-based test"));
                plan.score("two_sample_t_test", policy.violated_assumption_score, format!("{shape} violates t-test assumptions"));
                plan.score("welch_t_test", policy.violated_welch_score, format!("{shape} violates t-test assumptions"));
            }
        } else {
            plan.reject(TWO_GROUP_TESTS, "more than two groups; use a multi-group test");
            if parametric {
                plan.score("one_way_anova", policy.preferred_test_score, format!("{shape} meets ANOVA assumptions"));
                plan.score("kruskal_wallis", policy.rank_alternative_score, format!("{shape}; non-parametric alternative"));
            } else {
                plan.score("one_way_anova", policy.violated_assumption_score, format!("{shape} violates ANOVA assumptions"));
                plan.score("kruskal_wallis", policy.preferred_test_score, format!("{shape} favours a rank-based test"));
            }
        }
        Ok(())
    }

    fn test_independence(
        &self,
        plan: &mut Plan,
        dataset: &dyn TabularDataset,
        ch: &DatasetCharacteristics,
        rows: &str,
        columns: &str,
    ) -> Result<()> {
        let policy = &self.services.policy.inferential;
        let floor = policy.min_expected_cell_count;
        match min_expected_count(dataset, rows, columns, ch.scanned_rows)? {
            None => plan.reject(
                &["chi_square_independence", "fisher_exact"],
                "no rows with both categorical values present",
            ),
            Some(expected) if expected >= floor => {
                plan.score(
                    "chi_square_independence",
                    policy.chi_square_score,
                    format!("'{rows}' x '{columns}': every expected cell count >= {floor} (min {expected:.1})"),
                );
                plan.score(
                    "fisher_exact",
                    policy.exact_alternative_score,
                    "exact alternative; chi-square approximation already holds",
                );
            }
            Some(expected) => {
                plan.score(
                    "fisher_exact",
                    policy.preferred_test_score,
                    format!("'{rows}' x '{columns}': min expected cell count {expected:.2} < {floor}"),
                );
                plan.score(
                    "chi_square_independence",
                    policy.sparse_chi_square_score,
                    format!("expected cell count {expected:.2} < {floor} makes the approximation unreliable"),
                );
            }
        }
        Ok(())
    }

    fn model_target(
        &self,
        plan: &mut Plan,
        ch: &DatasetCharacteristics,
        context: &AnalysisContext,
        target: &str,
        target_type: DataType,
    ) {
        let policy = &self.services.policy.inferential;
        let per_predictor = policy.observations_per_predictor;
        let predictors = self.services.resolver.numeric_predictors(ch, context);
        let p = predictors.len();
        if p == 0 {
            return;
        }
        let n = ch.n_observations;
        let needed = per_predictor * p;

        if target_type.is_numeric() {
            plan.score(
                "correlation_test",
                policy.correlation_test_score,
                format!("numeric target '{target}' with {p} numeric predictor(s)"),
            );
            if n >= needed {
                plan.score(
                    "linear_regression",
                    policy.preferred_test_score,
                    format!("n={n} covers {per_predictor} observations per predictor for {p} predictor(s)"),
                );
            } else {
                plan.set(MethodAssessment::ineligible(
                    "linear_regression",
                    format!("n={n} is below {per_predictor} x {p} predictors = {needed}"),
                ));
            }
        } else if ch.column(target).is_some_and(|c| c.distinct_count == 2) {
            if n >= needed {
                plan.score(
                    "logistic_regression",
                    policy.preferred_test_score,
                    format!("binary target '{target}' with {p} numeric predictor(s) and n={n}"),
                );
            } else {
                plan.set(MethodAssessment::ineligible(
                    "logistic_regression",
                    format!("n={n} is below {per_predictor} x {p} predictors = {needed}"),
                ));
            }
        }
    }

    fn explore(&self, plan: &mut Plan, ch: &DatasetCharacteristics) {
        let policy = &self.services.policy.inferential;
        let numeric = ch.numeric_count();
        if numeric >= 2 {
            plan.score(
                "correlation_test",
                policy.exploratory_correlation_score,
                format!("exploratory: {numeric} numeric variables without a designated target"),
            );
        }
        let categorical = ch.categorical_count();
        if categorical >= 2 {
            plan.score(
                "chi_square_independence",
                policy.exploratory_chi_square_score,
                format!("exploratory: {categorical} categorical variables without a designated target"),
            );
        }
    }
}

impl Detector for InferentialDetector {
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
        dataset: &dyn TabularDataset,
        characteristics: &DatasetCharacteristics,
        context: &AnalysisContext,
    ) -> Result<Vec<MethodAssessment>> {
        let mut plan = Plan::default();
        let target = context.target_variable.as_deref();
        let grouping = context.grouping_variable.as_deref();
        let target_type = target.and_then(|t| characteristics.column_type(t));
        let grouping_type = grouping.and_then(|g| characteristics.column_type(g));

        match (target, target_type) {
            (Some(target), Some(target_type)) => {
                if let (Some(grouping), Some(grouping_type)) = (grouping, grouping_type) {
                    if target_type.is_numeric() && grouping_type.is_categorical() {
                        self.compare_groups(&mut plan, dataset, characteristics, context, target, grouping)?;
                    } else if target_type.is_categorical() && grouping_type.is_categorical() {
                        self.test_independence(&mut plan, dataset, characteristics, grouping, target)?;
                    }
                }
                if target_type.is_numeric() || target_type.is_categorical() {
                    self.model_target(&mut plan, characteristics, context, target, target_type);
                } else {
                    let reason = format!("target '{target}' is {target_type}, which no inferential test here accepts");
                    for spec in &self.catalogue.methods {
                        plan.set(MethodAssessment::ineligible(spec.name.as_str(), reason.clone()));
                    }
                }
            }
            _ if grouping.is_some() || context.has_research_question() => {
                self.explore(&mut plan, characteristics);
            }
            _ => {}
        }

        let parametric: Vec<&str> = PARAMETRIC_TESTS
            .iter()
            .copied()
            .filter(|m| plan.is_recommended(m))
            .collect();
        if !parametric.is_empty() {
            plan.score(
                "normality_test",
                self.services.policy.inferential.normality_test_score,
                format!("checks the normality assumption behind {}", parametric.join(", ")),
            );
        }

        Ok(assess_catalogue(&self.catalogue, characteristics, |method| plan.take(method)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use crate::logging::LogConfig;
    use crate::policy::DetectionPolicy;
    use crate::profiler::DataProfiler;
    use crate::scoring::SuggestionBundle;
    use crate::test_fixtures::{grouped_dataset, numeric_dataset};

    fn suggest(dataset: &InMemoryDataset, context: &AnalysisContext) -> SuggestionBundle {
        InferentialDetector::default()
            .suggest_analyses(dataset, context)
            .unwrap()
    }

    fn score(bundle: &SuggestionBundle, method: &str) -> f64 {
        bundle.get(method).map_or(0.0, |r| r.score)
    }

    fn compare(target: &str, grouping: &str) -> AnalysisContext {
        AnalysisContext::builder()
            .target_variable(target)
            .grouping_variable(grouping)
            .build()
    }

    #[test]
    fn test_two_large_groups_prefer_t_tests() {
        let bundle = suggest(&grouped_dataset(40, 2, 11), &compare("outcome", "arm"));
        let mann_whitney = score(&bundle, "mann_whitney_u");
        assert!(score(&bundle, "two_sample_t_test") > mann_whitney);
        assert!(score(&bundle, "welch_t_test") > mann_whitney);
        assert!(bundle.recommends("normality_test"));
        assert!(!bundle.recommends("one_way_anova"));
        assert!(!bundle.recommends("paired_t_test"));
    }

    #[test]
    fn test_small_groups_prefer_rank_tests() {
        let bundle = suggest(&grouped_dataset(12, 2, 11), &compare("outcome", "arm"));
        assert!(score(&bundle, "mann_whitney_u") > score(&bundle, "two_sample_t_test"));
        assert!(score(&bundle, "mann_whitney_u") > score(&bundle, "welch_t_test"));
        assert!(bundle
            .get("mann_whitney_u")
            .unwrap()
            .rationale
            .contains("smallest n=12"));
    }

    #[test]
    fn test_many_groups() {
        let bundle = suggest(&grouped_dataset(40, 3, 3), &compare("outcome", "arm"));
        assert!(score(&bundle, "one_way_anova") > score(&bundle, "kruskal_wallis"));
        assert!(!bundle.recommends("two_sample_t_test"));

        let bundle = suggest(&grouped_dataset(8, 4, 3), &compare("outcome", "arm"));
        assert!(score(&bundle, "kruskal_wallis") > score(&bundle, "one_way_anova"));
    }

    #[test]
    fn test_paired_design() {
        let context = AnalysisContext::builder()
            .target_variable("outcome")
            .grouping_variable("arm")
            .paired(true)
            .build();
        let bundle = suggest(&grouped_dataset(40, 2, 5), &context);
        assert!(score(&bundle, "paired_t_test") > score(&bundle, "wilcoxon_signed_rank"));
        assert!(!bundle.recommends("two_sample_t_test"));
        assert!(!bundle.recommends("mann_whitney_u"));
    }

    #[test]
    fn test_sparse_contingency_prefers_fisher() {
        let dataset = InMemoryDataset::builder()
            .text_column("treated", (0..12).map(|i| Some(if i < 3 { "yes" } else { "no" })))
            .text_column("improved", (0..12).map(|i| Some(if i % 4 == 0 { "up" } else { "down" })))
            .build()
            .unwrap();
        let bundle = suggest(&dataset, &compare("improved", "treated"));
        assert!(score(&bundle, "fisher_exact") > score(&bundle, "chi_square_independence"));
        assert!(bundle
            .get("fisher_exact")
            .unwrap()
            .rationale
            .contains("expected cell count"));
    }

    #[test]
    fn test_balanced_contingency_prefers_chi_square() {
        let dataset = InMemoryDataset::builder()
            .text_column("region", (0..200).map(|i| Some(if i % 2 == 0 { "north" } else { "south" })))
            .text_column("channel", (0..200).map(|i| Some(["web", "phone", "store"][i % 3])))
            .build()
            .unwrap();
        let bundle = suggest(&dataset, &compare("channel", "region"));
        assert!(score(&bundle, "chi_square_independence") > score(&bundle, "fisher_exact"));
    }

    #[test]
    fn test_regression_needs_ten_observations_per_predictor() {
        let context = AnalysisContext::builder().target_variable("x0").build();

        let bundle = suggest(&numeric_dataset(25, 4, 9), &context);
        assert!(bundle.recommends("correlation_test"));
        assert!(bundle
            .ineligible("linear_regression")
            .unwrap()
            .rationale
            .contains("n=25"));

        let bundle = suggest(&numeric_dataset(60, 4, 9), &context);
        assert!(bundle.recommends("linear_regression"));
        let order = &bundle.analysis_order;
        let pos = |m: &str| order.iter().position(|o| o == m).unwrap();
        assert!(pos("correlation_test") < pos("linear_regression"));
    }

    #[test]
    fn test_binary_target_gets_logistic_regression() {
        let dataset = InMemoryDataset::builder()
            .numeric_column("tenure", (0..80).map(|i| Some(1.0 + (i * 37 % 60) as f64 / 3.0)))
            .numeric_column("spend", (0..80).map(|i| Some(20.0 + (i * 13 % 50) as f64 * 1.7)))
            .text_column("churned", (0..80).map(|i| Some(if i % 3 == 0 { "yes" } else { "no" })))
            .build()
            .unwrap();
        let bundle = suggest(&dataset, &AnalysisContext::builder().target_variable("churned").build());
        assert!(bundle.recommends("logistic_regression"));
        assert!(!bundle.recommends("linear_regression"));
    }

    #[test]
    fn test_empty_context_recommends_nothing() {
        let bundle = suggest(&grouped_dataset(40, 2, 1), &AnalysisContext::default());
        assert!(bundle.primary_recommendations.is_empty());
        assert!(bundle.secondary_recommendations.is_empty());
        assert_eq!(bundle.ineligible_methods.len(), MethodCatalogue::inferential().len());
    }

    #[test]
    fn test_research_question_triggers_exploration() {
        let context = AnalysisContext::builder()
            .research_question("Which measures move together?")
            .build();
        let bundle = suggest(&numeric_dataset(50, 3, 2), &context);
        assert_eq!(score(&bundle, "correlation_test"), 0.6);
        assert!(!bundle.recommends("linear_regression"));
    }

    #[test]
    fn test_group_checks_respect_row_limit() {
        // arm_0 fills the first 40 rows, so a 40-row scan sees a single level
        let dataset = grouped_dataset(40, 2, 11);
        let profiler = DataProfiler::builder().row_limit(40).build();
        let services = DetectorServices::from_parts(DetectionPolicy::default(), profiler, LogConfig::default());
        let bundle = InferentialDetector::new(services)
            .suggest_analyses(&dataset, &compare("outcome", "arm"))
            .unwrap();

        assert!(!bundle.recommends("two_sample_t_test"));
        assert!(bundle
            .ineligible("two_sample_t_test")
            .unwrap()
            .rationale
            .contains("1 level(s)"));
    }

    #[test]
    fn test_policy_tunes_test_scores() {
        let mut policy = DetectionPolicy::default();
        policy.inferential.preferred_test_score = 0.95;
        policy.inferential.normality_test_score = 0.3;
        let bundle = InferentialDetector::new(DetectorServices::from_policy(policy))
            .suggest_analyses(&grouped_dataset(40, 3, 3), &compare("outcome", "arm"))
            .unwrap();

        assert_eq!(score(&bundle, "one_way_anova"), 0.95);
        assert_eq!(score(&bundle, "normality_test"), 0.3);
        assert_eq!(score(&bundle, "kruskal_wallis"), 0.6);
    }

    #[test]
    fn test_text_target_is_ineligible_everywhere() {
        let dataset = crate::test_fixtures::feedback_dataset(40);
        let bundle = suggest(&dataset, &compare("comment", "group"));
        assert!(bundle.primary_recommendations.is_empty());
        assert!(bundle
            .ineligible("two_sample_t_test")
            .unwrap()
            .rationale
            .contains("TEXT"));
    }
}
