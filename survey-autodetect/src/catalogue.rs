//! Registries of known analysis methods and their prerequisites.
//!
//! Each analysis family owns one immutable [`MethodCatalogue`]. A catalogue
//! entry declares the variable types and counts a method needs, a minimum
//! sample size, the family-level priority used for tie-breaking and the
//! ordering constraints consumed when building an analysis workflow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AutodetectError, Result};
use crate::profiler::{DataType, DatasetCharacteristics};

/// Analysis families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisModule {
    Descriptive,
    Inferential,
    Qualitative,
}

impl AnalysisModule {
    pub const ALL: [AnalysisModule; 3] = [
        AnalysisModule::Descriptive,
        AnalysisModule::Inferential,
        AnalysisModule::Qualitative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisModule::Descriptive => "descriptive",
            AnalysisModule::Inferential => "inferential",
            AnalysisModule::Qualitative => "qualitative",
        }
    }

    /// Descriptive and inferential work on structured values.
    pub fn is_quantitative(self) -> bool {
        !matches!(self, AnalysisModule::Qualitative)
    }
}

impl fmt::Display for AnalysisModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisModule {
    type Err = AutodetectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "descriptive" => Ok(AnalysisModule::Descriptive),
            "inferential" => Ok(AnalysisModule::Inferential),
            "qualitative" => Ok(AnalysisModule::Qualitative),
            _ => Err(AutodetectError::UnknownModule(s.to_string())),
        }
    }
}

/// At least `min_count` columns whose type is one of `types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRequirement {
    pub types: Vec<DataType>,
    pub min_count: usize,
    /// Human-readable noun for rationales ("numeric", "categorical")
    pub label: String,
}

impl TypeRequirement {
    fn satisfied_count(&self, characteristics: &DatasetCharacteristics) -> usize {
        self.types.iter().map(|t| characteristics.count(*t)).sum()
    }
}

/// One catalogued method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub module: AnalysisModule,
    pub description: String,
    /// Lower runs first when scores tie
    pub priority: u8,
    pub requirements: Vec<TypeRequirement>,
    pub min_sample_size: usize,
    pub estimated_time: String,
    /// Relies on distributional assumptions that missing data can bias
    pub assumption_sensitive: bool,
    /// Methods that should run before this one when both are suggested
    pub depends_on: Vec<String>,
}

impl MethodSpec {
    fn new(name: &str, module: AnalysisModule, description: &str) -> Self {
        Self {
            name: name.to_string(),
            module,
            description: description.to_string(),
            priority: 5,
            requirements: Vec::new(),
            min_sample_size: 0,
            estimated_time: "< 1 minute".to_string(),
            assumption_sensitive: false,
            depends_on: Vec::new(),
        }
    }

    fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    fn requires(mut self, label: &str, types: &[DataType], min_count: usize) -> Self {
        self.requirements.push(TypeRequirement {
            types: types.to_vec(),
            min_count,
            label: label.to_string(),
        });
        self
    }

    fn min_sample_size(mut self, n: usize) -> Self {
        self.min_sample_size = n;
        self
    }

    fn estimated_time(mut self, estimate: &str) -> Self {
        self.estimated_time = estimate.to_string();
        self
    }

    fn assumption_sensitive(mut self) -> Self {
        self.assumption_sensitive = true;
        self
    }

    fn depends_on(mut self, methods: &[&str]) -> Self {
        self.depends_on = methods.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Checks the declared type and sample-size prerequisites.
    ///
    /// Returns the reason for ineligibility when a prerequisite is unmet.
    pub fn check_prerequisites(
        &self,
        characteristics: &DatasetCharacteristics,
    ) -> std::result::Result<(), String> {
        for requirement in &self.requirements {
            let found = requirement.satisfied_count(characteristics);
            if found < requirement.min_count {
                return Err(format!(
                    "requires at least {} {} variable{} (found {found})",
                    requirement.min_count,
                    requirement.label,
                    if requirement.min_count == 1 { "" } else { "s" }
                ));
            }
        }
        if characteristics.n_observations < self.min_sample_size {
            return Err(format!(
                "requires at least {} observations (found {})",
                self.min_sample_size, characteristics.n_observations
            ));
        }
        Ok(())
    }
}

const NUMERIC: &[DataType] = &[DataType::NumericContinuous, DataType::NumericDiscrete];
const CATEGORICAL: &[DataType] = &[DataType::Categorical, DataType::Boolean];
const TEXT: &[DataType] = &[DataType::Text];

/// Immutable registry of one family's methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCatalogue {
    pub module: AnalysisModule,
    pub methods: Vec<MethodSpec>,
}

impl MethodCatalogue {
    /// The built-in catalogue for a family.
    pub fn for_module(module: AnalysisModule) -> Self {
        match module {
            AnalysisModule::Descriptive => Self::descriptive(),
            AnalysisModule::Inferential => Self::inferential(),
            AnalysisModule::Qualitative => Self::qualitative(),
        }
    }

    pub fn descriptive() -> Self {
        const D: AnalysisModule = AnalysisModule::Descriptive;
        Self {
            module: D,
            methods: vec![
                MethodSpec::new("basic_statistics", D, "Central tendency, spread and range per numeric variable")
                    .priority(1)
                    .requires("numeric", NUMERIC, 1)
                    .estimated_time("< 1 second"),
                MethodSpec::new("missing_data_analysis", D, "Missingness patterns and mechanism checks")
                    .priority(1)
                    .estimated_time("< 1 second"),
                MethodSpec::new("distribution_analysis", D, "Histograms, shape and normality diagnostics")
                    .priority(2)
                    .requires("numeric", NUMERIC, 1)
                    .estimated_time("seconds"),
                MethodSpec::new("categorical_analysis", D, "Frequency tables and mode per categorical variable")
                    .priority(2)
                    .requires("categorical", CATEGORICAL, 1)
                    .estimated_time("< 1 second"),
                MethodSpec::new("correlation_analysis", D, "Pairwise association matrix across numeric variables")
                    .priority(3)
                    .requires("numeric", NUMERIC, 2)
                    .estimated_time("seconds"),
                MethodSpec::new("cross_tabulation", D, "Contingency tables between categorical variables")
                    .priority(3)
                    .requires("categorical", CATEGORICAL, 2)
                    .estimated_time("seconds"),
                MethodSpec::new("outlier_detection", D, "Flags unusual numeric observations")
                    .priority(4)
                    .requires("numeric", NUMERIC, 1)
                    .depends_on(&["distribution_analysis"])
                    .estimated_time("seconds"),
                MethodSpec::new("temporal_analysis", D, "Trends and seasonality over date/time variables")
                    .priority(5)
                    .requires("date/time", &[DataType::Datetime], 1)
                    .estimated_time("< 1 minute"),
                MethodSpec::new("geospatial_analysis", D, "Spatial distribution of geographic variables")
                    .priority(5)
                    .requires("geographic", &[DataType::Geographic], 1)
                    .estimated_time("1-5 minutes"),
            ],
        }
    }

    pub fn inferential() -> Self {
        const I: AnalysisModule = AnalysisModule::Inferential;
        let comparison = |name: &str, description: &str| {
            MethodSpec::new(name, I, description)
                .requires("numeric", NUMERIC, 1)
                .requires("categorical", CATEGORICAL, 1)
                .min_sample_size(4)
                .estimated_time("< 1 second")
        };
        Self {
            module: I,
            methods: vec![
                comparison("two_sample_t_test", "Student's t-test for two independent groups")
                    .priority(1)
                    .assumption_sensitive()
                    .depends_on(&["normality_test"]),
                comparison("welch_t_test", "Welch's t-test for two groups with unequal variances")
                    .priority(1)
                    .assumption_sensitive()
                    .depends_on(&["normality_test"]),
                comparison("paired_t_test", "t-test on paired or repeated measurements")
                    .priority(1)
                    .assumption_sensitive()
                    .depends_on(&["normality_test"]),
                comparison("one_way_anova", "Analysis of variance across three or more groups")
                    .priority(1)
                    .assumption_sensitive()
                    .depends_on(&["normality_test"]),
                comparison("mann_whitney_u", "Rank-based comparison of two independent groups").priority(2),
                comparison("wilcoxon_signed_rank", "Rank-based comparison of paired measurements").priority(2),
                comparison("kruskal_wallis", "Rank-based comparison across three or more groups").priority(2),
                MethodSpec::new("chi_square_independence", I, "Chi-square test of independence between categorical variables")
                    .priority(1)
                    .requires("categorical", CATEGORICAL, 2)
                    .min_sample_size(4)
                    .assumption_sensitive()
                    .estimated_time("< 1 second"),
                MethodSpec::new("fisher_exact", I, "Exact test of independence for sparse contingency tables")
                    .priority(2)
                    .requires("categorical", CATEGORICAL, 2)
                    .min_sample_size(2)
                    .estimated_time("seconds"),
                MethodSpec::new("correlation_test", I, "Significance test of association between numeric variables")
                    .priority(2)
                    .requires("numeric", NUMERIC, 2)
                    .min_sample_size(3)
                    .estimated_time("< 1 second"),
                MethodSpec::new("linear_regression", I, "Ordinary least squares model of a numeric target")
                    .priority(3)
                    .requires("numeric", NUMERIC, 2)
                    .min_sample_size(10)
                    .assumption_sensitive()
                    .depends_on(&["correlation_analysis", "correlation_test", "normality_test"])
                    .estimated_time("seconds"),
                MethodSpec::new("logistic_regression", I, "Logistic model of a binary target")
                    .priority(3)
                    .requires("categorical", CATEGORICAL, 1)
                    .requires("numeric", NUMERIC, 1)
                    .min_sample_size(10)
                    .assumption_sensitive()
                    .depends_on(&["correlation_analysis"])
                    .estimated_time("seconds"),
                MethodSpec::new("normality_test", I, "Shapiro-Wilk or Kolmogorov-Smirnov check of the normality assumption")
                    .priority(4)
                    .requires("numeric", NUMERIC, 1)
                    .min_sample_size(3)
                    .estimated_time("< 1 second"),
            ],
        }
    }

    pub fn qualitative() -> Self {
        const Q: AnalysisModule = AnalysisModule::Qualitative;
        Self {
            module: Q,
            methods: vec![
                MethodSpec::new("sentiment_analysis", Q, "Polarity scoring of free-text responses")
                    .priority(1)
                    .requires("free-text", TEXT, 1)
                    .estimated_time("seconds"),
                MethodSpec::new("thematic_analysis", Q, "Clusters responses into recurring themes")
                    .priority(1)
                    .requires("free-text", TEXT, 1)
                    .estimated_time("1-5 minutes"),
                MethodSpec::new("content_analysis", Q, "Systematic coding of response content")
                    .priority(2)
                    .requires("free-text", TEXT, 1)
                    .estimated_time("1-5 minutes"),
                MethodSpec::new("survey_analysis", Q, "Relates free-text answers to structured survey fields")
                    .priority(2)
                    .requires("free-text", TEXT, 2)
                    .depends_on(&["sentiment_analysis", "thematic_analysis"])
                    .estimated_time("1-5 minutes"),
                MethodSpec::new("keyword_extraction", Q, "Most distinctive terms across the corpus")
                    .priority(3)
                    .requires("free-text", TEXT, 1)
                    .estimated_time("seconds"),
            ],
        }
    }

    /// Looks up a method by name.
    pub fn get(&self, method: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == method)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.get(method).is_some()
    }

    /// Method names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use crate::profiler::DataProfiler;
    use std::collections::HashSet;

    #[test]
    fn test_module_parsing() {
        assert_eq!(
            " Inferential ".parse::<AnalysisModule>().unwrap(),
            AnalysisModule::Inferential
        );
        let err = "predictive".parse::<AnalysisModule>().unwrap_err();
        assert!(matches!(err, AutodetectError::UnknownModule(_)));
        assert_eq!(
            serde_json::to_string(&AnalysisModule::Qualitative).unwrap(),
            "\"qualitative\""
        );
    }

    #[test]
    fn test_method_names_unique_across_catalogues() {
        let mut seen = HashSet::new();
        for module in AnalysisModule::ALL {
            let catalogue = MethodCatalogue::for_module(module);
            assert_eq!(catalogue.module, module);
            for spec in &catalogue.methods {
                assert_eq!(spec.module, module);
                assert!(seen.insert(spec.name.clone()), "duplicate {}", spec.name);
            }
        }
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn test_prerequisite_rationale() {
        let dataset = InMemoryDataset::builder()
            .numeric_column("x", (0..5).map(|i| Some(i as f64 * 0.5)))
            .build()
            .unwrap();
        let profile = DataProfiler::new().profile(&dataset, None).unwrap();
        let catalogue = MethodCatalogue::descriptive();

        assert!(catalogue
            .get("basic_statistics")
            .unwrap()
            .check_prerequisites(&profile)
            .is_ok());
        let reason = catalogue
            .get("correlation_analysis")
            .unwrap()
            .check_prerequisites(&profile)
            .unwrap_err();
        assert_eq!(reason, "requires at least 2 numeric variables (found 1)");

        let reason = MethodCatalogue::inferential()
            .get("linear_regression")
            .unwrap()
            .check_prerequisites(&profile)
            .unwrap_err();
        assert!(reason.contains("numeric"));
    }

    #[test]
    fn test_lookup() {
        let catalogue = MethodCatalogue::qualitative();
        assert!(catalogue.contains("sentiment_analysis"));
        assert!(!catalogue.contains("basic_statistics"));
        assert_eq!(catalogue.len(), 5);
        assert_eq!(catalogue.names()[0], "sentiment_analysis");
    }
}
