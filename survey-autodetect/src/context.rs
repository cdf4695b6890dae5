//! Caller-supplied hints that refine recommendations.

use serde::{Deserialize, Serialize};

use crate::dataset::TabularDataset;
use crate::error::{AutodetectError, Result};

/// Significance level used when the context does not set one.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Research design hints.
///
/// Every field is optional; an empty context asks for purely exploratory
/// suggestions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisContext {
    pub target_variable: Option<String>,
    pub grouping_variable: Option<String>,
    pub research_question: Option<String>,
    pub alpha: Option<f64>,
    pub analysis_goals: Vec<String>,
    /// Observations are paired or repeated measures
    pub paired: bool,
    /// Explicit predictors for regression; defaults to the other numeric columns
    pub predictor_variables: Vec<String>,
}

impl AnalysisContext {
    pub fn builder() -> AnalysisContextBuilder {
        AnalysisContextBuilder::default()
    }

    /// `alpha` or the 0.05 default.
    pub fn effective_alpha(&self) -> f64 {
        self.alpha.unwrap_or(DEFAULT_ALPHA)
    }

    /// Whether a non-blank research question was supplied.
    pub fn has_research_question(&self) -> bool {
        self.research_question
            .as_deref()
            .is_some_and(|q| !q.trim().is_empty())
    }

    /// Target, grouping variable or research question present.
    pub fn has_inferential_intent(&self) -> bool {
        self.target_variable.is_some() || self.grouping_variable.is_some() || self.has_research_question()
    }

    /// Checks the context against a dataset.
    ///
    /// Every referenced column must exist and `alpha` must lie strictly
    /// between 0 and 1.
    pub fn validate(&self, dataset: &dyn TabularDataset) -> Result<()> {
        if let Some(alpha) = self.alpha {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(AutodetectError::input(format!(
                    "alpha must lie in (0, 1), got {alpha}"
                )));
            }
        }

        let referenced = self
            .target_variable
            .iter()
            .chain(self.grouping_variable.iter())
            .chain(self.predictor_variables.iter());
        for column in referenced {
            if !dataset.has_column(column) {
                return Err(AutodetectError::ColumnNotFound {
                    column: column.clone(),
                });
            }
        }

        if let (Some(target), Some(grouping)) = (&self.target_variable, &self.grouping_variable) {
            if target == grouping {
                return Err(AutodetectError::input(format!(
                    "target_variable and grouping_variable both name '{target}'"
                )));
            }
        }

        Ok(())
    }
}

/// Builder for [`AnalysisContext`]
#[derive(Debug, Default)]
pub struct AnalysisContextBuilder {
    context: AnalysisContext,
}

impl AnalysisContextBuilder {
    pub fn target_variable(mut self, column: impl Into<String>) -> Self {
        self.context.target_variable = Some(column.into());
        self
    }

    pub fn grouping_variable(mut self, column: impl Into<String>) -> Self {
        self.context.grouping_variable = Some(column.into());
        self
    }

    pub fn research_question(mut self, question: impl Into<String>) -> Self {
        self.context.research_question = Some(question.into());
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.context.alpha = Some(alpha);
        self
    }

    pub fn analysis_goal(mut self, goal: impl Into<String>) -> Self {
        self.context.analysis_goals.push(goal.into());
        self
    }

    pub fn paired(mut self, paired: bool) -> Self {
        self.context.paired = paired;
        self
    }

    pub fn predictor_variables<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context.predictor_variables = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> AnalysisContext {
        self.context
    }
}
