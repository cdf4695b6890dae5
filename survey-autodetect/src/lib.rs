//! # Survey Autodetect - Analysis Recommendations for Survey Data
//!
//! Survey Autodetect inspects a tabular dataset, typically survey responses,
//! and recommends which analyses to run on it. It does not run the analyses;
//! it tells you which descriptive summaries, hypothesis tests and free-text
//! methods fit the data you have, why, and with which default parameters.
//!
//! ## Overview
//!
//! A run has three stages:
//!
//! 1. **Profiling** - the [`DataProfiler`](profiler::DataProfiler) classifies
//!    every column, measures missingness and duplication and summarizes
//!    numeric and text columns into
//!    [`DatasetCharacteristics`](profiler::DatasetCharacteristics).
//! 2. **Detection** - one [`Detector`](detectors::Detector) per analysis
//!    family scores each method in its catalogue against the profile and the
//!    caller's [`AnalysisContext`](context::AnalysisContext).
//! 3. **Ranking** - the [`ScoringEngine`](scoring::ScoringEngine) turns
//!    scores into confidence bands, primary and secondary recommendations and
//!    an execution order.
//!
//! ## Quick Start
//!
//! ```rust
//! use survey_autodetect::prelude::*;
//!
//! # fn main() -> survey_autodetect::error::Result<()> {
//! let dataset = InMemoryDataset::builder()
//!     .numeric_column("nps", (0..120).map(|i| Some(((i * 7) % 11) as f64)))
//!     .numeric_column("tenure_months", (0..120).map(|i| Some(1.5 + (i % 37) as f64 * 0.8)))
//!     .text_column("plan", (0..120).map(|i| Some(["basic", "pro", "team"][i % 3])))
//!     .build()?;
//!
//! let engine = AutoDetect::new();
//! let bundle = engine.suggest(&dataset, "descriptive", &AnalysisContext::default())?;
//!
//! for recommendation in &bundle.primary_recommendations {
//!     println!(
//!         "{} ({}, {:.2}): {}",
//!         recommendation.method,
//!         recommendation.confidence,
//!         recommendation.score,
//!         recommendation.rationale
//!     );
//! }
//! assert!(bundle.recommends("correlation_analysis"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Analysis families
//!
//! - **Descriptive** - summary statistics, distributions, correlations,
//!   outliers, frequency tables, missing-data, temporal and geospatial views
//! - **Inferential** - group comparisons, independence tests, correlation
//!   tests and regression models, chosen from the target and grouping
//!   variables in the context
//! - **Qualitative** - sentiment, themes, content coding and keywords for
//!   free-text answers
//!
//! [`UnifiedCoordinator`](coordinator::UnifiedCoordinator) runs several
//! families against one shared profile and isolates failures so that one
//! broken detector never hides the others' results.
//!
//! ## Loading data
//!
//! Anything implementing [`TabularDataset`](dataset::TabularDataset) can be
//! profiled. Arrow record batches are supported directly through
//! [`RecordBatchDataset`](dataset::RecordBatchDataset), and the
//! [`sources`] module loads CSV files and DataFusion tables asynchronously.
//!
//! ## Thresholds
//!
//! Every cut-off and score lives in a serde-configurable
//! [`DetectionPolicy`](policy::DetectionPolicy) that can be loaded from
//! JSON and passed to [`AutoDetect::builder`](engine::AutoDetect::builder).
//!
//! ## Logging
//!
//! The crate emits `tracing` events at profiler, detector and coordinator
//! boundaries. [`logging::setup::init_logging`] installs a subscriber for
//! applications that do not bring their own.

pub mod catalogue;
pub mod configuration;
pub mod context;
pub mod coordinator;
pub mod dataset;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod logging;
pub mod policy;
pub mod prelude;
pub mod profiler;
pub mod scoring;
pub mod sources;

#[cfg(test)]
mod test_fixtures;

pub use engine::{AutoDetect, AutoDetectBuilder};
pub use error::{AutodetectError, Result};
