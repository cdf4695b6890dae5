//! Prelude for commonly used types and traits in survey-autodetect.

pub use crate::catalogue::{AnalysisModule, MethodCatalogue, MethodSpec};
pub use crate::configuration::{ParameterValue, Parameters};
pub use crate::context::AnalysisContext;
pub use crate::coordinator::{ModuleOutcome, UnifiedCoordinator, UnifiedResult};
pub use crate::dataset::{CellValue, InMemoryDataset, RecordBatchDataset, TabularDataset};
pub use crate::detectors::Detector;
pub use crate::engine::AutoDetect;
pub use crate::error::{AutodetectError, ErrorContext, Result};
pub use crate::logging::LogConfig;
pub use crate::policy::DetectionPolicy;
pub use crate::profiler::{DataProfiler, DataType, DatasetCharacteristics, SampleSizeCategory};
pub use crate::scoring::{Confidence, MethodRecommendation, SuggestionBundle};
