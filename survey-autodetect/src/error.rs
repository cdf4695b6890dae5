//! Error types for the survey auto-detection engine.
//!
//! Errors fall into four families. Input and configuration errors surface to
//! the immediate caller, detector failures are absorbed by the unified
//! coordinator and reported inline, and unmet method prerequisites are not
//! errors at all: they come back as ineligible entries in a
//! [`SuggestionBundle`](crate::scoring::SuggestionBundle).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum AutodetectError {
    /// The dataset or request is malformed where structure is required.
    #[error("Invalid input: {0}")]
    Input(String),

    /// An analysis context references a column the dataset does not have.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// A module name that is not one of the known analysis families.
    #[error("Unknown analysis module '{0}' (expected descriptive, inferential or qualitative)")]
    UnknownModule(String),

    /// Configuration was requested for a method no catalogue knows about, or
    /// a policy document could not be applied.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An unexpected computational failure inside a single detector.
    #[error("Detector '{module}' failed: {message}")]
    DetectorFailure { module: String, message: String },

    /// A dataset could not be loaded from its source.
    #[error("Data source error: {message}")]
    DataSource {
        /// Kind of source, such as "CSV" or "Table"
        source_type: String,
        message: String,
    },

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Arrow array conversion failed.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A policy document or result could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A broken invariant inside the engine.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, AutodetectError>`.
pub type Result<T> = std::result::Result<T, AutodetectError>;

/// Coarse classification of an error, matching how the outer API layer is
/// expected to react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Caller sent something unusable; hard failure.
    Input,
    /// Unknown method or bad policy; hard failure.
    Configuration,
    /// Isolated failure inside one detector.
    DetectorFailure,
    /// Loading the dataset failed before the core ran.
    Source,
    /// Anything else.
    Internal,
}

impl AutodetectError {
    /// Creates an input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a detector failure for the named module.
    pub fn detector_failure(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DetectorFailure {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) | Self::ColumnNotFound { .. } | Self::UnknownModule(_) => {
                ErrorKind::Input
            }
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::DetectorFailure { .. } => ErrorKind::DetectorFailure,
            Self::DataSource { .. } | Self::DataFusion(_) | Self::Arrow(_) | Self::Io(_) => {
                ErrorKind::Source
            }
            Self::Serialization(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error should be reported to the caller as bad input.
    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }
}

impl From<serde_json::Error> for AutodetectError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Prefixes errors with what the engine was doing when they occurred.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T>;

    /// Like [`ErrorContext::context`], building the message only on error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AutodetectError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            AutodetectError::Internal(inner) => AutodetectError::Internal(format!("{msg}: {inner}")),
            other => AutodetectError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                AutodetectError::Internal(inner) => {
                    AutodetectError::Internal(format!("{msg}: {inner}"))
                }
                other => AutodetectError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found() {
        let err = AutodetectError::ColumnNotFound {
            column: "satisfaction".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'satisfaction' not found in dataset");
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_unknown_module_is_input_error() {
        let err = AutodetectError::UnknownModule("predictive".to_string());
        assert!(err.is_input_error());
        assert!(err.to_string().contains("predictive"));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            AutodetectError::configuration("unknown method").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            AutodetectError::detector_failure("inferential", "degenerate column").kind(),
            ErrorKind::DetectorFailure
        );
        assert_eq!(
            AutodetectError::data_source("CSV", "missing file").kind(),
            ErrorKind::Source
        );
        assert_eq!(AutodetectError::internal("boom").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_detector_failure_message() {
        let err = AutodetectError::detector_failure("qualitative", "empty corpus");
        assert_eq!(err.to_string(), "Detector 'qualitative' failed: empty corpus");
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(AutodetectError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("While profiling")
            .unwrap_err();
        assert!(err.to_string().contains("While profiling"));
        assert!(err.to_string().contains("Something went wrong"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AutodetectError = parse.unwrap_err().into();
        assert!(matches!(err, AutodetectError::Serialization(_)));
    }
}
