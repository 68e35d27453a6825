//! Error types for the flowcast pipeline

use thiserror::Error;

/// Result type alias for flowcast operations
pub type Result<T> = std::result::Result<T, FlowcastError>;

/// Main error type for the flowcast pipeline
#[derive(Error, Debug)]
pub enum FlowcastError {
    /// Row-level data problem. Recovered locally by dropping and counting
    /// the offending row; never aborts a batch.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Inconsistent pipeline configuration. Fatal, raised before any
    /// computation proceeds.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// `predict` called before `fit`
    #[error("Model not fitted")]
    ModelNotFitted,

    /// ETA mapping requested with no default curve and no calibration data
    #[error("No slowdown curve configured and no calibration data supplied")]
    MissingCalibration,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FlowcastError {
    fn from(err: serde_json::Error) -> Self {
        FlowcastError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FlowcastError {
    fn from(err: ndarray::ShapeError) -> Self {
        FlowcastError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
