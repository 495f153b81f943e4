//! Error types for the conveyor crate

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum ConveyorError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Stage '{stage}' failed: {message}")]
    StageError { stage: String, message: String },

    #[error("Estimator error: {0}")]
    EstimatorError(String),

    #[error("Metric error: {0}")]
    MetricError(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Explainability error: {0}")]
    ExplainError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for conveyor operations
pub type Result<T> = std::result::Result<T, ConveyorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConveyorError::ShapeError {
            expected: "100 rows".to_string(),
            actual: "90 rows".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid shape: expected 100 rows, got 90 rows");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ConveyorError = io_err.into();
        assert!(matches!(err, ConveyorError::IoError(_)));
    }
}
