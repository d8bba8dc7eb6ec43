//! Error types for the feature extraction pipeline.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.
//! Insufficient book depth is deliberately absent: a thin snapshot is a
//! filtering decision (see [`crate::pipeline::DepthCheck`]), not a failure.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feature extraction operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Main error type for feature extraction.
#[derive(Error, Debug, Clone)]
pub enum FeatureError {
    /// The trade-count lookup yielded no usable start time or instrument
    #[error("Missing upstream metadata: {0}")]
    MissingUpstreamMetadata(String),

    /// Internal invariant violation (ragged levels, label gaps, malformed table)
    #[error("Structural error: {0}")]
    Structural(String),

    /// Output location could not be created or the table could not be written
    #[error("Persistence error at {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    /// Configuration value out of its accepted range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot stream could not be opened
    #[error("Snapshot source error: {0}")]
    Source(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl FeatureError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        FeatureError::Generic(msg.into())
    }

    /// Create a structural error from any string-like type.
    pub fn structural(msg: impl Into<String>) -> Self {
        FeatureError::Structural(msg.into())
    }

    /// Create a persistence error for `path`.
    pub fn persistence(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        FeatureError::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for FeatureError {
    fn from(err: std::io::Error) -> Self {
        FeatureError::Generic(format!("IO error: {err}"))
    }
}

impl From<String> for FeatureError {
    fn from(err: String) -> Self {
        FeatureError::Generic(err)
    }
}

impl From<&str> for FeatureError {
    fn from(err: &str) -> Self {
        FeatureError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeatureError::MissingUpstreamMetadata("empty history".into());
        assert_eq!(err.to_string(), "Missing upstream metadata: empty history");

        let err = FeatureError::persistence("/tmp/out.csv", "disk full");
        assert_eq!(err.to_string(), "Persistence error at /tmp/out.csv: disk full");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FeatureError = io.into();
        assert!(matches!(err, FeatureError::Generic(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_result_type() {
        let result: Result<i32> = Err(FeatureError::structural("ragged"));
        assert!(result.is_err());
    }
}
