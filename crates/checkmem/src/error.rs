//! Error types for heap measurement.
//!
//! Errors raised by a measured target never pass through this type: they are
//! handed back to the caller untouched.

use thiserror::Error;

/// Errors produced by the measurement machinery itself.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("allocation tracer unavailable: {0}")]
    TracerUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to write report: {0}")]
    ReportWriteFailed(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MeasureError {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result type for checkmem operations.
pub type Result<T> = std::result::Result<T, MeasureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_reason() {
        let err = MeasureError::invalid_config("chunk must be non-zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration: chunk must be non-zero"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<u32>("not json");
        let converted = parse.map_err(MeasureError::from);
        assert!(matches!(converted, Err(MeasureError::Json(_))));
    }
}
