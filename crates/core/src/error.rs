//! Core Error Types
//!
//! Errors raised by the shared data model. The application crate has its own
//! `AppError` for request validation and configuration loading.

use thiserror::Error;

/// Core error type for the Uber Code Generator workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Artifact format errors (bad or mismatched file markers)
    #[error("Artifact error: {0}")]
    Artifact(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an artifact error
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::artifact("unknown file marker 'x.py'");
        assert_eq!(err.to_string(), "Artifact error: unknown file marker 'x.py'");
    }
}
