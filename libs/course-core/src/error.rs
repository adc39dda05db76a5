//! Error types for course-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating learner or authoring input.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("video progress must be between 0 and 1, got {0}")]
    InvalidVideoProgress(f64),

    #[error("time spent must not be negative, got {0}")]
    NegativeTimeSpent(i64),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("unrecognized video URL: {0}")]
    InvalidVideoUrl(String),
}
