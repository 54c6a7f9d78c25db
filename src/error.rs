//! Error types for the activity pipeline.

use thiserror::Error;

/// Main error type for loading, windowing, training and summarising.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Two parallel sequences that must line up do not.
    #[error("Length mismatch: {samples} samples vs {labels} labels")]
    LengthMismatch { samples: usize, labels: usize },

    /// Window length/overlap combination cannot slide.
    #[error("Invalid window: length {length}, overlap {overlap}")]
    InvalidWindow { length: usize, overlap: usize },

    /// Not enough data to do anything useful.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Cross-validation folds cannot be built for these labels.
    #[error("Invalid folds: {0}")]
    InvalidFolds(String),

    /// Model or grid parameters are unusable.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A timestamp in the input could not be parsed.
    #[error("Invalid timestamp {value:?} at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    #[must_use]
    pub const fn length_mismatch(samples: usize, labels: usize) -> Self {
        Self::LengthMismatch { samples, labels }
    }

    #[must_use]
    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    #[must_use]
    pub fn folds(msg: impl Into<String>) -> Self {
        Self::InvalidFolds(msg.into())
    }

    #[must_use]
    pub fn parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }
}
