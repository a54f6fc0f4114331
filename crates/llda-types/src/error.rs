//! Error types for labeled topic modeling.

use thiserror::Error;

/// Unified error type for corpus handling, training and inference.
///
/// Every variant carries enough context (document index, expected vs. actual
/// shape, line number) to diagnose a failure without looking at internals.
#[derive(Debug, Error)]
pub enum LldaError {
    /// Malformed corpus or label input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A training document has no admissible topic
    #[error("Document {document} has an empty label set")]
    EmptyLabelSet { document: usize },

    /// Corpus, label or model dimensions disagree
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Inference requested before a model exists, or artifacts are missing
    #[error("Model not fitted: {0}")]
    ModelNotFitted(String),

    /// Interchange file could not be parsed
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training stopped at an iteration boundary on request
    #[error("Training cancelled before iteration {iteration}")]
    Cancelled { iteration: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LldaError {
    /// Shorthand for a [`LldaError::DimensionMismatch`].
    pub fn mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, LldaError>;
