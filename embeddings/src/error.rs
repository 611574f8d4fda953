//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// The tokenizer could not encode the input.
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// The model runner failed to produce activations.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Two vectors (or a vector and a model) disagree on dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A similarity query was malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An encoded embedding could not be decoded.
    #[error("malformed embedding bytes: {0}")]
    MalformedBytes(String),
}

impl EmbeddingError {
    /// Build a tokenization error from any displayable cause.
    pub fn tokenization(cause: impl std::fmt::Display) -> Self {
        Self::Tokenization(cause.to_string())
    }

    /// Build an inference error from any displayable cause.
    pub fn inference(cause: impl std::fmt::Display) -> Self {
        Self::Inference(cause.to_string())
    }

    /// Fail with [`EmbeddingError::DimensionMismatch`] unless `actual == expected`.
    pub(crate) fn check_dimension(expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(Self::DimensionMismatch { expected, actual });
        }
        Ok(())
    }
}
