//! Error types for the label suggestion service.

use thiserror::Error;

/// Result type alias for suggestion operations.
pub type Result<T> = std::result::Result<T, SuggestionError>;

/// Errors that can occur in the suggestion service.
#[derive(Error, Debug)]
pub enum SuggestionError {
    /// Embedding or search error.
    #[error("embedding error: {0}")]
    Embedding(#[from] smart_embeddings::EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(String),

    /// A blocking embedding task panicked or was cancelled.
    #[error("embedding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
