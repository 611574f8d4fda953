//! # Smart Embeddings
//!
//! Local text embeddings and similarity search for small labelled sets.
//!
//! ## Features
//!
//! - **Embedding Generation**: tokenizer → model runner → sum pooling
//! - **Quantized Storage**: 8-bit embeddings with a per-vector scale
//! - **Similarity Search**: exact top-K cosine ranking with a threshold
//! - **Pluggable Backends**: tokenizer and model sit behind traits
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Embeddings Core                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Tokenizer ──► ModelRunner ──► sum_pool ──► FloatEmbedding      │
//! │                                                 │               │
//! │                                                 ▼               │
//! │                                   quantize / QuantizedEmbedding │
//! │                                                 │               │
//! │  SimilarityQuery ──► Embedder::search ──► CandidateSet          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smart_embeddings::{Embedder, SimilarityQuery};
//!
//! let embedder = Embedder::new(tokenizer, model);
//! let labels = embedder.embed_range_quantized(vec!["Bug", "Docs", "Enhancement"])?;
//!
//! let query = SimilarityQuery::text("There is a crash when I click save")
//!     .with_max_results(2)
//!     .with_min_similarity(0.5);
//! let results = embedder.search(&query, labels.as_slice())?;
//! ```

pub mod codec;
pub mod embedder;
pub mod embedding;
pub mod error;
pub mod index;
pub mod model;
pub mod pooling;
pub mod search;
pub mod tokenizer;

pub use embedder::Embedder;
pub use embedding::{
    AnyEmbedding, Embedding, EmbeddingRef, FloatEmbedding, QuantizedEmbedding, dequantize,
    quantize, similarity,
};
pub use error::{EmbeddingError, Result};
pub use index::CandidateSet;
pub use model::{ActivationMatrix, ModelRunner};
pub use pooling::sum_pool;
pub use search::{
    QueryInput, SimilarityCandidate, SimilarityQuery, SimilarityResult, search, search_embedding,
};
pub use tokenizer::{TokenBatch, Tokenizer};

#[cfg(feature = "hf-tokenizer")]
pub use tokenizer::HfTokenizer;

/// Dimension of embeddings (varies by model).
pub const DEFAULT_DIMENSION: usize = 384; // bge-micro-v2 / MiniLM

/// Longest token sequence the bundled tokenizer adapter keeps.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

/// Default minimum similarity for a search hit.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

/// Default number of search results.
pub const DEFAULT_MAX_RESULTS: usize = 5;
