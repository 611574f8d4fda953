//! # Label Suggestions
//!
//! Suggests labels (issue categories, tags...) for free text using local
//! embeddings:
//!
//! - **Label Set**: label embeddings computed once, held in 8-bit or float form
//! - **Suggestion Queries**: top-K labels above a similarity threshold
//! - **Embedding Cache**: label embeddings reused across restarts
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Label Suggester                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  SuggestionConfig ──► EmbeddingCache ──► LabelSet (immutable)   │
//! │                                              │                  │
//! │  text ──► spawn_blocking(Embedder::search) ◄─┘                  │
//! │                  │                                              │
//! │                  ▼                                              │
//! │            Vec<Suggestion>                                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use smart_embeddings::Embedder;
//! use smart_suggestions::{LabelSuggester, SuggestionConfig};
//!
//! let embedder = Arc::new(Embedder::new(tokenizer, model));
//! let suggester = LabelSuggester::new(SuggestionConfig::default(), embedder).await?;
//!
//! let labels = suggester.suggest("There is a crash when I click save").await?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;

pub use cache::{CacheStats, EmbeddingCache};
pub use config::{CacheConfig, DEFAULT_LABELS, QueryConfig, StorageForm, SuggestionConfig};
pub use engine::{LabelSet, LabelSuggester, Suggestion};
pub use error::{Result, SuggestionError};

// Re-export from dependencies for convenience
pub use smart_embeddings::{Embedder, ModelRunner, Tokenizer};
