//! Tokenizer adapter.
//!
//! The core never interprets vocabularies itself. A [`Tokenizer`] turns a
//! string into a [`TokenBatch`]: token ids plus a parallel attention mask.

use crate::error::{EmbeddingError, Result};

/// Token ids and the matching attention mask for one input string.
///
/// Both sequences always have the same length and every mask entry is
/// either `0` (padding, ignored by pooling) or `1` (a real token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBatch {
    ids: Vec<u32>,
    attention_mask: Vec<u32>,
}

impl TokenBatch {
    /// Create a token batch, validating the mask.
    pub fn new(ids: Vec<u32>, attention_mask: Vec<u32>) -> Result<Self> {
        if ids.len() != attention_mask.len() {
            return Err(EmbeddingError::Tokenization(format!(
                "attention mask has {} entries for {} token ids",
                attention_mask.len(),
                ids.len()
            )));
        }

        if let Some(bad) = attention_mask.iter().find(|m| **m > 1) {
            return Err(EmbeddingError::Tokenization(format!(
                "attention mask entries must be 0 or 1, got {bad}"
            )));
        }

        Ok(Self {
            ids,
            attention_mask,
        })
    }

    /// Create a batch in which every token is attended to.
    pub fn unmasked(ids: Vec<u32>) -> Self {
        let attention_mask = vec![1; ids.len()];
        Self {
            ids,
            attention_mask,
        }
    }

    /// Token ids, in order.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Attention mask, parallel to [`TokenBatch::ids`].
    pub fn attention_mask(&self) -> &[u32] {
        &self.attention_mask
    }

    /// Number of tokens, padding included.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the batch has no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of tokens the mask marks as real.
    pub fn attended(&self) -> usize {
        self.attention_mask.iter().filter(|m| **m == 1).count()
    }
}

/// Trait for tokenizers.
///
/// Implementations decide their own maximum-length policy and must document
/// it. Failures are reported as [`EmbeddingError::Tokenization`].
pub trait Tokenizer: Send + Sync {
    /// Encode `text` into token ids and an attention mask.
    fn tokenize(&self, text: &str) -> Result<TokenBatch>;
}

impl<T: Tokenizer + ?Sized> Tokenizer for std::sync::Arc<T> {
    fn tokenize(&self, text: &str) -> Result<TokenBatch> {
        (**self).tokenize(text)
    }
}

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfTokenizer;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use std::path::Path;

    use tokenizers::tokenizer::{TruncationDirection, TruncationParams, TruncationStrategy};
    use tracing::warn;

    use super::{TokenBatch, Tokenizer};
    use crate::DEFAULT_MAX_SEQUENCE_LENGTH;
    use crate::error::{EmbeddingError, Result};

    /// [`Tokenizer`] backed by a Hugging Face `tokenizer.json`.
    ///
    /// Inputs longer than `max_length` tokens are truncated from the right
    /// (special tokens included in the count). Truncation is not an error;
    /// it is logged at `warn` level.
    #[derive(Clone)]
    pub struct HfTokenizer {
        inner: tokenizers::Tokenizer,
        max_length: usize,
    }

    impl HfTokenizer {
        /// Load a tokenizer from a `tokenizer.json` file.
        pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
            let inner =
                tokenizers::Tokenizer::from_file(path).map_err(EmbeddingError::tokenization)?;
            Self::with_max_length(inner, DEFAULT_MAX_SEQUENCE_LENGTH)
        }

        /// Load a tokenizer from serialized JSON bytes.
        pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
            let inner =
                tokenizers::Tokenizer::from_bytes(bytes).map_err(EmbeddingError::tokenization)?;
            Self::with_max_length(inner, DEFAULT_MAX_SEQUENCE_LENGTH)
        }

        /// Wrap an already-built tokenizer, truncating at `max_length` tokens.
        pub fn with_max_length(mut inner: tokenizers::Tokenizer, max_length: usize) -> Result<Self> {
            inner
                .with_truncation(Some(TruncationParams {
                    max_length,
                    stride: 0,
                    strategy: TruncationStrategy::LongestFirst,
                    direction: TruncationDirection::Right,
                }))
                .map_err(EmbeddingError::tokenization)?;

            Ok(Self { inner, max_length })
        }

        /// The configured truncation length.
        pub fn max_length(&self) -> usize {
            self.max_length
        }
    }

    impl Tokenizer for HfTokenizer {
        fn tokenize(&self, text: &str) -> Result<TokenBatch> {
            let encoding = self
                .inner
                .encode(text, true)
                .map_err(EmbeddingError::tokenization)?;

            if !encoding.get_overflowing().is_empty() {
                warn!(
                    "Input of {} chars truncated to {} tokens",
                    text.len(),
                    self.max_length
                );
            }

            TokenBatch::new(
                encoding.get_ids().to_vec(),
                encoding.get_attention_mask().to_vec(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_batch_rejects_length_mismatch() {
        let err = TokenBatch::new(vec![1, 2, 3], vec![1, 1]).unwrap_err();
        assert!(matches!(err, EmbeddingError::Tokenization(_)));
    }

    #[test]
    fn test_token_batch_rejects_non_binary_mask() {
        let err = TokenBatch::new(vec![1, 2], vec![1, 2]).unwrap_err();
        assert!(matches!(err, EmbeddingError::Tokenization(_)));
    }

    #[test]
    fn test_token_batch_counts_attended_tokens() {
        let batch = TokenBatch::new(vec![101, 7592, 102, 0, 0], vec![1, 1, 1, 0, 0]).unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.attended(), 3);
    }

    #[test]
    fn test_unmasked_batch() {
        let batch = TokenBatch::unmasked(vec![101, 102]);
        assert_eq!(batch.attention_mask(), &[1, 1]);
        assert!(!batch.is_empty());
    }
}
