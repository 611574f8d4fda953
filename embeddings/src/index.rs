//! Immutable candidate collections.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::{Embedding, FloatEmbedding, QuantizedEmbedding, quantize};
use crate::error::{EmbeddingError, Result};
use crate::search::{SimilarityCandidate, SimilarityQuery, SimilarityResult, search};

/// A read-only collection of labelled embeddings of one dimension.
///
/// The dimension of every candidate is checked once, at construction, and the
/// collection is never mutated afterwards. Clones share storage, so a set
/// built at startup can be handed to any number of concurrent searches. To
/// change the candidates, build a new set and swap it in.
#[derive(Debug)]
pub struct CandidateSet<L, E = FloatEmbedding> {
    candidates: Arc<[SimilarityCandidate<L, E>]>,
    dimension: usize,
}

impl<L, E> Clone for CandidateSet<L, E> {
    fn clone(&self) -> Self {
        Self {
            candidates: Arc::clone(&self.candidates),
            dimension: self.dimension,
        }
    }
}

impl<L, E: Embedding> CandidateSet<L, E> {
    /// Build a set, requiring every candidate to have `dimension` components.
    pub fn new(dimension: usize, candidates: Vec<SimilarityCandidate<L, E>>) -> Result<Self> {
        for candidate in &candidates {
            EmbeddingError::check_dimension(dimension, candidate.embedding.dimension())?;
        }

        debug!(
            "Built candidate set of {} entries with dimension {dimension}",
            candidates.len()
        );

        Ok(Self {
            candidates: candidates.into(),
            dimension,
        })
    }

    /// Dimension shared by every candidate.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the set has no candidates.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates in insertion order.
    pub fn as_slice(&self) -> &[SimilarityCandidate<L, E>] {
        &self.candidates
    }

    /// Iterate over the labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.candidates.iter().map(|c| &c.label)
    }
}

impl<L: Clone, E: Embedding> CandidateSet<L, E> {
    /// Run a search against this set.
    pub fn search(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityResult<L>>> {
        search(query, &self.candidates)
    }
}

impl<L: Clone> CandidateSet<L, FloatEmbedding> {
    /// Copy of this set with every embedding quantized to 8 bits.
    pub fn quantized(&self) -> CandidateSet<L, QuantizedEmbedding> {
        let candidates: Vec<_> = self
            .candidates
            .iter()
            .map(|c| SimilarityCandidate::new(c.label.clone(), quantize(&c.embedding)))
            .collect();

        CandidateSet {
            candidates: candidates.into(),
            dimension: self.dimension,
        }
    }
}
