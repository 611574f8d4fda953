//! Top-K similarity search over a candidate collection.
//!
//! Search is an exact linear scan: every candidate is scored against the
//! query, those below the threshold are dropped, and the rest are ranked by
//! descending score. Ties keep the candidates' input order.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{AnyEmbedding, Embedding, FloatEmbedding, similarity};
use crate::error::{EmbeddingError, Result};
use crate::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_SIMILARITY};

/// What a query is compared with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryInput {
    /// Raw text, embedded by an [`Embedder`](crate::Embedder) before searching.
    Text(String),
    /// A precomputed embedding.
    Embedding(AnyEmbedding),
}

/// Parameters of a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityQuery {
    /// Query text or embedding.
    pub input: QueryInput,

    /// Maximum number of results. Must be at least 1.
    pub max_results: usize,

    /// Minimum similarity a candidate needs to be returned. Not range-checked:
    /// a very low value yields an unfiltered ranking.
    pub min_similarity: f32,
}

impl SimilarityQuery {
    /// Create a text query with default limits.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(QueryInput::Text(text.into()))
    }

    /// Create a query from a precomputed embedding with default limits.
    pub fn embedding(embedding: impl Into<AnyEmbedding>) -> Self {
        Self::new(QueryInput::Embedding(embedding.into()))
    }

    fn new(input: QueryInput) -> Self {
        Self {
            input,
            max_results: DEFAULT_MAX_RESULTS,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }

    /// Set the maximum number of results.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the minimum similarity threshold.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

/// A labelled embedding that can be returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityCandidate<L, E = FloatEmbedding> {
    /// Caller-supplied identifier, e.g. a category name.
    pub label: L,

    /// The candidate's embedding.
    pub embedding: E,
}

impl<L, E> SimilarityCandidate<L, E> {
    /// Pair a label with an embedding.
    pub fn new(label: L, embedding: E) -> Self {
        Self { label, embedding }
    }
}

/// A similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult<L> {
    /// Label of the matched candidate.
    pub label: L,

    /// Cosine similarity to the query.
    pub score: f32,
}

/// Search `candidates` for the entries closest to `query`.
///
/// Text queries cannot be resolved here and fail with
/// [`EmbeddingError::InvalidQuery`]; use
/// [`Embedder::search`](crate::Embedder::search) for those.
pub fn search<L, E>(
    query: &SimilarityQuery,
    candidates: &[SimilarityCandidate<L, E>],
) -> Result<Vec<SimilarityResult<L>>>
where
    L: Clone,
    E: Embedding,
{
    match &query.input {
        QueryInput::Embedding(embedding) => search_embedding(
            embedding,
            query.max_results,
            query.min_similarity,
            candidates,
        ),
        QueryInput::Text(_) => Err(EmbeddingError::InvalidQuery(
            "text queries must be embedded before searching".to_string(),
        )),
    }
}

/// Rank `candidates` against an already-embedded query.
///
/// Returns at most `max_results` entries, all scoring at least
/// `min_similarity`, sorted by descending score with ties in input order.
pub fn search_embedding<Q, L, E>(
    query: &Q,
    max_results: usize,
    min_similarity: f32,
    candidates: &[SimilarityCandidate<L, E>],
) -> Result<Vec<SimilarityResult<L>>>
where
    Q: Embedding + ?Sized,
    L: Clone,
    E: Embedding,
{
    if max_results == 0 {
        return Err(EmbeddingError::InvalidQuery(
            "max_results must be at least 1".to_string(),
        ));
    }

    let mut scores: Vec<(usize, OrderedFloat<f32>)> = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let score = similarity(query, &candidate.embedding)?;
        if score >= min_similarity {
            scores.push((index, OrderedFloat(score)));
        }
    }

    debug!(
        "Scanned {} candidates, {} at or above {min_similarity}",
        candidates.len(),
        scores.len()
    );

    // Stable: equal scores stay in candidate order.
    scores.sort_by_key(|(_, score)| Reverse(*score));

    let results = scores
        .into_iter()
        .take(max_results)
        .map(|(index, score)| SimilarityResult {
            label: candidates[index].label.clone(),
            score: score.0,
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidates() -> Vec<SimilarityCandidate<String>> {
        vec![
            SimilarityCandidate::new("a".to_string(), FloatEmbedding::new(vec![1.0, 0.0, 0.0])),
            SimilarityCandidate::new("b".to_string(), FloatEmbedding::new(vec![0.0, 1.0, 0.0])),
            SimilarityCandidate::new("c".to_string(), FloatEmbedding::new(vec![0.7, 0.7, 0.0])),
        ]
    }

    fn labels(results: &[SimilarityResult<String>]) -> Vec<&str> {
        results.iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn test_find_top_k() {
        let query = FloatEmbedding::new(vec![1.0, 0.0, 0.0]);
        let results = search_embedding(&query, 2, 0.0, &candidates()).unwrap();
        assert_eq!(labels(&results), vec!["a", "c"]);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_threshold_filters() {
        let query = FloatEmbedding::new(vec![1.0, 0.0, 0.0]);
        let results = search_embedding(&query, 10, 0.5, &candidates()).unwrap();
        assert_eq!(labels(&results), vec!["a", "c"]);
        assert!(results.iter().all(|r| r.score >= 0.5));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let same = FloatEmbedding::new(vec![0.0, 1.0]);
        let candidates = vec![
            SimilarityCandidate::new(1, same.clone()),
            SimilarityCandidate::new(2, FloatEmbedding::new(vec![1.0, 0.0])),
            SimilarityCandidate::new(3, same.clone()),
            SimilarityCandidate::new(4, same),
        ];
        let query = FloatEmbedding::new(vec![0.0, 2.0]);
        let results = search_embedding(&query, 10, -1.0, &candidates).unwrap();
        let order: Vec<i32> = results.iter().map(|r| r.label).collect();
        assert_eq!(order, vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_empty_candidates() {
        let query = FloatEmbedding::new(vec![1.0, 0.0, 0.0]);
        let empty: Vec<SimilarityCandidate<String>> = Vec::new();
        assert_eq!(search_embedding(&query, 3, 0.5, &empty).unwrap(), Vec::new());
    }

    #[test]
    fn test_threshold_above_best_score() {
        let query = FloatEmbedding::new(vec![0.5, 0.5, 0.1]);
        let results = search_embedding(&query, 3, 0.999, &candidates()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_max_results_is_invalid() {
        let query = SimilarityQuery::embedding(FloatEmbedding::new(vec![1.0, 0.0, 0.0]))
            .with_max_results(0);
        assert!(matches!(
            search(&query, &candidates()),
            Err(EmbeddingError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_text_query_needs_embedder() {
        let query = SimilarityQuery::text("hello");
        assert!(matches!(
            search(&query, &candidates()),
            Err(EmbeddingError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_query_defaults() {
        let query = SimilarityQuery::text("hello");
        assert_eq!(query.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(query.min_similarity, DEFAULT_MIN_SIMILARITY);
    }

    #[test]
    fn test_quantized_query_against_float_candidates() {
        let query = FloatEmbedding::new(vec![0.9, 0.1, 0.0]).quantize();
        let q = SimilarityQuery::embedding(query).with_min_similarity(0.0);
        let results = search(&q, &candidates()).unwrap();
        assert_eq!(results[0].label, "a");
    }

    #[test]
    fn test_dimension_mismatch_fails() {
        let query = FloatEmbedding::new(vec![1.0, 0.0]);
        assert!(matches!(
            search_embedding(&query, 3, 0.0, &candidates()),
            Err(EmbeddingError::DimensionMismatch { .. })
        ));
    }
}
