//! Text to embedding pipeline.
//!
//! ```text
//! text ──► Tokenizer ──► TokenBatch ──► ModelRunner ──► ActivationMatrix ──► sum_pool ──► FloatEmbedding
//! ```

use tracing::{debug, trace};

use crate::embedding::{Embedding, FloatEmbedding, QuantizedEmbedding, quantize};
use crate::error::{EmbeddingError, Result};
use crate::index::CandidateSet;
use crate::model::{ActivationMatrix, ModelRunner};
use crate::pooling::sum_pool;
use crate::search::{
    QueryInput, SimilarityCandidate, SimilarityQuery, SimilarityResult, search_embedding,
};
use crate::tokenizer::{TokenBatch, Tokenizer};

/// Computes embeddings by chaining a [`Tokenizer`], a [`ModelRunner`] and sum
/// pooling.
///
/// The embedder holds no state besides the two adapters. Adapter failures are
/// returned unchanged; there is no retry or fallback.
#[derive(Debug, Clone)]
pub struct Embedder<T, M> {
    tokenizer: T,
    model: M,
}

impl<T: Tokenizer, M: ModelRunner> Embedder<T, M> {
    /// Create an embedder from its two adapters.
    pub fn new(tokenizer: T, model: M) -> Self {
        Self { tokenizer, model }
    }

    /// Dimension of every embedding this embedder produces.
    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    /// Identifier of the underlying model.
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// The tokenizer adapter.
    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// The model runner adapter.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Embed a single string. The empty string is valid input.
    pub fn embed(&self, text: &str) -> Result<FloatEmbedding> {
        let batch = self.tokenizer.tokenize(text)?;
        trace!("Tokenized {} chars into {} tokens", text.len(), batch.len());

        let activations = self.model.run(batch.ids(), batch.attention_mask())?;
        self.pool(&batch, &activations)
    }

    /// Embed a single string and quantize the result.
    pub fn embed_quantized(&self, text: &str) -> Result<QuantizedEmbedding> {
        Ok(quantize(&self.embed(text)?))
    }

    /// Embed several strings, returning one embedding per input in input order.
    ///
    /// Equivalent to calling [`Embedder::embed`] on each string, but lets the
    /// model runner process the token sequences together.
    pub fn embed_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<FloatEmbedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches = texts
            .iter()
            .map(|text| self.tokenizer.tokenize(text.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Embedding batch of {} texts with model: {}",
            batches.len(),
            self.model_id()
        );

        let activations = self.model.run_batch(&batches)?;
        if activations.len() != batches.len() {
            return Err(EmbeddingError::Inference(format!(
                "model returned {} activation matrices for {} inputs",
                activations.len(),
                batches.len()
            )));
        }

        batches
            .iter()
            .zip(&activations)
            .map(|(batch, matrix)| self.pool(batch, matrix))
            .collect()
    }

    /// Embed a list of labels into a candidate set, keeping their order.
    pub fn embed_range<L: AsRef<str>>(&self, labels: Vec<L>) -> Result<CandidateSet<L>> {
        let embeddings = self.embed_batch(&labels)?;
        let candidates = labels
            .into_iter()
            .zip(embeddings)
            .map(|(label, embedding)| SimilarityCandidate::new(label, embedding))
            .collect();
        CandidateSet::new(self.dimension(), candidates)
    }

    /// Like [`Embedder::embed_range`], storing 8-bit embeddings.
    pub fn embed_range_quantized<L: AsRef<str>>(
        &self,
        labels: Vec<L>,
    ) -> Result<CandidateSet<L, QuantizedEmbedding>> {
        let embeddings = self.embed_batch(&labels)?;
        let candidates = labels
            .into_iter()
            .zip(embeddings)
            .map(|(label, embedding)| SimilarityCandidate::new(label, quantize(&embedding)))
            .collect();
        CandidateSet::new(self.dimension(), candidates)
    }

    /// Search `candidates`, embedding the query first if it is text.
    pub fn search<L, E>(
        &self,
        query: &SimilarityQuery,
        candidates: &[SimilarityCandidate<L, E>],
    ) -> Result<Vec<SimilarityResult<L>>>
    where
        L: Clone,
        E: Embedding,
    {
        if query.max_results == 0 {
            return Err(EmbeddingError::InvalidQuery(
                "max_results must be at least 1".to_string(),
            ));
        }

        match &query.input {
            QueryInput::Text(text) => {
                let embedding = self.embed(text)?;
                search_embedding(
                    &embedding,
                    query.max_results,
                    query.min_similarity,
                    candidates,
                )
            }
            QueryInput::Embedding(embedding) => search_embedding(
                embedding,
                query.max_results,
                query.min_similarity,
                candidates,
            ),
        }
    }

    /// Labels of the closest candidates, best first.
    pub fn find_closest<L, E>(
        &self,
        query: &SimilarityQuery,
        candidates: &[SimilarityCandidate<L, E>],
    ) -> Result<Vec<L>>
    where
        L: Clone,
        E: Embedding,
    {
        Ok(self
            .search(query, candidates)?
            .into_iter()
            .map(|result| result.label)
            .collect())
    }

    fn pool(&self, batch: &TokenBatch, activations: &ActivationMatrix) -> Result<FloatEmbedding> {
        sum_pool(activations, batch.attention_mask(), self.dimension())
    }
}
