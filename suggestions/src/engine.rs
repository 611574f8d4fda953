//! Label suggestion engine.

use std::sync::Arc;

use smart_embeddings::{
    AnyEmbedding, CandidateSet, Embedder, FloatEmbedding, ModelRunner, SimilarityCandidate,
    SimilarityQuery, SimilarityResult, Tokenizer, quantize,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::EmbeddingCache;
use crate::config::{StorageForm, SuggestionConfig};
use crate::error::{Result, SuggestionError};

/// A suggested label and its similarity to the input text.
pub type Suggestion = SimilarityResult<String>;

/// The label set searched by a [`LabelSuggester`].
pub type LabelSet = CandidateSet<String, AnyEmbedding>;

/// Suggests labels for free text by comparing it with precomputed label
/// embeddings.
///
/// The label set is built once, on construction, and is immutable afterwards;
/// [`LabelSuggester::replace_labels`] builds a new set and swaps it in.
/// Model calls run on tokio's blocking pool.
pub struct LabelSuggester<T, M> {
    /// Configuration.
    config: SuggestionConfig,

    /// Shared embedding pipeline.
    embedder: Arc<Embedder<T, M>>,

    /// Current label set.
    labels: RwLock<LabelSet>,

    /// Label embedding cache.
    cache: Option<EmbeddingCache>,
}

impl<T, M> LabelSuggester<T, M>
where
    T: Tokenizer + 'static,
    M: ModelRunner + 'static,
{
    /// Validate `config`, open the cache and embed the configured labels.
    pub async fn new(config: SuggestionConfig, embedder: Arc<Embedder<T, M>>) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing label suggester with {} labels (model: {})",
            config.labels.len(),
            embedder.model_id()
        );

        let cache = if config.cache.enabled {
            Some(match &config.cache.path {
                Some(path) => {
                    EmbeddingCache::with_persistence(path, config.cache.max_entries).await?
                }
                None => EmbeddingCache::new(config.cache.max_entries),
            })
        } else {
            None
        };

        let labels = build_label_set(
            &embedder,
            cache.as_ref(),
            config.storage,
            config.labels.clone(),
        )
        .await?;

        Ok(Self {
            config,
            embedder,
            labels: RwLock::new(labels),
            cache,
        })
    }

    /// Suggest labels using the configured limits.
    pub async fn suggest(&self, text: &str) -> Result<Vec<Suggestion>> {
        self.suggest_with(
            text,
            self.config.query.max_results,
            self.config.query.min_similarity,
        )
        .await
    }

    /// Suggest at most `max_results` labels scoring at least `min_similarity`.
    pub async fn suggest_with(
        &self,
        text: &str,
        max_results: usize,
        min_similarity: f32,
    ) -> Result<Vec<Suggestion>> {
        let query = SimilarityQuery::text(text)
            .with_max_results(max_results)
            .with_min_similarity(min_similarity);

        let labels = self.labels.read().await.clone();
        let embedder = Arc::clone(&self.embedder);
        let suggestions =
            tokio::task::spawn_blocking(move || embedder.search(&query, labels.as_slice()))
                .await??;

        debug!("Suggested {} labels", suggestions.len());
        Ok(suggestions)
    }

    /// Embed a new label list and make it the active set.
    ///
    /// Searches already running keep using the previous set.
    pub async fn replace_labels(&self, labels: Vec<String>) -> Result<()> {
        let set =
            build_label_set(&self.embedder, self.cache.as_ref(), self.config.storage, labels)
                .await?;
        let count = set.len();
        *self.labels.write().await = set;
        info!("Replaced label set with {count} labels");
        Ok(())
    }

    /// The active labels, in order.
    pub async fn labels(&self) -> Vec<String> {
        self.labels.read().await.labels().cloned().collect()
    }

    /// Snapshot of the active label set.
    pub async fn label_set(&self) -> LabelSet {
        self.labels.read().await.clone()
    }

    /// The configuration this suggester was built with.
    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    /// The label embedding cache, if enabled.
    pub fn cache(&self) -> Option<&EmbeddingCache> {
        self.cache.as_ref()
    }
}

/// Embed `labels`, reusing cached embeddings, and assemble them into a set.
async fn build_label_set<T, M>(
    embedder: &Arc<Embedder<T, M>>,
    cache: Option<&EmbeddingCache>,
    storage: StorageForm,
    labels: Vec<String>,
) -> Result<LabelSet>
where
    T: Tokenizer + 'static,
    M: ModelRunner + 'static,
{
    let model = embedder.model_id().to_string();

    let mut embeddings: Vec<Option<FloatEmbedding>> = Vec::with_capacity(labels.len());
    for label in &labels {
        let cached = match cache {
            Some(cache) => cache.get(label, &model).await,
            None => None,
        };
        embeddings.push(cached);
    }

    let missing: Vec<String> = labels
        .iter()
        .zip(&embeddings)
        .filter(|(_, cached)| cached.is_none())
        .map(|(label, _)| label.clone())
        .collect();
    debug!(
        "{} of {} label embeddings cached",
        labels.len() - missing.len(),
        labels.len()
    );

    if !missing.is_empty() {
        let worker = Arc::clone(embedder);
        let texts = missing.clone();
        let computed = tokio::task::spawn_blocking(move || worker.embed_batch(&texts)).await??;

        if let Some(cache) = cache {
            for (label, embedding) in missing.iter().zip(&computed) {
                cache.put(label, &model, embedding.clone()).await;
            }
            cache.save().await?;
        }

        let mut computed = computed.into_iter();
        for slot in embeddings.iter_mut().filter(|slot| slot.is_none()) {
            *slot = computed.next();
        }
    }

    let candidates = labels
        .into_iter()
        .zip(embeddings)
        .map(|(label, embedding)| {
            let embedding = embedding.ok_or_else(|| {
                SuggestionError::Cache(format!("no embedding computed for label {label:?}"))
            })?;
            let stored = match storage {
                StorageForm::Float => AnyEmbedding::Float(embedding),
                StorageForm::Quantized => AnyEmbedding::Quantized(quantize(&embedding)),
            };
            Ok(SimilarityCandidate::new(label, stored))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CandidateSet::new(embedder.dimension(), candidates)?)
}
