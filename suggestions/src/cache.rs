//! Label embedding cache.
//!
//! Embedding the label set is the most expensive part of starting the
//! service. The cache remembers each (model, text) embedding and can persist
//! them as JSON, with every embedding stored as base64 of its little-endian
//! byte encoding (see `smart_embeddings::codec`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smart_embeddings::FloatEmbedding;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, SuggestionError};

/// Persisted form of one cached embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Model that produced the embedding.
    pub model: String,

    /// The text that was embedded.
    pub text: String,

    /// Base64 of `FloatEmbedding::to_bytes`.
    pub embedding: String,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,

    /// Insertion order, used for eviction.
    pub sequence: u64,
}

#[derive(Debug, Clone)]
struct Cached {
    embedding: FloatEmbedding,
    created_at: DateTime<Utc>,
    sequence: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    /// model -> text -> embedding
    models: HashMap<String, HashMap<String, Cached>>,
    next_sequence: u64,
}

impl CacheState {
    fn len(&self) -> usize {
        self.models.values().map(HashMap::len).sum()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .models
            .iter()
            .flat_map(|(model, texts)| {
                texts
                    .iter()
                    .map(move |(text, cached)| (cached.sequence, model, text))
            })
            .min_by_key(|(sequence, _, _)| *sequence)
            .map(|(_, model, text)| (model.clone(), text.clone()));

        if let Some((model, text)) = oldest {
            self.remove(&model, &text);
        }
    }

    fn remove(&mut self, model: &str, text: &str) -> bool {
        let Some(texts) = self.models.get_mut(model) else {
            return false;
        };
        let removed = texts.remove(text).is_some();
        if texts.is_empty() {
            self.models.remove(model);
        }
        removed
    }
}

/// Cache for embeddings to avoid recomputing labels.
pub struct EmbeddingCache {
    /// In-memory cache.
    state: RwLock<CacheState>,

    /// Path for persistent cache storage.
    cache_path: Option<PathBuf>,

    /// Maximum cache size.
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create a new in-memory cache.
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            cache_path: None,
            max_entries,
        }
    }

    /// Create a cache backed by `path`, loading it if the file exists.
    pub async fn with_persistence(path: impl AsRef<Path>, max_entries: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let cache = Self {
            state: RwLock::new(CacheState::default()),
            cache_path: Some(path.clone()),
            max_entries,
        };

        if fs::try_exists(&path).await? {
            cache.load().await?;
        }

        Ok(cache)
    }

    /// File the cache persists to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Get an embedding from the cache.
    pub async fn get(&self, text: &str, model: &str) -> Option<FloatEmbedding> {
        let state = self.state.read().await;
        state
            .models
            .get(model)
            .and_then(|texts| texts.get(text))
            .map(|cached| cached.embedding.clone())
    }

    /// Put an embedding in the cache, evicting the oldest entry when full.
    ///
    /// Nothing is written to disk until [`EmbeddingCache::save`] is called.
    pub async fn put(&self, text: &str, model: &str, embedding: FloatEmbedding) {
        let mut state = self.state.write().await;

        let exists = state
            .models
            .get(model)
            .is_some_and(|texts| texts.contains_key(text));
        if !exists && state.len() >= self.max_entries {
            state.evict_oldest();
        }

        let sequence = state.next_sequence;
        state.next_sequence = sequence.saturating_add(1);
        state
            .models
            .entry(model.to_string())
            .or_default()
            .insert(
                text.to_string(),
                Cached {
                    embedding,
                    created_at: Utc::now(),
                    sequence,
                },
            );
        debug!("Cached embedding for text (model: {model})");
    }

    /// Check if an embedding is cached.
    pub async fn contains(&self, text: &str, model: &str) -> bool {
        self.get(text, model).await.is_some()
    }

    /// Remove an embedding from the cache.
    pub async fn remove(&self, text: &str, model: &str) -> bool {
        self.state.write().await.remove(model, text)
    }

    /// Clear the entire cache.
    pub async fn clear(&self) {
        *self.state.write().await = CacheState::default();
        info!("Cleared embedding cache");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        let mut models: Vec<String> = state.models.keys().cloned().collect();
        models.sort();
        CacheStats {
            entries: state.len(),
            max_entries: self.max_entries,
            models,
        }
    }

    /// Save the cache to disk. Does nothing for an in-memory cache.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };

        let entries: Vec<CacheEntry> = {
            let state = self.state.read().await;
            let mut entries: Vec<CacheEntry> = state
                .models
                .iter()
                .flat_map(|(model, texts)| {
                    texts.iter().map(move |(text, cached)| CacheEntry {
                        model: model.clone(),
                        text: text.clone(),
                        embedding: STANDARD.encode(cached.embedding.to_bytes()),
                        created_at: cached.created_at,
                        sequence: cached.sequence,
                    })
                })
                .collect();
            entries.sort_by_key(|e| e.sequence);
            entries
        };
        let content = serde_json::to_string(&entries)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write then rename so a crash never leaves a truncated cache file.
        let staging = path.with_extension("tmp");
        fs::write(&staging, content).await?;
        fs::rename(&staging, path).await?;

        debug!("Saved {} cache entries to {}", entries.len(), path.display());
        Ok(())
    }

    /// Load cache from disk.
    async fn load(&self) -> Result<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };

        let content = fs::read_to_string(path).await?;
        let entries: Vec<CacheEntry> = serde_json::from_str(&content)?;

        let mut state = self.state.write().await;
        for entry in entries {
            let bytes = STANDARD.decode(&entry.embedding).map_err(|e| {
                SuggestionError::Cache(format!("bad embedding for {:?}: {e}", entry.text))
            })?;
            let embedding = FloatEmbedding::from_bytes(&bytes)?;

            state.next_sequence = state.next_sequence.max(entry.sequence.saturating_add(1));
            state.models.entry(entry.model).or_default().insert(
                entry.text,
                Cached {
                    embedding,
                    created_at: entry.created_at,
                    sequence: entry.sequence,
                },
            );
        }

        while state.len() > self.max_entries {
            state.evict_oldest();
        }

        info!(
            "Loaded {} cache entries from {}",
            state.len(),
            path.display()
        );
        Ok(())
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Maximum cache size.
    pub max_entries: usize,

    /// Models with cached embeddings, sorted.
    pub models: Vec<String>,
}
