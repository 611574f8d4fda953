//! Configuration for the label suggestion service.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smart_embeddings::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_SIMILARITY};

use crate::error::{Result, SuggestionError};

/// Issue labels offered when no label list is configured.
pub const DEFAULT_LABELS: [&str; 12] = [
    "Bug",
    "Docs",
    "Enhancement",
    "Question",
    "UI (Android)",
    "UI (iOS)",
    "UI (Windows)",
    "UI (Mac)",
    "Performance",
    "Security",
    "Authentication",
    "Accessibility",
];

/// Configuration for the label suggestion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Labels that can be suggested, in tie-break order.
    pub labels: Vec<String>,

    /// Default query limits.
    pub query: QueryConfig,

    /// How label embeddings are held in memory.
    pub storage: StorageForm,

    /// Label embedding cache configuration.
    pub cache: CacheConfig,
}

impl SuggestionConfig {
    /// Create a configuration for the given labels with default values.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            query: QueryConfig::default(),
            storage: StorageForm::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }

    /// Set the storage form.
    pub fn with_storage(mut self, storage: StorageForm) -> Self {
        self.storage = storage;
        self
    }

    /// Set the cache configuration.
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Check the configuration for values the service cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(SuggestionError::Config(
                "at least one label is required".to_string(),
            ));
        }
        if self.query.max_results == 0 {
            return Err(SuggestionError::Config(
                "query.max_results must be at least 1".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(SuggestionError::Config(
                "cache.max_entries must be at least 1 when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS)
    }
}

/// Default limits applied to suggestion queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of suggestions to return.
    pub max_results: usize,

    /// Minimum cosine similarity (-1.0 to 1.0).
    pub min_similarity: f32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

/// In-memory form of the label embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageForm {
    /// Full-precision floats.
    Float,
    /// 8-bit components plus a scale.
    #[default]
    Quantized,
}

/// Configuration for the label embedding cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether label embeddings are cached at all.
    pub enabled: bool,

    /// File the cache is persisted to. `None` keeps it in memory.
    pub path: Option<PathBuf>,

    /// Maximum number of cached embeddings.
    pub max_entries: usize,
}

impl CacheConfig {
    /// A cache persisted at `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// A disabled cache.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            max_entries: 10000,
        }
    }
}
