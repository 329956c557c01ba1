//! Runtime configuration.

use std::{env, path::PathBuf, sync::Arc};

use tracing::warn;

use crate::{
    embedding::{store::DEFAULT_BATCH_SIZE, EmbeddingProvider, HashingEmbedder},
    resolver::DEFAULT_THRESHOLD,
};

pub const DEFAULT_MEMO_CAPACITY: usize = 1024;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Offline hashing embedder.
pub const MODEL_HASHING: &str = "hashing";
/// Multilingual paraphrase MiniLM, needs the `fastembed` feature.
pub const MODEL_MULTILINGUAL: &str = "multilingual";

#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderConfig {
    /// One `<country>.csv` per country.
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Minimum cosine similarity for a semantic match.
    pub threshold: f32,
    /// Entries kept by the keyword normalization memo.
    pub memo_capacity: usize,
    /// Keywords per embedding provider call.
    pub batch_size: usize,
    /// Which embedding model to use, see [`RecommenderConfig::provider`].
    pub model_id: String,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            threshold: DEFAULT_THRESHOLD,
            memo_capacity: DEFAULT_MEMO_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            model_id: default_model().to_string(),
        }
    }
}

impl RecommenderConfig {
    /// Defaults overridden by `RECOMMENDER_DATA_DIR`, `RECOMMENDER_CACHE_DIR`,
    /// `RECOMMENDER_THRESHOLD` and `RECOMMENDER_MODEL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup("RECOMMENDER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RECOMMENDER_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("RECOMMENDER_THRESHOLD") {
            match raw.trim().parse::<f32>() {
                Ok(t) if t.is_finite() => config.threshold = t,
                _ => warn!(value = %raw, "ignoring invalid RECOMMENDER_THRESHOLD"),
            }
        }
        if let Some(model) = lookup("RECOMMENDER_MODEL") {
            config.model_id = model.trim().to_lowercase();
        }
        config
    }

    /// Build the embedding provider named by `model_id`.
    ///
    /// Falls back to the hashing embedder when the requested model is
    /// unknown or cannot be loaded.
    pub fn provider(&self) -> Arc<dyn EmbeddingProvider> {
        match self.model_id.as_str() {
            MODEL_HASHING => Arc::new(HashingEmbedder::default()),
            MODEL_MULTILINGUAL => self.multilingual_provider(),
            other => {
                warn!(model = %other, "unknown embedding model, using hashing embedder");
                Arc::new(HashingEmbedder::default())
            }
        }
    }

    #[cfg(feature = "fastembed")]
    fn multilingual_provider(&self) -> Arc<dyn EmbeddingProvider> {
        use crate::embedding::fastembed::FastEmbedProvider;
        match FastEmbedProvider::new(None, Some(self.cache_dir.join("models"))) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                warn!(error = %e, "multilingual model unavailable, using hashing embedder");
                Arc::new(HashingEmbedder::default())
            }
        }
    }

    #[cfg(not(feature = "fastembed"))]
    fn multilingual_provider(&self) -> Arc<dyn EmbeddingProvider> {
        warn!("built without the fastembed feature, using hashing embedder");
        Arc::new(HashingEmbedder::default())
    }
}

fn default_model() -> &'static str {
    if cfg!(feature = "fastembed") {
        MODEL_MULTILINGUAL
    } else {
        MODEL_HASHING
    }
}
