//! Local multilingual sentence-embedding model via fastembed.

use std::{
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// fastembed-backed provider.
///
/// Defaults to the multilingual paraphrase MiniLM model, which maps
/// keywords in different languages into one space.
#[derive(Clone)]
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Load (downloading on first use) `model`, caching files under `cache_dir`.
    pub fn new(model: Option<EmbeddingModel>, cache_dir: Option<PathBuf>) -> EmbeddingResult<Self> {
        let model_type = model.unwrap_or(EmbeddingModel::ParaphraseMLMiniLML12V2);
        let model_name = format!("{:?}", model_type);
        let dimension = match model_type {
            EmbeddingModel::ParaphraseMLMpnetBaseV2 => 768,
            EmbeddingModel::BGEBaseENV15 => 768,
            EmbeddingModel::BGELargeENV15 => 1024,
            _ => 384,
        };

        let mut init_options = InitOptions::new(model_type);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }
        let text_embedding = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::Unavailable(format!("failed to initialize fastembed model: {e}")))?;
        info!(model = %model_name, dimension, "loaded embedding model");

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name,
            dimension,
        })
    }

    fn check(&self, vectors: Vec<Vec<f32>>) -> EmbeddingResult<Vec<Vec<f32>>> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                found: bad.len(),
            });
        }
        Ok(vectors)
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("no embedding generated".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput("all texts must be non-empty".to_string()));
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Inference("model lock poisoned".to_string()))?;
        let inputs: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let vectors = model
            .embed(inputs, None)
            .map_err(|e| EmbeddingError::Inference(format!("batch embedding failed: {e}")))?;
        self.check(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}
