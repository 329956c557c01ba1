//! Embedding provider abstraction.
//!
//! A provider maps a keyword to a fixed-length vector. The store and the
//! semantic resolver only ever see this trait, so the offline hashing
//! embedder, the fastembed model and test stubs are interchangeable.

pub mod store;

#[cfg(feature = "fastembed")]
pub mod fastembed;

use blake3::Hasher;
use thiserror::Error;

use crate::utils::math::l2_normalize;

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    /// The provider cannot be used at all (no model, no backend)
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// Invalid input text (e.g. empty)
    #[error("invalid input text: {0}")]
    InvalidInput(String),

    /// The model failed while encoding
    #[error("inference failed: {0}")]
    Inference(String),

    /// A vector came back with the wrong length
    #[error("expected dimension {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for keyword embedding providers.
///
/// Implementations must be deterministic for a given model: the same text
/// always maps to the same vector, which is what makes cached vectors
/// reusable across runs.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Embed several texts, results in input order.
    ///
    /// The default calls `embed` for each text; providers with a real batch
    /// path should override it.
    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model. Cached embeddings are only reused
    /// for the same identifier.
    fn model_name(&self) -> &str;
}

pub const DEFAULT_HASHING_DIM: usize = 256;

/// Deterministic offline embedder.
///
/// Feature-hashes character n-grams (with word boundary markers) into a
/// signed, L2-normalized vector. Works on any script without tokenization,
/// so spelling variants and shared stems land close together. It does not
/// know that two different words mean the same thing; that is what the
/// alias table and a real model are for.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    ngram: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize, ngram: usize) -> Self {
        let dim = dim.max(1);
        let ngram = ngram.max(1);
        Self {
            dim,
            ngram,
            model_name: format!("hashing-char{ngram}-d{dim}"),
        }
    }

    fn bucket(&self, gram: &str) -> (usize, f32) {
        let mut h = Hasher::new();
        h.update(gram.as_bytes());
        let hash = h.finalize();
        let bytes = hash.as_bytes();
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        let idx = (u64::from_le_bytes(raw) % self.dim as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIM, 3)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("text cannot be empty".to_string()));
        }

        let mut vec = vec![0.0f32; self.dim];
        for word in text.split_whitespace() {
            let chars: Vec<char> = std::iter::once('<')
                .chain(word.chars())
                .chain(std::iter::once('>'))
                .collect();
            let n = self.ngram.min(chars.len());
            for window in chars.windows(n) {
                let gram: String = window.iter().collect();
                let (idx, sign) = self.bucket(&gram);
                vec[idx] += sign;
            }
        }
        l2_normalize(&mut vec);
        Ok(vec)
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Provider that always fails. Ranking then runs on lexical matches only.
#[derive(Debug, Clone)]
pub struct UnavailableEmbedder {
    reason: String,
}

impl UnavailableEmbedder {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self { reason: reason.into() }
    }
}

impl EmbeddingProvider for UnavailableEmbedder {
    fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
        Err(EmbeddingError::Unavailable(self.reason.clone()))
    }

    fn dimension(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::cosine_similarity;

    #[test]
    fn hashing_embedder_is_deterministic_and_normalized() {
        let e = HashingEmbedder::default();
        let a = e.embed("Vegan").unwrap();
        let b = e.embed("vegan").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASHING_DIM);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_ngrams_score_higher() {
        let e = HashingEmbedder::default();
        let base = e.embed("moisturizer").unwrap();
        let close = e.embed("moisturizers").unwrap();
        let far = e.embed("sunscreen").unwrap();
        assert!(cosine_similarity(&base, &close) > cosine_similarity(&base, &far));
    }

    #[test]
    fn handles_non_latin_and_short_words() {
        let e = HashingEmbedder::default();
        assert!(e.embed("비건").is_ok());
        assert!(e.embed("a").is_ok());
        assert!(matches!(e.embed("   "), Err(EmbeddingError::InvalidInput(_))));
    }

    #[test]
    fn default_batch_keeps_order() {
        let e = HashingEmbedder::new(32, 2);
        let batch = e.embed_batch(&["toner", "serum"]).unwrap();
        assert_eq!(batch[0], e.embed("toner").unwrap());
        assert_eq!(batch[1], e.embed("serum").unwrap());
        assert_eq!(e.model_name(), "hashing-char2-d32");
    }

    #[test]
    fn unavailable_always_fails() {
        let e = UnavailableEmbedder::new("no model");
        assert!(matches!(e.embed("vegan"), Err(EmbeddingError::Unavailable(_))));
        assert!(e.embed_batch(&["a"]).is_err());
    }
}
