//! Keyword embedding store.
//!
//! Holds one vector per vocabulary keyword and fills in only what is
//! missing. With a cache attached, new vectors are written back after each
//! call, including the ones computed before a provider failure.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    cache::CacheDir,
    embedding::{EmbeddingError, EmbeddingProvider, EmbeddingResult},
};

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Keyword -> vector for one model, keys kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMap {
    model_id: String,
    #[serde(with = "indexmap::map::serde_seq")]
    vectors: IndexMap<String, Vec<f32>>,
}

impl EmbeddingMap {
    pub fn new<S: Into<String>>(model_id: S) -> Self {
        Self {
            model_id: model_id.into(),
            vectors: IndexMap::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn insert(&mut self, keyword: String, vector: Vec<f32>) -> &mut Self {
        self.vectors.insert(keyword, vector);
        self.vectors.sort_keys();
        self
    }

    pub fn get(&self, keyword: &str) -> Option<&[f32]> {
        self.vectors.get(keyword).map(Vec::as_slice)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.vectors.contains_key(keyword)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.vectors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Keywords of `vocabulary` with no vector yet, first occurrence order.
    pub fn missing<'a, I>(&self, vocabulary: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let missing: IndexSet<&str> = vocabulary
            .into_iter()
            .filter(|keyword| !self.contains(keyword))
            .collect();
        missing.into_iter().collect()
    }

    /// Take entries this map lacks from `other`. Returns how many were added.
    fn merge_from(&mut self, other: EmbeddingMap) -> usize {
        let mut added = 0;
        for (keyword, vector) in other.vectors {
            if !self.vectors.contains_key(&keyword) {
                self.vectors.insert(keyword, vector);
                added += 1;
            }
        }
        if added > 0 {
            self.vectors.sort_keys();
        }
        added
    }
}

struct Persistence {
    cache: CacheDir,
    fingerprint: String,
}

/// Lazily computed keyword embeddings for one provider.
pub struct EmbeddingStore {
    provider: Arc<dyn EmbeddingProvider>,
    map: EmbeddingMap,
    batch_size: usize,
    persistence: Option<Persistence>,
}

impl EmbeddingStore {
    /// In-memory store.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        let map = EmbeddingMap::new(provider.model_name());
        Self {
            provider,
            map,
            batch_size: batch_size.max(1),
            persistence: None,
        }
    }

    /// Attach a cache. Vectors already cached for `fingerprint` and this
    /// provider's model are loaded right away.
    pub fn with_cache(mut self, cache: CacheDir, fingerprint: String) -> Self {
        if let Some(cached) = cache.load_embeddings(&fingerprint, self.provider.model_name()) {
            info!(keywords = cached.len(), "loaded cached embeddings");
            self.map.merge_from(cached);
        }
        self.persistence = Some(Persistence { cache, fingerprint });
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn map(&self) -> &EmbeddingMap {
        &self.map
    }

    pub fn into_map(self) -> EmbeddingMap {
        self.map
    }

    /// Make sure every keyword of `vocabulary` has a vector.
    ///
    /// Only missing keywords are sent to the provider, in batches. Calling
    /// this again with the same vocabulary does no work. On a provider
    /// error the vectors computed so far are kept (and persisted) and the
    /// error is returned.
    #[instrument(skip_all, fields(model = self.provider.model_name()))]
    pub fn ensure_embeddings<'a, I>(&mut self, vocabulary: I) -> EmbeddingResult<&EmbeddingMap>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let _guard = self.persistence.as_ref().map(|p| p.cache.lock());
        self.reload();

        let missing = self.map.missing(vocabulary);
        if missing.is_empty() {
            return Ok(&self.map);
        }
        info!(missing = missing.len(), batch_size = self.batch_size, "encoding new keywords");

        let mut added = 0usize;
        let mut failure = None;
        for batch in missing.chunks(self.batch_size) {
            match self.embed_checked(batch) {
                Ok(vectors) => {
                    for (keyword, vector) in batch.iter().zip(vectors) {
                        self.map.vectors.insert(keyword.to_string(), vector);
                    }
                    added += batch.len();
                }
                Err(e) => {
                    warn!(error = %e, done = added, total = missing.len(), "embedding batch failed");
                    failure = Some(e);
                    break;
                }
            }
        }
        if added > 0 {
            self.map.vectors.sort_keys();
            self.persist();
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(&self.map),
        }
    }

    fn embed_checked(&self, batch: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let vectors = self.provider.embed_batch(batch)?;
        if vectors.len() != batch.len() {
            return Err(EmbeddingError::Inference(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        let dim = self.provider.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                found: bad.len(),
            });
        }
        Ok(vectors)
    }

    /// Pick up entries another builder wrote since this store was opened.
    fn reload(&mut self) {
        if let Some(p) = &self.persistence {
            if let Some(on_disk) = p.cache.load_embeddings(&p.fingerprint, self.provider.model_name()) {
                self.map.merge_from(on_disk);
            }
        }
    }

    fn persist(&self) {
        if let Some(p) = &self.persistence {
            if let Err(e) = p.cache.store_embeddings(&p.fingerprint, &self.map) {
                warn!(error = %e, "failed to persist embeddings");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds `text` as `[len, 1.0]` and counts what it was asked for.
    struct CountingEmbedder {
        batches: AtomicUsize,
        texts: AtomicUsize,
        fail_after_batches: Option<usize>,
    }

    impl CountingEmbedder {
        fn new(fail_after_batches: Option<usize>) -> Self {
            Self {
                batches: AtomicUsize::new(0),
                texts: AtomicUsize::new(0),
                fail_after_batches,
            }
        }
    }

    impl EmbeddingProvider for CountingEmbedder {
        fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
            self.texts.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.chars().count() as f32, 1.0])
        }

        fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            let done = self.batches.fetch_add(1, Ordering::SeqCst);
            if self.fail_after_batches.is_some_and(|n| done >= n) {
                return Err(EmbeddingError::Inference("boom".to_string()));
            }
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn embeds_only_missing_keywords() {
        let provider = Arc::new(CountingEmbedder::new(None));
        let mut store = EmbeddingStore::new(provider.clone(), 2);

        store.ensure_embeddings(["toner", "serum", "vegan"]).unwrap();
        assert_eq!(provider.texts.load(Ordering::SeqCst), 3);
        assert_eq!(provider.batches.load(Ordering::SeqCst), 2);

        // idempotent
        store.ensure_embeddings(["toner", "serum", "vegan"]).unwrap();
        assert_eq!(provider.texts.load(Ordering::SeqCst), 3);

        store.ensure_embeddings(["toner", "cushion", "cushion"]).unwrap();
        assert_eq!(provider.texts.load(Ordering::SeqCst), 4);
        let keys: Vec<&str> = store.map().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["cushion", "serum", "toner", "vegan"]);
        assert_eq!(store.map().get("toner"), Some(&[5.0, 1.0][..]));
    }

    #[test]
    fn partial_results_survive_failure_and_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let provider = Arc::new(CountingEmbedder::new(Some(1)));
        let mut store = EmbeddingStore::new(provider.clone(), 2).with_cache(cache.clone(), "fp".to_string());

        let err = store.ensure_embeddings(["a", "b", "c", "d"]).unwrap_err();
        assert_eq!(err, EmbeddingError::Inference("boom".to_string()));
        assert_eq!(store.map().len(), 2);

        let on_disk = cache.load_embeddings("fp", "counting").unwrap();
        assert_eq!(on_disk.len(), 2);
        assert!(on_disk.contains("a") && on_disk.contains("b"));
    }

    #[test]
    fn cached_vectors_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());

        let first = Arc::new(CountingEmbedder::new(None));
        EmbeddingStore::new(first.clone(), 8)
            .with_cache(cache.clone(), "fp".to_string())
            .ensure_embeddings(["vegan", "toner"])
            .unwrap();
        assert_eq!(first.texts.load(Ordering::SeqCst), 2);

        let second = Arc::new(CountingEmbedder::new(None));
        let mut store = EmbeddingStore::new(second.clone(), 8).with_cache(cache.clone(), "fp".to_string());
        assert_eq!(store.map().len(), 2);
        store.ensure_embeddings(["vegan", "toner", "serum"]).unwrap();
        assert_eq!(second.texts.load(Ordering::SeqCst), 1);

        // different fingerprint starts from scratch
        let third = Arc::new(CountingEmbedder::new(None));
        let store = EmbeddingStore::new(third, 8).with_cache(cache, "other".to_string());
        assert!(store.map().is_empty());
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        struct Short;
        impl EmbeddingProvider for Short {
            fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
                Ok(vec![1.0])
            }
            fn dimension(&self) -> usize {
                3
            }
            fn model_name(&self) -> &str {
                "short"
            }
        }

        let mut store = EmbeddingStore::new(Arc::new(Short), 4);
        assert_eq!(
            store.ensure_embeddings(["x"]).unwrap_err(),
            EmbeddingError::DimensionMismatch { expected: 3, found: 1 }
        );
        assert!(store.map().is_empty());
    }
}
