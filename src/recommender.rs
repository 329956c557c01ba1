//! Index construction and the request-facing recommendation API.
//!
//! [`build_index`] aggregates the source data, loads or fits the lexical
//! index, fills in missing keyword embeddings, and returns an immutable
//! [`RecommenderIndex`]. The handle is `Send + Sync`; share it (e.g. in an
//! `Arc`) and call [`RecommenderIndex::recommend`] from any thread.

use std::{fmt, sync::Arc};

use tracing::{info, instrument, warn};

use crate::{
    aggregate::{aggregate, CountrySource},
    cache::{fingerprint, table_fingerprint, CacheDir},
    config::RecommenderConfig,
    country::Country,
    embedding::{
        store::{EmbeddingMap, EmbeddingStore},
        EmbeddingError, EmbeddingProvider,
    },
    error::{DataError, RecommenderError, Result},
    keyword::KeywordNormalizer,
    ranking::{positive_only, rank, Recommendation},
    resolver::{Resolution, SemanticResolver},
    vectorizer::{serde::LexicalIndexData, LexicalIndex},
};

/// Built lexical index plus keyword embeddings.
pub struct RecommenderIndex {
    lexical: LexicalIndex,
    embeddings: EmbeddingMap,
    provider: Arc<dyn EmbeddingProvider>,
    normalizer: KeywordNormalizer,
    threshold: f32,
    data_warnings: Vec<DataError>,
    embedding_warning: Option<EmbeddingError>,
}

impl RecommenderIndex {
    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn embeddings(&self) -> &EmbeddingMap {
        &self.embeddings
    }

    pub fn countries(&self) -> &[Country] {
        self.lexical.countries()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Countries skipped while loading.
    pub fn data_warnings(&self) -> &[DataError] {
        &self.data_warnings
    }

    /// Set when the embedding provider failed during the build; semantic
    /// matching then only covers keywords that got a vector.
    pub fn embedding_warning(&self) -> Option<&EmbeddingError> {
        self.embedding_warning.as_ref()
    }

    pub fn resolver(&self) -> SemanticResolver<'_> {
        SemanticResolver::new(
            &self.normalizer,
            self.lexical.vocabulary(),
            &self.embeddings,
            self.provider.as_ref(),
            self.threshold,
        )
    }

    pub fn resolve(&self, keyword: &str) -> Resolution {
        self.resolver().resolve(keyword)
    }

    /// Rank countries for `keywords`. See [`rank`].
    pub fn recommend<S: AsRef<str>>(&self, keywords: &[S], top_n: usize, with_scores: bool) -> Vec<Recommendation> {
        rank(keywords, &self.lexical, &self.resolver(), top_n, with_scores)
    }

    /// Like [`recommend`](Self::recommend) with scores, keeping only
    /// positive ones.
    pub fn recommend_positive<S: AsRef<str>>(&self, keywords: &[S], top_n: usize) -> Vec<Recommendation> {
        positive_only(self.recommend(keywords, top_n, true))
    }
}

impl fmt::Debug for RecommenderIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommenderIndex")
            .field("countries", &self.lexical.countries())
            .field("vocabulary", &self.lexical.vocab_size())
            .field("embeddings", &self.embeddings.len())
            .field("model", &self.provider.model_name())
            .field("threshold", &self.threshold)
            .finish()
    }
}

/// Free-function form of [`RecommenderIndex::recommend`].
pub fn recommend<S: AsRef<str>>(
    index: &RecommenderIndex,
    keywords: &[S],
    top_n: usize,
    with_scores: bool,
) -> Vec<Recommendation> {
    index.recommend(keywords, top_n, with_scores)
}

/// Build (or load from cache) the index for every known country.
///
/// `force_rebuild` discards both cache artifacts first. Fails only when no
/// country could be loaded at all, when the loaded data has no keyword, or
/// when a forced rebuild cannot clear the cache. An embedding provider
/// failure degrades the handle to lexical-only matching instead.
#[instrument(skip_all, fields(model = provider.model_name(), force_rebuild = force_rebuild))]
pub fn build_index(
    config: &RecommenderConfig,
    source: &dyn CountrySource,
    provider: Arc<dyn EmbeddingProvider>,
    force_rebuild: bool,
) -> Result<RecommenderIndex> {
    let aggregation = aggregate(source, &Country::ALL)?;
    let table = aggregation.table;
    let vocabulary = table.vocabulary();
    if vocabulary.is_empty() {
        return Err(RecommenderError::EmptyVocabulary);
    }
    let countries: Vec<Country> = table.countries().collect();
    let fp = fingerprint(vocabulary.iter().map(String::as_str), &countries);
    let content = table_fingerprint(&table);
    let cache = CacheDir::new(&config.cache_dir);

    // embeddings carry the vocabulary fingerprint only, so a count change
    // refits the lexical index and keeps every cached vector
    let lexical: LexicalIndex = {
        let _guard = cache.lock();
        if force_rebuild {
            info!(dir = %cache.path().display(), "forced rebuild, clearing cache");
            cache.clear()?;
        }
        match cache.load_lexical(&fp, &content).map(LexicalIndexData::into_lexical_index) {
            Some(Ok(index)) => {
                info!(vocabulary = vocabulary.len(), "lexical index cache hit");
                index
            }
            cached => {
                if let Some(Err(reason)) = cached {
                    warn!(%reason, "cached lexical index is inconsistent");
                }
                info!(vocabulary = vocabulary.len(), "fitting lexical index");
                let index = LexicalIndex::fit(&table);
                if let Err(e) = cache.store_lexical(&fp, &content, &LexicalIndexData::from(&index)) {
                    warn!(error = %e, "failed to persist lexical index");
                }
                index
            }
        }
    };

    let mut store = EmbeddingStore::new(provider.clone(), config.batch_size).with_cache(cache, fp);
    let embedding_warning = match store.ensure_embeddings(vocabulary.iter().map(String::as_str)) {
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "embedding provider failed, semantic matching degraded");
            Some(e)
        }
    };
    let embeddings = store.into_map();

    info!(
        countries = countries.len(),
        vocabulary = vocabulary.len(),
        embeddings = embeddings.len(),
        skipped = aggregation.warnings.len(),
        "index ready"
    );

    Ok(RecommenderIndex {
        lexical,
        embeddings,
        provider,
        normalizer: KeywordNormalizer::with_capacity(config.memo_capacity),
        threshold: config.threshold,
        data_warnings: aggregation.warnings,
        embedding_warning,
    })
}
