//! Semantic resolver: maps an arbitrary input keyword onto the fixed
//! vocabulary of the lexical index.
//!
//! Exact (post-normalization) matches win and never touch the embedding
//! provider. Anything else is embedded and compared against the stored
//! vocabulary vectors; the best match is accepted at or above the
//! similarity threshold. The resolver never adds vocabulary.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::{
    embedding::{store::EmbeddingMap, EmbeddingProvider},
    keyword::KeywordNormalizer,
    utils::math::cosine_similarity,
};

pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// How an input keyword was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Normalized form (after aliases) is a vocabulary keyword.
    Lexical(String),
    /// Nearest vocabulary keyword by embedding similarity.
    Semantic { keyword: String, similarity: f32 },
    Unresolved,
}

impl Resolution {
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Resolution::Lexical(keyword) | Resolution::Semantic { keyword, .. } => Some(keyword),
            Resolution::Unresolved => None,
        }
    }

    pub fn into_keyword(self) -> Option<String> {
        match self {
            Resolution::Lexical(keyword) | Resolution::Semantic { keyword, .. } => Some(keyword),
            Resolution::Unresolved => None,
        }
    }
}

enum Step {
    Done(Resolution),
    Embed(String),
}

/// Read-only view over the pieces resolution needs.
///
/// Cheap to construct; borrow one from a built index for each request.
#[derive(Clone, Copy)]
pub struct SemanticResolver<'a> {
    normalizer: &'a KeywordNormalizer,
    vocabulary: &'a IndexSet<String>,
    embeddings: &'a EmbeddingMap,
    provider: &'a dyn EmbeddingProvider,
    threshold: f32,
}

impl<'a> SemanticResolver<'a> {
    pub fn new(
        normalizer: &'a KeywordNormalizer,
        vocabulary: &'a IndexSet<String>,
        embeddings: &'a EmbeddingMap,
        provider: &'a dyn EmbeddingProvider,
        threshold: f32,
    ) -> Self {
        Self {
            normalizer,
            vocabulary,
            embeddings,
            provider,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Resolve one raw keyword.
    pub fn resolve(&self, raw: &str) -> Resolution {
        match self.prepare(raw) {
            Step::Done(resolution) => resolution,
            Step::Embed(normalized) => match self.provider.embed(&normalized) {
                Ok(query) => self.match_vector(&normalized, &query),
                Err(e) => {
                    warn!(keyword = %normalized, error = %e, "embedding failed, falling back to lexical match");
                    Resolution::Unresolved
                }
            },
        }
    }

    /// Resolve every keyword, dropping the ones that do not resolve.
    /// Order and repetitions are kept. Keywords outside the vocabulary are
    /// embedded together in one batch.
    pub fn resolve_all<S: AsRef<str>>(&self, raw: &[S]) -> Vec<String> {
        let steps: Vec<Step> = raw.iter().map(|kw| self.prepare(kw.as_ref())).collect();
        let pending: IndexSet<&str> = steps
            .iter()
            .filter_map(|step| match step {
                Step::Embed(normalized) => Some(normalized.as_str()),
                Step::Done(_) => None,
            })
            .collect();
        let vectors = self.embed_pending(&pending);

        steps
            .iter()
            .filter_map(|step| match step {
                Step::Done(resolution) => resolution.keyword().map(str::to_string),
                Step::Embed(normalized) => vectors
                    .get(normalized.as_str())
                    .and_then(|query| self.match_vector(normalized, query).into_keyword()),
            })
            .collect()
    }

    /// Everything short of the embedding call.
    fn prepare(&self, raw: &str) -> Step {
        let normalized = self.normalizer.normalize(raw);
        if normalized.is_empty() {
            return Step::Done(Resolution::Unresolved);
        }
        if self.vocabulary.contains(&normalized) {
            return Step::Done(Resolution::Lexical(normalized));
        }
        if self.embeddings.is_empty() {
            debug!(keyword = %normalized, "no embeddings, lexical match only");
            return Step::Done(Resolution::Unresolved);
        }
        Step::Embed(normalized)
    }

    /// One provider call for all of `pending`. Empty on failure.
    fn embed_pending<'k>(&self, pending: &IndexSet<&'k str>) -> IndexMap<&'k str, Vec<f32>> {
        if pending.is_empty() {
            return IndexMap::new();
        }
        let texts: Vec<&str> = pending.iter().copied().collect();
        match self.provider.embed_batch(&texts) {
            Ok(vectors) if vectors.len() == texts.len() => texts.into_iter().zip(vectors).collect(),
            Ok(vectors) => {
                warn!(expected = texts.len(), found = vectors.len(), "embedding batch size mismatch");
                IndexMap::new()
            }
            Err(e) => {
                warn!(keywords = texts.len(), error = %e, "embedding failed, falling back to lexical match");
                IndexMap::new()
            }
        }
    }

    fn match_vector(&self, normalized: &str, query: &[f32]) -> Resolution {
        match self.nearest(query) {
            Some((keyword, similarity)) if similarity >= self.threshold => {
                debug!(input = %normalized, %keyword, similarity, "semantic match");
                Resolution::Semantic {
                    keyword: keyword.to_string(),
                    similarity,
                }
            }
            best => {
                debug!(keyword = %normalized, best = ?best, "unresolved keyword");
                Resolution::Unresolved
            }
        }
    }

    /// Most similar vocabulary keyword. Equal similarities keep the first
    /// keyword in vocabulary order. Keywords without a vector (or with one
    /// of a different length) are skipped.
    fn nearest(&self, query: &[f32]) -> Option<(&'a str, f32)> {
        let mut best: Option<(&'a str, f32)> = None;
        for keyword in self.vocabulary.iter() {
            let Some(vector) = self.embeddings.get(keyword) else {
                continue;
            };
            if vector.len() != query.len() {
                continue;
            }
            let similarity = cosine_similarity(query, vector);
            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((keyword.as_str(), similarity));
            }
        }
        best
    }
}
