//! Ranking engine.
//!
//! Resolved keywords become a raw count vector over the vocabulary, which is
//! projected through the fitted IDF weighting and scored against every
//! country row. Pure: the same index and keywords always give the same
//! ordered result.

use std::fmt;

use num::{Float, FromPrimitive, ToPrimitive};
use tracing::debug;

use crate::{
    country::Country,
    resolver::SemanticResolver,
    vectorizer::{tfidf::TFIDFEngine, LexicalIndex},
};

/// One ranked country. `score` is present when scores were requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recommendation {
    pub country: Country,
    pub score: Option<f64>,
}

impl Recommendation {
    /// True unless a score is present and non-positive.
    pub fn is_positive(&self) -> bool {
        self.score.map_or(true, |s| s > 0.0)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.country.code().to_uppercase(), self.country.display_name())?;
        if let Some(score) = self.score {
            write!(f, "\t{score:.4}")?;
        }
        Ok(())
    }
}

/// Drop countries whose score is zero or negative.
pub fn positive_only(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    recommendations.into_iter().filter(Recommendation::is_positive).collect()
}

/// Rank countries for `query_keywords`.
///
/// Keywords that do not resolve are ignored; if none resolves the result is
/// empty. Ties are broken by country identifier. `top_n` larger than the
/// number of indexed countries returns all of them; `top_n == 0` returns
/// nothing.
pub fn rank<S, N, E>(
    query_keywords: &[S],
    index: &LexicalIndex<N, E>,
    resolver: &SemanticResolver<'_>,
    top_n: usize,
    with_scores: bool,
) -> Vec<Recommendation>
where
    S: AsRef<str>,
    N: Float + FromPrimitive + ToPrimitive + Send + Sync,
    E: TFIDFEngine<N> + Send + Sync,
{
    if top_n == 0 {
        return Vec::new();
    }
    let resolved = resolver.resolve_all(query_keywords);
    if resolved.is_empty() {
        debug!(keywords = query_keywords.len(), "no keyword resolved");
        return Vec::new();
    }

    let raw = index.raw_query_vector(&resolved);
    if raw.nnz() == 0 {
        return Vec::new();
    }
    let query = index.transform(&raw);

    let mut hits = index.similarity(&query);
    hits.sort_by_score().truncate(top_n);
    debug!(resolved = ?resolved, "ranked {} countries", hits.len());

    hits.into_vec()
        .into_iter()
        .map(|(country, score)| Recommendation {
            country,
            score: with_scores.then_some(score),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::FrequencyTable,
        embedding::{store::EmbeddingMap, UnavailableEmbedder},
        keyword::KeywordNormalizer,
        resolver::DEFAULT_THRESHOLD,
        vectorizer::token::TermFrequency,
    };

    fn index() -> LexicalIndex {
        let mut usa = TermFrequency::new();
        usa.add_count("vegan", 5).add_count("toner", 1);
        let mut brazil = TermFrequency::new();
        brazil.add_count("toner", 3);
        let mut japan = TermFrequency::new();
        japan.add_count("vegan", 1).add_count("toner", 5);
        let mut t = FrequencyTable::new();
        t.insert(Country::Usa, usa)
            .insert(Country::Brazil, brazil)
            .insert(Country::Japan, japan);
        LexicalIndex::fit(&t)
    }

    fn ranked(keywords: &[&str], top_n: usize, with_scores: bool) -> Vec<Recommendation> {
        let index = index();
        let normalizer = KeywordNormalizer::default();
        let map = EmbeddingMap::new("none");
        let provider = UnavailableEmbedder::new("off");
        let resolver = SemanticResolver::new(&normalizer, index.vocabulary(), &map, &provider, DEFAULT_THRESHOLD);
        rank(keywords, &index, &resolver, top_n, with_scores)
    }

    #[test]
    fn vegan_query_ranks_by_weight() {
        let recs = ranked(&["vegan"], 3, true);
        let order: Vec<Country> = recs.iter().map(|r| r.country).collect();
        assert_eq!(order, vec![Country::Usa, Country::Japan, Country::Brazil]);
        assert_eq!(recs[2].score, Some(0.0));
        assert!(recs[0].score > recs[1].score);

        let positive = positive_only(recs);
        assert_eq!(positive.len(), 2);
        assert!(positive.iter().all(|r| r.country != Country::Brazil));
    }

    #[test]
    fn alias_input_ranks_like_canonical() {
        assert_eq!(ranked(&["비건"], 3, true), ranked(&["vegan"], 3, true));
    }

    #[test]
    fn empty_or_unresolved_query_is_empty() {
        assert!(ranked(&[], 3, false).is_empty());
        assert!(ranked(&["nothing", "matches"], 3, true).is_empty());
        assert!(ranked(&["vegan"], 0, true).is_empty());
    }

    #[test]
    fn top_n_truncates_and_clamps() {
        assert_eq!(ranked(&["toner"], 1, false).len(), 1);
        let all = ranked(&["toner"], 99, false);
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.score.is_none()));
    }

    #[test]
    fn ranking_is_deterministic() {
        let a = ranked(&["vegan", "toner", "vegan"], 3, true);
        for _ in 0..5 {
            assert_eq!(ranked(&["vegan", "toner", "vegan"], 3, true), a);
        }
    }

    #[test]
    fn ties_break_by_country() {
        let mut a = TermFrequency::new();
        a.add_count("serum", 2);
        let mut b = TermFrequency::new();
        b.add_count("serum", 2);
        let mut t = FrequencyTable::new();
        t.insert(Country::Vietnam, a).insert(Country::France, b);
        let index: LexicalIndex = LexicalIndex::fit(&t);
        let normalizer = KeywordNormalizer::default();
        let map = EmbeddingMap::new("none");
        let provider = UnavailableEmbedder::new("off");
        let resolver = SemanticResolver::new(&normalizer, index.vocabulary(), &map, &provider, DEFAULT_THRESHOLD);

        let recs = rank(&["serum"], &index, &resolver, 2, false);
        assert_eq!(recs[0].country, Country::France);
        assert_eq!(recs[1].country, Country::Vietnam);
    }
}
