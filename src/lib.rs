/// This crate recommends export countries for a product from a set of
/// multilingual keywords, using a TF-IDF index over per-country keyword
/// statistics with an embedding fallback for unseen keywords.
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod country;
pub mod embedding;
pub mod error;
pub mod keyword;
pub mod ranking;
pub mod recommender;
pub mod resolver;
pub mod utils;
pub mod vectorizer;

/// Recommender Index
/// The handle returned by `build_index`: the fitted lexical index, the keyword
/// embeddings and the embedding provider used for unseen query keywords.
///
/// The handle is immutable and `Send + Sync`. Build it once, share it, and
/// call `recommend` from as many threads as needed.
///
/// # Building
/// `build_index(config, source, provider, force_rebuild)` aggregates every
/// country from `source`, then loads the lexical index and embeddings from
/// the cache directory when they were built for the same vocabulary (and
/// model), or rebuilds and persists them.
pub use recommender::{build_index, recommend, RecommenderIndex};

/// Recommender Configuration
/// Data and cache directories, similarity threshold, memo capacity, embedding
/// batch size and model. `RecommenderConfig::from_env` reads overrides from
/// `RECOMMENDER_*` environment variables.
pub use config::RecommenderConfig;

/// Ranking Engine
/// `rank` resolves the query keywords, builds the query vector, projects it
/// through the fitted IDF weighting and orders countries by cosine
/// similarity. `Recommendation` is one ranked country with its optional score.
pub use ranking::{positive_only, rank, Recommendation};

/// Semantic Resolver
/// Maps an input keyword onto the vocabulary: alias or exact match first,
/// nearest embedding at or above the threshold otherwise.
pub use resolver::{Resolution, SemanticResolver};

/// Lexical Index
/// The country × vocabulary TF-IDF matrix with L2-normalized rows.
///
/// `LexicalIndex<N, E>` has the following generic parameters:
/// - `N`: Vector parameter type (f32 or f64)
/// - `E`: TF-IDF calculation engine type (e.g., DefaultTFIDFEngine)
///
/// # Serialization
/// Through `LexicalIndexData`, which is what the cache stores.
pub use vectorizer::{serde::LexicalIndexData, LexicalIndex};

/// Corpus for the Lexical Index
/// Number of documents (countries) and the number of documents each keyword
/// appears in. Base data for IDF calculation.
pub use vectorizer::corpus::Corpus;

/// Term Frequency structure
/// Keyword occurrence counts for one country, used as the TF of the index.
pub use vectorizer::token::TermFrequency;

/// TF IDF Calculation Engine Trait
/// A trait that defines the behavior of a TF-IDF calculation engine.
///
/// A default implementation, `DefaultTFIDFEngine`, uses the raw count as TF
/// and smoothed IDF `ln((1 + n) / (1 + df)) + 1`.
pub use vectorizer::tfidf::{DefaultTFIDFEngine, TFIDFEngine};

/// Scored countries, as produced by `LexicalIndex::similarity`.
pub use vectorizer::evaluate::scoring::Hits;

/// Frequency Aggregation
/// Country sources, schema detection and the country × keyword count table.
pub use aggregate::{aggregate, CountrySource, CsvDirSource, FrequencyTable, MemorySource};

/// Embedding providers and the keyword embedding store.
pub use embedding::{
    store::{EmbeddingMap, EmbeddingStore},
    EmbeddingError, EmbeddingProvider, HashingEmbedder, UnavailableEmbedder,
};

#[cfg(feature = "fastembed")]
pub use embedding::fastembed::FastEmbedProvider;

pub use country::Country;
pub use error::{DataError, RecommenderError, Result};
pub use keyword::{normalize, parse_keywords, AliasTable, KeywordNormalizer};
