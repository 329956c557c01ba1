//! Error types for the recommender.
//!
//! Per-country and per-keyword failures are absorbed where they happen and
//! only surface as warnings; [`RecommenderError`] is what initialization
//! returns when it cannot produce an index at all.

use thiserror::Error;

use crate::cache::CacheError;
use crate::country::Country;
use crate::embedding::EmbeddingError;

/// A single country's source data could not be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// The country's table failed to load (missing file, unreadable rows).
    #[error("data for {country} unavailable: {reason}")]
    Unavailable { country: Country, reason: String },
    /// No usable keyword/frequency column pair was found.
    #[error("could not detect keyword/frequency columns for {country}: {reason}")]
    Schema { country: Country, reason: String },
}

impl DataError {
    pub fn country(&self) -> Country {
        match self {
            DataError::Unavailable { country, .. } | DataError::Schema { country, .. } => *country,
        }
    }
}

/// Fatal errors surfaced to the caller of `build_index`.
#[derive(Debug, Error)]
pub enum RecommenderError {
    /// Every country failed to load, so there is nothing to index.
    #[error("no country data could be loaded ({} countries failed)", .0.len())]
    NoData(Vec<DataError>),
    /// The frequency table loaded but contained no keyword at all.
    #[error("frequency table has an empty vocabulary")]
    EmptyVocabulary,
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RecommenderError>;
