//! Keyword normalization.
//!
//! Input keywords arrive in Korean, English, Japanese or Chinese. They are
//! trimmed, lowercased and mapped through the [`AliasTable`] onto the
//! canonical (mostly English) vocabulary of the lexical index.

pub mod alias;
pub mod normalizer;

pub use alias::AliasTable;
pub use normalizer::{normalize, parse_keywords, KeywordNormalizer};
