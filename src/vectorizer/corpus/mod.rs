use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{aggregate::FrequencyTable, vectorizer::token::TermFrequency};

/// keep document count and per-term document frequency
///
/// A "document" here is one country's keyword table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    /// number of documents added
    pub doc_num: u64,
    /// number of documents each term appears in
    pub term_counts: IndexMap<Box<str>, u64>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from every country of a frequency table.
    pub fn from_table(table: &FrequencyTable) -> Self {
        let mut corpus = Self::new();
        for (_, freq) in table.iter() {
            corpus.add_doc(freq);
        }
        corpus
    }

    /// Add a document's distinct terms to the corpus
    pub fn add_doc(&mut self, freq: &TermFrequency) {
        self.doc_num += 1;
        for term in freq.terms() {
            *self.term_counts.entry(term.into()).or_insert(0) += 1;
        }
    }

    /// Get the number of documents in the corpus
    #[inline]
    pub fn get_doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Number of documents containing `term`
    #[inline]
    pub fn get_term_count(&self, term: &str) -> u64 {
        self.term_counts.get(term).copied().unwrap_or(0)
    }

    /// Get the current vocabulary size (number of unique terms)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_counts.len()
    }
}
