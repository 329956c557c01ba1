use std::fmt::Debug;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// TermFrequency
/// Aggregated keyword counts for one country.
///
/// Counts are strictly positive; a keyword that is absent counts as zero.
///
/// # Examples
/// ```
/// use country_recommender::TermFrequency;
/// let mut freq = TermFrequency::new();
/// freq.add_count("vegan", 3);
/// freq.add_count("toner", 1);
/// freq.add_count("vegan", 2);
/// assert_eq!(freq.term_count("vegan"), 5);
/// assert_eq!(freq.term_sum(), 6);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TermFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    term_count: IndexMap<String, u64>,
    total_term_count: u64,
}

/// add
impl TermFrequency {
    pub fn new() -> Self {
        TermFrequency {
            term_count: IndexMap::new(),
            total_term_count: 0,
        }
    }

    /// Add `count` occurrences of `term`. Zero is ignored so the
    /// strictly-positive invariant holds.
    #[inline]
    pub fn add_count(&mut self, term: &str, count: u64) -> &mut Self {
        if count == 0 {
            return self;
        }
        *self.term_count.entry(term.to_string()).or_insert(0) += count;
        self.total_term_count += count;
        self
    }
}

/// read access
impl TermFrequency {
    #[inline]
    pub fn term_count(&self, term: &str) -> u64 {
        self.term_count.get(term).copied().unwrap_or(0)
    }

    #[inline]
    pub fn contains_term(&self, term: &str) -> bool {
        self.term_count.contains_key(term)
    }

    /// Sum of all counts.
    #[inline]
    pub fn term_sum(&self) -> u64 {
        self.total_term_count
    }

    /// Number of distinct terms.
    #[inline]
    pub fn term_num(&self) -> usize {
        self.term_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.term_count.is_empty()
    }

    /// Terms in insertion order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.term_count.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_count.iter().map(|(t, &c)| (t.as_str(), c))
    }
}
