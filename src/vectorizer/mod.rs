pub mod corpus;
pub mod evaluate;
pub mod serde;
pub mod tfidf;
pub mod token;

use std::marker::PhantomData;

use indexmap::IndexSet;
use num::{Float, FromPrimitive};
use tracing::debug;

use crate::{
    aggregate::FrequencyTable,
    cache::fingerprint,
    country::Country,
    utils::math::SparseVec,
    vectorizer::{
        corpus::Corpus,
        tfidf::{DefaultTFIDFEngine, TFIDFEngine},
    },
};

/// Lexical index: a fitted TF-IDF weighting over the per-country keyword
/// counts.
///
/// Internally, it holds:
/// - The frozen vocabulary; its order is the column order of every vector
/// - One L2-normalized TF-IDF row per country, countries in identifier order
/// - The fitted IDF vector, reused to project query vectors
///
/// `LexicalIndex<N, E>` has the following generic parameters:
/// - `N`: Vector parameter type (f32 or f64)
/// - `E`: TF-IDF calculation engine type (e.g., DefaultTFIDFEngine)
///
/// The index is immutable once fit; a different keyword set needs a new
/// `fit`, which also invalidates every cache keyed on the old vocabulary.
#[derive(Debug, Clone)]
pub struct LexicalIndex<N = f64, E = DefaultTFIDFEngine>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    pub(crate) vocabulary: IndexSet<String>,
    pub(crate) countries: Vec<Country>,
    /// country rows, aligned with `countries`
    pub(crate) matrix: Vec<SparseVec<N>>,
    pub(crate) idf: Vec<N>,
    pub(crate) _marker: PhantomData<E>,
}

impl<N, E> LexicalIndex<N, E>
where
    N: Float + FromPrimitive,
    E: TFIDFEngine<N>,
{
    /// Fit the weighting on `table` and build the country × vocabulary matrix.
    pub fn fit(table: &FrequencyTable) -> Self {
        let vocabulary: IndexSet<String> = table.vocabulary().into_iter().collect();
        let corpus = Corpus::from_table(table);
        let idf = E::idf_vec(&corpus, &vocabulary);

        let mut countries = Vec::with_capacity(table.len());
        let mut matrix = Vec::with_capacity(table.len());
        for (country, freq) in table.iter() {
            let mut row = E::tf_vec(freq, &vocabulary);
            apply_idf(&mut row, &idf);
            row.normalize_l2();
            row.shrink_to_fit();
            countries.push(country);
            matrix.push(row);
        }
        debug!(
            countries = countries.len(),
            vocabulary = vocabulary.len(),
            "fitted lexical index"
        );

        Self {
            vocabulary,
            countries,
            matrix,
            idf,
            _marker: PhantomData,
        }
    }

    /// Apply the fitted IDF weights to a raw query vector and L2-normalize.
    /// Never refits.
    pub fn transform(&self, raw: &SparseVec<N>) -> SparseVec<N> {
        debug_assert_eq!(raw.len(), self.vocabulary.len(), "query vector dimension mismatch");
        let mut weighted = raw.clone();
        apply_idf(&mut weighted, &self.idf);
        weighted.normalize_l2();
        weighted
    }

    /// Raw query vector: every term adds 1.0 at its column, so repeated
    /// terms accumulate. Terms outside the vocabulary are ignored.
    pub fn raw_query_vector<S: AsRef<str>>(&self, terms: &[S]) -> SparseVec<N> {
        let mut dense = vec![N::zero(); self.vocabulary.len()];
        for term in terms {
            if let Some(idx) = self.term_index(term.as_ref()) {
                dense[idx] = dense[idx] + N::one();
            }
        }
        SparseVec::from_dense(&dense)
    }
}

impl<N, E> LexicalIndex<N, E>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    /// Column of `term` in the matrix.
    #[inline]
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get_index_of(term)
    }

    #[inline]
    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains(term)
    }

    /// Vocabulary in column order.
    pub fn vocabulary(&self) -> &IndexSet<String> {
        &self.vocabulary
    }

    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn idf(&self) -> &[N] {
        &self.idf
    }

    pub fn rows(&self) -> impl Iterator<Item = (Country, &SparseVec<N>)> {
        self.countries.iter().copied().zip(self.matrix.iter())
    }

    /// Weighted keyword vector of `country`, if it was indexed.
    pub fn country_vector(&self, country: Country) -> Option<&SparseVec<N>> {
        self.countries
            .iter()
            .position(|&c| c == country)
            .map(|row| &self.matrix[row])
    }

    /// Top weighted keywords of a country, heaviest first.
    pub fn top_terms(&self, country: Country, n: usize) -> Vec<(&str, N)> {
        let Some(row) = self.country_vector(country) else {
            return Vec::new();
        };
        let mut terms: Vec<(&str, N)> = row
            .raw_iter()
            .filter_map(|(idx, &w)| self.vocabulary.get_index(idx).map(|t| (t.as_str(), w)))
            .collect();
        terms.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(b.0)));
        terms.truncate(n);
        terms
    }

    /// Fingerprint of the vocabulary and country order this index was fit on.
    pub fn fingerprint(&self) -> String {
        fingerprint(self.vocabulary.iter().map(String::as_str), &self.countries)
    }
}

fn apply_idf<N: Float>(vec: &mut SparseVec<N>, idf: &[N]) {
    vec.map_in_place(|idx, v| v * idf.get(idx).copied().unwrap_or_else(N::zero));
    vec.compact();
}
