use indexmap::IndexSet;
use num::{Float, FromPrimitive};

use crate::{utils::math::SparseVec, vectorizer::{corpus::Corpus, token::TermFrequency}};

pub trait TFIDFEngine<N>
where
    N: Float,
{
    /// IDFベクトルを生成するメソッド
    /// # Arguments
    /// * `corpus` - コーパス
    /// * `vocabulary` - 語彙 (行列の列順)
    /// # Returns
    /// * `Vec<N>` - IDFベクトル, one weight per vocabulary column
    fn idf_vec(corpus: &Corpus, vocabulary: &IndexSet<String>) -> Vec<N>;

    /// Term-frequency vector of one document over `vocabulary`.
    /// Terms outside the vocabulary are dropped.
    fn tf_vec(freq: &TermFrequency, vocabulary: &IndexSet<String>) -> SparseVec<N>;
}

/// デフォルトのTF-IDFエンジン
///
/// - tf: the raw aggregated count
/// - idf: smoothed, `ln((1 + n) / (1 + df)) + 1`, so terms present in every
///   document keep weight 1 and an unseen term never divides by zero
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTFIDFEngine;

impl DefaultTFIDFEngine {
    pub fn new() -> Self {
        DefaultTFIDFEngine
    }

    #[inline]
    pub fn smoothed_idf(doc_num: u64, doc_freq: u64) -> f64 {
        ((1.0 + doc_num as f64) / (1.0 + doc_freq as f64)).ln() + 1.0
    }
}

impl<N> TFIDFEngine<N> for DefaultTFIDFEngine
where
    N: Float + FromPrimitive,
{
    fn idf_vec(corpus: &Corpus, vocabulary: &IndexSet<String>) -> Vec<N> {
        let doc_num = corpus.get_doc_num();
        vocabulary
            .iter()
            .map(|term| {
                let idf = Self::smoothed_idf(doc_num, corpus.get_term_count(term));
                N::from_f64(idf).unwrap_or_else(N::one)
            })
            .collect()
    }

    fn tf_vec(freq: &TermFrequency, vocabulary: &IndexSet<String>) -> SparseVec<N> {
        let mut entries: Vec<(usize, u64)> = freq
            .iter()
            .filter_map(|(term, count)| vocabulary.get_index_of(term).map(|idx| (idx, count)))
            .collect();
        entries.sort_unstable_by_key(|&(idx, _)| idx);

        let mut tf_vec = SparseVec::with_capacity(vocabulary.len(), entries.len());
        for (idx, count) in entries {
            if let Some(value) = N::from_u64(count) {
                tf_vec.push(idx, value);
            }
        }
        tf_vec
    }
}
