use std::marker::PhantomData;

use indexmap::IndexSet;
use num::Float;
use serde::{Deserialize, Serialize};

use crate::{
    country::Country,
    utils::math::SparseVec,
    vectorizer::{tfidf::TFIDFEngine, LexicalIndex},
};

/// Serializable form of a [`LexicalIndex`].
///
/// Drops the engine marker; convert back with `into_lexical_index`, which
/// checks that the parts still line up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalIndexData<N = f64>
where
    N: Float,
{
    pub vocabulary: Vec<String>,
    pub countries: Vec<Country>,
    pub matrix: Vec<SparseVec<N>>,
    pub idf: Vec<N>,
}

impl<N> LexicalIndexData<N>
where
    N: Float,
{
    /// Rebuild the index. Fails on shape inconsistencies, which can only
    /// come from a damaged or hand-edited cache.
    pub fn into_lexical_index<E>(self) -> Result<LexicalIndex<N, E>, String>
    where
        E: TFIDFEngine<N>,
    {
        let vocab_len = self.vocabulary.len();
        let vocabulary: IndexSet<String> = self.vocabulary.into_iter().collect();
        if vocabulary.len() != vocab_len {
            return Err("duplicate vocabulary entries".to_string());
        }
        if self.idf.len() != vocab_len {
            return Err(format!("idf length {} != vocabulary {}", self.idf.len(), vocab_len));
        }
        if self.matrix.len() != self.countries.len() {
            return Err(format!(
                "matrix has {} rows for {} countries",
                self.matrix.len(),
                self.countries.len()
            ));
        }
        if let Some(row) = self.matrix.iter().find(|row| row.len() != vocab_len) {
            return Err(format!("row dimension {} != vocabulary {}", row.len(), vocab_len));
        }
        Ok(LexicalIndex {
            vocabulary,
            countries: self.countries,
            matrix: self.matrix,
            idf: self.idf,
            _marker: PhantomData,
        })
    }
}

impl<N, E> From<&LexicalIndex<N, E>> for LexicalIndexData<N>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    fn from(index: &LexicalIndex<N, E>) -> Self {
        Self {
            vocabulary: index.vocabulary.iter().cloned().collect(),
            countries: index.countries.clone(),
            matrix: index.matrix.clone(),
            idf: index.idf.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate::FrequencyTable, vectorizer::token::TermFrequency};

    fn index() -> LexicalIndex {
        let mut a = TermFrequency::new();
        a.add_count("vegan", 3).add_count("serum", 1);
        let mut b = TermFrequency::new();
        b.add_count("serum", 2);
        let mut t = FrequencyTable::new();
        t.insert(Country::France, a).insert(Country::Thailand, b);
        LexicalIndex::fit(&t)
    }

    #[test]
    fn cbor_roundtrip_preserves_index() {
        let original = index();
        let bytes = serde_cbor::to_vec(&LexicalIndexData::from(&original)).unwrap();
        let data: LexicalIndexData = serde_cbor::from_slice(&bytes).unwrap();
        let restored: LexicalIndex = data.into_lexical_index().unwrap();

        assert_eq!(restored.vocabulary(), original.vocabulary());
        assert_eq!(restored.countries(), original.countries());
        assert_eq!(restored.idf(), original.idf());
        assert_eq!(restored.fingerprint(), original.fingerprint());
        for ((_, a), (_, b)) in restored.rows().zip(original.rows()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn rejects_inconsistent_shapes() {
        let mut data = LexicalIndexData::from(&index());
        data.idf.pop();
        assert!(data.into_lexical_index::<crate::DefaultTFIDFEngine>().is_err());

        let mut data = LexicalIndexData::from(&index());
        data.countries.pop();
        assert!(data.into_lexical_index::<crate::DefaultTFIDFEngine>().is_err());
    }
}
