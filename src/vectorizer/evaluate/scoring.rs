use std::fmt::{self, Debug, Display};

use num::{Float, ToPrimitive};
use rayon::prelude::*;

use crate::{
    country::Country,
    utils::math::SparseVec,
    vectorizer::{tfidf::TFIDFEngine, LexicalIndex},
};

/// Structure to store scored countries
pub struct Hits {
    /// (Country, Score)
    pub list: Vec<(Country, f64)>,
}

impl Hits {
    pub fn new(list: Vec<(Country, f64)>) -> Self {
        Hits { list }
    }

    /// Sort by descending score; equal scores keep country identifier order.
    pub fn sort_by_score(&mut self) -> &mut Self {
        // Remove NaN scores
        self.list.retain(|(_, s)| !s.is_nan());
        self.list
            .sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        self
    }

    /// Keep the first `n` entries.
    pub fn truncate(&mut self, n: usize) -> &mut Self {
        self.list.truncate(n);
        self
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn into_vec(self) -> Vec<(Country, f64)> {
        self.list
    }
}

impl Debug for Hits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Hits [")?;
            for (country, score) in &self.list {
                writeln!(f, "    {country}: {score:.6}")?;
            }
            write!(f, "]")
        } else {
            f.debug_list().entries(&self.list).finish()
        }
    }
}

impl Display for Hits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, (country, score)) in self.list.iter().enumerate() {
            writeln!(f, "#{} {} ({})\t{score:.3}", rank + 1, country.code().to_uppercase(), country.display_name())?;
        }
        Ok(())
    }
}

impl<N, E> LexicalIndex<N, E>
where
    N: Float + ToPrimitive + Send + Sync,
    E: TFIDFEngine<N> + Send + Sync,
{
    /// Cosine similarity of an already weighted, L2-normalized query
    /// against every country row.
    ///
    /// Rows are L2-normalized at fit time, so the score is the dot product.
    /// Result order is the row order (unsorted).
    pub fn similarity(&self, query: &SparseVec<N>) -> Hits {
        let list = self
            .countries
            .par_iter()
            .zip(self.matrix.par_iter())
            .map(|(&country, row)| (country, row.dot(query).to_f64().unwrap_or(0.0)))
            .collect();
        Hits { list }
    }
}
