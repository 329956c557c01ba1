pub mod math;

use std::{cmp::Ordering, fmt};

use num::{Float, Num};
use serde::{Deserialize, Serialize};

pub use math::{cosine_similarity, dot, l2_norm, l2_normalize};

/// Sparse vector that treats zero as the implicit element.
///
/// Holds `inds` and `vals` side by side; `inds` are kept in strictly
/// ascending order, which the merge-join in [`SparseVec::dot`] relies on.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVec<N>
where
    N: Num + Copy,
{
    len: usize,
    inds: Vec<u32>,
    vals: Vec<N>,
}

impl<N> SparseVec<N>
where
    N: Num + Copy,
{
    /// Create an all-zero vector of dimension `len`.
    #[inline]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            inds: Vec::new(),
            vals: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(len: usize, nnz: usize) -> Self {
        Self {
            len,
            inds: Vec::with_capacity(nnz),
            vals: Vec::with_capacity(nnz),
        }
    }

    /// Build from a dense slice, dropping zeros.
    pub fn from_dense(dense: &[N]) -> Self {
        let mut vec = Self::new(dense.len());
        for (idx, &val) in dense.iter().enumerate() {
            if !val.is_zero() {
                vec.inds.push(idx as u32);
                vec.vals.push(val);
            }
        }
        vec
    }

    /// Dimension of the vector (including zero elements).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored non-zero elements.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    /// Append an element. `index` must be greater than every stored index
    /// and smaller than `len`; zero values are not stored.
    #[inline]
    pub fn push(&mut self, index: usize, value: N) {
        debug_assert!(index < self.len, "index {index} out of range {}", self.len);
        debug_assert!(
            self.inds.last().map_or(true, |&last| (last as usize) < index),
            "indices must be pushed in ascending order"
        );
        if value.is_zero() {
            return;
        }
        self.inds.push(index as u32);
        self.vals.push(value);
    }

    /// Value at `index`, zero when not stored.
    #[inline]
    pub fn get(&self, index: usize) -> N {
        match self.inds.binary_search(&(index as u32)) {
            Ok(pos) => self.vals[pos],
            Err(_) => N::zero(),
        }
    }

    /// Iterate over stored `(index, value)` pairs in ascending index order.
    #[inline]
    pub fn raw_iter(&self) -> impl Iterator<Item = (usize, &N)> + '_ {
        self.inds.iter().map(|&i| i as usize).zip(self.vals.iter())
    }

    /// Apply `f` to every stored value in place. Values that become zero
    /// are kept; call [`SparseVec::compact`] to drop them.
    pub fn map_in_place<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, N) -> N,
    {
        for (ind, val) in self.inds.iter().zip(self.vals.iter_mut()) {
            *val = f(*ind as usize, *val);
        }
    }

    /// Drop stored zeros.
    pub fn compact(&mut self) {
        let mut write = 0;
        for read in 0..self.vals.len() {
            if !self.vals[read].is_zero() {
                self.inds[write] = self.inds[read];
                self.vals[write] = self.vals[read];
                write += 1;
            }
        }
        self.inds.truncate(write);
        self.vals.truncate(write);
    }

    pub fn to_dense(&self) -> Vec<N> {
        let mut dense = vec![N::zero(); self.len];
        for (idx, val) in self.raw_iter() {
            dense[idx] = *val;
        }
        dense
    }

    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.inds.shrink_to_fit();
        self.vals.shrink_to_fit();
    }

    /// Dot product by merge-joining the two index lists.
    pub fn dot(&self, other: &Self) -> N {
        debug_assert_eq!(
            self.len, other.len,
            "Vectors must be of the same length to compute dot product."
        );
        let mut result = N::zero();
        let (mut i, mut j) = (0, 0);
        while i < self.inds.len() && j < other.inds.len() {
            match self.inds[i].cmp(&other.inds[j]) {
                Ordering::Equal => {
                    result = result + self.vals[i] * other.vals[j];
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        result
    }

    #[inline]
    pub fn norm_sq(&self) -> N {
        self.vals.iter().fold(N::zero(), |acc, &v| acc + v * v)
    }
}

impl<N> SparseVec<N>
where
    N: Float,
{
    /// Euclidean norm.
    #[inline]
    pub fn norm(&self) -> N {
        self.norm_sq().sqrt()
    }

    /// Scale to unit length. An all-zero vector is left untouched.
    pub fn normalize_l2(&mut self) {
        let norm = self.norm();
        if norm > N::zero() {
            self.vals.iter_mut().for_each(|v| *v = *v / norm);
        }
    }
}

impl<N> fmt::Debug for SparseVec<N>
where
    N: Num + Copy + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "SparseVec(len: {}, nnz: {}) [", self.len, self.nnz())?;
            for (idx, val) in self.raw_iter() {
                writeln!(f, "    {idx}: {val:?}")?;
            }
            write!(f, "]")
        } else {
            f.debug_map().entries(self.raw_iter()).finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dense_skips_zeros_and_roundtrips() {
        let dense = vec![0.0f64, 2.0, 0.0, 0.0, 5.0];
        let sp = SparseVec::from_dense(&dense);
        assert_eq!(sp.len(), 5);
        assert_eq!(sp.nnz(), 2);
        assert_eq!(sp.get(1), 2.0);
        assert_eq!(sp.get(3), 0.0);
        assert_eq!(sp.to_dense(), dense);
    }

    #[test]
    fn dot_matches_dense_dot() {
        let a = vec![1.0f64, 0.0, 3.0, 0.0, 2.0, 0.0];
        let b = vec![0.0f64, 4.0, 2.0, 0.0, 1.0, 7.0];
        let expected: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        let got = SparseVec::from_dense(&a).dot(&SparseVec::from_dense(&b));
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn normalize_l2_yields_unit_norm() {
        let mut sp = SparseVec::from_dense(&[3.0f64, 0.0, 4.0]);
        sp.normalize_l2();
        assert!((sp.norm() - 1.0).abs() < 1e-12);
        assert!((sp.get(0) - 0.6).abs() < 1e-12);

        let mut zero = SparseVec::<f64>::new(4);
        zero.normalize_l2();
        assert_eq!(zero.nnz(), 0);
    }

    #[test]
    fn compact_drops_zeroed_values() {
        let mut sp = SparseVec::from_dense(&[1.0f64, 2.0, 3.0]);
        sp.map_in_place(|idx, v| if idx == 1 { 0.0 } else { v });
        sp.compact();
        assert_eq!(sp.nnz(), 2);
        assert_eq!(sp.to_dense(), vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn push_ignores_zero_values() {
        let mut sp = SparseVec::<f32>::with_capacity(4, 2);
        sp.push(0, 0.0);
        sp.push(2, 1.5);
        assert_eq!(sp.nnz(), 1);
        assert_eq!(sp.get(2), 1.5);
    }
}
