use num::Float;

/// Dot product of two dense vectors.
///
/// Extra elements of the longer slice are ignored.
#[inline]
pub fn dot<N: Float>(a: &[N], b: &[N]) -> N {
    debug_assert_eq!(a.len(), b.len(), "Vectors must be of the same length to compute dot product.");
    a.iter().zip(b.iter()).fold(N::zero(), |acc, (&x, &y)| acc + x * y)
}

#[inline]
pub fn l2_norm<N: Float>(a: &[N]) -> N {
    a.iter().fold(N::zero(), |acc, &x| acc + x * x).sqrt()
}

/// Scale `a` to unit length in place. All-zero input is left as is.
pub fn l2_normalize<N: Float>(a: &mut [N]) {
    let norm = l2_norm(a);
    if norm > N::zero() {
        a.iter_mut().for_each(|x| *x = *x / norm);
    }
}

/// Cosine similarity: cosθ = A・B / (|A||B|)
///
/// A zero vector on either side has similarity 0, never NaN.
pub fn cosine_similarity<N: Float>(a: &[N], b: &[N]) -> N {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == N::zero() || norm_b == N::zero() {
        return N::zero();
    }
    dot(a, b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_orthogonal() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [2.0f32, 4.0, 6.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let x = [1.0f32, 0.0];
        let y = [0.0f32, 1.0];
        assert_eq!(cosine_similarity(&x, &y), 0.0);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let a = [0.0f64; 3];
        let b = [1.0f64, 1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert!(!cosine_similarity(&a, &a).is_nan());
    }

    #[test]
    fn normalize_then_norm_is_one() {
        let mut v = vec![1.0f64, 1.0, 1.0, 1.0];
        l2_normalize(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-12);
        assert!((v[0] - 0.5).abs() < 1e-12);
    }
}
