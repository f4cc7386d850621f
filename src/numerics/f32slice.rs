/// A trait for vector-like slices of `f32`, supporting the linear-algebra
/// operations the similarity collaborators need. The trait only has one
/// implementation, and exists because impl blocks cannot be added directly
/// to the stdlib `[f32]` type.
///
/// # Contract
///
/// - Operations involving two vectors (l2, dot product, cosine) require that they have the same length.
pub trait VectorLike {
    fn l2_squared(&self, othr: &Self) -> f32;
    fn l2(&self, othr: &Self) -> f32;
    fn dot(&self, othr: &Self) -> f32;
    fn norm(&self) -> f32;
    fn cosine(&self, othr: &Self) -> f32;
}

impl VectorLike for [f32] {
    /// # Usage
    /// Computes the **SQUARED** L2 distance between two vectors:
    ///
    /// ```text
    /// L2^2(x, y) = Σ_i (x[i] - y[i]) ** 2
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the two vectors have different lengths
    #[inline]
    fn l2_squared(&self, othr: &[f32]) -> f32 {
        assert_eq!(self.len(), othr.len());
        self.iter()
            .zip(othr)
            .map(|(a, b)| {
                let diff = a - b;
                diff * diff
            })
            .sum()
    }

    #[inline]
    fn l2(&self, othr: &[f32]) -> f32 {
        self.l2_squared(othr).sqrt()
    }

    #[inline]
    fn dot(&self, othr: &[f32]) -> f32 {
        assert_eq!(self.len(), othr.len());
        self.iter().zip(othr).map(|(a, b)| a * b).sum()
    }

    #[inline]
    fn norm(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// # Usage
    /// Cosine similarity clamped to `[0, 1]`, so that it can be framed as closeness.
    /// Zero vectors are treated as dissimilar to everything.
    ///
    /// # Panics
    ///
    /// Panics if the two vectors have different lengths
    #[inline]
    fn cosine(&self, othr: &[f32]) -> f32 {
        let denominator = self.norm() * othr.norm();
        if denominator == 0.0 {
            return 0.0;
        }
        (self.dot(othr) / denominator).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        let diff = (a - b).abs();
        diff < eps
    }

    #[test]
    fn l2_is_sqrt_of_l2_squared() {
        let x = [1.0, 2.0, 3.0, 4.0, -1.0, -2.0, 0.5, 0.25];
        let y = [0.0, 1.0, 1.5, 4.0, 1.0, 0.0, 0.0, 2.0];

        let d2 = x.l2_squared(&y);
        let d = x.l2(&y);
        assert!(approx_eq(d, d2.sqrt(), EPS), "d={d} sqrt(d2)={}", d2.sqrt());
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let x = [0.25, -1.0, 3.0, 4.0];
        assert!(approx_eq(x.l2_squared(&x), 0.0, EPS));
    }

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 4.0, 6.0];
        assert!(approx_eq(x.cosine(&y), 1.0, EPS));
    }

    #[test]
    fn cosine_of_opposite_vectors_is_clamped() {
        let x = [1.0, 0.0];
        let y = [-1.0, 0.0];
        assert_eq!(x.cosine(&y), 0.0);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let x = [0.0, 0.0];
        let y = [1.0, 0.0];
        assert_eq!(x.cosine(&y), 0.0);
    }

    #[test]
    #[should_panic]
    fn mismatched_lengths_panic() {
        let x = [1.0, 2.0];
        let y = [1.0];
        let _ = x.dot(&y);
    }
}
