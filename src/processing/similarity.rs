use std::ops::{Add, Div, Mul};

/// Floating-point element types accepted by [`cosine_similarity`].
pub trait Float:
    Copy + PartialEq + Add<Output = Self> + Mul<Output = Self> + Div<Output = Self>
{
    const ZERO: Self;

    fn sqrt(self) -> Self;
}

impl Float for f32 {
    const ZERO: Self = 0.0;

    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }
}

impl Float for f64 {
    const ZERO: Self = 0.0;

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
}

/// Cosine similarity between two vectors of equal length.
///
/// Returns zero when either vector has zero magnitude.
///
/// # Panics
///
/// Panics if the vectors differ in length.
pub fn cosine_similarity<T: Float>(a: &[T], b: &[T]) -> T {
    assert_eq!(
        a.len(),
        b.len(),
        "Vectors must be of the same length to compare them"
    );

    let dot = a
        .iter()
        .zip(b)
        .fold(T::ZERO, |acc, (&x, &y)| acc + x * y);
    let magnitude_a = a.iter().fold(T::ZERO, |acc, &x| acc + x * x).sqrt();
    let magnitude_b = b.iter().fold(T::ZERO, |acc, &x| acc + x * x).sqrt();

    if magnitude_a == T::ZERO || magnitude_b == T::ZERO {
        return T::ZERO;
    }

    dot / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::cosine_similarity;

    const TOLERANCE: f32 = 1e-6;

    fn samples() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 2.0, 3.0],
            vec![-4.0, 0.5, 2.0],
            vec![0.1, -0.1, 0.0],
            vec![1e3, -2e3, 5e2],
            vec![-1.0, -2.0, -3.0],
        ]
    }

    #[test]
    fn identical_nonzero_vectors_score_one() {
        for v in samples() {
            assert!((cosine_similarity(&v, &v) - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn scores_stay_within_unit_range() {
        let vectors = samples();
        for a in &vectors {
            for b in &vectors {
                let score = cosine_similarity(a, b);
                assert!((-1.0 - TOLERANCE..=1.0 + TOLERANCE).contains(&score));
            }
        }
    }

    #[test]
    fn is_symmetric() {
        let vectors = samples();
        for a in &vectors {
            for b in &vectors {
                assert_eq!(cosine_similarity(a, b), cosine_similarity(b, a));
            }
        }
    }

    #[test]
    fn zero_vector_scores_zero() {
        let zero = vec![0.0_f32; 3];
        for v in samples() {
            assert_eq!(cosine_similarity(&zero, &v), 0.0);
            assert_eq!(cosine_similarity(&v, &zero), 0.0);
        }
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn opposite_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0_f32, 2.0], &[-1.0, -2.0]) + 1.0).abs() < TOLERANCE);
        assert_eq!(cosine_similarity(&[1.0_f32, 0.0], &[0.0, 5.0]), 0.0);
    }

    #[test]
    fn works_with_double_precision() {
        let score = cosine_similarity(&[3.0_f64, 4.0], &[4.0, 3.0]);
        assert!((score - 0.96).abs() < 1e-12);
    }

    #[test]
    fn empty_vectors_score_zero() {
        let empty: [f32; 0] = [];
        assert_eq!(cosine_similarity(&empty, &empty), 0.0);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn length_mismatch_panics() {
        cosine_similarity(&[1.0_f32, 2.0], &[1.0, 2.0, 3.0]);
    }
}
