//! Scalar vector operations
//!
//! All functions are hot-path helpers for exhaustive search and embedding
//! post-processing. They validate dimensions and rely on iterator fusion for
//! auto-vectorization.

use crate::{EngineError, Result};

/// Computes the Euclidean (L2) distance between two vectors.
///
/// The L2 distance is the straight-line distance between two points in
/// Euclidean space, calculated as: sqrt(sum((a\[i\] - b\[i\])^2))
///
/// # Arguments
///
/// * `a` - First vector
/// * `b` - Second vector
///
/// # Returns
///
/// Returns the non-negative Euclidean distance.
///
/// # Errors
///
/// Returns `EngineError::DimensionMismatch` if the vectors have different
/// dimensions.
///
/// # Examples
///
/// ```
/// use platelens_core::vector::ops::l2_distance;
///
/// let a = vec![0.0, 0.0];
/// let b = vec![3.0, 4.0];
/// let distance = l2_distance(&a, &b).unwrap();
/// assert!((distance - 5.0).abs() < 1e-6);
/// ```
#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EngineError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let squared_sum: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum();

    Ok(squared_sum.sqrt())
}

/// Computes the dot product of two vectors.
///
/// # Arguments
///
/// * `a` - First vector
/// * `b` - Second vector
///
/// # Errors
///
/// Returns `EngineError::DimensionMismatch` if the vectors have different
/// dimensions.
///
/// # Examples
///
/// ```
/// use platelens_core::vector::ops::dot_product;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![4.0, 5.0, 6.0];
/// let product = dot_product(&a, &b).unwrap();
/// assert!((product - 32.0).abs() < 1e-6);
/// ```
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EngineError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Computes the L2 norm (magnitude) of a vector.
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalizes a vector in place to unit length.
///
/// Zero vectors are left untouched; there is no meaningful direction to
/// preserve.
///
/// # Examples
///
/// ```
/// use platelens_core::vector::ops::{magnitude, normalize};
///
/// let mut v = vec![3.0, 4.0];
/// normalize(&mut v);
/// assert!((magnitude(&v) - 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn normalize(v: &mut [f32]) {
    let norm = magnitude(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compares two vectors element-wise within an epsilon.
///
/// Returns `false` when dimensions differ.
#[inline]
pub fn approx_equal(a: &[f32], b: &[f32], epsilon: f32) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_l2_distance_basic() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((l2_distance(&a, &b).unwrap() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_l2_distance_identical() {
        let a = vec![1.5, -2.0, 0.25];
        assert!(l2_distance(&a, &a).unwrap() < EPSILON);
    }

    #[test]
    fn test_l2_distance_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, 0.5, 2.0];
        let ab = l2_distance(&a, &b).unwrap();
        let ba = l2_distance(&b, &a).unwrap();
        assert!((ab - ba).abs() < EPSILON);
    }

    #[test]
    fn test_l2_distance_dimension_mismatch() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            l2_distance(&a, &b),
            Err(EngineError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_dot_product() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0, 6.0];
        assert!((dot_product(&a, &b).unwrap() - 32.0).abs() < EPSILON);
    }

    #[test]
    fn test_dot_product_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(dot_product(&a, &b).unwrap().abs() < EPSILON);
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((magnitude(&v) - 1.0).abs() < EPSILON);
        assert!((v[0] - 0.6).abs() < EPSILON);
        assert!((v[1] - 0.8).abs() < EPSILON);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_typical_embedding_sizes() {
        for size in [384, 512, 768] {
            let mut v: Vec<f32> = (0..size).map(|i| (i as f32) - (size as f32) / 2.0).collect();
            normalize(&mut v);
            assert!(
                (magnitude(&v) - 1.0).abs() < 1e-4,
                "size {}: norm {}",
                size,
                magnitude(&v)
            );
        }
    }

    #[test]
    fn test_approx_equal() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0 + 1e-7, 2.0 - 1e-7];
        assert!(approx_equal(&a, &b, 1e-6));
        assert!(!approx_equal(&a, &b, 1e-8));
        assert!(!approx_equal(&a, &[1.0], 1e-6));
    }
}
