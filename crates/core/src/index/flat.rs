//! Append-only flat (brute-force) vector index
//!
//! `SlotIndex` provides exact nearest-neighbor search by computing the L2
//! distance between the query and every stored vector. O(N·D) per query is
//! the right trade at catalog scale (hundreds to low thousands of vectors):
//! results are exact and the structure stays trivially serializable.

use crate::vector::l2_distance;
use crate::{EngineError, Result};

/// Append-only exact-search store of fixed-dimension embeddings.
///
/// Vectors are addressed by **slot**: the position assigned at append time.
/// Slots are contiguous, start at zero, and are never reused. The only way
/// to remove a vector is [`SlotIndex::clear`], which resets the whole index
/// (used by rebuilds).
///
/// # Examples
/// ```
/// use platelens_core::index::SlotIndex;
///
/// let mut index = SlotIndex::new(3);
/// let slot = index.append(vec![1.0, 0.0, 0.0]).unwrap();
/// assert_eq!(slot, 0);
///
/// let hits = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
/// assert_eq!(hits[0].0, 0);
/// assert!(hits[0].1 < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct SlotIndex {
    /// Expected dimension of stored vectors
    dim: usize,
    /// Vectors in slot order
    vectors: Vec<Vec<f32>>,
}

impl SlotIndex {
    /// Create a new empty index for vectors of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    /// Restore an index from vectors already in slot order.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - if any vector's length differs from `dim`
    pub fn from_vectors(dim: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        for v in &vectors {
            if v.len() != dim {
                return Err(EngineError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
        }
        Ok(Self { dim, vectors })
    }

    /// Append a vector, returning the slot it now occupies.
    ///
    /// The slot equals the index size before the append, so slots assigned by
    /// successive appends are contiguous.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - if the vector's length differs from the index
    ///   dimension
    pub fn append(&mut self, vector: Vec<f32>) -> Result<usize> {
        if vector.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }

        let slot = self.vectors.len();
        self.vectors.push(vector);
        Ok(slot)
    }

    /// Search for the `k` nearest vectors to `query`.
    ///
    /// Performs exhaustive L2 search over every stored vector. Results are
    /// `(slot, distance)` pairs in ascending distance order; exact ties are
    /// broken by ascending slot so result order is deterministic.
    ///
    /// An empty index yields an empty result, never an error.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - if the query's length differs from the index
    ///   dimension
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, v)| {
                // Dimensions are validated on entry, so this cannot fail.
                let distance = l2_distance(query, v).unwrap_or(f32::INFINITY);
                (slot, distance)
            })
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        scored.truncate(k);
        Ok(scored)
    }

    /// Number of stored vectors (also the next slot to be assigned).
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Reset the index to empty. Only rebuilds call this.
    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    /// The expected vector dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Stored vectors in slot order, for persistence.
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }
}
