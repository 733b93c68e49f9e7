//! Platelens - Core library
//!
//! Embedding-indexed visual retrieval for food catalogs. The engine keeps
//! three persisted artifacts mutually consistent: a flat vector index of
//! image embeddings, an identity map tying index slots to catalog item ids,
//! and the catalog metadata itself.

pub mod catalog;
pub mod embedding;
pub mod engine;
pub mod index;
pub mod storage;
pub mod vector;

use std::path::PathBuf;

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error types for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Duplicate catalog id: {0}")]
    DuplicateId(String),

    #[error("Inconsistent index state: {0}")]
    InconsistentState(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single catalog item.
///
/// Records are created by [`engine::RetrievalEngine::add`] and never mutated
/// in place; a record disappears only when a rebuild omits it. `image_file`
/// names the backing image inside the data directory's `images/` folder.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub name: String,
    pub image_file: String,
    pub calories: u32,
    pub price: u32,
    pub location: String,
    #[serde(default)]
    pub protein: f32,
    #[serde(default)]
    pub carbs: f32,
    #[serde(default)]
    pub fat: f32,
    #[serde(default)]
    pub description: String,
}

/// One ranked search hit.
///
/// `confidence` is a bounded transform of the L2 distance into `[0, 100]`,
/// monotonically decreasing in `distance`. `slot` is the index position the
/// hit came from; it is not stable across rebuilds.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchMatch {
    pub record: CatalogRecord,
    pub slot: usize,
    pub distance: f32,
    pub confidence: f32,
}

/// Read-only engine counters.
///
/// `total_records` counts every catalog record; `indexed_count` counts only
/// records with a vector in the index. The two may legitimately differ when
/// a record's image is missing (known but unindexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    pub total_records: usize,
    pub indexed_count: usize,
    pub embedding_dim: usize,
}

/// Outcome of a full index rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RebuildReport {
    /// Records embedded into the fresh index.
    pub indexed: usize,
    /// Records skipped because their image was missing or unembeddable.
    pub skipped: usize,
}

/// Configuration for the retrieval engine
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Directory holding the three persisted artifacts and the images folder.
    pub data_dir: PathBuf,
    /// Expected embedding dimension (512 for CLIP ViT-B/32).
    pub embedding_dim: usize,
}

impl EngineConfig {
    /// Configuration rooted at `data_dir` with the default dimension.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            embedding_dim: 512, // CLIP ViT-B/32
        }
    }
}

// Re-export commonly used items
pub use catalog::{Catalog, IdentityMap};
pub use embedding::ImageEmbedder;
pub use engine::RetrievalEngine;
pub use index::SlotIndex;
pub use vector::{l2_distance, normalize};
