//! Image embedding adapters
//!
//! The engine treats embedding as an opaque collaborator: anything that maps
//! image bytes to a fixed-length vector can drive it. The production adapter
//! is a CLIP ViT-B/32 image encoder running under ONNX Runtime, enabled with
//! the `clip` feature flag so the default build stays pure Rust.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "clip")]
//! # {
//! use platelens_core::embedding::{ClipEmbedder, ImageEmbedder};
//!
//! let embedder = ClipEmbedder::new("models/clip_visual.onnx")?;
//! let image = std::fs::read("photo.jpg")?;
//!
//! let embedding = embedder.embed(&image)?;
//! assert_eq!(embedding.len(), 512);
//! # }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cache;

pub use cache::CachedEmbedder;

#[cfg(feature = "clip")]
mod clip;

#[cfg(feature = "clip")]
pub use clip::ClipEmbedder;

use crate::Result;

/// Turns raw image bytes into a fixed-length embedding vector.
///
/// Implementations must be deterministic: the same bytes always produce the
/// same vector. Vectors should be unit-normalized so L2 distances stay in a
/// predictable range; the engine only ever checks the dimension.
///
/// # Errors
///
/// * `ImageDecode` - the bytes are not a decodable image
/// * `Embedding` - the underlying model failed
pub trait ImageEmbedder: Send + Sync {
    /// The dimension of every vector this embedder produces.
    fn dim(&self) -> usize;

    /// Embed one image.
    fn embed(&self, image: &[u8]) -> Result<Vec<f32>>;
}

// Placeholder when the CLIP feature is not enabled
#[cfg(not(feature = "clip"))]
#[doc(hidden)]
pub struct ClipEmbedder;

#[cfg(not(feature = "clip"))]
impl ClipEmbedder {
    /// This is a placeholder when the `clip` feature is not enabled.
    ///
    /// To use CLIP embeddings, enable the `clip` feature in your Cargo.toml:
    ///
    /// ```toml
    /// [dependencies]
    /// platelens-core = { version = "*", features = ["clip"] }
    /// ```
    #[allow(dead_code)]
    pub fn new<P: AsRef<std::path::Path>>(_model_path: P) -> crate::Result<Self> {
        Err(crate::EngineError::Embedding(
            "CLIP feature is not enabled. Enable it in Cargo.toml with features = [\"clip\"]"
                .to_string(),
        ))
    }
}
