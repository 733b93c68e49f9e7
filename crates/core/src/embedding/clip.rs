//! CLIP image embedding under ONNX Runtime
//!
//! Runs the visual half of CLIP ViT-B/32 exported to ONNX (input
//! `pixel_values` of shape `[N, 3, 224, 224]`, output `image_embeds` of
//! shape `[N, 512]`). Preprocessing matches the reference pipeline: RGB,
//! 224x224, per-channel mean/std normalization, and the resulting embedding
//! is L2-normalized so distances between unit vectors stay in `[0, 2]`.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

use crate::vector::normalize;
use crate::{EngineError, Result};

use super::ImageEmbedder;

const INPUT_SIZE: u32 = 224;
const EMBEDDING_DIM: usize = 512;

/// CLIP preprocessing constants (per channel, RGB order).
const CHANNEL_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CHANNEL_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// ONNX Runtime-based CLIP image embedder.
///
/// Produces deterministic, unit-normalized 512-dimensional embeddings for
/// any decodable image. The session is guarded by a `Mutex` because ONNX
/// Runtime inference needs exclusive access; callers share the embedder
/// behind an `Arc` and block on their own result.
#[derive(Debug)]
pub struct ClipEmbedder {
    /// ONNX Runtime session (exclusive during inference)
    session: Mutex<Session>,
    /// Embedding dimension (512 for ViT-B/32)
    dim: usize,
}

impl ClipEmbedder {
    /// Load a CLIP visual model from an ONNX file.
    ///
    /// # Errors
    ///
    /// Returns `Embedding` if the model cannot be loaded or the runtime
    /// fails to initialize.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| {
                EngineError::Embedding(format!("Failed to create session builder: {}", e))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                EngineError::Embedding(format!("Failed to set optimization level: {}", e))
            })?
            .with_intra_threads(4)
            .map_err(|e| EngineError::Embedding(format!("Failed to set thread count: {}", e)))?
            .commit_from_file(model_path.as_ref())
            .map_err(|e| {
                EngineError::Embedding(format!(
                    "Failed to load model from {:?}: {}",
                    model_path.as_ref(),
                    e
                ))
            })?;

        Ok(Self {
            session: Mutex::new(session),
            dim: EMBEDDING_DIM,
        })
    }

    /// Decode, resize, and normalize an image into NCHW tensor data.
    fn preprocess(image: &[u8]) -> Result<Vec<f32>> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| EngineError::ImageDecode(format!("Failed to decode image: {}", e)))?;

        let rgb = decoded
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
            .to_rgb8();

        let side = INPUT_SIZE as usize;
        let mut pixels = vec![0.0f32; 3 * side * side];
        for (y, x, pixel) in rgb
            .rows()
            .enumerate()
            .flat_map(|(y, row)| row.enumerate().map(move |(x, p)| (y, x, p)))
        {
            for channel in 0..3 {
                let value = pixel.0[channel] as f32 / 255.0;
                pixels[channel * side * side + y * side + x] =
                    (value - CHANNEL_MEAN[channel]) / CHANNEL_STD[channel];
            }
        }

        Ok(pixels)
    }
}

impl ImageEmbedder for ClipEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, image: &[u8]) -> Result<Vec<f32>> {
        let pixels = Self::preprocess(image)?;
        let side = INPUT_SIZE as usize;

        let input = Value::from_array(([1usize, 3, side, side], pixels))
            .map_err(|e| EngineError::Embedding(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EngineError::Embedding(format!("Session lock poisoned: {}", e)))?;

        let outputs = session
            .run(ort::inputs!["pixel_values" => input])
            .map_err(|e| EngineError::Embedding(format!("ONNX inference failed: {}", e)))?;

        let (shape, data) = outputs["image_embeds"]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                EngineError::Embedding(format!("Failed to extract output tensor: {}", e))
            })?;

        // Expect [1, dim]; a flattened [dim] export is accepted too.
        let mut flat_len = 1usize;
        for i in 0..shape.len() {
            flat_len *= shape[i] as usize;
        }
        if flat_len != self.dim {
            return Err(EngineError::Embedding(format!(
                "Unexpected output shape: {:?}",
                shape
            )));
        }

        let mut embedding = data.to_vec();
        normalize(&mut embedding);
        Ok(embedding)
    }
}
