//! Cached embedder with LRU caching
//!
//! Wraps any [`ImageEmbedder`] with an LRU cache keyed by a 64-bit hash of
//! the image bytes. Rebuilds re-embed the same catalog images over and over;
//! with the cache in front, only the first rebuild pays for inference.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::{EngineError, Result};

use super::ImageEmbedder;

const DEFAULT_CACHE_SIZE: usize = 2_048;

struct CacheState {
    entries: LruCache<u64, Vec<f32>>,
    hits: usize,
    misses: usize,
}

/// An embedder wrapper that caches computed vectors.
///
/// Cache keys are a hash of the input bytes, so two byte-identical images
/// share an entry regardless of file name. Entries hold one `Vec<f32>` each
/// (2 KiB for a 512-dimensional embedding); the default capacity of 2,048
/// entries comfortably covers a whole catalog.
///
/// The cache sits behind a `Mutex`, so the wrapper stays `Send + Sync` and
/// can back a shared engine.
pub struct CachedEmbedder<E> {
    inner: E,
    state: Mutex<CacheState>,
}

impl<E: ImageEmbedder> CachedEmbedder<E> {
    /// Wrap `inner` with a cache of `capacity` entries.
    pub fn new(inner: E, capacity: usize) -> Self {
        let capacity =
            NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap());

        Self {
            inner,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Wrap `inner` with the default capacity.
    pub fn with_default_size(inner: E) -> Self {
        Self::new(inner, DEFAULT_CACHE_SIZE)
    }

    /// Cache counters as `(hits, misses)`.
    pub fn cache_stats(&self) -> (usize, usize) {
        match self.state.lock() {
            Ok(state) => (state.hits, state.misses),
            Err(_) => (0, 0),
        }
    }

    fn key(image: &[u8]) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(image);
        hasher.finish()
    }
}

impl<E: ImageEmbedder> ImageEmbedder for CachedEmbedder<E> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed(&self, image: &[u8]) -> Result<Vec<f32>> {
        let key = Self::key(image);

        {
            let mut state = self.state.lock().map_err(|e| {
                EngineError::Embedding(format!("Embedding cache lock poisoned: {}", e))
            })?;

            if let Some(embedding) = state.entries.get(&key) {
                let embedding = embedding.clone();
                state.hits += 1;
                return Ok(embedding);
            }
        }

        // Miss: compute outside the lock so slow inference never serializes
        // unrelated callers.
        let embedding = self.inner.embed(image)?;

        let mut state = self.state.lock().map_err(|e| {
            EngineError::Embedding(format!("Embedding cache lock poisoned: {}", e))
        })?;
        state.entries.put(key, embedding.clone());
        state.misses += 1;

        Ok(embedding)
    }
}
