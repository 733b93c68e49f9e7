//! Retrieval engine orchestration
//!
//! [`RetrievalEngine`] owns the triple of stores (vector index, identity
//! map, catalog) and is the only code allowed to mutate them. `add` and
//! `rebuild` hold the write half of one `RwLock` across the in-memory
//! mutation *and* persistence, so a reader can never observe a half-appended
//! index. `search` runs under the read half and embeds its query before
//! taking any guard, so embedder latency never blocks the stores.
//!
//! The engine is an explicitly constructed instance: bootstrap builds one
//! and hands it (behind an `Arc`) to whatever serves requests. There is no
//! ambient global.

use std::collections::HashSet;
use std::fs;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, IdentityMap};
use crate::embedding::ImageEmbedder;
use crate::index::SlotIndex;
use crate::storage::ArtifactStore;
use crate::{
    CatalogRecord, EngineConfig, EngineError, EngineStats, RebuildReport, Result, SearchMatch,
};

/// Search always fetches at least this many candidates so name
/// deduplication has room to drop near-duplicates.
const MIN_FETCH: usize = 3;

/// Convert an L2 distance into a bounded confidence score.
///
/// `confidence = clamp(100 - 50 * d, 0, 100)`, rounded to two decimals.
/// Monotonically non-increasing in `d`; any distance of 2.0 or more floors
/// at zero.
fn confidence_from_distance(distance: f32) -> f32 {
    let confidence = (100.0 - 50.0 * distance).clamp(0.0, 100.0);
    (confidence * 100.0).round() / 100.0
}

/// The mutable triple the lock protects.
struct EngineState {
    index: SlotIndex,
    identity: IdentityMap,
    catalog: Catalog,
}

/// Embedding-indexed similarity retrieval over a food catalog.
///
/// Construct with [`RetrievalEngine::open`], which loads the persisted
/// artifacts (or starts empty) and refuses to serve from a torn
/// index/identity pair: it rebuilds instead.
pub struct RetrievalEngine {
    embedder: Arc<dyn ImageEmbedder>,
    store: ArtifactStore,
    dim: usize,
    state: RwLock<EngineState>,
}

impl RetrievalEngine {
    /// Open an engine over `config.data_dir`.
    ///
    /// Loads the catalog and the index/identity pair from disk. A fresh
    /// directory starts empty. A pair that is half-present, size-mismatched,
    /// or unreadable is logged and rebuilt from the catalog before the
    /// engine serves anything.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - the embedder's dimension disagrees with the
    ///   configured one
    /// * `Json` / `DuplicateId` - the catalog document itself is broken
    ///   (it is the source of truth and cannot be regenerated)
    /// * `Storage` / `Io` - the data directory is unusable or a forced
    ///   rebuild could not persist its result
    pub fn open(config: EngineConfig, embedder: Arc<dyn ImageEmbedder>) -> Result<Self> {
        if embedder.dim() != config.embedding_dim {
            return Err(EngineError::DimensionMismatch {
                expected: config.embedding_dim,
                actual: embedder.dim(),
            });
        }

        let dim = config.embedding_dim;
        let store = ArtifactStore::open(&config.data_dir)?;
        let catalog = store.load_catalog()?;

        let (index, identity) = match store.load_index_pair(dim) {
            Ok(Some((index, identity))) => {
                // Every mapped id must resolve to a record, or the pair is
                // just as torn as a size mismatch.
                let orphan = identity
                    .iter()
                    .find(|(_, id)| !catalog.contains(id))
                    .map(|(slot, id)| (slot, id.to_string()));

                if let Some((slot, id)) = orphan {
                    warn!(
                        slot,
                        id = %id,
                        "identity map references an id missing from the catalog; rebuilding"
                    );
                    Self::rebuild_and_persist(embedder.as_ref(), &store, &catalog, dim)?
                } else {
                    debug!(
                        vectors = index.len(),
                        records = catalog.len(),
                        "loaded persisted index"
                    );
                    (index, identity)
                }
            }
            Ok(None) => {
                info!(records = catalog.len(), "no persisted index; starting empty");
                (SlotIndex::new(dim), IdentityMap::new())
            }
            Err(e) => {
                warn!(error = %e, "persisted index unusable; rebuilding from catalog");
                Self::rebuild_and_persist(embedder.as_ref(), &store, &catalog, dim)?
            }
        };

        Ok(Self {
            embedder,
            store,
            dim,
            state: RwLock::new(EngineState {
                index,
                identity,
                catalog,
            }),
        })
    }

    /// Add one item: embed its image, append to the index, map the new
    /// slot, append the record, and persist all three artifacts.
    ///
    /// The image bytes are also written under `images/` so later rebuilds
    /// can re-embed the item.
    ///
    /// # Errors
    ///
    /// * `ImageDecode` / `Embedding` - the image could not be embedded;
    ///   nothing was mutated
    /// * `DuplicateId` - a record with this id already exists
    /// * `Storage` / `Io` - persistence failed. In-memory state is ahead of
    ///   disk for this item; the caller must not assume it is durably
    ///   indexed. The on-disk triple stays at its previous version.
    pub fn add(&self, record: CatalogRecord, image: &[u8]) -> Result<()> {
        // Embed before taking the write guard; the embedder is the slow
        // part and needs no engine state.
        let vector = self.embedder.embed(image)?;
        if vector.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }

        let mut state = self.write_state()?;

        if state.catalog.contains(&record.id) {
            return Err(EngineError::DuplicateId(record.id));
        }

        self.store.write_image(&record.image_file, image)?;

        let slot = state.index.append(vector)?;
        state.identity.put(slot, record.id.clone());
        let id = record.id.clone();
        state.catalog.append(record)?;

        self.store
            .persist_all(&state.index, &state.identity, &state.catalog)?;

        info!(id = %id, slot, "added catalog item");
        Ok(())
    }

    /// Search for the catalog items most similar to a query image.
    ///
    /// Returns up to `k` matches ranked by ascending distance, at most one
    /// per distinct record name (the closest occurrence wins). The first
    /// element is the primary match; the rest are alternatives, each with
    /// its own confidence. An empty index yields an empty list, never an
    /// error.
    ///
    /// # Errors
    ///
    /// * `ImageDecode` / `Embedding` - the query image could not be embedded
    pub fn search(&self, image: &[u8], k: usize) -> Result<Vec<SearchMatch>> {
        let query = self.embedder.embed(image)?;
        if query.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let state = self.read_state()?;

        if state.index.is_empty() {
            return Ok(Vec::new());
        }

        // Over-fetch so deduplication still has k candidates to choose from.
        let hits = state.index.search(&query, k.max(MIN_FETCH))?;

        let mut seen_names: HashSet<String> = HashSet::new();
        let mut matches = Vec::with_capacity(hits.len());

        for (slot, distance) in hits {
            let record = match state
                .identity
                .get(slot)
                .and_then(|id| state.catalog.get(id))
            {
                Some(record) => record,
                None => {
                    // Should not happen while the load-time invariants hold.
                    warn!(slot, "search hit did not resolve to a record; dropping");
                    continue;
                }
            };

            if !seen_names.insert(record.name.clone()) {
                continue;
            }

            matches.push(SearchMatch {
                record: record.clone(),
                slot,
                distance,
                confidence: confidence_from_distance(distance),
            });

            if matches.len() == k {
                break;
            }
        }

        Ok(matches)
    }

    /// Rebuild the index and identity map from the catalog.
    ///
    /// Walks the catalog in insertion order, re-embedding every record
    /// whose image is present under `images/`. Records with missing or
    /// unembeddable images are skipped and counted, never fatal. Fresh
    /// artifacts swap in atomically; slots are reassigned from zero and are
    /// contiguous among the successes, so slot numbers cached outside the
    /// engine are invalidated.
    ///
    /// Zero successes still succeeds; the engine then serves an empty index.
    ///
    /// # Errors
    ///
    /// * `Storage` / `Io` - persisting the rebuilt artifacts failed
    pub fn rebuild(&self) -> Result<RebuildReport> {
        let mut state = self.write_state()?;

        info!(records = state.catalog.len(), "rebuilding index");
        let (index, identity, report) =
            Self::rebuild_parts(self.embedder.as_ref(), &self.store, &state.catalog, self.dim);

        state.index = index;
        state.identity = identity;

        self.store
            .persist_all(&state.index, &state.identity, &state.catalog)?;

        if report.indexed == 0 {
            warn!("rebuild produced an empty index");
        } else {
            info!(
                indexed = report.indexed,
                skipped = report.skipped,
                "rebuild complete"
            );
        }

        Ok(report)
    }

    /// Read-only counters. Two calls with no intervening mutation return
    /// identical values.
    pub fn stats(&self) -> Result<EngineStats> {
        let state = self.read_state()?;
        Ok(EngineStats {
            total_records: state.catalog.len(),
            indexed_count: state.index.len(),
            embedding_dim: self.dim,
        })
    }

    /// Every catalog record in insertion order, indexed or not.
    pub fn records(&self) -> Result<Vec<CatalogRecord>> {
        let state = self.read_state()?;
        Ok(state.catalog.records().to_vec())
    }

    /// Build fresh index/identity artifacts from the catalog. Per-item
    /// failures are recovered inline: skip, count, keep walking.
    fn rebuild_parts(
        embedder: &dyn ImageEmbedder,
        store: &ArtifactStore,
        catalog: &Catalog,
        dim: usize,
    ) -> (SlotIndex, IdentityMap, RebuildReport) {
        let mut index = SlotIndex::new(dim);
        let mut identity = IdentityMap::new();
        let mut skipped = 0usize;

        for record in catalog.records() {
            let path = store.image_path(&record.image_file);
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(_) => {
                    warn!(id = %record.id, image = %record.image_file, "image missing; skipping");
                    skipped += 1;
                    continue;
                }
            };

            let vector = match embedder.embed(&bytes) {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(id = %record.id, error = %e, "image unembeddable; skipping");
                    skipped += 1;
                    continue;
                }
            };

            match index.append(vector) {
                Ok(slot) => identity.put(slot, record.id.clone()),
                Err(e) => {
                    warn!(id = %record.id, error = %e, "embedder returned a bad vector; skipping");
                    skipped += 1;
                }
            }
        }

        let indexed = index.len();
        (index, identity, RebuildReport { indexed, skipped })
    }

    fn rebuild_and_persist(
        embedder: &dyn ImageEmbedder,
        store: &ArtifactStore,
        catalog: &Catalog,
        dim: usize,
    ) -> Result<(SlotIndex, IdentityMap)> {
        let (index, identity, report) = Self::rebuild_parts(embedder, store, catalog, dim);
        store.persist_all(&index, &identity, catalog)?;
        info!(
            indexed = report.indexed,
            skipped = report.skipped,
            "index rebuilt at startup"
        );
        Ok((index, identity))
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, EngineState>> {
        self.state
            .read()
            .map_err(|e| EngineError::Storage(format!("Engine state lock poisoned: {}", e)))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, EngineState>> {
        self.state
            .write()
            .map_err(|e| EngineError::Storage(format!("Engine state lock poisoned: {}", e)))
    }
}
