//! File-based artifact storage
//!
//! Owns the on-disk layout of the engine's data directory:
//!
//! ```text
//! data/
//! ├── catalog.json     # ordered list of catalog records
//! ├── identity.json    # object mapping slot index (string) -> item id
//! ├── vectors.idx      # header + gzip-compressed vector blob
//! └── images/          # item images, named by each record's image_file
//! ```
//!
//! `catalog.json` and `identity.json` stay human-readable JSON; the vector
//! blob is opaque binary with a 4-byte `[codec, version, 0, 0]` header in
//! front of a gzip-compressed bincode payload.
//!
//! The vector blob and the identity map are a matched pair: loading one
//! without the other, or with mismatched sizes, yields `InconsistentState`
//! so the engine rebuilds instead of serving torn data.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, IdentityMap};
use crate::index::SlotIndex;
use crate::{CatalogRecord, EngineError, Result};

const CATALOG_FILE: &str = "catalog.json";
const IDENTITY_FILE: &str = "identity.json";
const VECTORS_FILE: &str = "vectors.idx";
const IMAGES_DIR: &str = "images";
const TMP_EXTENSION: &str = "tmp";

/// Blob header: [codec_id, version, reserved, reserved]
const HEADER_SIZE: usize = 4;
const BLOB_VERSION: u8 = 1;
const CODEC_NONE: u8 = 0;
const CODEC_GZIP: u8 = 1;

/// Serialized form of the vector index.
#[derive(Serialize, Deserialize)]
struct VectorBlob {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

/// Document wrapper for the catalog file.
#[derive(Serialize, Deserialize)]
struct CatalogDoc {
    items: Vec<CatalogRecord>,
}

/// File-backed store for the engine's persisted artifacts.
///
/// Creates the data directory (and its `images/` folder) on open. All
/// publishes are atomic per file; [`ArtifactStore::persist_all`] stages
/// every temp file before renaming any, so a failure mid-persist leaves the
/// previous consistent triple in place.
#[derive(Debug)]
pub struct ArtifactStore {
    data_dir: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) the storage directory.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the path exists but is not a directory, or if
    /// directory creation fails.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        fs::create_dir_all(data_dir.join(IMAGES_DIR)).map_err(|e| {
            EngineError::Storage(format!(
                "Failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        if !data_dir.is_dir() {
            return Err(EngineError::Storage(format!(
                "Data path is not a directory: {}",
                data_dir.display()
            )));
        }

        Ok(Self { data_dir })
    }

    /// The storage root.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolve an `image_file` name inside the images folder.
    pub fn image_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(IMAGES_DIR).join(file_name)
    }

    /// Check whether a record's backing image exists on disk.
    pub fn image_exists(&self, file_name: &str) -> bool {
        self.image_path(file_name).is_file()
    }

    /// Persist image bytes under the images folder (atomic).
    pub fn write_image(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.image_path(file_name), bytes)
    }

    /// Load the catalog document, or an empty catalog if absent.
    ///
    /// # Errors
    ///
    /// Returns `Json` if the document is unreadable as JSON, or
    /// `DuplicateId` if it contains duplicate record ids. The catalog is
    /// the source of truth; a broken one cannot be regenerated, so this is
    /// a hard failure rather than a degrade-to-empty.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let path = self.data_dir.join(CATALOG_FILE);
        if !path.exists() {
            return Ok(Catalog::new());
        }

        let bytes = fs::read(&path)?;
        let doc: CatalogDoc = serde_json::from_slice(&bytes)?;
        Catalog::from_records(doc.items)
    }

    /// Load the vector blob and identity map as a matched pair.
    ///
    /// Returns `Ok(None)` when neither file exists (fresh data directory).
    ///
    /// # Errors
    ///
    /// * `InconsistentState` - one file present without the other, sizes
    ///   that disagree, or a blob whose dimension differs from
    ///   `expected_dim`
    /// * `Storage` - either file exists but cannot be read or decoded
    pub fn load_index_pair(
        &self,
        expected_dim: usize,
    ) -> Result<Option<(SlotIndex, IdentityMap)>> {
        let vec_path = self.data_dir.join(VECTORS_FILE);
        let id_path = self.data_dir.join(IDENTITY_FILE);

        match (vec_path.exists(), id_path.exists()) {
            (false, false) => return Ok(None),
            (true, false) => {
                return Err(EngineError::InconsistentState(format!(
                    "{} exists without {}",
                    VECTORS_FILE, IDENTITY_FILE
                )))
            }
            (false, true) => {
                return Err(EngineError::InconsistentState(format!(
                    "{} exists without {}",
                    IDENTITY_FILE, VECTORS_FILE
                )))
            }
            (true, true) => {}
        }

        let blob = decode_blob(&fs::read(&vec_path)?)?;
        if blob.dim != expected_dim {
            return Err(EngineError::InconsistentState(format!(
                "vector blob dimension {} does not match configured dimension {}",
                blob.dim, expected_dim
            )));
        }

        let identity: IdentityMap = serde_json::from_slice(&fs::read(&id_path)?)
            .map_err(|e| EngineError::Storage(format!("Failed to parse identity map: {}", e)))?;

        if blob.vectors.len() != identity.len() {
            return Err(EngineError::InconsistentState(format!(
                "index has {} vectors but identity map has {} slots",
                blob.vectors.len(),
                identity.len()
            )));
        }

        let index = SlotIndex::from_vectors(blob.dim, blob.vectors)?;
        Ok(Some((index, identity)))
    }

    /// Persist all three artifacts with staged renames.
    ///
    /// Every temp file is written and synced before any rename happens, so
    /// a failure during staging publishes nothing and the previous triple
    /// stays intact on disk.
    ///
    /// # Errors
    ///
    /// Returns `Storage`/`Io` on any write failure; staged temp files are
    /// cleaned up on the way out.
    pub fn persist_all(
        &self,
        index: &SlotIndex,
        identity: &IdentityMap,
        catalog: &Catalog,
    ) -> Result<()> {
        let blob = encode_blob(index)?;
        let identity_bytes = serde_json::to_vec_pretty(identity)?;
        let catalog_bytes = serde_json::to_vec_pretty(&CatalogDoc {
            items: catalog.records().to_vec(),
        })?;

        let targets = [
            (self.data_dir.join(VECTORS_FILE), blob),
            (self.data_dir.join(IDENTITY_FILE), identity_bytes),
            (self.data_dir.join(CATALOG_FILE), catalog_bytes),
        ];

        // Stage everything first.
        let mut staged = Vec::with_capacity(targets.len());
        for (path, bytes) in &targets {
            match stage(path, bytes) {
                Ok(tmp) => staged.push(tmp),
                Err(e) => {
                    for tmp in staged {
                        let _ = fs::remove_file(tmp);
                    }
                    return Err(e);
                }
            }
        }

        // Publish. Renames within one directory are the cheap, atomic part;
        // a failure here still leaves every un-renamed target at its
        // previous version.
        for ((path, _), tmp) in targets.iter().zip(staged.iter()) {
            fs::rename(tmp, path).map_err(|e| {
                for tmp in &staged {
                    let _ = fs::remove_file(tmp);
                }
                EngineError::Storage(format!(
                    "Failed to publish {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }
}

/// Atomic write: write to a temp file, sync, then rename over the target.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = stage(path, data)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        EngineError::Io(e)
    })?;
    Ok(())
}

/// Write `data` to the temp sibling of `path` and sync it to disk.
fn stage(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let tmp = path.with_extension(TMP_EXTENSION);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    Ok(tmp)
}

/// Serialize and compress the vector index, prefixed with the blob header.
fn encode_blob(index: &SlotIndex) -> Result<Vec<u8>> {
    let payload = bincode::serialize(&VectorBlob {
        dim: index.dim(),
        vectors: index.vectors().to_vec(),
    })?;

    let mut out = vec![CODEC_GZIP, BLOB_VERSION, 0, 0];
    let mut encoder = GzEncoder::new(&mut out, Compression::default());
    encoder
        .write_all(&payload)
        .map_err(|e| EngineError::Storage(format!("Vector blob compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| EngineError::Storage(format!("Vector blob compression failed: {}", e)))?;

    Ok(out)
}

/// Decode a vector blob, validating its header.
fn decode_blob(data: &[u8]) -> Result<VectorBlob> {
    if data.len() < HEADER_SIZE {
        return Err(EngineError::Storage(format!(
            "Vector blob too small: {} bytes",
            data.len()
        )));
    }

    let (codec, version) = (data[0], data[1]);
    if version != BLOB_VERSION {
        return Err(EngineError::Storage(format!(
            "Unsupported vector blob version: {}",
            version
        )));
    }

    let payload = &data[HEADER_SIZE..];
    let decompressed = match codec {
        CODEC_NONE => payload.to_vec(),
        CODEC_GZIP => {
            let mut out = Vec::new();
            GzDecoder::new(payload)
                .read_to_end(&mut out)
                .map_err(|e| {
                    EngineError::Storage(format!("Vector blob decompression failed: {}", e))
                })?;
            out
        }
        other => {
            return Err(EngineError::Storage(format!(
                "Unknown vector blob codec: {}",
                other
            )))
        }
    };

    bincode::deserialize(&decompressed)
        .map_err(|e| EngineError::Storage(format!("Vector blob deserialization failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> CatalogRecord {
        CatalogRecord {
            id: id.to_string(),
            name: format!("Item {}", id),
            image_file: format!("{}.jpg", id),
            calories: 420,
            price: 18_000,
            location: "Kantin Timur".to_string(),
            protein: 15.8,
            carbs: 57.8,
            fat: 14.0,
            description: String::new(),
        }
    }

    fn sample_state() -> (SlotIndex, IdentityMap, Catalog) {
        let mut index = SlotIndex::new(3);
        let mut identity = IdentityMap::new();
        let mut catalog = Catalog::new();

        for (i, id) in ["a", "b"].iter().enumerate() {
            let mut v = vec![0.0; 3];
            v[i] = 1.0;
            let slot = index.append(v).unwrap();
            identity.put(slot, id.to_string());
            catalog.append(record(id)).unwrap();
        }

        (index, identity, catalog)
    }

    #[test]
    fn test_open_creates_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("data");
        let store = ArtifactStore::open(&root).unwrap();

        assert!(root.is_dir());
        assert!(store.image_path("x.jpg").parent().unwrap().is_dir());
    }

    #[test]
    fn test_open_rejects_file_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("occupied");
        fs::write(&file_path, b"x").unwrap();

        assert!(ArtifactStore::open(&file_path).is_err());
    }

    #[test]
    fn test_fresh_directory_loads_empty() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        assert!(store.load_catalog().unwrap().is_empty());
        assert!(store.load_index_pair(3).unwrap().is_none());
    }

    #[test]
    fn test_persist_and_reload_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();

        store.persist_all(&index, &identity, &catalog).unwrap();

        let loaded_catalog = store.load_catalog().unwrap();
        assert_eq!(loaded_catalog.len(), 2);
        assert_eq!(loaded_catalog.records()[0].id, "a");

        let (loaded_index, loaded_identity) =
            store.load_index_pair(3).unwrap().expect("pair present");
        assert_eq!(loaded_index.len(), 2);
        assert_eq!(loaded_identity.get(0), Some("a"));
        assert_eq!(loaded_identity.get(1), Some("b"));

        let hits = loaded_index.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].0, 0);
        assert!(hits[0].1 < 1e-6);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();

        store.persist_all(&index, &identity, &catalog).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == TMP_EXTENSION)
                    .unwrap_or(false)
            })
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_missing_identity_is_inconsistent() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();
        store.persist_all(&index, &identity, &catalog).unwrap();

        fs::remove_file(dir.path().join(IDENTITY_FILE)).unwrap();

        assert!(matches!(
            store.load_index_pair(3),
            Err(EngineError::InconsistentState(_))
        ));
    }

    #[test]
    fn test_missing_blob_is_inconsistent() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();
        store.persist_all(&index, &identity, &catalog).unwrap();

        fs::remove_file(dir.path().join(VECTORS_FILE)).unwrap();

        assert!(matches!(
            store.load_index_pair(3),
            Err(EngineError::InconsistentState(_))
        ));
    }

    #[test]
    fn test_size_mismatch_is_inconsistent() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, mut identity, catalog) = sample_state();

        identity.put(2, "ghost".to_string());
        store.persist_all(&index, &identity, &catalog).unwrap();

        assert!(matches!(
            store.load_index_pair(3),
            Err(EngineError::InconsistentState(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_inconsistent() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();
        store.persist_all(&index, &identity, &catalog).unwrap();

        assert!(matches!(
            store.load_index_pair(512),
            Err(EngineError::InconsistentState(_))
        ));
    }

    #[test]
    fn test_corrupt_blob_is_storage_error() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();
        store.persist_all(&index, &identity, &catalog).unwrap();

        fs::write(dir.path().join(VECTORS_FILE), b"\x01\x01\x00\x00garbage").unwrap();

        assert!(matches!(
            store.load_index_pair(3),
            Err(EngineError::Storage(_))
        ));
    }

    #[test]
    fn test_unsupported_blob_version() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();
        store.persist_all(&index, &identity, &catalog).unwrap();

        fs::write(dir.path().join(VECTORS_FILE), b"\x01\x63\x00\x00").unwrap();

        assert!(matches!(
            store.load_index_pair(3),
            Err(EngineError::Storage(_))
        ));
    }

    #[test]
    fn test_catalog_document_shape() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();
        store.persist_all(&index, &identity, &catalog).unwrap();

        let raw = fs::read_to_string(dir.path().join(CATALOG_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["items"].is_array());
        assert_eq!(value["items"][0]["id"], "a");
        assert_eq!(value["items"][0]["calories"], 420);
    }

    #[test]
    fn test_identity_document_uses_string_keys() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (index, identity, catalog) = sample_state();
        store.persist_all(&index, &identity, &catalog).unwrap();

        let raw = fs::read_to_string(dir.path().join(IDENTITY_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["0"], "a");
        assert_eq!(value["1"], "b");
    }

    #[test]
    fn test_write_image() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        store.write_image("bakso.jpg", b"fake jpeg bytes").unwrap();

        assert!(store.image_exists("bakso.jpg"));
        assert_eq!(
            fs::read(store.image_path("bakso.jpg")).unwrap(),
            b"fake jpeg bytes"
        );
    }

    #[test]
    fn test_repeated_persist_overwrites() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let (mut index, mut identity, mut catalog) = sample_state();

        store.persist_all(&index, &identity, &catalog).unwrap();

        let slot = index.append(vec![0.5, 0.5, 0.0]).unwrap();
        identity.put(slot, "c".to_string());
        catalog.append(record("c")).unwrap();
        store.persist_all(&index, &identity, &catalog).unwrap();

        let (loaded_index, loaded_identity) =
            store.load_index_pair(3).unwrap().expect("pair present");
        assert_eq!(loaded_index.len(), 3);
        assert_eq!(loaded_identity.get(2), Some("c"));
    }
}
