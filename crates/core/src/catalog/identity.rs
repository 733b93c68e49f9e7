//! Slot → item id mapping

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bijective mapping from index slot to catalog item id.
///
/// The map's domain must mirror the set of valid slots in the vector index;
/// the engine checks that invariant at load time and refuses to serve from a
/// torn pair. Serialized as a JSON object whose keys are stringified slot
/// indices:
///
/// ```json
/// { "0": "nasi_goreng", "1": "sate_ayam" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityMap {
    slots: BTreeMap<usize, String>,
}

impl IdentityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `slot` holds the vector for `id`.
    pub fn put(&mut self, slot: usize, id: String) {
        self.slots.insert(slot, id);
    }

    /// Resolve a slot to its item id.
    pub fn get(&self, slot: usize) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Number of mapped slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reset the map to empty. Only rebuilds call this.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Iterate `(slot, id)` pairs in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.slots.iter().map(|(&slot, id)| (slot, id.as_str()))
    }
}
