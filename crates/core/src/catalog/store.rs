//! Ordered catalog of item records

use std::collections::HashMap;

use crate::{CatalogRecord, EngineError, Result};

/// Insertion-ordered collection of catalog records with unique ids.
///
/// Records keep the order they were appended in; rebuilds walk this order
/// to assign slots deterministically. An id → position map is maintained
/// alongside the list so resolving a search hit is O(1) instead of a scan
/// over the whole catalog.
///
/// # Examples
/// ```
/// use platelens_core::catalog::Catalog;
/// use platelens_core::CatalogRecord;
///
/// let mut catalog = Catalog::new();
/// catalog.append(CatalogRecord {
///     id: "nasi_goreng".into(),
///     name: "Nasi Goreng".into(),
///     image_file: "nasi_goreng.jpg".into(),
///     calories: 450,
///     price: 25_000,
///     location: "Warung Bu Sri".into(),
///     protein: 16.9,
///     carbs: 61.9,
///     fat: 15.0,
///     description: "Fried rice with egg".into(),
/// }).unwrap();
///
/// assert_eq!(catalog.len(), 1);
/// assert!(catalog.get("nasi_goreng").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from records already in order.
    ///
    /// # Errors
    ///
    /// * `DuplicateId` - if two records share an id
    pub fn from_records(records: Vec<CatalogRecord>) -> Result<Self> {
        let mut catalog = Self::new();
        for record in records {
            catalog.append(record)?;
        }
        Ok(catalog)
    }

    /// Append a record at the end of the catalog.
    ///
    /// # Errors
    ///
    /// * `DuplicateId` - if a record with the same id already exists
    pub fn append(&mut self, record: CatalogRecord) -> Result<()> {
        if self.by_id.contains_key(&record.id) {
            return Err(EngineError::DuplicateId(record.id));
        }

        self.by_id.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&CatalogRecord> {
        self.by_id.get(id).map(|&pos| &self.records[pos])
    }

    /// Check whether an id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    /// Number of records, indexed or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> CatalogRecord {
        CatalogRecord {
            id: id.to_string(),
            name: name.to_string(),
            image_file: format!("{}.jpg", id),
            calories: 300,
            price: 15_000,
            location: "Kantin".to_string(),
            protein: 11.3,
            carbs: 37.5,
            fat: 11.7,
            description: String::new(),
        }
    }

    #[test]
    fn test_append_and_get() {
        let mut catalog = Catalog::new();
        catalog.append(record("sate_ayam", "Sate Ayam")).unwrap();

        let found = catalog.get("sate_ayam").unwrap();
        assert_eq!(found.name, "Sate Ayam");
        assert!(catalog.get("rendang").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut catalog = Catalog::new();
        catalog.append(record("bakso", "Bakso")).unwrap();

        let result = catalog.append(record("bakso", "Bakso Urat"));
        assert!(matches!(result, Err(EngineError::DuplicateId(id)) if id == "bakso"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut catalog = Catalog::new();
        for id in ["c", "a", "b"] {
            catalog.append(record(id, id)).unwrap();
        }

        let ids: Vec<&str> = catalog.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_from_records() {
        let catalog =
            Catalog::from_records(vec![record("a", "A"), record("b", "B")]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("a"));
        assert!(catalog.contains("b"));
    }

    #[test]
    fn test_from_records_duplicate() {
        let result = Catalog::from_records(vec![record("a", "A"), record("a", "A2")]);
        assert!(matches!(result, Err(EngineError::DuplicateId(_))));
    }

    #[test]
    fn test_lookup_after_many_appends() {
        let mut catalog = Catalog::new();
        for i in 0..100 {
            catalog.append(record(&format!("item{}", i), "Item")).unwrap();
        }

        let found = catalog.get("item73").unwrap();
        assert_eq!(found.id, "item73");
    }
}
