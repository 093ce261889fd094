//! In-memory implementation of the PackageStore trait.
//!
//! This is primarily for testing. It has the same write-once semantics as
//! the persistent backends but keeps everything in memory.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::traits::{validate_key, InsertResult, PackageKey, PackageStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryPackageStore {
    packages: RwLock<HashMap<PackageKey, Vec<u8>>>,
}

impl MemoryPackageStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored packages.
    pub fn len(&self) -> usize {
        self.packages.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Whether the store holds no packages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PackageStore for MemoryPackageStore {
    fn get(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        validate_key(name, version)?;
        let packages = self.packages.read().map_err(|_| StoreError::Poisoned)?;
        packages
            .get(&PackageKey::new(name, version))
            .cloned()
            .ok_or_else(|| StoreError::not_found(name, version))
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        validate_key(name, version)?;
        let packages = self.packages.read().map_err(|_| StoreError::Poisoned)?;
        Ok(packages.contains_key(&PackageKey::new(name, version)))
    }

    fn insert(&self, name: &str, version: &str, bytes: &[u8]) -> Result<InsertResult> {
        validate_key(name, version)?;
        let mut packages = self.packages.write().map_err(|_| StoreError::Poisoned)?;
        match packages.entry(PackageKey::new(name, version)) {
            Entry::Occupied(_) => Ok(InsertResult::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(bytes.to_vec());
                Ok(InsertResult::Inserted)
            }
        }
    }

    fn list(&self) -> Result<Vec<PackageKey>> {
        let packages = self.packages.read().map_err(|_| StoreError::Poisoned)?;
        let mut keys: Vec<_> = packages.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let store = MemoryPackageStore::new();
        assert!(store.is_empty());

        assert_eq!(
            store.insert("mycc", "1.0", b"package").unwrap(),
            InsertResult::Inserted
        );
        assert_eq!(store.get("mycc", "1.0").unwrap(), b"package");
        assert!(store.exists("mycc", "1.0").unwrap());
        assert!(!store.exists("mycc", "1.1").unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_write_once() {
        let store = MemoryPackageStore::new();
        store.insert("mycc", "1.0", b"first").unwrap();
        assert_eq!(
            store.insert("mycc", "1.0", b"second").unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.get("mycc", "1.0").unwrap(), b"first");
    }

    #[test]
    fn test_missing_and_invalid() {
        let store = MemoryPackageStore::new();
        assert!(matches!(
            store.get("mycc", "1.0"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.insert("", "1.0", b"x"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_list_sorted() {
        let store = MemoryPackageStore::new();
        store.insert("zeta", "1.0", b"x").unwrap();
        store.insert("alpha", "1.1", b"x").unwrap();
        store.insert("alpha", "1.0", b"x").unwrap();

        let listed: Vec<String> = store.list().unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(listed, vec!["alpha:1.0", "alpha:1.1", "zeta:1.0"]);
    }
}
