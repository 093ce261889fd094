//! Filesystem implementation of the PackageStore trait.
//!
//! Each package lives in a single file `{root}/{name}.{version}`. Writes go to
//! a temporary file in the same directory, are synced, and are then published
//! with a no-clobber link, so an entry is either absent or complete.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::traits::{validate_key, InsertResult, PackageKey, PackageStore};

/// Prefix of in-flight temporary files, which `list` skips.
const TEMP_PREFIX: &str = ".ccpack-";

/// A package store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsPackageStore {
    root: PathBuf,
}

impl FsPackageStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened filesystem package store");
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a package is stored in.
    pub fn package_path(&self, name: &str, version: &str) -> Result<PathBuf> {
        validate_key(name, version)?;
        Ok(self.root.join(format!("{}.{}", name, version)))
    }
}

impl PackageStore for FsPackageStore {
    fn get(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        let path = self.package_path(name, version)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(name, version))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        let path = self.package_path(name, version)?;
        Ok(path.try_exists()?)
    }

    fn insert(&self, name: &str, version: &str, bytes: &[u8]) -> Result<InsertResult> {
        let path = self.package_path(name, version)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        publish(tmp, &path)
    }

    fn list(&self) -> Result<Vec<PackageKey>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with(TEMP_PREFIX) {
                continue;
            }
            match file_name.split_once('.') {
                Some((name, version)) if validate_key(name, version).is_ok() => {
                    keys.push(PackageKey::new(name, version));
                }
                _ => warn!(file = file_name, "ignoring unrecognized file in package store"),
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Link the finished temp file into place unless the target exists.
///
/// On failure the temp file is dropped and removed.
fn publish(tmp: NamedTempFile, path: &Path) -> Result<InsertResult> {
    match tmp.persist_noclobber(path) {
        Ok(_) => {
            if let Some(dir) = path.parent() {
                sync_dir(dir);
            }
            Ok(InsertResult::Inserted)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            Ok(InsertResult::AlreadyExists)
        }
        Err(e) => Err(e.error.into()),
    }
}

/// Flush the directory entry so the rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        warn!(dir = %dir.display(), error = %e, "failed to sync package store directory");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsPackageStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPackageStore::open(dir.path().join("chaincodes")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_insert_and_get() {
        let (_dir, store) = store();

        assert!(!store.exists("mycc", "1.0").unwrap());
        assert_eq!(
            store.insert("mycc", "1.0", b"package").unwrap(),
            InsertResult::Inserted
        );
        assert!(store.exists("mycc", "1.0").unwrap());
        assert_eq!(store.get("mycc", "1.0").unwrap(), b"package");
        assert!(store.root().join("mycc.1.0").is_file());
    }

    #[test]
    fn test_write_once() {
        let (_dir, store) = store();

        store.insert("mycc", "1.0", b"first").unwrap();
        assert_eq!(
            store.insert("mycc", "1.0", b"first").unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(
            store.insert("mycc", "1.0", b"second").unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.get("mycc", "1.0").unwrap(), b"first");
    }

    #[test]
    fn test_get_missing() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get("mycc", "1.0"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_keys() {
        let (_dir, store) = store();
        assert!(matches!(
            store.insert("../evil", "1.0", b"x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get("mycc", ".."),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_list_skips_temp_and_foreign_files() {
        let (_dir, store) = store();
        store.insert("b", "1.0", b"x").unwrap();
        store.insert("a", "2.0", b"x").unwrap();
        fs::write(store.root().join(".ccpack-leftover"), b"partial").unwrap();
        fs::write(store.root().join("README"), b"hello").unwrap();
        fs::create_dir(store.root().join("sub.dir")).unwrap();

        let keys = store.list().unwrap();
        assert_eq!(
            keys,
            vec![PackageKey::new("a", "2.0"), PackageKey::new("b", "1.0")]
        );
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (_dir, store) = store();
        store.insert("mycc", "1.0", b"x").unwrap();
        store.insert("mycc", "1.0", b"y").unwrap();

        let names: Vec<_> = fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["mycc.1.0".to_string()]);
    }

    #[test]
    fn test_concurrent_installers_single_winner() {
        let (_dir, store) = store();

        let results: Vec<InsertResult> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8u8)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || store.insert("mycc", "1.0", &[i; 64]).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let inserted = results
            .iter()
            .filter(|r| **r == InsertResult::Inserted)
            .count();
        assert_eq!(inserted, 1);

        let bytes = store.get("mycc", "1.0").unwrap();
        assert_eq!(bytes.len(), 64);
        assert!(bytes.iter().all(|b| *b == bytes[0]));
    }
}
