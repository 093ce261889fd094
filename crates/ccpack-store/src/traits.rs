//! PackageStore trait: the abstract interface for installed package bytes.
//!
//! Packages are keyed by the literal pair `{name, version}`. Every backend is
//! write-once: an installed package is never overwritten.

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StoreError};

/// Result of inserting a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// The package was written.
    Inserted,
    /// A package already exists under this identity; nothing was written.
    AlreadyExists,
}

/// Identity of a stored package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageKey {
    pub name: String,
    pub version: String,
}

impl PackageKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Synchronous interface for package persistence.
///
/// # Design Notes
///
/// - **Write-once**: `insert` is an atomic create-if-absent. Inserting under an
///   existing identity returns `AlreadyExists`, even for identical bytes.
/// - **No partial entries**: a failed insert never leaves bytes visible to `get`.
/// - **Validated keys**: all methods reject keys that fail [`validate_key`].
pub trait PackageStore: Send + Sync {
    /// Read the raw bytes of an installed package.
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under the key.
    fn get(&self, name: &str, version: &str) -> Result<Vec<u8>>;

    /// Check whether a package is stored under the key.
    fn exists(&self, name: &str, version: &str) -> Result<bool>;

    /// Store package bytes if the key is free.
    fn insert(&self, name: &str, version: &str, bytes: &[u8]) -> Result<InsertResult>;

    /// List the keys of all stored packages, sorted.
    fn list(&self) -> Result<Vec<PackageKey>>;
}

impl<S: PackageStore + ?Sized> PackageStore for &S {
    fn get(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        (**self).get(name, version)
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        (**self).exists(name, version)
    }

    fn insert(&self, name: &str, version: &str, bytes: &[u8]) -> Result<InsertResult> {
        (**self).insert(name, version, bytes)
    }

    fn list(&self) -> Result<Vec<PackageKey>> {
        (**self).list()
    }
}

impl<S: PackageStore + ?Sized> PackageStore for Arc<S> {
    fn get(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        (**self).get(name, version)
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        (**self).exists(name, version)
    }

    fn insert(&self, name: &str, version: &str, bytes: &[u8]) -> Result<InsertResult> {
        (**self).insert(name, version, bytes)
    }

    fn list(&self) -> Result<Vec<PackageKey>> {
        (**self).list()
    }
}

impl<S: PackageStore + ?Sized> PackageStore for Box<S> {
    fn get(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        (**self).get(name, version)
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        (**self).exists(name, version)
    }

    fn insert(&self, name: &str, version: &str, bytes: &[u8]) -> Result<InsertResult> {
        (**self).insert(name, version, bytes)
    }

    fn list(&self) -> Result<Vec<PackageKey>> {
        (**self).list()
    }
}

/// Check that `{name, version}` can be used as a store key.
///
/// Both parts must be non-empty, must not be `.` or `..`, and must not contain
/// a path separator or NUL. The name must not contain `.`, since the
/// filesystem layout joins the pair as `{name}.{version}` and splits on the
/// first dot when listing.
pub fn validate_key(name: &str, version: &str) -> Result<()> {
    validate_part("name", name)?;
    validate_part("version", version)?;
    if name.contains('.') {
        return Err(StoreError::InvalidKey(format!(
            "name {:?} must not contain '.'",
            name
        )));
    }
    Ok(())
}

fn validate_part(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidKey(format!("{} is empty", what)));
    }
    if value == "." || value == ".." {
        return Err(StoreError::InvalidKey(format!("{} {:?} is reserved", what, value)));
    }
    if value.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidKey(format!(
            "{} {:?} contains a separator or NUL",
            what, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_key("mycc", "1.0").is_ok());
        assert!(validate_key("my-cc_2", "v1.0.0-rc1").is_ok());
    }

    #[test]
    fn test_invalid_keys() {
        for (name, version) in [
            ("", "1.0"),
            ("mycc", ""),
            ("..", "1.0"),
            ("mycc", ".."),
            ("mycc", "."),
            ("a/b", "1.0"),
            ("mycc", "1/0"),
            ("a\\b", "1.0"),
            ("my\0cc", "1.0"),
            ("my.cc", "1.0"),
        ] {
            assert!(
                matches!(validate_key(name, version), Err(StoreError::InvalidKey(_))),
                "accepted {:?}:{:?}",
                name,
                version
            );
        }
    }

    #[test]
    fn test_package_key_ordering() {
        let mut keys = vec![
            PackageKey::new("b", "1.0"),
            PackageKey::new("a", "2.0"),
            PackageKey::new("a", "1.0"),
        ];
        keys.sort();
        assert_eq!(keys[0].to_string(), "a:1.0");
        assert_eq!(keys[2].to_string(), "b:1.0");
    }

    proptest! {
        #[test]
        fn prop_validated_keys_never_escape_root(
            name in "[a-zA-Z0-9_-]{1,16}",
            version in "[a-zA-Z0-9._-]{1,16}",
        ) {
            prop_assume!(version != "." && version != "..");
            prop_assert!(validate_key(&name, &version).is_ok());
            let joined = format!("{}.{}", name, version);
            prop_assert!(!joined.contains('/'));
            let (n, v) = joined.split_once('.').unwrap();
            prop_assert_eq!(n, name.as_str());
            prop_assert_eq!(v, version.as_str());
        }
    }
}
