//! SQLite implementation of the PackageStore trait.
//!
//! Uses rusqlite with bundled SQLite. Write-once is enforced by the table's
//! `(name, version)` primary key and `INSERT OR IGNORE`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{validate_key, InsertResult, PackageKey, PackageStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqlitePackageStore {
    conn: Mutex<Connection>,
}

impl SqlitePackageStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })
    }
}

impl PackageStore for SqlitePackageStore {
    fn get(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        validate_key(name, version)?;
        let conn = self.conn()?;
        conn.query_row(
            "SELECT bytes FROM packages WHERE name = ?1 AND version = ?2",
            params![name, version],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(name, version))
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        validate_key(name, version)?;
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM packages WHERE name = ?1 AND version = ?2",
                params![name, version],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, name: &str, version: &str, bytes: &[u8]) -> Result<InsertResult> {
        validate_key(name, version)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO packages (name, version, bytes, installed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, version, bytes, migration::now_millis()],
        )?;

        Ok(if changed == 0 {
            InsertResult::AlreadyExists
        } else {
            InsertResult::Inserted
        })
    }

    fn list(&self) -> Result<Vec<PackageKey>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT name, version FROM packages ORDER BY name, version")?;
        let keys = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let version: String = row.get(1)?;
                Ok(PackageKey::new(name, version))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let store = SqlitePackageStore::open_memory().unwrap();

        assert!(!store.exists("mycc", "1.0").unwrap());
        assert_eq!(
            store.insert("mycc", "1.0", b"package").unwrap(),
            InsertResult::Inserted
        );
        assert!(store.exists("mycc", "1.0").unwrap());
        assert_eq!(store.get("mycc", "1.0").unwrap(), b"package");
    }

    #[test]
    fn test_write_once() {
        let store = SqlitePackageStore::open_memory().unwrap();
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
        let store = SqlitePackageStore::open_memory().unwrap();
        assert!(matches!(
            store.get("mycc", "1.0"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list() {
        let store = SqlitePackageStore::open_memory().unwrap();
        store.insert("b", "1.0", b"x").unwrap();
        store.insert("a", "2.0", b"x").unwrap();
        store.insert("a", "1.0", b"x").unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec![
                PackageKey::new("a", "1.0"),
                PackageKey::new("a", "2.0"),
                PackageKey::new("b", "1.0"),
            ]
        );
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packages.db");

        {
            let store = SqlitePackageStore::open(&path).unwrap();
            store.insert("mycc", "1.0", b"package").unwrap();
        }

        let store = SqlitePackageStore::open(&path).unwrap();
        assert_eq!(store.get("mycc", "1.0").unwrap(), b"package");
        assert_eq!(
            store.insert("mycc", "1.0", b"other").unwrap(),
            InsertResult::AlreadyExists
        );
    }
}
