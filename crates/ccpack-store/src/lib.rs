//! # ccpack store
//!
//! Local package store for installed chaincode packages. Provides a
//! trait-based interface with filesystem, SQLite and in-memory backends.
//!
//! ## Key Types
//!
//! - [`PackageStore`] - The trait for all storage operations
//! - [`FsPackageStore`] - One file per package under a root directory
//! - [`SqlitePackageStore`] - SQLite-based persistent storage
//! - [`MemoryPackageStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a package
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ccpack_store::{FsPackageStore, InsertResult, PackageStore};
//!
//! let store = FsPackageStore::open("./chaincodes").unwrap();
//! match store.insert("mycc", "1.0", b"package bytes").unwrap() {
//!     InsertResult::Inserted => {}
//!     InsertResult::AlreadyExists => eprintln!("mycc:1.0 is already installed"),
//! }
//! let bytes = store.get("mycc", "1.0").unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once**: inserting under an existing `{name, version}` returns
//!   `AlreadyExists` and leaves the stored bytes untouched
//! - **Atomic publish**: concurrent installers of one identity produce exactly
//!   one winner, and readers never see a partial package

pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsPackageStore;
pub use memory::MemoryPackageStore;
pub use sqlite::SqlitePackageStore;
pub use traits::{validate_key, InsertResult, PackageKey, PackageStore};
