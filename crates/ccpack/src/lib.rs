//! # ccpack
//!
//! Tamper-evident chaincode packages for a permissioned ledger.
//!
//! ## Overview
//!
//! A chaincode package bundles executable code with its identity. Before a
//! package is trusted, the ledger proves that the code, the identity and (for
//! signed packages) the governance metadata are unchanged since the package
//! was registered. This crate provides:
//!
//! - **Packages**: unsigned ([`CdsPackage`]) and signed ([`SignedCdsPackage`])
//!   variants behind one [`ChaincodePackage`] capability
//! - **Validation**: byte-exact comparison of a package's digest record with
//!   the one kept in ledger state
//! - **Install**: write-once persistence into a [`PackageStore`]
//! - **Provider**: variant detection, install and lookup over one store
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ccpack::{ChaincodePackage, ChaincodeProvider, ProviderConfig};
//!
//! let config = ProviderConfig::load("ccpack.json").unwrap();
//! let provider = ChaincodeProvider::new(config.open_fs_store().unwrap(), &config).unwrap();
//!
//! // Install a package and keep the record for the ledger.
//! let raw = std::fs::read("mycc.pkg").unwrap();
//! let cd = provider.install(&raw).unwrap();
//!
//! // Later: prove the installed package is the one registered.
//! let spec = provider.validate_installed(&cd).unwrap();
//! assert_eq!(spec.name(), cd.name);
//! ```
//!
//! ## Re-exports
//!
//! - `ccpack::core` - Records, canonical encoding, hash providers, digests
//! - `ccpack::store` - Package store trait and backends

pub mod config;
pub mod error;
pub mod package;
pub mod provider;

// Re-export component crates
pub use ccpack_core as core;
pub use ccpack_store as store;

// Re-export main types for convenience
pub use config::ProviderConfig;
pub use error::{ErrorClass, PackageError, Result};
pub use package::{
    Cds, CdsPackage, ChaincodePackage, Package, PackageKind, PackageProfile, PackageState,
    SignedCds, SignedCdsPackage, SignedContent,
};
pub use provider::{ChaincodeProvider, InstalledChaincode};

// Re-export commonly used component types
pub use ccpack_core::{
    CdsData, ChaincodeData, DeploymentSpec, DigestField, Envelope, HashAlgorithm, HashProvider,
    Keypair, SignedCdsData, SignedDeploymentSpec,
};
pub use ccpack_store::{FsPackageStore, MemoryPackageStore, PackageStore, SqlitePackageStore};
