//! Provider configuration.
//!
//! Replaces the ambient install path and hash factory with an explicit value
//! that is handed to [`ChaincodeProvider::new`](crate::ChaincodeProvider::new).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ccpack_core::{HashAlgorithm, HashProvider};
use ccpack_store::FsPackageStore;
use serde::{Deserialize, Serialize};

use crate::error::{PackageError, Result};

/// Where packages are installed and how they are hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Root directory of the filesystem package store.
    pub install_path: PathBuf,
    /// Digest algorithm name, e.g. `"SHA2-256"` or `"BLAKE3"`.
    pub hash_algorithm: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            install_path: PathBuf::from("./chaincodes"),
            hash_algorithm: HashAlgorithm::Sha256.as_str().to_string(),
        }
    }
}

impl ProviderConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PackageError::Config(e.to_string()))
    }

    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PackageError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// The configured digest algorithm.
    pub fn algorithm(&self) -> Result<HashAlgorithm> {
        Ok(self.hash_algorithm.parse::<HashAlgorithm>()?)
    }

    /// A hash provider for the configured algorithm.
    pub fn hash_provider(&self) -> Result<Arc<dyn HashProvider>> {
        Ok(self.algorithm()?.provider())
    }

    /// Open the filesystem store at `install_path`, creating it if needed.
    pub fn open_fs_store(&self) -> Result<FsPackageStore> {
        Ok(FsPackageStore::open(&self.install_path)?)
    }
}
