//! The provider: package construction, install and lookup over one store.

use std::sync::Arc;

use ccpack_core::{ChaincodeData, DeploymentSpec, HashProvider};
use ccpack_store::PackageStore;
use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::error::{ErrorClass, PackageError, Result};
use crate::package::{CdsPackage, ChaincodePackage, PackageKind, SignedCdsPackage};

/// Summary of an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledChaincode {
    pub name: String,
    pub version: String,
    pub kind: PackageKind,
    /// Hex-encoded hash of the code package.
    pub code_hash: String,
}

/// Entry point for callers that don't know in advance which package variant
/// they hold.
///
/// Owns a store handle and the hash provider every package it creates uses.
pub struct ChaincodeProvider<S: PackageStore> {
    store: S,
    hasher: Arc<dyn HashProvider>,
}

impl<S: PackageStore> ChaincodeProvider<S> {
    /// Create a provider hashing with the configured algorithm.
    pub fn new(store: S, config: &ProviderConfig) -> Result<Self> {
        Ok(Self::with_hasher(store, config.hash_provider()?))
    }

    /// Create a provider with an explicit hash provider.
    pub fn with_hasher(store: S, hasher: Arc<dyn HashProvider>) -> Self {
        Self { store, hasher }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// A fresh, empty unsigned package.
    pub fn cds_package(&self) -> CdsPackage {
        CdsPackage::new(self.hasher.clone())
    }

    /// A fresh, empty signed package.
    pub fn signed_cds_package(&self) -> SignedCdsPackage {
        SignedCdsPackage::new(self.hasher.clone())
    }

    /// Parse raw bytes as whichever variant they are.
    ///
    /// The unsigned variant is tried first. Only an input error moves on to
    /// the signed variant; if that fails too, its error is returned.
    pub fn package_from_buffer(
        &self,
        raw: &[u8],
    ) -> Result<(Box<dyn ChaincodePackage>, ChaincodeData)> {
        let mut cds = self.cds_package();
        match cds.init_from_buffer(raw) {
            Ok(cd) => return Ok((Box::new(cds), cd)),
            Err(e) if e.class() != ErrorClass::Input => return Err(e),
            Err(_) => {}
        }

        let mut signed = self.signed_cds_package();
        let cd = signed.init_from_buffer(raw)?;
        Ok((Box::new(signed), cd))
    }

    /// Parse raw bytes and install them. Fails if the identity is taken.
    pub fn install(&self, raw: &[u8]) -> Result<ChaincodeData> {
        let (package, cd) = self.package_from_buffer(raw)?;
        package.put_chaincode_to_fs(&self.store)?;
        Ok(cd)
    }

    /// Load an installed package of either variant.
    ///
    /// A missing entry, a store failure or a misfiled unsigned package ends
    /// the search without trying the signed variant.
    pub fn package_from_fs(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Box<dyn ChaincodePackage>> {
        let mut cds = self.cds_package();
        match cds.init_from_fs(&self.store, name, version) {
            Ok(_) => return Ok(Box::new(cds)),
            Err(
                e @ (PackageError::NotFound { .. }
                | PackageError::Storage(_)
                | PackageError::IdentityMismatch { .. }),
            ) => return Err(e),
            Err(_) => {}
        }

        let mut signed = self.signed_cds_package();
        signed.init_from_fs(&self.store, name, version)?;
        Ok(Box::new(signed))
    }

    /// Validate an installed package against its ledger record.
    pub fn validate_installed(&self, cd: &ChaincodeData) -> Result<DeploymentSpec> {
        let package = self.package_from_fs(&cd.name, &cd.version)?;
        let spec = package.validate_cc(cd)?;
        Ok(spec.clone())
    }

    /// Every installed package that parses, sorted by identity.
    ///
    /// Entries that fail to load are logged and skipped.
    pub fn installed_chaincodes(&self) -> Result<Vec<InstalledChaincode>> {
        let mut installed = Vec::new();

        for key in self.store.list()? {
            match self.package_from_fs(&key.name, &key.version) {
                Ok(package) => installed.push(InstalledChaincode {
                    name: key.name,
                    version: key.version,
                    kind: package.kind(),
                    code_hash: package.code_hash().map(hex::encode).unwrap_or_default(),
                }),
                Err(e) => {
                    warn!(
                        name = %key.name,
                        version = %key.version,
                        error = %e,
                        "skipping unreadable chaincode package"
                    );
                }
            }
        }

        info!(count = installed.len(), "listed installed chaincodes");
        Ok(installed)
    }
}
