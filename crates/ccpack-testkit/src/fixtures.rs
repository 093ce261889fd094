//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use ccpack::{ChaincodeProvider, ProviderConfig};
use ccpack_core::{
    create_package_envelope, sign_existing_package, CanonicalEncode, DeploymentSpec, Keypair,
    SignedDeploymentSpec,
};
use ccpack_store::MemoryPackageStore;

/// A test fixture with package owners and a provider over a memory store.
pub struct TestFixture {
    pub owners: Vec<Keypair>,
    pub provider: ChaincodeProvider<MemoryPackageStore>,
}

impl TestFixture {
    /// Create a fixture with two deterministic owners and SHA-256 hashing.
    pub fn new() -> Self {
        Self::with_config(&ProviderConfig::default())
    }

    /// Create a fixture hashing with the configured algorithm.
    ///
    /// # Panics
    ///
    /// If the configured algorithm is unknown.
    pub fn with_config(config: &ProviderConfig) -> Self {
        Self {
            owners: vec![
                Keypair::from_seed(&[0x01; 32]),
                Keypair::from_seed(&[0x02; 32]),
            ],
            provider: ChaincodeProvider::new(MemoryPackageStore::new(), config)
                .expect("fixture config must name a known hash algorithm"),
        }
    }

    /// Raw bytes of an unsigned package.
    pub fn make_cds(&self, name: &str, version: &str, code: &[u8]) -> Vec<u8> {
        cds_bytes(&DeploymentSpec::new(name, version, code.to_vec()))
    }

    /// Raw bytes of a signed package endorsed by every fixture owner.
    pub fn make_signed(
        &self,
        name: &str,
        version: &str,
        code: &[u8],
        policy: &[u8],
    ) -> Vec<u8> {
        let owners: Vec<&Keypair> = self.owners.iter().collect();
        signed_bytes(&DeploymentSpec::new(name, version, code.to_vec()), policy, &owners)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a deployment spec as an unsigned package.
pub fn cds_bytes(spec: &DeploymentSpec) -> Vec<u8> {
    spec.canonical_bytes()
}

/// Wrap a deployment spec as a signed package, endorsed by `owners` in order.
///
/// An empty `policy` is written as-is, producing a package that fails to load.
pub fn signed_bytes(spec: &DeploymentSpec, policy: &[u8], owners: &[&Keypair]) -> Vec<u8> {
    let mut signed = SignedDeploymentSpec {
        deployment_spec: spec.canonical_bytes().into(),
        instantiation_policy: policy.to_vec(),
        owner_endorsements: Vec::new(),
    };
    for owner in owners {
        signed = sign_existing_package(&signed, owner);
    }
    create_package_envelope(&signed, "", None).canonical_bytes()
}
