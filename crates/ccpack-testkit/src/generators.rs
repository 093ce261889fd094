//! Proptest generators for property-based testing.

use proptest::prelude::*;

use ccpack_core::{DeploymentSpec, Keypair};

use crate::fixtures::{cds_bytes, signed_bytes};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a chaincode name usable as a store key.
pub fn chaincode_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}".prop_map(String::from)
}

/// Generate a chaincode version usable as a store key.
pub fn chaincode_version() -> impl Strategy<Value = String> {
    "[0-9]{1,2}\\.[0-9]{1,2}(\\.[0-9]{1,2})?".prop_map(String::from)
}

/// Generate code package bytes of specified max length.
pub fn code_package(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a non-empty instantiation policy.
pub fn policy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=64)
}

/// Generate a deployment spec.
pub fn deployment_spec() -> impl Strategy<Value = DeploymentSpec> {
    (chaincode_name(), chaincode_version(), code_package(512))
        .prop_map(|(name, version, code)| DeploymentSpec::new(name, version, code))
}

/// Parameters for generating an unsigned package.
#[derive(Debug, Clone)]
pub struct CdsParams {
    pub name: String,
    pub version: String,
    pub code: Vec<u8>,
}

impl CdsParams {
    pub fn spec(&self) -> DeploymentSpec {
        DeploymentSpec::new(self.name.clone(), self.version.clone(), self.code.clone())
    }
}

impl Arbitrary for CdsParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (chaincode_name(), chaincode_version(), code_package(512))
            .prop_map(|(name, version, code)| CdsParams {
                name,
                version,
                code,
            })
            .boxed()
    }
}

/// Parameters for generating a signed package.
#[derive(Debug, Clone)]
pub struct SignedParams {
    pub cds: CdsParams,
    pub policy: Vec<u8>,
    /// Owner seeds, in endorsement order. Pairwise distinct.
    pub owner_seeds: Vec<[u8; 32]>,
}

impl SignedParams {
    pub fn owners(&self) -> Vec<Keypair> {
        self.owner_seeds.iter().map(Keypair::from_seed).collect()
    }
}

impl Arbitrary for SignedParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<CdsParams>(),
            policy(),
            prop::collection::btree_set(any::<[u8; 32]>(), 0..=4),
        )
            .prop_map(|(cds, policy, seeds)| SignedParams {
                cds,
                policy,
                owner_seeds: seeds.into_iter().collect(),
            })
            .boxed()
    }
}

/// Raw bytes of the unsigned package described by `params`.
pub fn cds_from_params(params: &CdsParams) -> Vec<u8> {
    cds_bytes(&params.spec())
}

/// Raw bytes of the signed package described by `params`.
pub fn signed_from_params(params: &SignedParams) -> Vec<u8> {
    let owners = params.owners();
    let refs: Vec<&Keypair> = owners.iter().collect();
    signed_bytes(&params.cds.spec(), &params.policy, &refs)
}

/// Flip one bit of `bytes` at `index % len`. Empty input gains a byte.
pub fn flip_byte(bytes: &[u8], index: usize) -> Vec<u8> {
    let mut out = bytes.to_vec();
    if out.is_empty() {
        out.push(0x01);
    } else {
        let i = index % out.len();
        out[i] ^= 0x01;
    }
    out
}
