//! # ccpack core
//!
//! Pure primitives for chaincode packages: records, canonical encoding,
//! hash providers and digest records.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! the structured records that make up a package.
//!
//! ## Key Types
//!
//! - [`DeploymentSpec`] - Chaincode identity plus executable bytes
//! - [`SignedDeploymentSpec`] - A deployment spec with instantiation policy and owner endorsements
//! - [`Envelope`] - Generic signed container carrying a signed package
//! - [`CdsData`] / [`SignedCdsData`] - Digest records persisted by the ledger
//! - [`ChaincodeData`] - The ledger-facing record wrapping a digest record
//! - [`HashProvider`] - Pluggable hash factory
//!
//! ## Canonicalization
//!
//! All records are encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod digest;
pub mod envelope;
pub mod error;
pub mod packaging;
pub mod types;

pub use canonical::{CanonicalDecode, CanonicalEncode};
pub use crypto::{
    Blake3Provider, Ed25519PublicKey, HashAlgorithm, HashProvider, HashState, Keypair,
    Sha256Provider,
};
pub use digest::{
    compute_cds_data, compute_signed_cds_data, CdsData, ComputedDigest, DigestField,
    DigestRecord, SignedCdsData,
};
pub use envelope::{
    extract_signed_deployment_spec, ChannelHeader, Envelope, Header, HeaderType, Payload,
};
pub use error::{CoreError, Result};
pub use packaging::{
    create_package_envelope, merge_owner_packages, owner_create_signed_spec,
    sign_existing_package,
};
pub use types::{
    ChaincodeData, ChaincodeId, ChaincodeInput, ChaincodeSpec, ChaincodeType, DeploymentSpec,
    Endorsement, ExecutionEnvironment, SignedDeploymentSpec,
};
