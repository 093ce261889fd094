//! Digest records: the persisted integrity proof of a package.
//!
//! A digest record splits a package's fingerprint into independent hashes:
//!
//! - `code_hash = H(code_package)`
//! - `metadata_hash = H(name || version)`, two writes, no delimiter
//! - `signature_hash = H(instantiation_policy || endorser_1 || ... || endorser_n)`
//!   (signed packages only, endorsers in their given order)
//!
//! Unsigned packages produce a [`CdsData`], signed packages a
//! [`SignedCdsData`]. Both encode canonically and are decoded strictly by
//! profile, so one kind of record is never accepted in place of the other.

use std::fmt;

use ciborium::value::Value;

use crate::canonical::{bytes_value, entry, CanonicalDecode, CanonicalEncode, MapView};
use crate::crypto::{HashProvider, HashState};
use crate::error::{CoreError, Result};
use crate::types::{DeploymentSpec, SignedDeploymentSpec};

/// Record keys shared by both profiles.
mod keys {
    pub const CODE_HASH: u64 = 1;
    pub const METADATA_HASH: u64 = 2;
    pub const SIGNATURE_HASH: u64 = 3;
}

/// Names one hash inside a digest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestField {
    CodeHash,
    MetadataHash,
    SignatureHash,
}

impl fmt::Display for DigestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DigestField::CodeHash => "code hash",
            DigestField::MetadataHash => "metadata hash",
            DigestField::SignatureHash => "signature hash",
        })
    }
}

/// Common behaviour of the two digest record profiles.
pub trait DigestRecord: CanonicalEncode + CanonicalDecode + Clone + fmt::Debug {
    /// Every hash in the record, in key order.
    fn fields(&self) -> Vec<(DigestField, &[u8])>;

    /// The fields whose bytes differ from `other`. Every field is compared.
    fn mismatched_fields(&self, other: &Self) -> Vec<DigestField> {
        self.fields()
            .into_iter()
            .zip(other.fields())
            .filter(|((_, mine), (_, theirs))| mine != theirs)
            .map(|((field, _), _)| field)
            .collect()
    }

    /// Byte-exact equality. An absent record is never equal.
    fn equals(&self, other: Option<&Self>) -> bool {
        match other {
            Some(other) => self.mismatched_fields(other).is_empty(),
            None => false,
        }
    }
}

/// Digest record of an unsigned package. Keys: 1 code_hash, 2 metadata_hash.
#[derive(Clone, PartialEq, Eq)]
pub struct CdsData {
    pub code_hash: Vec<u8>,
    pub metadata_hash: Vec<u8>,
}

/// Digest record of a signed package.
///
/// Keys: 1 code_hash, 2 metadata_hash, 3 signature_hash.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedCdsData {
    pub code_hash: Vec<u8>,
    pub metadata_hash: Vec<u8>,
    pub signature_hash: Vec<u8>,
}

impl DigestRecord for CdsData {
    fn fields(&self) -> Vec<(DigestField, &[u8])> {
        vec![
            (DigestField::CodeHash, self.code_hash.as_slice()),
            (DigestField::MetadataHash, self.metadata_hash.as_slice()),
        ]
    }
}

impl DigestRecord for SignedCdsData {
    fn fields(&self) -> Vec<(DigestField, &[u8])> {
        vec![
            (DigestField::CodeHash, self.code_hash.as_slice()),
            (DigestField::MetadataHash, self.metadata_hash.as_slice()),
            (DigestField::SignatureHash, self.signature_hash.as_slice()),
        ]
    }
}

impl fmt::Debug for CdsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdsData")
            .field("code_hash", &hex::encode(&self.code_hash))
            .field("metadata_hash", &hex::encode(&self.metadata_hash))
            .finish()
    }
}

impl fmt::Debug for SignedCdsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedCdsData")
            .field("code_hash", &hex::encode(&self.code_hash))
            .field("metadata_hash", &hex::encode(&self.metadata_hash))
            .field("signature_hash", &hex::encode(&self.signature_hash))
            .finish()
    }
}

/// A computed digest record together with its canonical encoding.
#[derive(Debug, Clone)]
pub struct ComputedDigest<R> {
    pub record: R,
    pub encoded: Vec<u8>,
}

impl<R: DigestRecord> ComputedDigest<R> {
    fn new(record: R) -> Self {
        let encoded = record.canonical_bytes();
        Self { record, encoded }
    }
}

/// Hash the code package and the identity, resetting in between.
fn code_and_metadata_hashes(
    spec: &DeploymentSpec,
    hash: &mut dyn HashState,
) -> (Vec<u8>, Vec<u8>) {
    hash.write(&spec.code_package);
    let code_hash = hash.sum(None);

    hash.reset();

    hash.write(spec.name().as_bytes());
    hash.write(spec.version().as_bytes());
    let metadata_hash = hash.sum(None);

    (code_hash, metadata_hash)
}

/// Compute the digest record of an unsigned package.
pub fn compute_cds_data(
    spec: &DeploymentSpec,
    provider: &dyn HashProvider,
) -> Result<ComputedDigest<CdsData>> {
    let mut hash = provider.new_hash()?;
    let (code_hash, metadata_hash) = code_and_metadata_hashes(spec, hash.as_mut());

    Ok(ComputedDigest::new(CdsData {
        code_hash,
        metadata_hash,
    }))
}

/// Compute the digest record of a signed package.
///
/// `spec` must be the deployment spec decoded from `signed.deployment_spec`.
/// Fails with [`CoreError::PolicyMissing`] if the instantiation policy is empty.
pub fn compute_signed_cds_data(
    signed: &SignedDeploymentSpec,
    spec: &DeploymentSpec,
    provider: &dyn HashProvider,
) -> Result<ComputedDigest<SignedCdsData>> {
    if signed.instantiation_policy.is_empty() {
        return Err(CoreError::PolicyMissing {
            name: spec.name().to_string(),
            version: spec.version().to_string(),
        });
    }

    let mut hash = provider.new_hash()?;
    let (code_hash, metadata_hash) = code_and_metadata_hashes(spec, hash.as_mut());

    hash.reset();

    hash.write(&signed.instantiation_policy);
    for endorsement in &signed.owner_endorsements {
        hash.write(&endorsement.endorser);
    }
    let signature_hash = hash.sum(None);

    Ok(ComputedDigest::new(SignedCdsData {
        code_hash,
        metadata_hash,
        signature_hash,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical encoding
// ─────────────────────────────────────────────────────────────────────────────

impl CanonicalEncode for CdsData {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(keys::CODE_HASH, bytes_value(&self.code_hash)),
            entry(keys::METADATA_HASH, bytes_value(&self.metadata_hash)),
        ])
    }
}

impl CanonicalDecode for CdsData {
    const RECORD: &'static str = "chaincode digest record";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        if map.contains(keys::SIGNATURE_HASH) {
            return Err(CoreError::decoding(
                Self::RECORD,
                "signed digest record supplied for an unsigned package",
            ));
        }
        Ok(Self {
            code_hash: map.bytes(keys::CODE_HASH, "code_hash")?,
            metadata_hash: map.bytes(keys::METADATA_HASH, "metadata_hash")?,
        })
    }
}

impl CanonicalEncode for SignedCdsData {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(keys::CODE_HASH, bytes_value(&self.code_hash)),
            entry(keys::METADATA_HASH, bytes_value(&self.metadata_hash)),
            entry(keys::SIGNATURE_HASH, bytes_value(&self.signature_hash)),
        ])
    }
}

impl CanonicalDecode for SignedCdsData {
    const RECORD: &'static str = "signed chaincode digest record";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        Ok(Self {
            code_hash: map.bytes(keys::CODE_HASH, "code_hash")?,
            metadata_hash: map.bytes(keys::METADATA_HASH, "metadata_hash")?,
            signature_hash: map.bytes(keys::SIGNATURE_HASH, "signature_hash")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Blake3Provider, Sha256Provider};
    use crate::types::Endorsement;

    fn spec() -> DeploymentSpec {
        DeploymentSpec::new("mycc", "1.0", b"abc".to_vec())
    }

    fn signed(policy: &[u8], endorsers: &[&[u8]]) -> SignedDeploymentSpec {
        SignedDeploymentSpec {
            deployment_spec: spec().canonical_bytes().into(),
            instantiation_policy: policy.to_vec(),
            owner_endorsements: endorsers
                .iter()
                .map(|e| Endorsement {
                    endorser: e.to_vec(),
                    signature: b"sig".to_vec(),
                })
                .collect(),
        }
    }

    fn sha256(parts: &[&[u8]]) -> Vec<u8> {
        let mut h = Sha256Provider.new_hash().unwrap();
        for p in parts {
            h.write(p);
        }
        h.sum(None)
    }

    #[test]
    fn test_cds_data_known_hashes() {
        let digest = compute_cds_data(&spec(), &Sha256Provider).unwrap();
        assert_eq!(
            hex::encode(&digest.record.code_hash),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hex::encode(&digest.record.metadata_hash),
            "071f14291e152bb2ae88e7fdf9e5a774d313616ba3154a84f6a0d45a175f6326"
        );
        assert_eq!(digest.encoded, digest.record.canonical_bytes());
    }

    #[test]
    fn test_signed_cds_data_hash_layout() {
        let sds = signed(b"policy", &[b"org1", b"org2"]);
        let digest = compute_signed_cds_data(&sds, &spec(), &Sha256Provider).unwrap();

        assert_eq!(digest.record.code_hash, sha256(&[b"abc"]));
        assert_eq!(digest.record.metadata_hash, sha256(&[b"mycc", b"1.0"]));
        assert_eq!(
            digest.record.signature_hash,
            sha256(&[b"policy", b"org1", b"org2"])
        );
    }

    #[test]
    fn test_signed_cds_data_requires_policy() {
        let sds = signed(b"", &[b"org1"]);
        let err = compute_signed_cds_data(&sds, &spec(), &Sha256Provider).unwrap_err();
        match err {
            CoreError::PolicyMissing { name, version } => {
                assert_eq!(name, "mycc");
                assert_eq!(version, "1.0");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_endorsement_order_changes_signature_hash() {
        let forward = signed(b"p", &[b"org1", b"org2"]);
        let reversed = signed(b"p", &[b"org2", b"org1"]);
        let a = compute_signed_cds_data(&forward, &spec(), &Sha256Provider).unwrap();
        let b = compute_signed_cds_data(&reversed, &spec(), &Sha256Provider).unwrap();

        assert_eq!(a.record.code_hash, b.record.code_hash);
        assert_ne!(a.record.signature_hash, b.record.signature_hash);
        assert_eq!(
            a.record.mismatched_fields(&b.record),
            vec![DigestField::SignatureHash]
        );
    }

    #[test]
    fn test_provider_changes_digest() {
        let a = compute_cds_data(&spec(), &Sha256Provider).unwrap();
        let b = compute_cds_data(&spec(), &Blake3Provider).unwrap();
        assert!(!a.record.equals(Some(&b.record)));
    }

    #[test]
    fn test_equals_never_vacuous() {
        let record = compute_cds_data(&spec(), &Sha256Provider).unwrap().record;
        assert!(record.equals(Some(&record.clone())));
        assert!(!record.equals(None));
    }

    #[test]
    fn test_mismatch_reports_every_field() {
        let a = CdsData {
            code_hash: vec![1],
            metadata_hash: vec![2],
        };
        let b = CdsData {
            code_hash: vec![9],
            metadata_hash: vec![8],
        };
        assert_eq!(
            a.mismatched_fields(&b),
            vec![DigestField::CodeHash, DigestField::MetadataHash]
        );
    }

    #[test]
    fn test_records_decode_strictly_by_profile() {
        let sds = signed(b"policy", &[]);
        let signed_bytes = compute_signed_cds_data(&sds, &spec(), &Sha256Provider)
            .unwrap()
            .encoded;
        let unsigned_bytes = compute_cds_data(&spec(), &Sha256Provider).unwrap().encoded;

        assert!(CdsData::from_canonical_bytes(&signed_bytes).is_err());
        assert!(SignedCdsData::from_canonical_bytes(&unsigned_bytes).is_err());
        assert!(CdsData::from_canonical_bytes(&unsigned_bytes).is_ok());
        assert!(SignedCdsData::from_canonical_bytes(&signed_bytes).is_ok());
    }

    #[test]
    fn test_debug_is_hex() {
        let record = CdsData {
            code_hash: vec![0xab, 0xcd],
            metadata_hash: vec![0x01],
        };
        let debug = format!("{:?}", record);
        assert!(debug.contains("abcd"));
    }

    struct BrokenProvider;

    impl HashProvider for BrokenProvider {
        fn new_hash(&self) -> Result<Box<dyn HashState>> {
            Err(CoreError::HashProvider("not initialized".into()))
        }

        fn algorithm(&self) -> crate::crypto::HashAlgorithm {
            crate::crypto::HashAlgorithm::Sha256
        }
    }

    #[test]
    fn test_hash_provider_failure_propagates() {
        assert!(matches!(
            compute_cds_data(&spec(), &BrokenProvider),
            Err(CoreError::HashProvider(_))
        ));
        assert!(matches!(
            compute_signed_cds_data(&signed(b"p", &[]), &spec(), &BrokenProvider),
            Err(CoreError::HashProvider(_))
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn endorsed(policy: Vec<u8>, endorsers: &[Vec<u8>]) -> SignedDeploymentSpec {
            let refs: Vec<&[u8]> = endorsers.iter().map(Vec::as_slice).collect();
            let mut sds = signed(b"", &refs);
            sds.instantiation_policy = policy;
            sds
        }

        proptest! {
            #[test]
            fn test_metadata_hash_ignores_split_point(
                identity in "[a-z0-9.]{2,24}",
                cut in any::<prop::sample::Index>(),
            ) {
                let at = cut.index(identity.len() - 1) + 1;
                let (name, version) = identity.split_at(at);
                let split = DeploymentSpec::new(name, version, b"abc".to_vec());
                let digest = compute_cds_data(&split, &Sha256Provider).unwrap();
                prop_assert_eq!(digest.record.metadata_hash, sha256(&[identity.as_bytes()]));
            }

            #[test]
            fn test_code_change_touches_only_code_hash(
                code in prop::collection::vec(any::<u8>(), 0..256),
                extra in any::<u8>(),
            ) {
                let original = DeploymentSpec::new("mycc", "1.0", code.clone());
                let mut longer = code;
                longer.push(extra);
                let changed = DeploymentSpec::new("mycc", "1.0", longer);

                let a = compute_cds_data(&original, &Sha256Provider).unwrap().record;
                let b = compute_cds_data(&changed, &Sha256Provider).unwrap().record;
                prop_assert_eq!(a.mismatched_fields(&b), vec![DigestField::CodeHash]);
            }

            #[test]
            fn test_policy_or_endorser_change_touches_only_signature_hash(
                policy in prop::collection::vec(any::<u8>(), 1..64),
                endorsers in prop::collection::vec(
                    prop::collection::vec(any::<u8>(), 32),
                    0..4,
                ),
                extra in prop::collection::vec(any::<u8>(), 32),
            ) {
                let base = endorsed(policy.clone(), &endorsers);
                let a = compute_signed_cds_data(&base, &spec(), &Sha256Provider)
                    .unwrap()
                    .record;

                let mut more = endorsers.clone();
                more.push(extra);
                let added = endorsed(policy.clone(), &more);
                let b = compute_signed_cds_data(&added, &spec(), &Sha256Provider)
                    .unwrap()
                    .record;
                prop_assert_eq!(a.mismatched_fields(&b), vec![DigestField::SignatureHash]);

                let mut longer_policy = policy;
                longer_policy.push(0);
                let repoliced = endorsed(longer_policy, &endorsers);
                let c = compute_signed_cds_data(&repoliced, &spec(), &Sha256Provider)
                    .unwrap()
                    .record;
                prop_assert_eq!(a.mismatched_fields(&c), vec![DigestField::SignatureHash]);
            }
        }
    }
}
