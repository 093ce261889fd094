//! Golden digest vectors.
//!
//! Known inputs with their SHA-256 digest records. Any implementation of the
//! digest profiles must reproduce these hashes exactly.

use ccpack::{CdsPackage, ChaincodePackage, SignedCdsPackage};
use ccpack_core::{CdsData, DeploymentSpec, Keypair, SignedCdsData};

use crate::fixtures::{cds_bytes, signed_bytes};

/// A golden digest vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub chaincode_name: &'static str,
    pub chaincode_version: &'static str,
    pub code: &'static [u8],
    /// Instantiation policy. `None` for an unsigned package.
    pub policy: Option<&'static [u8]>,
    /// Seed bytes of each endorsing owner, in endorsement order.
    /// Each owner's key is derived from `[seed; 32]`.
    pub owner_seeds: &'static [u8],
    /// Expected code hash (hex).
    pub code_hash: &'static str,
    /// Expected metadata hash (hex).
    pub metadata_hash: &'static str,
    /// Expected signature hash (hex), signed vectors only.
    pub signature_hash: Option<&'static str>,
}

const H_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
const H_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
const H_HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
const H_MYCC_1_0: &str = "071f14291e152bb2ae88e7fdf9e5a774d313616ba3154a84f6a0d45a175f6326";

/// Get all golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "unsigned mycc 1.0",
            chaincode_name: "mycc",
            chaincode_version: "1.0",
            code: b"abc",
            policy: None,
            owner_seeds: &[],
            code_hash: H_ABC,
            metadata_hash: H_MYCC_1_0,
            signature_hash: None,
        },
        GoldenVector {
            name: "unsigned empty code",
            chaincode_name: "mycc",
            chaincode_version: "1.0",
            code: b"",
            policy: None,
            owner_seeds: &[],
            code_hash: H_EMPTY,
            metadata_hash: H_MYCC_1_0,
            signature_hash: None,
        },
        GoldenVector {
            // name || version has no delimiter
            name: "unsigned shifted identity",
            chaincode_name: "myc",
            chaincode_version: "c1.0",
            code: b"hello",
            policy: None,
            owner_seeds: &[],
            code_hash: H_HELLO,
            metadata_hash: H_MYCC_1_0,
            signature_hash: None,
        },
        GoldenVector {
            name: "signed without endorsements",
            chaincode_name: "mycc",
            chaincode_version: "1.0",
            code: b"abc",
            policy: Some(b"abc"),
            owner_seeds: &[],
            code_hash: H_ABC,
            metadata_hash: H_MYCC_1_0,
            signature_hash: Some(H_ABC),
        },
        GoldenVector {
            name: "signed by one owner",
            chaincode_name: "mycc",
            chaincode_version: "1.0",
            code: b"abc",
            policy: Some(b"policy"),
            owner_seeds: &[0x01],
            code_hash: H_ABC,
            metadata_hash: H_MYCC_1_0,
            signature_hash: Some(
                "854be480b4ebe3577de0fc111b861af2c8fc74c6575dd841f4f6bd1870415422",
            ),
        },
        GoldenVector {
            name: "signed by two owners",
            chaincode_name: "mycc",
            chaincode_version: "1.0",
            code: b"abc",
            policy: Some(b"policy"),
            owner_seeds: &[0x01, 0x02],
            code_hash: H_ABC,
            metadata_hash: H_MYCC_1_0,
            signature_hash: Some(
                "868cd762aeffe1de2dda926df5eafc4dc312051ff9bad24ed7e94018ce51715f",
            ),
        },
        GoldenVector {
            name: "signed by two owners, reversed",
            chaincode_name: "mycc",
            chaincode_version: "1.0",
            code: b"abc",
            policy: Some(b"policy"),
            owner_seeds: &[0x02, 0x01],
            code_hash: H_ABC,
            metadata_hash: H_MYCC_1_0,
            signature_hash: Some(
                "9daad0d7d764e37a3070d57b0576f9e76c3dbff80f506cda30187bf35eb14418",
            ),
        },
    ]
}

impl GoldenVector {
    /// The deployment spec this vector describes.
    pub fn spec(&self) -> DeploymentSpec {
        DeploymentSpec::new(self.chaincode_name, self.chaincode_version, self.code.to_vec())
    }

    /// Raw package bytes for this vector.
    pub fn package_bytes(&self) -> Vec<u8> {
        match self.policy {
            None => cds_bytes(&self.spec()),
            Some(policy) => {
                let owners: Vec<Keypair> = self
                    .owner_seeds
                    .iter()
                    .map(|b| Keypair::from_seed(&[*b; 32]))
                    .collect();
                let refs: Vec<&Keypair> = owners.iter().collect();
                signed_bytes(&self.spec(), policy, &refs)
            }
        }
    }
}

/// Hex digest fields actually produced for a vector with the default hasher.
pub fn compute_vector(vector: &GoldenVector) -> Result<Vec<String>, ccpack::PackageError> {
    let raw = vector.package_bytes();
    if vector.policy.is_none() {
        let mut pkg = CdsPackage::default();
        pkg.init_from_buffer(&raw)?;
        let d: &CdsData = pkg.digest().ok_or(ccpack::PackageError::Uninitialized("CDS"))?;
        Ok(vec![hex::encode(&d.code_hash), hex::encode(&d.metadata_hash)])
    } else {
        let mut pkg = SignedCdsPackage::default();
        pkg.init_from_buffer(&raw)?;
        let d: &SignedCdsData = pkg
            .digest()
            .ok_or(ccpack::PackageError::Uninitialized("SignedCDS"))?;
        Ok(vec![
            hex::encode(&d.code_hash),
            hex::encode(&d.metadata_hash),
            hex::encode(&d.signature_hash),
        ])
    }
}

/// Check every vector, returning the names of those that differ.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|v| {
            let mut expected = vec![v.code_hash.to_string(), v.metadata_hash.to_string()];
            if let Some(sig) = v.signature_hash {
                expected.push(sig.to_string());
            }
            compute_vector(v).ok() != Some(expected)
        })
        .map(|v| v.name)
        .collect()
}
