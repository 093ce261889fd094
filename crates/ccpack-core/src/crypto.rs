//! Cryptographic primitives: pluggable hash providers and owner signing keys.
//!
//! Digests are computed through the [`HashProvider`] / [`HashState`] pair so
//! the algorithm can be swapped by configuration. SHA-256 is the default;
//! Blake3 is available as an alternative.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// A running hash computation.
///
/// Mirrors the write / sum / reset cycle the digest profiles rely on:
/// several fields are fed into one instance, summed, and the instance is
/// reset before the next field group.
pub trait HashState: Send {
    /// Feed bytes into the hash.
    fn write(&mut self, data: &[u8]);

    /// Return `extra || digest` without disturbing the running state.
    fn sum(&self, extra: Option<&[u8]>) -> Vec<u8>;

    /// Return the state to its freshly constructed form.
    fn reset(&mut self);
}

/// Factory for [`HashState`] instances.
pub trait HashProvider: Send + Sync {
    /// Create a fresh hash state.
    fn new_hash(&self) -> Result<Box<dyn HashState>>;

    /// The algorithm this provider computes.
    fn algorithm(&self) -> HashAlgorithm;
}

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256 (the platform default).
    Sha256,
    /// Blake3 with 32-byte output.
    Blake3,
}

impl HashAlgorithm {
    /// Canonical configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA2-256",
            HashAlgorithm::Blake3 => "BLAKE3",
        }
    }

    /// Build the provider for this algorithm.
    pub fn provider(self) -> Arc<dyn HashProvider> {
        match self {
            HashAlgorithm::Sha256 => Arc::new(Sha256Provider),
            HashAlgorithm::Blake3 => Arc::new(Blake3Provider),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA2-256" | "SHA256" | "SHA-256" => Ok(HashAlgorithm::Sha256),
            "BLAKE3" => Ok(HashAlgorithm::Blake3),
            other => Err(CoreError::HashProvider(format!(
                "unsupported hash algorithm: {}",
                other
            ))),
        }
    }
}

/// SHA-256 hash provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Provider;

struct Sha256State(Sha256);

impl HashState for Sha256State {
    fn write(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn sum(&self, extra: Option<&[u8]>) -> Vec<u8> {
        let mut out = extra.map(<[u8]>::to_vec).unwrap_or_default();
        out.extend_from_slice(&self.0.clone().finalize());
        out
    }

    fn reset(&mut self) {
        self.0 = Sha256::new();
    }
}

impl HashProvider for Sha256Provider {
    fn new_hash(&self) -> Result<Box<dyn HashState>> {
        Ok(Box::new(Sha256State(Sha256::new())))
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

/// Blake3 hash provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Provider;

struct Blake3State(blake3::Hasher);

impl HashState for Blake3State {
    fn write(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn sum(&self, extra: Option<&[u8]>) -> Vec<u8> {
        let mut out = extra.map(<[u8]>::to_vec).unwrap_or_default();
        out.extend_from_slice(self.0.finalize().as_bytes());
        out
    }

    fn reset(&mut self) {
        self.0.reset();
    }
}

impl HashProvider for Blake3Provider {
    fn new_hash(&self) -> Result<Box<dyn HashState>> {
        Ok(Box::new(Blake3State(blake3::Hasher::new())))
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Blake3
    }
}

/// A 32-byte Ed25519 public key, used as an owner's endorser identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An owner keypair for endorsing packages and signing envelopes.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message, returning the 64 raw signature bytes.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(provider: &dyn HashProvider, data: &[u8]) -> Vec<u8> {
        let mut h = provider.new_hash().unwrap();
        h.write(data);
        h.sum(None)
    }

    #[test]
    fn test_sha256_known_value() {
        let digest = digest_of(&Sha256Provider, b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_split_writes_equal_single_write() {
        for provider in [HashAlgorithm::Sha256.provider(), HashAlgorithm::Blake3.provider()] {
            let mut h = provider.new_hash().unwrap();
            h.write(b"mycc");
            h.write(b"1.0");
            assert_eq!(h.sum(None), digest_of(provider.as_ref(), b"mycc1.0"));
        }
    }

    #[test]
    fn test_sum_appends_to_extra_and_keeps_state() {
        let mut h = Sha256Provider.new_hash().unwrap();
        h.write(b"abc");
        let plain = h.sum(None);
        let prefixed = h.sum(Some(b"xy"));
        assert_eq!(&prefixed[..2], b"xy");
        assert_eq!(&prefixed[2..], plain.as_slice());
    }

    #[test]
    fn test_reset_restores_empty_state() {
        for provider in [HashAlgorithm::Sha256.provider(), HashAlgorithm::Blake3.provider()] {
            let mut h = provider.new_hash().unwrap();
            h.write(b"some data");
            h.reset();
            assert_eq!(h.sum(None), digest_of(provider.as_ref(), b""));
        }
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("SHA2-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!(matches!(
            "MD5".parse::<HashAlgorithm>(),
            Err(CoreError::HashProvider(_))
        ));
    }

    #[test]
    fn test_algorithms_differ() {
        let a = digest_of(&Sha256Provider, b"abc");
        let b = digest_of(&Blake3Provider, b"abc");
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let kp1 = Keypair::from_seed(&[0x42; 32]);
        let kp2 = Keypair::from_seed(&[0x42; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.sign(b"msg"), kp2.sign(b"msg"));
        assert_eq!(kp1.sign(b"msg").len(), 64);
    }

    #[test]
    fn test_generated_keypair_signs_verifiably() {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let keypair = Keypair::generate();
        let message = b"mycc1.0";
        let signature = Signature::from_slice(&keypair.sign(message)).unwrap();
        let verifying = VerifyingKey::from_bytes(keypair.public_key().as_bytes()).unwrap();

        verifying
            .verify(message, &signature)
            .expect("valid signature should verify");
        assert!(verifying.verify(b"mycc1.1", &signature).is_err());

        // Fresh keys are distinct.
        assert_ne!(keypair.public_key(), Keypair::generate().public_key());
    }
}
