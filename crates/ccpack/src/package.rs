//! Chaincode packages: the unsigned and signed variants.
//!
//! Both variants share one state machine, [`Package`], parameterized by a
//! [`PackageProfile`] that says how raw bytes decode and which fields feed
//! the digest. A package is either [`PackageState::Empty`] or
//! [`PackageState::Loaded`]; initialization clears the state first, so a
//! failed re-init never leaves data from an earlier load behind.
//!
//! A package value is not meant for concurrent mutation. Use one per request
//! or guard it externally.

use std::fmt;
use std::sync::Arc;

use ccpack_core::{
    compute_cds_data, compute_signed_cds_data, extract_signed_deployment_spec, CanonicalDecode,
    CdsData, ChaincodeData, ChannelHeader, ComputedDigest, DeploymentSpec, DigestField,
    DigestRecord, Endorsement, Envelope, HashAlgorithm, HashProvider, HeaderType,
    SignedCdsData, SignedDeploymentSpec,
};
use ccpack_store::{InsertResult, PackageStore};
use tracing::{debug, info, warn};

use crate::error::{PackageError, Result};

/// Which variant a package is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// A bare deployment spec.
    Cds,
    /// A deployment spec inside a signed envelope.
    SignedCds,
}

impl PackageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageKind::Cds => "CDS",
            PackageKind::SignedCds => "SignedCDS",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoding and digest rules for one package variant.
pub trait PackageProfile: Send + Sync + 'static {
    const KIND: PackageKind;

    /// The digest record this variant persists.
    type Record: DigestRecord + Send + Sync;

    /// Decoded content beyond the deployment spec.
    type Extra: Clone + fmt::Debug + Send + Sync;

    /// Decode raw package bytes.
    fn decode(raw: &[u8]) -> Result<(DeploymentSpec, Self::Extra)>;

    /// Compute the digest over the decoded content.
    fn digest(
        spec: &DeploymentSpec,
        extra: &Self::Extra,
        hasher: &dyn HashProvider,
    ) -> Result<ComputedDigest<Self::Record>>;
}

/// Profile of the unsigned variant: raw bytes are an encoded [`DeploymentSpec`].
#[derive(Debug, Clone, Copy)]
pub struct Cds;

impl PackageProfile for Cds {
    const KIND: PackageKind = PackageKind::Cds;
    type Record = CdsData;
    type Extra = ();

    fn decode(raw: &[u8]) -> Result<(DeploymentSpec, ())> {
        Ok((DeploymentSpec::from_canonical_bytes(raw)?, ()))
    }

    fn digest(
        spec: &DeploymentSpec,
        _extra: &(),
        hasher: &dyn HashProvider,
    ) -> Result<ComputedDigest<CdsData>> {
        Ok(compute_cds_data(spec, hasher)?)
    }
}

/// Profile of the signed variant: raw bytes are an encoded [`Envelope`].
#[derive(Debug, Clone, Copy)]
pub struct SignedCds;

/// What a signed package holds besides its deployment spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedContent {
    pub envelope: Envelope,
    pub channel_header: ChannelHeader,
    pub signed_spec: SignedDeploymentSpec,
}

impl PackageProfile for SignedCds {
    const KIND: PackageKind = PackageKind::SignedCds;
    type Record = SignedCdsData;
    type Extra = SignedContent;

    fn decode(raw: &[u8]) -> Result<(DeploymentSpec, SignedContent)> {
        let envelope = Envelope::from_canonical_bytes(raw)?;
        let (channel_header, signed_spec) = extract_signed_deployment_spec(&envelope)?;

        if channel_header.header_type != HeaderType::ChaincodePackage {
            return Err(PackageError::WrongEnvelopeType {
                expected: HeaderType::ChaincodePackage,
                found: channel_header.header_type,
            });
        }

        let spec = signed_spec.decode_deployment_spec()?;
        Ok((
            spec,
            SignedContent {
                envelope,
                channel_header,
                signed_spec,
            },
        ))
    }

    fn digest(
        spec: &DeploymentSpec,
        extra: &SignedContent,
        hasher: &dyn HashProvider,
    ) -> Result<ComputedDigest<SignedCdsData>> {
        Ok(compute_signed_cds_data(&extra.signed_spec, spec, hasher)?)
    }
}

/// Everything a loaded package holds. Only built once every part succeeded.
#[derive(Debug, Clone)]
pub struct Loaded<P: PackageProfile> {
    raw: Vec<u8>,
    spec: DeploymentSpec,
    extra: P::Extra,
    digest: ComputedDigest<P::Record>,
}

impl<P: PackageProfile> Loaded<P> {
    fn chaincode_data(&self) -> ChaincodeData {
        ChaincodeData {
            name: self.spec.name().to_string(),
            version: self.spec.version().to_string(),
            data: self.digest.encoded.clone(),
        }
    }
}

/// Lifecycle state of a package.
#[derive(Debug, Clone)]
pub enum PackageState<P: PackageProfile> {
    Empty,
    Loaded(Box<Loaded<P>>),
}

/// A chaincode package of either variant.
pub struct Package<P: PackageProfile> {
    state: PackageState<P>,
    hasher: Arc<dyn HashProvider>,
}

/// An unsigned package.
pub type CdsPackage = Package<Cds>;

/// A signed package.
pub type SignedCdsPackage = Package<SignedCds>;

impl<P: PackageProfile> Package<P> {
    /// An empty package that hashes with `hasher`.
    pub fn new(hasher: Arc<dyn HashProvider>) -> Self {
        Self {
            state: PackageState::Empty,
            hasher,
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> &PackageState<P> {
        &self.state
    }

    /// The digest record, once loaded.
    pub fn digest(&self) -> Option<&P::Record> {
        self.loaded().map(|l| &l.digest.record)
    }

    fn loaded(&self) -> Option<&Loaded<P>> {
        match &self.state {
            PackageState::Loaded(loaded) => Some(&**loaded),
            PackageState::Empty => None,
        }
    }

    fn require_loaded(&self) -> Result<&Loaded<P>> {
        self.loaded()
            .ok_or(PackageError::Uninitialized(P::KIND.as_str()))
    }

    fn load(&self, raw: &[u8]) -> Result<Loaded<P>> {
        let (spec, extra) = P::decode(raw)?;
        let digest = P::digest(&spec, &extra, self.hasher.as_ref())?;
        Ok(Loaded {
            raw: raw.to_vec(),
            spec,
            extra,
            digest,
        })
    }
}

impl<P: PackageProfile> Default for Package<P> {
    fn default() -> Self {
        Self::new(HashAlgorithm::Sha256.provider())
    }
}

impl<P: PackageProfile> fmt::Debug for Package<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Package");
        d.field("kind", &P::KIND)
            .field("hash_algorithm", &self.hasher.algorithm());
        match self.loaded() {
            Some(loaded) => d
                .field("name", &loaded.spec.name())
                .field("version", &loaded.spec.version())
                .field("digest", &loaded.digest.record),
            None => d.field("state", &"empty"),
        };
        d.finish()
    }
}

impl Package<SignedCds> {
    fn signed(&self) -> Option<&SignedContent> {
        self.loaded().map(|l| &l.extra)
    }

    /// The envelope the package was read from.
    pub fn envelope(&self) -> Option<&Envelope> {
        self.signed().map(|s| &s.envelope)
    }

    /// The envelope's channel header.
    pub fn channel_header(&self) -> Option<&ChannelHeader> {
        self.signed().map(|s| &s.channel_header)
    }

    /// The signed deployment spec carried by the envelope.
    pub fn signed_deployment_spec(&self) -> Option<&SignedDeploymentSpec> {
        self.signed().map(|s| &s.signed_spec)
    }

    /// The instantiation policy bytes.
    pub fn instantiation_policy(&self) -> Option<&[u8]> {
        self.signed()
            .map(|s| s.signed_spec.instantiation_policy.as_slice())
    }

    /// Owner endorsements in their stored order. Signatures are not verified.
    pub fn owner_endorsements(&self) -> Option<&[Endorsement]> {
        self.signed()
            .map(|s| s.signed_spec.owner_endorsements.as_slice())
    }
}

/// An installable, verifiable chaincode package.
///
/// Object safe, so callers that accept either variant can hold a
/// `Box<dyn ChaincodePackage>`.
pub trait ChaincodePackage: fmt::Debug + Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> PackageKind;

    /// Whether the package holds a loaded spec and digest.
    fn is_initialized(&self) -> bool;

    /// Parse raw package bytes, replacing any previous content.
    ///
    /// Returns the ledger record for the package. On failure the package is
    /// left empty.
    fn init_from_buffer(&mut self, raw: &[u8]) -> Result<ChaincodeData>;

    /// Load an installed package from `store`.
    ///
    /// Returns the raw bytes and decoded spec. The spec's identity must match
    /// the key it was stored under.
    fn init_from_fs(
        &mut self,
        store: &dyn PackageStore,
        name: &str,
        version: &str,
    ) -> Result<(Vec<u8>, DeploymentSpec)>;

    /// Install the package's raw bytes into `store`. Never overwrites.
    fn put_chaincode_to_fs(&self, store: &dyn PackageStore) -> Result<()>;

    /// Check that `cd` is the ledger record of this exact package.
    ///
    /// On success returns the deployment spec, which the caller may trust.
    fn validate_cc(&self, cd: &ChaincodeData) -> Result<&DeploymentSpec>;

    /// The decoded deployment spec, once loaded.
    fn deployment_spec(&self) -> Option<&DeploymentSpec>;

    /// The raw package bytes, once loaded.
    fn raw_bytes(&self) -> Option<&[u8]>;

    /// The ledger record this package produces, once loaded.
    fn chaincode_data(&self) -> Option<ChaincodeData>;

    /// The hash of the code package, once loaded.
    fn code_hash(&self) -> Option<&[u8]>;
}

impl<P: PackageProfile> ChaincodePackage for Package<P> {
    fn kind(&self) -> PackageKind {
        P::KIND
    }

    fn is_initialized(&self) -> bool {
        matches!(self.state, PackageState::Loaded(_))
    }

    fn init_from_buffer(&mut self, raw: &[u8]) -> Result<ChaincodeData> {
        self.state = PackageState::Empty;

        let loaded = self.load(raw)?;
        let cd = loaded.chaincode_data();

        debug!(
            kind = %P::KIND,
            name = %cd.name,
            version = %cd.version,
            "initialized chaincode package"
        );

        self.state = PackageState::Loaded(Box::new(loaded));
        Ok(cd)
    }

    fn init_from_fs(
        &mut self,
        store: &dyn PackageStore,
        name: &str,
        version: &str,
    ) -> Result<(Vec<u8>, DeploymentSpec)> {
        self.state = PackageState::Empty;

        let raw = store.get(name, version)?;
        let loaded = self.load(&raw)?;

        if loaded.spec.name() != name || loaded.spec.version() != version {
            warn!(
                kind = %P::KIND,
                name,
                version,
                found_name = loaded.spec.name(),
                found_version = loaded.spec.version(),
                "stored package identity does not match its key"
            );
            return Err(PackageError::IdentityMismatch {
                name: name.to_string(),
                version: version.to_string(),
                found_name: loaded.spec.name().to_string(),
                found_version: loaded.spec.version().to_string(),
            });
        }

        debug!(kind = %P::KIND, name, version, "loaded chaincode package from store");

        let spec = loaded.spec.clone();
        self.state = PackageState::Loaded(Box::new(loaded));
        Ok((raw, spec))
    }

    fn put_chaincode_to_fs(&self, store: &dyn PackageStore) -> Result<()> {
        let loaded = self.require_loaded()?;
        let name = loaded.spec.name();
        let version = loaded.spec.version();

        let already_exists = || PackageError::AlreadyExists {
            name: name.to_string(),
            version: version.to_string(),
        };

        if store.exists(name, version)? {
            return Err(already_exists());
        }

        match store.insert(name, version, &loaded.raw)? {
            InsertResult::Inserted => {
                info!(kind = %P::KIND, name, version, "installed chaincode package");
                Ok(())
            }
            InsertResult::AlreadyExists => Err(already_exists()),
        }
    }

    fn validate_cc(&self, cd: &ChaincodeData) -> Result<&DeploymentSpec> {
        let loaded = self.require_loaded()?;
        let name = loaded.spec.name();
        let version = loaded.spec.version();

        if cd.name != name || cd.version != version {
            warn!(
                kind = %P::KIND,
                name,
                version,
                found_name = %cd.name,
                found_version = %cd.version,
                "chaincode data identity mismatch"
            );
            return Err(PackageError::IdentityMismatch {
                name: name.to_string(),
                version: version.to_string(),
                found_name: cd.name.clone(),
                found_version: cd.version.clone(),
            });
        }

        let other = <P::Record as CanonicalDecode>::from_canonical_bytes(&cd.data)?;
        let fields = loaded.digest.record.mismatched_fields(&other);
        if !fields.is_empty() {
            warn!(
                kind = %P::KIND,
                name,
                version,
                fields = ?fields,
                "chaincode digest mismatch"
            );
            return Err(PackageError::DigestMismatch {
                name: name.to_string(),
                version: version.to_string(),
                fields,
            });
        }

        debug!(kind = %P::KIND, name, version, "validated chaincode package");
        Ok(&loaded.spec)
    }

    fn deployment_spec(&self) -> Option<&DeploymentSpec> {
        self.loaded().map(|l| &l.spec)
    }

    fn raw_bytes(&self) -> Option<&[u8]> {
        self.loaded().map(|l| l.raw.as_slice())
    }

    fn chaincode_data(&self) -> Option<ChaincodeData> {
        self.loaded().map(Loaded::chaincode_data)
    }

    fn code_hash(&self) -> Option<&[u8]> {
        let loaded = self.loaded()?;
        loaded
            .digest
            .record
            .fields()
            .into_iter()
            .find(|(field, _)| *field == DigestField::CodeHash)
            .map(|(_, hash)| hash)
    }
}
