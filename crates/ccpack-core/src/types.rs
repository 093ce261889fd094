//! Chaincode records: deployment specs, signed specs and ledger data.
//!
//! These are the structured records that packages are built from. Each one
//! encodes to canonical CBOR (see [`crate::canonical`]) with the integer field
//! keys listed next to its definition.

use bytes::Bytes;
use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::canonical::{bytes_value, entry, CanonicalDecode, CanonicalEncode, MapView};
use crate::error::{CoreError, Result};

/// The language/runtime a chaincode targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum ChaincodeType {
    #[default]
    Undefined = 0,
    Golang = 1,
    Node = 2,
    Car = 3,
    Java = 4,
}

impl ChaincodeType {
    /// Convert to i32 for serialization.
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Try to parse from i32.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Undefined),
            1 => Some(Self::Golang),
            2 => Some(Self::Node),
            3 => Some(Self::Car),
            4 => Some(Self::Java),
            _ => None,
        }
    }
}

/// Where the chaincode runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExecutionEnvironment {
    #[default]
    Docker = 0,
    System = 1,
}

impl ExecutionEnvironment {
    /// Try to parse from i32.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Docker),
            1 => Some(Self::System),
            _ => None,
        }
    }
}

/// Chaincode identity. Keys: 1 path, 2 name, 3 version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChaincodeId {
    /// Source path (not interpreted here).
    pub path: String,
    /// Chaincode name.
    pub name: String,
    /// Chaincode version.
    pub version: String,
}

/// Constructor arguments. Keys: 1 args.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChaincodeInput {
    pub args: Vec<Vec<u8>>,
}

/// Chaincode specification. Keys: 1 type, 2 chaincode_id, 3 input, 4 timeout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChaincodeSpec {
    pub cc_type: ChaincodeType,
    pub chaincode_id: ChaincodeId,
    pub input: ChaincodeInput,
    pub timeout: i32,
}

/// A deployment specification: chaincode identity plus executable bytes.
///
/// Keys: 1 chaincode_spec, 2 code_package, 3 exec_env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub chaincode_spec: ChaincodeSpec,
    /// Opaque executable package bytes.
    pub code_package: Bytes,
    pub exec_env: ExecutionEnvironment,
}

impl DeploymentSpec {
    /// Create a spec for a named, versioned code package.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        code_package: impl Into<Bytes>,
    ) -> Self {
        Self {
            chaincode_spec: ChaincodeSpec {
                chaincode_id: ChaincodeId {
                    path: String::new(),
                    name: name.into(),
                    version: version.into(),
                },
                ..ChaincodeSpec::default()
            },
            code_package: code_package.into(),
            exec_env: ExecutionEnvironment::default(),
        }
    }

    /// Set the source path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.chaincode_spec.chaincode_id.path = path.into();
        self
    }

    /// Set the chaincode type.
    pub fn with_type(mut self, cc_type: ChaincodeType) -> Self {
        self.chaincode_spec.cc_type = cc_type;
        self
    }

    /// Set the constructor arguments.
    pub fn with_args(mut self, args: Vec<Vec<u8>>) -> Self {
        self.chaincode_spec.input.args = args;
        self
    }

    /// The chaincode identity.
    pub fn id(&self) -> &ChaincodeId {
        &self.chaincode_spec.chaincode_id
    }

    /// The chaincode name.
    pub fn name(&self) -> &str {
        &self.chaincode_spec.chaincode_id.name
    }

    /// The chaincode version.
    pub fn version(&self) -> &str {
        &self.chaincode_spec.chaincode_id.version
    }
}

/// An owner endorsement over a signed package. Keys: 1 endorser, 2 signature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Endorsement {
    /// Serialized endorser identity.
    pub endorser: Vec<u8>,
    /// Signature bytes, never verified by this crate.
    pub signature: Vec<u8>,
}

/// A deployment spec with governance metadata.
///
/// Keys: 1 deployment_spec, 2 instantiation_policy, 3 owner_endorsements.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedDeploymentSpec {
    /// Canonically encoded [`DeploymentSpec`].
    pub deployment_spec: Bytes,
    /// Policy bytes controlling who may instantiate the chaincode.
    pub instantiation_policy: Vec<u8>,
    /// Owner endorsements, in the order they were added.
    pub owner_endorsements: Vec<Endorsement>,
}

impl SignedDeploymentSpec {
    /// Decode the embedded deployment spec.
    pub fn decode_deployment_spec(&self) -> Result<DeploymentSpec> {
        DeploymentSpec::from_canonical_bytes(&self.deployment_spec)
    }
}

/// The record the ledger keeps for an instantiated chaincode.
///
/// `data` holds the canonical bytes of the package's digest record.
/// Keys: 1 name, 2 version, 3 data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChaincodeData {
    pub name: String,
    pub version: String,
    pub data: Vec<u8>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical encoding
// ─────────────────────────────────────────────────────────────────────────────

impl CanonicalEncode for ChaincodeId {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, Value::Text(self.path.clone())),
            entry(2, Value::Text(self.name.clone())),
            entry(3, Value::Text(self.version.clone())),
        ])
    }
}

impl CanonicalDecode for ChaincodeId {
    const RECORD: &'static str = "chaincode id";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        Ok(Self {
            path: map.text_or_empty(1, "path")?,
            name: map.text_or_empty(2, "name")?,
            version: map.text_or_empty(3, "version")?,
        })
    }
}

impl CanonicalEncode for ChaincodeInput {
    fn to_cbor_value(&self) -> Value {
        let args = self.args.iter().map(|a| bytes_value(a)).collect();
        Value::Map(vec![entry(1, Value::Array(args))])
    }
}

impl CanonicalDecode for ChaincodeInput {
    const RECORD: &'static str = "chaincode input";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        let args = map
            .array_or_empty(1, "args")?
            .iter()
            .map(|item| match item {
                Value::Bytes(b) => Ok(b.clone()),
                _ => Err(CoreError::decoding(Self::RECORD, "args must be byte strings")),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { args })
    }
}

impl CanonicalEncode for ChaincodeSpec {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, Value::Integer(self.cc_type.to_i32().into())),
            entry(2, self.chaincode_id.to_cbor_value()),
            entry(3, self.input.to_cbor_value()),
            entry(4, Value::Integer(self.timeout.into())),
        ])
    }
}

impl CanonicalDecode for ChaincodeSpec {
    const RECORD: &'static str = "chaincode spec";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        let raw_type: i32 = map.int_or_zero(1, "type")?;
        let cc_type = ChaincodeType::from_i32(raw_type).ok_or_else(|| {
            CoreError::decoding(Self::RECORD, format!("invalid chaincode type: {}", raw_type))
        })?;
        let input = match map.nested_opt(3, "input")? {
            Some(v) => ChaincodeInput::from_cbor_value(v)?,
            None => ChaincodeInput::default(),
        };

        Ok(Self {
            cc_type,
            chaincode_id: ChaincodeId::from_cbor_value(map.nested(2, "chaincode_id")?)?,
            input,
            timeout: map.int_or_zero(4, "timeout")?,
        })
    }
}

impl CanonicalEncode for DeploymentSpec {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, self.chaincode_spec.to_cbor_value()),
            entry(2, bytes_value(&self.code_package)),
            entry(3, Value::Integer((self.exec_env as i32).into())),
        ])
    }
}

impl CanonicalDecode for DeploymentSpec {
    const RECORD: &'static str = "deployment spec";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        let raw_env: i32 = map.int_or_zero(3, "exec_env")?;
        let exec_env = ExecutionEnvironment::from_i32(raw_env).ok_or_else(|| {
            CoreError::decoding(Self::RECORD, format!("invalid exec env: {}", raw_env))
        })?;

        Ok(Self {
            chaincode_spec: ChaincodeSpec::from_cbor_value(map.nested(1, "chaincode_spec")?)?,
            code_package: map.bytes_or_empty(2, "code_package")?.into(),
            exec_env,
        })
    }
}

impl CanonicalEncode for Endorsement {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, bytes_value(&self.endorser)),
            entry(2, bytes_value(&self.signature)),
        ])
    }
}

impl CanonicalDecode for Endorsement {
    const RECORD: &'static str = "endorsement";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        Ok(Self {
            endorser: map.bytes_or_empty(1, "endorser")?,
            signature: map.bytes_or_empty(2, "signature")?,
        })
    }
}

impl CanonicalEncode for SignedDeploymentSpec {
    fn to_cbor_value(&self) -> Value {
        let endorsements = self
            .owner_endorsements
            .iter()
            .map(CanonicalEncode::to_cbor_value)
            .collect();
        Value::Map(vec![
            entry(1, bytes_value(&self.deployment_spec)),
            entry(2, bytes_value(&self.instantiation_policy)),
            entry(3, Value::Array(endorsements)),
        ])
    }
}

impl CanonicalDecode for SignedDeploymentSpec {
    const RECORD: &'static str = "signed deployment spec";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        let owner_endorsements = map
            .array_or_empty(3, "owner_endorsements")?
            .iter()
            .map(Endorsement::from_cbor_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            deployment_spec: map.bytes_or_empty(1, "deployment_spec")?.into(),
            instantiation_policy: map.bytes_or_empty(2, "instantiation_policy")?,
            owner_endorsements,
        })
    }
}

impl CanonicalEncode for ChaincodeData {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, Value::Text(self.name.clone())),
            entry(2, Value::Text(self.version.clone())),
            entry(3, bytes_value(&self.data)),
        ])
    }
}

impl CanonicalDecode for ChaincodeData {
    const RECORD: &'static str = "chaincode data";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        Ok(Self {
            name: map.text_or_empty(1, "name")?,
            version: map.text_or_empty(2, "version")?,
            data: map.bytes_or_empty(3, "data")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> DeploymentSpec {
        DeploymentSpec::new("mycc", "1.0", b"abc".to_vec())
            .with_path("github.com/example/mycc")
            .with_type(ChaincodeType::Golang)
            .with_args(vec![b"init".to_vec(), b"a".to_vec()])
    }

    #[test]
    fn test_deployment_spec_roundtrip() {
        let spec = sample_spec();
        let bytes = spec.canonical_bytes();
        let decoded = DeploymentSpec::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(spec, decoded);
        assert_eq!(decoded.name(), "mycc");
        assert_eq!(decoded.version(), "1.0");
    }

    #[test]
    fn test_deployment_spec_encoding_deterministic() {
        assert_eq!(sample_spec().canonical_bytes(), sample_spec().canonical_bytes());
    }

    #[test]
    fn test_deployment_spec_requires_chaincode_spec() {
        let value = Value::Map(vec![entry(2, bytes_value(b"abc"))]);
        let bytes = crate::canonical::encode_canonical(&value);
        let err = DeploymentSpec::from_canonical_bytes(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::Decoding { record: "deployment spec", .. }));
    }

    #[test]
    fn test_deployment_spec_rejects_unknown_type() {
        let mut spec_value = sample_spec().chaincode_spec.to_cbor_value();
        if let Value::Map(entries) = &mut spec_value {
            entries[0] = entry(1, Value::Integer(99.into()));
        }
        let value = Value::Map(vec![entry(1, spec_value)]);
        let bytes = crate::canonical::encode_canonical(&value);
        assert!(DeploymentSpec::from_canonical_bytes(&bytes).is_err());
    }

    #[test]
    fn test_signed_spec_roundtrip_keeps_endorsement_order() {
        let signed = SignedDeploymentSpec {
            deployment_spec: sample_spec().canonical_bytes().into(),
            instantiation_policy: b"policy".to_vec(),
            owner_endorsements: vec![
                Endorsement {
                    endorser: b"org2".to_vec(),
                    signature: b"sig2".to_vec(),
                },
                Endorsement {
                    endorser: b"org1".to_vec(),
                    signature: b"sig1".to_vec(),
                },
            ],
        };
        let decoded =
            SignedDeploymentSpec::from_canonical_bytes(&signed.canonical_bytes()).unwrap();
        assert_eq!(signed, decoded);
        assert_eq!(decoded.owner_endorsements[0].endorser, b"org2");
        assert_eq!(decoded.decode_deployment_spec().unwrap(), sample_spec());
    }

    #[test]
    fn test_chaincode_data_roundtrip() {
        let data = ChaincodeData {
            name: "mycc".into(),
            version: "1.0".into(),
            data: vec![1, 2, 3],
        };
        let decoded = ChaincodeData::from_canonical_bytes(&data.canonical_bytes()).unwrap();
        assert_eq!(data, decoded);
    }

    #[test]
    fn test_spec_bytes_do_not_decode_as_signed_spec() {
        let bytes = sample_spec().canonical_bytes();
        assert!(SignedDeploymentSpec::from_canonical_bytes(&bytes).is_err());
    }
}
