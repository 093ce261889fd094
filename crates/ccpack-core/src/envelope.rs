//! Transaction envelopes and signed-package extraction.
//!
//! An [`Envelope`] is the generic signed container used to move a signed
//! package through the ledger's transaction path. Its payload carries a
//! [`Header`] (whose channel header names the content type) and the
//! encoded [`SignedDeploymentSpec`] as data.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::canonical::{bytes_value, entry, CanonicalDecode, CanonicalEncode, MapView};
use crate::error::{CoreError, Result};
use crate::types::SignedDeploymentSpec;

/// Content type carried in a channel header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderType {
    Message,
    Config,
    ConfigUpdate,
    EndorserTransaction,
    OrdererTransaction,
    DeliverSeekInfo,
    ChaincodePackage,
    /// A tag this crate does not know about.
    Other(i32),
}

impl HeaderType {
    /// Convert to the numeric tag.
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Message => 0,
            Self::Config => 1,
            Self::ConfigUpdate => 2,
            Self::EndorserTransaction => 3,
            Self::OrdererTransaction => 4,
            Self::DeliverSeekInfo => 5,
            Self::ChaincodePackage => 6,
            Self::Other(v) => v,
        }
    }

    /// Parse from the numeric tag.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Message,
            1 => Self::Config,
            2 => Self::ConfigUpdate,
            3 => Self::EndorserTransaction,
            4 => Self::OrdererTransaction,
            5 => Self::DeliverSeekInfo,
            6 => Self::ChaincodePackage,
            v => Self::Other(v),
        }
    }
}

/// Channel header.
///
/// Keys: 1 type, 2 version, 3 timestamp, 4 channel_id, 5 tx_id, 6 epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHeader {
    pub header_type: HeaderType,
    pub version: i32,
    /// Creation time (Unix milliseconds).
    pub timestamp: i64,
    pub channel_id: String,
    pub tx_id: String,
    pub epoch: u64,
}

impl ChannelHeader {
    /// A header of the given type on a channel, with all other fields zeroed.
    pub fn new(header_type: HeaderType, channel_id: impl Into<String>) -> Self {
        Self {
            header_type,
            version: 0,
            timestamp: 0,
            channel_id: channel_id.into(),
            tx_id: String::new(),
            epoch: 0,
        }
    }
}

/// Payload header. Keys: 1 channel_header, 2 signature_header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    /// Encoded [`ChannelHeader`].
    pub channel_header: Vec<u8>,
    /// Creator identity and nonce, opaque here.
    pub signature_header: Vec<u8>,
}

/// Envelope payload. Keys: 1 header, 2 data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    pub header: Option<Header>,
    pub data: Vec<u8>,
}

/// A signed container. Keys: 1 payload, 2 signature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Encoded [`Payload`].
    pub payload: Vec<u8>,
    /// Signature over `payload` by the creator, opaque here.
    pub signature: Vec<u8>,
}

/// Extract the channel header and signed deployment spec from an envelope.
///
/// Fails with [`CoreError::Extraction`] if the envelope is not a well-formed
/// signed-package envelope. The header type is returned, not checked.
pub fn extract_signed_deployment_spec(
    envelope: &Envelope,
) -> Result<(ChannelHeader, SignedDeploymentSpec)> {
    let payload = Payload::from_canonical_bytes(&envelope.payload)
        .map_err(|e| CoreError::Extraction(format!("bad payload: {}", e)))?;

    let header = payload
        .header
        .as_ref()
        .ok_or_else(|| CoreError::Extraction("payload header is missing".into()))?;

    let channel_header = ChannelHeader::from_canonical_bytes(&header.channel_header)
        .map_err(|e| CoreError::Extraction(format!("bad channel header: {}", e)))?;

    let signed_spec = SignedDeploymentSpec::from_canonical_bytes(&payload.data)
        .map_err(|e| CoreError::Extraction(format!("bad signed deployment spec: {}", e)))?;

    Ok((channel_header, signed_spec))
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical encoding
// ─────────────────────────────────────────────────────────────────────────────

impl CanonicalEncode for ChannelHeader {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, Value::Integer(self.header_type.to_i32().into())),
            entry(2, Value::Integer(self.version.into())),
            entry(3, Value::Integer(self.timestamp.into())),
            entry(4, Value::Text(self.channel_id.clone())),
            entry(5, Value::Text(self.tx_id.clone())),
            entry(6, Value::Integer(self.epoch.into())),
        ])
    }
}

impl CanonicalDecode for ChannelHeader {
    const RECORD: &'static str = "channel header";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        if !map.contains(1) {
            return Err(CoreError::decoding(Self::RECORD, "missing type"));
        }
        Ok(Self {
            header_type: HeaderType::from_i32(map.int_or_zero(1, "type")?),
            version: map.int_or_zero(2, "version")?,
            timestamp: map.int_or_zero(3, "timestamp")?,
            channel_id: map.text_or_empty(4, "channel_id")?,
            tx_id: map.text_or_empty(5, "tx_id")?,
            epoch: map.int_or_zero(6, "epoch")?,
        })
    }
}

impl CanonicalEncode for Header {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, bytes_value(&self.channel_header)),
            entry(2, bytes_value(&self.signature_header)),
        ])
    }
}

impl CanonicalDecode for Header {
    const RECORD: &'static str = "header";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        Ok(Self {
            channel_header: map.bytes_or_empty(1, "channel_header")?,
            signature_header: map.bytes_or_empty(2, "signature_header")?,
        })
    }
}

impl CanonicalEncode for Payload {
    fn to_cbor_value(&self) -> Value {
        let mut entries = Vec::with_capacity(2);
        if let Some(header) = &self.header {
            entries.push(entry(1, header.to_cbor_value()));
        }
        entries.push(entry(2, bytes_value(&self.data)));
        Value::Map(entries)
    }
}

impl CanonicalDecode for Payload {
    const RECORD: &'static str = "payload";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        let header = match map.nested_opt(1, "header")? {
            Some(v) => Some(Header::from_cbor_value(v)?),
            None => None,
        };
        Ok(Self {
            header,
            data: map.bytes_or_empty(2, "data")?,
        })
    }
}

impl CanonicalEncode for Envelope {
    fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(1, bytes_value(&self.payload)),
            entry(2, bytes_value(&self.signature)),
        ])
    }
}

impl CanonicalDecode for Envelope {
    const RECORD: &'static str = "envelope";

    fn from_cbor_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, Self::RECORD)?;
        Ok(Self {
            payload: map.bytes(1, "payload")?,
            signature: map.bytes_or_empty(2, "signature")?,
        })
    }
}
