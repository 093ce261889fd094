//! Error types for the ccpack core.

use thiserror::Error;

/// Errors raised while decoding records, computing digests or extracting
/// signed content from an envelope.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Serialized input could not be decoded as the named record.
    #[error("failed to decode {record}: {reason}")]
    Decoding {
        record: &'static str,
        reason: String,
    },

    /// The envelope does not carry a well-formed signed deployment spec.
    #[error("envelope extraction failed: {0}")]
    Extraction(String),

    /// A signed package was built without an instantiation policy.
    #[error("instantiation policy cannot be empty for chaincode ({name}:{version})")]
    PolicyMissing { name: String, version: String },

    /// The hash subsystem could not be initialized or invoked.
    #[error("hash provider error: {0}")]
    HashProvider(String),

    /// Owner packages that were expected to wrap the same chaincode differ.
    #[error("owner packages do not match: {0}")]
    PackageMismatch(String),
}

impl CoreError {
    pub(crate) fn decoding(record: &'static str, reason: impl Into<String>) -> Self {
        CoreError::Decoding {
            record,
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
