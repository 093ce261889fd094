//! Error types for package operations.

use ccpack_core::{CoreError, DigestField, HeaderType};
use ccpack_store::StoreError;
use thiserror::Error;

/// How an operator should read a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed or incomplete input. Reject it.
    Input,
    /// The package is not the one that was registered. Investigate.
    Tamper,
    /// Local state, storage or configuration problem.
    Operational,
}

/// Errors that can occur during package operations.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Serialized input could not be decoded.
    #[error("failed to decode {record}: {reason}")]
    Decode {
        record: &'static str,
        reason: String,
    },

    /// The envelope does not contain the expected signed content.
    #[error("envelope extraction failed: {0}")]
    Extraction(String),

    /// The envelope carries something other than a chaincode package.
    #[error("invalid envelope type: expected {expected:?}, found {found:?}")]
    WrongEnvelopeType {
        expected: HeaderType,
        found: HeaderType,
    },

    /// A signed package lacks an instantiation policy.
    #[error("instantiation policy cannot be empty for chaincode ({name}:{version})")]
    PolicyMissing { name: String, version: String },

    /// The hash subsystem is unavailable.
    #[error("hash provider error: {0}")]
    HashProvider(String),

    /// Owner packages that should wrap one chaincode differ.
    #[error("owner packages do not match: {0}")]
    PackageMismatch(String),

    /// The operation needs a loaded package.
    #[error("{0} package is not initialized")]
    Uninitialized(&'static str),

    /// The ledger record names a different chaincode than the package.
    #[error(
        "chaincode data for {found_name}:{found_version} does not match package {name}:{version}"
    )]
    IdentityMismatch {
        name: String,
        version: String,
        found_name: String,
        found_version: String,
    },

    /// The ledger record's digest differs from the package's.
    #[error("digest mismatch for chaincode {name}:{version}: {}", field_list(.fields))]
    DigestMismatch {
        name: String,
        version: String,
        fields: Vec<DigestField>,
    },

    /// No package is installed under this identity.
    #[error("chaincode package not found: {name}:{version}")]
    NotFound { name: String, version: String },

    /// A package is already installed under this identity.
    #[error("chaincode {name}:{version} already exists")]
    AlreadyExists { name: String, version: String },

    /// The package store failed.
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

fn field_list(fields: &[DigestField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PackageError {
    /// Classify this error for the operator.
    pub fn class(&self) -> ErrorClass {
        match self {
            PackageError::Decode { .. }
            | PackageError::Extraction(_)
            | PackageError::WrongEnvelopeType { .. }
            | PackageError::PolicyMissing { .. }
            | PackageError::PackageMismatch(_) => ErrorClass::Input,
            PackageError::IdentityMismatch { .. } | PackageError::DigestMismatch { .. } => {
                ErrorClass::Tamper
            }
            PackageError::HashProvider(_)
            | PackageError::Uninitialized(_)
            | PackageError::NotFound { .. }
            | PackageError::AlreadyExists { .. }
            | PackageError::Storage(_)
            | PackageError::Config(_) => ErrorClass::Operational,
        }
    }

    /// Whether the caller must treat this as a security rejection rather
    /// than a transient failure.
    pub fn is_security_rejection(&self) -> bool {
        self.class() == ErrorClass::Tamper
    }
}

impl From<CoreError> for PackageError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Decoding { record, reason } => PackageError::Decode { record, reason },
            CoreError::Extraction(reason) => PackageError::Extraction(reason),
            CoreError::PolicyMissing { name, version } => {
                PackageError::PolicyMissing { name, version }
            }
            CoreError::HashProvider(reason) => PackageError::HashProvider(reason),
            CoreError::PackageMismatch(reason) => PackageError::PackageMismatch(reason),
        }
    }
}

impl From<StoreError> for PackageError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { name, version } => PackageError::NotFound { name, version },
            other => PackageError::Storage(other),
        }
    }
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, PackageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes() {
        let tamper = PackageError::DigestMismatch {
            name: "mycc".into(),
            version: "1.0".into(),
            fields: vec![DigestField::CodeHash, DigestField::SignatureHash],
        };
        assert_eq!(tamper.class(), ErrorClass::Tamper);
        assert!(tamper.is_security_rejection());
        assert_eq!(
            tamper.to_string(),
            "digest mismatch for chaincode mycc:1.0: code hash, signature hash"
        );

        let input = PackageError::from(CoreError::Extraction("no header".into()));
        assert_eq!(input.class(), ErrorClass::Input);
        assert!(!input.is_security_rejection());

        assert_eq!(
            PackageError::Uninitialized("CDS").class(),
            ErrorClass::Operational
        );
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let e = PackageError::from(StoreError::NotFound {
            name: "mycc".into(),
            version: "1.0".into(),
        });
        assert!(matches!(e, PackageError::NotFound { .. }));

        let e = PackageError::from(StoreError::InvalidKey("bad".into()));
        assert!(matches!(e, PackageError::Storage(_)));
    }
}
