//! Owner-side construction of signed packages.
//!
//! An owner wraps a deployment spec with an instantiation policy and, if it
//! wishes, endorses it. Further owners may add endorsements to an existing
//! signed spec, or independently endorsed copies can be merged. The result is
//! placed in a [`ChaincodePackage`](HeaderType::ChaincodePackage) envelope.
//!
//! Signatures produced here are never checked by this crate; a policy engine
//! judges them.

use crate::canonical::CanonicalEncode;
use crate::crypto::Keypair;
use crate::envelope::{ChannelHeader, Envelope, Header, HeaderType, Payload};
use crate::error::{CoreError, Result};
use crate::types::{DeploymentSpec, Endorsement, SignedDeploymentSpec};

/// Message an owner signs: `deployment_spec || instantiation_policy || endorser`.
fn endorsement_message(signed: &SignedDeploymentSpec, endorser: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(
        signed.deployment_spec.len() + signed.instantiation_policy.len() + endorser.len(),
    );
    msg.extend_from_slice(&signed.deployment_spec);
    msg.extend_from_slice(&signed.instantiation_policy);
    msg.extend_from_slice(endorser);
    msg
}

fn endorse(signed: &SignedDeploymentSpec, owner: &Keypair) -> Endorsement {
    let endorser = owner.public_key().as_bytes().to_vec();
    let signature = owner.sign(&endorsement_message(signed, &endorser));
    Endorsement {
        endorser,
        signature,
    }
}

/// Wrap a deployment spec with an instantiation policy.
///
/// With an `owner`, the spec is endorsed once by that owner.
pub fn owner_create_signed_spec(
    spec: &DeploymentSpec,
    instantiation_policy: &[u8],
    owner: Option<&Keypair>,
) -> Result<SignedDeploymentSpec> {
    if instantiation_policy.is_empty() {
        return Err(CoreError::PolicyMissing {
            name: spec.name().to_string(),
            version: spec.version().to_string(),
        });
    }

    let mut signed = SignedDeploymentSpec {
        deployment_spec: spec.canonical_bytes().into(),
        instantiation_policy: instantiation_policy.to_vec(),
        owner_endorsements: Vec::new(),
    };

    if let Some(owner) = owner {
        let endorsement = endorse(&signed, owner);
        signed.owner_endorsements.push(endorsement);
    }

    Ok(signed)
}

/// Append an endorsement by `owner` to an existing signed spec.
pub fn sign_existing_package(
    signed: &SignedDeploymentSpec,
    owner: &Keypair,
) -> SignedDeploymentSpec {
    let mut out = signed.clone();
    out.owner_endorsements.push(endorse(signed, owner));
    out
}

/// Combine endorsements from several owners' copies of one package.
///
/// All inputs must carry identical deployment spec bytes and instantiation
/// policy. Endorsements keep their input order.
pub fn merge_owner_packages(packages: &[SignedDeploymentSpec]) -> Result<SignedDeploymentSpec> {
    let (first, rest) = packages
        .split_first()
        .ok_or_else(|| CoreError::PackageMismatch("no packages to merge".into()))?;

    let mut merged = first.clone();
    for (i, other) in rest.iter().enumerate() {
        if other.deployment_spec != first.deployment_spec {
            return Err(CoreError::PackageMismatch(format!(
                "package {} has a different deployment spec",
                i + 1
            )));
        }
        if other.instantiation_policy != first.instantiation_policy {
            return Err(CoreError::PackageMismatch(format!(
                "package {} has a different instantiation policy",
                i + 1
            )));
        }
        merged
            .owner_endorsements
            .extend(other.owner_endorsements.iter().cloned());
    }

    Ok(merged)
}

/// Place a signed spec into a chaincode-package envelope.
///
/// With a `signer`, the envelope signature covers the encoded payload.
pub fn create_package_envelope(
    signed: &SignedDeploymentSpec,
    channel_id: &str,
    signer: Option<&Keypair>,
) -> Envelope {
    let channel_header = ChannelHeader::new(HeaderType::ChaincodePackage, channel_id);
    let signature_header = signer
        .map(|kp| kp.public_key().as_bytes().to_vec())
        .unwrap_or_default();

    let payload = Payload {
        header: Some(Header {
            channel_header: channel_header.canonical_bytes(),
            signature_header,
        }),
        data: signed.canonical_bytes(),
    }
    .canonical_bytes();

    let signature = signer.map(|kp| kp.sign(&payload)).unwrap_or_default();

    Envelope { payload, signature }
}
