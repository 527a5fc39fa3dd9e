//! Preregistration commitment: bind the analysis parameters to a digest
//! published before any run.
//!
//! The check is a pure function: canonical bytes → domain-separated SHA-256
//! → compare against the pinned commitment. A successful check yields
//! [`VerifiedParameters`], the only form in which parameters reach the engine.
//! Altering any parameter (value, type, or presence) changes the commitment;
//! the only way to run with altered parameters is to openly publish a new
//! commitment record.

use serde::{Deserialize, Serialize};

use crate::error::PreregistrationViolation;
use crate::proof::canon::{canonical_json_bytes, to_canonical_bytes, CanonError};
use crate::proof::hash::{canonical_hash, ContentHash, HashDomain};

/// Schema tag carried by every published commitment record.
pub const COMMITMENT_SCHEMA_VERSION: &str = "preregistration_commitment.v1";

/// Immutable preregistered parameter set: name → JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct PreregisteredParameterSet {
    params: serde_json::Map<String, serde_json::Value>,
}

/// Error loading a parameter set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterSetError {
    #[error("parameter set parse error: {detail}")]
    Parse { detail: String },
    #[error("parameter set must be a JSON object")]
    NotAnObject,
}

impl PreregisteredParameterSet {
    /// Wrap an already-built map.
    #[must_use]
    pub fn from_map(params: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { params }
    }

    /// Parse from JSON bytes. Key order and whitespace are irrelevant; the
    /// commitment is over the canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterSetError`] if the bytes are not a JSON object.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, ParameterSetError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ParameterSetError::Parse {
                detail: e.to_string(),
            })?;
        match value {
            serde_json::Value::Object(params) => Ok(Self { params }),
            _ => Err(ParameterSetError::NotAnObject),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }

    #[must_use]
    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.params
    }

    /// Canonical JSON bytes of the set (the committed payload).
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if a value is not representable.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_bytes(&serde_json::Value::Object(self.params.clone()))
    }
}

/// Compute the commitment of a parameter set.
///
/// # Errors
///
/// Returns [`PreregistrationViolation::NotCanonicalizable`] if the set cannot
/// be canonically serialized.
pub fn compute_commitment(
    params: &PreregisteredParameterSet,
) -> Result<ContentHash, PreregistrationViolation> {
    let bytes = params
        .canonical_bytes()
        .map_err(|e| PreregistrationViolation::NotCanonicalizable {
            detail: e.to_string(),
        })?;
    Ok(canonical_hash(HashDomain::ParameterCommitment, &bytes))
}

/// Parameters whose commitment has been checked against the pinned value.
///
/// No public constructor: the only way to obtain one is
/// [`verify_preregistration`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedParameters {
    params: PreregisteredParameterSet,
    commitment: ContentHash,
}

impl VerifiedParameters {
    #[must_use]
    pub fn params(&self) -> &PreregisteredParameterSet {
        &self.params
    }

    #[must_use]
    pub fn commitment(&self) -> &ContentHash {
        &self.commitment
    }
}

/// Recompute the commitment and compare it against the pinned digest.
///
/// # Errors
///
/// - [`PreregistrationViolation::MalformedCommitment`] if `pinned` is not a
///   full-length `sha256:` digest.
/// - [`PreregistrationViolation::CommitmentMismatch`] if the recomputed
///   digest differs.
pub fn verify_preregistration(
    params: &PreregisteredParameterSet,
    pinned: &str,
) -> Result<VerifiedParameters, PreregistrationViolation> {
    let expected = ContentHash::parse_sha256(pinned).ok_or_else(|| {
        PreregistrationViolation::MalformedCommitment {
            raw: pinned.to_string(),
        }
    })?;
    let actual = compute_commitment(params)?;
    if actual != expected {
        return Err(PreregistrationViolation::CommitmentMismatch {
            expected: expected.as_str().to_string(),
            actual: actual.as_str().to_string(),
        });
    }
    Ok(VerifiedParameters {
        params: params.clone(),
        commitment: actual,
    })
}

/// The published commitment record, kept apart from the code that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitmentRecord {
    pub schema_version: String,
    /// Publication date (`YYYY-MM-DD`), echoed into the forensic artifact.
    pub preregistered_on: String,
    /// `"sha256:<hex>"` commitment digest.
    pub commitment: String,
}

/// Error loading a commitment record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitmentRecordError {
    #[error("commitment record parse error: {detail}")]
    Parse { detail: String },
    #[error("commitment record schema_version mismatch: expected {COMMITMENT_SCHEMA_VERSION}, found {found}")]
    SchemaVersion { found: String },
}

impl CommitmentRecord {
    /// Seal a parameter set: compute and record its commitment.
    ///
    /// # Errors
    ///
    /// Returns [`PreregistrationViolation::NotCanonicalizable`] if the set
    /// cannot be canonically serialized.
    pub fn seal(
        params: &PreregisteredParameterSet,
        preregistered_on: &str,
    ) -> Result<Self, PreregistrationViolation> {
        Ok(Self {
            schema_version: COMMITMENT_SCHEMA_VERSION.to_string(),
            preregistered_on: preregistered_on.to_string(),
            commitment: compute_commitment(params)?.as_str().to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns [`CommitmentRecordError`] on parse failure or schema mismatch.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, CommitmentRecordError> {
        let record: Self =
            serde_json::from_slice(bytes).map_err(|e| CommitmentRecordError::Parse {
                detail: e.to_string(),
            })?;
        if record.schema_version != COMMITMENT_SCHEMA_VERSION {
            return Err(CommitmentRecordError::SchemaVersion {
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CanonError> {
        to_canonical_bytes(self)
    }
}
