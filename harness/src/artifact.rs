//! Forensic artifact and audit metadata.
//!
//! The forensic artifact is a pure function of the pinned manifest, the
//! verified parameters, the input series and the engine. Everything that
//! varies between otherwise identical runs (time, host, process, paths,
//! executable hash) lives in [`AuditMetadata`], which is written to its own
//! record and never enters any comparison.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use archival_kernel::context::{CodeIdentity, RunContext};
use archival_kernel::engine::series::InputSeries;
use archival_kernel::engine::{ResultRecord, WhiteningMode, ENGINE_ID};
use archival_kernel::environment::{DependencyManifest, PinnedVersion};
use archival_kernel::preregistration::CommitmentRecord;
use archival_kernel::proof::canon::{to_canonical_bytes, CanonError};
use archival_kernel::proof::hash::{canonical_hash, ContentHash, HashDomain};

use crate::layout::FORENSIC_FILENAME;

pub const FORENSIC_SCHEMA_VERSION: &str = "forensic_artifact.v1";
pub const AUDIT_SCHEMA_VERSION: &str = "audit_metadata.v1";

/// Timestamp format used in audit record names.
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Serialize)]
struct FingerprintBasis<'a> {
    commitment: &'a str,
    engine: &'a str,
    input_digest: &'a str,
    manifest_digest: &'a str,
}

/// Digest binding manifest, commitment, input and engine identity.
///
/// # Errors
///
/// Returns [`CanonError`] if the basis cannot be serialized.
pub fn run_fingerprint(
    manifest_digest: &ContentHash,
    commitment: &str,
    input_digest: &ContentHash,
) -> Result<ContentHash, CanonError> {
    let basis = FingerprintBasis {
        commitment,
        engine: ENGINE_ID,
        input_digest: input_digest.as_str(),
        manifest_digest: manifest_digest.as_str(),
    };
    Ok(canonical_hash(
        HashDomain::RunFingerprint,
        &to_canonical_bytes(&basis)?,
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSection {
    pub manifest_digest: String,
    pub toolchain: PinnedVersion,
    pub packages: BTreeMap<String, PinnedVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionFlags {
    pub strict_archival: bool,
    pub invocation: &'static str,
    pub whitening_modes_seen: Vec<WhiteningMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreregistrationSection {
    pub preregistered_on: String,
    pub commitment: String,
    pub commitment_short: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSection {
    pub channel: String,
    pub digest: String,
    pub samples: usize,
    pub sample_rate: f64,
    pub t0: f64,
}

/// The comparison-relevant output record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForensicArtifact {
    pub schema_version: &'static str,
    pub fingerprint: String,
    pub fingerprint_short: String,
    pub environment: EnvironmentSection,
    pub execution_flags: ExecutionFlags,
    pub preregistration: PreregistrationSection,
    pub input: InputSection,
    pub results: ResultRecord,
}

impl ForensicArtifact {
    /// Assemble the artifact for a completed run.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if a digest input cannot be serialized.
    pub fn assemble(
        manifest: &DependencyManifest,
        commitment: &CommitmentRecord,
        input: &InputSeries,
        ctx: &RunContext,
        results: ResultRecord,
    ) -> Result<Self, CanonError> {
        let manifest_digest = manifest.digest()?;
        let input_digest = input.digest()?;
        let fingerprint = run_fingerprint(&manifest_digest, &results.commitment, &input_digest)?;
        let commitment_short = ContentHash::parse(&commitment.commitment)
            .map(|c| c.short().to_string())
            .unwrap_or_default();

        Ok(Self {
            schema_version: FORENSIC_SCHEMA_VERSION,
            fingerprint_short: fingerprint.short().to_string(),
            fingerprint: fingerprint.as_str().to_string(),
            environment: EnvironmentSection {
                manifest_digest: manifest_digest.as_str().to_string(),
                toolchain: manifest.toolchain.clone(),
                packages: manifest.packages.clone(),
            },
            execution_flags: ExecutionFlags {
                strict_archival: ctx.strict_archival(),
                invocation: ctx.invocation().label(),
                whitening_modes_seen: results.whitening_modes_seen.clone(),
            },
            preregistration: PreregistrationSection {
                preregistered_on: commitment.preregistered_on.clone(),
                commitment: results.commitment.clone(),
                commitment_short,
                parameters: results.parameters.clone(),
            },
            input: InputSection {
                channel: input.channel.clone(),
                digest: input_digest.as_str().to_string(),
                samples: input.samples.len(),
                sample_rate: input.sample_rate,
                t0: input.t0,
            },
            results,
        })
    }

    /// # Errors
    ///
    /// Returns [`CanonError`] if a value is not representable.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CanonError> {
        to_canonical_bytes(self)
    }
}

/// Host and process facts of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub pid: u32,
    pub toolchain: String,
}

impl HostFacts {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            hostname: hostname(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            pid: std::process::id(),
            toolchain: crate::probe::RUSTC_VERSION.to_string(),
        }
    }

    /// Compact UTC timestamp used in the audit record name.
    #[must_use]
    pub fn timestamp(&self) -> String {
        self.started_at.format(AUDIT_TIMESTAMP_FORMAT).to_string()
    }

    /// First eight hex digits of the run id, used in the audit record name.
    #[must_use]
    pub fn run_tag(&self) -> String {
        self.run_id.simple().to_string()[..8].to_string()
    }
}

/// Host name as the operating system reports it.
fn hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForensicReference {
    pub file: String,
    pub content_hash: String,
}

/// Run-varying metadata, excluded from reproducibility comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub schema_version: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub pid: u32,
    pub executable_path: Option<String>,
    pub code_sha256: String,
    /// `file` when the executable image was hashed, else `unavailable`.
    pub code_source: String,
    pub toolchain: String,
    pub fingerprint: String,
    pub forensic_artifact: ForensicReference,
}

impl AuditMetadata {
    #[must_use]
    pub fn new(
        facts: &HostFacts,
        code: &CodeIdentity,
        fingerprint: &str,
        forensic_bytes: &[u8],
    ) -> Self {
        let (executable_path, code_source) = match code {
            CodeIdentity::File {
                executable_path, ..
            } => (Some(executable_path.clone()), "file"),
            CodeIdentity::Unavailable { .. } => (None, "unavailable"),
        };
        Self {
            schema_version: AUDIT_SCHEMA_VERSION.to_string(),
            run_id: facts.run_id,
            started_at: facts.started_at,
            hostname: facts.hostname.clone(),
            os: facts.os.clone(),
            arch: facts.arch.clone(),
            pid: facts.pid,
            executable_path,
            code_sha256: code.sha256_str().to_string(),
            code_source: code_source.to_string(),
            toolchain: facts.toolchain.clone(),
            fingerprint: fingerprint.to_string(),
            forensic_artifact: ForensicReference {
                file: FORENSIC_FILENAME.to_string(),
                content_hash: canonical_hash(HashDomain::ForensicArtifact, forensic_bytes)
                    .as_str()
                    .to_string(),
            },
        }
    }

    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CanonError> {
        to_canonical_bytes(self)
    }
}
