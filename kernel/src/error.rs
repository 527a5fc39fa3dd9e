//! Error taxonomy for the archival pipeline.
//!
//! Every variant is terminal at the point of detection: there is no warning
//! tier, no retry, and no degraded mode. Each error carries the expected and
//! observed state so the diagnostic alone identifies the divergence.

use crate::environment::Divergence;

/// The live environment diverges from the pinned dependency manifest.
///
/// Lists every divergence, in sorted package-key order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("environment mismatch: {}", render_divergences(.divergences))]
pub struct EnvironmentMismatch {
    pub divergences: Vec<Divergence>,
}

fn render_divergences(divergences: &[Divergence]) -> String {
    let mut out = format!("{} divergence(s) from pinned manifest", divergences.len());
    for d in divergences {
        out.push_str("\n  - ");
        out.push_str(&d.to_string());
    }
    out
}

/// The runtime parameter set does not match its published commitment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreregistrationViolation {
    /// Recomputed commitment differs from the pinned one.
    #[error("preregistration violation: commitment mismatch (expected {expected}, actual {actual})")]
    CommitmentMismatch { expected: String, actual: String },
    /// The pinned commitment is not a well-formed `sha256:` digest.
    #[error("preregistration violation: malformed pinned commitment {raw:?}")]
    MalformedCommitment { raw: String },
    /// The parameter set cannot be canonically serialized.
    #[error("preregistration violation: parameter set not canonicalizable: {detail}")]
    NotCanonicalizable { detail: String },
}

/// The process is not running in a qualifying execution context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrictModeViolation {
    /// Strict mode is switched off in the run configuration.
    #[error("strict mode violation: strict_archival is disabled (expected true, observed false)")]
    StrictModeDisabled,
    /// The executable image could not be identified, so the run is not file-based.
    #[error("strict mode violation: archival runs require file-based execution (expected file, observed {observed})")]
    NonFileInvocation { observed: String },
}

/// Unexpected failure inside the deterministic engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FatalExecution {
    /// A required preregistered parameter is absent.
    #[error("fatal execution error: missing parameter {name:?}")]
    MissingParameter { name: String },
    /// A preregistered parameter has the wrong type or an invalid value.
    #[error("fatal execution error: parameter {name:?} expected {expected}, found {found}")]
    InvalidParameter {
        name: String,
        expected: String,
        found: String,
    },
    /// The input data is malformed.
    #[error("fatal execution error: malformed input: {detail}")]
    MalformedInput { detail: String },
    /// A window selects no samples of the input series.
    #[error("fatal execution error: {window} window [{start}, {end}) selects no samples")]
    EmptyWindow {
        window: &'static str,
        start: f64,
        end: f64,
    },
    /// A required capability is unavailable; substitution is not permitted.
    #[error("fatal execution error: {capability} unavailable, fallback not allowed: {detail}")]
    CapabilityUnavailable {
        capability: &'static str,
        detail: String,
    },
    /// The pre-run self-check of the pinned path failed.
    #[error("fatal execution error: self-check failed: {detail}")]
    SelfCheckFailed { detail: String },
    /// A result holds a value the canonical encoding cannot represent.
    #[error("fatal execution error: result not canonically representable: {detail}")]
    Canon { detail: String },
}

/// Any precondition or execution failure of the archival pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArchivalError {
    #[error(transparent)]
    EnvironmentMismatch(#[from] EnvironmentMismatch),
    #[error(transparent)]
    PreregistrationViolation(#[from] PreregistrationViolation),
    #[error(transparent)]
    StrictModeViolation(#[from] StrictModeViolation),
    #[error(transparent)]
    FatalExecution(#[from] FatalExecution),
}
