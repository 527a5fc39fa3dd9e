//! Run context and the execution-context guard.
//!
//! [`RunContext`] is built once at process start from explicit inputs and is
//! read-only afterwards; every verifier receives it by reference. Strict mode
//! is a field of the context, never a process-wide global.

use serde::{Deserialize, Serialize};

use crate::environment::ResolvedEnvironment;
use crate::error::StrictModeViolation;
use crate::proof::hash::ContentHash;

/// Run configuration read from the archival layout.
///
/// Strict mode defaults to enabled; a relaxed run must be requested
/// explicitly, and is then refused by [`guard_context`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "strict_default")]
    pub strict_archival: bool,
}

const fn strict_default() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strict_archival: strict_default(),
        }
    }
}

/// Identity of the code that is executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeIdentity {
    /// The executable image was read and hashed.
    File {
        executable_sha256: ContentHash,
        executable_path: String,
    },
    /// The executable image could not be located or read.
    Unavailable { reason: String },
}

impl CodeIdentity {
    /// The code hash string recorded in audit metadata.
    #[must_use]
    pub fn sha256_str(&self) -> &str {
        match self {
            Self::File {
                executable_sha256, ..
            } => executable_sha256.as_str(),
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

/// How the process was launched.
///
/// A compiled run is file-based exactly when its executable image was
/// located and hashed. Whether a terminal is attached does not matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationMode {
    /// Execution from an identified, hashed executable.
    File,
    /// The executable could not be identified.
    Unverifiable { reason: String },
}

impl InvocationMode {
    #[must_use]
    pub fn classify(code: &CodeIdentity) -> Self {
        match code {
            CodeIdentity::Unavailable { reason } => Self::Unverifiable {
                reason: reason.clone(),
            },
            CodeIdentity::File { .. } => Self::File,
        }
    }

    /// Short label used in artifacts and diagnostics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Unverifiable { .. } => "unverifiable",
        }
    }
}

impl std::fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverifiable { reason } => write!(f, "unverifiable ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Execution-time facts, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    invocation: InvocationMode,
    strict_archival: bool,
    code: CodeIdentity,
    environment: ResolvedEnvironment,
}

impl RunContext {
    #[must_use]
    pub fn new(config: &RunConfig, code: CodeIdentity, environment: ResolvedEnvironment) -> Self {
        Self {
            invocation: InvocationMode::classify(&code),
            strict_archival: config.strict_archival,
            code,
            environment,
        }
    }

    #[must_use]
    pub fn invocation(&self) -> &InvocationMode {
        &self.invocation
    }

    #[must_use]
    pub fn strict_archival(&self) -> bool {
        self.strict_archival
    }

    #[must_use]
    pub fn code(&self) -> &CodeIdentity {
        &self.code
    }

    #[must_use]
    pub fn environment(&self) -> &ResolvedEnvironment {
        &self.environment
    }
}

/// Require strict mode and a file-based invocation.
///
/// # Errors
///
/// Returns [`StrictModeViolation`] naming the failed condition.
pub fn guard_context(ctx: &RunContext) -> Result<(), StrictModeViolation> {
    if !ctx.strict_archival {
        return Err(StrictModeViolation::StrictModeDisabled);
    }
    if ctx.invocation != InvocationMode::File {
        return Err(StrictModeViolation::NonFileInvocation {
            observed: ctx.invocation.to_string(),
        });
    }
    Ok(())
}
