//! Harness error type and exit-code mapping.

use archival_kernel::error::ArchivalError;

/// Any failure of a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A precondition or engine failure detected by the kernel.
    #[error(transparent)]
    Archival(#[from] ArchivalError),
    /// A required file could not be read or written.
    #[error("I/O error at {path}: {detail}")]
    Io { path: String, detail: String },
    /// A layout file exists but is not well-formed.
    #[error("configuration error in {path}: {detail}")]
    Config { path: String, detail: String },
    /// Canonical serialization of an output failed.
    #[error("canonical JSON error: {detail}")]
    Canon { detail: String },
}

impl RunError {
    /// Process exit code for this error class.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Archival(ArchivalError::EnvironmentMismatch(_)) => 2,
            Self::Archival(ArchivalError::PreregistrationViolation(_)) => 3,
            Self::Archival(ArchivalError::StrictModeViolation(_)) => 4,
            Self::Archival(ArchivalError::FatalExecution(_)) => 5,
            Self::Io { .. } | Self::Config { .. } | Self::Canon { .. } => 1,
        }
    }

    /// Short class name used in log events.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Archival(ArchivalError::EnvironmentMismatch(_)) => "environment_mismatch",
            Self::Archival(ArchivalError::PreregistrationViolation(_)) => {
                "preregistration_violation"
            }
            Self::Archival(ArchivalError::StrictModeViolation(_)) => "strict_mode_violation",
            Self::Archival(ArchivalError::FatalExecution(_)) => "fatal_execution",
            Self::Io { .. } => "io",
            Self::Config { .. } => "config",
            Self::Canon { .. } => "canon",
        }
    }
}
