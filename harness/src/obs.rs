//! Structured events for the pipeline lifecycle.
//!
//! Every stage boundary emits `stage.passed` or `stage.failed`; each written
//! record emits `artifact.written`. All events carry the run id through the
//! enclosing `archival.run` span.

use tracing::{error, info};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Environment,
    Context,
    Preregistration,
    Execution,
    Artifact,
}

impl Stage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Context => "context",
            Self::Preregistration => "preregistration",
            Self::Execution => "execution",
            Self::Artifact => "artifact",
        }
    }
}

/// RAII guard holding the run-scoped span.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    #[must_use]
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("archival.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_stage_passed(stage: Stage) {
    info!(event = "stage.passed", stage = stage.name());
}

pub fn emit_stage_failed(stage: Stage, class: &str, error: &dyn std::fmt::Display) {
    error!(event = "stage.failed", stage = stage.name(), class = %class, error = %error);
}

pub fn emit_artifact_written(kind: &str, path: &std::path::Path, content_hash: &str) {
    info!(
        event = "artifact.written",
        kind = %kind,
        path = %path.display(),
        content_hash = %content_hash,
    );
}
