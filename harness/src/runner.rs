//! Pipeline runner: orchestrates the kernel gates and engine over an
//! archival layout and writes the run records.
//!
//! # Pipeline
//!
//! ```text
//! load manifest → verify_environment()
//!   → guard_context()
//!   → load parameters + commitment → verify_preregistration()
//!   → load input → execute()
//!   → assemble forensic artifact → write forensic, then audit
//! ```
//!
//! Each stage runs only if every earlier stage passed. Nothing is written
//! until the engine has produced a complete result.

use archival_kernel::context::{guard_context, RunContext};
use archival_kernel::engine::execute;
use archival_kernel::engine::whiten::{SpectralBackend, WelchHannBackend};
use archival_kernel::environment::verify_environment;
use archival_kernel::error::ArchivalError;
use archival_kernel::preregistration::verify_preregistration;
use archival_kernel::proof::canon::CanonError;
use archival_kernel::proof::hash::{canonical_hash, HashDomain};

use crate::artifact::{AuditMetadata, ForensicArtifact, HostFacts};
use crate::artifact_dir::{write_run_records, AuditName, WrittenRecords};
use crate::error::RunError;
use crate::layout::ArchivalLayout;
use crate::obs::{self, RunSpan, Stage};
use crate::probe;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub fingerprint: String,
    pub forensic_content_hash: String,
    pub records: WrittenRecords,
    pub audit: AuditMetadata,
}

fn canon_error(e: CanonError) -> RunError {
    RunError::Canon {
        detail: e.to_string(),
    }
}

fn stage<T>(stage: Stage, f: impl FnOnce() -> Result<T, RunError>) -> Result<T, RunError> {
    match f() {
        Ok(value) => {
            obs::emit_stage_passed(stage);
            Ok(value)
        }
        Err(e) => {
            obs::emit_stage_failed(stage, e.class(), &e);
            Err(e)
        }
    }
}

/// Run the pipeline against `layout` under an already-captured context.
///
/// # Errors
///
/// Returns the first [`RunError`] encountered; no record is written unless
/// every stage passed.
pub fn run_pipeline(
    layout: &ArchivalLayout,
    ctx: &RunContext,
    backend: &dyn SpectralBackend,
    facts: &HostFacts,
) -> Result<RunOutcome, RunError> {
    let manifest = stage(Stage::Environment, || {
        let manifest = layout.load_manifest()?;
        verify_environment(&manifest, ctx.environment()).map_err(ArchivalError::from)?;
        Ok(manifest)
    })?;

    stage(Stage::Context, || {
        guard_context(ctx).map_err(ArchivalError::from)?;
        Ok(())
    })?;

    let (commitment, verified) = stage(Stage::Preregistration, || {
        let params = layout.load_parameters()?;
        let commitment = layout.load_commitment()?;
        let verified = verify_preregistration(&params, &commitment.commitment)
            .map_err(ArchivalError::from)?;
        Ok((commitment, verified))
    })?;

    let (input, results) = stage(Stage::Execution, || {
        let input = layout.load_input()?;
        let results = execute(&verified, &input, backend).map_err(ArchivalError::from)?;
        Ok((input, results))
    })?;

    stage(Stage::Artifact, || {
        let artifact = ForensicArtifact::assemble(&manifest, &commitment, &input, ctx, results)
            .map_err(canon_error)?;
        let forensic_bytes = artifact.to_canonical_bytes().map_err(canon_error)?;
        let audit = AuditMetadata::new(facts, ctx.code(), &artifact.fingerprint, &forensic_bytes);
        let audit_bytes = audit.to_canonical_bytes().map_err(canon_error)?;

        let timestamp = facts.timestamp();
        let run_tag = facts.run_tag();
        let records = write_run_records(
            layout,
            &forensic_bytes,
            &audit_bytes,
            AuditName {
                fingerprint_short: &artifact.fingerprint_short,
                timestamp: &timestamp,
                run_tag: &run_tag,
            },
        )?;
        let forensic_content_hash = audit.forensic_artifact.content_hash.clone();
        obs::emit_artifact_written("forensic", &records.forensic, &forensic_content_hash);
        obs::emit_artifact_written(
            "audit",
            &records.audit,
            canonical_hash(HashDomain::ForensicArtifact, &audit_bytes).as_str(),
        );

        Ok(RunOutcome {
            fingerprint: artifact.fingerprint,
            forensic_content_hash,
            records,
            audit,
        })
    })
}

/// Run the pipeline for the current process: layout at the working
/// directory, context and host facts captured from the process itself.
///
/// # Errors
///
/// Returns the first [`RunError`] encountered.
pub fn run_from_process() -> Result<RunOutcome, RunError> {
    let facts = HostFacts::capture();
    let _span = RunSpan::enter(&facts.run_id.to_string());

    let layout = ArchivalLayout::from_current_dir()?;
    let config = layout.load_run_config()?;
    let ctx = probe::capture_context(&config).map_err(|e| RunError::Config {
        path: "embedded Cargo.lock".into(),
        detail: e.to_string(),
    })?;
    tracing::info!(
        event = "run.started",
        root = %layout.root().display(),
        invocation = %ctx.invocation(),
        strict_archival = ctx.strict_archival(),
    );
    run_pipeline(&layout, &ctx, &WelchHannBackend, &facts)
}
