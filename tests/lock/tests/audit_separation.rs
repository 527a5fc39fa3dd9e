//! Artifact / audit separation: host, process, time and executable identity
//! change only the audit record, never the forensic artifact.

use archival_harness::artifact::AuditMetadata;
use archival_harness::runner::run_pipeline;
use archival_kernel::context::{RunConfig, RunContext};
use archival_kernel::engine::whiten::WelchHannBackend;
use archival_kernel::proof::hash::{canonical_hash, HashDomain};
use lock_tests::scenario::{
    audit_path, file_code, forensic_bytes, host_facts, numlib_environment, populate,
};

#[test]
fn host_mutation_changes_audit_only() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    let ctx_a = RunContext::new(
        &RunConfig::default(),
        file_code(b"image-built-on-a"),
        numlib_environment(),
    );
    let ctx_b = RunContext::new(
        &RunConfig::default(),
        file_code(b"image-built-on-b"),
        numlib_environment(),
    );

    let run_a = run_pipeline(
        &populate(a.path(), &numlib_environment()),
        &ctx_a,
        &WelchHannBackend,
        &host_facts("observatory-a", 1111, 5),
    )
    .unwrap();
    let run_b = run_pipeline(
        &populate(b.path(), &numlib_environment()),
        &ctx_b,
        &WelchHannBackend,
        &host_facts("observatory-b", 2222, 42),
    )
    .unwrap();

    assert_eq!(forensic_bytes(a.path()), forensic_bytes(b.path()));
    assert_eq!(run_a.forensic_content_hash, run_b.forensic_content_hash);

    assert_ne!(run_a.audit.hostname, run_b.audit.hostname);
    assert_ne!(run_a.audit.pid, run_b.audit.pid);
    assert_ne!(run_a.audit.run_id, run_b.audit.run_id);
    assert_ne!(run_a.audit.code_sha256, run_b.audit.code_sha256);
    assert_ne!(run_a.records.audit.file_name(), run_b.records.audit.file_name());
}

#[test]
fn forensic_artifact_carries_no_host_data() {
    let dir = tempfile::tempdir().unwrap();
    let facts = host_facts("observatory-unique-host", 987_654, 33);
    run_pipeline(
        &populate(dir.path(), &numlib_environment()),
        &RunContext::new(
            &RunConfig::default(),
            file_code(b"image"),
            numlib_environment(),
        ),
        &WelchHannBackend,
        &facts,
    )
    .unwrap();

    let forensic = String::from_utf8(forensic_bytes(dir.path())).unwrap();
    let run_id = facts.run_id.to_string();
    for needle in [
        "observatory-unique-host",
        "2025-12-18T12",
        "/opt/archival",
        run_id.as_str(),
        dir.path().to_str().unwrap(),
    ] {
        assert!(!forensic.contains(needle), "forensic artifact contains {needle:?}");
    }
    for key in ["hostname", "pid", "started_at", "run_id", "executable_path", "code_sha256"] {
        assert!(
            !forensic.contains(&format!("\"{key}\"")),
            "forensic artifact has key {key:?}"
        );
    }
}

#[test]
fn audit_record_is_named_and_bound_to_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let facts = host_facts("lab-a", 7, 9);
    let outcome = run_pipeline(
        &populate(dir.path(), &numlib_environment()),
        &RunContext::new(
            &RunConfig::default(),
            file_code(b"image"),
            numlib_environment(),
        ),
        &WelchHannBackend,
        &facts,
    )
    .unwrap();

    let path = audit_path(dir.path());
    let short = &outcome.fingerprint["sha256:".len().."sha256:".len() + 16];
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        format!("run_record_{short}_20251218T120009Z_{}.json", facts.run_tag())
    );

    let audit: AuditMetadata = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(audit, outcome.audit);
    assert_eq!(audit.hostname, "lab-a");
    assert_eq!(audit.pid, 7);
    assert_eq!(audit.fingerprint, outcome.fingerprint);
    assert_eq!(
        audit.forensic_artifact.content_hash,
        canonical_hash(HashDomain::ForensicArtifact, &forensic_bytes(dir.path())).as_str()
    );
}
