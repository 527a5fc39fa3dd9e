//! In-process determinism: repeated runs of the same archival layout produce
//! a byte-identical forensic artifact.

use archival_harness::runner::run_pipeline;
use archival_kernel::engine::whiten::WelchHannBackend;
use lock_tests::scenario::{
    file_context, forensic_bytes, host_facts, numlib_environment, populate,
};

const N: u32 = 10;

#[test]
fn repeated_runs_same_layout_identical_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    let ctx = file_context(numlib_environment());

    let first = run_pipeline(&layout, &ctx, &WelchHannBackend, &host_facts("lab-a", 100, 0)).unwrap();
    let baseline = forensic_bytes(dir.path());

    for i in 1..N {
        let outcome =
            run_pipeline(&layout, &ctx, &WelchHannBackend, &host_facts("lab-a", 100 + i, i)).unwrap();
        assert_eq!(
            forensic_bytes(dir.path()),
            baseline,
            "run {i} produced a different forensic artifact"
        );
        assert_eq!(outcome.fingerprint, first.fingerprint);
        assert_eq!(outcome.forensic_content_hash, first.forensic_content_hash);
    }
}

#[test]
fn layout_location_does_not_enter_artifact() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let nested = b.path().join("deeper").join("archive root");
    std::fs::create_dir_all(&nested).unwrap();

    let ctx = file_context(numlib_environment());
    let facts = host_facts("lab-a", 1, 0);
    run_pipeline(&populate(a.path(), &numlib_environment()), &ctx, &WelchHannBackend, &facts)
        .unwrap();
    run_pipeline(&populate(&nested, &numlib_environment()), &ctx, &WelchHannBackend, &facts)
        .unwrap();

    assert_eq!(forensic_bytes(a.path()), forensic_bytes(&nested));
}

#[test]
fn artifact_is_canonical_json() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    run_pipeline(
        &layout,
        &file_context(numlib_environment()),
        &WelchHannBackend,
        &host_facts("lab-a", 1, 0),
    )
    .unwrap();
    let bytes = forensic_bytes(dir.path());
    assert!(archival_kernel::proof::canon::is_canonical(&bytes));

    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["schema_version"], "forensic_artifact.v1");
    assert_eq!(
        value["execution_flags"]["whitening_modes_seen"],
        serde_json::json!(["pinned"])
    );
    assert_eq!(value["execution_flags"]["strict_archival"], true);
    assert_eq!(value["results"]["whitening"]["config"]["fftlength"], 4.0);
    assert_eq!(value["results"]["whitening"]["config"]["overlap"], 2.0);
    assert_eq!(value["results"]["whitening"]["config"]["window"], "hann");
}
