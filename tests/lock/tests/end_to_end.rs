//! End-to-end scenario.
//!
//! Manifest pins `numlib == 2.3.1` (hash `h1`); parameters
//! `{window_start: 100.0, window_end: 120.0, seed: 42}` are sealed. Two runs
//! in the matching environment succeed with identical forensic artifacts.
//! Changing `window_end` to 121.0 without resealing is refused with no
//! artifact written; resealing openly is the only way to run it.

use archival_harness::error::RunError;
use archival_harness::runner::run_pipeline;
use archival_kernel::engine::whiten::WelchHannBackend;
use archival_kernel::error::{ArchivalError, PreregistrationViolation};
use lock_tests::scenario::{
    file_context, forensic_bytes, host_facts, numlib_environment, populate, run_records,
    scenario_parameters, seal, write_parameters,
};

const P_COMMITMENT: &str =
    "sha256:de03fa28ed1b94507ebbbe3a58cd9fbefb8d92fbf9a40da8600b0e152916da33";

#[test]
fn scenario_two_runs_identical() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    let ctx = file_context(numlib_environment());

    let first = run_pipeline(&layout, &ctx, &WelchHannBackend, &host_facts("lab-a", 1, 0)).unwrap();
    let first_bytes = forensic_bytes(dir.path());
    let second = run_pipeline(&layout, &ctx, &WelchHannBackend, &host_facts("lab-a", 2, 1)).unwrap();

    assert_eq!(forensic_bytes(dir.path()), first_bytes);
    assert_eq!(first.fingerprint, second.fingerprint);
    // Forensic artifact plus one audit record per run.
    assert_eq!(run_records(dir.path()).len(), 3);

    let artifact: serde_json::Value = serde_json::from_slice(&first_bytes).unwrap();
    assert_eq!(artifact["preregistration"]["commitment"], P_COMMITMENT);
    assert_eq!(
        artifact["preregistration"]["commitment_short"],
        &P_COMMITMENT["sha256:".len().."sha256:".len() + 16]
    );
    assert_eq!(artifact["preregistration"]["preregistered_on"], "2025-12-18");
    assert_eq!(artifact["preregistration"]["parameters"], scenario_parameters());
    assert_eq!(artifact["environment"]["packages"]["numlib"]["version"], "2.3.1");
    assert_eq!(artifact["environment"]["packages"]["numlib"]["hash"], "h1");
    assert_eq!(artifact["input"]["samples"], 800);
    assert_eq!(artifact["results"]["window"]["stats"]["samples"], 80);
    assert_eq!(artifact["results"]["control"]["selection"], "complement");
    assert_eq!(artifact["results"]["null_distribution"]["trials"], 256);
    assert_eq!(artifact["results"]["null_distribution"]["seed"], 42);
    assert!(artifact["results"]["residual"]["power_ratio"].as_f64().unwrap() > 1.0);
}

#[test]
fn unsealed_window_change_refused_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    let mut altered = scenario_parameters();
    altered["window_end"] = serde_json::json!(121.0);
    write_parameters(&layout, &altered);

    let err = run_pipeline(
        &layout,
        &file_context(numlib_environment()),
        &WelchHannBackend,
        &host_facts("lab-a", 1, 0),
    )
    .unwrap_err();
    match err {
        RunError::Archival(ArchivalError::PreregistrationViolation(
            PreregistrationViolation::CommitmentMismatch { expected, actual },
        )) => {
            assert_eq!(expected, P_COMMITMENT);
            assert_ne!(actual, P_COMMITMENT);
        }
        other => panic!("expected CommitmentMismatch, got {other:?}"),
    }
    assert!(run_records(dir.path()).is_empty());
}

#[test]
fn resealed_parameters_run_under_new_commitment() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    let ctx = file_context(numlib_environment());
    let original = run_pipeline(&layout, &ctx, &WelchHannBackend, &host_facts("lab-a", 1, 0))
        .unwrap();

    let mut altered = scenario_parameters();
    altered["window_end"] = serde_json::json!(121.0);
    write_parameters(&layout, &altered);
    let record = seal(&layout, &altered);
    assert_ne!(record.commitment, P_COMMITMENT);

    let resealed = run_pipeline(&layout, &ctx, &WelchHannBackend, &host_facts("lab-a", 2, 1))
        .unwrap();
    assert_ne!(resealed.fingerprint, original.fingerprint);
    let artifact: serde_json::Value =
        serde_json::from_slice(&forensic_bytes(dir.path())).unwrap();
    assert_eq!(artifact["preregistration"]["commitment"], record.commitment.as_str());
    assert_eq!(artifact["results"]["window"]["stats"]["samples"], 84);
}
