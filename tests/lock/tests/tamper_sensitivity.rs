//! Tamper sensitivity: every single-field mutation of the preregistered
//! parameter set is refused before computation, and nothing is written.

use archival_harness::error::RunError;
use archival_harness::runner::run_pipeline;
use archival_kernel::engine::whiten::WelchHannBackend;
use archival_kernel::error::{ArchivalError, PreregistrationViolation};
use lock_tests::scenario::{
    file_context, host_facts, numlib_environment, populate, run_records, scenario_parameters,
    write_parameters,
};
use serde_json::json;

fn assert_refused(mutated: &serde_json::Value, label: &str) {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    write_parameters(&layout, mutated);

    let err = run_pipeline(
        &layout,
        &file_context(numlib_environment()),
        &WelchHannBackend,
        &host_facts("lab-a", 1, 0),
    )
    .unwrap_err();
    assert!(
        matches!(
            err,
            RunError::Archival(ArchivalError::PreregistrationViolation(
                PreregistrationViolation::CommitmentMismatch { .. }
            ))
        ),
        "{label}: unexpected error {err:?}"
    );
    assert!(run_records(dir.path()).is_empty(), "{label}: records written");
}

#[test]
fn every_value_mutation_refused() {
    let mutations = [
        ("window_start", json!(100.25)),
        ("window_start", json!(99.999_999_999)),
        ("window_end", json!(121.0)),
        ("window_end", json!(120.000_000_000_1)),
        ("seed", json!(43)),
        ("seed", json!(0)),
    ];
    for (name, value) in mutations {
        let mut params = scenario_parameters();
        params[name] = value.clone();
        assert_refused(&params, &format!("{name}={value}"));
    }
}

#[test]
fn type_only_mutations_refused() {
    let mutations = [
        ("window_start", json!(100)),
        ("window_end", json!("120.0")),
        ("seed", json!(42.0)),
    ];
    for (name, value) in mutations {
        let mut params = scenario_parameters();
        params[name] = value.clone();
        assert_refused(&params, &format!("{name}={value}"));
    }
}

#[test]
fn added_and_removed_fields_refused() {
    let mut added = scenario_parameters();
    added["control_start"] = json!(0.0);
    assert_refused(&added, "added control_start");

    for name in ["window_start", "window_end", "seed"] {
        let mut removed = scenario_parameters();
        removed.as_object_mut().unwrap().remove(name);
        assert_refused(&removed, &format!("removed {name}"));
    }
}

#[test]
fn reordered_and_reformatted_parameters_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    std::fs::write(
        layout.parameters_path(),
        b"{\n  \"seed\" : 42,\n  \"window_end\" : 120.0,\n  \"window_start\" : 100.0\n}\n",
    )
    .unwrap();
    run_pipeline(
        &layout,
        &file_context(numlib_environment()),
        &WelchHannBackend,
        &host_facts("lab-a", 1, 0),
    )
    .unwrap();
}

#[test]
fn tampered_commitment_record_refused() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &numlib_environment());
    let record = std::fs::read_to_string(layout.commitment_path()).unwrap();
    let tampered = record.replacen("sha256:", "sha256:0", 1);
    std::fs::write(layout.commitment_path(), tampered).unwrap();

    let err = run_pipeline(
        &layout,
        &file_context(numlib_environment()),
        &WelchHannBackend,
        &host_facts("lab-a", 1, 0),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RunError::Archival(ArchivalError::PreregistrationViolation(
            PreregistrationViolation::MalformedCommitment { .. }
        ))
    ));
    assert!(run_records(dir.path()).is_empty());
}
