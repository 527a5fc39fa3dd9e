//! Cross-process determinism and exit codes.
//!
//! Spawns the `pipeline_fixture` binary against archival layouts pinned to
//! the environment the binary was built with, under cwd, locale and noise
//! environment variants, and asserts the forensic artifact is byte-identical
//! across all of them.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use archival_harness::artifact::AuditMetadata;
use archival_harness::layout::ArchivalLayout;
use archival_harness::probe::live_environment;
use archival_kernel::environment::PinnedVersion;
use lock_tests::scenario::{
    audit_path, forensic_bytes, numlib_environment, populate, run_records, scenario_parameters,
    write_parameters,
};

fn binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_pipeline_fixture")
}

/// Run the fixture in `work_dir` with the given environment overrides.
fn run_variant(work_dir: &Path, env_overrides: &[(&str, &str)]) -> Output {
    let mut command = Command::new(binary_path());
    command.current_dir(work_dir).stdin(Stdio::null());

    command
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE")
        .env_remove("RUST_LOG");

    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    command.output().unwrap_or_else(|e| {
        panic!(
            "failed to spawn {} (work_dir={}, overrides={env_overrides:?}): {e}",
            binary_path(),
            work_dir.display()
        )
    })
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "pipeline_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn crossproc_determinism_env_variants() {
    let live = live_environment().unwrap();

    let base_dir = tempfile::tempdir().unwrap();
    populate(base_dir.path(), &live);
    let baseline = run_variant(base_dir.path(), &[]);
    assert_success(&baseline);
    let baseline_stdout = String::from_utf8(baseline.stdout).unwrap();
    assert!(baseline_stdout.contains("forensic=sha256:"));
    let baseline_bytes = forensic_bytes(base_dir.path());

    // Different directory.
    let other_dir = tempfile::tempdir().unwrap();
    populate(other_dir.path(), &live);
    let out = run_variant(other_dir.path(), &[]);
    assert_success(&out);
    assert_eq!(String::from_utf8(out.stdout).unwrap(), baseline_stdout);
    assert_eq!(forensic_bytes(other_dir.path()), baseline_bytes);

    let variants: [&[(&str, &str)]; 3] = [
        &[("LC_ALL", "C"), ("LANG", "C")],
        &[("LC_ALL", "de_DE.UTF-8"), ("LANG", "tr_TR.UTF-8")],
        &[
            ("ARCHIVAL_NOISE", "should_not_matter"),
            ("TZ", "America/New_York"),
            ("HOME", "/nonexistent"),
            ("ARCHIVAL_LOG_FORMAT", "json"),
            ("RUST_LOG", "debug"),
        ],
    ];
    for overrides in variants {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &live);
        let out = run_variant(dir.path(), overrides);
        assert_success(&out);
        assert_eq!(
            forensic_bytes(dir.path()),
            baseline_bytes,
            "forensic artifact differs under {overrides:?}"
        );
    }
}

#[test]
fn inherited_stdin_is_not_refused() {
    let live = live_environment().unwrap();
    let null_dir = tempfile::tempdir().unwrap();
    populate(null_dir.path(), &live);
    assert_success(&run_variant(null_dir.path(), &[]));

    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &live);
    let out = Command::new(binary_path())
        .current_dir(dir.path())
        .stdin(Stdio::inherit())
        .output()
        .unwrap();
    assert_success(&out);
    assert_eq!(forensic_bytes(dir.path()), forensic_bytes(null_dir.path()));
}

#[test]
fn audit_hostname_ignores_environment_override() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &live_environment().unwrap());
    let out = run_variant(dir.path(), &[("HOSTNAME", "spoofed-archival-host")]);
    assert_success(&out);
    let audit: AuditMetadata =
        serde_json::from_slice(&std::fs::read(audit_path(dir.path())).unwrap()).unwrap();
    assert_ne!(audit.hostname, "spoofed-archival-host");
}

#[test]
fn logs_go_to_stderr_only() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &live_environment().unwrap());
    let out = run_variant(dir.path(), &[("ARCHIVAL_LOG_FORMAT", "json")]);
    assert_success(&out);
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 2, "unexpected stdout: {stdout}");
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("stage.passed"), "stderr: {stderr}");
    assert!(stderr.contains("artifact.written"), "stderr: {stderr}");
}

#[test]
fn environment_mismatch_exits_2_without_records() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &numlib_environment());
    let out = run_variant(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("numlib"));
    assert!(run_records(dir.path()).is_empty());
}

#[test]
fn toolchain_mismatch_exits_2() {
    let mut live = live_environment().unwrap();
    live.toolchain = PinnedVersion::new("0.0.0", "deadbeef");
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), &live);
    let out = run_variant(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("toolchain:rustc"));
}

#[test]
fn altered_parameters_exit_3_without_records() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &live_environment().unwrap());
    let mut params = scenario_parameters();
    params["window_end"] = serde_json::json!(121.0);
    write_parameters(&layout, &params);
    let out = run_variant(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(3));
    assert!(run_records(dir.path()).is_empty());
}

#[test]
fn relaxed_run_config_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &live_environment().unwrap());
    std::fs::write(layout.run_config_path(), br#"{"strict_archival": false}"#).unwrap();
    let out = run_variant(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(4));
    assert!(run_records(dir.path()).is_empty());
}

#[test]
fn window_outside_data_exits_5() {
    let dir = tempfile::tempdir().unwrap();
    let layout = populate(dir.path(), &live_environment().unwrap());
    let params = serde_json::json!({"window_start": 900.0, "window_end": 920.0, "seed": 42});
    write_parameters(&layout, &params);
    lock_tests::scenario::seal(&layout, &params);
    let out = run_variant(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(5));
    assert!(run_records(dir.path()).is_empty());
}

#[test]
fn missing_layout_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_variant(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!ArchivalLayout::at(dir.path()).forensic_path().exists());
}
