//! Scenario fixtures: a populated archival layout, fixed contexts and host
//! facts.
//!
//! The reference scenario pins `numlib == 2.3.1` with hash `h1`, preregisters
//! `{window_start: 100.0, window_end: 120.0, seed: 42}` and analyses 200 s of
//! a 4 Hz channel with a louder stretch inside the analysis window.
//!
//! # Panics
//!
//! Helpers panic on I/O or serialization failure. These are test-only
//! invariants.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::TimeZone;

use archival_harness::artifact::HostFacts;
use archival_harness::layout::ArchivalLayout;
use archival_kernel::context::{CodeIdentity, RunConfig, RunContext};
use archival_kernel::engine::series::{InputSeries, INPUT_SCHEMA_VERSION};
use archival_kernel::environment::{DependencyManifest, PinnedVersion, ResolvedEnvironment};
use archival_kernel::preregistration::{CommitmentRecord, PreregisteredParameterSet};
use archival_kernel::proof::canon::to_canonical_bytes;
use archival_kernel::proof::hash::raw_sha256;

pub const PREREGISTERED_ON: &str = "2025-12-18";

/// The reference parameter set P.
#[must_use]
pub fn scenario_parameters() -> serde_json::Value {
    serde_json::json!({"window_start": 100.0, "window_end": 120.0, "seed": 42})
}

#[must_use]
pub fn parameter_set(value: &serde_json::Value) -> PreregisteredParameterSet {
    let serde_json::Value::Object(map) = value else {
        panic!("parameter set must be an object")
    };
    PreregisteredParameterSet::from_map(map.clone())
}

#[must_use]
pub fn scenario_input() -> InputSeries {
    let samples = (0u32..800)
        .map(|i| {
            let base = f64::from((i * 7919) % 101) / 101.0 - 0.5;
            if (400..480).contains(&i) {
                base * 2.5
            } else {
                base
            }
        })
        .collect();
    InputSeries {
        schema_version: INPUT_SCHEMA_VERSION.into(),
        channel: "H1:GDS-CALIB_STRAIN".into(),
        sample_rate: 4.0,
        t0: 0.0,
        samples,
    }
}

/// `numlib == 2.3.1` (hash `h1`) under a fixed toolchain.
#[must_use]
pub fn numlib_environment() -> ResolvedEnvironment {
    ResolvedEnvironment {
        toolchain: PinnedVersion::new("1.79.0", "129f3b996"),
        packages: BTreeMap::from([("numlib".to_string(), PinnedVersion::new("2.3.1", "h1"))]),
    }
}

pub fn write_manifest(layout: &ArchivalLayout, manifest: &DependencyManifest) {
    std::fs::write(layout.manifest_path(), manifest.to_canonical_bytes().unwrap()).unwrap();
}

/// Write `params` as the parameter file without resealing.
pub fn write_parameters(layout: &ArchivalLayout, params: &serde_json::Value) {
    std::fs::write(
        layout.parameters_path(),
        serde_json::to_vec_pretty(params).unwrap(),
    )
    .unwrap();
}

/// Seal `params` and publish the commitment record.
pub fn seal(layout: &ArchivalLayout, params: &serde_json::Value) -> CommitmentRecord {
    let record = CommitmentRecord::seal(&parameter_set(params), PREREGISTERED_ON).unwrap();
    std::fs::write(layout.commitment_path(), record.to_canonical_bytes().unwrap()).unwrap();
    record
}

/// Populate a complete archival layout under `root`, pinned to `pinned`.
#[must_use]
pub fn populate(root: &Path, pinned: &ResolvedEnvironment) -> ArchivalLayout {
    let layout = ArchivalLayout::at(root);
    std::fs::create_dir_all(layout.archival_dir()).unwrap();
    write_manifest(&layout, &DependencyManifest::pin(pinned));
    write_parameters(&layout, &scenario_parameters());
    seal(&layout, &scenario_parameters());
    std::fs::write(
        layout.input_path(),
        to_canonical_bytes(&scenario_input()).unwrap(),
    )
    .unwrap();
    layout
}

#[must_use]
pub fn file_code(image: &[u8]) -> CodeIdentity {
    CodeIdentity::File {
        executable_sha256: raw_sha256(image),
        executable_path: "/opt/archival/bin/residual_pipeline".into(),
    }
}

/// A strict, file-based context over `environment`.
#[must_use]
pub fn file_context(environment: ResolvedEnvironment) -> RunContext {
    RunContext::new(&RunConfig::default(), file_code(b"image"), environment)
}

#[must_use]
pub fn host_facts(hostname: &str, pid: u32, second: u32) -> HostFacts {
    HostFacts {
        run_id: uuid::Uuid::new_v4(),
        started_at: chrono::Utc
            .with_ymd_and_hms(2025, 12, 18, 12, 0, second)
            .unwrap(),
        hostname: hostname.into(),
        os: "linux".into(),
        arch: "x86_64".into(),
        pid,
        toolchain: "rustc 1.79.0 (129f3b996 2024-06-10)".into(),
    }
}

/// Names of `run_record_*` files directly under `root`, sorted.
#[must_use]
pub fn run_records(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("run_record_"))
        .collect();
    names.sort();
    names
}

#[must_use]
pub fn forensic_bytes(root: &Path) -> Vec<u8> {
    std::fs::read(ArchivalLayout::at(root).forensic_path()).unwrap()
}

/// Path of the single audit record under `root`.
#[must_use]
pub fn audit_path(root: &Path) -> PathBuf {
    let audits: Vec<String> = run_records(root)
        .into_iter()
        .filter(|n| n != "run_record_LATEST.json")
        .collect();
    assert_eq!(audits.len(), 1, "expected exactly one audit record: {audits:?}");
    root.join(&audits[0])
}
