//! Pin the environment this binary was built with.
//!
//! Writes `archival/dependency_manifest.json` from the embedded lockfile and
//! toolchain. Run it once, under the environment being archived.

use std::process::ExitCode;

use archival_harness::artifact_dir::write_atomic;
use archival_harness::error::RunError;
use archival_harness::layout::ArchivalLayout;
use archival_harness::probe::live_environment;
use archival_harness::telemetry;
use archival_kernel::environment::DependencyManifest;

fn pin() -> Result<DependencyManifest, RunError> {
    let layout = ArchivalLayout::from_current_dir()?;
    let resolved = live_environment().map_err(|e| RunError::Config {
        path: "embedded Cargo.lock".into(),
        detail: e.to_string(),
    })?;
    let manifest = DependencyManifest::pin(&resolved);
    let bytes = manifest.to_canonical_bytes().map_err(|e| RunError::Canon {
        detail: e.to_string(),
    })?;
    std::fs::create_dir_all(layout.archival_dir()).map_err(|e| RunError::Io {
        path: layout.archival_dir().display().to_string(),
        detail: e.to_string(),
    })?;
    write_atomic(layout.manifest_path(), &bytes)?;
    tracing::info!(
        event = "environment.pinned",
        packages = manifest.packages.len(),
        toolchain = %manifest.toolchain.version,
    );
    Ok(manifest)
}

fn main() -> ExitCode {
    telemetry::init_from_env();
    match pin() {
        Ok(manifest) => match manifest.digest() {
            Ok(digest) => {
                println!("{digest}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("FATAL: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("FATAL: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
