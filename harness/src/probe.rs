//! Live environment probe and run-context capture.
//!
//! The resolved dependency set is the workspace lockfile embedded at build
//! time, and the toolchain is the `rustc -V` string captured by the build
//! script. Together they describe what this binary was actually built from.

use std::collections::BTreeMap;

use serde::Deserialize;

use archival_kernel::context::{CodeIdentity, RunConfig, RunContext};
use archival_kernel::environment::{package_key, PinnedVersion, ResolvedEnvironment};
use archival_kernel::proof::hash::raw_sha256;

const EMBEDDED_LOCKFILE: &str = include_str!(concat!(env!("OUT_DIR"), "/Cargo.lock"));

/// Full `rustc -V` output of the compiler that built this binary.
pub const RUSTC_VERSION: &str = env!("ARCHIVAL_RUSTC_VERSION");

/// Error probing the live environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("lockfile parse error: {detail}")]
    Lockfile { detail: String },
}

#[derive(Debug, Deserialize)]
struct Lockfile {
    #[serde(default)]
    package: Vec<LockedPackage>,
}

#[derive(Debug, Deserialize)]
struct LockedPackage {
    name: String,
    version: String,
    source: Option<String>,
    checksum: Option<String>,
}

/// Split `rustc 1.79.0 (129f3b996 2024-06-10)` into release and commit.
#[must_use]
pub fn parse_toolchain(raw: &str) -> PinnedVersion {
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("rustc"), Some(release), Some(commit)) => {
            PinnedVersion::new(release, commit.trim_start_matches('('))
        }
        (Some("rustc"), Some(release), None) => PinnedVersion::new(release, "unknown"),
        _ => PinnedVersion::new(raw.trim(), "unknown"),
    }
}

/// Build a resolved environment from lockfile text and a toolchain string.
///
/// Only registry packages (those with a `source`) are included; workspace
/// members have no published identity.
///
/// # Errors
///
/// Returns [`ProbeError::Lockfile`] if the text is not a valid lockfile.
pub fn resolve_from_lockfile(
    lockfile: &str,
    toolchain: &str,
) -> Result<ResolvedEnvironment, ProbeError> {
    let lock: Lockfile = toml::from_str(lockfile).map_err(|e| ProbeError::Lockfile {
        detail: e.to_string(),
    })?;
    let external: Vec<&LockedPackage> = lock.package.iter().filter(|p| p.source.is_some()).collect();

    let mut name_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for p in &external {
        *name_counts.entry(p.name.as_str()).or_default() += 1;
    }

    let mut packages = BTreeMap::new();
    for p in external {
        let hash = match (&p.checksum, &p.source) {
            (Some(checksum), _) => format!("sha256:{checksum}"),
            (None, Some(source)) => format!("source:{source}"),
            (None, None) => "unknown".to_string(),
        };
        let unique = name_counts.get(p.name.as_str()) == Some(&1);
        packages.insert(
            package_key(&p.name, &p.version, unique),
            PinnedVersion::new(p.version.clone(), hash),
        );
    }

    Ok(ResolvedEnvironment {
        toolchain: parse_toolchain(toolchain),
        packages,
    })
}

/// The environment this binary was built with.
///
/// # Errors
///
/// Returns [`ProbeError`] if the embedded lockfile cannot be parsed.
pub fn live_environment() -> Result<ResolvedEnvironment, ProbeError> {
    resolve_from_lockfile(EMBEDDED_LOCKFILE, RUSTC_VERSION)
}

/// Hash the running executable image.
#[must_use]
pub fn capture_code_identity() -> CodeIdentity {
    let path = match std::env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            return CodeIdentity::Unavailable {
                reason: format!("current_exe: {e}"),
            }
        }
    };
    match std::fs::read(&path) {
        Ok(bytes) => CodeIdentity::File {
            executable_sha256: raw_sha256(&bytes),
            executable_path: path.display().to_string(),
        },
        Err(e) => CodeIdentity::Unavailable {
            reason: format!("read {}: {e}", path.display()),
        },
    }
}

/// Capture the run context of the current process.
///
/// # Errors
///
/// Returns [`ProbeError`] if the live environment cannot be resolved.
pub fn capture_context(config: &RunConfig) -> Result<RunContext, ProbeError> {
    Ok(RunContext::new(
        config,
        capture_code_identity(),
        live_environment()?,
    ))
}
