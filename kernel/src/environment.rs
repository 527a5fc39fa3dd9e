//! Environment verification: exact-match comparison of the live resolved
//! environment against a pinned dependency manifest.
//!
//! There are no version ranges and no "compatible" matching. Every pinned
//! entry must be present with the identical version string and content hash,
//! and nothing may be present that the manifest does not pin. The toolchain
//! is compared the same way under the reserved key [`TOOLCHAIN_KEY`].
//!
//! This module never installs, upgrades, or corrects anything.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::EnvironmentMismatch;
use crate::proof::canon::{is_canonical, to_canonical_bytes, CanonError};
use crate::proof::hash::{canonical_hash, ContentHash, HashDomain};

/// Schema tag carried by every dependency manifest.
pub const MANIFEST_SCHEMA_VERSION: &str = "dependency_manifest.v1";

/// Key under which toolchain divergences are reported. Not a legal crate name.
pub const TOOLCHAIN_KEY: &str = "toolchain:rustc";

/// An exact version plus content-derived hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinnedVersion {
    pub version: String,
    pub hash: String,
}

impl PinnedVersion {
    #[must_use]
    pub fn new(version: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            hash: hash.into(),
        }
    }
}

/// The live, resolved environment of the running process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedEnvironment {
    pub toolchain: PinnedVersion,
    /// Package key → resolved version/hash. Keys follow [`package_key`].
    pub packages: BTreeMap<String, PinnedVersion>,
}

impl Default for PinnedVersion {
    fn default() -> Self {
        Self::new("unknown", "unknown")
    }
}

/// Pinned, hash-locked manifest of the environment an archival run requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyManifest {
    pub schema_version: String,
    pub toolchain: PinnedVersion,
    pub packages: BTreeMap<String, PinnedVersion>,
}

/// Error loading a dependency manifest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest parse error: {detail}")]
    Parse { detail: String },
    #[error("manifest schema_version mismatch: expected {MANIFEST_SCHEMA_VERSION}, found {found}")]
    SchemaVersion { found: String },
    #[error("manifest is not in canonical JSON form")]
    NotCanonical,
    #[error("manifest entry {package:?} has an empty version or hash")]
    EmptyEntry { package: String },
}

impl DependencyManifest {
    /// Pin exactly what is resolved right now.
    #[must_use]
    pub fn pin(resolved: &ResolvedEnvironment) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            toolchain: resolved.toolchain.clone(),
            packages: resolved.packages.clone(),
        }
    }

    /// Parse a manifest from its on-disk bytes.
    ///
    /// Fail-closed: the bytes must be canonical JSON with the expected schema
    /// tag, and every entry must carry a non-empty version and hash.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] on any of the conditions above.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| ManifestError::Parse {
            detail: e.to_string(),
        })?;
        if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(ManifestError::SchemaVersion {
                found: manifest.schema_version,
            });
        }
        if !is_canonical(bytes) {
            return Err(ManifestError::NotCanonical);
        }
        let entries = std::iter::once((TOOLCHAIN_KEY, &manifest.toolchain))
            .chain(manifest.packages.iter().map(|(k, v)| (k.as_str(), v)));
        for (package, pinned) in entries {
            if pinned.version.is_empty() || pinned.hash.is_empty() {
                return Err(ManifestError::EmptyEntry {
                    package: package.to_string(),
                });
            }
        }
        Ok(manifest)
    }

    /// Canonical JSON bytes of the manifest (the on-disk form).
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CanonError> {
        to_canonical_bytes(self)
    }

    /// Domain-separated digest of the canonical manifest bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        Ok(canonical_hash(
            HashDomain::DependencyManifest,
            &self.to_canonical_bytes()?,
        ))
    }
}

/// How a single dependency diverges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DivergenceKind {
    /// Pinned but not resolved.
    Missing,
    /// Resolved but not pinned.
    Extra,
    /// Version strings differ.
    Version,
    /// Content hashes differ.
    Hash,
}

impl std::fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing dependency",
            Self::Extra => "unpinned extra dependency",
            Self::Version => "version mismatch",
            Self::Hash => "hash mismatch",
        })
    }
}

/// One divergence between manifest and live environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub package: String,
    pub kind: DivergenceKind,
    pub expected: Option<String>,
    pub observed: Option<String>,
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (expected {}, observed {})",
            self.package,
            self.kind,
            self.expected.as_deref().unwrap_or("<absent>"),
            self.observed.as_deref().unwrap_or("<absent>"),
        )
    }
}

/// Key a resolved package the way manifests key it.
///
/// A name resolved at a single version is keyed by the bare name; a name
/// resolved at several versions is keyed `name@version` for every occurrence.
#[must_use]
pub fn package_key(name: &str, version: &str, name_is_unique: bool) -> String {
    if name_is_unique {
        name.to_string()
    } else {
        format!("{name}@{version}")
    }
}

/// Verify the live environment against the pinned manifest.
///
/// Reports every divergence, toolchain first, then packages in sorted key
/// order. Version and hash are compared independently, so one package can
/// contribute two divergences.
///
/// # Errors
///
/// Returns [`EnvironmentMismatch`] if any divergence exists.
pub fn verify_environment(
    manifest: &DependencyManifest,
    resolved: &ResolvedEnvironment,
) -> Result<(), EnvironmentMismatch> {
    let mut divergences = Vec::new();

    compare_entry(
        TOOLCHAIN_KEY,
        Some(&manifest.toolchain),
        Some(&resolved.toolchain),
        &mut divergences,
    );

    let keys: BTreeSet<&String> = manifest
        .packages
        .keys()
        .chain(resolved.packages.keys())
        .collect();
    for key in keys {
        compare_entry(
            key,
            manifest.packages.get(key),
            resolved.packages.get(key),
            &mut divergences,
        );
    }

    if divergences.is_empty() {
        Ok(())
    } else {
        Err(EnvironmentMismatch { divergences })
    }
}

fn compare_entry(
    package: &str,
    pinned: Option<&PinnedVersion>,
    live: Option<&PinnedVersion>,
    divergences: &mut Vec<Divergence>,
) {
    match (pinned, live) {
        (Some(p), Some(l)) => {
            if p.version != l.version {
                divergences.push(Divergence {
                    package: package.to_string(),
                    kind: DivergenceKind::Version,
                    expected: Some(p.version.clone()),
                    observed: Some(l.version.clone()),
                });
            }
            if p.hash != l.hash {
                divergences.push(Divergence {
                    package: package.to_string(),
                    kind: DivergenceKind::Hash,
                    expected: Some(p.hash.clone()),
                    observed: Some(l.hash.clone()),
                });
            }
        }
        (Some(p), None) => divergences.push(Divergence {
            package: package.to_string(),
            kind: DivergenceKind::Missing,
            expected: Some(format!("{}@{}", p.version, p.hash)),
            observed: None,
        }),
        (None, Some(l)) => divergences.push(Divergence {
            package: package.to_string(),
            kind: DivergenceKind::Extra,
            expected: None,
            observed: Some(format!("{}@{}", l.version, l.hash)),
        }),
        (None, None) => {}
    }
}
