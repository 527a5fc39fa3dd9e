//! Archival layout: fixed file locations rooted at the working directory.
//!
//! ```text
//! <root>/
//!   archival/dependency_manifest.json    pinned manifest (canonical JSON)
//!   archival/parameters.json             preregistered parameter set
//!   archival/preregistration.json        published commitment record
//!   archival/input_series.json           input data
//!   archival/run_config.json             optional run configuration
//!   run_record_LATEST.json               forensic artifact
//!   run_record_<fp16>_<ts>_<run8>.json   audit metadata
//! ```
//!
//! Every required file is read fail-closed: absence is an error, never a
//! default. Only the run configuration is optional.

use std::path::{Path, PathBuf};

use archival_kernel::context::RunConfig;
use archival_kernel::engine::series::InputSeries;
use archival_kernel::environment::DependencyManifest;
use archival_kernel::error::ArchivalError;
use archival_kernel::preregistration::{CommitmentRecord, PreregisteredParameterSet};

use crate::error::RunError;

pub const ARCHIVAL_DIR: &str = "archival";
pub const MANIFEST_FILENAME: &str = "dependency_manifest.json";
pub const PARAMETERS_FILENAME: &str = "parameters.json";
pub const COMMITMENT_FILENAME: &str = "preregistration.json";
pub const INPUT_FILENAME: &str = "input_series.json";
pub const RUN_CONFIG_FILENAME: &str = "run_config.json";
pub const FORENSIC_FILENAME: &str = "run_record_LATEST.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivalLayout {
    root: PathBuf,
}

impl ArchivalLayout {
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the process working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] if the working directory is unavailable.
    pub fn from_current_dir() -> Result<Self, RunError> {
        let root = std::env::current_dir().map_err(|e| RunError::Io {
            path: ".".into(),
            detail: e.to_string(),
        })?;
        Ok(Self::at(root))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn archival_dir(&self) -> PathBuf {
        self.root.join(ARCHIVAL_DIR)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.archival_dir().join(MANIFEST_FILENAME)
    }

    #[must_use]
    pub fn parameters_path(&self) -> PathBuf {
        self.archival_dir().join(PARAMETERS_FILENAME)
    }

    #[must_use]
    pub fn commitment_path(&self) -> PathBuf {
        self.archival_dir().join(COMMITMENT_FILENAME)
    }

    #[must_use]
    pub fn input_path(&self) -> PathBuf {
        self.archival_dir().join(INPUT_FILENAME)
    }

    #[must_use]
    pub fn run_config_path(&self) -> PathBuf {
        self.archival_dir().join(RUN_CONFIG_FILENAME)
    }

    #[must_use]
    pub fn forensic_path(&self) -> PathBuf {
        self.root.join(FORENSIC_FILENAME)
    }

    /// `run_record_<fingerprint16>_<timestamp>_<run8>.json`.
    ///
    /// `run_tag` distinguishes runs of one fingerprint within the same second.
    #[must_use]
    pub fn audit_path(&self, fingerprint_short: &str, timestamp: &str, run_tag: &str) -> PathBuf {
        self.root
            .join(format!("run_record_{fingerprint_short}_{timestamp}_{run_tag}.json"))
    }

    /// # Errors
    ///
    /// Returns [`RunError::Config`] if the file exists but is malformed.
    pub fn load_run_config(&self) -> Result<RunConfig, RunError> {
        let path = self.run_config_path();
        if !path.exists() {
            return Ok(RunConfig::default());
        }
        let bytes = read_required(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| config_error(&path, e))
    }

    /// # Errors
    ///
    /// Returns [`RunError`] if the manifest is absent or malformed.
    pub fn load_manifest(&self) -> Result<DependencyManifest, RunError> {
        let path = self.manifest_path();
        DependencyManifest::from_json_bytes(&read_required(&path)?)
            .map_err(|e| config_error(&path, e))
    }

    /// # Errors
    ///
    /// Returns [`RunError`] if the parameter set is absent or malformed.
    pub fn load_parameters(&self) -> Result<PreregisteredParameterSet, RunError> {
        let path = self.parameters_path();
        PreregisteredParameterSet::from_json_bytes(&read_required(&path)?)
            .map_err(|e| config_error(&path, e))
    }

    /// # Errors
    ///
    /// Returns [`RunError`] if the commitment record is absent or malformed.
    pub fn load_commitment(&self) -> Result<CommitmentRecord, RunError> {
        let path = self.commitment_path();
        CommitmentRecord::from_json_bytes(&read_required(&path)?)
            .map_err(|e| config_error(&path, e))
    }

    /// Load the input series. Malformed data is a fatal execution error, not a
    /// configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the file is absent or its content is invalid.
    pub fn load_input(&self) -> Result<InputSeries, RunError> {
        let bytes = read_required(&self.input_path())?;
        InputSeries::from_json_bytes(&bytes).map_err(|e| RunError::from(ArchivalError::from(e)))
    }
}

fn read_required(path: &Path) -> Result<Vec<u8>, RunError> {
    std::fs::read(path).map_err(|e| RunError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> RunError {
    RunError::Config {
        path: path.display().to_string(),
        detail: err.to_string(),
    }
}
