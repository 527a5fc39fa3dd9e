//! Deterministic execution engine.
//!
//! Given verified parameters and an input series, produces a
//! [`ResultRecord`] that is a pure function of those two inputs. Whitening
//! runs only through the pinned path, after a self-check on a synthetic
//! series; every path actually taken is recorded in the
//! [`ExecutionLedger`] and surfaced in the record.

pub mod plan;
pub mod residual;
pub mod series;
pub mod whiten;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::FatalExecution;
use crate::preregistration::VerifiedParameters;
use crate::proof::finite::ensure_finite;
use plan::{AnalysisPlan, WhiteningPath};
use residual::{NullDistribution, Residual, WindowStats};
use series::InputSeries;
use whiten::{BackendError, PinnedWhitening, SpectralBackend, Whitened, WhiteningSummary};

/// Identifier of the engine revision, bound into the run fingerprint.
pub const ENGINE_ID: &str = "residual-engine.v1";

/// Whitening modes the engine can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteningMode {
    Pinned,
}

/// Per-run record of execution paths taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionLedger {
    whitening_modes_seen: BTreeSet<WhiteningMode>,
}

impl ExecutionLedger {
    pub fn record(&mut self, mode: WhiteningMode) {
        self.whitening_modes_seen.insert(mode);
    }

    #[must_use]
    pub fn whitening_modes_seen(&self) -> Vec<WhiteningMode> {
        self.whitening_modes_seen.iter().copied().collect()
    }
}

/// Whitening configuration and the noise estimate it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhiteningRecord {
    pub path: WhiteningMode,
    pub config: PinnedWhitening,
    pub estimate: WhiteningSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRecord {
    pub start: f64,
    pub end: f64,
    pub stats: WindowStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlRecord {
    pub selection: &'static str,
    pub stats: WindowStats,
}

/// Analysis output. Serialized canonically into the forensic artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub engine: &'static str,
    pub whitening: WhiteningRecord,
    pub window: WindowRecord,
    pub control: ControlRecord,
    pub residual: Residual,
    pub null_distribution: NullDistribution,
    pub whitening_modes_seen: Vec<WhiteningMode>,
    /// The verified parameter set the record was computed under.
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub commitment: String,
}

fn backend_failure(backend: &dyn SpectralBackend, err: BackendError) -> FatalExecution {
    match err {
        BackendError::Unsupported { detail } => FatalExecution::CapabilityUnavailable {
            capability: "pinned whitening",
            detail: format!("backend {}: {detail}", backend.name()),
        },
        other => FatalExecution::MalformedInput {
            detail: other.to_string(),
        },
    }
}

fn whiten(
    backend: &dyn SpectralBackend,
    path: &WhiteningPath,
    samples: &[f64],
    sample_rate: f64,
    ledger: &mut ExecutionLedger,
) -> Result<Whitened, BackendError> {
    match path {
        WhiteningPath::Pinned(config) => {
            let out = backend.whiten(samples, sample_rate, config)?;
            ledger.record(WhiteningMode::Pinned);
            Ok(out)
        }
    }
}

/// Synthetic series for the self-check: 64 s at 4 Hz.
fn self_check_series() -> Vec<f64> {
    (0u32..256)
        .map(|i| f64::from((i * 7919) % 97) / 97.0 - 0.5)
        .collect()
}

/// Exercise the pinned path on a synthetic series before touching real data.
///
/// # Errors
///
/// - [`FatalExecution::CapabilityUnavailable`] if the backend cannot apply
///   the pinned configuration.
/// - [`FatalExecution::SelfCheckFailed`] if the output is not well-formed.
pub fn self_check(
    backend: &dyn SpectralBackend,
    path: &WhiteningPath,
    ledger: &mut ExecutionLedger,
) -> Result<(), FatalExecution> {
    let synthetic = self_check_series();
    let out = whiten(backend, path, &synthetic, 4.0, ledger).map_err(|e| match e {
        unsupported @ BackendError::Unsupported { .. } => backend_failure(backend, unsupported),
        other => FatalExecution::SelfCheckFailed {
            detail: other.to_string(),
        },
    })?;
    if out.samples.len() != synthetic.len() {
        return Err(FatalExecution::SelfCheckFailed {
            detail: format!(
                "output length {} differs from input length {}",
                out.samples.len(),
                synthetic.len()
            ),
        });
    }
    if !out.samples.iter().all(|s| s.is_finite()) || !out.summary.noise_power.is_finite() {
        return Err(FatalExecution::SelfCheckFailed {
            detail: "non-finite whitened output".into(),
        });
    }
    Ok(())
}

/// Run the analysis.
///
/// # Errors
///
/// Returns [`FatalExecution`] on any failure; no partial record is produced,
/// and a record is never returned with a NaN or infinite value in it.
pub fn execute(
    verified: &VerifiedParameters,
    input: &InputSeries,
    backend: &dyn SpectralBackend,
) -> Result<ResultRecord, FatalExecution> {
    let plan = AnalysisPlan::from_verified(verified)?;
    input.validate()?;

    let mut ledger = ExecutionLedger::default();
    self_check(backend, &plan.whitening, &mut ledger)?;

    let whitened = whiten(
        backend,
        &plan.whitening,
        &input.samples,
        input.sample_rate,
        &mut ledger,
    )
    .map_err(|e| backend_failure(backend, e))?;
    if whitened.samples.len() != input.samples.len() {
        return Err(FatalExecution::MalformedInput {
            detail: "whitened series length differs from input".into(),
        });
    }

    let (range, window) = residual::window_stats(input, &whitened.samples, plan.window)?;
    let control = residual::control_stats(
        input,
        &whitened.samples,
        &range,
        plan.control,
        plan.window,
    )?;
    let residual = residual::residual(&window, &control)?;
    let null_distribution = residual::null_distribution(&whitened.samples, &window, plan.seed);

    let WhiteningPath::Pinned(config) = plan.whitening;
    let record = ResultRecord {
        engine: ENGINE_ID,
        whitening: WhiteningRecord {
            path: WhiteningMode::Pinned,
            config,
            estimate: whitened.summary,
        },
        window: WindowRecord {
            start: plan.window.start,
            end: plan.window.end,
            stats: window,
        },
        control: ControlRecord {
            selection: plan.control.label(),
            stats: control,
        },
        residual,
        null_distribution,
        whitening_modes_seen: ledger.whitening_modes_seen(),
        parameters: verified.params().as_map().clone(),
        commitment: verified.commitment().as_str().to_string(),
    };
    ensure_finite(&record).map_err(|e| FatalExecution::Canon {
        detail: e.to_string(),
    })?;
    Ok(record)
}
