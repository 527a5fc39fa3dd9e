//! Window statistics, residual, and the seeded null distribution.

use serde::Serialize;

use super::plan::{ControlSelection, Window};
use super::series::InputSeries;
use crate::error::FatalExecution;

/// Number of off-source trials in the null distribution.
pub const NULL_TRIALS: u32 = 256;

/// Power statistics of whitened samples in one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStats {
    pub samples: usize,
    pub energy: f64,
    pub mean_power: f64,
    pub peak_abs: f64,
}

impl WindowStats {
    fn accumulate<'a>(values: impl Iterator<Item = &'a f64>) -> Option<Self> {
        let mut samples = 0usize;
        let mut energy = 0.0;
        let mut peak_abs: f64 = 0.0;
        for v in values {
            samples += 1;
            energy += v * v;
            peak_abs = peak_abs.max(v.abs());
        }
        if samples == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean_power = energy / samples as f64;
        Some(Self {
            samples,
            energy,
            mean_power,
            peak_abs,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Residual {
    /// Window mean power over control mean power.
    pub power_ratio: f64,
    /// Window mean power minus control mean power.
    pub power_excess: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullDistribution {
    pub seed: u64,
    pub trials: u32,
    /// Trials whose mean power reached the on-window mean power.
    pub exceed_count: u32,
    pub exceedance_fraction: f64,
}

/// One SplitMix64 step.
pub fn splitmix64_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Contiguous index range of samples whose time lies in `window`.
fn select(series: &InputSeries, window: Window) -> std::ops::Range<usize> {
    let mut inside = (0..series.samples.len()).filter(|&i| window.contains(series.time_of(i)));
    match inside.next() {
        Some(first) => {
            let last = inside.last().unwrap_or(first);
            first..last + 1
        }
        None => 0..0,
    }
}

/// Statistics of the analysis window.
///
/// # Errors
///
/// Returns [`FatalExecution::EmptyWindow`] if the window holds no samples.
pub fn window_stats(
    series: &InputSeries,
    whitened: &[f64],
    window: Window,
) -> Result<(std::ops::Range<usize>, WindowStats), FatalExecution> {
    let range = select(series, window);
    let stats = WindowStats::accumulate(whitened[range.clone()].iter()).ok_or(
        FatalExecution::EmptyWindow {
            window: "analysis",
            start: window.start,
            end: window.end,
        },
    )?;
    Ok((range, stats))
}

/// Statistics of the control selection.
///
/// # Errors
///
/// Returns [`FatalExecution::EmptyWindow`] if the selection holds no samples.
pub fn control_stats(
    series: &InputSeries,
    whitened: &[f64],
    analysis: &std::ops::Range<usize>,
    control: ControlSelection,
    window: Window,
) -> Result<WindowStats, FatalExecution> {
    let stats = match control {
        ControlSelection::Explicit(c) => {
            let range = select(series, c);
            WindowStats::accumulate(whitened[range].iter()).ok_or(FatalExecution::EmptyWindow {
                window: "control",
                start: c.start,
                end: c.end,
            })
        }
        ControlSelection::Complement => WindowStats::accumulate(
            whitened[..analysis.start]
                .iter()
                .chain(&whitened[analysis.end..]),
        )
        .ok_or(FatalExecution::EmptyWindow {
            window: "control",
            start: window.start,
            end: window.end,
        }),
    }?;
    Ok(stats)
}

/// # Errors
///
/// Returns [`FatalExecution::MalformedInput`] if the control has zero power
/// or either statistic is not finite.
pub fn residual(window: &WindowStats, control: &WindowStats) -> Result<Residual, FatalExecution> {
    if control.mean_power <= 0.0 {
        return Err(FatalExecution::MalformedInput {
            detail: "control selection has zero power".into(),
        });
    }
    let residual = Residual {
        power_ratio: window.mean_power / control.mean_power,
        power_excess: window.mean_power - control.mean_power,
    };
    for (name, value) in [
        ("power_ratio", residual.power_ratio),
        ("power_excess", residual.power_excess),
    ] {
        if !value.is_finite() {
            return Err(FatalExecution::MalformedInput {
                detail: format!("residual {name} is not finite ({value})"),
            });
        }
    }
    Ok(residual)
}

/// Draw [`NULL_TRIALS`] windows of the analysis length at seeded offsets and
/// count those whose mean power reaches `observed.mean_power`.
#[must_use]
pub fn null_distribution(whitened: &[f64], observed: &WindowStats, seed: u64) -> NullDistribution {
    let len = observed.samples;
    let positions = (whitened.len() - len + 1) as u64;
    let mut state = seed;
    let mut exceed_count = 0u32;
    for _ in 0..NULL_TRIALS {
        #[allow(clippy::cast_possible_truncation)]
        let offset = (splitmix64_next(&mut state) % positions) as usize;
        let trial = WindowStats::accumulate(whitened[offset..offset + len].iter());
        if trial.is_some_and(|t| t.mean_power >= observed.mean_power) {
            exceed_count += 1;
        }
    }
    NullDistribution {
        seed,
        trials: NULL_TRIALS,
        exceed_count,
        exceedance_fraction: f64::from(exceed_count) / f64::from(NULL_TRIALS),
    }
}
