//! Pinned whitening.
//!
//! The whitening configuration is a compile-time constant: a Welch noise
//! estimate with 4 s Hann segments overlapping by 2 s. A backend that cannot
//! honour that configuration exactly reports [`BackendError::Unsupported`],
//! which the engine surfaces as a fatal capability error. No other
//! configuration is ever attempted.
//!
//! All arithmetic here is plain IEEE-754 addition, multiplication, division
//! and square root, accumulated sequentially in index order.

use std::f64::consts::PI;

use serde::Serialize;

/// Segment length of the noise estimate, in seconds.
pub const WHITEN_FFTLENGTH: f64 = 4.0;
/// Overlap between consecutive segments, in seconds.
pub const WHITEN_OVERLAP: f64 = 2.0;

/// Taper applied to each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    Hann,
}

/// The one whitening configuration the engine will run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PinnedWhitening {
    pub fftlength: f64,
    pub overlap: f64,
    pub window: WindowFunction,
}

impl PinnedWhitening {
    #[must_use]
    pub const fn pinned() -> Self {
        Self {
            fftlength: WHITEN_FFTLENGTH,
            overlap: WHITEN_OVERLAP,
            window: WindowFunction::Hann,
        }
    }
}

/// Summary of the noise estimate used to whiten a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhiteningSummary {
    pub segment_samples: usize,
    pub step_samples: usize,
    pub segments: usize,
    pub series_mean: f64,
    pub noise_power: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Whitened {
    pub samples: Vec<f64>,
    pub summary: WhiteningSummary,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The backend cannot apply the pinned configuration as specified.
    #[error("{detail}")]
    Unsupported { detail: String },
    #[error("series has {available} samples, pinned segment needs {needed}")]
    InsufficientData { needed: usize, available: usize },
    #[error("noise power is zero; series cannot be whitened")]
    ZeroNoisePower,
    /// An intermediate quantity overflowed or became NaN.
    #[error("{quantity} is not finite ({value}); series magnitude exceeds f64 range")]
    NonFiniteEstimate { quantity: &'static str, value: f64 },
}

/// Spectral backend seam.
pub trait SpectralBackend {
    fn name(&self) -> &'static str;

    /// Whiten `samples` using exactly `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unsupported`] if `config` cannot be honoured
    /// exactly; any other variant if the data cannot be whitened.
    fn whiten(
        &self,
        samples: &[f64],
        sample_rate: f64,
        config: &PinnedWhitening,
    ) -> Result<Whitened, BackendError>;
}

/// Welch-averaged Hann-tapered noise power, applied as a scalar whitening.
#[derive(Debug, Clone, Copy, Default)]
pub struct WelchHannBackend;

impl SpectralBackend for WelchHannBackend {
    fn name(&self) -> &'static str {
        "welch-hann"
    }

    fn whiten(
        &self,
        samples: &[f64],
        sample_rate: f64,
        config: &PinnedWhitening,
    ) -> Result<Whitened, BackendError> {
        let segment = whole_samples(config.fftlength, sample_rate, "fftlength")?;
        let step = whole_samples(config.fftlength - config.overlap, sample_rate, "fftlength - overlap")?;
        if segment < 2 || step == 0 {
            return Err(BackendError::Unsupported {
                detail: format!(
                    "sample_rate {sample_rate} gives segment {segment} and step {step} samples"
                ),
            });
        }
        if samples.len() < segment {
            return Err(BackendError::InsufficientData {
                needed: segment,
                available: samples.len(),
            });
        }

        let mean = finite("series mean", sequential_mean(samples))?;
        let taper = hann(segment);
        let taper_power: f64 = taper.iter().fold(0.0, |acc, w| acc + w * w);

        let mut total = 0.0;
        let mut segments = 0usize;
        let mut start = 0usize;
        while start + segment <= samples.len() {
            let mut acc = 0.0;
            for (w, x) in taper.iter().zip(&samples[start..start + segment]) {
                let d = w * (x - mean);
                acc += d * d;
            }
            total += acc / taper_power;
            segments += 1;
            start += step;
        }
        #[allow(clippy::cast_precision_loss)]
        let noise_power = finite("noise power", total / segments as f64)?;
        if noise_power <= 0.0 {
            return Err(BackendError::ZeroNoisePower);
        }

        let scale = noise_power.sqrt();
        let whitened = samples
            .iter()
            .map(|x| finite("whitened sample", (x - mean) / scale))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Whitened {
            samples: whitened,
            summary: WhiteningSummary {
                segment_samples: segment,
                step_samples: step,
                segments,
                series_mean: mean,
                noise_power,
            },
        })
    }
}

/// A backend that cannot honour any configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl SpectralBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn whiten(&self, _: &[f64], _: f64, config: &PinnedWhitening) -> Result<Whitened, BackendError> {
        Err(BackendError::Unsupported {
            detail: format!(
                "backend cannot apply fftlength={} overlap={} window={:?}",
                config.fftlength, config.overlap, config.window
            ),
        })
    }
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, BackendError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BackendError::NonFiniteEstimate { quantity, value })
    }
}

/// Convert a duration to a whole number of samples, refusing fractions.
fn whole_samples(seconds: f64, sample_rate: f64, what: &str) -> Result<usize, BackendError> {
    let exact = seconds * sample_rate;
    if !(exact.is_finite() && exact >= 0.0 && exact.fract() == 0.0 && exact <= 1.0e15) {
        return Err(BackendError::Unsupported {
            detail: format!("{what} of {seconds} s is not a whole number of samples at {sample_rate} Hz"),
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(exact as usize)
}

pub(crate) fn sequential_mean(xs: &[f64]) -> f64 {
    let sum = xs.iter().fold(0.0, |acc, x| acc + x);
    #[allow(clippy::cast_precision_loss)]
    let n = xs.len() as f64;
    sum / n
}

/// Symmetric Hann taper of length `n >= 2`.
#[allow(clippy::cast_precision_loss)]
fn hann(n: usize) -> Vec<f64> {
    let denom = (n - 1) as f64;
    (0..n)
        .map(|k| 0.5 - 0.5 * series_cos(2.0 * PI * (k as f64) / denom))
        .collect()
}

/// Cosine on `[0, 2π]` by a fixed-length Taylor series, independent of the
/// platform libm.
fn series_cos(x: f64) -> f64 {
    let x = if x > PI { x - 2.0 * PI } else { x };
    let x2 = x * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    for i in 1..=24u32 {
        let k = f64::from(2 * i);
        term = -term * x2 / ((k - 1.0) * k);
        sum += term;
    }
    sum
}
