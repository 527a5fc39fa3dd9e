//! Input time series: parsing, validation, identity.

use serde::{Deserialize, Serialize};

use crate::error::FatalExecution;
use crate::proof::canon::{to_canonical_bytes, CanonError};
use crate::proof::hash::{canonical_hash, ContentHash, HashDomain};

/// Schema tag carried by every input series file.
pub const INPUT_SCHEMA_VERSION: &str = "input_series.v1";

/// A uniformly sampled strain channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSeries {
    pub schema_version: String,
    pub channel: String,
    /// Samples per second.
    pub sample_rate: f64,
    /// Time of sample 0, in seconds.
    pub t0: f64,
    pub samples: Vec<f64>,
}

impl InputSeries {
    /// Parse and validate input bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FatalExecution::MalformedInput`] if the bytes do not parse
    /// or fail [`InputSeries::validate`].
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, FatalExecution> {
        let series: Self =
            serde_json::from_slice(bytes).map_err(|e| FatalExecution::MalformedInput {
                detail: e.to_string(),
            })?;
        series.validate()?;
        Ok(series)
    }

    /// # Errors
    ///
    /// Returns [`FatalExecution::MalformedInput`] naming the first violated
    /// condition.
    pub fn validate(&self) -> Result<(), FatalExecution> {
        let malformed = |detail: String| Err(FatalExecution::MalformedInput { detail });
        if self.schema_version != INPUT_SCHEMA_VERSION {
            return malformed(format!(
                "schema_version expected {INPUT_SCHEMA_VERSION}, found {}",
                self.schema_version
            ));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return malformed(format!("sample_rate must be positive, found {}", self.sample_rate));
        }
        if !self.t0.is_finite() {
            return malformed("t0 must be finite".to_string());
        }
        if self.samples.is_empty() {
            return malformed("samples must not be empty".to_string());
        }
        if let Some(i) = self.samples.iter().position(|s| !s.is_finite()) {
            return malformed(format!("sample {i} is not finite"));
        }
        Ok(())
    }

    /// Time of sample `i`, in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_of(&self, i: usize) -> f64 {
        self.t0 + (i as f64) / self.sample_rate
    }

    /// Domain-separated digest of the canonical series bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if the series is not representable.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        Ok(canonical_hash(
            HashDomain::InputSeries,
            &to_canonical_bytes(self)?,
        ))
    }
}
