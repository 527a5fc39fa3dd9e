//! Analysis plan: the typed view of a verified parameter set.

use serde_json::Value;

use super::whiten::PinnedWhitening;
use crate::error::FatalExecution;
use crate::preregistration::VerifiedParameters;

/// Parameter names the engine recognizes.
pub const KNOWN_PARAMETERS: [&str; 5] = [
    "control_end",
    "control_start",
    "seed",
    "window_end",
    "window_start",
];

/// Half-open time interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Where the control (background) statistics are drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlSelection {
    /// An explicitly preregistered control window.
    Explicit(Window),
    /// Every sample outside the analysis window.
    Complement,
}

impl ControlSelection {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Explicit(_) => "explicit",
            Self::Complement => "complement",
        }
    }
}

/// The whitening path. Exactly one path exists; there is nothing to fall
/// back to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WhiteningPath {
    Pinned(PinnedWhitening),
}

/// Everything the engine needs, derived only from verified parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPlan {
    pub window: Window,
    pub control: ControlSelection,
    pub seed: u64,
    pub whitening: WhiteningPath,
}

impl AnalysisPlan {
    /// # Errors
    ///
    /// Returns [`FatalExecution`] if a parameter is missing, unknown, has the
    /// wrong type, or describes an empty interval.
    pub fn from_verified(verified: &VerifiedParameters) -> Result<Self, FatalExecution> {
        let params = verified.params();
        if let Some(unknown) = params
            .as_map()
            .keys()
            .find(|k| !KNOWN_PARAMETERS.contains(&k.as_str()))
        {
            return Err(FatalExecution::InvalidParameter {
                name: unknown.clone(),
                expected: "a recognized parameter name".into(),
                found: "unrecognized parameter".into(),
            });
        }

        let get = |name: &str| params.get(name);
        let window = interval(
            "window_start",
            require_number("window_start", get("window_start"))?,
            "window_end",
            require_number("window_end", get("window_end"))?,
        )?;
        let control = match (get("control_start"), get("control_end")) {
            (None, None) => ControlSelection::Complement,
            (start, end) => ControlSelection::Explicit(interval(
                "control_start",
                require_number("control_start", start)?,
                "control_end",
                require_number("control_end", end)?,
            )?),
        };
        let seed = require_seed(get("seed"))?;

        Ok(Self {
            window,
            control,
            seed,
            whitening: WhiteningPath::Pinned(PinnedWhitening::pinned()),
        })
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(n) => format!("number {n}"),
        Value::String(_) => "string".into(),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}

fn require_number(name: &str, value: Option<&Value>) -> Result<f64, FatalExecution> {
    let value = value.ok_or_else(|| FatalExecution::MissingParameter { name: name.into() })?;
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FatalExecution::InvalidParameter {
            name: name.into(),
            expected: "finite number".into(),
            found: describe(value),
        })
}

fn require_seed(value: Option<&Value>) -> Result<u64, FatalExecution> {
    let value = value.ok_or_else(|| FatalExecution::MissingParameter {
        name: "seed".into(),
    })?;
    value.as_u64().ok_or_else(|| FatalExecution::InvalidParameter {
        name: "seed".into(),
        expected: "non-negative integer".into(),
        found: describe(value),
    })
}

fn interval(
    start_name: &str,
    start: f64,
    end_name: &str,
    end: f64,
) -> Result<Window, FatalExecution> {
    if start < end {
        Ok(Window { start, end })
    } else {
        Err(FatalExecution::InvalidParameter {
            name: end_name.into(),
            expected: format!("value greater than {start_name} ({start})"),
            found: end.to_string(),
        })
    }
}
