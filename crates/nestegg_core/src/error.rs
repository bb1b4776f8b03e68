use std::fmt;

use crate::model::AssetKind;

/// Errors raised while converting an external household snapshot
#[derive(Debug, Clone)]
pub enum SnapshotError {
    /// An asset or income source names the spouse but the snapshot has none
    MissingSpouse { context: &'static str },
    /// Birth date lies after the evaluation date
    BirthDateInFuture { person: &'static str },
    /// Risk score outside 1..=5
    RiskScoreOutOfRange { person: &'static str, score: u8 },
    /// An asset value or annuity payout is negative or not a number
    InvalidAssetAmount {
        index: usize,
        kind: AssetKind,
        quantity: &'static str,
        value: f64,
    },
    DateError(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::MissingSpouse { context } => {
                write!(f, "{context} references a spouse but none was provided")
            }
            SnapshotError::BirthDateInFuture { person } => {
                write!(f, "{person} birth date is after the evaluation date")
            }
            SnapshotError::RiskScoreOutOfRange { person, score } => {
                write!(f, "{person} risk score {score} is outside 1..=5")
            }
            SnapshotError::InvalidAssetAmount {
                index,
                kind,
                quantity,
                value,
            } => write!(f, "asset {index} ({kind:?}) has invalid {quantity} {value}"),
            SnapshotError::DateError(msg) => write!(f, "date calculation error: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<jiff::Error> for SnapshotError {
    fn from(err: jiff::Error) -> Self {
        SnapshotError::DateError(err.to_string())
    }
}

/// Errors surfaced by the simulation engine
#[derive(Debug, Clone)]
pub enum SimulationError {
    /// A parameter violates an invariant; raised before any trial runs
    InvalidParameter { field: &'static str, reason: String },
    /// An intermediate value became non-finite during a trial
    NumericAnomaly {
        trial: Option<usize>,
        year: u32,
        quantity: &'static str,
        value: f64,
    },
    /// Safe-withdrawal-rate search ran out of rounds before reaching its precision
    CalibrationNonconvergence { rounds: usize, low: f64, high: f64 },
    /// Cancelled by the caller or stopped at the deadline
    Cancelled,
    Snapshot(SnapshotError),
}

impl SimulationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    /// Attach a trial index to a numeric anomaly raised inside a trial
    #[must_use]
    pub fn in_trial(self, index: usize) -> Self {
        match self {
            SimulationError::NumericAnomaly {
                year,
                quantity,
                value,
                ..
            } => SimulationError::NumericAnomaly {
                trial: Some(index),
                year,
                quantity,
                value,
            },
            other => other,
        }
    }
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidParameter { field, reason } => {
                write!(f, "invalid parameter `{field}`: {reason}")
            }
            SimulationError::NumericAnomaly {
                trial,
                year,
                quantity,
                value,
            } => match trial {
                Some(t) => write!(
                    f,
                    "non-finite {quantity} ({value}) in trial {t}, simulation year {year}"
                ),
                None => write!(f, "non-finite {quantity} ({value}) in simulation year {year}"),
            },
            SimulationError::CalibrationNonconvergence { rounds, low, high } => write!(
                f,
                "safe withdrawal rate search did not converge after {rounds} rounds \
                 (bracket [{:.4}%, {:.4}%])",
                low * 100.0,
                high * 100.0
            ),
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
            SimulationError::Snapshot(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Snapshot(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SnapshotError> for SimulationError {
    fn from(err: SnapshotError) -> Self {
        SimulationError::Snapshot(err)
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

/// Fail fast on a non-finite intermediate value
#[inline]
pub(crate) fn ensure_finite(quantity: &'static str, value: f64, year: u32) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::NumericAnomaly {
            trial: None,
            year,
            quantity,
            value,
        })
    }
}
