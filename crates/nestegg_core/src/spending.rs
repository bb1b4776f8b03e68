//! Dynamic spending governor and withdrawal guardrails
//!
//! Only discretionary spending is ever cut by the governor. Guardrails are a
//! separate, optional policy scaling the whole net withdrawal need.

use serde::{Deserialize, Serialize};

use crate::model::MarketRegime;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicSpending {
    /// Share of non-healthcare spending that is essential
    pub essential_share: f64,
    /// Cuts never take discretionary spending below this (per year)
    pub discretionary_floor: f64,
    /// Only react to bear/crisis regimes, ignore portfolio drawdowns
    #[serde(default)]
    pub bear_only: bool,
}

impl Default for DynamicSpending {
    fn default() -> Self {
        Self {
            essential_share: 0.75,
            discretionary_floor: 24_000.0,
            bear_only: false,
        }
    }
}

/// Non-healthcare spending split
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendingSplit {
    pub essential: f64,
    pub discretionary: f64,
}

impl SpendingSplit {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.essential + self.discretionary
    }
}

/// Market and portfolio facts the governor reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorSignal {
    pub regime: Option<MarketRegime>,
    /// Year-over-year portfolio change, e.g. -0.2 for a 20% drop
    pub portfolio_change: Option<f64>,
    pub withdrawal_rate: f64,
    pub sustainable_rate: f64,
}

impl DynamicSpending {
    #[must_use]
    pub fn split(&self, non_healthcare: f64) -> SpendingSplit {
        let essential = non_healthcare * self.essential_share;
        SpendingSplit {
            essential,
            discretionary: non_healthcare - essential,
        }
    }

    /// Multiplier applied to discretionary spending this year
    #[must_use]
    pub fn adjustment_factor(&self, signal: &GovernorSignal) -> f64 {
        match signal.regime {
            Some(MarketRegime::Crisis) => return 0.5,
            Some(MarketRegime::Bear) => return 0.7,
            _ => {}
        }
        let change = signal.portfolio_change.unwrap_or(0.0);
        if !self.bear_only {
            if change < -0.15 && signal.withdrawal_rate > 1.2 * signal.sustainable_rate {
                return 0.6;
            }
            // Any drop of 5% or more that escapes the deeper cut
            if change <= -0.05 {
                return 0.8;
            }
        }
        if signal.regime == Some(MarketRegime::Bull) && change > 0.15 {
            return 1.1;
        }
        1.0
    }

    /// Apply the governor to a split
    #[must_use]
    pub fn govern(&self, split: SpendingSplit, signal: &GovernorSignal) -> SpendingSplit {
        let factor = self.adjustment_factor(signal);
        let adjusted = split.discretionary * factor;
        let discretionary = if factor < 1.0 {
            adjusted.max(split.discretionary.min(self.discretionary_floor))
        } else {
            adjusted
        };
        SpendingSplit {
            essential: split.essential,
            discretionary,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.essential_share) {
            return Err(format!(
                "essential share {} must lie in [0, 1]",
                self.essential_share
            ));
        }
        if !self.discretionary_floor.is_finite() || self.discretionary_floor < 0.0 {
            return Err("discretionary floor must be non-negative".to_string());
        }
        Ok(())
    }
}

/// Rate a portfolio could sustain over the remaining planning horizon
#[must_use]
pub fn sustainable_rate(remaining_years: u32) -> f64 {
    1.0 / f64::from(remaining_years.max(1))
}

/// Graduated guardrail multiplier on the whole net withdrawal need.
///
/// `ratio` is this year's portfolio over last year's. Between the 85%, 95%
/// and 115% thresholds the factor moves linearly instead of jumping.
#[must_use]
pub fn guardrail_factor(ratio: f64) -> f64 {
    if !ratio.is_finite() {
        return 1.0;
    }
    if ratio <= 0.85 {
        0.85
    } else if ratio < 0.95 {
        0.85 + 0.15 * (ratio - 0.85) / 0.10
    } else if ratio <= 1.15 {
        1.0
    } else if ratio < 1.25 {
        1.0 + 0.10 * (ratio - 1.15) / 0.10
    } else {
        1.10
    }
}
