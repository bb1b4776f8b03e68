//! Simulation outputs
//!
//! Only the first trial's cash-flow trace survives a run; every other trial
//! contributes to the aggregates alone.

use serde::{Deserialize, Serialize};

use super::market::MarketRegime;

/// One row of a trial's cash-flow trace, in today's dollars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyCashFlow {
    /// Years since the start of the simulation
    pub year: u32,
    /// User's age during this year
    pub age: u32,
    /// Portfolio balance at the end of the year
    pub portfolio_balance: f64,
    pub guaranteed_income: f64,
    /// Gross portfolio withdrawal; negative for a contribution
    pub withdrawal: f64,
    /// Change in portfolio balance over the year
    pub net_cash_flow: f64,
    pub market_regime: Option<MarketRegime>,
}

/// How a trial ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialTermination {
    /// Reached the horizon with money left
    Success,
    /// Balance hit zero; years counted from the start of the simulation
    Depleted { years_until_depletion: u32 },
}

/// Result of a single lifetime trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub termination: TrialTermination,
    pub ending_balance: f64,
    /// Portfolio value on the first day of retirement
    pub retirement_portfolio: f64,
    /// Only populated for the trial that records its trace
    pub cash_flows: Option<Vec<YearlyCashFlow>>,
}

impl TrialOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.termination, TrialTermination::Success)
    }

    #[must_use]
    pub fn years_until_depletion(&self) -> Option<u32> {
        match self.termination {
            TrialTermination::Success => None,
            TrialTermination::Depleted {
                years_until_depletion,
            } => Some(years_until_depletion),
        }
    }
}

/// Ending-balance distribution across trials
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalancePercentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl BalancePercentiles {
    /// Nearest-rank percentiles of an ascending slice
    #[must_use]
    pub fn from_sorted(sorted: &[f64]) -> Self {
        let pick = |p: f64| -> f64 {
            if sorted.is_empty() {
                return 0.0;
            }
            let idx = (p * (sorted.len() - 1) as f64).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        Self {
            p10: pick(0.10),
            p25: pick(0.25),
            p50: pick(0.50),
            p75: pick(0.75),
            p90: pick(0.90),
        }
    }
}

/// Outcome of the safe-withdrawal-rate search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub rounds: usize,
    pub candidates_evaluated: usize,
    pub trials_per_candidate: usize,
    pub target_success: f64,
    /// Success probability measured at the reported rate
    pub achieved_success: f64,
    /// False when even the lower bound misses the target
    pub feasible: bool,
}

/// Aggregate outcome of a Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub num_trials: usize,
    pub seed: u64,
    pub probability_of_success: f64,
    pub ending_balance_percentiles: BalancePercentiles,
    /// Highest initial withdrawal rate meeting the success target
    pub safe_withdrawal_rate: f64,
    pub calibration: Option<CalibrationReport>,
    /// Deterministic replay of accumulation at expected returns
    pub projected_retirement_portfolio: f64,
    /// Share of trials ending at or above the legacy goal
    pub legacy_goal_probability: f64,
    /// Median depletion year among failed trials
    pub median_years_until_depletion: Option<u32>,
    /// Cash-flow trace of the first trial
    pub cash_flows: Vec<YearlyCashFlow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_pick_nearest_rank() {
        let sorted: Vec<f64> = (0..=100).map(f64::from).collect();
        let p = BalancePercentiles::from_sorted(&sorted);
        assert_eq!(p.p10, 10.0);
        assert_eq!(p.p50, 50.0);
        assert_eq!(p.p90, 90.0);
    }

    #[test]
    fn percentiles_of_empty_are_zero() {
        assert_eq!(BalancePercentiles::from_sorted(&[]), BalancePercentiles::default());
    }
}
