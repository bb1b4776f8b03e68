//! Monte Carlo orchestrator
//!
//! Trials run in batches of `MAX_BATCH_SIZE`. Each batch seeds a `SmallRng`
//! from the master seed and hands every trial its own seed, so results do not
//! depend on how batches are scheduled across threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use crate::config::SimulationParameters;
use crate::error::{Result, SimulationError};
use crate::model::{BalancePercentiles, SimulationResult, TrialOutcome, YearlyCashFlow};
use crate::optimization::calibrate_withdrawal_rate;
use crate::simulation::{project_retirement_portfolio, simulate_trial};

pub const MAX_BATCH_SIZE: usize = 100;

/// Progress and cancellation shared with the caller
#[derive(Debug, Clone, Default)]
pub struct MonteCarloProgress {
    /// Trials finished, across every run sharing this tracker
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MonteCarloProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share atomics owned by the caller (e.g. a UI thread)
    pub fn from_atomics(completed: Arc<AtomicUsize>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            completed,
            cancelled,
            deadline: None,
        }
    }

    /// Stop once `timeout` has elapsed from now
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancelled or past the deadline
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn add(&self, trials: usize) {
        self.completed.fetch_add(trials, Ordering::Relaxed);
    }
}

/// Aggregates over one set of trials
#[derive(Debug, Clone, Default)]
pub struct TrialStats {
    pub num_trials: usize,
    pub successes: usize,
    /// Ascending
    pub ending_balances: Vec<f64>,
    /// Trials ending at or above the legacy goal
    pub legacy_hits: usize,
    /// Depletion year of every failed trial, ascending
    pub depletion_years: Vec<u32>,
    /// Trace of the first trial when requested
    pub first_trace: Option<Vec<YearlyCashFlow>>,
}

impl TrialStats {
    fn from_outcomes(outcomes: Vec<TrialOutcome>, legacy_goal: f64) -> Self {
        let mut stats = TrialStats {
            num_trials: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            if outcome.succeeded() {
                stats.successes += 1;
            }
            if outcome.ending_balance >= legacy_goal {
                stats.legacy_hits += 1;
            }
            if let Some(years) = outcome.years_until_depletion() {
                stats.depletion_years.push(years);
            }
            stats.ending_balances.push(outcome.ending_balance);
            if stats.first_trace.is_none() {
                stats.first_trace = outcome.cash_flows;
            }
        }
        stats.ending_balances.sort_by(f64::total_cmp);
        stats.depletion_years.sort_unstable();
        stats
    }

    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.num_trials == 0 {
            return 0.0;
        }
        self.successes as f64 / self.num_trials as f64
    }

    #[must_use]
    pub fn legacy_rate(&self) -> f64 {
        if self.num_trials == 0 {
            return 0.0;
        }
        self.legacy_hits as f64 / self.num_trials as f64
    }

    #[must_use]
    pub fn median_years_until_depletion(&self) -> Option<u32> {
        if self.depletion_years.is_empty() {
            return None;
        }
        Some(self.depletion_years[self.depletion_years.len() / 2])
    }
}

fn batch_seed(master_seed: u64, batch: usize) -> u64 {
    master_seed ^ (batch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Run `trials` trials from `master_seed`. The same master seed always yields
/// the same per-trial seeds, whatever the parameters.
pub fn run_trials(
    params: &SimulationParameters,
    trials: usize,
    master_seed: u64,
    record_first: bool,
    progress: &MonteCarloProgress,
) -> Result<TrialStats> {
    let num_batches = trials.div_ceil(MAX_BATCH_SIZE);

    let run_batch = |i: usize| -> Result<Vec<TrialOutcome>> {
        if progress.should_stop() {
            return Err(SimulationError::Cancelled);
        }
        let mut rng = SmallRng::seed_from_u64(batch_seed(master_seed, i));
        let batch_size = if i == num_batches - 1 {
            trials - i * MAX_BATCH_SIZE
        } else {
            MAX_BATCH_SIZE
        };

        let outcomes = (0..batch_size)
            .map(|j| {
                let index = i * MAX_BATCH_SIZE + j;
                let seed = rng.next_u64();
                simulate_trial(params, seed, record_first && index == 0)
                    .map_err(|e| e.in_trial(index))
            })
            .collect::<Result<Vec<_>>>()?;
        progress.add(batch_size);
        Ok(outcomes)
    };

    #[cfg(feature = "parallel")]
    let batches = (0..num_batches)
        .into_par_iter()
        .map(run_batch)
        .collect::<Result<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let batches = (0..num_batches).map(run_batch).collect::<Result<Vec<_>>>()?;

    let outcomes: Vec<TrialOutcome> = batches.into_iter().flatten().collect();
    Ok(TrialStats::from_outcomes(outcomes, params.household.legacy_goal))
}

/// Run the configured number of trials and calibrate the safe withdrawal rate
pub fn simulate(params: &SimulationParameters) -> Result<SimulationResult> {
    simulate_with_progress(params, &MonteCarloProgress::default())
}

pub fn simulate_with_progress(
    params: &SimulationParameters,
    progress: &MonteCarloProgress,
) -> Result<SimulationResult> {
    params.validate()?;
    let mc = &params.monte_carlo;
    let seed = mc.seed.unwrap_or_else(|| rand::rng().random());
    debug!(
        trials = mc.trials,
        seed,
        withdrawal_rate = params.withdrawal.withdrawal_rate,
        "running monte carlo simulation"
    );

    let stats = run_trials(params, mc.trials, seed, true, progress)?;
    let probability_of_success = stats.success_rate();

    let (safe_withdrawal_rate, calibration) =
        if mc.calibrate && probability_of_success < mc.target_success {
            let calibrated = calibrate_withdrawal_rate(params, seed, progress)?;
            (calibrated.rate, Some(calibrated.report))
        } else {
            (params.withdrawal.withdrawal_rate, None)
        };

    let projected = project_retirement_portfolio(params)?;

    Ok(SimulationResult {
        num_trials: stats.num_trials,
        seed,
        probability_of_success,
        ending_balance_percentiles: BalancePercentiles::from_sorted(&stats.ending_balances),
        safe_withdrawal_rate,
        calibration,
        projected_retirement_portfolio: projected,
        legacy_goal_probability: stats.legacy_rate(),
        median_years_until_depletion: stats.median_years_until_depletion(),
        cash_flows: stats.first_trace.unwrap_or_default(),
    })
}
