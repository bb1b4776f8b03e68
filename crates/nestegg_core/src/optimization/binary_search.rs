//! Bracketing search for the safe withdrawal rate
//!
//! A k-section search: each round places `candidates_per_round` evenly spaced
//! rates inside the bracket and evaluates them together, so one round narrows
//! the bracket by a factor of `candidates_per_round + 1`. The lower end of the
//! bracket is always a rate known to meet the target.

use rayon_or_iter::map_candidates;
use tracing::{info, warn};

use crate::config::SimulationParameters;
use crate::error::{Result, SimulationError};
use crate::model::CalibrationReport;
use crate::monte_carlo::{MonteCarloProgress, run_trials};

/// Calibrated rate and how it was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedRate {
    pub rate: f64,
    pub report: CalibrationReport,
}

#[cfg(feature = "parallel")]
mod rayon_or_iter {
    use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

    use crate::error::Result;

    pub(super) fn map_candidates(
        candidates: &[f64],
        evaluate: impl Fn(f64) -> Result<f64> + Sync + Send,
    ) -> Result<Vec<f64>> {
        candidates.par_iter().map(|&rate| evaluate(rate)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
mod rayon_or_iter {
    use crate::error::Result;

    pub(super) fn map_candidates(
        candidates: &[f64],
        evaluate: impl Fn(f64) -> Result<f64>,
    ) -> Result<Vec<f64>> {
        candidates.iter().map(|&rate| evaluate(rate)).collect()
    }
}

/// Find the highest withdrawal rate whose success probability meets
/// `monte_carlo.target_success`.
///
/// Every candidate runs `calibration.trials` trials from `master_seed`. If even
/// the lowest rate misses the target, that rate is returned with
/// `feasible: false`. Running out of rounds before the bracket is narrower
/// than `calibration.precision` is an error.
pub fn calibrate_withdrawal_rate(
    params: &SimulationParameters,
    master_seed: u64,
    progress: &MonteCarloProgress,
) -> Result<CalibratedRate> {
    let cal = &params.monte_carlo.calibration;
    let target = params.monte_carlo.target_success;

    let evaluate = |rate: f64| -> Result<f64> {
        let candidate = params.with_withdrawal_rate(rate);
        run_trials(&candidate, cal.trials, master_seed, false, progress)
            .map(|stats| stats.success_rate())
    };
    let report = |rounds, candidates_evaluated, achieved_success, feasible| CalibrationReport {
        rounds,
        candidates_evaluated,
        trials_per_candidate: cal.trials,
        target_success: target,
        achieved_success,
        feasible,
    };

    let mut low = cal.min_rate;
    let mut high = cal.max_rate;
    let mut low_success = evaluate(low)?;
    let mut evaluated = 1;
    if low_success < target {
        warn!(
            rate = low,
            success = low_success,
            target,
            "no withdrawal rate meets the success target"
        );
        return Ok(CalibratedRate {
            rate: low,
            report: report(0, evaluated, low_success, false),
        });
    }

    let high_success = evaluate(high)?;
    evaluated += 1;
    if high_success >= target {
        info!(rate = high, success = high_success, "upper bound meets the success target");
        return Ok(CalibratedRate {
            rate: high,
            report: report(0, evaluated, high_success, true),
        });
    }

    let k = cal.candidates_per_round;
    let mut rounds = 0;
    while high - low > cal.precision {
        if rounds == cal.max_rounds {
            warn!(rounds, low, high, "withdrawal rate search did not converge");
            return Err(SimulationError::CalibrationNonconvergence { rounds, low, high });
        }
        rounds += 1;

        let step = (high - low) / (k + 1) as f64;
        let candidates: Vec<f64> = (1..=k).map(|i| low + step * i as f64).collect();
        let successes = map_candidates(&candidates, evaluate)?;
        evaluated += k;

        // Keep the lower end feasible even if sampling noise breaks
        // monotonicity further up.
        match successes.iter().position(|&s| s < target) {
            Some(0) => high = candidates[0],
            Some(i) => {
                low = candidates[i - 1];
                low_success = successes[i - 1];
                high = candidates[i];
            }
            None => {
                low = candidates[k - 1];
                low_success = successes[k - 1];
            }
        }
    }

    info!(
        rate = low,
        success = low_success,
        rounds,
        candidates = evaluated,
        "calibrated safe withdrawal rate"
    );
    Ok(CalibratedRate {
        rate: low,
        report: report(rounds, evaluated, low_success, true),
    })
}
