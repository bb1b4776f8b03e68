//! Safe withdrawal rate calibration through `simulate`
//!
//! These tests verify that:
//! - Calibration only runs when the configured rate misses the target
//! - The calibrated rate meets the target with the calibration's trials
//! - Any rate above the final bracket misses it
//! - The calibrated rate still lands near the target on unseen market paths

use crate::config::{CalibrationConfig, ParametersBuilder};
use crate::model::{BucketKind, Owner, Person};
use crate::monte_carlo::{MonteCarloProgress, run_trials};
use crate::optimization::calibrate_withdrawal_rate;
use crate::returns::ReturnStrategy;
use crate::simulate;

fn aggressive() -> ParametersBuilder {
    ParametersBuilder::single(Person::new(60, 65))
        .deposit(Owner::User, BucketKind::CapitalGains, 500_000.0)
        .strategy(ReturnStrategy::Fixed(0.06))
        .volatility(0.15)
        .withdrawal_rate(0.10)
        .trials(200)
        .seed(42)
        .calibration(CalibrationConfig {
            trials: 200,
            ..Default::default()
        })
}

#[test]
fn test_calibrated_rate_brackets_the_target() {
    let params = aggressive().build().unwrap();
    let result = simulate(&params).unwrap();
    assert!(result.probability_of_success < params.monte_carlo.target_success);

    let report = result.calibration.expect("calibration should run");
    assert!(report.feasible);
    assert_eq!(report.trials_per_candidate, 200);
    assert!(report.achieved_success >= 0.8);

    let rate = result.safe_withdrawal_rate;
    assert!(rate > 0.0 && rate < 0.10, "{rate}");

    let progress = MonteCarloProgress::new();
    let rerun = |r: f64| {
        run_trials(&params.with_withdrawal_rate(r), 200, result.seed, false, &progress)
            .unwrap()
            .success_rate()
    };
    assert_eq!(rerun(rate), report.achieved_success);
    assert!(rerun(rate + 1.5e-4) < 0.8);
}

#[test]
fn test_no_calibration_when_target_is_met() {
    let params = aggressive().withdrawal_rate(0.01).build().unwrap();
    let result = simulate(&params).unwrap();
    assert!(result.probability_of_success >= 0.8);
    assert!(result.calibration.is_none());
    assert_eq!(result.safe_withdrawal_rate, 0.01);
}

#[test]
fn test_calibration_can_be_disabled() {
    let params = aggressive().calibrate(false).build().unwrap();
    let result = simulate(&params).unwrap();
    assert!(result.calibration.is_none());
    assert_eq!(result.safe_withdrawal_rate, 0.10);
}

#[test]
fn test_progress_counts_calibration_trials() {
    let params = aggressive().build().unwrap();
    let progress = MonteCarloProgress::new();
    let result = crate::simulate_with_progress(&params, &progress).unwrap();
    let report = result.calibration.unwrap();
    assert_eq!(
        progress.completed(),
        200 + report.candidates_evaluated * report.trials_per_candidate
    );
}

#[test]
fn test_calibrated_rate_holds_on_fresh_seeds() {
    let households = [
        ("fixed single", aggressive()),
        (
            "glide path couple",
            ParametersBuilder::couple(Person::new(58, 63), Person::new(56, 62))
                .deposit(Owner::User, BucketKind::CapitalGains, 300_000.0)
                .deposit(Owner::Spouse, BucketKind::TaxDeferred, 400_000.0)
                .strategy(ReturnStrategy::GlidePath),
        ),
        (
            "cautious retiree",
            ParametersBuilder::single(Person::new(70, 70))
                .deposit(Owner::User, BucketKind::TaxFree, 600_000.0)
                .strategy(ReturnStrategy::Fixed(0.04))
                .volatility(0.10),
        ),
    ];
    let trials = 4_000;
    let progress = MonteCarloProgress::new();

    for (label, builder) in households {
        let params = builder
            .calibration(CalibrationConfig {
                trials,
                ..Default::default()
            })
            .build()
            .unwrap();
        let target = params.monte_carlo.target_success;
        let calibrated = calibrate_withdrawal_rate(&params, 1_234, &progress).unwrap();
        assert!(calibrated.report.feasible, "{label}");
        assert!(calibrated.rate > 0.0 && calibrated.rate < 0.10, "{label}");

        let fresh = run_trials(
            &params.with_withdrawal_rate(calibrated.rate),
            trials,
            98_765,
            false,
            &progress,
        )
        .unwrap()
        .success_rate();
        assert!(
            (fresh - target).abs() <= 0.02,
            "{label}: rate {:.4} succeeded {fresh:.3} on fresh seeds",
            calibrated.rate
        );
    }
}
