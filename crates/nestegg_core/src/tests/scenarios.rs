//! End-to-end Monte Carlo runs
//!
//! These tests verify that:
//! - A typical pre-retiree gets a probability strictly between 0 and 1
//! - Income that covers expenses with no market risk always succeeds
//! - The projected retirement portfolio ignores volatility
//! - Annuities, healthcare growth, care costs and the governor affect a run

use super::deterministic;
use crate::config::{LongTermCareAssumptions, ParametersBuilder};
use crate::model::{AnnuityDetail, AnnuityIncome, Asset, AssetKind, BucketKind, Owner, Person};
use crate::mortality::MortalityModel;
use crate::returns::ReturnStrategy;
use crate::simulation::project_retirement_portfolio;
use crate::spending::DynamicSpending;
use crate::taxes::TaxContext;
use crate::{SimulationParameters, simulate};

fn pre_retiree() -> ParametersBuilder {
    ParametersBuilder::single(Person::new(60, 65))
        .deposit(Owner::User, BucketKind::CapitalGains, 500_000.0)
        .strategy(ReturnStrategy::Fixed(0.06))
        .volatility(0.15)
        .withdrawal_rate(0.04)
        .trials(1_000)
        .seed(42)
}

#[test]
fn test_typical_pre_retiree_is_uncertain() {
    let params = pre_retiree().calibrate(false).build().unwrap();
    let result = simulate(&params).unwrap();

    assert_eq!(result.num_trials, 1_000);
    assert!(result.probability_of_success > 0.0);
    assert!(result.probability_of_success < 1.0);
    assert!(result.median_years_until_depletion.is_some_and(|y| y > 5));
    assert_eq!(result.safe_withdrawal_rate, 0.04);
    assert!(result.calibration.is_none());

    // Trace of the first trial starts today and covers accumulation
    assert_eq!(result.cash_flows[0].age, 60);
    assert!(result.cash_flows.len() > 5);
}

#[test]
fn test_projection_compounds_expected_return() {
    let params = pre_retiree().calibrate(false).build().unwrap();
    let expected = 500_000.0 * 1.06_f64.powi(5);
    assert!((project_retirement_portfolio(&params).unwrap() - expected).abs() < 1e-6);

    let result = simulate(&params.with_withdrawal_rate(0.03)).unwrap();
    assert!((result.projected_retirement_portfolio - expected).abs() < 1e-6);
}

#[test]
fn test_income_covering_expenses_always_succeeds() {
    let params = deterministic(
        Person::new(65, 65).with_social_security(40_000.0, 65),
        0.04,
    )
    .deposit(Owner::User, BucketKind::CashEquivalents, 1_000_000.0)
    .mortality(MortalityModel::Stochastic)
    .monthly_expenses(3_000.0)
    .withdrawal_rate(0.04)
    .trials(500)
    .seed(7)
    .build()
    .unwrap();

    let result = simulate(&params).unwrap();
    assert_eq!(result.probability_of_success, 1.0);
    assert_eq!(result.median_years_until_depletion, None);
    assert!(result.ending_balance_percentiles.p10 >= 999_000.0);
    assert_eq!(result.legacy_goal_probability, 1.0);
}

#[test]
fn test_annuities_from_assets_pay_income() {
    let annuity = Asset::annuity(
        Owner::User,
        200_000.0,
        AnnuityDetail {
            annual_payout: 30_000.0,
            payout_start_age: 65,
            deferred: false,
        },
    );
    let params = deterministic(Person::new(65, 65).with_life_expectancy(90), 0.0)
        .assets(&[
            annuity,
            Asset::new(AssetKind::TaxableBrokerage, Owner::User, 50_000.0),
        ])
        .monthly_expenses(2_500.0)
        .withdrawal_rate(0.0)
        .trials(10)
        .seed(1)
        .build()
        .unwrap();

    assert_eq!(
        params.household.annuities,
        vec![AnnuityIncome {
            owner: Owner::User,
            annual_amount: 30_000.0,
            start_age: 65,
        }]
    );
    let result = simulate(&params).unwrap();
    assert_eq!(result.probability_of_success, 1.0);
    assert_eq!(result.cash_flows[0].guaranteed_income, 30_000.0);
    assert_eq!(result.cash_flows[0].withdrawal, 0.0);
}

#[test]
fn test_healthcare_growth_raises_withdrawals() {
    let base = deterministic(Person::new(65, 65).with_life_expectancy(100), 0.0)
        .deposit(Owner::User, BucketKind::CashEquivalents, 2_000_000.0)
        .withdrawal_rate(0.0)
        .healthcare(10_000.0, 0.05)
        .trials(1)
        .seed(3)
        .build()
        .unwrap();

    let rows = simulate(&base).unwrap().cash_flows;
    assert!((rows[0].withdrawal - 10_000.0).abs() < 1e-6);
    assert!((rows[1].withdrawal - 10_500.0).abs() < 1e-6);
    assert!((rows[2].withdrawal - 11_025.0).abs() < 1e-6);
}

#[test]
fn test_long_term_care_lowers_success() {
    let build = |ltc: Option<LongTermCareAssumptions>| -> SimulationParameters {
        let mut builder = ParametersBuilder::single(Person::new(75, 75))
            .deposit(Owner::User, BucketKind::CashEquivalents, 400_000.0)
            .strategy(ReturnStrategy::Fixed(0.03))
            .tax(TaxContext::untaxed())
            .monthly_expenses(2_000.0)
            .withdrawal_rate(0.0)
            .calibrate(false)
            .trials(400)
            .seed(21);
        if let Some(ltc) = ltc {
            builder = builder.long_term_care(ltc);
        }
        builder.build().unwrap()
    };

    let without = simulate(&build(None)).unwrap().probability_of_success;
    let uninsured = simulate(&build(Some(LongTermCareAssumptions {
        annual_incidence: 0.25,
        ..LongTermCareAssumptions::standard(false)
    })))
    .unwrap()
    .probability_of_success;
    assert!(uninsured < without, "{uninsured} vs {without}");
}

#[test]
fn test_governor_improves_success_for_aggressive_spender() {
    let build = |governor: Option<DynamicSpending>| {
        let mut builder = ParametersBuilder::single(Person::new(65, 65))
            .deposit(Owner::User, BucketKind::CapitalGains, 800_000.0)
            .monthly_expenses(5_000.0)
            .withdrawal_rate(0.0)
            .calibrate(false)
            .trials(400)
            .seed(5);
        if let Some(governor) = governor {
            builder = builder.dynamic_spending(governor);
        }
        builder.build().unwrap()
    };

    let fixed = simulate(&build(None)).unwrap().probability_of_success;
    let governor = DynamicSpending {
        essential_share: 0.6,
        discretionary_floor: 0.0,
        bear_only: false,
    };
    let governed = simulate(&build(Some(governor)))
        .unwrap()
        .probability_of_success;
    assert!(governed >= fixed, "{governed} vs {fixed}");
}
