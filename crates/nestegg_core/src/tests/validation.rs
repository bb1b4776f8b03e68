//! Parameter validation and run control
//!
//! These tests verify that:
//! - Invalid parameters are rejected before any trial runs, naming the field
//! - Non-finite intermediate values surface as numeric anomalies
//! - Callers can cancel a run through shared atomics

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use crate::config::ParametersBuilder;
use crate::model::{BucketKind, Owner, Person};
use crate::monte_carlo::{MonteCarloProgress, simulate_with_progress};
use crate::returns::ReturnStrategy;
use crate::taxes::TaxContext;
use crate::{SimulationError, simulate};

fn base() -> ParametersBuilder {
    ParametersBuilder::single(Person::new(60, 65))
        .deposit(Owner::User, BucketKind::TaxDeferred, 300_000.0)
        .trials(50)
        .seed(1)
        .calibrate(false)
}

fn rejected_field(builder: ParametersBuilder) -> &'static str {
    match builder.build() {
        Err(SimulationError::InvalidParameter { field, .. }) => field,
        other => panic!("expected InvalidParameter, got {other:?}"),
    }
}

#[test]
fn test_invalid_parameters_name_their_field() {
    let cases = [
        (
            ParametersBuilder::single(Person::new(66, 65)),
            "household.user.retirement_age",
        ),
        (base().trials(0), "monte_carlo.trials"),
        (base().target_success(1.5), "monte_carlo.target_success"),
        (base().withdrawal_rate(1.5), "withdrawal.withdrawal_rate"),
        (base().volatility(-0.1), "market.fixed_volatility"),
        (base().strategy(ReturnStrategy::RiskProfile(7)), "market.user_strategy"),
        (
            base().deposit(Owner::Spouse, BucketKind::TaxFree, 1.0),
            "buckets",
        ),
        (
            base().deposit(Owner::User, BucketKind::CashEquivalents, f64::NAN),
            "buckets",
        ),
        (
            base().tax(TaxContext {
                ordinary_rate: 0.95,
                ..TaxContext::default()
            }),
            "tax",
        ),
        (base().monthly_expenses(-1.0), "expenses.monthly_expenses"),
    ];
    for (builder, field) in cases {
        assert_eq!(rejected_field(builder), field);
    }
}

#[test]
fn test_simulate_validates_unchecked_parameters() {
    let params = base().trials(0).build_unchecked();
    assert!(matches!(
        simulate(&params),
        Err(SimulationError::InvalidParameter {
            field: "monte_carlo.trials",
            ..
        })
    ));
}

#[test]
fn test_overflowing_expenses_are_a_numeric_anomaly() {
    let params = ParametersBuilder::single(Person::new(65, 65))
        .deposit(Owner::User, BucketKind::CashEquivalents, 100_000.0)
        .monthly_expenses(f64::MAX)
        .trials(10)
        .seed(1)
        .calibrate(false)
        .build()
        .unwrap();

    match simulate(&params) {
        Err(SimulationError::NumericAnomaly {
            trial: Some(_),
            year: 0,
            quantity,
            value,
        }) => {
            assert_eq!(quantity, "withdrawal need");
            assert!(value.is_infinite());
        }
        other => panic!("expected NumericAnomaly, got {other:?}"),
    }
}

#[test]
fn test_cancel_through_shared_atomics() {
    let params = base().trials(500).build().unwrap();
    let completed = Arc::new(AtomicUsize::new(0));
    let cancelled = Arc::new(AtomicBool::new(true));
    let progress = MonteCarloProgress::from_atomics(completed.clone(), cancelled);

    assert!(matches!(
        simulate_with_progress(&params, &progress),
        Err(SimulationError::Cancelled)
    ));
    assert_eq!(progress.completed(), 0);
}

#[test]
fn test_errors_display_their_context() {
    let message = base().trials(0).build().unwrap_err().to_string();
    assert!(message.contains("monte_carlo.trials"), "{message}");
}
