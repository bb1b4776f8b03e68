//! Integration tests for the nestegg simulation engine
//!
//! Tests are organized by topic:
//! - `invariants` - Properties that hold across every trial
//! - `lifecycle` - Mortality, depletion and horizon termination
//! - `scenarios` - End-to-end Monte Carlo runs with known answers
//! - `calibration` - Safe withdrawal rate search through `simulate`
//! - `validation` - Parameter rejection and cancellation
//! - `regimes` - Runs driven by the market regime process

mod calibration;
mod scenarios;
mod validation;

use crate::config::ParametersBuilder;
use crate::model::Person;
use crate::mortality::MortalityModel;
use crate::returns::ReturnStrategy;
use crate::taxes::TaxContext;

/// Zero-volatility market with fixed lifespans and no taxes
pub(crate) fn deterministic(person: Person, real_return: f64) -> ParametersBuilder {
    ParametersBuilder::single(person)
        .strategy(ReturnStrategy::Fixed(real_return))
        .volatility(0.0)
        .tax(TaxContext::untaxed())
        .mortality(MortalityModel::FixedLifespan)
        .calibrate(false)
}
