//! Retirement Monte Carlo simulation engine
//!
//! Projects a household's tax-bucketed portfolio through accumulation and
//! decumulation across many randomized market and mortality paths. It
//! supports:
//! - Four tax buckets per owner with a tax-efficient withdrawal order
//! - Glide-path, allocation and risk-score return strategies
//! - An optional four-state market regime model
//! - Stochastic joint mortality with survivor expense adjustments
//! - A dynamic spending governor and withdrawal guardrails
//! - Calibration of the highest withdrawal rate meeting a success target
//!
//! # Example
//!
//! ```ignore
//! use nestegg_core::config::ParametersBuilder;
//! use nestegg_core::model::{BucketKind, Owner, Person};
//!
//! let params = ParametersBuilder::single(Person::new(60, 65))
//!     .deposit(Owner::User, BucketKind::CapitalGains, 500_000.0)
//!     .monthly_expenses(3_000.0)
//!     .trials(1_000)
//!     .seed(42)
//!     .build()?;
//!
//! let result = nestegg_core::simulate(&params)?;
//! println!("success: {:.1}%", result.probability_of_success * 100.0);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod bucketing;
pub mod error;
pub mod income;
pub mod monte_carlo;
pub mod mortality;
pub mod optimization;
pub mod regime;
pub mod returns;
pub mod simulation;
pub mod simulation_state;
pub mod spending;
pub mod taxes;
pub mod withdrawal;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{HouseholdSnapshot, ParametersBuilder, SimulationParameters};
pub use error::{Result, SimulationError, SnapshotError};
pub use model::SimulationResult;
pub use monte_carlo::{MonteCarloProgress, simulate, simulate_with_progress};
pub use simulation::{project_retirement_portfolio, simulate_trial};
