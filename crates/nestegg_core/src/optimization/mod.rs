//! Safe-withdrawal-rate calibration
//!
//! Success probability falls as the withdrawal rate rises, so the highest
//! rate meeting the target is found by bracketing. Every candidate reuses the
//! run's master seed, so candidates differ only in the rate and not in the
//! market paths they face.
//!
//! # Example
//!
//! ```ignore
//! use nestegg_core::monte_carlo::MonteCarloProgress;
//! use nestegg_core::optimization::calibrate_withdrawal_rate;
//!
//! let calibrated = calibrate_withdrawal_rate(&params, 42, &MonteCarloProgress::new())?;
//! println!("safe withdrawal rate: {:.2}%", calibrated.rate * 100.0);
//! ```

mod binary_search;

pub use binary_search::{CalibratedRate, calibrate_withdrawal_rate};
