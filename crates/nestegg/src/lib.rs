//! Command-line front end for the nestegg retirement simulator
//!
//! Loads a household snapshot from YAML, converts it with flat marginal tax
//! rates, applies command-line overrides and hands the parameters to
//! `nestegg_core`.

pub mod logging;
pub mod report;

use std::fs;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use jiff::civil::Date;
use nestegg_core::regime::RegimeModel;
use nestegg_core::taxes::FlatRates;
use nestegg_core::{HouseholdSnapshot, SimulationParameters};

pub use logging::init_logging;
pub use report::write_report;

/// Overrides applied on top of the converted snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub trials: Option<usize>,
    pub seed: Option<u64>,
    pub target_success: Option<f64>,
    pub withdrawal_rate: Option<f64>,
    pub calibrate: bool,
    pub regimes: bool,
}

/// Parse a household snapshot from YAML text
pub fn parse_snapshot(yaml: &str) -> color_eyre::Result<HouseholdSnapshot> {
    serde_saphyr::from_str(yaml).wrap_err("household snapshot is not valid YAML")
}

pub fn load_snapshot(path: &Path) -> color_eyre::Result<HouseholdSnapshot> {
    let yaml = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read snapshot {}", path.display()))?;
    parse_snapshot(&yaml).wrap_err_with(|| format!("in {}", path.display()))
}

/// Convert the snapshot as of `as_of` and apply `options`
pub fn prepare_parameters(
    snapshot: &HouseholdSnapshot,
    as_of: Date,
    options: &RunOptions,
) -> color_eyre::Result<SimulationParameters> {
    let mut params = SimulationParameters::from_snapshot(snapshot, as_of, &FlatRates::default())
        .wrap_err("household snapshot could not be converted")?;

    let mc = &mut params.monte_carlo;
    if let Some(trials) = options.trials {
        mc.trials = trials;
    }
    if options.seed.is_some() {
        mc.seed = options.seed;
    }
    if let Some(target) = options.target_success {
        mc.target_success = target;
    }
    mc.calibrate = options.calibrate;
    if let Some(rate) = options.withdrawal_rate {
        params.withdrawal.withdrawal_rate = rate;
    }
    if options.regimes {
        params.market.regime = Some(RegimeModel::default());
    }

    params.validate().wrap_err("invalid simulation parameters")?;
    Ok(params)
}
