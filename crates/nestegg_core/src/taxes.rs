//! Tax context for withdrawals
//!
//! Bracket tables live outside the engine. They are consulted once, through
//! `MarginalRateTable`, when parameters are built; trials only see the
//! resulting flat rates.

use serde::{Deserialize, Serialize};

use crate::model::MaritalStatus;
use crate::withdrawal::WithdrawalContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedFilingJointly,
}

impl From<MaritalStatus> for FilingStatus {
    fn from(status: MaritalStatus) -> Self {
        match status {
            MaritalStatus::Married => FilingStatus::MarriedFilingJointly,
            _ => FilingStatus::Single,
        }
    }
}

/// External bracket lookup
pub trait MarginalRateTable {
    /// Combined federal and state marginal rate on ordinary income
    fn ordinary_rate(&self, taxable_income: f64, filing: FilingStatus, state: &str) -> f64;

    /// Long-term capital gains rate
    fn capital_gains_rate(&self, taxable_income: f64, filing: FilingStatus, state: &str) -> f64;
}

/// Same rates regardless of income
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatRates {
    pub ordinary: f64,
    pub capital_gains: f64,
}

impl Default for FlatRates {
    fn default() -> Self {
        Self {
            ordinary: 0.22,
            capital_gains: 0.15,
        }
    }
}

impl MarginalRateTable for FlatRates {
    fn ordinary_rate(&self, _taxable_income: f64, _filing: FilingStatus, _state: &str) -> f64 {
        self.ordinary
    }

    fn capital_gains_rate(&self, _taxable_income: f64, _filing: FilingStatus, _state: &str) -> f64 {
        self.capital_gains
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxContext {
    pub ordinary_rate: f64,
    pub capital_gains_rate: f64,
    /// Share of a brokerage sale treated as realized gain
    pub gain_fraction: f64,
    #[serde(default)]
    pub state_of_residence: Option<String>,
}

impl Default for TaxContext {
    fn default() -> Self {
        Self {
            ordinary_rate: 0.22,
            capital_gains_rate: 0.15,
            gain_fraction: 0.5,
            state_of_residence: None,
        }
    }
}

impl TaxContext {
    /// Zero-tax context
    #[must_use]
    pub fn untaxed() -> Self {
        Self {
            ordinary_rate: 0.0,
            capital_gains_rate: 0.0,
            gain_fraction: 0.0,
            state_of_residence: None,
        }
    }

    /// Look up rates for the household's expected retirement income
    pub fn from_table(
        table: &dyn MarginalRateTable,
        expected_income: f64,
        filing: FilingStatus,
        state: Option<&str>,
    ) -> Self {
        let state_code = state.unwrap_or_default();
        Self {
            ordinary_rate: table.ordinary_rate(expected_income, filing, state_code),
            capital_gains_rate: table.capital_gains_rate(expected_income, filing, state_code),
            gain_fraction: TaxContext::default().gain_fraction,
            state_of_residence: state.map(str::to_string),
        }
    }

    #[must_use]
    pub fn withdrawal_context(&self, age: u32) -> WithdrawalContext {
        WithdrawalContext {
            ordinary_rate: self.ordinary_rate,
            capital_gains_rate: self.capital_gains_rate,
            gain_fraction: self.gain_fraction,
            age,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        // With the early-withdrawal penalty stacked on top the ordinary rate
        // must leave something to spend.
        let max_ordinary = 1.0 - crate::withdrawal::EARLY_WITHDRAWAL_PENALTY;
        if !(0.0..max_ordinary).contains(&self.ordinary_rate) {
            return Err(format!(
                "ordinary rate {} must lie in [0, {max_ordinary})",
                self.ordinary_rate
            ));
        }
        if !(0.0..1.0).contains(&self.capital_gains_rate) {
            return Err(format!(
                "capital gains rate {} must lie in [0, 1)",
                self.capital_gains_rate
            ));
        }
        if !(0.0..=1.0).contains(&self.gain_fraction) {
            return Err(format!(
                "gain fraction {} must lie in [0, 1]",
                self.gain_fraction
            ));
        }
        Ok(())
    }
}
