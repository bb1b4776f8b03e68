//! Simulation configuration
//!
//! `SimulationParameters` is the frozen input to one run. It is assembled from
//! small value objects, validated once, and shared read-only by every trial.
//!
//! # Builder DSL
//!
//! ```ignore
//! use nestegg_core::config::ParametersBuilder;
//! use nestegg_core::model::{BucketKind, Owner, Person};
//! use nestegg_core::returns::ReturnStrategy;
//!
//! let params = ParametersBuilder::single(Person::new(60, 65))
//!     .deposit(Owner::User, BucketKind::CapitalGains, 500_000.0)
//!     .strategy(ReturnStrategy::Fixed(0.06))
//!     .volatility(0.15)
//!     .withdrawal_rate(0.04)
//!     .monthly_expenses(1_500.0)
//!     .trials(1_000)
//!     .seed(42)
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::model::{Household, Liability, MAX_AGE, MaritalStatus, OwnedBuckets, Owner};
use crate::mortality::MortalityModel;
use crate::regime::RegimeModel;
use crate::returns::ReturnStrategy;
use crate::spending::DynamicSpending;
use crate::taxes::TaxContext;

pub mod builder;
pub mod snapshot;

pub use builder::ParametersBuilder;
pub use snapshot::{HouseholdSnapshot, PersonSnapshot};

fn default_fixed_volatility() -> f64 {
    0.15
}

/// Return assumptions for the household's holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAssumptions {
    pub user_strategy: ReturnStrategy,
    /// Falls back to the user's strategy when absent
    #[serde(default)]
    pub spouse_strategy: Option<ReturnStrategy>,
    /// Volatility applied to `ReturnStrategy::Fixed`
    #[serde(default = "default_fixed_volatility")]
    pub fixed_volatility: f64,
    /// Regime-aware mode when present
    #[serde(default)]
    pub regime: Option<RegimeModel>,
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        Self {
            user_strategy: ReturnStrategy::default(),
            spouse_strategy: None,
            fixed_volatility: default_fixed_volatility(),
            regime: None,
        }
    }
}

impl MarketAssumptions {
    /// Strategy governing one owner's buckets. Joint holdings use the user's
    /// strategy here; the simulator blends both owners' profiles for them.
    #[must_use]
    pub fn strategy(&self, owner: Owner) -> ReturnStrategy {
        match owner {
            Owner::Spouse => self.spouse_strategy.unwrap_or(self.user_strategy),
            Owner::User | Owner::Joint => self.user_strategy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalPolicy {
    /// Initial withdrawal as a share of the retirement-start portfolio
    pub withdrawal_rate: f64,
    #[serde(default)]
    pub dynamic_spending: Option<DynamicSpending>,
    #[serde(default)]
    pub guardrails: bool,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            withdrawal_rate: 0.04,
            dynamic_spending: None,
            guardrails: false,
        }
    }
}

/// Household spending in today's dollars
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseStreams {
    /// Non-healthcare retirement spending per month
    pub monthly_expenses: f64,
    /// Household healthcare spending per year at retirement
    #[serde(default)]
    pub annual_healthcare: f64,
    /// Growth of healthcare costs above general inflation
    #[serde(default)]
    pub healthcare_real_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermCareAssumptions {
    pub enabled: bool,
    /// First age at which an episode can start
    pub onset_age: u32,
    /// Probability per year of a new episode for each living person
    pub annual_incidence: f64,
    pub episode_years: u32,
    pub annual_cost: f64,
    /// Household holds long-term-care insurance
    pub insured: bool,
    /// Share of the cost the insurance pays
    pub insurance_coverage: f64,
}

impl Default for LongTermCareAssumptions {
    fn default() -> Self {
        Self {
            enabled: false,
            onset_age: 80,
            annual_incidence: 0.04,
            episode_years: 3,
            annual_cost: 100_000.0,
            insured: false,
            insurance_coverage: 0.70,
        }
    }
}

impl LongTermCareAssumptions {
    /// Standard shock model, optionally insured
    #[must_use]
    pub fn standard(insured: bool) -> Self {
        Self {
            enabled: true,
            insured,
            ..Self::default()
        }
    }

    /// Out-of-pocket cost of one year of care
    #[must_use]
    pub fn out_of_pocket(&self) -> f64 {
        if self.insured {
            self.annual_cost * (1.0 - self.insurance_coverage)
        } else {
            self.annual_cost
        }
    }
}

/// Pre-retirement contributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsPlan {
    pub user_annual: f64,
    #[serde(default)]
    pub spouse_annual: f64,
    /// Debts whose payments are redirected to savings as they wind down
    #[serde(default)]
    pub liabilities: Vec<Liability>,
    /// Years before retirement over which the debt-payoff dividend ramps up
    pub debt_dividend_years: u32,
}

impl Default for SavingsPlan {
    fn default() -> Self {
        Self {
            user_annual: 0.0,
            spouse_annual: 0.0,
            liabilities: Vec::new(),
            debt_dividend_years: 15,
        }
    }
}

impl SavingsPlan {
    #[must_use]
    pub fn annual_for(&self, owner: Owner) -> f64 {
        match owner {
            Owner::User => self.user_annual,
            Owner::Spouse => self.spouse_annual,
            Owner::Joint => 0.0,
        }
    }

    /// Freed-up debt payments available for saving, ramping linearly to the
    /// full amount over the last `debt_dividend_years` before retirement.
    #[must_use]
    pub fn debt_payoff_dividend(&self, years_to_retirement: i32) -> f64 {
        if self.debt_dividend_years == 0 || years_to_retirement < 0 {
            return 0.0;
        }
        let window = f64::from(self.debt_dividend_years);
        let ramp = ((window - f64::from(years_to_retirement)) / window).clamp(0.0, 1.0);
        let payments: f64 = self.liabilities.iter().map(|l| l.annual_payment.max(0.0)).sum();
        payments * ramp
    }
}

/// Safe-withdrawal-rate search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub trials: usize,
    pub min_rate: f64,
    pub max_rate: f64,
    /// Stop once the bracket is narrower than this
    pub precision: f64,
    /// Interior rates evaluated per round
    pub candidates_per_round: usize,
    pub max_rounds: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            trials: 1_000,
            min_rate: 0.0,
            max_rate: 0.10,
            precision: 1e-4,
            candidates_per_round: 3,
            max_rounds: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub trials: usize,
    /// Master seed; drawn from the thread RNG when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Success probability the calibrated rate must reach
    pub target_success: f64,
    /// Search for a safe withdrawal rate when the run misses the target
    pub calibrate: bool,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: 1_000,
            seed: None,
            target_success: 0.80,
            calibrate: true,
            calibration: CalibrationConfig::default(),
        }
    }
}

/// Complete, validated input to a Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub household: Household,
    pub buckets: OwnedBuckets,
    #[serde(default)]
    pub market: MarketAssumptions,
    #[serde(default)]
    pub withdrawal: WithdrawalPolicy,
    #[serde(default)]
    pub tax: TaxContext,
    #[serde(default)]
    pub expenses: ExpenseStreams,
    #[serde(default)]
    pub long_term_care: LongTermCareAssumptions,
    #[serde(default)]
    pub savings: SavingsPlan,
    #[serde(default)]
    pub mortality: MortalityModel,
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
}

fn check(field: &'static str, outcome: std::result::Result<(), String>) -> Result<()> {
    outcome.map_err(|reason| SimulationError::invalid(field, reason))
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimulationError::invalid(
            field,
            format!("{value} must be finite and non-negative"),
        ))
    }
}

impl SimulationParameters {
    /// Check every invariant once, before any trial runs
    pub fn validate(&self) -> Result<()> {
        self.validate_household()?;

        for (owner, buckets) in self.buckets.owners() {
            for value in [
                buckets.tax_deferred,
                buckets.tax_free,
                buckets.capital_gains,
                buckets.cash_equivalents,
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(SimulationError::invalid(
                        "buckets",
                        format!("{owner:?} holds a balance of {value}"),
                    ));
                }
            }
        }

        check("market.user_strategy", self.market.user_strategy.validate())?;
        if let Some(strategy) = &self.market.spouse_strategy {
            check("market.spouse_strategy", strategy.validate())?;
        }
        non_negative("market.fixed_volatility", self.market.fixed_volatility)?;
        if let Some(regime) = &self.market.regime {
            check("market.regime", regime.validate())?;
        }

        let rate = self.withdrawal.withdrawal_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(SimulationError::invalid(
                "withdrawal.withdrawal_rate",
                format!("{rate} must lie in [0, 1]"),
            ));
        }
        if let Some(governor) = &self.withdrawal.dynamic_spending {
            check("withdrawal.dynamic_spending", governor.validate())?;
        }

        check("tax", self.tax.validate())?;

        non_negative("expenses.monthly_expenses", self.expenses.monthly_expenses)?;
        non_negative("expenses.annual_healthcare", self.expenses.annual_healthcare)?;
        if !self.expenses.healthcare_real_growth.is_finite()
            || self.expenses.healthcare_real_growth <= -1.0
        {
            return Err(SimulationError::invalid(
                "expenses.healthcare_real_growth",
                "must be finite and above -100%",
            ));
        }

        let ltc = &self.long_term_care;
        for (field, p) in [
            ("long_term_care.annual_incidence", ltc.annual_incidence),
            ("long_term_care.insurance_coverage", ltc.insurance_coverage),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimulationError::invalid(field, format!("{p} must lie in [0, 1]")));
            }
        }
        non_negative("long_term_care.annual_cost", ltc.annual_cost)?;

        non_negative("savings.user_annual", self.savings.user_annual)?;
        non_negative("savings.spouse_annual", self.savings.spouse_annual)?;
        for liability in &self.savings.liabilities {
            non_negative("savings.liabilities", liability.balance)?;
            non_negative("savings.liabilities", liability.annual_payment)?;
        }

        let mc = &self.monte_carlo;
        if mc.trials == 0 {
            return Err(SimulationError::invalid("monte_carlo.trials", "must be positive"));
        }
        if !(mc.target_success > 0.0 && mc.target_success <= 1.0) {
            return Err(SimulationError::invalid(
                "monte_carlo.target_success",
                format!("{} must lie in (0, 1]", mc.target_success),
            ));
        }
        let cal = &mc.calibration;
        if cal.trials == 0 || cal.candidates_per_round == 0 || cal.max_rounds == 0 {
            return Err(SimulationError::invalid(
                "monte_carlo.calibration",
                "trials, candidates per round and rounds must be positive",
            ));
        }
        if !(cal.min_rate >= 0.0 && cal.min_rate < cal.max_rate && cal.max_rate <= 1.0) {
            return Err(SimulationError::invalid(
                "monte_carlo.calibration",
                format!(
                    "rate bracket [{}, {}] is not ordered within [0, 1]",
                    cal.min_rate, cal.max_rate
                ),
            ));
        }
        if !(cal.precision.is_finite() && cal.precision > 0.0) {
            return Err(SimulationError::invalid(
                "monte_carlo.calibration.precision",
                "must be positive",
            ));
        }

        Ok(())
    }

    fn validate_household(&self) -> Result<()> {
        let household = &self.household;
        let user = &household.user;
        if user.retirement_age < user.current_age {
            return Err(SimulationError::invalid(
                "household.user.retirement_age",
                format!(
                    "retirement age {} is before current age {}",
                    user.retirement_age, user.current_age
                ),
            ));
        }
        let people = [
            ("household.user", Some(user)),
            ("household.spouse", household.spouse.as_ref()),
        ];
        for (field, person) in people {
            let Some(person) = person else { continue };
            if person.current_age > MAX_AGE || person.retirement_age > MAX_AGE {
                return Err(SimulationError::invalid(
                    field,
                    format!("ages must not exceed {MAX_AGE}"),
                ));
            }
            let income = &person.income;
            for value in [income.social_security, income.pension, income.part_time] {
                non_negative(field, value)?;
            }
        }
        if household.marital_status == MaritalStatus::Married && household.spouse.is_none() {
            return Err(SimulationError::invalid(
                "household.spouse",
                "a married household needs spouse details",
            ));
        }
        for annuity in &household.annuities {
            non_negative("household.annuities", annuity.annual_amount)?;
            if annuity.owner == Owner::Spouse && household.spouse.is_none() {
                return Err(SimulationError::invalid(
                    "household.annuities",
                    "annuity owned by a spouse the household does not have",
                ));
            }
        }
        non_negative("household.legacy_goal", household.legacy_goal)?;
        if self.buckets.owner(Owner::Spouse).total() > 0.0 && household.spouse.is_none() {
            return Err(SimulationError::invalid(
                "buckets",
                "spouse holds assets but the household has no spouse",
            ));
        }
        Ok(())
    }

    /// Copy with a different initial withdrawal rate
    #[must_use]
    pub fn with_withdrawal_rate(&self, rate: f64) -> Self {
        let mut params = self.clone();
        params.withdrawal.withdrawal_rate = rate;
        params
    }

    /// Years until the user retires (zero once retired)
    #[must_use]
    pub fn accumulation_years(&self) -> u32 {
        let user = &self.household.user;
        user.retirement_age.saturating_sub(user.current_age)
    }
}
