//! Parameters builder
//!
//! Fluent construction of `SimulationParameters` for programmatic callers and
//! tests. `build()` validates; nothing downstream re-checks.

use super::{CalibrationConfig, LongTermCareAssumptions, SimulationParameters};
use crate::bucketing::bucket_assets;
use crate::error::{Result, SnapshotError};
use crate::model::{
    AnnuityIncome, Asset, BucketKind, Household, Liability, OwnedBuckets, Owner, Person,
};
use crate::mortality::MortalityModel;
use crate::regime::RegimeModel;
use crate::returns::ReturnStrategy;
use crate::spending::DynamicSpending;
use crate::taxes::TaxContext;

/// Builder for `SimulationParameters`
#[derive(Debug, Clone)]
pub struct ParametersBuilder {
    params: SimulationParameters,
    /// First asset rejected by `assets()`, reported by `build()`
    rejected: Option<SnapshotError>,
}

impl ParametersBuilder {
    #[must_use]
    pub fn new(household: Household) -> Self {
        Self {
            params: SimulationParameters {
                household,
                buckets: OwnedBuckets::new(),
                market: Default::default(),
                withdrawal: Default::default(),
                tax: TaxContext::default(),
                expenses: Default::default(),
                long_term_care: LongTermCareAssumptions::default(),
                savings: Default::default(),
                mortality: MortalityModel::default(),
                monte_carlo: Default::default(),
            },
            rejected: None,
        }
    }

    #[must_use]
    pub fn single(user: Person) -> Self {
        Self::new(Household::single(user))
    }

    #[must_use]
    pub fn couple(user: Person, spouse: Person) -> Self {
        Self::new(Household::couple(user, spouse))
    }

    // =========================================================================
    // Holdings
    // =========================================================================

    #[must_use]
    pub fn deposit(mut self, owner: Owner, kind: BucketKind, amount: f64) -> Self {
        self.params.buckets.deposit(owner, kind, amount);
        self
    }

    #[must_use]
    pub fn buckets(mut self, buckets: OwnedBuckets) -> Self {
        self.params.buckets = buckets;
        self
    }

    /// Classify raw assets into buckets; paying annuities become income
    #[must_use]
    pub fn assets(mut self, assets: &[Asset]) -> Self {
        let household = &self.params.household;
        let owner_age = |owner: Owner| {
            household
                .person(owner)
                .map_or(household.user.current_age, |p| p.current_age)
        };
        let bucketed = match bucket_assets(assets, owner_age) {
            Ok(bucketed) => bucketed,
            Err(err) => {
                if self.rejected.is_none() {
                    self.rejected = Some(err);
                }
                return self;
            }
        };
        for (owner, b) in bucketed.buckets.owners() {
            for kind in BucketKind::WITHDRAWAL_ORDER {
                let amount = b.get(kind);
                if amount != 0.0 {
                    self.params.buckets.deposit(owner, kind, amount);
                }
            }
        }
        self.params.household.annuities.extend(bucketed.annuity_incomes);
        self
    }

    #[must_use]
    pub fn annuity(mut self, annuity: AnnuityIncome) -> Self {
        self.params.household.annuities.push(annuity);
        self
    }

    #[must_use]
    pub fn legacy_goal(mut self, goal: f64) -> Self {
        self.params.household.legacy_goal = goal;
        self
    }

    // =========================================================================
    // Market
    // =========================================================================

    /// Strategy for the user (and the spouse unless set separately)
    #[must_use]
    pub fn strategy(mut self, strategy: ReturnStrategy) -> Self {
        self.params.market.user_strategy = strategy;
        self
    }

    #[must_use]
    pub fn spouse_strategy(mut self, strategy: ReturnStrategy) -> Self {
        self.params.market.spouse_strategy = Some(strategy);
        self
    }

    /// Volatility for fixed-rate strategies
    #[must_use]
    pub fn volatility(mut self, volatility: f64) -> Self {
        self.params.market.fixed_volatility = volatility;
        self
    }

    #[must_use]
    pub fn regime(mut self, model: RegimeModel) -> Self {
        self.params.market.regime = Some(model);
        self
    }

    // =========================================================================
    // Withdrawals, spending and taxes
    // =========================================================================

    #[must_use]
    pub fn withdrawal_rate(mut self, rate: f64) -> Self {
        self.params.withdrawal.withdrawal_rate = rate;
        self
    }

    #[must_use]
    pub fn dynamic_spending(mut self, governor: DynamicSpending) -> Self {
        self.params.withdrawal.dynamic_spending = Some(governor);
        self
    }

    #[must_use]
    pub fn guardrails(mut self, enabled: bool) -> Self {
        self.params.withdrawal.guardrails = enabled;
        self
    }

    #[must_use]
    pub fn tax(mut self, tax: TaxContext) -> Self {
        self.params.tax = tax;
        self
    }

    #[must_use]
    pub fn monthly_expenses(mut self, amount: f64) -> Self {
        self.params.expenses.monthly_expenses = amount;
        self
    }

    #[must_use]
    pub fn healthcare(mut self, annual: f64, real_growth: f64) -> Self {
        self.params.expenses.annual_healthcare = annual;
        self.params.expenses.healthcare_real_growth = real_growth;
        self
    }

    #[must_use]
    pub fn long_term_care(mut self, ltc: LongTermCareAssumptions) -> Self {
        self.params.long_term_care = ltc;
        self
    }

    // =========================================================================
    // Accumulation
    // =========================================================================

    #[must_use]
    pub fn savings(mut self, user_annual: f64, spouse_annual: f64) -> Self {
        self.params.savings.user_annual = user_annual;
        self.params.savings.spouse_annual = spouse_annual;
        self
    }

    #[must_use]
    pub fn liability(mut self, liability: Liability) -> Self {
        self.params.savings.liabilities.push(liability);
        self
    }

    #[must_use]
    pub fn mortality(mut self, model: MortalityModel) -> Self {
        self.params.mortality = model;
        self
    }

    // =========================================================================
    // Monte Carlo
    // =========================================================================

    #[must_use]
    pub fn trials(mut self, trials: usize) -> Self {
        self.params.monte_carlo.trials = trials;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.params.monte_carlo.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn target_success(mut self, target: f64) -> Self {
        self.params.monte_carlo.target_success = target;
        self
    }

    #[must_use]
    pub fn calibrate(mut self, enabled: bool) -> Self {
        self.params.monte_carlo.calibrate = enabled;
        self
    }

    #[must_use]
    pub fn calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.params.monte_carlo.calibration = calibration;
        self
    }

    /// Validate and return the parameters
    pub fn build(self) -> Result<SimulationParameters> {
        if let Some(err) = self.rejected {
            return Err(err.into());
        }
        self.params.validate()?;
        Ok(self.params)
    }

    /// Return the parameters without validating them
    #[must_use]
    pub fn build_unchecked(self) -> SimulationParameters {
        self.params
    }
}
