//! Scenario simulator
//!
//! One trial walks a household from today through accumulation and
//! decumulation, one year per step, until the portfolio is depleted or the
//! user reaches the horizon age.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::SimulationParameters;
use crate::error::{Result, ensure_finite};
use crate::income::guaranteed_income;
use crate::model::{
    BucketKind, MarketRegime, Owner, TrialOutcome, TrialTermination, YearlyCashFlow,
};
use crate::regime::{ClassReturns, RegimeProcess};
use crate::returns::{ReturnProfile, joint_profile, real_return_from_shock};
use crate::simulation_state::{Phase, ScenarioState};
use crate::spending::{GovernorSignal, guardrail_factor, sustainable_rate};
use crate::withdrawal::{WithdrawalPlan, execute_withdrawal, plan_withdrawal};

/// One year's growth, per owner
#[derive(Debug, Clone, Copy)]
struct YearReturns {
    user: f64,
    spouse: f64,
    joint: f64,
    regime: Option<MarketRegime>,
}

impl YearReturns {
    fn for_owner(&self, owner: Owner) -> f64 {
        match owner {
            Owner::User => self.user,
            Owner::Spouse => self.spouse,
            Owner::Joint => self.joint,
        }
    }
}

/// Run one trial from its own seed
pub fn simulate_trial(
    params: &SimulationParameters,
    seed: u64,
    record: bool,
) -> Result<TrialOutcome> {
    let mut rng = SmallRng::seed_from_u64(seed);
    run_trial(params, &mut rng, record)
}

/// Run one trial with the caller's random source
pub fn run_trial<R: Rng + ?Sized>(
    params: &SimulationParameters,
    rng: &mut R,
    record: bool,
) -> Result<TrialOutcome> {
    let mut state = ScenarioState::new(params, record);
    if let Some(model) = &params.market.regime {
        let ytr = state.years_to_retirement(params, Owner::User);
        state.regime = Some(RegimeProcess::start(model, ytr, rng));
    }

    let horizon = params.household.horizon_age();
    let accumulation_years = params.accumulation_years();

    loop {
        match state.phase {
            Phase::Accumulation => {
                let returns = draw_returns(params, &mut state, rng);
                accumulation_year(params, &mut state, &returns)?;
            }
            Phase::Decumulation => {
                if state.user_age >= horizon {
                    state.phase = Phase::Terminal(TrialTermination::Success);
                    continue;
                }
                let returns = draw_returns(params, &mut state, rng);
                if decumulation_year(params, &mut state, &returns, rng)? {
                    state.phase = Phase::Terminal(TrialTermination::Depleted {
                        years_until_depletion: accumulation_years + state.retired_years,
                    });
                }
            }
            Phase::Terminal(termination) => {
                return Ok(TrialOutcome {
                    termination,
                    ending_balance: state.portfolio_balance(),
                    retirement_portfolio: state.retirement_portfolio.unwrap_or_default(),
                    cash_flows: state.cash_flows,
                });
            }
        }
    }
}

/// Portfolio on the first day of retirement when every year earns exactly
/// its expected return
pub fn project_retirement_portfolio(params: &SimulationParameters) -> Result<f64> {
    let mut state = ScenarioState::new(params, false);
    while state.phase == Phase::Accumulation {
        let returns = expected_returns(params, &state);
        accumulation_year(params, &mut state, &returns)?;
    }
    Ok(state.retirement_portfolio.unwrap_or_default())
}

fn owner_profiles(params: &SimulationParameters, state: &ScenarioState) -> [ReturnProfile; 3] {
    let market = &params.market;
    let profile = |owner: Owner| {
        market
            .strategy(owner)
            .profile(state.years_to_retirement(params, owner), market.fixed_volatility)
    };
    let user = profile(Owner::User);
    let spouse = if params.household.is_couple() {
        profile(Owner::Spouse)
    } else {
        user
    };
    let joint = if params.household.is_couple() {
        joint_profile(user, spouse)
    } else {
        user
    };
    [user, spouse, joint]
}

/// Draw this year's returns. The regime process drives every owner's stock
/// sleeve when active; otherwise owners share one market shock.
fn draw_returns<R: Rng + ?Sized>(
    params: &SimulationParameters,
    state: &mut ScenarioState,
    rng: &mut R,
) -> YearReturns {
    let [user, spouse, joint] = owner_profiles(params, state);

    if let (Some(model), Some(process)) = (&params.market.regime, state.regime.as_mut()) {
        let ytr = user_years_to_retirement(params, state.user_age);
        let class: ClassReturns = process.step(model, ytr, rng);
        return YearReturns {
            user: class.portfolio_return(&user.allocation),
            spouse: class.portfolio_return(&spouse.allocation),
            joint: class.portfolio_return(&joint.allocation),
            regime: Some(class.regime),
        };
    }

    let z: f64 = rng.sample(StandardNormal);
    YearReturns {
        user: real_return_from_shock(user.expected, user.volatility, z),
        spouse: real_return_from_shock(spouse.expected, spouse.volatility, z),
        joint: real_return_from_shock(joint.expected, joint.volatility, z),
        regime: None,
    }
}

fn expected_returns(params: &SimulationParameters, state: &ScenarioState) -> YearReturns {
    let [user, spouse, joint] = owner_profiles(params, state);
    YearReturns {
        user: user.expected,
        spouse: spouse.expected,
        joint: joint.expected,
        regime: None,
    }
}

fn user_years_to_retirement(params: &SimulationParameters, user_age: u32) -> i32 {
    params.household.user.retirement_age as i32 - user_age as i32
}

fn apply_returns(state: &mut ScenarioState, returns: &YearReturns) {
    for owner in Owner::ALL {
        let factor = (1.0 + returns.for_owner(owner)).max(0.0);
        state.buckets.grow_owner(owner, factor);
    }
}

/// Spread a contribution over the owner's buckets in proportion to what they
/// already hold; an empty owner saves into tax-deferred accounts.
fn contribute(state: &mut ScenarioState, owner: Owner, amount: f64) {
    if amount <= 0.0 {
        return;
    }
    let current = state.buckets.owner(owner);
    let total = current.total();
    if total <= 0.0 {
        state.buckets.deposit(owner, BucketKind::TaxDeferred, amount);
        return;
    }
    for kind in BucketKind::WITHDRAWAL_ORDER {
        let share = current.get(kind) / total;
        if share > 0.0 {
            state.buckets.deposit(owner, kind, amount * share);
        }
    }
}

/// Savings from whoever is still working
fn working_savings(params: &SimulationParameters, state: &mut ScenarioState) -> f64 {
    let mut saved = 0.0;
    for owner in [Owner::User, Owner::Spouse] {
        if state.is_working(params, owner) {
            let amount = params.savings.annual_for(owner);
            contribute(state, owner, amount);
            saved += amount;
        }
    }
    saved
}

fn accumulation_year(
    params: &SimulationParameters,
    state: &mut ScenarioState,
    returns: &YearReturns,
) -> Result<()> {
    let start = state.portfolio_balance();
    apply_returns(state, returns);

    let mut contribution = working_savings(params, state);
    let ytr = user_years_to_retirement(params, state.user_age);
    let dividend = params.savings.debt_payoff_dividend(ytr);
    contribute(state, Owner::User, dividend);
    contribution += dividend;

    let balance = ensure_finite("portfolio balance", state.portfolio_balance(), state.year)?;
    state.record(YearlyCashFlow {
        year: state.year,
        age: state.user_age,
        portfolio_balance: balance,
        guaranteed_income: 0.0,
        withdrawal: -contribution,
        net_cash_flow: balance - start,
        market_regime: returns.regime,
    });
    state.prior_portfolio = balance;
    state.advance_year();

    if state.user_age >= params.household.user.retirement_age {
        state.retire(params.withdrawal.withdrawal_rate);
    }
    Ok(())
}

/// Years left on the longest remaining planning life expectancy
fn remaining_years(params: &SimulationParameters, state: &ScenarioState) -> u32 {
    let household = &params.household;
    let user = state
        .survival
        .user_alive
        .then(|| household.user.life_expectancy.saturating_sub(state.user_age));
    let spouse = household
        .spouse
        .as_ref()
        .zip(state.spouse_age)
        .filter(|_| state.survival.spouse_alive())
        .map(|(p, age)| p.life_expectancy.saturating_sub(age));
    user.into_iter().chain(spouse).max().unwrap_or(0)
}

/// Net (after-tax) amount the portfolio must deliver this year
fn withdrawal_need(
    params: &SimulationParameters,
    state: &mut ScenarioState,
    income: f64,
    care_cost: f64,
    portfolio_change: Option<f64>,
    regime: Option<MarketRegime>,
) -> f64 {
    if !state.survival.either_alive() {
        state.essential_spending = 0.0;
        state.discretionary_spending = 0.0;
        return 0.0;
    }

    let adjustment = state.survival.adjustment();
    let expenses = &params.expenses;
    let non_healthcare = expenses.monthly_expenses * 12.0 * adjustment.non_healthcare;
    let healthcare = expenses.annual_healthcare
        * (1.0 + expenses.healthcare_real_growth).powi(state.retired_years as i32)
        * adjustment.healthcare;

    // Share of planned discretionary spending the governor lets through
    let mut spending_ratio = 1.0;
    match &params.withdrawal.dynamic_spending {
        Some(governor) => {
            let planned = governor.split(non_healthcare);
            let balance = state.portfolio_balance();
            let signal = GovernorSignal {
                regime,
                portfolio_change,
                withdrawal_rate: if balance > 0.0 {
                    state.last_withdrawal / balance
                } else {
                    f64::INFINITY
                },
                sustainable_rate: sustainable_rate(remaining_years(params, state)),
            };
            let governed = governor.govern(planned, &signal);
            if planned.total() > 0.0 {
                spending_ratio = governed.total() / planned.total();
            }
            state.essential_spending = governed.essential;
            state.discretionary_spending = governed.discretionary;
        }
        None => {
            state.essential_spending = non_healthcare;
            state.discretionary_spending = 0.0;
        }
    }

    let spending = state.essential_spending + state.discretionary_spending + healthcare + care_cost;
    let spending_gap = (spending - income).max(0.0);
    let rate_draw = state.baseline_withdrawal * spending_ratio;
    let mut need = spending_gap.max(rate_draw);

    if params.withdrawal.guardrails
        && let Some(change) = portfolio_change
    {
        need *= guardrail_factor(1.0 + change);
    }
    need
}

/// Returns true when the portfolio is depleted
fn decumulation_year<R: Rng + ?Sized>(
    params: &SimulationParameters,
    state: &mut ScenarioState,
    returns: &YearReturns,
    rng: &mut R,
) -> Result<bool> {
    let year = state.year;
    let start = state.portfolio_balance();
    apply_returns(state, returns);
    let grown = ensure_finite("portfolio balance", state.portfolio_balance(), year)?;

    // A spouse still working keeps saving
    let saved = working_savings(params, state);

    let portfolio_change =
        (state.prior_portfolio > 0.0).then(|| grown / state.prior_portfolio - 1.0);
    let income = guaranteed_income(
        &params.household,
        state.user_age,
        state.spouse_age,
        &state.survival,
    )
    .total();
    let ages = (state.user_age, state.spouse_age);
    let survival = state.survival;
    let care_cost = state.care.year_cost(&params.long_term_care, ages, &survival, rng);

    let need = withdrawal_need(params, state, income, care_cost, portfolio_change, returns.regime);
    let need = ensure_finite("withdrawal need", need, year)?;

    let plan = if state.survival.either_alive() {
        let ctx = params.tax.withdrawal_context(state.user_age);
        let plan = plan_withdrawal(&state.buckets, need, &ctx);
        execute_withdrawal(&mut state.buckets, &plan);
        plan
    } else {
        WithdrawalPlan::default()
    };
    let balance = ensure_finite("portfolio balance", state.portfolio_balance(), year)?;
    state.last_withdrawal = plan.gross();

    let depleted = plan.is_short() || balance <= 0.0;
    if !depleted {
        state.survival.advance(
            &params.household,
            state.user_age,
            state.spouse_age,
            params.mortality,
            rng,
        );
    }

    state.record(YearlyCashFlow {
        year,
        age: state.user_age,
        portfolio_balance: balance,
        guaranteed_income: income,
        withdrawal: plan.gross() - saved,
        net_cash_flow: balance - start,
        market_regime: returns.regime,
    });
    state.prior_portfolio = balance;
    state.advance_year();
    Ok(depleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParametersBuilder;
    use crate::model::Person;
    use crate::mortality::MortalityModel;
    use crate::returns::ReturnStrategy;
    use crate::taxes::TaxContext;

    fn deterministic(person: Person) -> ParametersBuilder {
        ParametersBuilder::single(person)
            .strategy(ReturnStrategy::Fixed(0.05))
            .volatility(0.0)
            .tax(TaxContext::untaxed())
            .mortality(MortalityModel::FixedLifespan)
    }

    #[test]
    fn accumulation_rows_record_contributions() {
        let params = deterministic(Person::new(60, 63).with_life_expectancy(100))
            .deposit(Owner::User, BucketKind::TaxDeferred, 100_000.0)
            .savings(10_000.0, 0.0)
            .withdrawal_rate(0.0)
            .build()
            .unwrap();
        let outcome = simulate_trial(&params, 1, true).unwrap();
        let rows = outcome.cash_flows.unwrap();
        assert_eq!(rows[0].age, 60);
        assert_eq!(rows[0].withdrawal, -10_000.0);
        assert!((rows[0].portfolio_balance - 115_000.0).abs() < 1e-6);
        assert!((rows[0].net_cash_flow - 15_000.0).abs() < 1e-6);
        assert!(outcome.retirement_portfolio > 100_000.0);
        assert_eq!(rows[3].age, 63);
        assert!(rows[3].withdrawal >= 0.0);
    }

    #[test]
    fn trace_is_only_kept_when_recording() {
        let params = deterministic(Person::new(65, 65))
            .deposit(Owner::User, BucketKind::CashEquivalents, 1_000_000.0)
            .build()
            .unwrap();
        assert!(simulate_trial(&params, 1, false).unwrap().cash_flows.is_none());
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let params = ParametersBuilder::single(Person::new(55, 65))
            .deposit(Owner::User, BucketKind::CapitalGains, 600_000.0)
            .monthly_expenses(3_000.0)
            .build()
            .unwrap();
        let a = simulate_trial(&params, 99, true).unwrap();
        let b = simulate_trial(&params, 99, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn success_at_horizon() {
        let params = deterministic(Person::new(100, 100).with_life_expectancy(120))
            .deposit(Owner::User, BucketKind::CashEquivalents, 1_000_000.0)
            .monthly_expenses(1_000.0)
            .withdrawal_rate(0.0)
            .build()
            .unwrap();
        let outcome = simulate_trial(&params, 3, true).unwrap();
        assert!(outcome.succeeded());
        // Ages 100..=119 are simulated; the horizon is age 120
        assert_eq!(outcome.cash_flows.unwrap().len(), 20);
    }

    #[test]
    fn projection_ignores_volatility() {
        let params = ParametersBuilder::single(Person::new(60, 62))
            .deposit(Owner::User, BucketKind::TaxFree, 100_000.0)
            .strategy(ReturnStrategy::Fixed(0.10))
            .volatility(0.30)
            .build()
            .unwrap();
        let projected = project_retirement_portfolio(&params).unwrap();
        assert!((projected - 121_000.0).abs() < 1e-6);
    }

    #[test]
    fn projection_overflow_names_the_year() {
        let params = ParametersBuilder::single(Person::new(60, 63))
            .strategy(ReturnStrategy::Fixed(0.05))
            .volatility(0.0)
            .savings(f64::MAX, 0.0)
            .build_unchecked();
        let err = project_retirement_portfolio(&params).unwrap_err();
        assert!(matches!(
            err,
            crate::error::SimulationError::NumericAnomaly {
                trial: None,
                year: 1,
                quantity: "portfolio balance",
                ..
            }
        ));
    }
}
