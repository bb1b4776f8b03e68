use rand::Rng;

use crate::config::{LongTermCareAssumptions, SimulationParameters};
use crate::model::{OwnedBuckets, Owner, TrialTermination, YearlyCashFlow};
use crate::mortality::Survival;
use crate::regime::RegimeProcess;

/// Where a trial is in the household lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Accumulation,
    Decumulation,
    Terminal(TrialTermination),
}

/// Long-term-care episodes still running, in years, for user and spouse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CareEpisodes {
    user: u32,
    spouse: u32,
}

impl CareEpisodes {
    /// Start new episodes and return this year's out-of-pocket cost
    pub fn year_cost<R: Rng + ?Sized>(
        &mut self,
        ltc: &LongTermCareAssumptions,
        ages: (u32, Option<u32>),
        survival: &Survival,
        rng: &mut R,
    ) -> f64 {
        if !ltc.enabled {
            return 0.0;
        }
        let mut cost = 0.0;
        let people = [
            (&mut self.user, Some(ages.0), survival.user_alive),
            (&mut self.spouse, ages.1, survival.spouse_alive()),
        ];
        for (remaining, age, alive) in people {
            let Some(age) = age else { continue };
            if !alive {
                *remaining = 0;
                continue;
            }
            if *remaining == 0
                && age >= ltc.onset_age
                && rng.random_bool(ltc.annual_incidence.clamp(0.0, 1.0))
            {
                *remaining = ltc.episode_years;
            }
            if *remaining > 0 {
                cost += ltc.out_of_pocket();
                *remaining -= 1;
            }
        }
        cost
    }
}

/// Mutable per-trial state; created fresh for every trial
#[derive(Debug, Clone)]
pub struct ScenarioState {
    /// Years elapsed since the start of the trial
    pub year: u32,
    pub user_age: u32,
    pub spouse_age: Option<u32>,
    pub survival: Survival,
    pub buckets: OwnedBuckets,
    pub phase: Phase,
    pub regime: Option<RegimeProcess>,
    /// Spending chosen for the latest decumulation year
    pub essential_spending: f64,
    pub discretionary_spending: f64,
    /// Portfolio at the end of the previous year
    pub prior_portfolio: f64,
    pub retirement_portfolio: Option<f64>,
    /// Withdrawal rate applied to the retirement-start portfolio, in dollars
    pub baseline_withdrawal: f64,
    pub last_withdrawal: f64,
    /// Decumulation years completed
    pub retired_years: u32,
    pub care: CareEpisodes,
    pub cash_flows: Option<Vec<YearlyCashFlow>>,
}

impl ScenarioState {
    pub fn new(params: &SimulationParameters, record: bool) -> Self {
        let household = &params.household;
        let mut state = Self {
            year: 0,
            user_age: household.user.current_age,
            spouse_age: household.spouse.as_ref().map(|s| s.current_age),
            survival: Survival::for_household(household),
            buckets: params.buckets.clone(),
            phase: Phase::Accumulation,
            regime: None,
            essential_spending: 0.0,
            discretionary_spending: 0.0,
            prior_portfolio: params.buckets.total(),
            retirement_portfolio: None,
            baseline_withdrawal: 0.0,
            last_withdrawal: 0.0,
            retired_years: 0,
            care: CareEpisodes::default(),
            cash_flows: record.then(Vec::new),
        };
        if state.user_age >= household.user.retirement_age {
            state.retire(params.withdrawal.withdrawal_rate);
        }
        state
    }

    #[must_use]
    pub fn portfolio_balance(&self) -> f64 {
        self.buckets.total()
    }

    /// Switch to decumulation and fix the baseline withdrawal
    pub fn retire(&mut self, withdrawal_rate: f64) {
        let portfolio = self.portfolio_balance();
        self.phase = Phase::Decumulation;
        self.retirement_portfolio = Some(portfolio);
        self.baseline_withdrawal = withdrawal_rate * portfolio;
        self.last_withdrawal = self.baseline_withdrawal;
    }

    #[must_use]
    pub fn age_of(&self, owner: Owner) -> Option<u32> {
        match owner {
            Owner::User | Owner::Joint => Some(self.user_age),
            Owner::Spouse => self.spouse_age,
        }
    }

    /// Signed years until `owner` retires at the current trial age
    #[must_use]
    pub fn years_to_retirement(&self, params: &SimulationParameters, owner: Owner) -> i32 {
        let household = &params.household;
        match (household.person(owner), self.age_of(owner)) {
            (Some(person), Some(age)) => person.retirement_age as i32 - age as i32,
            _ => 0,
        }
    }

    /// Still working and alive
    #[must_use]
    pub fn is_working(&self, params: &SimulationParameters, owner: Owner) -> bool {
        let alive = match owner {
            Owner::User => self.survival.user_alive,
            Owner::Spouse => self.survival.spouse_alive(),
            Owner::Joint => false,
        };
        alive && self.years_to_retirement(params, owner) > 0
    }

    pub fn advance_year(&mut self) {
        self.year += 1;
        self.user_age += 1;
        if let Some(age) = self.spouse_age.as_mut() {
            *age += 1;
        }
        if self.phase == Phase::Decumulation {
            self.retired_years += 1;
        }
    }

    pub fn record(&mut self, row: YearlyCashFlow) {
        if let Some(rows) = self.cash_flows.as_mut() {
            rows.push(row);
        }
    }
}
