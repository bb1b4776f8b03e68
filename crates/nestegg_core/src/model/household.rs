//! Household members and their guaranteed-income sources
//!
//! A `Household` is built once per request and never mutated while trials run.
//! Per-trial changes (ages, survival) live in `ScenarioState`.

use serde::{Deserialize, Serialize};

/// Who holds an asset or receives an income stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    User,
    Spouse,
    Joint,
}

impl Owner {
    pub const ALL: [Owner; 3] = [Owner::User, Owner::Spouse, Owner::Joint];
}

/// Self-reported health, used to scale mortality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

impl HealthStatus {
    /// Planning life expectancy used when the intake profile leaves it blank
    #[must_use]
    pub fn default_life_expectancy(self) -> u32 {
        match self {
            HealthStatus::Excellent => 93,
            HealthStatus::Good => 89,
            HealthStatus::Fair => 85,
            HealthStatus::Poor => 80,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Widowed,
    Divorced,
}

/// Guaranteed income for one person, in today's dollars per year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncomeSources {
    /// Social Security benefit at the claim age
    pub social_security: f64,
    pub social_security_claim_age: u32,
    /// Pension paid from the person's retirement age
    pub pension: f64,
    /// Part-time work income paid from retirement age
    pub part_time: f64,
    /// Last age (exclusive) at which part-time income is earned
    pub part_time_until_age: u32,
}

impl Default for IncomeSources {
    fn default() -> Self {
        Self {
            social_security: 0.0,
            social_security_claim_age: 67,
            pension: 0.0,
            part_time: 0.0,
            part_time_until_age: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    #[serde(default)]
    pub health: HealthStatus,
    #[serde(default)]
    pub income: IncomeSources,
}

impl Person {
    #[must_use]
    pub fn new(current_age: u32, retirement_age: u32) -> Self {
        Self {
            current_age,
            retirement_age,
            life_expectancy: HealthStatus::Good.default_life_expectancy(),
            health: HealthStatus::Good,
            income: IncomeSources::default(),
        }
    }

    #[must_use]
    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    #[must_use]
    pub fn with_life_expectancy(mut self, age: u32) -> Self {
        self.life_expectancy = age;
        self
    }

    #[must_use]
    pub fn with_social_security(mut self, annual: f64, claim_age: u32) -> Self {
        self.income.social_security = annual;
        self.income.social_security_claim_age = claim_age;
        self
    }

    #[must_use]
    pub fn with_pension(mut self, annual: f64) -> Self {
        self.income.pension = annual;
        self
    }

    #[must_use]
    pub fn with_part_time(mut self, annual: f64, until_age: u32) -> Self {
        self.income.part_time = annual;
        self.income.part_time_until_age = until_age;
        self
    }

    /// Whole years until this person retires (negative once retired)
    #[must_use]
    pub fn years_to_retirement(&self) -> i32 {
        self.retirement_age as i32 - self.current_age as i32
    }
}

/// Annuity already converted to a guaranteed-income stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnuityIncome {
    pub owner: Owner,
    pub annual_amount: f64,
    /// Owner age at which payments begin (user's age for joint annuities)
    pub start_age: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub user: Person,
    #[serde(default)]
    pub spouse: Option<Person>,
    #[serde(default)]
    pub marital_status: MaritalStatus,
    #[serde(default)]
    pub annuities: Vec<AnnuityIncome>,
    /// Desired ending balance; tracked but never part of "success"
    #[serde(default)]
    pub legacy_goal: f64,
}

impl Household {
    #[must_use]
    pub fn single(user: Person) -> Self {
        Self {
            user,
            spouse: None,
            marital_status: MaritalStatus::Single,
            annuities: Vec::new(),
            legacy_goal: 0.0,
        }
    }

    #[must_use]
    pub fn couple(user: Person, spouse: Person) -> Self {
        Self {
            user,
            spouse: Some(spouse),
            marital_status: MaritalStatus::Married,
            annuities: Vec::new(),
            legacy_goal: 0.0,
        }
    }

    #[must_use]
    pub fn is_couple(&self) -> bool {
        self.spouse.is_some()
    }

    #[must_use]
    pub fn person(&self, owner: Owner) -> Option<&Person> {
        match owner {
            Owner::User | Owner::Joint => Some(&self.user),
            Owner::Spouse => self.spouse.as_ref(),
        }
    }

    /// Age at which decumulation runs out of road: 60 years past the user's
    /// retirement, never beyond 120.
    #[must_use]
    pub fn horizon_age(&self) -> u32 {
        (self.user.retirement_age + super::MAX_DECUMULATION_YEARS).min(super::MAX_AGE)
    }
}
