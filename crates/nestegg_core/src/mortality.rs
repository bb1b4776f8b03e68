//! Single and joint survival
//!
//! Annual death probabilities follow a Gompertz curve scaled by health status.
//! Nobody survives past `MAX_AGE`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{HealthStatus, Household, MAX_AGE};

// Gompertz fit to period life tables: q(65) ~ 1.1%, q(85) ~ 6.9%
const GOMPERTZ_INTERCEPT: f64 = -10.5;
const GOMPERTZ_SLOPE: f64 = 0.092;

/// Share of non-healthcare spending a surviving spouse keeps
pub const SURVIVOR_NON_HEALTHCARE_FACTOR: f64 = 0.75;
/// Share of healthcare spending a surviving spouse keeps
pub const SURVIVOR_HEALTHCARE_FACTOR: f64 = 0.85;

/// How deaths are determined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MortalityModel {
    /// Health-adjusted annual draws
    #[default]
    Stochastic,
    /// Each person dies on reaching their planning life expectancy
    FixedLifespan,
}

fn health_multiplier(health: HealthStatus) -> f64 {
    match health {
        HealthStatus::Excellent => 0.7,
        HealthStatus::Good => 1.0,
        HealthStatus::Fair => 1.4,
        HealthStatus::Poor => 2.0,
    }
}

/// Probability of dying during the year lived at `age`
#[must_use]
pub fn annual_death_probability(age: u32, health: HealthStatus) -> f64 {
    if age >= MAX_AGE {
        return 1.0;
    }
    let base = (GOMPERTZ_INTERCEPT + GOMPERTZ_SLOPE * f64::from(age)).exp();
    (base * health_multiplier(health)).min(1.0)
}

/// Result of one joint survival draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointSurvival {
    pub user_survives: bool,
    pub spouse_survives: bool,
    pub either_survives: bool,
}

/// Draw survival for a couple (or a single person when `q_spouse` is None)
pub fn joint_draw<R: Rng + ?Sized>(
    q_user: f64,
    q_spouse: Option<f64>,
    rng: &mut R,
) -> JointSurvival {
    let user_survives = !rng.random_bool(q_user.clamp(0.0, 1.0));
    let spouse_survives = match q_spouse {
        Some(q) => !rng.random_bool(q.clamp(0.0, 1.0)),
        None => false,
    };
    JointSurvival {
        user_survives,
        spouse_survives,
        either_survives: user_survives || spouse_survives,
    }
}

/// Who is alive in a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Survival {
    pub user_alive: bool,
    /// None for a single household
    pub spouse_alive: Option<bool>,
}

/// Deaths that happened during one `advance`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deaths {
    pub user: bool,
    pub spouse: bool,
}

/// Expense multipliers implied by who is still alive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivorAdjustment {
    pub non_healthcare: f64,
    pub healthcare: f64,
}

impl Survival {
    #[must_use]
    pub fn for_household(household: &Household) -> Self {
        Self {
            user_alive: true,
            spouse_alive: household.spouse.as_ref().map(|_| true),
        }
    }

    #[must_use]
    pub fn spouse_alive(&self) -> bool {
        self.spouse_alive.unwrap_or(false)
    }

    #[must_use]
    pub fn either_alive(&self) -> bool {
        self.user_alive || self.spouse_alive()
    }

    /// One member of a couple has died and the other survives
    #[must_use]
    pub fn is_widowed(&self) -> bool {
        self.spouse_alive.is_some() && self.user_alive != self.spouse_alive()
    }

    #[must_use]
    pub fn adjustment(&self) -> SurvivorAdjustment {
        if !self.either_alive() {
            SurvivorAdjustment {
                non_healthcare: 0.0,
                healthcare: 0.0,
            }
        } else if self.is_widowed() {
            SurvivorAdjustment {
                non_healthcare: SURVIVOR_NON_HEALTHCARE_FACTOR,
                healthcare: SURVIVOR_HEALTHCARE_FACTOR,
            }
        } else {
            SurvivorAdjustment {
                non_healthcare: 1.0,
                healthcare: 1.0,
            }
        }
    }

    /// Resolve deaths for the year lived at the given ages
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        household: &Household,
        user_age: u32,
        spouse_age: Option<u32>,
        model: MortalityModel,
        rng: &mut R,
    ) -> Deaths {
        let spouse = household.spouse.as_ref().zip(spouse_age);
        let (user_survives, spouse_survives) = match model {
            MortalityModel::Stochastic => {
                let q_user = annual_death_probability(user_age, household.user.health);
                let q_spouse = spouse.map(|(p, age)| annual_death_probability(age, p.health));
                let draw = joint_draw(q_user, q_spouse, rng);
                (draw.user_survives, draw.spouse_survives)
            }
            MortalityModel::FixedLifespan => {
                let lives = |age: u32, expectancy: u32| age + 1 < expectancy.min(MAX_AGE);
                (
                    lives(user_age, household.user.life_expectancy),
                    spouse.is_some_and(|(p, age)| lives(age, p.life_expectancy)),
                )
            }
        };

        let mut deaths = Deaths::default();
        if self.user_alive && !user_survives {
            self.user_alive = false;
            deaths.user = true;
        }
        if let Some(alive) = self.spouse_alive.as_mut()
            && *alive
            && !spouse_survives
        {
            *alive = false;
            deaths.spouse = true;
        }
        deaths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Person;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn mortality_rises_with_age_and_poor_health() {
        let q65 = annual_death_probability(65, HealthStatus::Good);
        let q85 = annual_death_probability(85, HealthStatus::Good);
        assert!(q65 > 0.005 && q65 < 0.02, "q65 = {q65}");
        assert!(q85 > q65);
        assert!(
            annual_death_probability(75, HealthStatus::Poor)
                > annual_death_probability(75, HealthStatus::Excellent)
        );
        assert_eq!(annual_death_probability(120, HealthStatus::Excellent), 1.0);
    }

    #[test]
    fn joint_draw_reports_either_survivor() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = joint_draw(1.0, Some(0.0), &mut rng);
        assert!(!d.user_survives);
        assert!(d.spouse_survives);
        assert!(d.either_survives);

        let d = joint_draw(1.0, None, &mut rng);
        assert!(!d.either_survives);
    }

    #[test]
    fn widowhood_scales_expenses() {
        let s = Survival {
            user_alive: false,
            spouse_alive: Some(true),
        };
        let adj = s.adjustment();
        assert_eq!(adj.non_healthcare, 0.75);
        assert_eq!(adj.healthcare, 0.85);

        let single = Survival {
            user_alive: true,
            spouse_alive: None,
        };
        assert!(!single.is_widowed());
        assert_eq!(single.adjustment().non_healthcare, 1.0);

        let gone = Survival {
            user_alive: false,
            spouse_alive: Some(false),
        };
        assert_eq!(gone.adjustment().healthcare, 0.0);
    }

    #[test]
    fn fixed_lifespan_dies_at_expectancy() {
        let household = Household::couple(
            Person::new(68, 65).with_life_expectancy(70),
            Person::new(68, 65).with_life_expectancy(72),
        );
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = Survival::for_household(&household);

        let d = s.advance(&household, 68, Some(68), MortalityModel::FixedLifespan, &mut rng);
        assert_eq!(d, Deaths::default());
        let d = s.advance(&household, 69, Some(69), MortalityModel::FixedLifespan, &mut rng);
        assert!(d.user && !d.spouse);
        assert!(s.is_widowed());
        s.advance(&household, 70, Some(70), MortalityModel::FixedLifespan, &mut rng);
        let d = s.advance(&household, 71, Some(71), MortalityModel::FixedLifespan, &mut rng);
        assert!(d.spouse);
        assert!(!s.either_alive());
    }

    #[test]
    fn everyone_dies_by_max_age() {
        let person = Person::new(100, 65).with_health(HealthStatus::Excellent);
        let household = Household::single(person);
        let mut rng = StdRng::seed_from_u64(3);
        let mut s = Survival::for_household(&household);
        for age in 100..=MAX_AGE {
            s.advance(&household, age, None, MortalityModel::Stochastic, &mut rng);
        }
        assert!(!s.either_alive());
    }
}
