//! Guaranteed income for one simulated year
//!
//! Social Security starts at the claim age; pensions and part-time work start
//! at the person's retirement age. Nothing is paid to someone who has died,
//! but a surviving spouse keeps the larger of the two Social Security
//! benefits.

use crate::model::{Household, Owner, Person};
use crate::mortality::Survival;

/// Guaranteed income broken down by source
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GuaranteedIncome {
    pub social_security: f64,
    pub pension: f64,
    pub part_time: f64,
    pub annuities: f64,
}

impl GuaranteedIncome {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.social_security + self.pension + self.part_time + self.annuities
    }
}

fn own_social_security(person: &Person, age: u32) -> f64 {
    if age >= person.income.social_security_claim_age {
        person.income.social_security
    } else {
        0.0
    }
}

fn add_work_income(income: &mut GuaranteedIncome, person: &Person, age: u32) {
    if age < person.retirement_age {
        return;
    }
    income.pension += person.income.pension;
    if age < person.income.part_time_until_age {
        income.part_time += person.income.part_time;
    }
}

/// Income the household receives this year at the given ages
#[must_use]
pub fn guaranteed_income(
    household: &Household,
    user_age: u32,
    spouse_age: Option<u32>,
    survival: &Survival,
) -> GuaranteedIncome {
    let mut income = GuaranteedIncome::default();
    let spouse = household.spouse.as_ref().zip(spouse_age);

    if survival.user_alive {
        add_work_income(&mut income, &household.user, user_age);
    }
    if let Some((person, age)) = spouse
        && survival.spouse_alive()
    {
        add_work_income(&mut income, person, age);
    }

    income.social_security = match spouse {
        Some((person, age)) if survival.is_widowed() => {
            // Survivor benefit: the larger of the two records
            let (survivor, survivor_age, deceased) = if survival.user_alive {
                (&household.user, user_age, person)
            } else {
                (person, age, &household.user)
            };
            if survivor_age >= survivor.income.social_security_claim_age {
                survivor
                    .income
                    .social_security
                    .max(deceased.income.social_security)
            } else {
                0.0
            }
        }
        _ => {
            let mut ss = 0.0;
            if survival.user_alive {
                ss += own_social_security(&household.user, user_age);
            }
            if let Some((person, age)) = spouse
                && survival.spouse_alive()
            {
                ss += own_social_security(person, age);
            }
            ss
        }
    };

    for annuity in &household.annuities {
        let (alive, age) = match annuity.owner {
            Owner::User => (survival.user_alive, Some(user_age)),
            Owner::Spouse => (survival.spouse_alive(), spouse_age),
            Owner::Joint => (survival.either_alive(), Some(user_age)),
        };
        if alive && age.is_some_and(|a| a >= annuity.start_age) {
            income.annuities += annuity.annual_amount;
        }
    }

    income
}
