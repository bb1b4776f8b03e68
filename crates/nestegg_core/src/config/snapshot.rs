//! Household snapshot conversion
//!
//! The intake collaborator hands over a profile with birth dates, raw assets
//! and incomes. `SimulationParameters::from_snapshot` turns it into validated
//! parameters with ages computed as of a given date.

use jiff::Unit;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::{
    ExpenseStreams, LongTermCareAssumptions, MarketAssumptions, SavingsPlan, SimulationParameters,
};
use crate::bucketing::bucket_assets;
use crate::error::{Result, SnapshotError};
use crate::model::{
    Asset, HealthStatus, Household, IncomeSources, Liability, MaritalStatus, Owner, Person,
};
use crate::returns::ReturnStrategy;
use crate::taxes::{FilingStatus, MarginalRateTable, TaxContext};

fn default_risk_score() -> u8 {
    3
}

fn default_claim_age() -> u32 {
    67
}

/// One person as captured by the intake profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSnapshot {
    pub birth_date: Date,
    pub retirement_age: u32,
    /// Defaults from health status when absent
    #[serde(default)]
    pub life_expectancy: Option<u32>,
    #[serde(default)]
    pub health: HealthStatus,
    #[serde(default = "default_risk_score")]
    pub risk_score: u8,
    #[serde(default)]
    pub social_security: f64,
    #[serde(default = "default_claim_age")]
    pub social_security_claim_age: u32,
    #[serde(default)]
    pub pension: f64,
    #[serde(default)]
    pub part_time_income: f64,
    #[serde(default)]
    pub part_time_until_age: u32,
    /// Annual savings while still working
    #[serde(default)]
    pub annual_savings: f64,
}

impl PersonSnapshot {
    fn age_on(&self, as_of: Date, person: &'static str) -> std::result::Result<u32, SnapshotError> {
        if self.birth_date > as_of {
            return Err(SnapshotError::BirthDateInFuture { person });
        }
        let span = as_of.since((Unit::Year, self.birth_date))?;
        Ok(u32::try_from(span.get_years()).unwrap_or(0))
    }

    fn to_person(
        &self,
        as_of: Date,
        person: &'static str,
    ) -> std::result::Result<Person, SnapshotError> {
        if !(1..=5).contains(&self.risk_score) {
            return Err(SnapshotError::RiskScoreOutOfRange {
                person,
                score: self.risk_score,
            });
        }
        Ok(Person {
            current_age: self.age_on(as_of, person)?,
            retirement_age: self.retirement_age,
            life_expectancy: self
                .life_expectancy
                .unwrap_or_else(|| self.health.default_life_expectancy()),
            health: self.health,
            income: IncomeSources {
                social_security: self.social_security,
                social_security_claim_age: self.social_security_claim_age,
                pension: self.pension,
                part_time: self.part_time_income,
                part_time_until_age: self.part_time_until_age,
            },
        })
    }
}

/// Household profile from the intake collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdSnapshot {
    pub user: PersonSnapshot,
    #[serde(default)]
    pub spouse: Option<PersonSnapshot>,
    #[serde(default)]
    pub marital_status: MaritalStatus,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub liabilities: Vec<Liability>,
    /// Expected retirement spending per month, today's dollars
    pub monthly_expenses: f64,
    #[serde(default)]
    pub annual_healthcare: f64,
    #[serde(default)]
    pub healthcare_real_growth: f64,
    #[serde(default)]
    pub legacy_goal: f64,
    #[serde(default)]
    pub long_term_care_insurance: bool,
    #[serde(default)]
    pub state_of_residence: Option<String>,
}

impl SimulationParameters {
    /// Build parameters from an intake snapshot.
    ///
    /// Ages are whole years on `as_of`. Tax rates come from `rates`, looked
    /// up once at the household's expected retirement spending.
    pub fn from_snapshot(
        snapshot: &HouseholdSnapshot,
        as_of: Date,
        rates: &dyn MarginalRateTable,
    ) -> Result<Self> {
        let user = snapshot.user.to_person(as_of, "user")?;
        let spouse = snapshot
            .spouse
            .as_ref()
            .map(|s| s.to_person(as_of, "spouse"))
            .transpose()?;

        if spouse.is_none() {
            if snapshot.marital_status == MaritalStatus::Married {
                return Err(SnapshotError::MissingSpouse {
                    context: "marital status",
                }
                .into());
            }
            if snapshot.assets.iter().any(|a| a.owner == Owner::Spouse) {
                return Err(SnapshotError::MissingSpouse { context: "an asset" }.into());
            }
        }

        let mut household = Household {
            user,
            spouse,
            marital_status: snapshot.marital_status,
            annuities: Vec::new(),
            legacy_goal: snapshot.legacy_goal,
        };
        let bucketed = bucket_assets(&snapshot.assets, |owner| {
            household
                .person(owner)
                .map_or(household.user.current_age, |p| p.current_age)
        })?;
        household.annuities = bucketed.annuity_incomes;

        let user_strategy = ReturnStrategy::RiskProfile(snapshot.user.risk_score);
        let spouse_strategy = snapshot
            .spouse
            .as_ref()
            .map(|s| ReturnStrategy::RiskProfile(s.risk_score));

        let annual_spending = snapshot.monthly_expenses * 12.0 + snapshot.annual_healthcare;
        let tax = TaxContext::from_table(
            rates,
            annual_spending,
            FilingStatus::from(snapshot.marital_status),
            snapshot.state_of_residence.as_deref(),
        );

        let params = SimulationParameters {
            household,
            buckets: bucketed.buckets,
            market: MarketAssumptions {
                user_strategy,
                spouse_strategy,
                ..Default::default()
            },
            withdrawal: Default::default(),
            tax,
            expenses: ExpenseStreams {
                monthly_expenses: snapshot.monthly_expenses,
                annual_healthcare: snapshot.annual_healthcare,
                healthcare_real_growth: snapshot.healthcare_real_growth,
            },
            long_term_care: LongTermCareAssumptions::standard(snapshot.long_term_care_insurance),
            savings: SavingsPlan {
                user_annual: snapshot.user.annual_savings,
                spouse_annual: snapshot.spouse.as_ref().map_or(0.0, |s| s.annual_savings),
                liabilities: snapshot.liabilities.clone(),
                ..Default::default()
            },
            mortality: Default::default(),
            monte_carlo: Default::default(),
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;
    use crate::model::{AssetKind, BucketKind};
    use crate::taxes::FlatRates;
    use jiff::civil::date;

    fn person(birth: Date) -> PersonSnapshot {
        PersonSnapshot {
            birth_date: birth,
            retirement_age: 65,
            life_expectancy: None,
            health: HealthStatus::Fair,
            risk_score: 4,
            social_security: 24_000.0,
            social_security_claim_age: 67,
            pension: 0.0,
            part_time_income: 0.0,
            part_time_until_age: 0,
            annual_savings: 10_000.0,
        }
    }

    fn convert(snap: &HouseholdSnapshot) -> Result<SimulationParameters> {
        SimulationParameters::from_snapshot(snap, date(2025, 1, 1), &FlatRates::default())
    }

    fn snapshot() -> HouseholdSnapshot {
        HouseholdSnapshot {
            user: person(date(1965, 6, 15)),
            spouse: None,
            marital_status: MaritalStatus::Single,
            assets: vec![
                Asset::new(AssetKind::TraditionalIra, Owner::User, 400_000.0),
                Asset::new(AssetKind::Checking, Owner::User, 5_000.0),
            ],
            liabilities: Vec::new(),
            monthly_expenses: 4_000.0,
            annual_healthcare: 6_000.0,
            healthcare_real_growth: 0.02,
            legacy_goal: 100_000.0,
            long_term_care_insurance: true,
            state_of_residence: Some("OR".to_string()),
        }
    }

    #[test]
    fn ages_are_whole_years_on_the_evaluation_date() {
        let snap = snapshot();
        let before_birthday =
            SimulationParameters::from_snapshot(&snap, date(2025, 6, 14), &FlatRates::default())
                .unwrap();
        assert_eq!(before_birthday.household.user.current_age, 59);
        let on_birthday =
            SimulationParameters::from_snapshot(&snap, date(2025, 6, 15), &FlatRates::default())
                .unwrap();
        assert_eq!(on_birthday.household.user.current_age, 60);
    }

    #[test]
    fn snapshot_fills_value_objects() {
        let params = convert(&snapshot()).unwrap();
        assert_eq!(params.household.user.life_expectancy, 85);
        assert_eq!(params.buckets.bucket_total(BucketKind::TaxDeferred), 400_000.0);
        assert_eq!(params.buckets.total(), 400_000.0);
        assert_eq!(params.market.user_strategy, ReturnStrategy::RiskProfile(4));
        assert!(params.long_term_care.enabled && params.long_term_care.insured);
        assert_eq!(params.savings.user_annual, 10_000.0);
        assert_eq!(params.tax.state_of_residence.as_deref(), Some("OR"));
    }

    #[test]
    fn spouse_asset_without_spouse_fails() {
        let mut snap = snapshot();
        snap.assets.push(Asset::new(AssetKind::RothIra, Owner::Spouse, 1.0));
        let err = convert(&snap).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Snapshot(SnapshotError::MissingSpouse { .. })
        ));
    }

    #[test]
    fn future_birth_date_fails() {
        let mut snap = snapshot();
        snap.user.birth_date = date(2030, 1, 1);
        assert!(
            SimulationParameters::from_snapshot(&snap, date(2025, 1, 1), &FlatRates::default())
                .is_err()
        );
    }

    #[test]
    fn risk_score_is_checked() {
        let mut snap = snapshot();
        snap.user.risk_score = 9;
        let err = convert(&snap).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Snapshot(SnapshotError::RiskScoreOutOfRange { score: 9, .. })
        ));
    }

    #[test]
    fn negative_asset_value_fails() {
        let mut snap = snapshot();
        snap.assets.push(Asset::new(AssetKind::TaxableBrokerage, Owner::User, -250_000.0));
        let err = convert(&snap).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Snapshot(SnapshotError::InvalidAssetAmount { index: 2, value, .. })
                if value == -250_000.0
        ));
    }

    #[test]
    fn nan_asset_value_fails() {
        let mut snap = snapshot();
        snap.assets.push(Asset::new(AssetKind::MoneyMarket, Owner::User, f64::NAN));
        let err = convert(&snap).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Snapshot(SnapshotError::InvalidAssetAmount { index: 2, .. })
        ));
    }
}
