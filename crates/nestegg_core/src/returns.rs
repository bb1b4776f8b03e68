//! Stochastic real-return generation
//!
//! Each owner's buckets follow a `ReturnStrategy`, which resolves to an
//! expected return, a volatility and an allocation for the year. One year's
//! return is drawn log-normally so it can never fall below -100%:
//!
//! `ln(1 + r) ~ Normal(mu - sigma^2 / 2, sigma)`
//!
//! so the median return is `exp(mu - sigma^2 / 2) - 1` and the mean is
//! `exp(mu) - 1`. A riskless profile (zero volatility) earns `mu` exactly.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::model::{Allocation, ClassFigures};

/// Expected real return for risk scores 1 through 5
pub const RISK_PROFILE_RETURNS: [f64; 5] = [0.050, 0.056, 0.061, 0.066, 0.070];

/// Allocation for risk scores 1 through 5
pub const RISK_PROFILE_ALLOCATIONS: [Allocation; 5] = [
    Allocation::new(0.20, 0.60, 0.20),
    Allocation::new(0.40, 0.50, 0.10),
    Allocation::new(0.60, 0.35, 0.05),
    Allocation::new(0.75, 0.22, 0.03),
    Allocation::new(0.90, 0.10, 0.00),
];

/// Allocation assumed for a fixed-rate strategy when the regime process needs
/// a stock weight
pub const BALANCED_ALLOCATION: Allocation = RISK_PROFILE_ALLOCATIONS[2];

const GLIDE_PATH_CASH: f64 = 0.05;

/// How an owner's expected return is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReturnStrategy {
    /// Constant expected real return; volatility comes from the market assumptions
    Fixed(f64),
    /// Equity weight set by years to retirement
    GlidePath,
    /// The owner's present stock/bond/cash mix, held constant
    CurrentAllocation(Allocation),
    /// Discrete risk score 1..=5
    RiskProfile(u8),
}

impl Default for ReturnStrategy {
    fn default() -> Self {
        ReturnStrategy::RiskProfile(3)
    }
}

/// A strategy resolved for one year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnProfile {
    pub expected: f64,
    pub volatility: f64,
    pub allocation: Allocation,
}

impl ReturnStrategy {
    /// Resolve to an expected return and volatility.
    ///
    /// `years_to_retirement` is negative once the owner has retired.
    #[must_use]
    pub fn profile(&self, years_to_retirement: i32, fixed_volatility: f64) -> ReturnProfile {
        match *self {
            ReturnStrategy::Fixed(rate) => ReturnProfile {
                expected: rate,
                volatility: fixed_volatility,
                allocation: BALANCED_ALLOCATION,
            },
            ReturnStrategy::GlidePath => {
                allocation_profile(glide_path_allocation(years_to_retirement))
            }
            ReturnStrategy::CurrentAllocation(allocation) => allocation_profile(allocation),
            ReturnStrategy::RiskProfile(score) => {
                let idx = usize::from(score.clamp(1, 5) - 1);
                let allocation = RISK_PROFILE_ALLOCATIONS[idx];
                ReturnProfile {
                    expected: RISK_PROFILE_RETURNS[idx],
                    volatility: ClassFigures::CLASS_VOLATILITY.uncorrelated_volatility(&allocation),
                    allocation,
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match *self {
            ReturnStrategy::Fixed(rate) if !rate.is_finite() || rate <= -1.0 => {
                Err(format!("fixed return {rate} must be finite and above -100%"))
            }
            ReturnStrategy::CurrentAllocation(a) if !a.is_valid() => Err(format!(
                "allocation weights must be non-negative and sum to 1 (got {:.6})",
                a.sum()
            )),
            ReturnStrategy::RiskProfile(score) if !(1..=5).contains(&score) => {
                Err(format!("risk profile {score} is outside 1..=5"))
            }
            _ => Ok(()),
        }
    }
}

fn allocation_profile(allocation: Allocation) -> ReturnProfile {
    ReturnProfile {
        expected: ClassFigures::HISTORICAL_REAL_RETURNS.weighted(&allocation),
        volatility: ClassFigures::CLASS_VOLATILITY.uncorrelated_volatility(&allocation),
        allocation,
    }
}

/// Equity weight on the glide path: 90% at 30+ years out, 40% at retirement,
/// 30% from ten years into retirement.
#[must_use]
pub fn glide_path_equity(years_to_retirement: i32) -> f64 {
    let ytr = f64::from(years_to_retirement);
    if years_to_retirement >= 30 {
        0.90
    } else if years_to_retirement >= 0 {
        0.40 + 0.50 * ytr / 30.0
    } else if years_to_retirement > -10 {
        0.40 - 0.10 * (-ytr) / 10.0
    } else {
        0.30
    }
}

#[must_use]
pub fn glide_path_allocation(years_to_retirement: i32) -> Allocation {
    let stocks = glide_path_equity(years_to_retirement);
    let cash = GLIDE_PATH_CASH.min(1.0 - stocks);
    Allocation::new(stocks, 1.0 - stocks - cash, cash)
}

/// Joint holdings earn the arithmetic mean of both owners' profiles
#[must_use]
pub fn joint_profile(user: ReturnProfile, spouse: ReturnProfile) -> ReturnProfile {
    ReturnProfile {
        expected: f64::midpoint(user.expected, spouse.expected),
        volatility: f64::midpoint(user.volatility, spouse.volatility),
        allocation: Allocation::midpoint(user.allocation, spouse.allocation),
    }
}

/// Map a standard-normal shock to a log-normal real return
#[inline]
#[must_use]
pub fn real_return_from_shock(expected: f64, volatility: f64, z: f64) -> f64 {
    if volatility == 0.0 {
        return expected;
    }
    let location = expected - 0.5 * volatility * volatility;
    (location + volatility * z).exp() - 1.0
}

pub fn draw_real_return<R: Rng + ?Sized>(expected: f64, volatility: f64, rng: &mut R) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    real_return_from_shock(expected, volatility, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn risk_profiles_map_to_fixed_returns() {
        let expected: Vec<f64> = (1..=5)
            .map(|s| ReturnStrategy::RiskProfile(s).profile(10, 0.15).expected)
            .collect();
        assert_eq!(expected, vec![0.050, 0.056, 0.061, 0.066, 0.070]);
    }

    #[test]
    fn risk_profile_allocations_sum_to_one() {
        for a in RISK_PROFILE_ALLOCATIONS {
            assert!(a.is_valid(), "{a:?}");
        }
    }

    #[test]
    fn volatility_combines_classes_without_correlation() {
        let a = Allocation::new(0.6, 0.4, 0.0);
        let vol = ClassFigures::CLASS_VOLATILITY.uncorrelated_volatility(&a);
        let expected = ((0.6_f64 * 0.18).powi(2) + (0.4_f64 * 0.06).powi(2)).sqrt();
        assert!((vol - expected).abs() < 1e-12);
    }

    #[test]
    fn glide_path_schedule() {
        assert_eq!(glide_path_equity(40), 0.90);
        assert_eq!(glide_path_equity(30), 0.90);
        assert!((glide_path_equity(15) - 0.65).abs() < 1e-12);
        assert!((glide_path_equity(0) - 0.40).abs() < 1e-12);
        assert!((glide_path_equity(-5) - 0.35).abs() < 1e-12);
        assert_eq!(glide_path_equity(-10), 0.30);
        assert_eq!(glide_path_equity(-25), 0.30);
        for ytr in -20..40 {
            assert!(glide_path_allocation(ytr).is_valid());
        }
    }

    #[test]
    fn glide_path_blends_historical_returns() {
        let p = ReturnStrategy::GlidePath.profile(0, 0.15);
        let a = glide_path_allocation(0);
        let expected = a.stocks * 0.07 + a.bonds * 0.025 + a.cash * 0.005;
        assert!((p.expected - expected).abs() < 1e-12);
    }

    #[test]
    fn joint_profile_is_mean() {
        let u = ReturnStrategy::RiskProfile(1).profile(5, 0.15);
        let s = ReturnStrategy::RiskProfile(5).profile(5, 0.15);
        let j = joint_profile(u, s);
        assert!((j.expected - 0.060).abs() < 1e-12);
    }

    #[test]
    fn zero_volatility_returns_expected_exactly() {
        assert_eq!(real_return_from_shock(0.04, 0.0, 2.5), 0.04);
    }

    #[test]
    fn draws_never_reach_minus_one_hundred_percent() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let r = draw_real_return(0.05, 0.60, &mut rng);
            assert!(r > -1.0);
        }
    }

    #[test]
    fn median_shock_sits_at_the_log_location() {
        let median = real_return_from_shock(0.06, 0.15, 0.0);
        assert!((median - 0.049958).abs() < 1e-6, "median {median}");
    }

    #[test]
    fn lognormal_draw_mean_is_exp_mu() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 200_000;
        let mean: f64 = (0..n)
            .map(|_| draw_real_return(0.06, 0.15, &mut rng))
            .sum::<f64>()
            / n as f64;
        let expected = 0.06_f64.exp() - 1.0;
        assert!((mean - expected).abs() < 0.002, "mean {mean}");
    }

    #[test]
    fn invalid_strategies_are_rejected() {
        assert!(ReturnStrategy::RiskProfile(0).validate().is_err());
        assert!(ReturnStrategy::RiskProfile(6).validate().is_err());
        assert!(ReturnStrategy::Fixed(-1.5).validate().is_err());
        assert!(
            ReturnStrategy::CurrentAllocation(Allocation::new(0.5, 0.2, 0.2))
                .validate()
                .is_err()
        );
        assert!(ReturnStrategy::GlidePath.validate().is_ok());
    }
}
