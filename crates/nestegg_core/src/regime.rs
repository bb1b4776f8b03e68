//! Four-state market regime process
//!
//! Each regime has its own stock return distribution and a transition row.
//! Close to retirement the initial prior and every transition row are tilted
//! toward bear and crisis states, and stock volatility is scaled up, to model
//! sequence-of-returns risk.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::model::{Allocation, MarketRegime};
use crate::returns::real_return_from_shock;

/// Parameters of a single regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    pub mean_return: f64,
    pub volatility: f64,
    /// Probability of moving to bull, bear, normal, crisis next year
    pub transitions: [f64; 4],
}

impl RegimeParams {
    /// Expected years spent in the regime once entered
    #[must_use]
    pub fn expected_duration(&self, own: MarketRegime) -> f64 {
        let stay = self.transitions[own.index()];
        if stay >= 1.0 {
            f64::INFINITY
        } else {
            1.0 / (1.0 - stay)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeModel {
    pub bull: RegimeParams,
    pub bear: RegimeParams,
    pub normal: RegimeParams,
    pub crisis: RegimeParams,
    /// Initial-state probabilities in bull, bear, normal, crisis order
    pub prior: [f64; 4],
    /// Years either side of retirement treated as the danger zone
    pub stress_window_years: u32,
    /// Multiplier on bear/crisis probabilities inside the window
    pub stress_tilt: f64,
    /// Multiplier on stock volatility inside the window
    pub stress_volatility: f64,
    pub bond_mean: f64,
    pub bond_volatility: f64,
    pub cash_return: f64,
}

impl Default for RegimeModel {
    fn default() -> Self {
        Self {
            bull: RegimeParams {
                mean_return: 0.12,
                volatility: 0.12,
                transitions: [0.80, 0.05, 0.14, 0.01],
            },
            bear: RegimeParams {
                mean_return: -0.10,
                volatility: 0.22,
                transitions: [0.15, 0.45, 0.35, 0.05],
            },
            normal: RegimeParams {
                mean_return: 0.07,
                volatility: 0.15,
                transitions: [0.20, 0.08, 0.70, 0.02],
            },
            crisis: RegimeParams {
                mean_return: -0.30,
                volatility: 0.35,
                transitions: [0.10, 0.30, 0.40, 0.20],
            },
            prior: [0.30, 0.15, 0.50, 0.05],
            stress_window_years: 5,
            stress_tilt: 1.5,
            stress_volatility: 1.1,
            bond_mean: 0.04,
            bond_volatility: 0.05,
            cash_return: 0.02,
        }
    }
}

impl RegimeModel {
    #[must_use]
    pub fn params(&self, regime: MarketRegime) -> &RegimeParams {
        match regime {
            MarketRegime::Bull => &self.bull,
            MarketRegime::Bear => &self.bear,
            MarketRegime::Normal => &self.normal,
            MarketRegime::Crisis => &self.crisis,
        }
    }

    fn in_stress_window(&self, years_to_retirement: i32) -> bool {
        years_to_retirement.unsigned_abs() <= self.stress_window_years
    }

    /// Reweight a distribution toward bear/crisis inside the stress window
    fn tilted(&self, weights: [f64; 4], years_to_retirement: i32) -> [f64; 4] {
        if !self.in_stress_window(years_to_retirement) {
            return weights;
        }
        let mut w = weights;
        for regime in MarketRegime::ALL {
            if regime.is_stressed() {
                w[regime.index()] *= self.stress_tilt;
            }
        }
        let total: f64 = w.iter().sum();
        w.map(|x| x / total)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let rows = MarketRegime::ALL
            .iter()
            .map(|r| (r.to_string(), self.params(*r).transitions));
        for (name, row) in rows.chain(std::iter::once(("prior".to_string(), self.prior))) {
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(format!("{name} probabilities must be non-negative"));
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(format!("{name} probabilities sum to {sum}, expected 1"));
            }
        }
        for regime in MarketRegime::ALL {
            let p = self.params(regime);
            if !p.mean_return.is_finite() || p.mean_return <= -1.0 {
                return Err(format!("{regime} mean return must exceed -100%"));
            }
            if !p.volatility.is_finite() || p.volatility < 0.0 {
                return Err(format!("{regime} volatility must be non-negative"));
            }
        }
        if !(self.stress_tilt.is_finite() && self.stress_tilt > 0.0) {
            return Err("stress tilt must be positive".to_string());
        }
        if !(self.stress_volatility.is_finite() && self.stress_volatility > 0.0) {
            return Err("stress volatility multiplier must be positive".to_string());
        }
        if !(self.bond_volatility.is_finite() && self.bond_volatility >= 0.0) {
            return Err("bond volatility must be non-negative".to_string());
        }
        Ok(())
    }
}

fn draw_categorical<R: Rng + ?Sized>(weights: &[f64; 4], rng: &mut R) -> MarketRegime {
    let u: f64 = rng.random();
    let mut cumulative = 0.0;
    for regime in MarketRegime::ALL {
        cumulative += weights[regime.index()];
        if u < cumulative {
            return regime;
        }
    }
    // Rounding left a sliver above the last cumulative bound
    MarketRegime::Crisis
}

/// One year of market-wide class returns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassReturns {
    pub regime: MarketRegime,
    pub stocks: f64,
    pub bonds: f64,
    pub cash: f64,
}

impl ClassReturns {
    #[must_use]
    pub fn portfolio_return(&self, allocation: &Allocation) -> f64 {
        allocation.stocks * self.stocks
            + allocation.bonds * self.bonds
            + allocation.cash * self.cash
    }
}

/// Per-trial regime state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeProcess {
    current: MarketRegime,
}

impl RegimeProcess {
    /// Draw the starting regime from the (possibly tilted) prior
    pub fn start<R: Rng + ?Sized>(
        model: &RegimeModel,
        years_to_retirement: i32,
        rng: &mut R,
    ) -> Self {
        let prior = model.tilted(model.prior, years_to_retirement);
        Self {
            current: draw_categorical(&prior, rng),
        }
    }

    #[must_use]
    pub fn from_regime(current: MarketRegime) -> Self {
        Self { current }
    }

    #[must_use]
    pub fn current(&self) -> MarketRegime {
        self.current
    }

    /// Draw this year's class returns from the active regime, then move the
    /// chain one step.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        model: &RegimeModel,
        years_to_retirement: i32,
        rng: &mut R,
    ) -> ClassReturns {
        let regime = self.current;
        let params = model.params(regime);
        let volatility = if model.in_stress_window(years_to_retirement) {
            params.volatility * model.stress_volatility
        } else {
            params.volatility
        };

        let z_stock: f64 = rng.sample(StandardNormal);
        let z_bond: f64 = rng.sample(StandardNormal);
        let stocks = real_return_from_shock(params.mean_return, volatility, z_stock);
        let bonds = model.bond_mean + model.bond_volatility * z_bond;

        let row = model.tilted(params.transitions, years_to_retirement);
        self.current = draw_categorical(&row, rng);

        ClassReturns {
            regime,
            stocks,
            bonds,
            cash: model.cash_return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn default_model_is_valid() {
        assert!(RegimeModel::default().validate().is_ok());
    }

    #[test]
    fn bad_transition_row_is_rejected() {
        let mut model = RegimeModel::default();
        model.bear.transitions = [0.5, 0.5, 0.5, 0.0];
        assert!(model.validate().is_err());
    }

    #[test]
    fn expected_durations() {
        let model = RegimeModel::default();
        assert!((model.bull.expected_duration(MarketRegime::Bull) - 5.0).abs() < 1e-9);
        assert!((model.crisis.expected_duration(MarketRegime::Crisis) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn tilt_applies_only_near_retirement() {
        let model = RegimeModel::default();
        let far = model.tilted(model.prior, 20);
        assert_eq!(far, model.prior);

        let near = model.tilted(model.prior, 3);
        assert!(near[MarketRegime::Bear.index()] > model.prior[MarketRegime::Bear.index()]);
        assert!(near[MarketRegime::Crisis.index()] > model.prior[MarketRegime::Crisis.index()]);
        assert!((near.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        // The window extends into the first years of retirement
        assert_ne!(model.tilted(model.prior, -4), model.prior);
    }

    #[test]
    fn chain_visits_every_regime() {
        let model = RegimeModel::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut process = RegimeProcess::start(&model, 20, &mut rng);
        let mut seen = [0usize; 4];
        for _ in 0..5_000 {
            let r = process.step(&model, 20, &mut rng);
            seen[r.regime.index()] += 1;
            assert!(r.stocks > -1.0);
        }
        assert!(seen.iter().all(|&n| n > 0), "{seen:?}");
        // Normal dominates the stationary distribution
        assert!(seen[MarketRegime::Normal.index()] > seen[MarketRegime::Crisis.index()]);
    }

    #[test]
    fn stress_window_raises_bad_regime_frequency() {
        let model = RegimeModel::default();
        let count_stressed = |ytr: i32| {
            let mut rng = StdRng::seed_from_u64(9);
            let mut process = RegimeProcess::from_regime(MarketRegime::Normal);
            (0..20_000)
                .filter(|_| process.step(&model, ytr, &mut rng).regime.is_stressed())
                .count()
        };
        assert!(count_stressed(0) > count_stressed(25));
    }

    #[test]
    fn portfolio_return_weights_classes() {
        let r = ClassReturns {
            regime: MarketRegime::Normal,
            stocks: 0.10,
            bonds: 0.04,
            cash: 0.02,
        };
        let a = Allocation::new(0.5, 0.3, 0.2);
        assert!((r.portfolio_return(&a) - (0.05 + 0.012 + 0.004)).abs() < 1e-12);
    }
}
