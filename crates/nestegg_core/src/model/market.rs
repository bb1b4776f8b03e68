//! Market vocabulary shared by the return generator and regime process

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the market-wide Markov chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Bull,
    Bear,
    Normal,
    Crisis,
}

impl MarketRegime {
    pub const ALL: [MarketRegime; 4] = [
        MarketRegime::Bull,
        MarketRegime::Bear,
        MarketRegime::Normal,
        MarketRegime::Crisis,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            MarketRegime::Bull => 0,
            MarketRegime::Bear => 1,
            MarketRegime::Normal => 2,
            MarketRegime::Crisis => 3,
        }
    }

    /// Bear and crisis regimes carry sequence-of-returns risk
    #[must_use]
    pub fn is_stressed(self) -> bool {
        matches!(self, MarketRegime::Bear | MarketRegime::Crisis)
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketRegime::Bull => "bull",
            MarketRegime::Bear => "bear",
            MarketRegime::Normal => "normal",
            MarketRegime::Crisis => "crisis",
        };
        f.write_str(s)
    }
}

/// Stock/bond/cash weights; must sum to one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub stocks: f64,
    pub bonds: f64,
    pub cash: f64,
}

impl Allocation {
    #[must_use]
    pub const fn new(stocks: f64, bonds: f64, cash: f64) -> Self {
        Self {
            stocks,
            bonds,
            cash,
        }
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.stocks + self.bonds + self.cash
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.stocks, self.bonds, self.cash]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
            && (self.sum() - 1.0).abs() < 1e-6
    }

    #[must_use]
    pub fn midpoint(a: Allocation, b: Allocation) -> Allocation {
        Allocation {
            stocks: f64::midpoint(a.stocks, b.stocks),
            bonds: f64::midpoint(a.bonds, b.bonds),
            cash: f64::midpoint(a.cash, b.cash),
        }
    }
}

/// One number per asset class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassFigures {
    pub stocks: f64,
    pub bonds: f64,
    pub cash: f64,
}

impl ClassFigures {
    /// Long-run historical real returns
    pub const HISTORICAL_REAL_RETURNS: ClassFigures = ClassFigures {
        stocks: 0.07,
        bonds: 0.025,
        cash: 0.005,
    };

    pub const CLASS_VOLATILITY: ClassFigures = ClassFigures {
        stocks: 0.18,
        bonds: 0.06,
        cash: 0.01,
    };

    #[must_use]
    pub fn weighted(&self, allocation: &Allocation) -> f64 {
        allocation.stocks * self.stocks
            + allocation.bonds * self.bonds
            + allocation.cash * self.cash
    }

    /// Portfolio volatility assuming zero cross-class correlation
    #[must_use]
    pub fn uncorrelated_volatility(&self, allocation: &Allocation) -> f64 {
        let s = allocation.stocks * self.stocks;
        let b = allocation.bonds * self.bonds;
        let c = allocation.cash * self.cash;
        (s * s + b * b + c * c).sqrt()
    }
}
