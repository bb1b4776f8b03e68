//! Tax-treatment buckets
//!
//! Balances are held once per owner. The combined household view is always
//! computed on demand, so there is no second copy to keep in sync.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::household::Owner;

/// Tax treatment of a pool of assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    /// Savings, money market, CDs
    CashEquivalents,
    /// Taxable brokerage and cash-value life insurance; only gains are taxed
    CapitalGains,
    /// 401k/403b/traditional IRA; fully taxed as ordinary income
    TaxDeferred,
    /// Roth IRA / Roth annuity; untaxed
    TaxFree,
}

impl BucketKind {
    /// Tax-efficient withdrawal order
    pub const WITHDRAWAL_ORDER: [BucketKind; 4] = [
        BucketKind::CashEquivalents,
        BucketKind::CapitalGains,
        BucketKind::TaxDeferred,
        BucketKind::TaxFree,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetBuckets {
    pub tax_deferred: f64,
    pub tax_free: f64,
    pub capital_gains: f64,
    pub cash_equivalents: f64,
}

impl AssetBuckets {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.tax_deferred + self.tax_free + self.capital_gains + self.cash_equivalents
    }

    #[must_use]
    pub fn get(&self, kind: BucketKind) -> f64 {
        match kind {
            BucketKind::TaxDeferred => self.tax_deferred,
            BucketKind::TaxFree => self.tax_free,
            BucketKind::CapitalGains => self.capital_gains,
            BucketKind::CashEquivalents => self.cash_equivalents,
        }
    }

    pub fn get_mut(&mut self, kind: BucketKind) -> &mut f64 {
        match kind {
            BucketKind::TaxDeferred => &mut self.tax_deferred,
            BucketKind::TaxFree => &mut self.tax_free,
            BucketKind::CapitalGains => &mut self.capital_gains,
            BucketKind::CashEquivalents => &mut self.cash_equivalents,
        }
    }

    /// Multiply every component by the same growth factor
    pub fn grow(&mut self, factor: f64) {
        self.tax_deferred *= factor;
        self.tax_free *= factor;
        self.capital_gains *= factor;
        self.cash_equivalents *= factor;
    }

    fn add(&mut self, other: &AssetBuckets) {
        self.tax_deferred += other.tax_deferred;
        self.tax_free += other.tax_free;
        self.capital_gains += other.capital_gains;
        self.cash_equivalents += other.cash_equivalents;
    }

    fn is_finite(&self) -> bool {
        self.total().is_finite()
    }
}

/// Owner-indexed bucket balances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnedBuckets {
    by_owner: FxHashMap<Owner, AssetBuckets>,
}

impl OwnedBuckets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Balances held by one owner (zero if the owner holds nothing)
    #[must_use]
    pub fn owner(&self, owner: Owner) -> AssetBuckets {
        self.by_owner.get(&owner).copied().unwrap_or_default()
    }

    pub fn owner_mut(&mut self, owner: Owner) -> &mut AssetBuckets {
        self.by_owner.entry(owner).or_default()
    }

    pub fn deposit(&mut self, owner: Owner, kind: BucketKind, amount: f64) {
        *self.owner_mut(owner).get_mut(kind) += amount;
    }

    /// Household-wide view summed over owners
    #[must_use]
    pub fn combined(&self) -> AssetBuckets {
        let mut combined = AssetBuckets::default();
        for owner in Owner::ALL {
            if let Some(b) = self.by_owner.get(&owner) {
                combined.add(b);
            }
        }
        combined
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.combined().total()
    }

    #[must_use]
    pub fn bucket_total(&self, kind: BucketKind) -> f64 {
        Owner::ALL.iter().map(|o| self.owner(*o).get(kind)).sum()
    }

    /// Remove `amount` from one bucket kind, pro rata across owners.
    /// Returns the amount actually removed (capped at the bucket total).
    pub fn withdraw(&mut self, kind: BucketKind, amount: f64) -> f64 {
        let available = self.bucket_total(kind);
        if amount <= 0.0 || available <= 0.0 {
            return 0.0;
        }
        if amount >= available {
            for owner in Owner::ALL {
                if let Some(b) = self.by_owner.get_mut(&owner) {
                    *b.get_mut(kind) = 0.0;
                }
            }
            return available;
        }
        let keep = 1.0 - amount / available;
        for owner in Owner::ALL {
            if let Some(b) = self.by_owner.get_mut(&owner) {
                *b.get_mut(kind) *= keep;
            }
        }
        amount
    }

    /// Move `amount` out of one bucket kind into another, pro rata across
    /// owners, applying `retain` (after-tax fraction) to what arrives.
    pub fn transfer(&mut self, from: BucketKind, to: BucketKind, amount: f64, retain: f64) -> f64 {
        let available = self.bucket_total(from);
        if amount <= 0.0 || available <= 0.0 {
            return 0.0;
        }
        let moved = amount.min(available);
        let share = moved / available;
        for owner in Owner::ALL {
            if let Some(b) = self.by_owner.get_mut(&owner) {
                let out = b.get(from) * share;
                *b.get_mut(from) -= out;
                *b.get_mut(to) += out * retain;
            }
        }
        moved
    }

    pub fn grow_owner(&mut self, owner: Owner, factor: f64) {
        if let Some(b) = self.by_owner.get_mut(&owner) {
            b.grow(factor);
        }
    }

    /// Snap values that drifted a hair below zero back to zero
    pub fn clamp_dust(&mut self) {
        for b in self.by_owner.values_mut() {
            for kind in BucketKind::WITHDRAWAL_ORDER {
                let v = b.get_mut(kind);
                if *v < 1e-9 {
                    *v = 0.0;
                }
            }
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.by_owner.values().all(AssetBuckets::is_finite)
    }

    pub fn owners(&self) -> impl Iterator<Item = (Owner, &AssetBuckets)> {
        Owner::ALL
            .into_iter()
            .filter_map(|o| self.by_owner.get(&o).map(|b| (o, b)))
    }
}
