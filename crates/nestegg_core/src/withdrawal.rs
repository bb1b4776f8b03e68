//! Tax-efficient withdrawal allocation
//!
//! A net (after-tax) need is met by drawing buckets in order: cash
//! equivalents, then capital gains (only the gain share is taxed), then
//! tax-deferred (fully taxed as ordinary income), then tax-free last.
//!
//! Planning and execution are separate so a caller can size a withdrawal,
//! adjust its spending decision, and only then mutate the buckets.

use crate::model::{BucketKind, OwnedBuckets};

/// Extra tax on tax-deferred withdrawals before age 59½
pub const EARLY_WITHDRAWAL_PENALTY: f64 = 0.10;
/// First age at which withdrawals are penalty-free (integer ages)
pub const PENALTY_FREE_AGE: u32 = 60;
/// First age at which required minimum distributions apply
pub const RMD_START_AGE: u32 = 73;

/// IRS uniform lifetime table divisors from age 73 upward
const RMD_DIVISORS: [f64; 48] = [
    26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, 18.5, // 73-82
    17.7, 16.8, 16.0, 15.2, 14.4, 13.7, 12.9, 12.2, 11.5, 10.8, // 83-92
    10.1, 9.5, 8.9, 8.4, 7.8, 7.3, 6.8, 6.4, 6.0, 5.6, // 93-102
    5.2, 4.9, 4.6, 4.3, 4.1, 3.9, 3.7, 3.5, 3.4, 3.3, // 103-112
    3.1, 3.0, 2.9, 2.8, 2.7, 2.5, 2.3, 2.0, // 113-120
];

/// Tax facts the allocator needs for one year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalContext {
    pub ordinary_rate: f64,
    pub capital_gains_rate: f64,
    /// Share of a brokerage sale that is gain rather than basis
    pub gain_fraction: f64,
    pub age: u32,
}

impl WithdrawalContext {
    /// Effective tax on a dollar drawn from `kind`
    #[must_use]
    pub fn effective_rate(&self, kind: BucketKind) -> f64 {
        match kind {
            BucketKind::CashEquivalents | BucketKind::TaxFree => 0.0,
            BucketKind::CapitalGains => self.gain_fraction * self.capital_gains_rate,
            BucketKind::TaxDeferred => {
                if self.age < PENALTY_FREE_AGE {
                    self.ordinary_rate + EARLY_WITHDRAWAL_PENALTY
                } else {
                    self.ordinary_rate
                }
            }
        }
    }
}

/// Draw from one bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketDraw {
    pub kind: BucketKind,
    pub gross: f64,
    pub tax: f64,
}

/// Sized withdrawal, not yet applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithdrawalPlan {
    pub draws: Vec<BucketDraw>,
    /// Tax-deferred amount forced out by the RMD beyond what spending needed
    pub rmd_excess: f64,
    pub rmd_excess_tax: f64,
    /// Net need the buckets could not cover
    pub shortfall: f64,
}

impl WithdrawalPlan {
    #[must_use]
    pub fn gross(&self) -> f64 {
        self.draws.iter().map(|d| d.gross).sum::<f64>() + self.rmd_excess
    }

    #[must_use]
    pub fn taxes(&self) -> f64 {
        self.draws.iter().map(|d| d.tax).sum::<f64>() + self.rmd_excess_tax
    }

    /// Spendable dollars delivered
    #[must_use]
    pub fn net(&self) -> f64 {
        self.draws.iter().map(|d| d.gross - d.tax).sum()
    }

    #[must_use]
    pub fn is_short(&self) -> bool {
        self.shortfall > 1e-6
    }
}

/// Required minimum distribution for a tax-deferred balance at `age`
#[must_use]
pub fn required_minimum_distribution(age: u32, tax_deferred: f64) -> f64 {
    if age < RMD_START_AGE || tax_deferred <= 0.0 {
        return 0.0;
    }
    let idx = ((age - RMD_START_AGE) as usize).min(RMD_DIVISORS.len() - 1);
    tax_deferred / RMD_DIVISORS[idx]
}

/// Size a withdrawal delivering `net_need` after tax
#[must_use]
pub fn plan_withdrawal(
    buckets: &OwnedBuckets,
    net_need: f64,
    ctx: &WithdrawalContext,
) -> WithdrawalPlan {
    let mut plan = WithdrawalPlan::default();
    let mut remaining = net_need.max(0.0);

    for kind in BucketKind::WITHDRAWAL_ORDER {
        if remaining <= 0.0 {
            break;
        }
        let available = buckets.bucket_total(kind);
        if available <= 0.0 {
            continue;
        }
        let rate = ctx.effective_rate(kind);
        let keep = 1.0 - rate;
        let gross_needed = remaining / keep;
        let (gross, net) = if gross_needed <= available {
            (gross_needed, remaining)
        } else {
            (available, available * keep)
        };
        plan.draws.push(BucketDraw {
            kind,
            gross,
            tax: gross * rate,
        });
        remaining -= net;
    }
    plan.shortfall = remaining.max(0.0);

    let deferred_drawn = plan
        .draws
        .iter()
        .filter(|d| d.kind == BucketKind::TaxDeferred)
        .map(|d| d.gross)
        .sum::<f64>();
    let deferred_left = buckets.bucket_total(BucketKind::TaxDeferred) - deferred_drawn;
    let rmd = required_minimum_distribution(ctx.age, buckets.bucket_total(BucketKind::TaxDeferred));
    if rmd > deferred_drawn && deferred_left > 0.0 {
        plan.rmd_excess = (rmd - deferred_drawn).min(deferred_left);
        plan.rmd_excess_tax = plan.rmd_excess * ctx.effective_rate(BucketKind::TaxDeferred);
    }

    plan
}

/// Apply a plan to the buckets. Any RMD excess is taxed and reinvested in
/// the capital-gains bucket.
pub fn execute_withdrawal(buckets: &mut OwnedBuckets, plan: &WithdrawalPlan) {
    for draw in &plan.draws {
        buckets.withdraw(draw.kind, draw.gross);
    }
    if plan.rmd_excess > 0.0 {
        let retain = 1.0 - plan.rmd_excess_tax / plan.rmd_excess;
        buckets.transfer(
            BucketKind::TaxDeferred,
            BucketKind::CapitalGains,
            plan.rmd_excess,
            retain,
        );
    }
    buckets.clamp_dust();
}

/// Plan and apply in one step
pub fn withdraw(
    buckets: &mut OwnedBuckets,
    net_need: f64,
    ctx: &WithdrawalContext,
) -> WithdrawalPlan {
    let plan = plan_withdrawal(buckets, net_need, ctx);
    execute_withdrawal(buckets, &plan);
    plan
}
