//! Asset classification into tax-treatment buckets
//!
//! Checking accounts, vehicles and business interests never enter a bucket.
//! Annuities become guaranteed income, except deferred contracts that have not
//! started paying, whose value is carried as a tax-deferred placeholder.

use crate::error::SnapshotError;
use crate::model::{AnnuityIncome, Asset, AssetKind, BucketKind, OwnedBuckets, Owner};

/// Where an asset tag lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Bucket(BucketKind),
    Annuity,
    Excluded,
}

#[must_use]
pub fn classify(kind: AssetKind) -> Classification {
    match kind {
        AssetKind::Traditional401k
        | AssetKind::Traditional403b
        | AssetKind::TraditionalIra
        | AssetKind::OtherPreTax => Classification::Bucket(BucketKind::TaxDeferred),
        AssetKind::RothIra | AssetKind::RothAnnuity => Classification::Bucket(BucketKind::TaxFree),
        AssetKind::TaxableBrokerage | AssetKind::CashValueLifeInsurance => {
            Classification::Bucket(BucketKind::CapitalGains)
        }
        AssetKind::Savings | AssetKind::MoneyMarket | AssetKind::CertificateOfDeposit => {
            Classification::Bucket(BucketKind::CashEquivalents)
        }
        AssetKind::Annuity => Classification::Annuity,
        AssetKind::Checking | AssetKind::Vehicle | AssetKind::Business => Classification::Excluded,
    }
}

/// Output of bucketing a list of assets
#[derive(Debug, Clone, Default)]
pub struct BucketedAssets {
    pub buckets: OwnedBuckets,
    pub annuity_incomes: Vec<AnnuityIncome>,
}

fn checked_amount(
    index: usize,
    asset: &Asset,
    quantity: &'static str,
    value: f64,
) -> Result<f64, SnapshotError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SnapshotError::InvalidAssetAmount {
            index,
            kind: asset.kind,
            quantity,
            value,
        })
    }
}

/// Sort assets into per-owner buckets.
///
/// `owner_age` reports the current age of an owner (the user's age for joint
/// holdings), used to decide whether a deferred annuity is already paying.
/// Negative or non-finite values and payouts are rejected, excluded tags
/// included.
pub fn bucket_assets(
    assets: &[Asset],
    owner_age: impl Fn(Owner) -> u32,
) -> Result<BucketedAssets, SnapshotError> {
    let mut out = BucketedAssets::default();

    for (index, asset) in assets.iter().enumerate() {
        let value = checked_amount(index, asset, "value", asset.value)?;
        match classify(asset.kind) {
            Classification::Bucket(kind) => out.buckets.deposit(asset.owner, kind, value),
            Classification::Annuity => match asset.annuity {
                Some(detail) => {
                    let paying = detail.payout_start_age <= owner_age(asset.owner);
                    if detail.deferred && !paying {
                        out.buckets
                            .deposit(asset.owner, BucketKind::TaxDeferred, value);
                    } else {
                        let payout =
                            checked_amount(index, asset, "annual payout", detail.annual_payout)?;
                        out.annuity_incomes.push(AnnuityIncome {
                            owner: asset.owner,
                            annual_amount: payout,
                            start_age: detail.payout_start_age,
                        });
                    }
                }
                // Without contract details the value is all we know
                None => out
                    .buckets
                    .deposit(asset.owner, BucketKind::TaxDeferred, value),
            },
            Classification::Excluded => {}
        }
    }

    Ok(out)
}
