//! Assets and liabilities as reported by the intake profile

use serde::{Deserialize, Serialize};

use super::household::Owner;

/// Closed set of account/asset tags accepted from the intake profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    #[serde(rename = "401k")]
    Traditional401k,
    #[serde(rename = "403b")]
    Traditional403b,
    TraditionalIra,
    OtherPreTax,
    RothIra,
    RothAnnuity,
    TaxableBrokerage,
    CashValueLifeInsurance,
    Savings,
    MoneyMarket,
    CertificateOfDeposit,
    Checking,
    Annuity,
    Vehicle,
    Business,
}

/// Annuity contract details
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnuityDetail {
    pub annual_payout: f64,
    /// Owner age at which payments begin
    pub payout_start_age: u32,
    /// Deferred annuities accumulate until the payout age
    #[serde(default)]
    pub deferred: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub kind: AssetKind,
    pub owner: Owner,
    pub value: f64,
    #[serde(default)]
    pub annuity: Option<AnnuityDetail>,
}

impl Asset {
    #[must_use]
    pub fn new(kind: AssetKind, owner: Owner, value: f64) -> Self {
        Self {
            kind,
            owner,
            value,
            annuity: None,
        }
    }

    #[must_use]
    pub fn annuity(owner: Owner, value: f64, detail: AnnuityDetail) -> Self {
        Self {
            kind: AssetKind::Annuity,
            owner,
            value,
            annuity: Some(detail),
        }
    }
}

/// Debt service that frees up savings capacity once paid off
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Liability {
    pub balance: f64,
    pub annual_payment: f64,
}
