mod assets;
mod buckets;
mod household;
mod market;
mod results;

pub use assets::{AnnuityDetail, Asset, AssetKind, Liability};
pub use buckets::{AssetBuckets, BucketKind, OwnedBuckets};
pub use household::{
    AnnuityIncome, HealthStatus, Household, IncomeSources, MaritalStatus, Owner, Person,
};
pub use market::{Allocation, ClassFigures, MarketRegime};
pub use results::{
    BalancePercentiles, CalibrationReport, SimulationResult, TrialOutcome, TrialTermination,
    YearlyCashFlow,
};

/// Oldest age any household member is modelled to reach
pub const MAX_AGE: u32 = 120;

/// Decumulation never runs longer than this many years
pub const MAX_DECUMULATION_YEARS: u32 = 60;
