//! Domain types for YieldPool

pub mod ids;
pub mod math;

pub use ids::{HolderId, StrategyIndex};
pub use math::{checked_sum, mul_div_floor};

/// Quantity of the deposit asset, in its smallest unit.
pub type Amount = u128;

/// Quantity of claim-token units.
pub type ClaimUnits = u128;

/// Relative allocation weight of a strategy.
pub type Weight = u64;
