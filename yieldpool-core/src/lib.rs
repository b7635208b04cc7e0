//! YieldPool Core — strategy registry, pricing, weighted allocation, claim ledger.
//!
//! This crate contains the accounting engine of a pooled-capital allocator:
//! - Strategy adapters (one trait, one concrete type per venue)
//! - Append-only strategy registry with weights and enabled flags
//! - Pricing of the aggregate pool and the claim-unit exchange rate
//! - Weighted, all-or-nothing deposit allocation
//! - Pro-rata withdrawal that skips failing venues instead of blocking exits
//! - Claim ledger with a supply invariant
//! - Owner-gated pool facade, plus a lock-wrapped variant for threaded hosts

pub mod adapter;
pub mod allocation;
pub mod config;
pub mod domain;
pub mod factory;
pub mod ledger;
pub mod pool;
pub mod pricing;
pub mod registry;
pub mod shared;

pub use adapter::{
    AdapterError, DepositReceipt, FailingAdapter, SimulatedVenue, StrategyAdapter, VenueHandle,
};
pub use allocation::{
    Allocation, AllocationError, DepositOutcome, Redemption, SkippedStrategy, WithdrawOutcome,
};
pub use config::{AdapterConfig, ConfigError, PoolConfig, StrategyConfig};
pub use domain::{Amount, ClaimUnits, HolderId, StrategyIndex, Weight};
pub use factory::{build_pool, create_adapter, BuiltPool, BuiltStrategy, FactoryError};
pub use ledger::{ClaimLedger, LedgerError};
pub use pool::{HolderBalance, Pool, PoolError, PoolSnapshot};
pub use pricing::{ExchangeRate, PricingError};
pub use registry::{RegistryError, StrategyRegistry, StrategySummary, DEFAULT_MAX_STRATEGIES};
pub use shared::SharedPool;
