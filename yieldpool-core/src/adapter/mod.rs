//! Strategy adapters — the uniform capability interface over yield venues.
//!
//! Every derivative the pool allocates into is wrapped behind
//! [`StrategyAdapter`]. The engine only ever talks to venues through this
//! trait; how a venue mints or redeems its own instrument is its business.

pub mod failing;
pub mod simulated;

pub use failing::FailingAdapter;
pub use simulated::{SimulatedVenue, VenueHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Amount;

/// Errors reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("adapter '{adapter}' rejected deposit: {reason}")]
    DepositFailed { adapter: String, reason: String },

    #[error("adapter '{adapter}' rejected withdrawal: {reason}")]
    WithdrawFailed { adapter: String, reason: String },
}

impl AdapterError {
    pub fn deposit(adapter: &str, reason: impl Into<String>) -> Self {
        Self::DepositFailed {
            adapter: adapter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn withdraw(adapter: &str, reason: impl Into<String>) -> Self {
        Self::WithdrawFailed {
            adapter: adapter.to_string(),
            reason: reason.into(),
        }
    }
}

/// Proof that an adapter accepted a deposit.
///
/// The engine keeps receipts for the duration of one deposit so it can
/// unwind the adapters that already accepted funds if a later one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Deposit-asset amount accepted by the venue.
    pub amount: Amount,
    /// Venue-local sequence number of this deposit.
    pub sequence: u64,
}

/// A yield-bearing venue the pool can allocate into.
///
/// Implementations must be `Send + Sync` so a pool can sit behind a lock in a
/// multi-threaded host.
pub trait StrategyAdapter: Send + Sync {
    /// Human-readable name (e.g., "staked_eth", "lending_usdc").
    fn name(&self) -> &str;

    /// Whether the venue behind this adapter can be reached at all.
    ///
    /// The registry refuses to add an unreachable adapter. A reachable but
    /// misbehaving adapter cannot be detected here.
    fn is_reachable(&self) -> bool {
        true
    }

    /// Hand `amount` of the deposit asset to the venue.
    fn deposit_funds(&mut self, amount: Amount) -> Result<DepositReceipt, AdapterError>;

    /// Redeem `amount` of value from the venue. Returns the deposit-asset
    /// amount actually sent back.
    fn withdraw_funds(&mut self, amount: Amount) -> Result<Amount, AdapterError>;

    /// Current deposit-asset value of everything held for the pool.
    fn valuation(&self) -> Amount;

    /// Reverse a deposit made earlier in the same pool operation.
    fn unwind_deposit(&mut self, receipt: &DepositReceipt) -> Result<Amount, AdapterError> {
        self.withdraw_funds(receipt.amount)
    }
}
