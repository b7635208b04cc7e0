//! Pool — the public face of the engine.
//!
//! Wires the registry, pricing, allocation and ledger together behind two
//! surfaces:
//! - Administrative (owner-gated): add strategy, set weight, set enabled,
//!   transfer ownership.
//! - Caller-facing: deposit, withdraw, transfer, exchange-rate preview.
//!
//! Every method is one self-contained transition. `&mut self` guarantees no
//! adapter can re-enter the pool mid-operation; see [`crate::shared`] for
//! hosts that need to share a pool across threads.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::adapter::StrategyAdapter;
use crate::allocation::{self, AllocationError, DepositOutcome, WithdrawOutcome};
use crate::domain::{Amount, ClaimUnits, HolderId, StrategyIndex};
use crate::ledger::{ClaimLedger, LedgerError};
use crate::pricing::{self, ExchangeRate, PricingError};
use crate::registry::{
    parse_weight, RegistryError, StrategyRegistry, StrategySummary, DEFAULT_MAX_STRATEGIES,
};

/// Errors surfaced by [`Pool`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("{caller} is not the pool owner")]
    NotOwner { caller: HolderId },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("pool lock poisoned by a panic during an earlier operation")]
    LockPoisoned,
}

/// Serializable point-in-time view of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub owner: HolderId,
    pub total_units: ClaimUnits,
    pub pool_value: Amount,
    pub rate: ExchangeRate,
    pub strategies: Vec<StrategySummary>,
    pub holders: Vec<HolderBalance>,
}

impl PoolSnapshot {
    /// No claim units outstanding, so the next deposit mints at 1:1.
    ///
    /// A live pool can also sit at value 1 / supply 1; only the supply says
    /// which case this is.
    pub fn is_bootstrap(&self) -> bool {
        self.total_units == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub holder: HolderId,
    pub units: ClaimUnits,
}

/// Pooled-capital allocator over a registry of strategy adapters.
#[derive(Debug)]
pub struct Pool {
    owner: HolderId,
    registry: StrategyRegistry,
    ledger: ClaimLedger,
}

impl Pool {
    pub fn new(owner: impl Into<HolderId>) -> Self {
        Self::with_max_strategies(owner, DEFAULT_MAX_STRATEGIES)
    }

    pub fn with_max_strategies(owner: impl Into<HolderId>, max_strategies: usize) -> Self {
        Self {
            owner: owner.into(),
            registry: StrategyRegistry::with_capacity_limit(max_strategies),
            ledger: ClaimLedger::new(),
        }
    }

    pub fn owner(&self) -> &HolderId {
        &self.owner
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ClaimLedger {
        &self.ledger
    }

    // ── Administrative surface ─────────────────────────────────────────

    pub fn add_strategy(
        &mut self,
        caller: &HolderId,
        adapter: Box<dyn StrategyAdapter>,
        initial_weight: i64,
    ) -> Result<StrategyIndex, PoolError> {
        self.ensure_owner(caller)?;
        let weight = parse_weight(initial_weight)?;
        let name = adapter.name().to_string();
        let index = self.registry.add_strategy(adapter, weight)?;
        info!(%index, adapter = %name, weight, "strategy added");
        Ok(index)
    }

    pub fn set_weight(
        &mut self,
        caller: &HolderId,
        index: StrategyIndex,
        weight: i64,
    ) -> Result<(), PoolError> {
        self.ensure_owner(caller)?;
        self.registry.entry(index)?;
        let weight = parse_weight(weight)?;
        self.registry.set_weight(index, weight)?;
        info!(%index, weight, "strategy reweighted");
        Ok(())
    }

    pub fn set_enabled(
        &mut self,
        caller: &HolderId,
        index: StrategyIndex,
        enabled: bool,
    ) -> Result<(), PoolError> {
        self.ensure_owner(caller)?;
        self.registry.set_enabled(index, enabled)?;
        info!(%index, enabled, "strategy toggled");
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &HolderId,
        new_owner: impl Into<HolderId>,
    ) -> Result<(), PoolError> {
        self.ensure_owner(caller)?;
        let new_owner = new_owner.into();
        info!(from = %self.owner, to = %new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    fn ensure_owner(&self, caller: &HolderId) -> Result<(), PoolError> {
        if *caller != self.owner {
            return Err(PoolError::NotOwner {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    // ── Caller-facing surface ──────────────────────────────────────────

    /// Deposit `amount` and return the claim units minted.
    pub fn deposit(&mut self, holder: &HolderId, amount: Amount) -> Result<ClaimUnits, PoolError> {
        Ok(self.deposit_detailed(holder, amount)?.units_minted)
    }

    /// Deposit `amount`, returning the full allocation breakdown.
    pub fn deposit_detailed(
        &mut self,
        holder: &HolderId,
        amount: Amount,
    ) -> Result<DepositOutcome, PoolError> {
        Ok(allocation::deposit(
            &mut self.registry,
            &mut self.ledger,
            holder,
            amount,
        )?)
    }

    /// Redeem `units` claim units pro rata across every strategy.
    pub fn withdraw(
        &mut self,
        holder: &HolderId,
        units: ClaimUnits,
    ) -> Result<WithdrawOutcome, PoolError> {
        Ok(allocation::withdraw(
            &mut self.registry,
            &mut self.ledger,
            holder,
            units,
        )?)
    }

    /// Move claim units between holders.
    pub fn transfer(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        units: ClaimUnits,
    ) -> Result<(), PoolError> {
        self.ledger.transfer(from, to, units)?;
        Ok(())
    }

    /// Rate a deposit or withdrawal would see right now. Read-only.
    pub fn preview_exchange_rate(&self) -> Result<ExchangeRate, PoolError> {
        Ok(pricing::compute_exchange_rate(
            &self.registry,
            self.ledger.total_units(),
        )?)
    }

    pub fn aggregate_value(&self) -> Result<Amount, PoolError> {
        Ok(pricing::aggregate_value(&self.registry)?)
    }

    pub fn balance_of(&self, holder: &HolderId) -> ClaimUnits {
        self.ledger.balance_of(holder)
    }

    pub fn total_units(&self) -> ClaimUnits {
        self.ledger.total_units()
    }

    /// Whether the next deposit is priced at the bootstrap rate.
    pub fn is_bootstrap(&self) -> bool {
        self.ledger.total_units() == 0
    }

    /// Deposit-asset value of a holder's claim at the current rate.
    pub fn value_of(&self, holder: &HolderId) -> Result<Amount, PoolError> {
        let rate = self.preview_exchange_rate()?;
        if self.ledger.total_units() == 0 {
            return Ok(0);
        }
        Ok(rate.deposit_units_for(self.balance_of(holder))?)
    }

    pub fn snapshot(&self) -> Result<PoolSnapshot, PoolError> {
        Ok(PoolSnapshot {
            owner: self.owner.clone(),
            total_units: self.ledger.total_units(),
            pool_value: self.aggregate_value()?,
            rate: self.preview_exchange_rate()?,
            strategies: self.registry.summaries(),
            holders: self
                .ledger
                .holders()
                .map(|(holder, units)| HolderBalance {
                    holder: holder.clone(),
                    units,
                })
                .collect(),
        })
    }

    /// Check the ledger's supply invariant.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        if !self.ledger.is_consistent() {
            return Err(PoolError::InvariantViolated(format!(
                "holder balances do not sum to total supply {}",
                self.ledger.total_units()
            )));
        }
        Ok(())
    }
}
